// Bounded producer/consumer relay between a model token stream and an HTTP
// response body. The producer task owns the upstream stream; the receiver
// side is handed to axum as the body, so backpressure from a slow client
// propagates to the upstream read.

use std::convert::Infallible;

use axum::body::Body;
use bytes::Bytes;
use futures_util::StreamExt;
use serde::Serialize;
use tokio::sync::mpsc;
use tokio_stream::wrappers::ReceiverStream;
use tracing::{debug, error};

use crate::advice::calculator::TaxComputation;
use crate::llm_client::TokenStream;

/// Fragments buffered between the model read and the client write.
pub const CHANNEL_CAPACITY: usize = 16;

/// Appended when the upstream stream dies after the response has started.
pub const INTERRUPTED_MARKER: &str =
    "\n\n_[advice interrupted: the generation service stopped responding]_";

#[derive(Serialize)]
struct HeaderFragment<'a> {
    #[serde(flatten)]
    computation: &'a TaxComputation,
    #[serde(rename = "type")]
    kind: &'static str,
}

/// Serializes the numeric header as one newline-terminated JSON line.
pub fn header_line(computed: &TaxComputation) -> Result<String, serde_json::Error> {
    let mut line = serde_json::to_string(&HeaderFragment {
        computation: computed,
        kind: "data",
    })?;
    line.push('\n');
    Ok(line)
}

/// Spawns the producer task that pumps model fragments into a bounded
/// channel and returns the consumer end. When `header` is given it is sent
/// before any model fragment, so the numeric line always precedes advice
/// text. A failed send means the client hung up; the producer stops and
/// drops the upstream stream.
pub fn spawn_relay(header: Option<String>, mut fragments: TokenStream) -> mpsc::Receiver<Bytes> {
    let (tx, rx) = mpsc::channel::<Bytes>(CHANNEL_CAPACITY);

    tokio::spawn(async move {
        if let Some(header) = header {
            if tx.send(Bytes::from(header)).await.is_err() {
                debug!("Client disconnected before the stream started");
                return;
            }
        }

        while let Some(fragment) = fragments.next().await {
            match fragment {
                Ok(text) => {
                    if tx.send(Bytes::from(text)).await.is_err() {
                        debug!("Client disconnected, stopping stream");
                        return;
                    }
                }
                Err(e) => {
                    error!("Generation stream failed mid-response: {e}");
                    // Too late to change the status; the 200 is already on
                    // the wire. Make the truncation visible instead.
                    let _ = tx.send(Bytes::from(INTERRUPTED_MARKER)).await;
                    return;
                }
            }
        }
    });

    rx
}

/// Wraps the relay's consumer end as a streaming response body.
pub fn body_from_receiver(rx: mpsc::Receiver<Bytes>) -> Body {
    Body::from_stream(ReceiverStream::new(rx).map(Ok::<_, Infallible>))
}

// ────────────────────────────────────────────────────────────────────────────
// Tests
// ────────────────────────────────────────────────────────────────────────────
