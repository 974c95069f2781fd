//! Axum route handlers for the Advice API.

use axum::{
    body::Body,
    extract::State,
    http::{header, HeaderValue},
    response::{IntoResponse, Response},
    Json,
};
use serde::Serialize;
use tracing::warn;

use crate::advice::agent::gather_search_context;
use crate::advice::calculator::{validate_and_compute, QuestionRequest, TaxComputation, TaxRequest};
use crate::advice::prompts::{build_advice_prompt, build_question_prompt};
use crate::advice::streamer::{body_from_receiver, header_line, spawn_relay};
use crate::errors::AppError;
use crate::llm_client::prompts::TAX_ADVISOR_SYSTEM;
use crate::state::AppState;

// ────────────────────────────────────────────────────────────────────────────
// Request / Response types
// ────────────────────────────────────────────────────────────────────────────

/// Advice text used when the model was never reached.
const PLACEHOLDER_ADVICE: &str = "This is a placeholder for AI advice.";

/// Single-shot body returned when the stream cannot start. The computed
/// numbers are still correct; only the advice is a placeholder.
#[derive(Debug, Serialize)]
pub struct FallbackResponse {
    pub taxable_income: f64,
    pub estimated_tax: f64,
    pub advice: String,
}

// ────────────────────────────────────────────────────────────────────────────
// Handlers
// ────────────────────────────────────────────────────────────────────────────

/// POST /calculate-tax
///
/// Validates the figures, then streams one JSON header line with the
/// computed numbers followed by Markdown advice fragments as the model
/// produces them. When the stream cannot start, degrades to a single JSON
/// body with placeholder advice and the same numbers, still with status 200.
pub async fn handle_calculate_tax(
    State(state): State<AppState>,
    Json(request): Json<TaxRequest>,
) -> Result<Response, AppError> {
    let computed = validate_and_compute(&request, state.config.tax_rate)?;
    let prompt = build_advice_prompt(&request, &computed);

    match state.generator.stream(&prompt, TAX_ADVISOR_SYSTEM).await {
        Ok(fragments) => {
            let header = header_line(&computed).map_err(anyhow::Error::from)?;
            let rx = spawn_relay(Some(header), fragments);
            Ok(stream_response(body_from_receiver(rx)))
        }
        Err(e) => {
            warn!("Advice stream could not start, falling back: {e}");
            Ok(Json(fallback_body(&computed)).into_response())
        }
    }
}

/// POST /ask-question
///
/// Same validation and figures as /calculate-tax, plus an optional search
/// step for questions that need current official information. Streams raw
/// text fragments with no header line. An empty question is allowed and
/// still produces streamed general guidance.
pub async fn handle_ask_question(
    State(state): State<AppState>,
    Json(request): Json<QuestionRequest>,
) -> Result<Response, AppError> {
    let computed = validate_and_compute(&request.tax, state.config.tax_rate)?;

    let sources_block = gather_search_context(
        state.generator.as_ref(),
        state.search.as_deref(),
        &request.question,
    )
    .await;

    let prompt = build_question_prompt(
        &request.tax,
        &computed,
        &request.question,
        sources_block.as_deref(),
    );

    match state.generator.stream(&prompt, TAX_ADVISOR_SYSTEM).await {
        Ok(fragments) => {
            let rx = spawn_relay(None, fragments);
            Ok(stream_response(body_from_receiver(rx)))
        }
        Err(e) => {
            warn!("Question stream could not start, falling back: {e}");
            Ok(Json(fallback_body(&computed)).into_response())
        }
    }
}

/// Streamed fragments go out as `text/plain`; the JSON header line of
/// /calculate-tax is a convention of the stream, not a content type.
fn stream_response(body: Body) -> Response {
    let mut response = Response::new(body);
    response.headers_mut().insert(
        header::CONTENT_TYPE,
        HeaderValue::from_static("text/plain; charset=utf-8"),
    );
    response
}

fn fallback_body(computed: &TaxComputation) -> FallbackResponse {
    FallbackResponse {
        taxable_income: computed.taxable_income,
        estimated_tax: computed.estimated_tax,
        advice: PLACEHOLDER_ADVICE.to_string(),
    }
}

// ────────────────────────────────────────────────────────────────────────────
// Tests
// ────────────────────────────────────────────────────────────────────────────
