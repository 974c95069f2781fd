/// LLM client: the single point of entry for all Gemini API calls in the
/// tax assistant.
///
/// ARCHITECTURAL RULE: No other module may call the Gemini API directly.
/// All generation calls MUST go through this module.
use std::pin::Pin;
use std::time::Duration;

use async_trait::async_trait;
use futures_util::{Stream, StreamExt};
use reqwest::Client;
use serde::{Deserialize, Serialize};
use thiserror::Error;
use tokio_util::codec::{FramedRead, LinesCodec};
use tokio_util::io::StreamReader;
use tracing::debug;

use crate::config::Config;

pub mod prompts;

const GEMINI_API_BASE: &str = "https://generativelanguage.googleapis.com/v1beta";
const TOP_P: f64 = 0.9;
const TOP_K: u32 = 40;
const MAX_OUTPUT_TOKENS: u32 = 1024;
/// Upper bound for a single SSE line; anything longer is a protocol error.
const MAX_SSE_LINE_BYTES: usize = 1024 * 1024;

#[derive(Debug, Error)]
pub enum LlmError {
    #[error("Gemini API key is not configured")]
    MissingCredentials,

    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    #[error("API error (status {status}): {message}")]
    Api { status: u16, message: String },

    #[error("Stream error: {0}")]
    Stream(String),

    #[error("JSON parse error: {0}")]
    Parse(#[from] serde_json::Error),

    #[error("LLM returned empty content")]
    EmptyContent,
}

/// A stream of model text fragments in upstream arrival order.
pub type TokenStream = Pin<Box<dyn Stream<Item = Result<String, LlmError>> + Send>>;

/// Generation seam held by `AppState` as a trait object so tests can swap
/// the real Gemini client for a scripted fake.
#[async_trait]
pub trait TextGenerator: Send + Sync {
    /// Opens a streaming generation call. An `Err` here happens before any
    /// fragment is produced; later failures arrive as `Err` items inside
    /// the returned stream.
    async fn stream(&self, prompt: &str, system: &str) -> Result<TokenStream, LlmError>;

    /// Single-shot generation call, used for structured (non-streamed) output.
    async fn complete(&self, prompt: &str, system: &str) -> Result<String, LlmError>;
}

#[derive(Debug, Serialize)]
struct GeminiRequest<'a> {
    contents: Vec<Content<'a>>,
    #[serde(rename = "systemInstruction")]
    system_instruction: SystemInstruction<'a>,
    #[serde(rename = "generationConfig")]
    generation_config: GenerationConfig,
}

#[derive(Debug, Serialize)]
struct Content<'a> {
    parts: Vec<Part<'a>>,
}

#[derive(Debug, Serialize)]
struct SystemInstruction<'a> {
    parts: Vec<Part<'a>>,
}

#[derive(Debug, Serialize)]
struct Part<'a> {
    text: &'a str,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct GenerationConfig {
    temperature: f64,
    top_p: f64,
    top_k: u32,
    max_output_tokens: u32,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct GeminiResponse {
    #[serde(default)]
    candidates: Vec<Candidate>,
    usage_metadata: Option<UsageMetadata>,
}

#[derive(Debug, Deserialize)]
struct Candidate {
    content: Option<CandidateContent>,
}

#[derive(Debug, Deserialize)]
struct CandidateContent {
    #[serde(default)]
    parts: Vec<CandidatePart>,
}

#[derive(Debug, Deserialize)]
struct CandidatePart {
    text: Option<String>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct UsageMetadata {
    #[serde(default)]
    prompt_token_count: u32,
    #[serde(default)]
    candidates_token_count: u32,
}

impl GeminiResponse {
    /// Concatenates the text parts of the first candidate.
    /// `None` when the chunk carries no text (metadata-only chunks).
    fn text(&self) -> Option<String> {
        let content = self.candidates.first()?.content.as_ref()?;
        let text: String = content
            .parts
            .iter()
            .filter_map(|p| p.text.as_deref())
            .collect();
        if text.is_empty() {
            None
        } else {
            Some(text)
        }
    }
}

#[derive(Debug, Deserialize)]
struct GeminiError {
    error: GeminiErrorBody,
}

#[derive(Debug, Deserialize)]
struct GeminiErrorBody {
    message: String,
}

/// The single Gemini client used by all services in the tax assistant.
/// No retry or backoff: a failed call surfaces immediately so the caller
/// can fall back to its placeholder response.
#[derive(Clone)]
pub struct GeminiClient {
    client: Client,
    api_key: Option<String>,
    base_url: String,
    model: String,
    temperature: f64,
}

impl GeminiClient {
    pub fn new(config: &Config) -> Self {
        Self {
            // Connect timeout only. No whole-request timeout: advice streams
            // stay open for as long as the model keeps talking.
            client: Client::builder()
                .connect_timeout(Duration::from_secs(10))
                .pool_idle_timeout(Duration::from_secs(90))
                .pool_max_idle_per_host(8)
                .build()
                .expect("Failed to build HTTP client"),
            api_key: config.gemini_api_key.clone(),
            base_url: GEMINI_API_BASE.to_string(),
            model: config.gemini_model.clone(),
            temperature: config.gemini_temperature,
        }
    }

    /// Sends a generation request and verifies the response status.
    /// The key travels in the `x-goog-api-key` header, never the URL, so it
    /// cannot leak through logged request errors.
    async fn send(
        &self,
        url: &str,
        prompt: &str,
        system: &str,
    ) -> Result<reqwest::Response, LlmError> {
        let api_key = self
            .api_key
            .as_deref()
            .ok_or(LlmError::MissingCredentials)?;

        let request_body = GeminiRequest {
            contents: vec![Content {
                parts: vec![Part { text: prompt }],
            }],
            system_instruction: SystemInstruction {
                parts: vec![Part { text: system }],
            },
            generation_config: GenerationConfig {
                temperature: self.temperature,
                top_p: TOP_P,
                top_k: TOP_K,
                max_output_tokens: MAX_OUTPUT_TOKENS,
            },
        };

        let response = self
            .client
            .post(url)
            .header("x-goog-api-key", api_key)
            .header("content-type", "application/json")
            .json(&request_body)
            .send()
            .await?;

        let status = response.status();

        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            // Try to parse error message
            let message = serde_json::from_str::<GeminiError>(&body)
                .map(|e| e.error.message)
                .unwrap_or(body);
            return Err(LlmError::Api {
                status: status.as_u16(),
                message,
            });
        }

        Ok(response)
    }
}

#[async_trait]
impl TextGenerator for GeminiClient {
    async fn stream(&self, prompt: &str, system: &str) -> Result<TokenStream, LlmError> {
        let url = format!(
            "{}/models/{}:streamGenerateContent?alt=sse",
            self.base_url, self.model
        );
        let response = self.send(&url, prompt, system).await?;

        let reader = StreamReader::new(
            response
                .bytes_stream()
                .map(|chunk| chunk.map_err(std::io::Error::other)),
        );
        let lines = FramedRead::new(reader, LinesCodec::new_with_max_length(MAX_SSE_LINE_BYTES));

        let fragments = lines.filter_map(|line| async move {
            match line {
                Ok(line) => decode_sse_line(&line).transpose(),
                Err(e) => Some(Err(LlmError::Stream(e.to_string()))),
            }
        });

        Ok(Box::pin(fragments))
    }

    async fn complete(&self, prompt: &str, system: &str) -> Result<String, LlmError> {
        let url = format!("{}/models/{}:generateContent", self.base_url, self.model);
        let response = self.send(&url, prompt, system).await?;

        let body: GeminiResponse = response.json().await?;

        if let Some(usage) = &body.usage_metadata {
            debug!(
                "Generation call succeeded: prompt_tokens={}, output_tokens={}",
                usage.prompt_token_count, usage.candidates_token_count
            );
        }

        body.text().ok_or(LlmError::EmptyContent)
    }
}

/// Decodes one line of a `streamGenerateContent?alt=sse` response.
/// Returns `Ok(None)` for lines that carry no text: blank keep-alives,
/// non-`data:` fields, and metadata-only chunks.
fn decode_sse_line(line: &str) -> Result<Option<String>, LlmError> {
    let Some(payload) = line.strip_prefix("data: ") else {
        return Ok(None);
    };
    if payload.trim() == "[DONE]" {
        return Ok(None);
    }

    let chunk: GeminiResponse = serde_json::from_str(payload)?;
    Ok(chunk.text())
}

/// Strips ```json ... ``` or ``` ... ``` code fences from LLM output.
pub(crate) fn strip_json_fences(text: &str) -> &str {
    let text = text.trim();
    if let Some(stripped) = text.strip_prefix("```json") {
        stripped
            .trim_start()
            .strip_suffix("```")
            .map(|s| s.trim())
            .unwrap_or(stripped.trim_start())
    } else if let Some(stripped) = text.strip_prefix("```") {
        stripped
            .trim_start()
            .strip_suffix("```")
            .map(|s| s.trim())
            .unwrap_or(stripped.trim_start())
    } else {
        text
    }
}
