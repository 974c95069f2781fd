// One-step tool loop for question answering: ask the model whether the
// question needs current official information, run the search if so, and
// format the hits for the prompt.

use serde::Deserialize;
use tracing::{debug, warn};

use crate::advice::prompts::{build_search_decision_prompt, format_sources};
use crate::llm_client::prompts::JSON_ONLY_SYSTEM;
use crate::llm_client::{strip_json_fences, TextGenerator};
use crate::search::SearchProvider;

#[derive(Debug, Deserialize)]
struct SearchDecision {
    needs_search: bool,
    #[serde(default)]
    query: String,
}

/// Decides whether the question needs a live lookup and, if so, runs it.
/// Returns the formatted sources block for the question prompt.
///
/// `None` means "answer without search context": search not configured,
/// not needed, or any step failed. A broken search tool never breaks the
/// answer, so every failure here is logged and swallowed.
pub async fn gather_search_context(
    generator: &dyn TextGenerator,
    search: Option<&dyn SearchProvider>,
    question: &str,
) -> Option<String> {
    let search = search?;

    if question.trim().is_empty() {
        return None;
    }

    let prompt = build_search_decision_prompt(question);
    let raw = match generator.complete(&prompt, JSON_ONLY_SYSTEM).await {
        Ok(raw) => raw,
        Err(e) => {
            warn!("Search decision call failed, answering without search: {e}");
            return None;
        }
    };

    let decision: SearchDecision = match serde_json::from_str(strip_json_fences(&raw)) {
        Ok(decision) => decision,
        Err(e) => {
            warn!("Search decision was not valid JSON, answering without search: {e}");
            return None;
        }
    };

    if !decision.needs_search || decision.query.trim().is_empty() {
        debug!("No search needed for this question");
        return None;
    }

    let results = match search.search(&decision.query).await {
        Ok(results) => results,
        Err(e) => {
            warn!("Search failed, answering without search: {e}");
            return None;
        }
    };

    debug!(
        "Search returned {} results for '{}'",
        results.len(),
        decision.query
    );

    format_sources(&results)
}

// ────────────────────────────────────────────────────────────────────────────
// Tests
// ────────────────────────────────────────────────────────────────────────────
