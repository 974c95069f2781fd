// Shared prompt constants and prompt-building utilities.
// Each service that needs LLM calls defines its own prompts.rs alongside it.
// This file contains cross-cutting prompt fragments.

/// System prompt for every advice-generating call.
pub const TAX_ADVISOR_SYSTEM: &str = "You are a professional tax advisor for individuals. \
    All monetary amounts are yearly figures in euros. \
    Write clear, practical guidance in Markdown. \
    Always close with a one-line reminder that this is AI-generated guidance, \
    not professional tax advice.";

/// System prompt fragment that enforces JSON-only output.
pub const JSON_ONLY_SYSTEM: &str = "You are a precise, structured assistant. \
    You MUST respond with valid JSON only. \
    Do NOT include any text outside the JSON object. \
    Do NOT use markdown code fences. \
    Do NOT include explanations or apologies.";
