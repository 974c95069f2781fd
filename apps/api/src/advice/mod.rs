// Tax advice engine: request validation and arithmetic, prompt assembly,
// the one-step search agent, and the streaming relay behind both POST routes.
// All LLM calls go through llm_client; nothing here talks to Gemini directly.

pub mod agent;
pub mod calculator;
pub mod handlers;
pub mod prompts;
pub mod streamer;
