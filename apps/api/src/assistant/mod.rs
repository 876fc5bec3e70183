// AI writing assistant: summaries, bullet points, skill suggestions,
// cover letters and PDF import. All LLM calls go through llm_client.

pub mod generator;
pub mod handlers;
pub mod import;
pub mod prompts;
