// OpenAI-compatible chat completion types used at the bridge boundary
pub mod chat;
