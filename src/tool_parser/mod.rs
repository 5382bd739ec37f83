/// Tool parser module for recovering function/tool calls from model outputs
///
/// Batch responses use the Qwen Coder XML encoding, streams use fenced
/// line-oriented blocks. Both feed the same argument coercion and response
/// assembly.
pub mod assembler;
pub mod coercion;
pub mod edit_coordinator;
pub mod errors;
pub mod parsers;
pub mod session;
pub mod traits;
pub mod types;

// Re-export types used outside this module
pub use assembler::ResponseAssembler;
pub use coercion::{ArgumentCoercer, ToolSchemas};
pub use edit_coordinator::EditCoordinator;
pub use errors::{ParserError, ParserResult};
pub use parsers::{FencedStreamParser, QwenCoderParser};
pub use session::StreamSession;
pub use traits::{StreamingToolParser, ToolParser};
pub use types::{
    CompletedBlock, FunctionCall, StreamDelta, ToolCall, ToolCallDelta, TranslationResult,
};
