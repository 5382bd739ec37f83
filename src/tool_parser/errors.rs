use thiserror::Error;

/// Result type for tool parser operations
pub type ParserResult<T> = Result<T, ParserError>;

/// Errors that can occur while recovering a single tool call.
///
/// These never leave the extractors: a failing block is logged and skipped.
#[derive(Debug, Error)]
pub enum ParserError {
    #[error("Parsing failed: {0}")]
    ParsingFailed(String),

    #[error("No function declaration found in tool call block")]
    MissingFunction,

    #[error("Missing '>' terminator after {0}")]
    MissingTerminator(&'static str),

    #[error("Invalid JSON: {0}")]
    JsonError(#[from] serde_json::Error),
}
