use crate::tool_parser::{
    errors::ParserResult,
    types::{StreamDelta, ToolCall},
};

/// Core trait for parsers that recover tool calls from a complete response
pub trait ToolParser: Send + Sync {
    /// Parse complete tool calls from final output
    /// Returns (leading_normal_text, tool_calls) tuple
    fn parse_complete(&self, output: &str) -> ParserResult<(String, Vec<ToolCall>)>;

    /// Check if text contains tool calls in this parser's format
    fn has_tool_markers(&self, text: &str) -> bool;
}

/// Trait for parsers fed one increment at a time by a streaming session.
///
/// Implementations keep per-stream state, so one instance serves exactly one
/// logical stream.
pub trait StreamingToolParser: Send {
    /// Inspect the stream after one increment arrived.
    ///
    /// # Arguments
    /// * `previous_text` - Buffered text before this increment
    /// * `current_text` - Full buffered text including this increment
    /// * `delta_text` - Just the new characters of this increment
    ///
    /// Returns at most one delta per call.
    fn extract_stream_delta(
        &mut self,
        previous_text: &str,
        current_text: &str,
        delta_text: &str,
    ) -> Option<StreamDelta>;

    /// Final scan of the full buffer at stream close.
    /// Returns every tool call still eligible, in buffer order.
    fn flush(&mut self, full_text: &str) -> Vec<StreamDelta>;

    /// Reset the parser state for reuse across streams
    fn reset(&mut self);
}
