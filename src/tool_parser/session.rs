use tracing::debug;

use crate::tool_parser::{parsers::FencedStreamParser, traits::StreamingToolParser, types::StreamDelta};

/// One logical stream: the growing buffer plus the parser watching it.
///
/// Feed every received increment to [`StreamSession::push`], then call
/// [`StreamSession::finish`] when the upstream stream ends. Skipping `finish`
/// silently loses blocks that completed in the last increments, because
/// `push` emits at most one tool call per increment.
///
/// Dropping a session never releases an edit it put in flight; the edit
/// applier owns that.
pub struct StreamSession<P: StreamingToolParser = FencedStreamParser> {
    parser: P,
    buffer: String,
}

impl<P: StreamingToolParser> StreamSession<P> {
    pub fn new(parser: P) -> Self {
        Self {
            parser,
            buffer: String::new(),
        }
    }

    /// Append `chunk` and return the delta for this increment, if any
    pub fn push(&mut self, chunk: &str) -> Option<StreamDelta> {
        let previous_len = self.buffer.len();
        self.buffer.push_str(chunk);
        let (previous, _) = self.buffer.split_at(previous_len);
        self.parser
            .extract_stream_delta(previous, &self.buffer, chunk)
    }

    /// Full text received so far
    pub fn buffer(&self) -> &str {
        &self.buffer
    }

    pub fn parser(&self) -> &P {
        &self.parser
    }

    /// Scan the whole buffer and return every tool call that is eligible now.
    /// Edits deferred here can still surface on a later call once the
    /// in-flight edit has been released.
    pub fn flush(&mut self) -> Vec<StreamDelta> {
        self.parser.flush(&self.buffer)
    }

    /// Close the stream: one final [`StreamSession::flush`]
    pub fn finish(mut self) -> Vec<StreamDelta> {
        let deltas = self.flush();
        debug!(
            buffered = self.buffer.len(),
            flushed = deltas.len(),
            "Stream session closed"
        );
        deltas
    }
}
