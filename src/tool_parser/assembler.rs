use serde_json::Value;
use tracing::{debug, warn};

use crate::{
    config::ParserConfig,
    protocols::chat::{
        AssistantMessage, ChatChoice, ChatCompletionChunk, ChatCompletionResponse,
        ChatStreamChoice, UpstreamCompletion,
    },
    tool_parser::{
        coercion::{ArgumentCoercer, ToolSchemas},
        parsers::QwenCoderParser,
        traits::ToolParser,
        types::{StreamDelta, ToolCall, TranslationResult},
    },
};

/// Packages extractor output into the shapes the client consumes.
///
/// Batch text goes through the parser, then argument coercion against the
/// request's tool schemas, then id assignment (`call_0`, `call_1`, ...).
pub struct ResponseAssembler<P: ToolParser = QwenCoderParser> {
    parser: P,
    coercer: ArgumentCoercer,
    schemas: ToolSchemas,
}

impl ResponseAssembler {
    pub fn new(config: &ParserConfig) -> Self {
        Self::with_parser(QwenCoderParser::new(), config)
    }

    /// Wrap one streaming delta into a `chat.completion.chunk`.
    ///
    /// Delta chunks never carry a finish reason; the stream ends with
    /// [`ResponseAssembler::final_chunk`].
    pub fn stream_chunk(
        id: &str,
        model: &str,
        created: u64,
        delta: StreamDelta,
    ) -> ChatCompletionChunk {
        Self::chunk(id, model, created, delta, None)
    }

    /// Closing chunk of a stream: empty delta plus the finish reason
    pub fn final_chunk(
        id: &str,
        model: &str,
        created: u64,
        had_tool_calls: bool,
    ) -> ChatCompletionChunk {
        let finish_reason = if had_tool_calls { "tool_calls" } else { "stop" };
        Self::chunk(
            id,
            model,
            created,
            StreamDelta::Empty {},
            Some(finish_reason.to_string()),
        )
    }

    fn chunk(
        id: &str,
        model: &str,
        created: u64,
        delta: StreamDelta,
        finish_reason: Option<String>,
    ) -> ChatCompletionChunk {
        ChatCompletionChunk {
            id: id.to_string(),
            object: "chat.completion.chunk".to_string(),
            created,
            model: model.to_string(),
            choices: vec![ChatStreamChoice {
                index: 0,
                delta,
                finish_reason,
            }],
        }
    }
}

impl<P: ToolParser> ResponseAssembler<P> {
    pub fn with_parser(parser: P, config: &ParserConfig) -> Self {
        Self {
            parser,
            coercer: ArgumentCoercer::new(config.edit_tools.iter().cloned()),
            schemas: ToolSchemas::new(),
        }
    }

    /// Coerce arguments against these schemas
    pub fn with_schemas(mut self, schemas: ToolSchemas) -> Self {
        self.schemas = schemas;
        self
    }

    /// Translate one complete response text
    pub fn translate(&self, text: &str) -> TranslationResult {
        let (content, calls) = match self.parser.parse_complete(text) {
            Ok(parsed) => parsed,
            Err(e) => {
                warn!("Tool call parsing failed, passing text through: {}", e);
                (String::new(), Vec::new())
            }
        };

        let tool_calls: Vec<ToolCall> = self
            .coercer
            .coerce_all(calls, &self.schemas)
            .into_iter()
            .enumerate()
            .map(|(i, mut call)| {
                call.id = Some(format!("call_{}", i));
                call
            })
            .collect();

        // Nothing recovered at all: the original text is the reply
        let content = if content.is_empty() && tool_calls.is_empty() {
            text.to_string()
        } else {
            content
        };

        TranslationResult {
            content,
            tool_calls,
        }
    }

    /// Translate upstream message content; anything but a string yields an empty result
    pub fn translate_value(&self, content: &Value) -> TranslationResult {
        match content {
            Value::String(text) => self.translate(text),
            _ => TranslationResult::default(),
        }
    }

    /// Build the client response for an upstream completion.
    ///
    /// Upstream messages that already carry structured tool calls bypass
    /// extraction.
    pub fn assemble_completion(
        &self,
        upstream: &UpstreamCompletion,
        model: &str,
    ) -> ChatCompletionResponse {
        let message = upstream.choices.first().map(|choice| &choice.message);
        let result = match message {
            Some(message) if message.tool_calls.as_ref().is_some_and(|c| !c.is_empty()) => {
                debug!("Upstream returned native tool calls, skipping extraction");
                TranslationResult {
                    content: message.content.as_str().unwrap_or_default().to_string(),
                    tool_calls: message.tool_calls.clone().unwrap_or_default(),
                }
            }
            Some(message) => self.translate_value(&message.content),
            None => TranslationResult::default(),
        };

        let finish_reason = if result.has_tool_calls() {
            "tool_calls"
        } else {
            "stop"
        };
        let tool_calls = result.has_tool_calls().then_some(result.tool_calls);

        ChatCompletionResponse {
            id: upstream.id.clone(),
            object: "chat.completion".to_string(),
            created: upstream.created,
            model: model.to_string(),
            choices: vec![ChatChoice {
                index: 0,
                message: AssistantMessage {
                    role: "assistant".to_string(),
                    content: result.content,
                    tool_calls,
                },
                finish_reason: finish_reason.to_string(),
            }],
            usage: upstream.usage.clone().unwrap_or_default(),
        }
    }
}
