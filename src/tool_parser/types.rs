use serde::{Deserialize, Serialize};

fn default_tool_type() -> String {
    "function".to_string()
}

/// Tool call recovered from model output, in the client-facing schema
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct ToolCall {
    /// Call identifier (assigned by the assembler or the streaming parser)
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub id: Option<String>,
    /// Always "function"
    #[serde(rename = "type", default = "default_tool_type")]
    pub tool_type: String,
    /// Function call details
    pub function: FunctionCall,
}

impl ToolCall {
    pub fn new(name: impl Into<String>, arguments: impl Into<String>) -> Self {
        Self {
            id: None,
            tool_type: default_tool_type(),
            function: FunctionCall {
                name: name.into(),
                arguments: arguments.into(),
            },
        }
    }
}

/// Function call within a tool call
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct FunctionCall {
    /// Name of the function to call
    pub name: String,
    /// Arguments as a JSON object string
    pub arguments: String,
}

/// Normalized result of translating one complete response.
///
/// When both fields are empty the caller must treat the original text as
/// plain content; `ResponseAssembler` already applies that fallback.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
pub struct TranslationResult {
    pub content: String,
    pub tool_calls: Vec<ToolCall>,
}

impl TranslationResult {
    pub fn has_tool_calls(&self) -> bool {
        !self.tool_calls.is_empty()
    }
}

/// Tool call fragment carried by a streaming delta
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct ToolCallDelta {
    pub index: u32,
    pub id: String,
    #[serde(rename = "type")]
    pub tool_type: String,
    pub function: FunctionCall,
}

/// What a streaming parser hands back for one received increment
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(untagged)]
pub enum StreamDelta {
    ToolCalls { tool_calls: Vec<ToolCallDelta> },
    Content { content: String },
    /// Carries nothing; the closing chunk of a stream uses it
    Empty {},
}

impl StreamDelta {
    pub fn tool_call(id: String, name: String, arguments: String) -> Self {
        StreamDelta::ToolCalls {
            tool_calls: vec![ToolCallDelta {
                index: 0,
                id,
                tool_type: default_tool_type(),
                function: FunctionCall { name, arguments },
            }],
        }
    }

    pub fn content(text: impl Into<String>) -> Self {
        StreamDelta::Content {
            content: text.into(),
        }
    }

    /// First tool call carried by this delta, if any
    pub fn as_tool_call(&self) -> Option<&ToolCallDelta> {
        match self {
            StreamDelta::ToolCalls { tool_calls } => tool_calls.first(),
            StreamDelta::Content { .. } | StreamDelta::Empty {} => None,
        }
    }

    pub fn as_content(&self) -> Option<&str> {
        match self {
            StreamDelta::Content { content } => Some(content),
            StreamDelta::ToolCalls { .. } | StreamDelta::Empty {} => None,
        }
    }
}

/// Fenced tool block found complete in a stream buffer
#[derive(Debug, Clone, PartialEq)]
pub struct CompletedBlock {
    pub name: String,
    /// Raw string arguments in document order
    pub args: serde_json::Map<String, serde_json::Value>,
    /// Tool name joined with the SHA-256 of the raw block body
    pub fingerprint: String,
}
