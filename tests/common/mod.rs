//! Shared helpers for the integration tests

#![allow(dead_code)]

use std::sync::Arc;

use serde_json::{json, Value};
use tool_call_bridge::{
    protocols::chat::{Function, Tool},
    tool_parser::{EditCoordinator, FencedStreamParser, StreamDelta, StreamSession, ToolSchemas},
};

/// Split input into fixed char-level chunks the way tokens arrive
pub fn create_char_chunks(input: &str, size: usize) -> Vec<String> {
    let chars: Vec<char> = input.chars().collect();
    chars.chunks(size).map(|c| c.iter().collect()).collect()
}

/// Render a fenced tool block with the given string arguments
pub fn fenced_block(name: &str, args: &[(&str, &str)]) -> String {
    let mut block = format!("```tool\nTOOL_NAME: {}\n", name);
    for (key, value) in args {
        block.push_str(&format!("BEGIN_ARG: {}\n{}\nEND_ARG\n", key, value));
    }
    block.push_str("```\n");
    block
}

/// Fresh session bound to `coordinator`
pub fn session_with(coordinator: &Arc<EditCoordinator>) -> StreamSession {
    StreamSession::new(FencedStreamParser::new(Arc::clone(coordinator)))
}

/// Feed every chunk, collecting all deltas including the final flush
pub fn replay(session: StreamSession, chunks: &[String]) -> Vec<StreamDelta> {
    let mut session = session;
    let mut deltas: Vec<StreamDelta> = chunks.iter().filter_map(|c| session.push(c)).collect();
    deltas.extend(session.finish());
    deltas
}

/// Names of the tool calls among `deltas`, in order
pub fn tool_names(deltas: &[StreamDelta]) -> Vec<String> {
    deltas
        .iter()
        .filter_map(StreamDelta::as_tool_call)
        .map(|call| call.function.name.clone())
        .collect()
}

/// Concatenated content deltas
pub fn content_of(deltas: &[StreamDelta]) -> String {
    deltas.iter().filter_map(StreamDelta::as_content).collect()
}

/// Mark the current edit as applied the way the edit applier does
pub fn apply_pending_edit(coordinator: &EditCoordinator) -> Option<String> {
    let payload = coordinator.dequeue();
    coordinator.clear_in_flight();
    payload
}

pub fn parse_args(arguments: &str) -> Value {
    serde_json::from_str(arguments).expect("arguments should be valid JSON")
}

pub fn create_test_tools() -> Vec<Tool> {
    vec![
        Tool {
            tool_type: "function".to_string(),
            function: Function {
                name: "get_weather".to_string(),
                description: Some("Get the weather for a city".to_string()),
                parameters: json!({
                    "type": "object",
                    "properties": {
                        "city": {"type": "string"},
                        "days": {"type": "integer"},
                        "metric": {"type": "boolean"}
                    },
                    "required": ["city"]
                }),
            },
        },
        Tool {
            tool_type: "function".to_string(),
            function: Function {
                name: "edit_file".to_string(),
                description: Some("Apply changes to a file".to_string()),
                parameters: json!({
                    "type": "object",
                    "properties": {
                        "file_path": {"type": "string"},
                        "changes": {"type": "string"}
                    }
                }),
            },
        },
    ]
}

pub fn create_test_schemas() -> ToolSchemas {
    ToolSchemas::from_tools(&create_test_tools())
}
