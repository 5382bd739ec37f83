//! Response Assembler and Config Integration Tests
//!
//! Client-facing response shapes, streaming chunk wrapping and config loading

use std::{fs, sync::Arc};

use serde_json::{json, Value};
use tool_call_bridge::{
    config::{BridgeConfig, ConfigError},
    protocols::chat::UpstreamCompletion,
    tool_parser::{EditCoordinator, ResponseAssembler, StreamDelta},
};

mod common;
use common::{fenced_block, session_with};

#[test]
fn test_upstream_json_round_trip_through_assembler() {
    let upstream: UpstreamCompletion = serde_json::from_value(json!({
        "id": "cmpl-9",
        "created": 1_700_000_123u64,
        "choices": [{
            "message": {
                "role": "assistant",
                "content": "On it.\n<tool_call>\n<function=run>\n<parameter=cmd>cargo fmt</parameter>\n</function>\n</tool_call>"
            },
            "finish_reason": "stop"
        }],
        "usage": {"prompt_tokens": 10, "completion_tokens": 4, "total_tokens": 14}
    }))
    .unwrap();

    let assembler = ResponseAssembler::new(&BridgeConfig::default().parser);
    let response = assembler.assemble_completion(&upstream, "coder");
    let body = serde_json::to_value(&response).unwrap();

    assert_eq!(body["id"], "cmpl-9");
    assert_eq!(body["object"], "chat.completion");
    assert_eq!(body["created"], 1_700_000_123u64);
    assert_eq!(body["choices"][0]["finish_reason"], "tool_calls");
    assert_eq!(body["choices"][0]["message"]["role"], "assistant");
    assert_eq!(body["choices"][0]["message"]["content"], "On it.");
    let call = &body["choices"][0]["message"]["tool_calls"][0];
    assert_eq!(call["id"], "call_0");
    assert_eq!(call["type"], "function");
    assert_eq!(call["function"]["name"], "run");
    assert_eq!(call["function"]["arguments"], "{\"cmd\": \"cargo fmt\"}");
    assert_eq!(body["usage"]["total_tokens"], 14);
}

#[test]
fn test_empty_choices_produce_stop_with_no_content() {
    let assembler = ResponseAssembler::new(&BridgeConfig::default().parser);
    let response = assembler.assemble_completion(&UpstreamCompletion::default(), "m");
    assert_eq!(response.choices[0].finish_reason, "stop");
    assert!(response.choices[0].message.content.is_empty());
}

#[test]
fn test_stream_deltas_wrap_into_chunks() {
    let coordinator = Arc::new(EditCoordinator::new());
    let mut session = session_with(&coordinator);

    let text_delta = session.push("Reading file\n").unwrap();
    let tool_delta = session
        .push(&fenced_block("read_file", &[("filepath", "a.txt")]))
        .unwrap();
    let trailing_delta = session.push("Now checking the result.").unwrap();

    let chunk = ResponseAssembler::stream_chunk("chatcmpl-s", "coder", 1, text_delta);
    let body = serde_json::to_value(&chunk).unwrap();
    assert_eq!(body["object"], "chat.completion.chunk");
    assert_eq!(body["choices"][0]["delta"], json!({"content": "Reading file\n"}));
    assert!(body["choices"][0].get("finish_reason").is_none());

    let chunk = ResponseAssembler::stream_chunk("chatcmpl-s", "coder", 1, tool_delta);
    let body = serde_json::to_value(&chunk).unwrap();
    assert!(body["choices"][0].get("finish_reason").is_none());
    let call = &body["choices"][0]["delta"]["tool_calls"][0];
    assert_eq!(call["index"], 0);
    assert_eq!(call["type"], "function");
    assert_eq!(call["function"]["name"], "read_file");
    assert_eq!(call["function"]["arguments"], "{\"filepath\": \"a.txt\"}");

    // Content after a tool call still streams as an open chunk
    let chunk = ResponseAssembler::stream_chunk("chatcmpl-s", "coder", 1, trailing_delta);
    let body = serde_json::to_value(&chunk).unwrap();
    assert!(body["choices"][0].get("finish_reason").is_none());

    let chunk = ResponseAssembler::final_chunk("chatcmpl-s", "coder", 1, true);
    let body = serde_json::to_value(&chunk).unwrap();
    assert_eq!(body["choices"][0]["delta"], json!({}));
    assert_eq!(body["choices"][0]["finish_reason"], "tool_calls");
}

#[test]
fn test_content_only_stream_finishes_with_stop() {
    let coordinator = Arc::new(EditCoordinator::new());
    let mut session = session_with(&coordinator);
    let delta = session.push("Nothing to call here.").unwrap();

    let chunk = ResponseAssembler::stream_chunk("chatcmpl-t", "coder", 2, delta);
    let body = serde_json::to_value(&chunk).unwrap();
    assert!(body["choices"][0].get("finish_reason").is_none());

    let chunk = ResponseAssembler::final_chunk("chatcmpl-t", "coder", 2, false);
    let body = serde_json::to_value(&chunk).unwrap();
    assert_eq!(body["choices"][0]["delta"], json!({}));
    assert_eq!(body["choices"][0]["finish_reason"], "stop");
}

#[test]
fn test_stream_delta_deserializes_from_wire_shape() {
    let delta: StreamDelta = serde_json::from_value(json!({"content": "hi"})).unwrap();
    assert_eq!(delta.as_content(), Some("hi"));

    let delta: StreamDelta = serde_json::from_value(json!({
        "tool_calls": [{
            "index": 0,
            "id": "call_abc",
            "type": "function",
            "function": {"name": "ls", "arguments": "{}"}
        }]
    }))
    .unwrap();
    assert_eq!(delta.as_tool_call().unwrap().id, "call_abc");
}

#[test]
fn test_config_file_drives_parser_settings() {
    let dir = std::env::temp_dir().join(format!("tool-call-bridge-test-{}", std::process::id()));
    fs::create_dir_all(&dir).unwrap();
    let path = dir.join("bridge.json");
    fs::write(
        &path,
        r#"{"parser": {"fence_open": "```call", "edit_tools": ["apply_patch"]}, "log_level": "debug"}"#,
    )
    .unwrap();

    let config = BridgeConfig::from_json_file(&path).unwrap();
    assert_eq!(config.parser.fence_open, "```call");
    assert_eq!(config.parser.edit_tools, vec!["apply_patch".to_string()]);
    assert_eq!(config.log_level.as_deref(), Some("debug"));

    fs::remove_dir_all(&dir).unwrap();
}

#[test]
fn test_invalid_config_rejected() {
    let err = BridgeConfig::from_json_str(r#"{"parser": {"fence_open": "tool"}}"#).unwrap_err();
    assert!(matches!(err, ConfigError::InvalidValue { .. }));

    let err = BridgeConfig::from_json_str(r#"{"log_level": "loud"}"#).unwrap_err();
    assert!(matches!(err, ConfigError::InvalidValue { .. }));

    let err = BridgeConfig::from_json_str("not json").unwrap_err();
    assert!(matches!(err, ConfigError::Parse(_)));
}

#[test]
fn test_tool_declarations_deserialize_with_default_type() {
    let tools: Vec<Value> = vec![json!({
        "function": {"name": "f", "parameters": {"properties": {"n": {"type": "integer"}}}}
    })];
    let tools: Vec<tool_call_bridge::protocols::chat::Tool> =
        serde_json::from_value(Value::Array(tools)).unwrap();
    assert_eq!(tools[0].tool_type, "function");
    assert!(tools[0].function.description.is_none());
}
