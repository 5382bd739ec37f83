use std::{collections::HashSet, sync::Arc};

use serde_json::{Map, Value};
use tracing::{debug, trace, warn};

use crate::{
    config::ParserConfig,
    tool_parser::{
        coercion::{ArgumentCoercer, ToolSchemas, CHANGES_ALIASES, FILEPATH_ALIASES},
        edit_coordinator::EditCoordinator,
        parsers::helpers,
        traits::StreamingToolParser,
        types::{CompletedBlock, FunctionCall, StreamDelta, ToolCall, ToolCallDelta},
    },
};

const FENCE: &str = "```";
const TOOL_NAME_KEY: &str = "TOOL_NAME";
const BEGIN_ARG: &str = "BEGIN_ARG:";
const END_ARG: &str = "END_ARG";

/// Where the block scanner stands on the current line
enum ScanState {
    /// Looking for an opening fence
    Searching,
    /// Inside a block body that starts at `body_start`
    InBlock {
        body_start: usize,
        after_end_arg: bool,
    },
}

/// Name from a `TOOL_NAME: <name>` line, if the line is one
fn parse_tool_name_line(line: &str) -> Option<&str> {
    let rest = line.trim().strip_prefix(TOOL_NAME_KEY)?;
    let name = rest.trim_start().strip_prefix(':')?.trim();
    let valid = !name.is_empty()
        && name
            .chars()
            .all(|c| c.is_ascii_alphanumeric() || matches!(c, '_' | '-' | '.' | '/'));
    valid.then_some(name)
}

/// Split a complete block body into its tool name and raw arguments
fn parse_block_body(body: &str) -> Option<(String, Map<String, Value>)> {
    let mut name: Option<&str> = None;
    let mut args = Map::new();
    let mut current: Option<(&str, Vec<&str>)> = None;

    for line in body.lines() {
        if let Some((key, values)) = current.as_mut() {
            if line.trim() != END_ARG {
                values.push(line);
                continue;
            }
            let value = values.join("\n").trim().to_string();
            args.insert(key.to_string(), Value::String(value));
            current = None;
            continue;
        }

        // Only a column-0 BEGIN_ARG opens an argument
        if let Some(key) = line.strip_prefix(BEGIN_ARG) {
            let key = key.trim();
            if !key.is_empty() {
                current = Some((key, Vec::new()));
            }
            continue;
        }

        if name.is_none() {
            name = parse_tool_name_line(line);
        }
    }

    name.map(|name| (name.to_string(), args))
}

/// First non-blank value among `keys`
fn first_present<'a>(args: &'a Map<String, Value>, keys: &[&str]) -> Option<&'a str> {
    keys.iter()
        .filter_map(|key| args.get(*key).and_then(Value::as_str))
        .find(|value| !value.trim().is_empty())
}

/// Streaming parser for fenced tool blocks
///
/// Handles the line-oriented format models emit while streaming:
/// ````text
/// ```tool
/// TOOL_NAME: edit_file
/// BEGIN_ARG: filepath
/// src/main.rs
/// END_ARG
/// BEGIN_ARG: changes
/// ...
/// END_ARG
/// ```
/// ````
///
/// Every call rescans the full buffer because a block may span many
/// increments. A block counts only once its last `END_ARG` line is directly
/// followed by the closing fence, so a half-streamed block is never surfaced.
/// Emitted blocks are remembered by fingerprint and never emitted twice.
///
/// Edit tools go through the shared [`EditCoordinator`]: while another edit is
/// in flight the block is deferred, not marked, and picked up by a later scan.
pub struct FencedStreamParser {
    fence_open: String,
    call_id_prefix: String,
    coordinator: Arc<EditCoordinator>,
    coercer: ArgumentCoercer,
    schemas: Arc<ToolSchemas>,

    /// Fingerprints already emitted in this stream
    emitted: HashSet<String>,

    /// Last content delta handed back, to avoid re-sending it on retries
    last_content_delta: String,
}

impl FencedStreamParser {
    /// Parser with default settings sharing `coordinator`
    pub fn new(coordinator: Arc<EditCoordinator>) -> Self {
        Self::with_config(&ParserConfig::default(), coordinator)
    }

    pub fn with_config(config: &ParserConfig, coordinator: Arc<EditCoordinator>) -> Self {
        Self {
            fence_open: config.fence_open.trim().to_string(),
            call_id_prefix: config.call_id_prefix.clone(),
            coordinator,
            coercer: ArgumentCoercer::new(config.edit_tools.iter().cloned()),
            schemas: Arc::new(ToolSchemas::new()),
            emitted: HashSet::new(),
            last_content_delta: String::new(),
        }
    }

    /// Coerce emitted arguments against these schemas
    pub fn with_schemas(mut self, schemas: Arc<ToolSchemas>) -> Self {
        self.schemas = schemas;
        self
    }

    pub fn coordinator(&self) -> &Arc<EditCoordinator> {
        &self.coordinator
    }

    /// All complete blocks in `text`, in buffer order, emitted or not
    pub fn scan_completed_blocks(&self, text: &str) -> Vec<CompletedBlock> {
        let mut blocks = Vec::new();
        let mut state = ScanState::Searching;
        let mut offset = 0;

        for raw_line in text.split_inclusive('\n') {
            let line_start = offset;
            offset += raw_line.len();
            let terminated = raw_line.ends_with('\n');
            let line = raw_line.trim_end_matches(['\n', '\r']);

            if let ScanState::InBlock {
                body_start,
                after_end_arg,
            } = &mut state
            {
                if !line.trim_start().starts_with(FENCE) {
                    *after_end_arg = terminated && line.trim() == END_ARG;
                    continue;
                }

                if *after_end_arg {
                    let body = &text[*body_start..line_start];
                    match parse_block_body(body) {
                        Some((name, args)) => {
                            let fingerprint = helpers::block_fingerprint(&name, body);
                            blocks.push(CompletedBlock {
                                name,
                                args,
                                fingerprint,
                            });
                        }
                        None => warn!("Skipping fenced tool block without TOOL_NAME"),
                    }
                }

                // A fence closes the block after END_ARG and aborts it otherwise;
                // either way the same line may open the next one.
                state = ScanState::Searching;
            }

            if terminated && line.trim() == self.fence_open {
                state = ScanState::InBlock {
                    body_start: offset,
                    after_end_arg: false,
                };
            }
        }

        blocks
    }

    /// Payload to queue for an edit block, or None when a required field is missing
    fn edit_payload(args: &Map<String, Value>) -> Option<String> {
        let filepath = first_present(args, &FILEPATH_ALIASES).map(helpers::strip_quotes)?;
        if filepath.is_empty() {
            return None;
        }
        let changes = first_present(args, &CHANGES_ALIASES)
            .or_else(|| first_present(args, &["text"]))?;
        Some(changes.to_string())
    }

    fn render_arguments(&self, block: &CompletedBlock) -> Option<String> {
        let arguments = match helpers::to_json_string(&block.args) {
            Ok(arguments) => arguments,
            Err(e) => {
                warn!("Failed to encode arguments of {}: {}", block.name, e);
                return None;
            }
        };
        let call = ToolCall::new(block.name.clone(), arguments);
        let call = self.coercer.coerce(call, self.schemas.get(&block.name));
        Some(call.function.arguments)
    }

    /// First complete, not yet emitted block that may be emitted now
    fn next_tool_call(&mut self, text: &str) -> Option<ToolCallDelta> {
        for block in self.scan_completed_blocks(text) {
            if self.emitted.contains(&block.fingerprint) {
                continue;
            }

            let payload = if self.coercer.is_edit_tool(&block.name) {
                if !self.coordinator.try_acquire() {
                    debug!(
                        "Deferring {} tool call because another edit is in flight or queued",
                        block.name
                    );
                    continue;
                }
                match Self::edit_payload(&block.args) {
                    Some(payload) => Some(payload),
                    None => {
                        debug!("Dropping {} block with missing filepath or changes", block.name);
                        continue;
                    }
                }
            } else {
                None
            };

            let Some(arguments) = self.render_arguments(&block) else {
                continue;
            };

            if let Some(payload) = payload {
                // Another stream may have claimed the slot since try_acquire
                if !self.coordinator.try_begin(payload) {
                    debug!("Deferring {} tool call, edit slot taken", block.name);
                    continue;
                }
            }

            debug!(name = %block.name, arguments = %arguments, "Emitting fenced tool call");
            self.emitted.insert(block.fingerprint);
            return Some(ToolCallDelta {
                index: 0,
                id: helpers::generate_call_id(&self.call_id_prefix),
                tool_type: "function".to_string(),
                function: FunctionCall {
                    name: block.name,
                    arguments,
                },
            });
        }
        None
    }

    /// Number of blocks emitted so far in this stream
    pub fn emitted_count(&self) -> usize {
        self.emitted.len()
    }
}

impl StreamingToolParser for FencedStreamParser {
    fn extract_stream_delta(
        &mut self,
        previous_text: &str,
        current_text: &str,
        delta_text: &str,
    ) -> Option<StreamDelta> {
        trace!(
            previous_len = previous_text.len(),
            current_len = current_text.len(),
            "Scanning stream buffer"
        );

        if let Some(call) = self.next_tool_call(current_text) {
            return Some(StreamDelta::ToolCalls {
                tool_calls: vec![call],
            });
        }

        // Raw-equality dedup also swallows a legitimately repeated chunk
        if !delta_text.is_empty() && delta_text != self.last_content_delta {
            self.last_content_delta = delta_text.to_string();
            return Some(StreamDelta::content(delta_text));
        }

        None
    }

    fn flush(&mut self, full_text: &str) -> Vec<StreamDelta> {
        let mut deltas = Vec::new();
        while let Some(call) = self.next_tool_call(full_text) {
            deltas.push(StreamDelta::ToolCalls {
                tool_calls: vec![call],
            });
        }
        deltas
    }

    fn reset(&mut self) {
        self.emitted.clear();
        self.last_content_delta.clear();
    }
}
