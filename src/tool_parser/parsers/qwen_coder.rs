use regex::Regex;
use serde_json::{Map, Value};

use crate::tool_parser::{
    errors::{ParserError, ParserResult},
    parsers::helpers,
    traits::ToolParser,
    types::ToolCall,
};

/// Qwen Coder format parser for tool calls
///
/// Handles the Qwen Coder specific XML format:
/// `<tool_call>\n<function=name>\n<parameter=key>value</parameter>\n</function>\n</tool_call>`
///
/// Features:
/// - Tool Call Tags: `<tool_call>` and `</tool_call>` wrap each individual call
/// - XML-style function declaration: `<function=name>`
/// - XML-style parameters: `<parameter=key>value</parameter>`
///
/// Parameter values are kept as strings; typing is left to `ArgumentCoercer`.
/// Malformed blocks and parameters are skipped, never reported as errors.
pub struct QwenCoderParser {
    /// Regex for extracting tool call wrappers in parse_complete
    extractor: Regex,

    /// Token configuration
    tool_call_start_token: &'static str,

    /// Precompiled regex patterns for XML format parsing
    xml_function_pattern: Regex,
    xml_param_pattern: Regex,
}

impl QwenCoderParser {
    /// Create a new Qwen Coder parser
    pub fn new() -> Self {
        let extractor =
            Regex::new(r"(?s)<tool_call>(.*?)</tool_call>").expect("Valid regex pattern");

        // Name and key run up to the first '>' inside the captured region
        let xml_function_pattern =
            Regex::new(r"(?s)<function=(.*?)</function>").expect("Valid XML function pattern");
        let xml_param_pattern =
            Regex::new(r"(?s)<parameter=(.*?)</parameter>").expect("Valid XML parameter pattern");

        Self {
            extractor,
            tool_call_start_token: "<tool_call>",
            xml_function_pattern,
            xml_param_pattern,
        }
    }

    /// Parse one wrapper body: `<function=name><parameter=key>value</parameter></function>`
    fn parse_xml_format(&self, block: &str) -> ParserResult<ToolCall> {
        let function_str = self
            .xml_function_pattern
            .captures(block)
            .and_then(|captures| captures.get(1))
            .ok_or(ParserError::MissingFunction)?
            .as_str();

        let name_end = function_str
            .find('>')
            .ok_or(ParserError::MissingTerminator("function name"))?;
        let function_name = &function_str[..name_end];
        if function_name.is_empty() {
            return Err(ParserError::ParsingFailed("Empty function name".to_string()));
        }
        let param_str = &function_str[name_end + 1..];

        let mut args = Map::new();
        for cap in self.xml_param_pattern.captures_iter(param_str) {
            let Some(param_full) = cap.get(1).map(|m| m.as_str()) else {
                continue;
            };
            let Some(key_end) = param_full.find('>') else {
                tracing::warn!("No closing '>' found for parameter in {}", function_name);
                continue;
            };
            args.insert(
                param_full[..key_end].to_string(),
                Value::String(param_full[key_end + 1..].trim().to_string()),
            );
        }

        let arguments = helpers::to_json_string(&args)?;
        Ok(ToolCall::new(function_name, arguments))
    }
}

impl Default for QwenCoderParser {
    fn default() -> Self {
        Self::new()
    }
}

impl ToolParser for QwenCoderParser {
    fn parse_complete(&self, text: &str) -> ParserResult<(String, Vec<ToolCall>)> {
        // Leading content stops at the first start marker, even an unterminated one
        let normal_text = match text.find(self.tool_call_start_token) {
            Some(idx) if idx > 0 => text[..idx].trim().to_string(),
            _ => String::new(),
        };

        let mut tools = Vec::new();
        for captures in self.extractor.captures_iter(text) {
            let Some(block) = captures.get(1) else {
                continue;
            };
            match self.parse_xml_format(block.as_str()) {
                Ok(tool) => {
                    tracing::debug!(name = %tool.function.name, "Parsed XML tool call");
                    tools.push(tool);
                }
                Err(e) => {
                    tracing::warn!("Failed to parse XML tool call: {}", e);
                }
            }
        }

        // Nothing recovered: the whole response is a plain reply
        if tools.is_empty() && normal_text.is_empty() {
            return Ok((text.trim().to_string(), tools));
        }

        Ok((normal_text, tools))
    }

    fn has_tool_markers(&self, text: &str) -> bool {
        text.contains(self.tool_call_start_token)
    }
}
