//! Schema-driven retyping of raw string arguments.
//!
//! Extractors produce every argument as a string. [`ArgumentCoercer`] looks up
//! the declared JSON-schema type of each parameter and converts the value,
//! keeping the raw string whenever a conversion fails. For edit-type tools it
//! first renames aliased keys (`file_path` vs `filepath`, `diff` vs `changes`)
//! to the name the caller's schema actually declares.

use std::collections::{HashMap, HashSet};

use serde_json::{Map, Number, Value};
use tracing::{debug, warn};

use crate::{
    protocols::chat::Tool,
    tool_parser::{parsers::helpers, types::ToolCall},
};

/// Accepted spellings of the edit target path; the first entry is canonical
pub const FILEPATH_ALIASES: [&str; 3] = ["filepath", "file_path", "path"];

/// Accepted spellings of the edit payload; the first entry is canonical
pub const CHANGES_ALIASES: [&str; 4] = ["changes", "diff", "edits", "replacements"];

const ALIAS_GROUPS: [&[&str]; 2] = [&FILEPATH_ALIASES, &CHANGES_ALIASES];

/// Tool name to parameter schema, supplied per request by the caller
#[derive(Debug, Clone, Default)]
pub struct ToolSchemas {
    schemas: HashMap<String, Value>,
}

impl ToolSchemas {
    pub fn new() -> Self {
        Self::default()
    }

    /// Collect `function.parameters` of each declared tool
    pub fn from_tools(tools: &[Tool]) -> Self {
        tools
            .iter()
            .map(|tool| (tool.function.name.clone(), tool.function.parameters.clone()))
            .collect()
    }

    pub fn insert(&mut self, name: impl Into<String>, schema: Value) {
        self.schemas.insert(name.into(), schema);
    }

    pub fn get(&self, name: &str) -> Option<&Value> {
        self.schemas.get(name)
    }

    pub fn len(&self) -> usize {
        self.schemas.len()
    }

    pub fn is_empty(&self) -> bool {
        self.schemas.is_empty()
    }
}

impl FromIterator<(String, Value)> for ToolSchemas {
    fn from_iter<I: IntoIterator<Item = (String, Value)>>(iter: I) -> Self {
        Self {
            schemas: iter.into_iter().collect(),
        }
    }
}

/// Accept both `{ "properties": {...} }` and a bare properties mapping
fn schema_properties(schema: &Value) -> Option<&Map<String, Value>> {
    let obj = schema.as_object()?;
    match obj.get("properties") {
        Some(Value::Object(props)) => Some(props),
        _ => Some(obj),
    }
}

fn declared_type(property: &Value) -> &str {
    match property.get("type") {
        Some(Value::String(ty)) => ty,
        // ["integer", "null"] style unions
        Some(Value::Array(types)) => types
            .iter()
            .filter_map(Value::as_str)
            .find(|ty| *ty != "null")
            .unwrap_or("string"),
        _ => "string",
    }
}

/// Name a group's keys should be rewritten to, given what the schema exposes
fn alias_target(group: &[&'static str], props: &Map<String, Value>) -> Option<&'static str> {
    let canonical = group[0];
    if props.contains_key(canonical) {
        return Some(canonical);
    }
    let mut exposed: Vec<&'static str> = group[1..]
        .iter()
        .copied()
        .filter(|alias| props.contains_key(*alias))
        .collect();
    exposed.sort_unstable();
    exposed.first().copied()
}

fn resolve_aliases(args: Map<String, Value>, props: &Map<String, Value>) -> Map<String, Value> {
    let mut renames: HashMap<&str, &str> = HashMap::new();
    for group in ALIAS_GROUPS {
        if let Some(target) = alias_target(group, props) {
            for alias in group.iter().filter(|alias| **alias != target) {
                renames.insert(*alias, target);
            }
        }
    }
    if renames.is_empty() {
        return args;
    }

    let mut resolved = Map::new();
    for (key, value) in args {
        let key = match renames.get(key.as_str()) {
            Some(target) => {
                debug!("Resolved argument alias {} -> {}", key, target);
                (*target).to_string()
            }
            None => key,
        };
        // An existing value survives unless it is blank and the newcomer is not
        let keep_existing = resolved
            .get(&key)
            .is_some_and(|existing| !(helpers::is_blank(existing) && !helpers::is_blank(&value)));
        if !keep_existing {
            resolved.insert(key, value);
        }
    }
    resolved
}

fn parse_number(raw: &str) -> Option<Value> {
    if let Ok(int) = raw.parse::<i64>() {
        return Some(Value::from(int));
    }
    raw.parse::<f64>()
        .ok()
        .and_then(Number::from_f64)
        .map(Value::Number)
}

fn parse_integer(raw: &str) -> Option<Value> {
    raw.parse::<i64>()
        .map(Value::from)
        .or_else(|_| raw.parse::<u64>().map(Value::from))
        .ok()
}

/// Convert one value to `ty`; failures keep the value as it was
fn coerce_value(value: Value, ty: &str) -> Value {
    let Value::String(raw) = value else {
        return value;
    };
    match ty {
        "object" | "array" => serde_json::from_str(&raw).unwrap_or(Value::String(raw)),
        "integer" => parse_integer(raw.trim()).unwrap_or(Value::String(raw)),
        "number" => parse_number(raw.trim()).unwrap_or(Value::String(raw)),
        "boolean" => Value::Bool(raw.trim().eq_ignore_ascii_case("true")),
        _ => Value::String(raw),
    }
}

/// Retypes tool call arguments against caller-supplied schemas
#[derive(Debug, Clone)]
pub struct ArgumentCoercer {
    edit_tools: HashSet<String>,
}

impl ArgumentCoercer {
    pub fn new<I, S>(edit_tools: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            edit_tools: edit_tools.into_iter().map(Into::into).collect(),
        }
    }

    pub fn is_edit_tool(&self, name: &str) -> bool {
        self.edit_tools.contains(name)
    }

    /// Coerce `call`'s arguments against `schema`.
    ///
    /// Without a usable schema, or when the arguments are not a JSON object,
    /// the call is returned untouched.
    pub fn coerce(&self, mut call: ToolCall, schema: Option<&Value>) -> ToolCall {
        let Some(props) = schema.and_then(schema_properties) else {
            return call;
        };

        let args = match serde_json::from_str::<Value>(&call.function.arguments) {
            Ok(Value::Object(args)) => args,
            _ => {
                debug!(
                    "Arguments of {} are not a JSON object, skipping coercion",
                    call.function.name
                );
                return call;
            }
        };

        let args = if self.is_edit_tool(&call.function.name) {
            resolve_aliases(args, props)
        } else {
            args
        };

        let typed: Map<String, Value> = args
            .into_iter()
            .map(|(key, value)| {
                let ty = props.get(&key).map(declared_type).unwrap_or("string");
                let value = coerce_value(value, ty);
                (key, value)
            })
            .collect();

        match helpers::to_json_string(&typed) {
            Ok(arguments) => call.function.arguments = arguments,
            Err(e) => warn!("Failed to re-encode coerced arguments: {}", e),
        }
        call
    }

    /// Coerce a batch of calls, each against its own tool's schema
    pub fn coerce_all(&self, calls: Vec<ToolCall>, schemas: &ToolSchemas) -> Vec<ToolCall> {
        calls
            .into_iter()
            .map(|call| {
                let schema = schemas.get(&call.function.name);
                self.coerce(call, schema)
            })
            .collect()
    }
}
