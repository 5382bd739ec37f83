use std::{fs, path::Path};

use serde::{Deserialize, Serialize};

use super::{ConfigError, ConfigResult, ConfigValidator};

/// Top-level bridge configuration
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct BridgeConfig {
    /// Tool parsing settings
    pub parser: ParserConfig,
    /// Log level (None = info)
    pub log_level: Option<String>,
    /// Log directory (None = stderr only)
    pub log_dir: Option<String>,
    /// Emit logs as JSON lines
    pub log_json: bool,
}

impl BridgeConfig {
    /// Load and validate a JSON config file
    pub fn from_json_file(path: impl AsRef<Path>) -> ConfigResult<Self> {
        let path = path.as_ref();
        let raw = fs::read_to_string(path).map_err(|source| ConfigError::Io {
            path: path.display().to_string(),
            source,
        })?;
        Self::from_json_str(&raw)
    }

    /// Parse and validate a JSON config document
    pub fn from_json_str(raw: &str) -> ConfigResult<Self> {
        let config: BridgeConfig = serde_json::from_str(raw)?;
        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> ConfigResult<()> {
        ConfigValidator::validate(self)
    }
}

/// Settings shared by the batch and streaming tool parsers
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ParserConfig {
    /// Line that opens a fenced tool block in streamed output
    pub fence_open: String,
    /// Tool names serialized through the edit coordinator
    pub edit_tools: Vec<String>,
    /// Prefix of ids generated for streamed tool calls
    pub call_id_prefix: String,
}

impl Default for ParserConfig {
    fn default() -> Self {
        Self {
            fence_open: "```tool".to_string(),
            edit_tools: vec!["edit_file".to_string(), "edit_existing_file".to_string()],
            call_id_prefix: "call_".to_string(),
        }
    }
}
