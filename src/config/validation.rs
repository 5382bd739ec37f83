use super::*;

const FENCE: &str = "```";
const LOG_LEVELS: [&str; 5] = ["trace", "debug", "info", "warn", "error"];

/// Configuration validator
pub struct ConfigValidator;

impl ConfigValidator {
    pub fn validate(config: &BridgeConfig) -> ConfigResult<()> {
        Self::validate_parser(&config.parser)?;
        Self::validate_logging(config)?;
        Ok(())
    }

    fn validate_parser(parser: &ParserConfig) -> ConfigResult<()> {
        let fence = parser.fence_open.trim();
        if fence.is_empty() {
            return Err(ConfigError::MissingRequired {
                field: "parser.fence_open".to_string(),
            });
        }

        if !fence.starts_with(FENCE) || fence.len() == FENCE.len() {
            return Err(ConfigError::InvalidValue {
                field: "parser.fence_open".to_string(),
                value: parser.fence_open.clone(),
                reason: "Must be three backticks followed by a tag, e.g. ```tool".to_string(),
            });
        }

        if fence.chars().any(char::is_whitespace) {
            return Err(ConfigError::InvalidValue {
                field: "parser.fence_open".to_string(),
                value: parser.fence_open.clone(),
                reason: "Must not contain whitespace".to_string(),
            });
        }

        if let Some(name) = parser.edit_tools.iter().find(|name| name.trim().is_empty()) {
            return Err(ConfigError::InvalidValue {
                field: "parser.edit_tools".to_string(),
                value: format!("{:?}", name),
                reason: "Tool names must not be empty".to_string(),
            });
        }

        if parser.call_id_prefix.is_empty() {
            return Err(ConfigError::MissingRequired {
                field: "parser.call_id_prefix".to_string(),
            });
        }

        Ok(())
    }

    fn validate_logging(config: &BridgeConfig) -> ConfigResult<()> {
        if let Some(level) = &config.log_level {
            if !LOG_LEVELS.contains(&level.to_lowercase().as_str()) {
                return Err(ConfigError::InvalidValue {
                    field: "log_level".to_string(),
                    value: level.clone(),
                    reason: format!("Must be one of: {}", LOG_LEVELS.join(", ")),
                });
            }
        }

        if let Some(dir) = &config.log_dir {
            if dir.trim().is_empty() {
                return Err(ConfigError::ValidationFailed {
                    reason: "log_dir must not be blank when set".to_string(),
                });
            }
        }

        Ok(())
    }
}
