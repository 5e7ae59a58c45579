//! Configuration loading from disk.

use std::fs;
use std::path::Path;

use super::schema::AppConfig;
use super::validation::{validate_config, ValidationError};

/// Error type for configuration loading.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
    #[error("Parse error: {0}")]
    Parse(#[from] toml::de::Error),
    #[error("environment variable {0} referenced by control.bearer_token is not set")]
    MissingEnv(String),
    #[error("Validation failed: {}", join(.0))]
    Validation(Vec<ValidationError>),
}

fn join(errors: &[ValidationError]) -> String {
    errors
        .iter()
        .map(ToString::to_string)
        .collect::<Vec<_>>()
        .join(", ")
}

/// Load and validate configuration from a TOML file.
pub fn load_config(path: &Path) -> Result<AppConfig, ConfigError> {
    let content = fs::read_to_string(path)?;
    parse_config(&content)
}

/// Parse, resolve secrets and validate a TOML document.
pub fn parse_config(content: &str) -> Result<AppConfig, ConfigError> {
    let mut config: AppConfig = toml::from_str(content)?;

    if let Some(token) = config.control.bearer_token.take() {
        config.control.bearer_token = Some(resolve_env(&token)?);
    }

    validate_config(&config).map_err(ConfigError::Validation)?;
    Ok(config)
}

/// Expand `$VAR` or `${VAR}`; anything else is returned as-is.
fn resolve_env(value: &str) -> Result<String, ConfigError> {
    let name = value
        .strip_prefix("${")
        .and_then(|rest| rest.strip_suffix('}'))
        .or_else(|| value.strip_prefix('$'));
    match name {
        Some(name) if !name.is_empty() => {
            std::env::var(name).map_err(|_| ConfigError::MissingEnv(name.to_string()))
        }
        _ => Ok(value.to_string()),
    }
}
