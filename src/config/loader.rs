/// Configuration loader
use std::fs;
use std::path::{Path, PathBuf};

use thiserror::Error;

use super::schema::ToolConfig;

/// Tool setup failures, kept apart from license statuses.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("failed to get executable path: {0}")]
    ExecutablePath(std::io::Error),

    #[error("failed to read config file {path}: {source}")]
    Read {
        path: String,
        source: std::io::Error,
    },

    #[error("failed to parse config: {0}")]
    Parse(#[from] serde_json::Error),

    #[error("invalid config: {0}")]
    Invalid(String),
}

/// `<executable>.config`, next to the binary (e.g. "kc-v2c.config").
pub fn default_config_path() -> Result<PathBuf, ConfigError> {
    let exe_path = std::env::current_exe().map_err(ConfigError::ExecutablePath)?;
    Ok(PathBuf::from(format!("{}.config", exe_path.display())))
}

/// Load configuration from `path`, or from the adjacent .config file.
pub fn load_config(path: Option<&Path>) -> Result<ToolConfig, ConfigError> {
    let config_path = match path {
        Some(path) => path.to_path_buf(),
        None => default_config_path()?,
    };

    let config_content = fs::read_to_string(&config_path).map_err(|source| ConfigError::Read {
        path: config_path.display().to_string(),
        source,
    })?;

    parse_config(&config_content)
}

/// Parse and validate JSON config text.
pub fn parse_config(content: &str) -> Result<ToolConfig, ConfigError> {
    let config: ToolConfig = serde_json::from_str(content)?;
    config.validate().map_err(ConfigError::Invalid)?;
    Ok(config)
}
