/// Configuration module - Engine switches and tool configuration
pub mod schema;
pub mod loader;

pub use schema::{EngineConfig, KeyAlgorithm, KeyEntry, KeyFormat, ToolConfig};
pub use loader::{default_config_path, load_config, parse_config, ConfigError};
