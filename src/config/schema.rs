/// Configuration schema for the license engine and the command-line tool
use serde::{Deserialize, Serialize};

use crate::verification::{AlgorithmGuid, KeyScope};

/// Switches and limits of the license engine.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize, Serialize)]
pub struct EngineConfig {
    /// Accept RSA-signed licenses
    #[serde(default = "default_true")]
    pub rsa_signing: bool,

    /// Accept AES-OMAC-signed licenses
    #[serde(default = "default_true")]
    pub aes_signing: bool,

    /// Accept node-locked licenses
    #[serde(default = "default_true")]
    pub node_locking: bool,

    /// Read the clock for expiring licenses
    #[serde(default = "default_true")]
    pub clock: bool,

    /// Encoding of RSA public keys: "pem" (PEM or DER) or "der"
    #[serde(default)]
    pub rsa_key_format: KeyFormat,

    /// Clock readings at or below this unix time mean no RTC is fitted
    #[serde(default = "default_min_valid_time")]
    pub min_valid_time: u32,

    /// Log level: "trace", "debug", "info", "warn", "error"
    #[serde(default = "default_log_level")]
    pub log_level: String,
}

/// RSA public key encodings accepted by `PkcsVerifier`.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum KeyFormat {
    #[default]
    Pem,
    Der,
}

impl KeyFormat {
    /// Parse KeyFormat from string (case-insensitive)
    pub fn parse(s: &str) -> Option<Self> {
        match s.to_lowercase().as_str() {
            "pem" => Some(KeyFormat::Pem),
            "der" => Some(KeyFormat::Der),
            _ => None,
        }
    }
}

fn default_true() -> bool {
    true
}

/// 2015-12-08, before which no licensed board left the factory.
fn default_min_valid_time() -> u32 {
    1_449_571_095
}

fn default_log_level() -> String {
    "info".to_string()
}

const LOG_LEVELS: [&str; 6] = ["trace", "debug", "info", "warn", "error", "off"];

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            rsa_signing: true,
            aes_signing: true,
            node_locking: true,
            clock: true,
            rsa_key_format: KeyFormat::default(),
            min_valid_time: default_min_valid_time(),
            log_level: default_log_level(),
        }
    }
}

impl EngineConfig {
    /// Validate configuration
    pub fn validate(&self) -> Result<(), String> {
        if !self.rsa_signing && !self.aes_signing {
            return Err("at least one of rsa_signing and aes_signing must be enabled".to_string());
        }

        if !LOG_LEVELS.contains(&self.log_level.to_lowercase().as_str()) {
            return Err(format!("unknown log_level '{}'", self.log_level));
        }

        Ok(())
    }
}

/// Algorithm a key may serve, as written in the config file.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize, Serialize)]
pub struct KeyAlgorithm {
    #[serde(default = "default_scope")]
    pub scope: u8,
    pub algorithm_id: u16,
}

fn default_scope() -> u8 {
    KeyScope::Sign as u8
}

impl KeyAlgorithm {
    pub fn guid(&self) -> AlgorithmGuid {
        AlgorithmGuid::from_parts(self.scope, self.algorithm_id)
    }
}

/// One key file and the algorithms it is registered for.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize, Serialize)]
pub struct KeyEntry {
    pub path: String,
    pub algorithms: Vec<KeyAlgorithm>,
}

/// Configuration of the `kc-v2c` binary.
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize, Serialize)]
pub struct ToolConfig {
    /// V2C license file
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub license_path: Option<String>,

    #[serde(default)]
    pub keys: Vec<KeyEntry>,

    /// Device id override: "hex:<digits>" or plain text.
    /// The host id (hostname + MAC) is used when absent.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub device_id: Option<String>,

    #[serde(default)]
    pub engine: EngineConfig,
}

impl ToolConfig {
    /// Validate configuration
    pub fn validate(&self) -> Result<(), String> {
        self.engine.validate()?;

        for key in &self.keys {
            if key.path.is_empty() {
                return Err("key path cannot be empty".to_string());
            }
            if key.algorithms.is_empty() {
                return Err(format!("key {} lists no algorithms", key.path));
            }
            for alg in &key.algorithms {
                if alg.scope == 0 || alg.scope > KeyScope::MAX {
                    return Err(format!("key {}: scope {} out of range", key.path, alg.scope));
                }
                if alg.algorithm_id == 0 || alg.algorithm_id > crate::verification::Algorithm::MAX_ID {
                    return Err(format!(
                        "key {}: algorithm id {} out of range",
                        key.path, alg.algorithm_id
                    ));
                }
            }
        }

        if let Some(id) = &self.device_id {
            self.device_id_bytes()?;
            if id.is_empty() {
                return Err("device_id cannot be empty".to_string());
            }
        }

        Ok(())
    }

    /// Raw bytes of the configured device id override.
    pub fn device_id_bytes(&self) -> Result<Option<Vec<u8>>, String> {
        match &self.device_id {
            None => Ok(None),
            Some(id) => match id.strip_prefix("hex:") {
                Some(digits) => hex::decode(digits)
                    .map(Some)
                    .map_err(|e| format!("device_id is not valid hex: {}", e)),
                None => Ok(Some(id.as_bytes().to_vec())),
            },
        }
    }
}
