use anyhow::{anyhow, Context, Result};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

use crate::api::modbus::SlaveConfig;

fn default_port_name() -> String {
    if cfg!(windows) {
        "COM3".to_string()
    } else {
        "/dev/ttyUSB0".to_string()
    }
}

fn default_baud_rate() -> u32 {
    9600
}

fn default_read_timeout_ms() -> u64 {
    100
}

fn default_sample_file() -> PathBuf {
    PathBuf::from("parameter_values.txt")
}

/// Root configuration of the `kaze` binary.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SlaveBootConfig {
    /// Serial port name
    #[serde(default = "default_port_name")]
    pub port_name: String,
    #[serde(default = "default_baud_rate")]
    pub baud_rate: u32,
    /// Serial read timeout; also bounds how quickly a stop request is noticed
    #[serde(default = "default_read_timeout_ms")]
    pub read_timeout_ms: u64,
    /// File the weather logger appends readings to
    #[serde(default = "default_sample_file")]
    pub sample_file: PathBuf,
    #[serde(default)]
    pub log_file: Option<String>,
    #[serde(default)]
    pub slave: SlaveConfig,
}

impl Default for SlaveBootConfig {
    fn default() -> Self {
        Self {
            port_name: default_port_name(),
            baud_rate: default_baud_rate(),
            read_timeout_ms: default_read_timeout_ms(),
            sample_file: default_sample_file(),
            log_file: None,
            slave: SlaveConfig::default(),
        }
    }
}

impl SlaveBootConfig {
    /// Parse configuration from a JSON string
    pub fn from_json(json_str: &str) -> Result<Self> {
        serde_json::from_str(json_str).context("Invalid JSON configuration")
    }

    /// Parse configuration from a TOML string
    pub fn from_toml(toml_str: &str) -> Result<Self> {
        toml::from_str(toml_str).context("Invalid TOML configuration")
    }

    /// Read configuration from a `.json` or `.toml` file
    pub fn from_file(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read config file {}", path.display()))?;
        match path.extension().and_then(|ext| ext.to_str()) {
            Some("json") => Self::from_json(&content),
            Some("toml") => Self::from_toml(&content),
            other => Err(anyhow!(
                "Unsupported config file extension {other:?}, expected .json or .toml"
            )),
        }
    }

    pub fn to_toml(&self) -> Result<String> {
        toml::to_string_pretty(self).context("Failed to serialize configuration")
    }
}
