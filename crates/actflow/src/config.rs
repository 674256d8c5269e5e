//! Application configuration
//!
//! Read from a TOML file passed with `--config`. Every section is optional.

use actflow_core::{EngineConfig, LogConfig};
use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::Path;

fn default_artnet_target() -> String {
    "255.255.255.255:6454".to_string()
}

fn default_refresh_hz() -> u32 {
    30
}

/// Art-Net output settings
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct OutputConfig {
    /// Send frames over Art-Net. Off means playback only touches the buffer.
    #[serde(default)]
    pub enabled: bool,
    #[serde(default = "default_artnet_target")]
    pub artnet_target: String,
    /// Overrides the universe stored in the show
    #[serde(default)]
    pub universe: Option<u16>,
    #[serde(default = "default_refresh_hz")]
    pub refresh_hz: u32,
}

impl Default for OutputConfig {
    fn default() -> Self {
        Self {
            enabled: false,
            artnet_target: default_artnet_target(),
            universe: None,
            refresh_hz: default_refresh_hz(),
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct AppConfig {
    #[serde(default)]
    pub engine: EngineConfig,
    #[serde(default)]
    pub logging: LogConfig,
    #[serde(default)]
    pub output: OutputConfig,
}

impl AppConfig {
    pub fn load(path: &Path) -> Result<Self> {
        let content = fs::read_to_string(path)
            .with_context(|| format!("Failed to read config file: {:?}", path))?;
        toml::from_str(&content)
            .with_context(|| format!("Failed to parse config file: {:?}", path))
    }

    /// Load `path` if given, defaults otherwise
    pub fn load_or_default(path: Option<&Path>) -> Result<Self> {
        match path {
            Some(path) => Self::load(path),
            None => Ok(Self::default()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_partial_config_keeps_defaults() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("actflow.toml");
        fs::write(
            &path,
            r#"
[engine]
random_seed = 9

[output]
enabled = true
artnet_target = "10.0.0.20:6454"
"#,
        )
        .unwrap();

        let config = AppConfig::load(&path).unwrap();
        assert_eq!(config.engine.random_seed, Some(9));
        assert_eq!(config.engine.max_sync_steps, 256);
        assert!(config.output.enabled);
        assert_eq!(config.output.artnet_target, "10.0.0.20:6454");
        assert_eq!(config.output.refresh_hz, 30);
        assert_eq!(config.logging, LogConfig::default());
    }

    #[test]
    fn test_missing_config_is_an_error() {
        let dir = tempfile::tempdir().unwrap();
        assert!(AppConfig::load(&dir.path().join("absent.toml")).is_err());
        assert_eq!(AppConfig::load_or_default(None).unwrap(), AppConfig::default());
    }

    #[test]
    fn test_invalid_toml_is_an_error() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("broken.toml");
        fs::write(&path, "[output\nenabled = yes").unwrap();
        assert!(AppConfig::load(&path).is_err());
    }
}
