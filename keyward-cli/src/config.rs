//! Configuration loading and parsing

use anyhow::{Context, Result};
use keyward_bridge::BridgeConfig;
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};

/// Main application configuration (loaded from keyward.toml)
#[derive(Debug, Clone, Default, Deserialize, Serialize)]
pub struct AppConfig {
    #[serde(default)]
    pub bridge: BridgeConfig,
    #[serde(default)]
    pub cli: CliConfig,
}

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct CliConfig {
    /// JSON operations file replayed into the queue
    pub ops_file: Option<PathBuf>,

    /// Fire a records-changed event through the built-in callbacks
    #[serde(default)]
    pub dispatch: bool,

    /// Also fire a record-changed event for this row (implies dispatch)
    pub record: Option<i64>,

    /// Pretty-print the submission message
    #[serde(default = "default_pretty")]
    pub pretty: bool,
}

fn default_pretty() -> bool {
    true
}

impl Default for CliConfig {
    fn default() -> Self {
        Self {
            ops_file: None,
            dispatch: false,
            record: None,
            pretty: default_pretty(),
        }
    }
}

/// Load configuration from a TOML file
pub fn load_config(path: &Path) -> Result<AppConfig> {
    let content = fs::read_to_string(path)
        .with_context(|| format!("Failed to read config file: {:?}", path))?;

    let config: AppConfig = toml::from_str(&content)
        .with_context(|| format!("Failed to parse config file: {:?}", path))?;

    config
        .bridge
        .validate()
        .with_context(|| format!("Invalid [bridge] section in {:?}", path))?;

    Ok(config)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    #[test]
    fn test_config_deserialization() {
        let toml_content = r#"
            [bridge]
            default_table = "People"
            output_slots = 10
            data_path = "people.json"

            [cli]
            ops_file = "ops.json"
            dispatch = true
        "#;

        let config: AppConfig = toml::from_str(toml_content).unwrap();
        assert_eq!(config.bridge.default_table, "People");
        assert_eq!(config.bridge.output_slots, 10);
        assert!(config.bridge.rich_display);
        assert_eq!(config.cli.ops_file, Some(PathBuf::from("ops.json")));
        assert!(config.cli.dispatch);
        assert!(config.cli.pretty);
    }

    #[test]
    fn test_empty_config_uses_defaults() {
        let config: AppConfig = toml::from_str("").unwrap();
        assert_eq!(config.bridge, BridgeConfig::default());
        assert!(config.cli.ops_file.is_none());
    }

    #[test]
    fn test_load_config_rejects_invalid_bridge() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        writeln!(file, "[bridge]\noutput_slots = 0").unwrap();

        let err = load_config(file.path()).unwrap_err();
        assert!(format!("{:#}", err).contains("output_slots"));
    }

    #[test]
    fn test_load_config_missing_file() {
        let err = load_config(Path::new("/nonexistent/keyward.toml")).unwrap_err();
        assert!(err.to_string().contains("Failed to read config file"));
    }
}
