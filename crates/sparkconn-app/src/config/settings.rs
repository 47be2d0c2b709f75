//! Settings parser for .sparkconn/config.toml

use super::types::Settings;
use sparkconn_core::prelude::*;
use std::path::Path;

const CONFIG_FILENAME: &str = "config.toml";
const SPARKCONN_DIR: &str = ".sparkconn";

// ─────────────────────────────────────────────────────────────────────────────
// Settings Loading
// ─────────────────────────────────────────────────────────────────────────────

/// Load settings from .sparkconn/config.toml
///
/// Returns default settings if file doesn't exist or can't be parsed.
pub fn load_settings(base_path: &Path) -> Settings {
    let config_path = base_path.join(SPARKCONN_DIR).join(CONFIG_FILENAME);

    if !config_path.exists() {
        debug!("No config file at {:?}, using defaults", config_path);
        return Settings::default();
    }

    match std::fs::read_to_string(&config_path) {
        Ok(content) => match toml::from_str(&content) {
            Ok(settings) => {
                debug!("Loaded settings from {:?}", config_path);
                settings
            }
            Err(e) => {
                warn!("Failed to parse {:?}: {}", config_path, e);
                Settings::default()
            }
        },
        Err(e) => {
            warn!("Failed to read {:?}: {}", config_path, e);
            Settings::default()
        }
    }
}

/// Create the default config file in .sparkconn/
pub fn init_config_dir(base_path: &Path) -> Result<()> {
    let config_dir = base_path.join(SPARKCONN_DIR);

    if !config_dir.exists() {
        std::fs::create_dir_all(&config_dir)
            .with_context(|| format!("Failed to create {}", config_dir.display()))?;
    }

    let config_path = config_dir.join(CONFIG_FILENAME);
    if !config_path.exists() {
        let default_content = r#"# Spark Connector Configuration

[comm]
target = "SparkConnector"   # Comm target registered by the backend
open_timeout_ms = 10000     # Give up on an unacknowledged channel after this long

[metadata]
key = "sparkconnect"        # Document metadata key for the saved configuration

[logs]
max_lines = 1000            # Streamed backend lines kept per phase

[engine]
channel_capacity = 256
"#;
        std::fs::write(&config_path, default_content)
            .with_context(|| format!("Failed to write {}", config_path.display()))?;
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    #[test]
    fn test_load_settings_defaults() {
        let temp = tempdir().unwrap();
        let settings = load_settings(temp.path());

        assert_eq!(settings.comm.target, "SparkConnector");
        assert_eq!(settings.metadata.key, "sparkconnect");
    }

    #[test]
    fn test_load_settings_custom() {
        let temp = tempdir().unwrap();
        let config_dir = temp.path().join(".sparkconn");
        std::fs::create_dir_all(&config_dir).unwrap();

        let config = r#"
[comm]
target = "SparkConnectorV2"

[metadata]
key = "spark"

[logs]
max_lines = 50
"#;
        std::fs::write(config_dir.join("config.toml"), config).unwrap();

        let settings = load_settings(temp.path());
        assert_eq!(settings.comm.target, "SparkConnectorV2");
        assert_eq!(settings.metadata.key, "spark");
        assert_eq!(settings.logs.max_lines, 50);
        assert_eq!(settings.engine.channel_capacity, 256);
    }

    #[test]
    fn test_load_settings_invalid_toml() {
        let temp = tempdir().unwrap();
        let config_dir = temp.path().join(".sparkconn");
        std::fs::create_dir_all(&config_dir).unwrap();

        std::fs::write(config_dir.join("config.toml"), "not valid toml {{{{").unwrap();

        let settings = load_settings(temp.path());
        assert_eq!(settings.comm.open_timeout_ms, 10_000);
    }

    #[test]
    fn test_init_config_dir() {
        let temp = tempdir().unwrap();

        init_config_dir(temp.path()).unwrap();

        let path = temp.path().join(".sparkconn/config.toml");
        assert!(path.exists());

        let content = std::fs::read_to_string(path).unwrap();
        let _: Settings = toml::from_str(&content).expect("Default config should be valid TOML");
    }

    #[test]
    fn test_init_config_dir_keeps_existing_file() {
        let temp = tempdir().unwrap();
        let config_dir = temp.path().join(".sparkconn");
        std::fs::create_dir_all(&config_dir).unwrap();
        std::fs::write(config_dir.join("config.toml"), "[logs]\nmax_lines = 7\n").unwrap();

        init_config_dir(temp.path()).unwrap();

        assert_eq!(load_settings(temp.path()).logs.max_lines, 7);
    }
}
