//! Application configuration.
//!
//! Configuration is loaded from a TOML file at:
//! 1. `--config <FILE>` on the command line
//! 2. `$PROCESS_PST_CONFIG` (environment variable)
//! 3. `~/.config/process-pst/config.toml` (Linux/macOS)
//!    `%APPDATA%\process-pst\config.toml` (Windows)
//! 4. Built-in defaults

use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

/// Top-level configuration.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    /// General behavior settings.
    pub general: GeneralConfig,
    /// Content export settings.
    pub export: ExportConfig,
    /// Tag formatting.
    pub mapping: MappingConfig,
}

/// General behavior settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct GeneralConfig {
    /// Log level: "error", "warn", "info", "debug", "trace".
    pub log_level: String,
    /// Override the directory for the log file.
    pub log_dir: Option<PathBuf>,
}

/// Content export settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ExportConfig {
    /// Threads used to read back and hash exported files (0 = one per core).
    pub hash_workers: usize,
    /// Extension for native files whose original name has none.
    pub fallback_extension: String,
    /// Encoding label for bodies that are not UTF-8 and carry no BOM.
    pub fallback_encoding: String,
}

/// Tag formatting.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct MappingConfig {
    /// Separator for multi-valued tags (`#To`, `#AttachmentNames`, …).
    pub list_separator: String,
}

// ── Default implementations ─────────────────────────────────────

impl Default for GeneralConfig {
    fn default() -> Self {
        Self {
            log_level: "warn".to_string(),
            log_dir: None,
        }
    }
}

impl Default for ExportConfig {
    fn default() -> Self {
        Self {
            hash_workers: 0,
            fallback_extension: "txt".to_string(),
            fallback_encoding: "windows-1252".to_string(),
        }
    }
}

impl Default for MappingConfig {
    fn default() -> Self {
        Self {
            list_separator: "; ".to_string(),
        }
    }
}

// ── Load ────────────────────────────────────────────────────────

/// Load configuration, searching standard locations.
///
/// Returns the default configuration if no file is found or on parse error.
pub fn load_config() -> Config {
    if let Some(path) = config_file_path() {
        if path.exists() {
            match load_config_from(&path) {
                Ok(cfg) => {
                    tracing::info!(path = %path.display(), "Loaded config");
                    return cfg;
                }
                Err(e) => {
                    tracing::warn!(
                        path = %path.display(),
                        error = %e,
                        "Failed to load config, using defaults"
                    );
                }
            }
        }
    }
    Config::default()
}

/// Load configuration from an explicit file. Errors are reported, not
/// replaced by defaults.
pub fn load_config_from(path: &Path) -> anyhow::Result<Config> {
    let contents = std::fs::read_to_string(path)?;
    Ok(toml::from_str::<Config>(&contents)?)
}

/// Determine the config file path (checking env var first, then standard dirs).
pub fn config_file_path() -> Option<PathBuf> {
    if let Ok(env_path) = std::env::var("PROCESS_PST_CONFIG") {
        return Some(PathBuf::from(env_path));
    }
    dirs::config_dir().map(|d| d.join("process-pst").join("config.toml"))
}

/// Directory for the log file.
pub fn log_dir(config: &Config) -> PathBuf {
    if let Some(ref dir) = config.general.log_dir {
        return dir.clone();
    }
    dirs::cache_dir()
        .unwrap_or_else(|| PathBuf::from("."))
        .join("process-pst")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config() {
        let cfg = Config::default();
        assert_eq!(cfg.general.log_level, "warn");
        assert_eq!(cfg.export.hash_workers, 0);
        assert_eq!(cfg.export.fallback_extension, "txt");
        assert_eq!(cfg.export.fallback_encoding, "windows-1252");
        assert_eq!(cfg.mapping.list_separator, "; ");
    }

    #[test]
    fn test_serialize_deserialize_roundtrip() {
        let cfg = Config::default();
        let toml_str = toml::to_string_pretty(&cfg).expect("serialize");
        let parsed: Config = toml::from_str(&toml_str).expect("deserialize");
        assert_eq!(parsed.general.log_level, cfg.general.log_level);
        assert_eq!(parsed.mapping.list_separator, cfg.mapping.list_separator);
    }

    #[test]
    fn test_partial_config_uses_defaults() {
        let partial = r#"
[export]
hash_workers = 2

[mapping]
list_separator = ", "
"#;
        let cfg: Config = toml::from_str(partial).expect("parse partial");
        assert_eq!(cfg.export.hash_workers, 2);
        assert_eq!(cfg.mapping.list_separator, ", ");
        assert_eq!(cfg.export.fallback_extension, "txt");
        assert_eq!(cfg.general.log_level, "warn");
    }

    #[test]
    fn test_load_config_from_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("config.toml");
        std::fs::write(&path, "[general]\nlog_level = \"debug\"\n").unwrap();
        let cfg = load_config_from(&path).unwrap();
        assert_eq!(cfg.general.log_level, "debug");

        std::fs::write(&path, "[general\n").unwrap();
        assert!(load_config_from(&path).is_err());
    }

    #[test]
    fn test_log_dir_override() {
        let mut cfg = Config::default();
        cfg.general.log_dir = Some(PathBuf::from("/tmp/pst-logs"));
        assert_eq!(log_dir(&cfg), PathBuf::from("/tmp/pst-logs"));
    }
}
