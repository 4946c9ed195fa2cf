//! Application configuration.
//!
//! Handles loading, validating, and merging `config.toml`. Stock defaults are
//! the base layer; a user file overrides any subset of keys.
//!
//! ## Config File Location
//!
//! `--config <path>` on the command line, otherwise
//! `<user config dir>/idphoto/config.toml` (e.g. `~/.config/idphoto/` on
//! Linux). A missing file means stock defaults.
//!
//! ## Configuration Options
//!
//! ```toml
//! # All options are optional - defaults shown below
//!
//! [service]
//! model = "gemini-2.0-flash-exp-image-generation"
//! endpoint = "https://generativelanguage.googleapis.com"
//! # api_key = "..."        # Fallback key when the user has not set one
//! # timeout_secs = 120     # Omit to wait indefinitely
//!
//! [export]
//! # label = "id_photo"     # Artifact name: <label>_<width>x<height>.jpg
//!                          # Unset: 证件照 for zh-cn, id_photo otherwise
//! ```
//!
//! JPEG quality is fixed at 90 and not configurable.
//!
//! Unknown keys are rejected to catch typos early.

use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};
use thiserror::Error;

#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
    #[error("TOML parse error: {0}")]
    Toml(#[from] toml::de::Error),
    #[error("Config validation error: {0}")]
    Validation(String),
}

/// Application configuration loaded from `config.toml`.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct AppConfig {
    /// Generation service settings.
    pub service: ServiceConfig,
    /// Export settings.
    pub export: ExportConfig,
}

impl AppConfig {
    /// Validate config values are within acceptable ranges.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.service.model.trim().is_empty() {
            return Err(ConfigError::Validation(
                "service.model must not be empty".into(),
            ));
        }
        let endpoint = self.service.endpoint.trim();
        if !(endpoint.starts_with("http://") || endpoint.starts_with("https://")) {
            return Err(ConfigError::Validation(format!(
                "service.endpoint must be an http(s) URL, got '{endpoint}'"
            )));
        }
        if self.service.timeout_secs == Some(0) {
            return Err(ConfigError::Validation(
                "service.timeout_secs must be positive (omit it to disable)".into(),
            ));
        }
        if let Some(label) = &self.export.label {
            let bad_char = label
                .chars()
                .any(|c| std::path::is_separator(c) || c.is_control());
            if label.is_empty() || bad_char {
                return Err(ConfigError::Validation(
                    "export.label must be a non-empty file name fragment".into(),
                ));
            }
        }
        Ok(())
    }
}

/// Remote generation service settings.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct ServiceConfig {
    /// Model identifier.
    pub model: String,
    /// API base URL, without a trailing path.
    pub endpoint: String,
    /// Fallback key used when the user has not stored one.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub api_key: Option<String>,
    /// Request timeout. `None` waits indefinitely.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub timeout_secs: Option<u64>,
}

impl Default for ServiceConfig {
    fn default() -> Self {
        Self {
            model: "gemini-2.0-flash-exp-image-generation".to_string(),
            endpoint: "https://generativelanguage.googleapis.com".to_string(),
            api_key: None,
            timeout_secs: None,
        }
    }
}

/// Export settings.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct ExportConfig {
    /// File name prefix for exported photos. `None` picks one by language.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub label: Option<String>,
}

// =============================================================================
// Config loading, merging, and validation
// =============================================================================

/// Default location of `config.toml`.
pub fn default_config_path() -> Option<PathBuf> {
    dirs::config_dir().map(|d| d.join("idphoto").join("config.toml"))
}

/// Returns the stock default config as a `toml::Value::Table`.
pub fn stock_defaults_value() -> Result<toml::Value, ConfigError> {
    toml::Value::try_from(AppConfig::default())
        .map_err(|e| ConfigError::Validation(format!("default config must serialize: {e}")))
}

/// Recursively merge `overlay` on top of `base`.
///
/// - Tables are merged key-by-key (overlay keys override base keys).
/// - Non-table values in overlay replace base values entirely.
/// - Keys in base that are not in overlay are preserved.
pub fn merge_toml(base: toml::Value, overlay: toml::Value) -> toml::Value {
    match (base, overlay) {
        (toml::Value::Table(mut base_table), toml::Value::Table(overlay_table)) => {
            for (key, overlay_val) in overlay_table {
                let merged = match base_table.remove(&key) {
                    Some(base_val) => merge_toml(base_val, overlay_val),
                    None => overlay_val,
                };
                base_table.insert(key, merged);
            }
            toml::Value::Table(base_table)
        }
        (_, overlay) => overlay,
    }
}

/// Merge an optional overlay onto the stock defaults, then deserialize and validate.
pub fn resolve_config(overlay: Option<toml::Value>) -> Result<AppConfig, ConfigError> {
    let base = stock_defaults_value()?;
    let merged = match overlay {
        Some(ov) => merge_toml(base, ov),
        None => base,
    };
    let config: AppConfig = merged.try_into()?;
    config.validate()?;
    Ok(config)
}

/// Load config from a file path.
///
/// A missing file yields stock defaults. Present files are merged over the
/// defaults, unknown keys are rejected, and the result is validated.
pub fn load_config(path: &Path) -> Result<AppConfig, ConfigError> {
    if !path.exists() {
        tracing::debug!(path = %path.display(), "no config file, using defaults");
        return resolve_config(None);
    }
    let content = fs::read_to_string(path)?;
    let value: toml::Value = toml::from_str(&content)?;
    resolve_config(Some(value))
}

/// Returns a fully-commented stock `config.toml` with all keys and explanations.
///
/// Used by the `gen-config` CLI command.
pub fn stock_config_toml() -> &'static str {
    r##"# idphoto Configuration
# =====================
# All settings are optional. Remove or comment out any you don't need.
# Values shown below are the defaults.
# Unknown keys will cause an error.

# ---------------------------------------------------------------------------
# Generation service
# ---------------------------------------------------------------------------
[service]
# Model that repaints the background. It must be able to answer with images.
model = "gemini-2.0-flash-exp-image-generation"

# API base URL. Requests go to <endpoint>/v1beta/models/<model>:generateContent
endpoint = "https://generativelanguage.googleapis.com"

# Fallback API key, used only when no key was stored with `idphoto key set`.
# A key compiled in through APP_GEMINI_API_KEY takes precedence over this one.
# api_key = ""

# Give up on a request after this many seconds.
# Omit to wait as long as the service takes.
# timeout_secs = 120

# ---------------------------------------------------------------------------
# Export
# ---------------------------------------------------------------------------
[export]
# Exported files are named <label>_<width>x<height>.jpg
# When unset the label follows the language (`idphoto lang`):
# 证件照 for zh-cn, id_photo for the others.
# label = "id_photo"
"##
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn default_config_values() {
        let config = AppConfig::default();
        assert_eq!(config.service.model, "gemini-2.0-flash-exp-image-generation");
        assert_eq!(
            config.service.endpoint,
            "https://generativelanguage.googleapis.com"
        );
        assert_eq!(config.service.api_key, None);
        assert_eq!(config.service.timeout_secs, None);
        assert_eq!(config.export.label, None);
    }

    #[test]
    fn default_config_is_valid() {
        AppConfig::default().validate().unwrap();
    }

    #[test]
    fn stock_toml_matches_defaults() {
        let value: toml::Value = toml::from_str(stock_config_toml()).unwrap();
        let config = resolve_config(Some(value)).unwrap();
        assert_eq!(config, AppConfig::default());
    }

    #[test]
    fn partial_override_keeps_other_defaults() {
        let value: toml::Value = toml::from_str(
            r#"
[export]
label = "passport"
"#,
        )
        .unwrap();
        let config = resolve_config(Some(value)).unwrap();
        assert_eq!(config.export.label.as_deref(), Some("passport"));
        assert_eq!(config.service, ServiceConfig::default());
    }

    #[test]
    fn unknown_keys_are_rejected() {
        let value: toml::Value = toml::from_str(
            r#"
[service]
modle = "typo"
"#,
        )
        .unwrap();
        assert!(matches!(
            resolve_config(Some(value)),
            Err(ConfigError::Toml(_))
        ));
    }

    #[test]
    fn export_quality_is_not_configurable() {
        let value: toml::Value = toml::from_str("[export]\nquality = 20\n").unwrap();
        assert!(matches!(
            resolve_config(Some(value)),
            Err(ConfigError::Toml(_))
        ));
    }

    #[test]
    fn validation_rejects_bad_values() {
        let mut config = AppConfig::default();
        config.export.label = Some("a/b".into());
        assert!(config.validate().is_err());

        let mut config = AppConfig::default();
        config.export.label = Some(String::new());
        assert!(config.validate().is_err());

        let mut config = AppConfig::default();
        config.service.endpoint = "ftp://example.com".into();
        assert!(config.validate().is_err());

        let mut config = AppConfig::default();
        config.service.timeout_secs = Some(0);
        assert!(config.validate().is_err());

        let mut config = AppConfig::default();
        config.service.model = " ".into();
        assert!(config.validate().is_err());
    }

    #[test]
    fn merge_replaces_scalars_and_merges_tables() {
        let base: toml::Value = toml::from_str("[a]\nx = 1\ny = 2\n").unwrap();
        let overlay: toml::Value = toml::from_str("[a]\ny = 3\nz = 4\n").unwrap();
        let merged = merge_toml(base, overlay);
        let a = merged.get("a").unwrap();
        assert_eq!(a.get("x").unwrap().as_integer(), Some(1));
        assert_eq!(a.get("y").unwrap().as_integer(), Some(3));
        assert_eq!(a.get("z").unwrap().as_integer(), Some(4));
    }

    #[test]
    fn load_missing_file_gives_defaults() {
        let tmp = TempDir::new().unwrap();
        let config = load_config(&tmp.path().join("config.toml")).unwrap();
        assert_eq!(config, AppConfig::default());
    }

    #[test]
    fn load_file_with_overrides() {
        let tmp = TempDir::new().unwrap();
        let path = tmp.path().join("config.toml");
        fs::write(
            &path,
            "[service]\napi_key = \"abc\"\ntimeout_secs = 30\n[export]\nlabel = \"visa\"\n",
        )
        .unwrap();
        let config = load_config(&path).unwrap();
        assert_eq!(config.service.api_key.as_deref(), Some("abc"));
        assert_eq!(config.service.timeout_secs, Some(30));
        assert_eq!(config.export.label.as_deref(), Some("visa"));
    }

    #[test]
    fn load_invalid_toml_errors() {
        let tmp = TempDir::new().unwrap();
        let path = tmp.path().join("config.toml");
        fs::write(&path, "[export\nquality = ").unwrap();
        assert!(matches!(load_config(&path), Err(ConfigError::Toml(_))));
    }
}
