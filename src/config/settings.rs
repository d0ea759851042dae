//! TOML-based configuration for Geofence.
//!
//! Supports a config file (geofence.toml) with environment variable expansion.
//!
//! Example configuration:
//! ```toml
//! [store]
//! path = "${HOME}/geofence/sheets.json"
//!
//! [logging]
//! level = "debug"
//! ```

use serde::{Deserialize, Serialize};
use std::env;
use std::fs;
use std::path::{Path, PathBuf};

/// Error type for settings.
#[derive(Debug, thiserror::Error)]
pub enum SettingsError {
    #[error("Config file not found: {0}")]
    FileNotFound(PathBuf),

    #[error("Failed to read config file: {0}")]
    ReadError(#[from] std::io::Error),

    #[error("Failed to parse config file: {0}")]
    ParseError(#[from] toml::de::Error),

    #[error("Missing environment variable: {0}")]
    MissingEnvVar(String),

    #[error("No sheet store configured")]
    NoStore,
}

/// Root configuration structure.
#[derive(Debug, Clone, Default, Deserialize, Serialize)]
#[serde(default)]
pub struct Settings {
    /// Sheet store configuration.
    pub store: StoreSettings,

    /// Logging configuration.
    pub logging: LoggingSettings,
}

/// Sheet store configuration.
#[derive(Debug, Clone, Default, Deserialize, Serialize)]
#[serde(default)]
pub struct StoreSettings {
    /// Path to the JSON sheet snapshot (supports ${ENV_VAR} expansion).
    pub path: Option<String>,
}

/// Logging configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct LoggingSettings {
    /// Default log filter, used when `RUST_LOG` is not set.
    pub level: String,
}

impl Default for LoggingSettings {
    fn default() -> Self {
        Self {
            level: "info".to_string(),
        }
    }
}

impl Settings {
    /// Load settings from a TOML file.
    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self, SettingsError> {
        let path = path.as_ref();
        if !path.exists() {
            return Err(SettingsError::FileNotFound(path.to_path_buf()));
        }

        let content = fs::read_to_string(path)?;
        let settings: Settings = toml::from_str(&content)?;
        Ok(settings)
    }

    /// Load settings from the default config file locations.
    ///
    /// Searches in order:
    /// 1. Environment variable `GEOFENCE_CONFIG`
    /// 2. `./geofence.toml`
    /// 3. `~/.config/geofence/config.toml`
    pub fn load() -> Result<Self, SettingsError> {
        if let Ok(path) = env::var("GEOFENCE_CONFIG") {
            return Self::from_file(&path);
        }

        let local_config = PathBuf::from("geofence.toml");
        if local_config.exists() {
            return Self::from_file(&local_config);
        }

        if let Some(config_dir) = dirs::config_dir() {
            let user_config = config_dir.join("geofence").join("config.toml");
            if user_config.exists() {
                return Self::from_file(&user_config);
            }
        }

        Ok(Settings::default())
    }

    /// Resolve the sheet store path.
    ///
    /// An explicit `override_path` wins over the configured one.
    pub fn store_path(&self, override_path: Option<&Path>) -> Result<PathBuf, SettingsError> {
        if let Some(path) = override_path {
            return Ok(path.to_path_buf());
        }
        let path = self.store.path.as_deref().ok_or(SettingsError::NoStore)?;
        Ok(PathBuf::from(expand_env_vars(path)?))
    }
}

/// Expand environment variables in a string.
///
/// Supports `${VAR}` and `$VAR` syntax.
pub fn expand_env_vars(s: &str) -> Result<String, SettingsError> {
    let mut result = String::with_capacity(s.len());
    let mut chars = s.chars().peekable();

    while let Some(c) = chars.next() {
        if c != '$' {
            result.push(c);
            continue;
        }

        let var_name = if chars.peek() == Some(&'{') {
            chars.next(); // consume '{'
            let mut name = String::new();
            for ch in chars.by_ref() {
                if ch == '}' {
                    break;
                }
                name.push(ch);
            }
            name
        } else {
            // $VAR ends at the first non-alphanumeric, non-underscore char
            let mut name = String::new();
            while let Some(&ch) = chars.peek() {
                if !(ch.is_alphanumeric() || ch == '_') {
                    break;
                }
                name.push(ch);
                chars.next();
            }
            if name.is_empty() {
                // Just a lone $, keep it
                result.push('$');
                continue;
            }
            name
        };

        let value = env::var(&var_name).map_err(|_| SettingsError::MissingEnvVar(var_name))?;
        result.push_str(&value);
    }

    Ok(result)
}
