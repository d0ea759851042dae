//! Configuration module for Geofence.
//!
//! Handles the settings file, environment variable expansion and logging
//! defaults.

mod settings;

pub use settings::{expand_env_vars, LoggingSettings, Settings, SettingsError, StoreSettings};
