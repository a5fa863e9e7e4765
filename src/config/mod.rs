//! Configuration module for quarry.
//!
//! Handles the TOML settings file and environment variable expansion.

mod settings;

pub use settings::{expand_env_vars, GenerationSettings, Settings, SettingsError, CONFIG_ENV_VAR};
