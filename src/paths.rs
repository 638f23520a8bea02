//! Centralized path utilities for the application.

use std::path::PathBuf;

/// Environment variable that overrides the config file location.
pub const CONFIG_PATH_ENV: &str = "GALACTITURF_WAKEUP_CONFIG";

/// Get the root data directory for the application (~/.galactiturf).
///
/// Falls back to the working directory when no home directory is known,
/// which is the usual situation inside CI containers.
pub fn get_data_dir() -> PathBuf {
    dirs::home_dir()
        .unwrap_or_else(|| PathBuf::from("."))
        .join(".galactiturf")
}

/// Get the path to the config file.
pub fn config_path() -> PathBuf {
    match std::env::var_os(CONFIG_PATH_ENV) {
        Some(path) if !path.is_empty() => PathBuf::from(path),
        _ => get_data_dir().join("wakeup.toml"),
    }
}
