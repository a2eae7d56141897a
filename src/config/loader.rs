//! Configuration loading with defaults

use std::path::Path;

use crate::errors::{FunnelError, Result};
use crate::fs;
use crate::schemas::Config;

/// Load configuration for a board, falling back to defaults.
///
/// If config.json exists, it will be read and merged with defaults.
/// If it doesn't exist, default configuration is returned.
///
/// # Errors
/// * `ConfigError` - If the file exists but cannot be parsed, or declares a
///   schema version this build does not understand
pub fn load_config(root: &Path) -> Result<Config> {
    let config = fs::read_config(root).map_err(|e| match e {
        FunnelError::InvalidJson(message) => FunnelError::ConfigError(message),
        other => other,
    })?;

    if config.schema_version != 1 {
        return Err(FunnelError::ConfigError(format!(
            "unsupported config schema_version {}",
            config.schema_version
        )));
    }

    Ok(config)
}
