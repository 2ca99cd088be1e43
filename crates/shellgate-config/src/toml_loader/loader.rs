//! Core TOML config loading: read from path or platform default.

use crate::schema::ShellgateConfig;
use shellgate_common::ConfigError;
use std::path::Path;
use tracing::info;

use super::paths::{create_default_config, default_config_path};

/// Load config from a specific TOML file path.
///
/// Missing fields are filled from serde defaults. Validation is left to the
/// caller so CLI overrides can be applied first.
pub fn load_from_path(path: &Path) -> Result<ShellgateConfig, ConfigError> {
    let content = match std::fs::read_to_string(path) {
        Ok(content) => content,
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
            return Err(ConfigError::FileNotFound(path.to_path_buf()));
        }
        Err(e) => {
            return Err(ConfigError::ParseError(format!(
                "failed to read {}: {e}",
                path.display()
            )));
        }
    };

    let config: ShellgateConfig = toml::from_str(&content)
        .map_err(|e| ConfigError::ParseError(format!("failed to parse TOML: {e}")))?;

    info!("loaded config from {}", path.display());
    Ok(config)
}

/// Load config from the platform-specific default path.
///
/// On Linux: `~/.config/shellgate/config.toml`
/// On macOS: `~/Library/Application Support/shellgate/config.toml`
///
/// If the file does not exist, creates a default config file and returns defaults.
pub fn load_default() -> Result<ShellgateConfig, ConfigError> {
    let path = default_config_path()?;

    match load_from_path(&path) {
        Ok(config) => Ok(config),
        Err(ConfigError::FileNotFound(_)) => {
            info!("no config found at {}, creating default", path.display());
            create_default_config(&path)?;
            Ok(ShellgateConfig::default())
        }
        Err(e) => Err(e),
    }
}
