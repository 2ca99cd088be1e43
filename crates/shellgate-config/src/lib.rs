//! Shellgate configuration.
//!
//! TOML-based configuration for the terminal gateway. Every section uses
//! serde defaults so partial files (or no file at all) work out of the box.
//!
//! ```rust,no_run
//! use shellgate_config::load_config;
//!
//! let config = load_config().expect("failed to load config");
//! println!("shell = {}", config.terminal.shell);
//! ```

pub mod schema;
pub mod toml_loader;
pub mod validation;

pub use schema::{LogLevel, LoggingConfig, ServerConfig, ShellgateConfig, TerminalConfig};
pub use toml_loader::{create_default_config, default_config_path, load_default, load_from_path};

use shellgate_common::ConfigError;

/// Load config from the platform default path and validate it.
///
/// Creates a documented default file if none exists yet.
pub fn load_config() -> Result<ShellgateConfig, ConfigError> {
    let config = toml_loader::load_default()?;
    validation::validate(&config)?;
    Ok(config)
}
