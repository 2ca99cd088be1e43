//! Configuration schema types for shellgate.
//!
//! All structs use `serde(default)` so partial configs work correctly.

mod logging;
mod server;
mod terminal;

pub use logging::*;
pub use server::*;
pub use terminal::*;

use serde::{Deserialize, Serialize};

/// Root configuration.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct ShellgateConfig {
    pub terminal: TerminalConfig,
    pub server: ServerConfig,
    pub logging: LoggingConfig,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn empty_toml_gives_defaults() {
        let config: ShellgateConfig = toml::from_str("").unwrap();
        assert_eq!(config.terminal.port, DEFAULT_PORT);
        assert_eq!(config.server.path, DEFAULT_ENDPOINT_PATH);
        assert_eq!(config.logging.level, LogLevel::Info);
    }

    #[test]
    fn sections_are_independent() {
        let toml_str = r#"
[server]
bind_address = "0.0.0.0"

[logging]
level = "debug"
"#;
        let config: ShellgateConfig = toml::from_str(toml_str).unwrap();
        assert_eq!(config.server.bind_address, "0.0.0.0");
        assert_eq!(config.logging.level, LogLevel::Debug);
        assert_eq!(config.terminal.port, DEFAULT_PORT);
    }
}
