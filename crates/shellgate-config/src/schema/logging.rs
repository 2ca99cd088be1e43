use serde::{Deserialize, Serialize};

/// Log level.
#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum LogLevel {
    Trace,
    Debug,
    #[default]
    Info,
    Warn,
    Error,
}

impl LogLevel {
    /// `EnvFilter` directive scoped to the shellgate crates.
    pub fn directive(self) -> &'static str {
        match self {
            LogLevel::Trace => "shellgate=trace",
            LogLevel::Debug => "shellgate=debug",
            LogLevel::Info => "shellgate=info",
            LogLevel::Warn => "shellgate=warn",
            LogLevel::Error => "shellgate=error",
        }
    }
}

/// Logging configuration.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct LoggingConfig {
    pub level: LogLevel,
}
