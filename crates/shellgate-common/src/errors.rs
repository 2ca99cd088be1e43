use std::path::PathBuf;

#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("config file not found: {0}")]
    FileNotFound(PathBuf),

    #[error("config parse error: {0}")]
    ParseError(String),

    #[error("config validation error: {0}")]
    ValidationError(String),

    #[error("shell not found: {0}")]
    ShellNotFound(String),

    #[error("working directory does not exist: {0}")]
    WorkingDirectoryMissing(PathBuf),
}

/// Failures surfaced by the terminal manager.
///
/// Only `Config` and `Transport` (listener bind) are fatal at startup.
/// Everything that happens inside a single connection is logged by the
/// gateway and never reaches the caller.
#[derive(Debug, thiserror::Error)]
pub enum TerminalError {
    #[error(transparent)]
    Config(#[from] ConfigError),

    #[error("maximum number of terminals reached ({capacity})")]
    ResourceExhausted { capacity: usize },

    #[error("process error: {0}")]
    Process(String),

    #[error("transport error: {0}")]
    Transport(String),

    #[error("shutdown error: {0}")]
    Shutdown(String),

    #[error(transparent)]
    Io(#[from] std::io::Error),
}

impl TerminalError {
    /// Whether the caller can retry after freeing resources.
    pub fn is_recoverable(&self) -> bool {
        matches!(self, TerminalError::ResourceExhausted { .. })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn config_error_display() {
        let err = ConfigError::FileNotFound(PathBuf::from("/tmp/missing.toml"));
        assert_eq!(err.to_string(), "config file not found: /tmp/missing.toml");

        let err = ConfigError::ParseError("unexpected token".into());
        assert_eq!(err.to_string(), "config parse error: unexpected token");

        let err = ConfigError::ShellNotFound("nosuchshell".into());
        assert_eq!(err.to_string(), "shell not found: nosuchshell");

        let err = ConfigError::WorkingDirectoryMissing(PathBuf::from("/does/not/exist"));
        assert_eq!(
            err.to_string(),
            "working directory does not exist: /does/not/exist"
        );
    }

    #[test]
    fn terminal_error_from_config() {
        let config_err = ConfigError::ShellNotFound("zsh".into());
        let err: TerminalError = config_err.into();
        assert!(matches!(err, TerminalError::Config(_)));
        assert!(err.to_string().contains("zsh"));
    }

    #[test]
    fn terminal_error_from_io() {
        let io_err = std::io::Error::new(std::io::ErrorKind::AddrInUse, "port taken");
        let err: TerminalError = io_err.into();
        assert!(matches!(err, TerminalError::Io(_)));
        assert!(err.to_string().contains("port taken"));
    }

    #[test]
    fn resource_exhausted_is_recoverable() {
        let err = TerminalError::ResourceExhausted { capacity: 4 };
        assert!(err.is_recoverable());
        assert_eq!(err.to_string(), "maximum number of terminals reached (4)");

        assert!(!TerminalError::Shutdown("timed out".into()).is_recoverable());
        assert!(!TerminalError::Process("spawn failed".into()).is_recoverable());
    }

    #[test]
    fn terminal_error_other_variants() {
        let err = TerminalError::Transport("handshake failed".into());
        assert_eq!(err.to_string(), "transport error: handshake failed");

        let err = TerminalError::Shutdown("listener did not stop".into());
        assert_eq!(err.to_string(), "shutdown error: listener did not stop");
    }
}
