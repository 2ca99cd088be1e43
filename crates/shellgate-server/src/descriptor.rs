//! The immutable template every terminal is spawned from.

use std::collections::BTreeMap;
use std::path::PathBuf;

use shellgate_common::ConfigError;
use shellgate_config::TerminalConfig;
use shellgate_pty::{ShellCommand, WindowSize};

/// Keys every shell gets regardless of the inherited environment.
const TERMINAL_ENV: &[(&str, &str)] = &[
    ("TERM", "xterm-256color"),
    ("COLORTERM", "truecolor"),
    ("TERM_PROGRAM", "shellgate"),
    ("TERM_PROGRAM_VERSION", env!("CARGO_PKG_VERSION")),
];

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TerminalRole {
    Server,
}

impl TerminalRole {
    pub fn as_str(self) -> &'static str {
        match self {
            TerminalRole::Server => "server",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TerminalDescriptor {
    pub role: TerminalRole,
    /// Absolute path of the resolved shell executable.
    pub shell: PathBuf,
    pub args: Vec<String>,
    pub cwd: PathBuf,
    pub env: BTreeMap<String, String>,
    pub port: u16,
}

impl TerminalDescriptor {
    /// Build the canonical descriptor from configuration.
    ///
    /// The shell is resolved through `PATH` and the working directory must
    /// exist; either failure is a [`ConfigError`].
    pub fn from_config(config: &TerminalConfig, port: u16) -> Result<Self, ConfigError> {
        let shell = resolve_shell(&config.shell)?;

        if !config.working_directory.is_dir() {
            return Err(ConfigError::WorkingDirectoryMissing(
                config.working_directory.clone(),
            ));
        }

        Ok(Self {
            role: TerminalRole::Server,
            shell,
            args: config.args.clone(),
            cwd: config.working_directory.clone(),
            env: terminal_environment(&config.env),
            port,
        })
    }

    /// Clone of this descriptor registered under another port.
    pub fn for_port(&self, port: u16) -> Self {
        Self {
            port,
            ..self.clone()
        }
    }

    pub fn command(&self, size: WindowSize) -> ShellCommand {
        ShellCommand {
            program: self.shell.clone(),
            args: self.args.clone(),
            cwd: self.cwd.clone(),
            env: self.env.clone(),
            size,
        }
    }
}

/// Resolve a shell name or path to an executable.
pub fn resolve_shell(shell: &str) -> Result<PathBuf, ConfigError> {
    which::which(shell).map_err(|_| ConfigError::ShellNotFound(shell.to_string()))
}

/// The process environment, then the terminal keys, then `overrides`.
pub fn terminal_environment(overrides: &BTreeMap<String, String>) -> BTreeMap<String, String> {
    let mut env: BTreeMap<String, String> = std::env::vars_os()
        .filter_map(|(key, value)| Some((key.into_string().ok()?, value.into_string().ok()?)))
        .collect();

    for (key, value) in TERMINAL_ENV {
        env.insert((*key).to_string(), (*value).to_string());
    }
    env.extend(overrides.iter().map(|(k, v)| (k.clone(), v.clone())));
    env
}
