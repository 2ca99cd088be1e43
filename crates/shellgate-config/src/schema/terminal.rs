//! Shell process configuration: the descriptor template every terminal is
//! spawned from.

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::path::PathBuf;

/// Default base port of the gateway.
pub const DEFAULT_PORT: u16 = 3000;

/// Shell process settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct TerminalConfig {
    /// Shell program, either a path or a name resolved through `PATH`.
    pub shell: String,
    /// Arguments passed to the shell.
    pub args: Vec<String>,
    /// Initial working directory of every terminal.
    pub working_directory: PathBuf,
    /// Environment overrides applied on top of the inherited environment.
    pub env: BTreeMap<String, String>,
    /// Base port. Extra tabs are numbered `port + 2 ..= port + 5`.
    pub port: u16,
}

impl Default for TerminalConfig {
    fn default() -> Self {
        Self {
            shell: default_shell(),
            args: Vec::new(),
            working_directory: default_working_directory(),
            env: BTreeMap::new(),
            port: DEFAULT_PORT,
        }
    }
}

/// Get the user's default shell.
///
/// - Unix: reads `$SHELL`, falls back to `bash`
/// - Windows: `powershell.exe`
pub fn default_shell() -> String {
    #[cfg(windows)]
    {
        "powershell.exe".to_string()
    }
    #[cfg(not(windows))]
    {
        std::env::var("SHELL")
            .ok()
            .filter(|s| !s.is_empty())
            .unwrap_or_else(|| "bash".to_string())
    }
}

fn default_working_directory() -> PathBuf {
    dirs::home_dir().unwrap_or_else(|| PathBuf::from("."))
}
