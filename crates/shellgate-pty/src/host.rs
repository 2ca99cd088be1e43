//! The pseudo-terminal capability set shared by every backend.

use std::collections::BTreeMap;
use std::fmt;
use std::path::PathBuf;

use crate::PtyError;

/// Default terminal columns for a freshly spawned shell.
pub const DEFAULT_COLS: u16 = 120;

/// Default terminal rows for a freshly spawned shell.
pub const DEFAULT_ROWS: u16 = 20;

/// Terminal dimensions in character cells.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct WindowSize {
    pub rows: u16,
    pub cols: u16,
}

impl WindowSize {
    pub fn new(rows: u16, cols: u16) -> Self {
        Self { rows, cols }
    }
}

impl Default for WindowSize {
    fn default() -> Self {
        Self::new(DEFAULT_ROWS, DEFAULT_COLS)
    }
}

impl fmt::Display for WindowSize {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}x{}", self.cols, self.rows)
    }
}

/// Everything needed to launch a shell inside a pseudo-terminal.
#[derive(Debug, Clone)]
pub struct ShellCommand {
    pub program: PathBuf,
    pub args: Vec<String>,
    pub cwd: PathBuf,
    /// Complete environment of the child. Nothing is inherited implicitly.
    pub env: BTreeMap<String, String>,
    pub size: WindowSize,
}

/// One live pseudo-terminal with its child process.
///
/// Reads and writes may happen concurrently from different threads: output
/// is pumped by a dedicated reader while input arrives from the network.
/// All methods are blocking.
pub trait PtyHost: Send + Sync {
    /// Write bytes to the shell's input. Returns the number of bytes written.
    fn write(&self, data: &[u8]) -> Result<usize, PtyError>;

    /// Read shell output into `buf`. `Ok(0)` means end of stream.
    fn read(&self, buf: &mut [u8]) -> Result<usize, PtyError>;

    /// Change the terminal dimensions.
    fn resize(&self, size: WindowSize) -> Result<(), PtyError>;

    /// Release the pseudo-terminal, terminate the child and reap it.
    /// Safe to call more than once.
    fn close(&self);

    /// OS process id of the child, when the platform reports one.
    fn process_id(&self) -> Option<u32> {
        None
    }
}

/// Factory for [`PtyHost`] instances.
pub trait PtySpawner: Send + Sync {
    fn spawn(&self, command: &ShellCommand) -> Result<Box<dyn PtyHost>, PtyError>;
}
