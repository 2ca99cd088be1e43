//! Pseudo-terminal host: one OS pseudo-terminal bound to one shell process.
//!
//! [`PtyHost`] is the capability the rest of shellgate depends on. The
//! [`NativePtySpawner`] backend uses `portable-pty`, which selects a Unix
//! pty or a Windows ConPTY for the target platform.

mod error;
mod host;
mod native;

pub use error::PtyError;
pub use host::{PtyHost, PtySpawner, ShellCommand, WindowSize, DEFAULT_COLS, DEFAULT_ROWS};
pub use native::{NativePty, NativePtySpawner};
