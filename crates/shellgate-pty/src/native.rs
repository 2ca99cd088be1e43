//! Native backend using the `portable-pty` crate.

use std::io::{Read, Write};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Mutex, MutexGuard, PoisonError};

use portable_pty::{native_pty_system, Child, CommandBuilder, MasterPty, PtySize};

use crate::host::{PtyHost, PtySpawner, ShellCommand, WindowSize};
use crate::PtyError;

/// errno reported by a pty master once the slave side is gone.
#[cfg(unix)]
const EIO: i32 = 5;

fn pty_size(size: WindowSize) -> PtySize {
    PtySize {
        rows: size.rows,
        cols: size.cols,
        pixel_width: 0,
        pixel_height: 0,
    }
}

fn lock<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(PoisonError::into_inner)
}

/// Spawns shells on the platform's native pseudo-terminal system.
#[derive(Debug, Default, Clone, Copy)]
pub struct NativePtySpawner;

impl NativePtySpawner {
    pub fn new() -> Self {
        Self
    }
}

impl PtySpawner for NativePtySpawner {
    fn spawn(&self, command: &ShellCommand) -> Result<Box<dyn PtyHost>, PtyError> {
        Ok(Box::new(NativePty::spawn(command)?))
    }
}

/// A `portable-pty` master plus the shell running on its slave side.
pub struct NativePty {
    writer: Mutex<Option<Box<dyn Write + Send>>>,
    reader: Mutex<Box<dyn Read + Send>>,
    master: Mutex<Option<Box<dyn MasterPty + Send>>>,
    child: Mutex<Option<Box<dyn Child + Send + Sync>>>,
    pid: Option<u32>,
    closed: AtomicBool,
}

impl NativePty {
    pub fn spawn(command: &ShellCommand) -> Result<Self, PtyError> {
        let pty_system = native_pty_system();

        let pair = pty_system
            .openpty(pty_size(command.size))
            .map_err(|e| PtyError::SpawnFailed(format!("failed to open PTY: {e}")))?;

        let mut cmd = CommandBuilder::new(&command.program);
        cmd.args(&command.args);
        cmd.cwd(&command.cwd);
        cmd.env_clear();
        for (key, value) in &command.env {
            cmd.env(key, value);
        }

        let child = pair.slave.spawn_command(cmd).map_err(|e| {
            PtyError::SpawnFailed(format!(
                "failed to spawn shell '{}': {e}",
                command.program.display()
            ))
        })?;

        // Only the child keeps the slave open, so its exit ends our reads.
        drop(pair.slave);

        let writer = pair
            .master
            .take_writer()
            .map_err(|e| PtyError::SpawnFailed(format!("failed to take PTY writer: {e}")))?;

        let reader = pair
            .master
            .try_clone_reader()
            .map_err(|e| PtyError::SpawnFailed(format!("failed to clone PTY reader: {e}")))?;

        let pid = child.process_id();
        tracing::debug!(
            program = %command.program.display(),
            pid = ?pid,
            size = %command.size,
            "PTY spawned"
        );

        Ok(Self {
            writer: Mutex::new(Some(writer)),
            reader: Mutex::new(reader),
            master: Mutex::new(Some(pair.master)),
            child: Mutex::new(Some(child)),
            pid,
            closed: AtomicBool::new(false),
        })
    }
}

impl PtyHost for NativePty {
    fn write(&self, data: &[u8]) -> Result<usize, PtyError> {
        let mut guard = lock(&self.writer);
        let writer = guard.as_mut().ok_or(PtyError::Closed)?;
        writer.write_all(data)?;
        writer.flush()?;
        Ok(data.len())
    }

    fn read(&self, buf: &mut [u8]) -> Result<usize, PtyError> {
        if self.closed.load(Ordering::Acquire) {
            return Ok(0);
        }
        match lock(&self.reader).read(buf) {
            Ok(n) => Ok(n),
            #[cfg(unix)]
            Err(e) if e.raw_os_error() == Some(EIO) => Ok(0),
            Err(e) => Err(e.into()),
        }
    }

    fn resize(&self, size: WindowSize) -> Result<(), PtyError> {
        let guard = lock(&self.master);
        let master = guard.as_ref().ok_or(PtyError::Closed)?;
        master
            .resize(pty_size(size))
            .map_err(|e| PtyError::ResizeFailed(e.to_string()))
    }

    fn close(&self) {
        if self.closed.swap(true, Ordering::AcqRel) {
            return;
        }

        lock(&self.writer).take();

        if let Some(mut child) = lock(&self.child).take() {
            if let Ok(None) = child.try_wait() {
                if let Err(e) = child.kill() {
                    tracing::debug!("PTY kill error (may already be dead): {e}");
                }
            }
            match child.wait() {
                Ok(status) => {
                    tracing::debug!(pid = ?self.pid, code = status.exit_code(), "Shell exited")
                }
                Err(e) => tracing::debug!(pid = ?self.pid, "PTY wait error: {e}"),
            }
        }

        lock(&self.master).take();
    }

    fn process_id(&self) -> Option<u32> {
        self.pid
    }
}

impl Drop for NativePty {
    fn drop(&mut self) {
        self.close();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::BTreeMap;
    use std::path::PathBuf;
    use std::time::{Duration, Instant};

    fn sh() -> ShellCommand {
        let mut env = BTreeMap::new();
        if let Ok(path) = std::env::var("PATH") {
            env.insert("PATH".to_string(), path);
        }
        env.insert("TERM".to_string(), "xterm-256color".to_string());
        ShellCommand {
            program: PathBuf::from("/bin/sh"),
            args: Vec::new(),
            cwd: std::env::temp_dir(),
            env,
            size: WindowSize::new(24, 80),
        }
    }

    fn read_until(pty: &NativePty, needle: &str) -> String {
        let mut output = String::new();
        let mut buf = [0u8; 4096];
        let deadline = Instant::now() + Duration::from_secs(5);
        while Instant::now() < deadline {
            match pty.read(&mut buf) {
                Ok(0) | Err(_) => break,
                Ok(n) => {
                    output.push_str(&String::from_utf8_lossy(&buf[..n]));
                    if output.contains(needle) {
                        break;
                    }
                }
            }
        }
        output
    }

    #[test]
    #[cfg(unix)]
    fn spawn_and_echo() {
        let pty = NativePty::spawn(&sh()).expect("spawn sh");
        assert!(pty.process_id().is_some());

        pty.write(b"echo PTY_TEST_MARKER_12345\n").expect("write");
        let output = read_until(&pty, "PTY_TEST_MARKER_12345");
        assert!(
            output.contains("PTY_TEST_MARKER_12345"),
            "expected marker in output, got: {output:?}"
        );

        pty.close();
    }

    #[test]
    #[cfg(unix)]
    fn resize_reaches_the_shell() {
        let pty = NativePty::spawn(&sh()).expect("spawn sh");
        pty.resize(WindowSize::new(40, 132)).expect("resize");

        pty.write(b"stty size\n").expect("write");
        let output = read_until(&pty, "40 132");
        assert!(output.contains("40 132"), "got: {output:?}");

        pty.close();
    }

    #[test]
    #[cfg(unix)]
    fn shell_exit_reads_end_of_stream() {
        let pty = NativePty::spawn(&sh()).expect("spawn sh");
        pty.write(b"exit\n").expect("write");

        let mut buf = [0u8; 4096];
        let deadline = Instant::now() + Duration::from_secs(5);
        let mut eof = false;
        while Instant::now() < deadline {
            if let Ok(0) = pty.read(&mut buf) {
                eof = true;
                break;
            }
        }
        assert!(eof, "reader should observe end of stream after exit");
        pty.close();
    }

    #[test]
    #[cfg(unix)]
    fn close_is_idempotent() {
        let pty = NativePty::spawn(&sh()).expect("spawn sh");
        pty.close();
        pty.close();

        assert!(matches!(pty.write(b"ls\n"), Err(PtyError::Closed)));
        assert!(matches!(
            pty.resize(WindowSize::new(10, 10)),
            Err(PtyError::Closed)
        ));
        let mut buf = [0u8; 16];
        assert_eq!(pty.read(&mut buf).unwrap(), 0);
    }

    #[test]
    #[cfg(unix)]
    fn spawn_missing_program_fails() {
        let mut command = sh();
        command.program = PathBuf::from("/definitely/not/a/shell");
        let result = NativePtySpawner::new().spawn(&command);
        assert!(matches!(result, Err(PtyError::SpawnFailed(_))));
    }
}
