//! In-memory pseudo-terminals and WebSocket client helpers for tests.

use std::collections::{BTreeMap, VecDeque};
use std::net::SocketAddr;
use std::path::PathBuf;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::{Arc, Condvar, Mutex};
use std::time::Duration;

use futures_util::StreamExt;
use shellgate_pty::{PtyError, PtyHost, PtySpawner, ShellCommand, WindowSize};
use tokio::net::TcpStream;
use tokio_tungstenite::tungstenite::{Error as WsError, Message};
use tokio_tungstenite::{MaybeTlsStream, WebSocketStream};

use crate::descriptor::{TerminalDescriptor, TerminalRole};

const TIMEOUT: Duration = Duration::from_secs(5);

pub type Client = WebSocketStream<MaybeTlsStream<TcpStream>>;

#[derive(Default)]
struct Output {
    pending: VecDeque<u8>,
    finished: bool,
}

#[derive(Default)]
struct FakeState {
    output: Mutex<Output>,
    ready: Condvar,
    written: Mutex<Vec<u8>>,
    resizes: Mutex<Vec<WindowSize>>,
    resize_fails: AtomicBool,
    close_calls: AtomicUsize,
}

/// Scripted pty. Clones share state, so a test keeps one handle while the
/// session owns another.
#[derive(Clone, Default)]
pub struct FakePty {
    state: Arc<FakeState>,
}

impl FakePty {
    pub fn new() -> Self {
        Self::default()
    }

    /// Queue shell output.
    pub fn emit(&self, bytes: &[u8]) {
        let mut output = self.state.output.lock().unwrap();
        output.pending.extend(bytes);
        self.state.ready.notify_all();
    }

    /// Simulate the shell exiting: reads hit end of stream once drained.
    pub fn finish(&self) {
        self.state.output.lock().unwrap().finished = true;
        self.state.ready.notify_all();
    }

    pub fn fail_resize(&self) {
        self.state.resize_fails.store(true, Ordering::SeqCst);
    }

    pub fn written(&self) -> Vec<u8> {
        self.state.written.lock().unwrap().clone()
    }

    pub fn resizes(&self) -> Vec<WindowSize> {
        self.state.resizes.lock().unwrap().clone()
    }

    pub fn close_calls(&self) -> usize {
        self.state.close_calls.load(Ordering::SeqCst)
    }
}

impl PtyHost for FakePty {
    fn write(&self, data: &[u8]) -> Result<usize, PtyError> {
        if self.close_calls() > 0 {
            return Err(PtyError::Closed);
        }
        self.state.written.lock().unwrap().extend_from_slice(data);
        Ok(data.len())
    }

    fn read(&self, buf: &mut [u8]) -> Result<usize, PtyError> {
        let mut output = self.state.output.lock().unwrap();
        while output.pending.is_empty() && !output.finished {
            output = self.state.ready.wait(output).unwrap();
        }
        let n = buf.len().min(output.pending.len());
        for (slot, byte) in buf.iter_mut().zip(output.pending.drain(..n)) {
            *slot = byte;
        }
        Ok(n)
    }

    fn resize(&self, size: WindowSize) -> Result<(), PtyError> {
        if self.state.resize_fails.load(Ordering::SeqCst) {
            return Err(PtyError::ResizeFailed("unsupported".into()));
        }
        self.state.resizes.lock().unwrap().push(size);
        Ok(())
    }

    fn close(&self) {
        self.state.close_calls.fetch_add(1, Ordering::SeqCst);
        let mut output = self.state.output.lock().unwrap();
        output.pending.clear();
        output.finished = true;
        self.state.ready.notify_all();
    }

    fn process_id(&self) -> Option<u32> {
        Some(4242)
    }
}

/// Spawner handing out [`FakePty`]s and recording what it was asked for.
#[derive(Default)]
pub struct FakeSpawner {
    fail: bool,
    commands: Mutex<Vec<ShellCommand>>,
    spawned: Mutex<Vec<FakePty>>,
}

impl FakeSpawner {
    pub fn new() -> Arc<Self> {
        Arc::new(Self::default())
    }

    pub fn failing() -> Arc<Self> {
        Arc::new(Self {
            fail: true,
            ..Self::default()
        })
    }

    pub fn spawn_count(&self) -> usize {
        self.spawned.lock().unwrap().len()
    }

    pub fn commands(&self) -> Vec<ShellCommand> {
        self.commands.lock().unwrap().clone()
    }

    /// Wait until `n` ptys exist and return the `n`th.
    pub async fn wait_for_spawn(&self, n: usize) -> FakePty {
        let deadline = tokio::time::Instant::now() + TIMEOUT;
        loop {
            if let Some(pty) = self.spawned.lock().unwrap().get(n - 1) {
                return pty.clone();
            }
            assert!(
                tokio::time::Instant::now() < deadline,
                "pty #{n} was never spawned"
            );
            tokio::time::sleep(Duration::from_millis(10)).await;
        }
    }
}

impl PtySpawner for FakeSpawner {
    fn spawn(&self, command: &ShellCommand) -> Result<Box<dyn PtyHost>, PtyError> {
        self.commands.lock().unwrap().push(command.clone());
        if self.fail {
            return Err(PtyError::SpawnFailed("no shell here".into()));
        }
        let pty = FakePty::new();
        self.spawned.lock().unwrap().push(pty.clone());
        Ok(Box::new(pty))
    }
}

pub fn test_descriptor(port: u16) -> TerminalDescriptor {
    TerminalDescriptor {
        role: TerminalRole::Server,
        shell: PathBuf::from("/bin/sh"),
        args: Vec::new(),
        cwd: PathBuf::from("/"),
        env: BTreeMap::from([("TERM".to_string(), "xterm-256color".to_string())]),
        port,
    }
}

pub async fn connect(addr: SocketAddr, path: &str) -> Result<Client, WsError> {
    let url = format!("ws://{addr}{path}");
    let (client, _response) = tokio_tungstenite::connect_async(url).await?;
    Ok(client)
}

/// Poll `check` until it holds, failing the test after a timeout.
pub async fn eventually<F: FnMut() -> bool>(mut check: F) {
    let deadline = tokio::time::Instant::now() + TIMEOUT;
    while !check() {
        assert!(
            tokio::time::Instant::now() < deadline,
            "condition not met in time"
        );
        tokio::time::sleep(Duration::from_millis(10)).await;
    }
}

/// Next binary frame from the server.
pub async fn next_binary(client: &mut Client) -> Vec<u8> {
    loop {
        let frame = tokio::time::timeout(TIMEOUT, client.next())
            .await
            .expect("timed out waiting for output");
        match frame {
            Some(Ok(Message::Binary(data))) => return data.to_vec(),
            Some(Ok(Message::Ping(_) | Message::Pong(_))) => continue,
            other => panic!("expected a binary frame, got {other:?}"),
        }
    }
}

/// Wait for the server to end the connection, skipping any late output.
pub async fn expect_closed(client: &mut Client) {
    loop {
        let frame = tokio::time::timeout(TIMEOUT, client.next())
            .await
            .expect("timed out waiting for the connection to close");
        match frame {
            Some(Ok(Message::Close(_))) | None | Some(Err(_)) => return,
            Some(Ok(_)) => continue,
        }
    }
}
