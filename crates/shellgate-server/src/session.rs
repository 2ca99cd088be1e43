//! One live terminal: a shell behind a pseudo-terminal, paired with one
//! WebSocket connection.
//!
//! Two loops run per session:
//! - the input loop consumes client frames in order, applies resize
//!   controls and writes everything else to the shell;
//! - the output loop pumps shell output to the client as binary frames.
//!
//! Either loop ending asks the other to stop through the session's
//! cancellation token. Releasing the pseudo-terminal is what unblocks a
//! reader stuck inside the shell's output stream.

use std::net::SocketAddr;
use std::sync::{Arc, Mutex, PoisonError};

use futures_util::{Sink, SinkExt, Stream, StreamExt};
use shellgate_common::SessionId;
use shellgate_pty::{PtyError, PtyHost, WindowSize};
use tokio::sync::mpsc;
use tokio_tungstenite::tungstenite::protocol::frame::coding::CloseCode;
use tokio_tungstenite::tungstenite::{Error as WsError, Message};
use tokio_util::sync::CancellationToken;

use crate::resize::parse_resize;

/// Size of a single read from the shell's output stream.
pub const OUTPUT_BUFFER_SIZE: usize = 4096;

/// Output chunks buffered between the reader thread and the socket.
const OUTPUT_QUEUE_DEPTH: usize = 64;

/// A client frame, decoded.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Inbound {
    Resize(WindowSize),
    Data(Vec<u8>),
}

impl Inbound {
    /// Classify a WebSocket message. Control frames yield `None`.
    ///
    /// Only text frames can carry a resize; binary frames are always data.
    pub fn from_message(message: Message) -> Option<Self> {
        match message {
            Message::Text(text) => Some(match parse_resize(text.as_str()) {
                Some(size) => Inbound::Resize(size),
                None => Inbound::Data(text.as_bytes().to_vec()),
            }),
            Message::Binary(data) => Some(Inbound::Data(data.to_vec())),
            Message::Ping(_) | Message::Pong(_) | Message::Close(_) | Message::Frame(_) => None,
        }
    }
}

pub struct Session {
    id: SessionId,
    peer: SocketAddr,
    tab: Option<u16>,
    pty: Box<dyn PtyHost>,
    closed: Mutex<bool>,
    cancel: CancellationToken,
}

impl Session {
    pub fn new(id: SessionId, peer: SocketAddr, tab: Option<u16>, pty: Box<dyn PtyHost>) -> Self {
        Self {
            id,
            peer,
            tab,
            pty,
            closed: Mutex::new(false),
            cancel: CancellationToken::new(),
        }
    }

    pub fn id(&self) -> &SessionId {
        &self.id
    }

    pub fn peer(&self) -> SocketAddr {
        self.peer
    }

    /// Extra tab this session serves, `None` for the primary terminal.
    pub fn tab(&self) -> Option<u16> {
        self.tab
    }

    pub fn is_closed(&self) -> bool {
        *self.closed.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Ask both loops to wind down without releasing anything yet.
    pub fn request_close(&self) {
        self.cancel.cancel();
    }

    pub fn close_requested(&self) -> CancellationToken {
        self.cancel.clone()
    }

    /// Apply one decoded client frame. Blocks on the pty.
    pub fn handle_input(&self, input: Inbound) -> Result<(), PtyError> {
        match input {
            Inbound::Resize(size) => {
                // Platforms without resize support are not an error for the client.
                if let Err(e) = self.pty.resize(size) {
                    tracing::debug!(session = %self.id, size = %size, error = %e, "PTY resize ignored");
                } else {
                    tracing::trace!(session = %self.id, size = %size, "PTY resized");
                }
                Ok(())
            }
            Inbound::Data(bytes) => self.pty.write(&bytes).map(|_| ()),
        }
    }

    pub fn read_output(&self, buf: &mut [u8]) -> Result<usize, PtyError> {
        if self.is_closed() {
            return Ok(0);
        }
        self.pty.read(buf)
    }

    /// Release the pseudo-terminal and its process.
    ///
    /// Only the first call does anything; it returns `true`. Blocks while
    /// the child is reaped.
    pub fn close(&self) -> bool {
        let mut closed = self.closed.lock().unwrap_or_else(PoisonError::into_inner);
        if *closed {
            return false;
        }
        *closed = true;
        self.cancel.cancel();
        self.pty.close();
        tracing::debug!(session = %self.id, pid = ?self.pty.process_id(), "Session resources released");
        true
    }
}

/// Close a session from async code without stalling the runtime.
pub async fn close_session(session: Arc<Session>) -> bool {
    let id = session.id().clone();
    match tokio::task::spawn_blocking(move || session.close()).await {
        Ok(released) => released,
        Err(e) => {
            tracing::warn!(session = %id, error = %e, "Session close task failed");
            false
        }
    }
}

/// Consume client frames until the client goes away or the session closes.
pub async fn run_input_loop<S>(session: Arc<Session>, mut stream: S)
where
    S: Stream<Item = Result<Message, WsError>> + Unpin,
{
    let stop = session.close_requested();

    loop {
        let frame = tokio::select! {
            _ = stop.cancelled() => break,
            frame = stream.next() => frame,
        };

        let message = match frame {
            Some(Ok(Message::Close(frame))) => {
                match frame {
                    Some(f) if !matches!(f.code, CloseCode::Normal | CloseCode::Away) => {
                        tracing::info!(session = %session.id(), code = %f.code, reason = %f.reason, "Client closed abnormally");
                    }
                    _ => tracing::debug!(session = %session.id(), "Client sent close"),
                }
                break;
            }
            Some(Ok(message)) => message,
            Some(Err(e)) => {
                log_read_error(&session, &e);
                break;
            }
            None => break,
        };

        let Some(input) = Inbound::from_message(message) else {
            continue;
        };

        let worker = Arc::clone(&session);
        match tokio::task::spawn_blocking(move || worker.handle_input(input)).await {
            Ok(Ok(())) => {}
            Ok(Err(e)) => {
                if !session.is_closed() {
                    tracing::warn!(session = %session.id(), error = %e, "PTY write failed");
                }
                break;
            }
            Err(e) => {
                tracing::warn!(session = %session.id(), error = %e, "PTY input task failed");
                break;
            }
        }
    }

    session.request_close();
}

fn log_read_error(session: &Session, error: &WsError) {
    use tokio_tungstenite::tungstenite::error::ProtocolError;

    match error {
        WsError::ConnectionClosed | WsError::AlreadyClosed => {
            tracing::debug!(session = %session.id(), "Connection closed");
        }
        WsError::Protocol(ProtocolError::ResetWithoutClosingHandshake) => {
            tracing::debug!(session = %session.id(), "Connection reset without close handshake");
        }
        other => {
            tracing::warn!(session = %session.id(), error = %other, "WebSocket read error");
        }
    }
}

/// Forward shell output to the client until end of stream or a send failure.
pub async fn run_output_loop<K>(session: Arc<Session>, mut sink: K)
where
    K: Sink<Message, Error = WsError> + Unpin,
{
    let (tx, mut rx) = mpsc::channel::<Vec<u8>>(OUTPUT_QUEUE_DEPTH);

    let reader_session = Arc::clone(&session);
    let spawned = std::thread::Builder::new()
        .name("pty-reader".to_string())
        .spawn(move || pump_output(&reader_session, tx));
    if let Err(e) = spawned {
        tracing::warn!(session = %session.id(), error = %e, "Failed to spawn PTY reader thread");
        session.request_close();
        return;
    }

    // Cancellation ends the loop even if the reader thread is still blocked.
    let stop = session.close_requested();
    loop {
        let chunk = tokio::select! {
            chunk = rx.recv() => chunk,
            _ = stop.cancelled() => None,
        };
        let Some(chunk) = chunk else {
            break;
        };
        if let Err(e) = sink.send(Message::binary(chunk)).await {
            if !session.is_closed() {
                tracing::warn!(session = %session.id(), error = %e, "Failed to forward PTY output");
            }
            break;
        }
    }
    drop(rx);

    session.request_close();
    let _ = sink.close().await;
}

/// Reader thread body: blocking reads of the shell's output.
fn pump_output(session: &Session, tx: mpsc::Sender<Vec<u8>>) {
    let mut buf = [0u8; OUTPUT_BUFFER_SIZE];
    loop {
        match session.read_output(&mut buf) {
            Ok(0) => {
                tracing::debug!(session = %session.id(), "PTY output reached end of stream");
                break;
            }
            Ok(n) => {
                if tx.blocking_send(buf[..n].to_vec()).is_err() {
                    break;
                }
            }
            Err(e) => {
                if !session.is_closed() {
                    tracing::warn!(session = %session.id(), error = %e, "PTY read failed");
                }
                break;
            }
        }
    }
}
