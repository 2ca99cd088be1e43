//! WebSocket gateway: accepts connections on the upgrade endpoint and turns
//! each one into a [`Session`].

use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;

use futures_util::StreamExt;
use shellgate_common::{SessionId, TerminalError};
use shellgate_config::ServerConfig;
use shellgate_pty::{PtySpawner, WindowSize};
use tokio::net::{TcpListener, TcpStream};
use tokio::sync::Mutex;
use tokio::task::JoinHandle;
use tokio_tungstenite::accept_hdr_async;
use tokio_tungstenite::tungstenite::handshake::server::{ErrorResponse, Request, Response};
use tokio_tungstenite::tungstenite::http::StatusCode;
use tokio_util::sync::CancellationToken;

use crate::descriptor::TerminalDescriptor;
use crate::ports::TabDirectory;
use crate::registry::SessionRegistry;
use crate::session::{close_session, run_input_loop, run_output_loop, Session};

/// Query parameter selecting an extra tab on the shared endpoint.
pub const TAB_QUERY_KEY: &str = "tab";

/// State shared by the accept loop and every connection task.
struct GatewayContext {
    path: String,
    tabs: Arc<TabDirectory>,
    spawner: Arc<dyn PtySpawner>,
    sessions: SessionRegistry,
    shutdown: CancellationToken,
}

pub struct Gateway {
    local_addr: SocketAddr,
    sessions: SessionRegistry,
    shutdown: CancellationToken,
    accept_task: Mutex<Option<JoinHandle<()>>>,
}

impl Gateway {
    /// Bind the listening socket.
    pub async fn listen(config: &ServerConfig, port: u16) -> Result<TcpListener, TerminalError> {
        let addr = format!("{}:{}", config.bind_address, port);
        TcpListener::bind(&addr)
            .await
            .map_err(|e| TerminalError::Transport(format!("failed to bind {addr}: {e}")))
    }

    /// Start accepting connections on `listener`.
    ///
    /// Cancelling `shutdown` stops the accept loop; use [`Gateway::stop`] to
    /// also wait for it and release live sessions.
    pub fn start(
        listener: TcpListener,
        config: &ServerConfig,
        tabs: Arc<TabDirectory>,
        spawner: Arc<dyn PtySpawner>,
        shutdown: CancellationToken,
    ) -> Result<Self, TerminalError> {
        let local_addr = listener.local_addr()?;
        let sessions = SessionRegistry::new();

        let ctx = Arc::new(GatewayContext {
            path: config.path.clone(),
            tabs,
            spawner,
            sessions: sessions.clone(),
            shutdown: shutdown.clone(),
        });

        tracing::info!(addr = %local_addr, path = %ctx.path, "Terminal gateway listening");
        let accept_task = tokio::spawn(accept_loop(listener, ctx));

        Ok(Self {
            local_addr,
            sessions,
            shutdown,
            accept_task: Mutex::new(Some(accept_task)),
        })
    }

    pub fn local_addr(&self) -> SocketAddr {
        self.local_addr
    }

    pub fn sessions(&self) -> &SessionRegistry {
        &self.sessions
    }

    /// Stop accepting, wait up to `grace` for the listener to shut down,
    /// then release every live session.
    ///
    /// Sessions are released even when the listener misses its deadline.
    pub async fn stop(&self, grace: Duration) -> Result<(), TerminalError> {
        self.shutdown.cancel();

        let mut result = Ok(());
        if let Some(mut task) = self.accept_task.lock().await.take() {
            match tokio::time::timeout(grace, &mut task).await {
                Ok(Ok(())) => {}
                Ok(Err(e)) => {
                    result = Err(TerminalError::Shutdown(format!("accept loop failed: {e}")));
                }
                Err(_) => {
                    task.abort();
                    result = Err(TerminalError::Shutdown(format!(
                        "listener did not stop within {grace:?}"
                    )));
                }
            }
        }

        let sessions = self.sessions.drain().await;
        let count = sessions.len();
        futures_util::future::join_all(sessions.into_iter().map(close_session)).await;
        tracing::info!(count, "Live sessions closed");

        result
    }
}

impl Drop for Gateway {
    fn drop(&mut self) {
        self.shutdown.cancel();
    }
}

async fn accept_loop(listener: TcpListener, ctx: Arc<GatewayContext>) {
    loop {
        tokio::select! {
            _ = ctx.shutdown.cancelled() => break,
            accepted = listener.accept() => match accepted {
                Ok((stream, peer)) => {
                    let ctx = Arc::clone(&ctx);
                    tokio::spawn(async move {
                        handle_connection(stream, peer, ctx).await;
                    });
                }
                Err(e) => {
                    tracing::warn!(error = %e, "TCP accept error");
                }
            }
        }
    }
    tracing::info!("Terminal gateway stopped accepting connections");
}

/// Handle a single connection from handshake to cleanup.
async fn handle_connection(stream: TcpStream, peer: SocketAddr, ctx: Arc<GatewayContext>) {
    let mut routed: Option<Arc<TerminalDescriptor>> = None;
    let callback = |request: &Request, response: Response| -> Result<Response, ErrorResponse> {
        routed = Some(ctx.route(request)?);
        Ok(response)
    };

    let mut ws = match accept_hdr_async(stream, callback).await {
        Ok(ws) => ws,
        Err(e) => {
            tracing::warn!(peer = %peer, error = %e, "WebSocket handshake failed");
            return;
        }
    };
    let Some(descriptor) = routed else {
        return;
    };

    let id = SessionId::new();
    let tab = (descriptor.port != ctx.tabs.primary().port).then_some(descriptor.port);

    let command = descriptor.command(WindowSize::default());
    let spawner = Arc::clone(&ctx.spawner);
    let spawned = tokio::task::spawn_blocking(move || spawner.spawn(&command)).await;
    let pty = match spawned {
        Ok(Ok(pty)) => pty,
        Ok(Err(e)) => {
            tracing::warn!(session = %id, peer = %peer, error = %e, "Failed to start terminal process");
            let _ = ws.close(None).await;
            return;
        }
        Err(e) => {
            tracing::warn!(session = %id, peer = %peer, error = %e, "Terminal spawn task failed");
            let _ = ws.close(None).await;
            return;
        }
    };

    let session = Arc::new(Session::new(id.clone(), peer, tab, pty));
    if let Err(session) = ctx.sessions.insert(Arc::clone(&session)).await {
        tracing::debug!(session = %id, "Gateway shutting down, dropping new session");
        close_session(session).await;
        let _ = ws.close(None).await;
        return;
    }

    tracing::info!(session = %id, peer = %peer, tab = ?tab, "Terminal session opened");

    let (sink, stream) = ws.split();
    let output = tokio::spawn(run_output_loop(Arc::clone(&session), sink));
    run_input_loop(Arc::clone(&session), stream).await;

    // A drained session is released by `Gateway::stop` instead.
    if let Some(session) = ctx.sessions.remove(&id).await {
        close_session(session).await;
    }
    if let Err(e) = output.await {
        tracing::warn!(session = %id, error = %e, "Output task failed");
    }

    tracing::info!(session = %id, peer = %peer, "Terminal session closed");
}

impl GatewayContext {
    /// Pick the descriptor for an upgrade request, or the HTTP rejection.
    fn route(&self, request: &Request) -> Result<Arc<TerminalDescriptor>, ErrorResponse> {
        if request.uri().path() != self.path {
            return Err(reject(StatusCode::NOT_FOUND, "unknown endpoint"));
        }
        let tab = parse_tab_query(request.uri().query())
            .map_err(|msg| reject(StatusCode::BAD_REQUEST, &msg))?;
        self.tabs
            .resolve(tab)
            .ok_or_else(|| reject(StatusCode::NOT_FOUND, "unknown terminal tab"))
    }
}

fn reject(status: StatusCode, message: &str) -> ErrorResponse {
    let mut response = ErrorResponse::new(Some(message.to_string()));
    *response.status_mut() = status;
    response
}

/// Extract the `tab` parameter from a query string.
pub fn parse_tab_query(query: Option<&str>) -> Result<Option<u16>, String> {
    let Some(query) = query else {
        return Ok(None);
    };
    for pair in query.split('&') {
        let (key, value) = pair.split_once('=').unwrap_or((pair, ""));
        if key == TAB_QUERY_KEY {
            return value
                .parse::<u16>()
                .map(Some)
                .map_err(|_| format!("invalid tab {value:?}"));
        }
    }
    Ok(None)
}
