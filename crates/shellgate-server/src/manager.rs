//! Terminal manager: the application-facing entry point.

use std::net::SocketAddr;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;

use shellgate_common::TerminalError;
use shellgate_config::ShellgateConfig;
use shellgate_pty::{NativePtySpawner, PtySpawner};
use tokio_util::sync::CancellationToken;

use crate::descriptor::TerminalDescriptor;
use crate::gateway::Gateway;
use crate::ports::TabDirectory;

/// Owns the gateway, the extra-tab pool and the process-wide shutdown signal.
pub struct TerminalManager {
    tabs: Arc<TabDirectory>,
    gateway: Gateway,
    shutdown: CancellationToken,
    grace: Duration,
    closed: AtomicBool,
}

impl TerminalManager {
    /// Resolve the terminal and start serving it with native pseudo-terminals.
    pub async fn initialize(config: &ShellgateConfig) -> Result<Self, TerminalError> {
        Self::initialize_with(config, Arc::new(NativePtySpawner)).await
    }

    /// Like [`TerminalManager::initialize`] with a custom pty backend.
    ///
    /// Configuration problems are reported before anything is bound.
    pub async fn initialize_with(
        config: &ShellgateConfig,
        spawner: Arc<dyn PtySpawner>,
    ) -> Result<Self, TerminalError> {
        let descriptor = TerminalDescriptor::from_config(&config.terminal, config.terminal.port)?;
        tracing::info!(
            role = descriptor.role.as_str(),
            shell = %descriptor.shell.display(),
            cwd = %descriptor.cwd.display(),
            "Terminal resolved"
        );

        let listener = Gateway::listen(&config.server, descriptor.port).await?;
        // An ephemeral port request becomes concrete here; tabs count from it.
        let port = listener.local_addr()?.port();
        let tabs = Arc::new(TabDirectory::new(descriptor.for_port(port)));

        let shutdown = CancellationToken::new();
        let gateway = Gateway::start(
            listener,
            &config.server,
            Arc::clone(&tabs),
            spawner,
            shutdown.child_token(),
        )?;

        Ok(Self {
            tabs,
            gateway,
            shutdown,
            grace: config.server.shutdown_grace(),
            closed: AtomicBool::new(false),
        })
    }

    pub fn descriptor(&self) -> &TerminalDescriptor {
        self.tabs.primary()
    }

    pub fn local_addr(&self) -> SocketAddr {
        self.gateway.local_addr()
    }

    /// Reserve an extra tab and return its port as a decimal string.
    pub fn spawn_tty(&self) -> Result<String, TerminalError> {
        let port = self.tabs.open_tab()?;
        tracing::info!(port, "Extra terminal tab registered");
        Ok(port.to_string())
    }

    /// Free an extra tab's port. Sessions already attached keep running.
    pub fn release_tty(&self, port: u16) -> bool {
        let released = self.tabs.close_tab(port);
        if released {
            tracing::info!(port, "Extra terminal tab released");
        }
        released
    }

    pub fn tabs(&self) -> Vec<u16> {
        self.tabs.tabs()
    }

    pub async fn session_count(&self) -> usize {
        self.gateway.sessions().len().await
    }

    /// Stop the gateway and release every live session.
    ///
    /// Only the first call does any work; later calls return `Ok`.
    pub async fn close(&self) -> Result<(), TerminalError> {
        if self.closed.swap(true, Ordering::SeqCst) {
            return Ok(());
        }

        tracing::info!("Shutting down terminal gateway");
        self.shutdown.cancel();
        let result = self.gateway.stop(self.grace).await;
        match &result {
            Ok(()) => tracing::info!("Terminal gateway shut down"),
            Err(e) => tracing::warn!(error = %e, "Terminal gateway shutdown incomplete"),
        }
        result
    }
}

impl Drop for TerminalManager {
    fn drop(&mut self) {
        self.shutdown.cancel();
    }
}
