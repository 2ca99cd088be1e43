use serde::{Deserialize, Serialize};
use std::time::Duration;

/// Path of the WebSocket upgrade endpoint.
pub const DEFAULT_ENDPOINT_PATH: &str = "/webterminal";

/// Gateway listener settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ServerConfig {
    /// Interface the listener binds to.
    pub bind_address: String,
    /// Upgrade endpoint path.
    pub path: String,
    /// How long shutdown waits for the listener to stop (valid range: 100-60000).
    pub shutdown_grace_ms: u64,
}

impl ServerConfig {
    pub fn shutdown_grace(&self) -> Duration {
        Duration::from_millis(self.shutdown_grace_ms)
    }
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            bind_address: "127.0.0.1".into(),
            path: DEFAULT_ENDPOINT_PATH.into(),
            shutdown_grace_ms: 5000,
        }
    }
}
