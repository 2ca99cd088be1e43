//! Session registry: live sessions keyed by id.

use std::collections::HashMap;
use std::sync::Arc;

use shellgate_common::SessionId;
use tokio::sync::RwLock;

use crate::session::Session;

struct Inner {
    sessions: HashMap<SessionId, Arc<Session>>,
    accepting: bool,
}

/// Thread-safe session registry.
///
/// Every mutation happens under the write lock. Once [`drain`] has run the
/// registry refuses new sessions, so nothing registered during shutdown
/// can escape cleanup.
///
/// [`drain`]: SessionRegistry::drain
#[derive(Clone)]
pub struct SessionRegistry {
    inner: Arc<RwLock<Inner>>,
}

impl SessionRegistry {
    pub fn new() -> Self {
        Self {
            inner: Arc::new(RwLock::new(Inner {
                sessions: HashMap::new(),
                accepting: true,
            })),
        }
    }

    /// Register a session. Hands it back if the registry has been drained.
    pub async fn insert(&self, session: Arc<Session>) -> Result<(), Arc<Session>> {
        let mut inner = self.inner.write().await;
        if !inner.accepting {
            return Err(session);
        }
        inner.sessions.insert(session.id().clone(), session);
        Ok(())
    }

    /// Remove a session. Only the first caller for an id gets it back.
    pub async fn remove(&self, id: &SessionId) -> Option<Arc<Session>> {
        self.inner.write().await.sessions.remove(id)
    }

    pub async fn get(&self, id: &SessionId) -> Option<Arc<Session>> {
        self.inner.read().await.sessions.get(id).cloned()
    }

    /// Take every live session and stop accepting new ones.
    pub async fn drain(&self) -> Vec<Arc<Session>> {
        let mut inner = self.inner.write().await;
        inner.accepting = false;
        inner.sessions.drain().map(|(_, session)| session).collect()
    }

    pub async fn snapshot(&self) -> Vec<Arc<Session>> {
        self.inner.read().await.sessions.values().cloned().collect()
    }

    pub async fn len(&self) -> usize {
        self.inner.read().await.sessions.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.inner.read().await.sessions.is_empty()
    }
}

impl Default for SessionRegistry {
    fn default() -> Self {
        Self::new()
    }
}
