//! Set of live sessions.
//!
//! # Responsibilities
//! - Register sessions as they are accepted
//! - Forget them when they stop, tolerating repeats
//! - Stop every session on shutdown

use std::sync::Arc;
use std::time::Duration;

use dashmap::DashMap;

use crate::net::SessionId;
use crate::session::SessionHandle;

/// A thread-safe registry of sessions, cheap to clone.
#[derive(Debug, Clone, Default)]
pub struct SessionRegistry {
    inner: Arc<DashMap<SessionId, Arc<SessionHandle>>>,
}

impl SessionRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn register(&self, handle: Arc<SessionHandle>) {
        self.inner.insert(handle.id(), handle);
    }

    /// Remove a session. Returns `false` if it was already gone.
    pub fn deregister(&self, id: SessionId) -> bool {
        self.inner.remove(&id).is_some()
    }

    pub fn len(&self) -> usize {
        self.inner.len()
    }

    pub fn is_empty(&self) -> bool {
        self.inner.is_empty()
    }

    pub fn contains(&self, id: SessionId) -> bool {
        self.inner.contains_key(&id)
    }

    /// Handles registered at the time of the call.
    pub fn handles(&self) -> Vec<Arc<SessionHandle>> {
        self.inner.iter().map(|r| Arc::clone(r.value())).collect()
    }

    /// Stop every registered session. Returns how many this call stopped.
    ///
    /// Stopping deregisters, so the sweep works on a snapshot: holding a
    /// shard guard while the handle removes itself would deadlock.
    pub fn stop_all(&self) -> usize {
        let handles = self.handles();
        let stopped = handles.iter().filter(|h| h.stop()).count();
        if stopped > 0 {
            tracing::info!(stopped, "Stopped registered sessions");
        }
        stopped
    }

    /// Wait until the registry is empty, or `deadline` passes.
    pub async fn wait_until_empty(&self, deadline: Duration) -> bool {
        let drained = async {
            while !self.inner.is_empty() {
                tokio::time::sleep(Duration::from_millis(20)).await;
            }
        };
        tokio::time::timeout(deadline, drained).await.is_ok()
    }
}
