//! Shared control surface of one session.

use std::fmt;
use std::net::SocketAddr;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use tokio::sync::watch;

use crate::net::SessionId;
use crate::session::SessionRegistry;

/// What the registry stores and the server sweeps.
///
/// The session task owns the stream; the handle only carries the flags and
/// the stop signal, so it can be stopped from any task.
pub struct SessionHandle {
    id: SessionId,
    peer: SocketAddr,
    running: AtomicBool,
    closed: AtomicBool,
    stop_tx: watch::Sender<bool>,
    registry: SessionRegistry,
}

impl SessionHandle {
    pub fn new(peer: SocketAddr, registry: SessionRegistry) -> Arc<Self> {
        let (stop_tx, _) = watch::channel(false);
        Arc::new(Self {
            id: SessionId::new(),
            peer,
            running: AtomicBool::new(true),
            closed: AtomicBool::new(false),
            stop_tx,
            registry,
        })
    }

    pub fn id(&self) -> SessionId {
        self.id
    }

    pub fn peer(&self) -> SocketAddr {
        self.peer
    }

    pub fn is_running(&self) -> bool {
        self.running.load(Ordering::SeqCst)
    }

    pub fn is_closed(&self) -> bool {
        self.closed.load(Ordering::SeqCst)
    }

    /// Receiver that flips to `true` once the session is stopped.
    pub fn stop_signal(&self) -> watch::Receiver<bool> {
        self.stop_tx.subscribe()
    }

    /// Stop the session: clear `running`, wake the session task, and
    /// deregister. Only the first call does anything; it returns `true`.
    pub fn stop(&self) -> bool {
        self.running.store(false, Ordering::SeqCst);
        if self.closed.swap(true, Ordering::SeqCst) {
            return false;
        }

        self.stop_tx.send_replace(true);
        self.registry.deregister(self.id);
        tracing::info!(session_id = %self.id, peer_addr = %self.peer, "Session stopped");
        true
    }
}

impl fmt::Debug for SessionHandle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SessionHandle")
            .field("id", &self.id)
            .field("peer", &self.peer)
            .field("running", &self.is_running())
            .field("closed", &self.is_closed())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn peer() -> SocketAddr {
        "127.0.0.1:40000".parse().unwrap()
    }

    #[test]
    fn stop_is_one_shot() {
        let registry = SessionRegistry::new();
        let handle = SessionHandle::new(peer(), registry.clone());
        registry.register(Arc::clone(&handle));
        let signal = handle.stop_signal();

        assert!(handle.is_running());
        assert!(handle.stop());
        assert!(!handle.stop());

        assert!(!handle.is_running());
        assert!(handle.is_closed());
        assert!(*signal.borrow());
        assert!(registry.is_empty());
    }

    #[test]
    fn late_subscriber_sees_stop() {
        let handle = SessionHandle::new(peer(), SessionRegistry::new());
        handle.stop();
        assert!(*handle.stop_signal().borrow());
    }
}
