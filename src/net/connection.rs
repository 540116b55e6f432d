//! Per-connection identity, lifetime tracking, and receive-error taxonomy.
//!
//! # Responsibilities
//! - Generate unique session IDs for tracing
//! - Track live session tasks so shutdown can wait for them
//! - Classify socket errors into "peer is gone" vs "try again"

use std::io;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::Duration;

use tokio::io::{AsyncRead, AsyncWrite};

use crate::observability::metrics;

/// A bidirectional byte stream a session can run over.
///
/// `TcpStream` in production, `tokio::io::DuplexStream` in tests.
pub trait Link: AsyncRead + AsyncWrite + Unpin + Send {}

impl<T: AsyncRead + AsyncWrite + Unpin + Send> Link for T {}

/// Global atomic counter for session IDs.
/// Using relaxed ordering is sufficient since we only need uniqueness, not synchronization.
static SESSION_ID_COUNTER: AtomicU64 = AtomicU64::new(1);

/// Unique identifier for a session.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct SessionId(u64);

impl SessionId {
    /// Generate a new unique session ID.
    pub fn new() -> Self {
        Self(SESSION_ID_COUNTER.fetch_add(1, Ordering::Relaxed))
    }

    /// Get the raw ID value.
    pub fn as_u64(&self) -> u64 {
        self.0
    }
}

impl Default for SessionId {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Display for SessionId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "session-{}", self.0)
    }
}

/// How a failed receive should be handled.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ReadFailure {
    /// ETIMEDOUT: keepalive probes went unanswered.
    KeepaliveTimeout,
    /// The peer reset or abandoned the connection.
    PeerReset,
    /// Anything else. Logged, and the session keeps going.
    Transient,
}

/// Classify a socket error.
pub fn classify(err: &io::Error) -> ReadFailure {
    match err.kind() {
        io::ErrorKind::TimedOut => ReadFailure::KeepaliveTimeout,
        io::ErrorKind::ConnectionReset
        | io::ErrorKind::ConnectionAborted
        | io::ErrorKind::BrokenPipe
        | io::ErrorKind::NotConnected => ReadFailure::PeerReset,
        _ => ReadFailure::Transient,
    }
}

/// Counts running session tasks.
///
/// The registry forgets a session as soon as it is stopped; the tracker only
/// forgets it once its task, and therefore its socket, is gone.
#[derive(Debug, Clone, Default)]
pub struct SessionTracker {
    active_count: Arc<AtomicU64>,
}

impl SessionTracker {
    pub fn new() -> Self {
        Self::default()
    }

    /// Record a new session task. Returns a guard that decrements on drop.
    pub fn track(&self, id: SessionId) -> SessionGuard {
        self.active_count.fetch_add(1, Ordering::SeqCst);
        metrics::record_session_opened();
        SessionGuard {
            active_count: Arc::clone(&self.active_count),
            id,
        }
    }

    /// Get current live task count.
    pub fn active_count(&self) -> u64 {
        self.active_count.load(Ordering::SeqCst)
    }

    /// Wait until every tracked task has finished, or `deadline` passes.
    /// Returns `true` when all tasks finished.
    pub async fn wait_until_idle(&self, deadline: Duration) -> bool {
        let drained = async {
            while self.active_count.load(Ordering::SeqCst) > 0 {
                tokio::time::sleep(Duration::from_millis(50)).await;
            }
        };
        tokio::time::timeout(deadline, drained).await.is_ok()
    }
}

/// Guard that tracks a session task's lifetime.
#[derive(Debug)]
pub struct SessionGuard {
    active_count: Arc<AtomicU64>,
    id: SessionId,
}

impl Drop for SessionGuard {
    fn drop(&mut self) {
        self.active_count.fetch_sub(1, Ordering::SeqCst);
        metrics::record_session_finished();
        tracing::trace!(session_id = %self.id, "Session task finished");
    }
}
