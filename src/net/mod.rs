//! Network layer subsystem.
//!
//! # Data Flow
//! ```text
//! Incoming TCP connection
//!     → listener.rs (bind, keepalive, accept)
//!     → connection.rs (session ID, task tracking)
//!     → Hand off to the session layer
//! ```
//!
//! # Design Decisions
//! - Keepalive is the only dead-peer detector; the protocol has no heartbeat
//! - Sessions are generic over [`Link`] so they run on in-memory streams in tests

pub mod connection;
pub mod listener;

pub use connection::{classify, Link, ReadFailure, SessionGuard, SessionId, SessionTracker};
pub use listener::{Acceptor, ListenerError};
