//! Lifecycle management subsystem.
//!
//! # Data Flow
//! ```text
//! Start (server.rs):
//!     Bind acceptor → spawn accept loop → spawn one task per session
//!
//! Stop (server.rs + shutdown.rs):
//!     running=false → broadcast shutdown → stop every session
//!     → join accept loop → wait for session tasks to drain
//!
//! Signals (signals.rs):
//!     Ctrl-C → stop
//! ```
//!
//! # Design Decisions
//! - Stop is cooperative: every blocking wait is bounded or races a signal
//! - Stop is idempotent and callable from any task
//! - Draining has a deadline; stragglers are logged, not awaited forever

pub mod server;
pub mod shutdown;
pub mod signals;

pub use server::{Server, ServerError};
pub use shutdown::Shutdown;
pub use signals::shutdown_signal;
