//! Per-connection sessions.
//!
//! # Data Flow
//! ```text
//! Accepted stream
//!     → handle.rs (identity, stop latch)
//!     → registry.rs (register; the only cross-session state)
//!     → handler.rs (AWAIT_SIGNAL → AWAIT_AUDIO → DISPATCH → AWAIT_SIGNAL …)
//!     → collaborators.rs (recognizer, decoder, speaker built per session)
//!     → CLOSED: handle.stop() deregisters exactly once
//! ```
//!
//! # Design Decisions
//! - Teardown is a one-shot latch; whoever flips it deregisters
//! - Stopping is a signal; the socket is dropped by the session task itself
//! - Every blocking read is bounded and races the stop signal

pub mod collaborators;
pub mod handle;
pub mod handler;
pub mod registry;

pub use collaborators::{CollaboratorError, CollaboratorFactory, Collaborators, ProcessCollaborators};
pub use handle::SessionHandle;
pub use handler::{CloseReason, Session, SessionSettings, SessionState};
pub use registry::SessionRegistry;
