//! Intercom server library.
//!
//! A TCP gateway for embedded microphone clients: wake handshake, audio
//! capture ended by silence, recognition, and a spoken reply over the same
//! connection.

// Core
pub mod config;
pub mod lifecycle;
pub mod net;
pub mod protocol;
pub mod session;

// Collaborators
pub mod audio;
pub mod recognition;
pub mod speech;

// Cross-cutting concerns
pub mod observability;

pub(crate) mod process;

pub use config::IntercomConfig;
pub use lifecycle::{Server, ServerError};
