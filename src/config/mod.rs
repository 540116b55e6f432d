//! Configuration management subsystem.
//!
//! # Data Flow
//! ```text
//! config file (TOML)
//!     → loader.rs (parse & deserialize)
//!     → validation.rs (semantic checks)
//!     → IntercomConfig (validated, immutable)
//!     → shared via Arc with the server and every session
//! ```
//!
//! # Design Decisions
//! - Config is immutable once loaded; there is no hot reload
//! - All fields have defaults to allow minimal configs
//! - Protocol byte values are constants, not configuration

pub mod loader;
pub mod schema;
pub mod validation;

pub use loader::{load_config, parse_config, ConfigError};
pub use schema::{
    AudioConfig, IntercomConfig, KeepaliveConfig, ListenerConfig, ObservabilityConfig,
    RecognizerConfig, ReplyConfig, SpeechConfig, TimeoutConfig,
};
pub use validation::{config_warnings, validate_config, ValidationError};
