//! Foundation types for tlspal.
//!
//! This crate holds everything the adapter layer shares with its callers
//! that does not depend on a concrete TLS library: the closed status
//! outcome set and its translation table, configuration, connection
//! metadata, and the error type.

pub mod config;
pub mod error;
pub mod info;
pub mod status;

pub use config::{ContextOptions, CredentialConfig, ProtocolVersion, Role, TrustSource};
pub use error::{Result, TlsPalError};
pub use info::{
    AlertLevel, ChannelBinding, ChannelBindingKind, ConnectionInfo, StreamSizes, TlsAlert,
};
pub use status::{EngineSignal, Operation, Status, StatusCode, translate};
