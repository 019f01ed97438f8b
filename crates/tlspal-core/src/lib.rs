//! In-memory TLS adapter.
//!
//! Drives a socket-less TLS engine purely through byte buffers for an outer
//! stream that owns the real network I/O. The outer stream calls
//! [`handshake_step`] with each chunk of peer data until it stops returning
//! `ContinueNeeded`, then uses [`encrypt`] and [`decrypt`] for application
//! data and [`shutdown`] once at the end. Every operation reports one
//! [`Status`] from a closed set; engine faults never escape raw.
//!
//! ```ignore
//! let mut context = None;
//! let mut out = Vec::new();
//! loop {
//!     let (status, sent) = handshake_step(&credential, &mut context, &options, &input, &mut out);
//!     transport.send(sent.bytes(&out))?;
//!     match status.code() {
//!         StatusCode::ContinueNeeded => input = transport.recv()?,
//!         StatusCode::Ok => break,
//!         _ => return Err(status),
//!     }
//! }
//! ```

pub mod codec;
pub mod context;
pub mod engine;
pub mod handshake;
pub mod pending;
pub mod query;
#[cfg(feature = "tls-rustls")]
pub mod rustls_engine;

#[cfg(test)]
pub(crate) mod test_utils;

pub use codec::{decrypt, encrypt, read_buffered};
pub use context::{
    HandshakeState, SecurityContext, apply_alert, drain_pending, renegotiate, shutdown,
};
pub use engine::{Credential, EngineProvider, TlsEngine};
pub use handshake::handshake_step;
pub use pending::Drained;
pub use query::{
    application_protocol, channel_binding, connection_info, peer_certificate, stream_sizes,
};
#[cfg(feature = "tls-rustls")]
pub use rustls_engine::RustlsCredentialBuilder;

pub use tlspal_types::{
    AlertLevel, ChannelBinding, ChannelBindingKind, ConnectionInfo, ContextOptions,
    CredentialConfig, ProtocolVersion, Result, Role, Status, StatusCode, StreamSizes, TlsAlert,
    TlsPalError, TrustSource,
};
