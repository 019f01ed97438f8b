//! Read-only connection metadata reported after the handshake completes.

use serde::Serialize;

use crate::config::{ProtocolVersion, Role};

/// Record framing overhead a caller should budget for when sizing buffers.
///
/// These are fixed assumptions, not values negotiated per connection.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct StreamSizes {
    pub header: usize,
    pub trailer: usize,
    pub maximum_message: usize,
}

impl StreamSizes {
    /// TLS record header.
    pub const HEADER: usize = 5;
    /// Worst-case tag, padding and content-type expansion of a record.
    pub const TRAILER: usize = 256;
    /// Largest plaintext fragment carried by one record.
    pub const MAXIMUM_MESSAGE: usize = 16 * 1024;
}

impl Default for StreamSizes {
    fn default() -> Self {
        Self {
            header: Self::HEADER,
            trailer: Self::TRAILER,
            maximum_message: Self::MAXIMUM_MESSAGE,
        }
    }
}

/// Negotiated parameters of an established connection.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ConnectionInfo {
    pub role: Role,
    pub protocol: ProtocolVersion,
    pub cipher_suite: String,
    pub application_protocol: Option<String>,
}

/// Channel binding flavours (RFC 5929).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ChannelBindingKind {
    /// `tls-server-end-point`: derived from the server certificate.
    Endpoint,
    /// `tls-unique`: derived from the first Finished message.
    Unique,
}

/// A channel binding token ready to hand to an authentication layer.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ChannelBinding {
    pub kind: ChannelBindingKind,
    pub token: Vec<u8>,
}

/// Alert severity.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AlertLevel {
    Warning,
    Fatal,
}

/// An alert a caller would like sent to the peer.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TlsAlert {
    pub level: AlertLevel,
    /// Alert description code from the TLS registry.
    pub description: u8,
}
