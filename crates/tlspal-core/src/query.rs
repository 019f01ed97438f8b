//! Read-only connection metadata.
//!
//! Everything here is side-effect free and only valid once the handshake
//! has completed, except [`stream_sizes`] which is connection independent.

use sha2::{Digest, Sha256};
use tlspal_types::error::{Result, TlsPalError};
use tlspal_types::info::{ChannelBinding, ChannelBindingKind, ConnectionInfo, StreamSizes};

use crate::context::SecurityContext;

/// RFC 5929 prefix for `tls-server-end-point` binding data.
const ENDPOINT_PREFIX: &[u8] = b"tls-server-end-point:";

/// Framing overhead assumptions for sizing record buffers.
pub fn stream_sizes() -> StreamSizes {
    StreamSizes::default()
}

/// The ALPN protocol both sides agreed on, if any.
pub fn application_protocol(context: &SecurityContext) -> Result<Option<Vec<u8>>> {
    context.require_established()?;
    Ok(context.engine()?.application_protocol())
}

pub fn connection_info(context: &SecurityContext) -> Result<ConnectionInfo> {
    context.require_established()?;
    context
        .engine()?
        .connection_info()
        .ok_or_else(|| TlsPalError::Context("engine reported no connection parameters".into()))
}

/// DER of the certificate the peer authenticated with, if it sent one.
pub fn peer_certificate(context: &SecurityContext) -> Result<Option<Vec<u8>>> {
    context.require_established()?;
    Ok(context.engine()?.peer_certificate())
}

/// Build a channel binding token.
///
/// Only [`ChannelBindingKind::Endpoint`] is available: the
/// `tls-server-end-point:` prefix followed by the SHA-256 digest of the
/// server's end-entity certificate. Both ends produce the same token.
pub fn channel_binding(
    context: &SecurityContext,
    kind: ChannelBindingKind,
) -> Result<ChannelBinding> {
    if kind != ChannelBindingKind::Endpoint {
        return Err(TlsPalError::Unsupported(format!(
            "channel binding kind {kind:?}"
        )));
    }
    context.require_established()?;
    let certificate = context
        .engine()?
        .server_certificate()
        .ok_or_else(|| TlsPalError::Context("no server certificate for channel binding".into()))?;

    let mut token = Vec::with_capacity(ENDPOINT_PREFIX.len() + 32);
    token.extend_from_slice(ENDPOINT_PREFIX);
    token.extend_from_slice(&Sha256::digest(&certificate));
    Ok(ChannelBinding { kind, token })
}
