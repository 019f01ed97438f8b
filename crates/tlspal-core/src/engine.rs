//! TLS engine abstraction.
//!
//! The adapter never talks to a TLS library directly. A [`Credential`]
//! wraps an [`EngineProvider`] that creates one [`TlsEngine`] per
//! connection; the handshake driver and record codec sequence calls on
//! that engine and translate what it reports. Engines own their inbound
//! and outbound queues; nothing here touches a socket.

use std::fmt;
use std::sync::Arc;

use tlspal_types::config::ContextOptions;
use tlspal_types::error::Result;
use tlspal_types::info::ConnectionInfo;
use tlspal_types::status::EngineSignal;

/// One socket-less TLS engine instance.
///
/// `Err` from any method is an engine fault; the adapter converts it to
/// `Status::InternalError` at the operation boundary.
pub trait TlsEngine: Send {
    /// Append ciphertext received from the peer to the inbound queue.
    fn write_inbound(&mut self, data: &[u8]) -> Result<()>;

    /// Advance the handshake over whatever inbound data is queued.
    fn handshake_step(&mut self) -> Result<EngineSignal>;

    /// Process queued inbound records without reading plaintext out.
    fn process_inbound(&mut self) -> Result<EngineSignal>;

    /// Copy decrypted plaintext into `buf`, returning how many bytes were written.
    fn read_plaintext(&mut self, buf: &mut [u8]) -> Result<(EngineSignal, usize)>;

    /// Encrypt `plaintext` into the outbound queue. Must not be empty.
    fn encrypt(&mut self, plaintext: &[u8]) -> Result<EngineSignal>;

    /// Number of bytes queued for transmission.
    fn output_ready(&mut self) -> Result<usize>;

    /// Move up to `dst.len()` queued bytes into `dst`, removing them from the queue.
    fn read_output(&mut self, dst: &mut [u8]) -> usize;

    /// Queue a protocol-level close (`close_notify`).
    fn close(&mut self) -> Result<()>;

    fn is_handshaking(&self) -> bool;

    /// Negotiated ALPN protocol, if any.
    fn application_protocol(&self) -> Option<Vec<u8>>;

    fn connection_info(&self) -> Option<ConnectionInfo>;

    /// DER of the server's end-entity certificate, seen from either side.
    fn server_certificate(&self) -> Option<Vec<u8>>;

    /// DER of the certificate the peer presented, if any.
    fn peer_certificate(&self) -> Option<Vec<u8>>;
}

/// Creates engines bound to loaded credential material.
pub trait EngineProvider: Send + Sync {
    fn create_engine(&self, options: &ContextOptions) -> Result<Box<dyn TlsEngine>>;
}

/// Loaded certificate/key material and protocol policy.
///
/// Immutable and cheap to clone; one credential may back any number of
/// concurrently active contexts.
#[derive(Clone)]
pub struct Credential {
    provider: Arc<dyn EngineProvider>,
}

impl Credential {
    pub fn new(provider: impl EngineProvider + 'static) -> Self {
        Self {
            provider: Arc::new(provider),
        }
    }

    pub(crate) fn create_engine(&self, options: &ContextOptions) -> Result<Box<dyn TlsEngine>> {
        self.provider.create_engine(options)
    }
}

impl fmt::Debug for Credential {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Credential").finish_non_exhaustive()
    }
}
