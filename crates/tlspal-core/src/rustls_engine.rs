//! [`TlsEngine`] backed by rustls + ring.
//!
//! Enabled by the `tls-rustls` feature. One [`rustls::Connection`] serves
//! both roles, so the adapter's single handshake path drives clients and
//! servers alike. Ciphertext never touches a socket: inbound bytes are
//! queued and pushed through `read_tls`, outbound records are collected
//! from `write_tls` into a byte queue the adapter drains.

use std::io::{self, Read, Write};
use std::sync::Arc;

use rustls::client::danger::ServerCertVerifier;
use rustls::crypto::CryptoProvider;
use rustls::server::danger::ClientCertVerifier;
use rustls::{
    ClientConfig, ClientConnection, Connection, RootCertStore, ServerConfig, ServerConnection,
    SupportedProtocolVersion,
};
use rustls_pki_types::{CertificateDer, PrivateKeyDer, ServerName};

use tlspal_types::config::{ContextOptions, CredentialConfig, ProtocolVersion, Role, TrustSource};
use tlspal_types::error::{Result, TlsPalError};
use tlspal_types::info::ConnectionInfo;
use tlspal_types::status::EngineSignal;

use crate::engine::{Credential, EngineProvider, TlsEngine};

// ---------------------------------------------------------------------------
// Credential construction
// ---------------------------------------------------------------------------

/// Builds a rustls-backed [`Credential`].
///
/// ```ignore
/// let credential = RustlsCredentialBuilder::new(CredentialConfig::default())
///     .with_identity(chain, key)
///     .build()?;
/// ```
pub struct RustlsCredentialBuilder {
    config: CredentialConfig,
    trust_anchors: Vec<CertificateDer<'static>>,
    identity: Option<(Vec<CertificateDer<'static>>, PrivateKeyDer<'static>)>,
    server_verifier: Option<Arc<dyn ServerCertVerifier>>,
    client_verifier: Option<Arc<dyn ClientCertVerifier>>,
}

impl RustlsCredentialBuilder {
    pub fn new(config: CredentialConfig) -> Self {
        Self {
            config,
            trust_anchors: Vec::new(),
            identity: None,
            server_verifier: None,
            client_verifier: None,
        }
    }

    /// Trust `anchor` in addition to the configured trust source.
    pub fn with_trust_anchor(mut self, anchor: CertificateDer<'static>) -> Self {
        self.trust_anchors.push(anchor);
        self
    }

    /// Certificate chain and key presented to peers. Required for servers.
    pub fn with_identity(
        mut self,
        chain: Vec<CertificateDer<'static>>,
        key: PrivateKeyDer<'static>,
    ) -> Self {
        self.identity = Some((chain, key));
        self
    }

    /// Replace server certificate validation with a custom policy (clients).
    pub fn with_server_verifier(mut self, verifier: Arc<dyn ServerCertVerifier>) -> Self {
        self.server_verifier = Some(verifier);
        self
    }

    /// Require and validate client certificates with a custom policy (servers).
    pub fn with_client_verifier(mut self, verifier: Arc<dyn ClientCertVerifier>) -> Self {
        self.client_verifier = Some(verifier);
        self
    }

    pub fn build(self) -> Result<Credential> {
        Ok(Credential::new(self.build_provider()?))
    }

    fn build_provider(self) -> Result<RustlsProvider> {
        self.config.validate()?;

        let crypto = Arc::new(rustls::crypto::ring::default_provider());
        let versions: Vec<&'static SupportedProtocolVersion> = self
            .config
            .protocols
            .iter()
            .map(|v| match v {
                ProtocolVersion::Tls12 => &rustls::version::TLS12,
                ProtocolVersion::Tls13 => &rustls::version::TLS13,
            })
            .collect();

        let mut roots = match self.config.trust {
            TrustSource::Webpki => {
                RootCertStore::from_iter(webpki_roots::TLS_SERVER_ROOTS.iter().cloned())
            },
            TrustSource::None => RootCertStore::empty(),
        };
        for anchor in &self.trust_anchors {
            roots
                .add(anchor.clone())
                .map_err(|e| TlsPalError::Config(format!("trust anchor: {e}")))?;
        }

        let client_config = self.client_config(&crypto, &versions, roots)?;
        let (server_config, local_certificate) = match &self.identity {
            Some((chain, key)) => {
                let config = self.server_config(&crypto, &versions, chain, key)?;
                (Some(Arc::new(config)), chain.first().cloned())
            },
            None => (None, None),
        };

        log::debug!(
            "built rustls credential: protocols {:?}, server identity: {}",
            self.config.protocols,
            server_config.is_some()
        );

        Ok(RustlsProvider {
            client_config: Arc::new(client_config),
            server_config,
            local_certificate,
            default_alpn: self
                .config
                .application_protocols
                .iter()
                .map(|p| p.as_bytes().to_vec())
                .collect(),
        })
    }

    fn client_config(
        &self,
        crypto: &Arc<CryptoProvider>,
        versions: &[&'static SupportedProtocolVersion],
        roots: RootCertStore,
    ) -> Result<ClientConfig> {
        let builder = ClientConfig::builder_with_provider(Arc::clone(crypto))
            .with_protocol_versions(versions)
            .map_err(|e| TlsPalError::Config(format!("protocol versions: {e}")))?;
        let builder = match &self.server_verifier {
            Some(verifier) => builder
                .dangerous()
                .with_custom_certificate_verifier(Arc::clone(verifier)),
            None => builder.with_root_certificates(roots),
        };
        match &self.identity {
            Some((chain, key)) => builder
                .with_client_auth_cert(chain.clone(), key.clone_key())
                .map_err(|e| TlsPalError::Config(format!("client identity: {e}"))),
            None => Ok(builder.with_no_client_auth()),
        }
    }

    fn server_config(
        &self,
        crypto: &Arc<CryptoProvider>,
        versions: &[&'static SupportedProtocolVersion],
        chain: &[CertificateDer<'static>],
        key: &PrivateKeyDer<'static>,
    ) -> Result<ServerConfig> {
        let builder = ServerConfig::builder_with_provider(Arc::clone(crypto))
            .with_protocol_versions(versions)
            .map_err(|e| TlsPalError::Config(format!("protocol versions: {e}")))?;
        let builder = match &self.client_verifier {
            Some(verifier) => builder.with_client_cert_verifier(Arc::clone(verifier)),
            None => builder.with_no_client_auth(),
        };
        builder
            .with_single_cert(chain.to_vec(), key.clone_key())
            .map_err(|e| TlsPalError::Config(format!("server identity: {e}")))
    }
}

/// Per-credential rustls configuration shared by every context it creates.
struct RustlsProvider {
    client_config: Arc<ClientConfig>,
    server_config: Option<Arc<ServerConfig>>,
    local_certificate: Option<CertificateDer<'static>>,
    default_alpn: Vec<Vec<u8>>,
}

impl EngineProvider for RustlsProvider {
    fn create_engine(&self, options: &ContextOptions) -> Result<Box<dyn TlsEngine>> {
        Ok(Box::new(self.engine(options)?))
    }
}

impl RustlsProvider {
    fn engine(&self, options: &ContextOptions) -> Result<RustlsEngine> {
        let alpn = if options.application_protocols.is_empty() {
            self.default_alpn.clone()
        } else {
            options.application_protocols.clone()
        };

        let conn = match options.role {
            Role::Client => {
                let target = options.target_name.as_deref().ok_or_else(|| {
                    TlsPalError::InvalidArgument("client contexts need a target name".into())
                })?;
                let name = ServerName::try_from(target.to_owned())
                    .map_err(|e| TlsPalError::InvalidArgument(format!("invalid server name: {e}")))?;
                let mut config = ClientConfig::clone(&self.client_config);
                config.alpn_protocols = alpn;
                let client = ClientConnection::new(Arc::new(config), name)
                    .map_err(|e| TlsPalError::Engine(format!("TLS init: {e}")))?;
                Connection::Client(client)
            },
            Role::Server => {
                let base = self.server_config.as_ref().ok_or_else(|| {
                    TlsPalError::Config("server contexts need a certificate and private key".into())
                })?;
                let mut config = ServerConfig::clone(base);
                config.alpn_protocols = alpn;
                let server = ServerConnection::new(Arc::new(config))
                    .map_err(|e| TlsPalError::Engine(format!("TLS init: {e}")))?;
                Connection::Server(server)
            },
        };

        let local_certificate = match options.role {
            Role::Server => self.local_certificate.clone(),
            Role::Client => None,
        };
        Ok(RustlsEngine::new(conn, options.role, local_certificate))
    }
}

// ---------------------------------------------------------------------------
// Engine: rustls::Connection plus in-memory ciphertext queues
// ---------------------------------------------------------------------------

/// Failure while pushing inbound bytes through rustls.
enum PumpError {
    Io(io::Error),
    Tls(rustls::Error),
}

struct RustlsEngine {
    conn: Connection,
    role: Role,
    /// Peer ciphertext not yet accepted by `read_tls`.
    inbound: Vec<u8>,
    /// Records produced by `write_tls`, waiting to be drained.
    outbound: Vec<u8>,
    /// Our own certificate when acting as server (for channel binding).
    local_certificate: Option<CertificateDer<'static>>,
    peer_closed: bool,
}

impl RustlsEngine {
    fn new(conn: Connection, role: Role, local_certificate: Option<CertificateDer<'static>>) -> Self {
        Self {
            conn,
            role,
            inbound: Vec::new(),
            outbound: Vec::new(),
            local_certificate,
            peer_closed: false,
        }
    }

    /// Feed queued ciphertext into rustls and process the resulting records.
    ///
    /// Stops early, leaving bytes queued, when rustls will not accept more
    /// input until buffered plaintext is read out.
    fn pump_inbound(&mut self) -> std::result::Result<(), PumpError> {
        let mut state = self.conn.process_new_packets().map_err(PumpError::Tls)?;
        while !self.inbound.is_empty() {
            let mut rd: &[u8] = &self.inbound;
            let n = match self.conn.read_tls(&mut rd) {
                Ok(n) => n,
                Err(_) if state.plaintext_bytes_to_read() > 0 => break,
                Err(e) => return Err(PumpError::Io(e)),
            };
            if n == 0 {
                break;
            }
            self.inbound.drain(..n);
            state = self.conn.process_new_packets().map_err(PumpError::Tls)?;
        }
        if state.peer_has_closed() {
            self.peer_closed = true;
        }
        if self.peer_closed && !self.inbound.is_empty() {
            log::debug!(
                "{:?} discarding {} bytes received after close_notify",
                self.role,
                self.inbound.len()
            );
            self.inbound.clear();
        }
        Ok(())
    }

    /// Collect everything rustls wants to send into `self.outbound`.
    fn stage_outbound(&mut self) -> Result<()> {
        while self.conn.wants_write() {
            let n = self
                .conn
                .write_tls(&mut self.outbound)
                .map_err(|e| TlsPalError::Engine(format!("TLS write_tls: {e}")))?;
            if n == 0 {
                break;
            }
        }
        Ok(())
    }
}

impl TlsEngine for RustlsEngine {
    fn write_inbound(&mut self, data: &[u8]) -> Result<()> {
        if self.peer_closed {
            log::trace!("{:?} dropping {} bytes after close", self.role, data.len());
            return Ok(());
        }
        self.inbound.extend_from_slice(data);
        Ok(())
    }

    fn handshake_step(&mut self) -> Result<EngineSignal> {
        match self.pump_inbound() {
            Ok(()) => {},
            Err(PumpError::Io(e)) => {
                return Err(TlsPalError::Engine(format!("TLS read_tls: {e}")));
            },
            Err(PumpError::Tls(e)) => {
                return Err(TlsPalError::Protocol(format!("TLS handshake: {e}")));
            },
        }
        Ok(if self.conn.is_handshaking() {
            EngineSignal::NeedsInput
        } else {
            EngineSignal::Success
        })
    }

    fn process_inbound(&mut self) -> Result<EngineSignal> {
        match self.pump_inbound() {
            Ok(()) => Ok(EngineSignal::Success),
            Err(PumpError::Tls(rustls::Error::AlertReceived(alert))) => {
                log::debug!("{:?} peer sent fatal alert {alert:?}", self.role);
                self.peer_closed = true;
                self.inbound.clear();
                Ok(EngineSignal::Closed)
            },
            Err(PumpError::Tls(e)) => Err(TlsPalError::Protocol(format!("TLS process: {e}"))),
            Err(PumpError::Io(e)) => Err(TlsPalError::Engine(format!("TLS read_tls: {e}"))),
        }
    }

    fn read_plaintext(&mut self, buf: &mut [u8]) -> Result<(EngineSignal, usize)> {
        if buf.is_empty() {
            return Ok((EngineSignal::NeedsInput, 0));
        }
        match self.conn.reader().read(buf) {
            // Clean close_notify with nothing left to read.
            Ok(0) => Ok((EngineSignal::Closed, 0)),
            Ok(n) => Ok((EngineSignal::Success, n)),
            Err(e) if e.kind() == io::ErrorKind::WouldBlock => Ok(if self.peer_closed {
                (EngineSignal::Closed, 0)
            } else {
                (EngineSignal::NeedsInput, 0)
            }),
            Err(e) if e.kind() == io::ErrorKind::UnexpectedEof => Ok((EngineSignal::Closed, 0)),
            Err(e) => Err(TlsPalError::Engine(format!("TLS read: {e}"))),
        }
    }

    fn encrypt(&mut self, plaintext: &[u8]) -> Result<EngineSignal> {
        let mut rest = plaintext;
        while !rest.is_empty() {
            let n = self
                .conn
                .writer()
                .write(rest)
                .map_err(|e| TlsPalError::Engine(format!("TLS write: {e}")))?;
            if n == 0 {
                return Err(TlsPalError::Engine("TLS write accepted no data".into()));
            }
            rest = &rest[n..];
            self.stage_outbound()?;
        }
        Ok(if self.conn.is_handshaking() {
            EngineSignal::NeedsInput
        } else {
            EngineSignal::Success
        })
    }

    fn output_ready(&mut self) -> Result<usize> {
        self.stage_outbound()?;
        Ok(self.outbound.len())
    }

    fn read_output(&mut self, dst: &mut [u8]) -> usize {
        let n = dst.len().min(self.outbound.len());
        dst[..n].copy_from_slice(&self.outbound[..n]);
        self.outbound.drain(..n);
        n
    }

    fn close(&mut self) -> Result<()> {
        self.conn.send_close_notify();
        self.stage_outbound()
    }

    fn is_handshaking(&self) -> bool {
        self.conn.is_handshaking()
    }

    fn application_protocol(&self) -> Option<Vec<u8>> {
        self.conn.alpn_protocol().map(<[u8]>::to_vec)
    }

    fn connection_info(&self) -> Option<ConnectionInfo> {
        let protocol = match self.conn.protocol_version()? {
            rustls::ProtocolVersion::TLSv1_2 => ProtocolVersion::Tls12,
            rustls::ProtocolVersion::TLSv1_3 => ProtocolVersion::Tls13,
            _ => return None,
        };
        let suite = self.conn.negotiated_cipher_suite()?;
        Some(ConnectionInfo {
            role: self.role,
            protocol,
            cipher_suite: format!("{:?}", suite.suite()),
            application_protocol: self
                .conn
                .alpn_protocol()
                .map(|p| String::from_utf8_lossy(p).into_owned()),
        })
    }

    fn server_certificate(&self) -> Option<Vec<u8>> {
        match self.role {
            Role::Server => self.local_certificate.as_ref().map(|c| c.as_ref().to_vec()),
            Role::Client => self.peer_certificate(),
        }
    }

    fn peer_certificate(&self) -> Option<Vec<u8>> {
        self.conn
            .peer_certificates()
            .and_then(|chain| chain.first())
            .map(|c| c.as_ref().to_vec())
    }
}
