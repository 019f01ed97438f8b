//! Credential and per-connection configuration.
//!
//! [`CredentialConfig`] is process-level policy (protocol versions, trust
//! source, default ALPN list) and can be loaded from TOML.
//! [`ContextOptions`] is supplied once per connection when the handshake
//! driver creates the context.

use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::error::{Result, TlsPalError};

/// A TLS protocol version the credential may negotiate.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ProtocolVersion {
    Tls12,
    Tls13,
}

/// Where a client credential gets its trust anchors from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TrustSource {
    /// Mozilla's root CA bundle.
    #[default]
    Webpki,
    /// Only anchors added explicitly to the credential.
    None,
}

/// Credential policy, usually read from a TOML file.
///
/// ```toml
/// protocols = ["tls13"]
/// trust = "webpki"
/// application_protocols = ["h2", "http/1.1"]
/// ```
#[derive(Debug, Clone, Deserialize)]
pub struct CredentialConfig {
    #[serde(default = "default_protocols")]
    pub protocols: Vec<ProtocolVersion>,
    #[serde(default)]
    pub trust: TrustSource,
    /// ALPN list used when a context does not supply its own.
    #[serde(default)]
    pub application_protocols: Vec<String>,
}

fn default_protocols() -> Vec<ProtocolVersion> {
    vec![ProtocolVersion::Tls12, ProtocolVersion::Tls13]
}

impl Default for CredentialConfig {
    fn default() -> Self {
        Self {
            protocols: default_protocols(),
            trust: TrustSource::default(),
            application_protocols: Vec::new(),
        }
    }
}

impl CredentialConfig {
    /// Parse and validate a config from TOML text.
    pub fn from_toml_str(text: &str) -> Result<Self> {
        let config: CredentialConfig =
            toml::from_str(text).map_err(|e| TlsPalError::Config(format!("credential: {e}")))?;
        config.validate()?;
        Ok(config)
    }

    /// Read a config file from disk.
    pub fn load(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let text = std::fs::read_to_string(path)?;
        log::debug!("loading credential config from {}", path.display());
        Self::from_toml_str(&text)
    }

    pub fn validate(&self) -> Result<()> {
        if self.protocols.is_empty() {
            return Err(TlsPalError::Config(
                "at least one protocol version must be enabled".into(),
            ));
        }
        if let Some(bad) = self
            .application_protocols
            .iter()
            .find(|p| p.is_empty() || p.len() > 255)
        {
            return Err(TlsPalError::Config(format!(
                "invalid application protocol {bad:?}: must be 1..=255 bytes"
            )));
        }
        Ok(())
    }
}

/// Which end of the connection a context plays.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    Client,
    Server,
}

/// Negotiation options bound to a context when it is created.
#[derive(Debug, Clone)]
pub struct ContextOptions {
    pub role: Role,
    /// Host name for SNI and certificate name verification (clients only).
    pub target_name: Option<String>,
    /// ALPN protocols in preference order. Empty means "use the credential's list".
    pub application_protocols: Vec<Vec<u8>>,
}

impl ContextOptions {
    pub fn client(target_name: impl Into<String>) -> Self {
        Self {
            role: Role::Client,
            target_name: Some(target_name.into()),
            application_protocols: Vec::new(),
        }
    }

    pub fn server() -> Self {
        Self {
            role: Role::Server,
            target_name: None,
            application_protocols: Vec::new(),
        }
    }

    /// Replace the ALPN list.
    pub fn with_application_protocols<I, P>(mut self, protocols: I) -> Self
    where
        I: IntoIterator<Item = P>,
        P: AsRef<[u8]>,
    {
        self.application_protocols = protocols.into_iter().map(|p| p.as_ref().to_vec()).collect();
        self
    }
}
