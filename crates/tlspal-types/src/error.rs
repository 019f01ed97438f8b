//! Error types for tlspal.

use std::io;

/// Errors produced by the TLS adapter layer and its engines.
#[derive(Debug, thiserror::Error)]
pub enum TlsPalError {
    #[error("engine error: {0}")]
    Engine(String),

    #[error("TLS protocol error: {0}")]
    Protocol(String),

    #[error("context error: {0}")]
    Context(String),

    #[error("invalid argument: {0}")]
    InvalidArgument(String),

    #[error("unsupported operation: {0}")]
    Unsupported(String),

    #[error("config error: {0}")]
    Config(String),

    #[error("I/O error: {0}")]
    Io(#[from] io::Error),

    #[error("TOML parse error: {0}")]
    TomlParse(#[from] toml::de::Error),
}

/// Convenience alias.
pub type Result<T> = std::result::Result<T, TlsPalError>;
