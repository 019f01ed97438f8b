//! Status outcomes and the engine-signal translation table.
//!
//! Every adapter operation reports exactly one [`Status`]. Engines report
//! what happened as an [`EngineSignal`]; [`translate`] turns that into a
//! status using a fixed per-[`Operation`] policy:
//!
//! | signal        | handshake      | decrypt        | encrypt        |
//! |---------------|----------------|----------------|----------------|
//! | success       | Ok             | Ok             | Ok             |
//! | needs input   | ContinueNeeded | Ok             | ContinueNeeded |
//! | renegotiate   | InternalError  | Renegotiate    | Renegotiate    |
//! | closed        | InternalError  | ContextExpired | ContextExpired |
//! | unrecognized  | InternalError  | InternalError  | InternalError  |
//!
//! Decrypt treats "needs input" as success with zero bytes so a stream
//! reader can ask again with more data without seeing an error.

use std::fmt;
use std::sync::Arc;

use crate::error::TlsPalError;

/// The adapter operation a signal was produced by.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Operation {
    Handshake,
    Encrypt,
    Decrypt,
}

/// Raw outcome reported by a TLS engine.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EngineSignal {
    /// The engine call completed.
    Success,
    /// The engine needs more peer data before it can make progress.
    NeedsInput,
    /// The peer asked to renegotiate.
    RenegotiateRequested,
    /// The connection was closed by the peer or terminated by the protocol.
    Closed,
    /// A status code the adapter does not know how to interpret.
    Unrecognized(i32),
}

/// Discriminant of a [`Status`], for comparisons and matching without
/// touching the error payload.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum StatusCode {
    Ok,
    ContinueNeeded,
    Renegotiate,
    ContextExpired,
    InternalError,
}

/// Outcome of one adapter operation.
#[derive(Debug, Clone)]
pub enum Status {
    Ok,
    /// More handshake steps are required: send the output, read more input.
    ContinueNeeded,
    /// The peer requested renegotiation; the caller restarts the handshake flow.
    Renegotiate,
    /// The connection is closed; no further progress is possible.
    ContextExpired,
    /// Unrecoverable fault with its underlying cause.
    InternalError(Arc<TlsPalError>),
}

impl Status {
    /// Wrap an engine fault.
    pub fn internal(cause: TlsPalError) -> Self {
        Status::InternalError(Arc::new(cause))
    }

    pub fn code(&self) -> StatusCode {
        match self {
            Status::Ok => StatusCode::Ok,
            Status::ContinueNeeded => StatusCode::ContinueNeeded,
            Status::Renegotiate => StatusCode::Renegotiate,
            Status::ContextExpired => StatusCode::ContextExpired,
            Status::InternalError(_) => StatusCode::InternalError,
        }
    }

    pub fn is_ok(&self) -> bool {
        matches!(self, Status::Ok)
    }

    /// The underlying fault, if this is an `InternalError`.
    pub fn cause(&self) -> Option<&TlsPalError> {
        match self {
            Status::InternalError(cause) => Some(cause),
            _ => None,
        }
    }
}

impl fmt::Display for Status {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Status::Ok => f.write_str("ok"),
            Status::ContinueNeeded => f.write_str("continue needed"),
            Status::Renegotiate => f.write_str("renegotiate"),
            Status::ContextExpired => f.write_str("context expired"),
            Status::InternalError(cause) => write!(f, "internal error: {cause}"),
        }
    }
}

impl From<TlsPalError> for Status {
    fn from(cause: TlsPalError) -> Self {
        Status::internal(cause)
    }
}

/// Map an engine signal to the status reported for `op`.
pub fn translate(op: Operation, signal: EngineSignal) -> Status {
    match (op, signal) {
        (_, EngineSignal::Success) => Status::Ok,
        (Operation::Decrypt, EngineSignal::NeedsInput) => Status::Ok,
        (_, EngineSignal::NeedsInput) => Status::ContinueNeeded,
        (Operation::Handshake, EngineSignal::RenegotiateRequested) => {
            Status::internal(TlsPalError::Protocol(
                "renegotiation requested during handshake".into(),
            ))
        },
        (_, EngineSignal::RenegotiateRequested) => Status::Renegotiate,
        (Operation::Handshake, EngineSignal::Closed) => Status::internal(
            TlsPalError::Protocol("connection closed during handshake".into()),
        ),
        (_, EngineSignal::Closed) => Status::ContextExpired,
        (_, EngineSignal::Unrecognized(code)) => Status::internal(TlsPalError::Engine(
            format!("unrecognized engine status {code}"),
        )),
    }
}
