//! Record codec: application data in and out of an established context.

use tlspal_types::error::{Result, TlsPalError};
use tlspal_types::status::{EngineSignal, Operation, Status, StatusCode, translate};

use crate::context::SecurityContext;
use crate::engine::TlsEngine;
use crate::pending::{self, Drained};

/// Encrypt `plaintext` and drain the resulting records into `output`.
///
/// `plaintext` must not be empty; an empty slice is rejected without
/// reaching the engine. `header_size` and `trailer_size` are the framing
/// hints the caller sized `output` with and are not enforced here.
/// Ciphertext is drained whatever the status, and `Drained::len` is the
/// number of bytes written.
pub fn encrypt(
    context: &mut SecurityContext,
    plaintext: &[u8],
    header_size: usize,
    trailer_size: usize,
    output: &mut Vec<u8>,
) -> (Status, Drained) {
    if plaintext.is_empty() {
        log::warn!("encrypt called with empty plaintext");
        return (
            Status::internal(TlsPalError::InvalidArgument(
                "plaintext must not be empty".into(),
            )),
            Drained::Empty,
        );
    }
    if context.is_shut_down() {
        log::warn!("encrypt called on a {:?} context after shutdown", context.role());
        return (Status::ContextExpired, Drained::Empty);
    }
    if let Err(e) = context.require_established() {
        return (Status::internal(e), Drained::Empty);
    }
    let engine = match context.engine_mut() {
        Ok(engine) => engine,
        Err(e) => return (Status::internal(e), Drained::Empty),
    };

    let mut status = match engine.encrypt(plaintext) {
        Ok(signal) => translate(Operation::Encrypt, signal),
        Err(e) => Status::internal(e),
    };
    let drained = match pending::drain(engine, output) {
        Ok(drained) => drained,
        Err(e) => {
            if status.code() != StatusCode::InternalError {
                status = Status::internal(e);
            }
            Drained::Empty
        },
    };
    log::trace!(
        "encrypted {} bytes into {} (framing hint {header_size}+{trailer_size}): {status}",
        plaintext.len(),
        drained.len()
    );
    (status, drained)
}

/// Decrypt `buffer[offset..offset + count]` in place.
///
/// The region is handed to the engine as newly arrived ciphertext, then
/// overwritten with whatever plaintext the engine can produce. Returns the
/// number of plaintext bytes now at the front of the region; zero with
/// `Ok` means no complete record has arrived yet, and the partial bytes stay
/// queued inside the engine for the next call.
pub fn decrypt(
    context: &mut SecurityContext,
    buffer: &mut [u8],
    offset: usize,
    count: usize,
) -> (Status, usize) {
    let end = match offset.checked_add(count) {
        Some(end) if end <= buffer.len() => end,
        _ => {
            return (
                Status::internal(TlsPalError::InvalidArgument(format!(
                    "region {offset}+{count} exceeds buffer of {} bytes",
                    buffer.len()
                ))),
                0,
            );
        },
    };
    if let Err(e) = context.require_established() {
        return (Status::internal(e), 0);
    }
    let engine = match context.engine_mut() {
        Ok(engine) => engine,
        Err(e) => return (Status::internal(e), 0),
    };
    let region = &mut buffer[offset..end];

    let fed = if region.is_empty() {
        engine.process_inbound()
    } else {
        engine
            .write_inbound(region)
            .and_then(|()| engine.process_inbound())
    };
    match fed {
        Ok(EngineSignal::Unrecognized(code)) => {
            return (translate(Operation::Decrypt, EngineSignal::Unrecognized(code)), 0);
        },
        Err(e) => {
            log::warn!("decrypt failed while processing records: {e}");
            return (Status::internal(e), 0);
        },
        Ok(_) => {},
    }

    match fill_plaintext(engine, region) {
        Ok((signal, produced)) => {
            log::trace!("decrypted {count} bytes into {produced} ({signal:?})");
            (translate(Operation::Decrypt, signal), produced)
        },
        Err(e) => (Status::internal(e), 0),
    }
}

/// Read plaintext the engine already decrypted but could not fit into an
/// earlier [`decrypt`] region, without feeding any new ciphertext.
///
/// A record that straddles two decrypt calls can yield more plaintext than
/// the second region holds, and an engine may stop accepting queued
/// ciphertext while decrypted bytes are waiting. Queued ciphertext is
/// processed first, so `(Ok, 0)` means nothing is left until the peer sends
/// more.
pub fn read_buffered(context: &mut SecurityContext, buf: &mut [u8]) -> (Status, usize) {
    if let Err(e) = context.require_established() {
        return (Status::internal(e), 0);
    }
    let engine = match context.engine_mut() {
        Ok(engine) => engine,
        Err(e) => return (Status::internal(e), 0),
    };
    match engine.process_inbound() {
        Ok(EngineSignal::Unrecognized(code)) => {
            return (translate(Operation::Decrypt, EngineSignal::Unrecognized(code)), 0);
        },
        Err(e) => {
            log::warn!("read_buffered failed while processing records: {e}");
            return (Status::internal(e), 0);
        },
        Ok(_) => {},
    }
    match fill_plaintext(engine, buf) {
        Ok((signal, produced)) => (translate(Operation::Decrypt, signal), produced),
        Err(e) => (Status::internal(e), 0),
    }
}

/// Read plaintext into `buf`, processing queued ciphertext between reads,
/// until `buf` is full or the engine stops producing.
///
/// Once some plaintext has been copied out, a later engine fault or close is
/// left for the next call to report so the bytes already in `buf` are not
/// discarded.
fn fill_plaintext(engine: &mut dyn TlsEngine, buf: &mut [u8]) -> Result<(EngineSignal, usize)> {
    let (signal, mut filled) = engine.read_plaintext(buf)?;
    while filled > 0 && filled < buf.len() {
        match engine.process_inbound() {
            Ok(EngineSignal::Success | EngineSignal::NeedsInput) => {},
            Ok(other) => {
                log::debug!("deferring {other:?} until {filled} plaintext bytes are consumed");
                break;
            },
            Err(e) => {
                log::debug!("deferring engine fault after {filled} plaintext bytes: {e}");
                break;
            },
        }
        match engine.read_plaintext(&mut buf[filled..]) {
            Ok((_, 0)) => break,
            Ok((_, n)) => filled += n,
            Err(e) => {
                log::debug!("deferring read fault after {filled} plaintext bytes: {e}");
                break;
            },
        }
    }
    Ok((signal, filled))
}
