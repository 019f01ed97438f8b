//! Handshake driver.
//!
//! [`handshake_step`] is the single entry point for both roles: the role is
//! fixed by the [`ContextOptions`] used when the first call creates the
//! context. Each call feeds the newly arrived peer bytes, advances the
//! engine by exactly one step and hands back whatever must be sent next.
//! The caller loops until the status is no longer `ContinueNeeded`.

use tlspal_types::config::ContextOptions;
use tlspal_types::error::TlsPalError;
use tlspal_types::status::{Operation, Status, StatusCode, translate};

use crate::context::{HandshakeState, SecurityContext};
use crate::engine::Credential;
use crate::pending::{self, Drained};

/// Run one handshake step.
///
/// Creates the context on the first call (when `context` is `None`).
/// Output is drained into `output` even when the step fails, so alerts the
/// engine queued on the way down still reach the peer. Any engine fault
/// moves the context to [`HandshakeState::Failed`]; destroying it is up to
/// the caller.
pub fn handshake_step(
    credential: &Credential,
    context: &mut Option<SecurityContext>,
    options: &ContextOptions,
    input: &[u8],
    output: &mut Vec<u8>,
) -> (Status, Drained) {
    let ctx = match context.take() {
        Some(ctx) => ctx,
        None => match SecurityContext::create(credential, options) {
            Ok(ctx) => ctx,
            Err(e) => {
                log::warn!("{:?} context creation failed: {e}", options.role);
                return (Status::internal(e), Drained::Empty);
            },
        },
    };
    let ctx = context.insert(ctx);
    let failed = ctx.handshake_state() == HandshakeState::Failed;

    let engine = match ctx.engine_mut() {
        Ok(engine) => engine,
        Err(e) => return (Status::internal(e), Drained::Empty),
    };

    if failed {
        // Still hand over anything queued since the failing step.
        let drained = pending::drain(engine, output).unwrap_or(Drained::Empty);
        return (
            Status::internal(TlsPalError::Context("handshake previously failed".into())),
            drained,
        );
    }

    let stepped = if input.is_empty() {
        engine.handshake_step()
    } else {
        engine
            .write_inbound(input)
            .and_then(|()| engine.handshake_step())
    };
    let mut status = match stepped {
        Ok(signal) => translate(Operation::Handshake, signal),
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
        "{:?} handshake step: {} bytes in, {} bytes out, {status}",
        ctx.role(),
        input.len(),
        drained.len()
    );

    let next = match status.code() {
        StatusCode::Ok => HandshakeState::Complete,
        StatusCode::ContinueNeeded => HandshakeState::InProgress,
        _ => HandshakeState::Failed,
    };
    if next == HandshakeState::Complete && !ctx.is_handshake_complete() {
        log::debug!("{:?} handshake complete", ctx.role());
    }
    if next == HandshakeState::Failed {
        log::warn!("{:?} handshake failed: {status}", ctx.role());
    }
    ctx.set_state(next);

    (status, drained)
}
