//! Connection context lifecycle and shutdown.
//!
//! A [`SecurityContext`] owns exactly one engine instance. It is created
//! only by the handshake driver, torn down by [`SecurityContext::dispose`]
//! (or drop), and never revived. Every operation checks validity first and
//! fails closed on a disposed context.

use tlspal_types::config::{ContextOptions, Role};
use tlspal_types::error::{Result, TlsPalError};
use tlspal_types::info::TlsAlert;
use tlspal_types::status::Status;

use crate::engine::{Credential, TlsEngine};
use crate::pending::{self, Drained};

/// Handshake progress of a context. `Failed` is absorbing.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum HandshakeState {
    Uninitialized,
    InProgress,
    Complete,
    Failed,
}

/// Per-connection TLS engine state.
///
/// Callers must serialize all operations on one context.
pub struct SecurityContext {
    engine: Option<Box<dyn TlsEngine>>,
    role: Role,
    state: HandshakeState,
    shut_down: bool,
}

impl SecurityContext {
    pub(crate) fn create(credential: &Credential, options: &ContextOptions) -> Result<Self> {
        let engine = credential.create_engine(options)?;
        log::debug!(
            "created {:?} context (target: {:?}, {} ALPN protocols)",
            options.role,
            options.target_name,
            options.application_protocols.len()
        );
        Ok(Self::from_engine(engine, options.role, HandshakeState::Uninitialized))
    }

    pub(crate) fn from_engine(
        engine: Box<dyn TlsEngine>,
        role: Role,
        state: HandshakeState,
    ) -> Self {
        Self {
            engine: Some(engine),
            role,
            state,
            shut_down: false,
        }
    }

    pub fn role(&self) -> Role {
        self.role
    }

    pub fn handshake_state(&self) -> HandshakeState {
        self.state
    }

    pub fn is_handshake_complete(&self) -> bool {
        self.state == HandshakeState::Complete
    }

    pub fn is_shut_down(&self) -> bool {
        self.shut_down
    }

    pub fn is_disposed(&self) -> bool {
        self.engine.is_none()
    }

    /// Release the engine. The context is unusable afterwards.
    pub fn dispose(&mut self) {
        if self.engine.take().is_some() {
            log::debug!("disposed {:?} context", self.role);
        }
    }

    pub(crate) fn set_state(&mut self, state: HandshakeState) {
        if self.state != state {
            log::trace!("{:?} handshake {:?} -> {state:?}", self.role, self.state);
        }
        self.state = state;
    }

    pub(crate) fn engine_mut(&mut self) -> Result<&mut (dyn TlsEngine + 'static)> {
        self.engine
            .as_deref_mut()
            .ok_or_else(|| TlsPalError::Context("security context has been disposed".into()))
    }

    pub(crate) fn engine(&self) -> Result<&(dyn TlsEngine + 'static)> {
        self.engine
            .as_deref()
            .ok_or_else(|| TlsPalError::Context("security context has been disposed".into()))
    }

    /// Fail unless the handshake has completed on a live context.
    pub(crate) fn require_established(&self) -> Result<()> {
        let engine = self.engine()?;
        if self.state != HandshakeState::Complete {
            return Err(TlsPalError::Context(format!(
                "handshake not complete (state: {:?})",
                self.state
            )));
        }
        if engine.is_handshaking() {
            return Err(TlsPalError::Context(
                "engine is still handshaking on a completed context".into(),
            ));
        }
        Ok(())
    }
}

impl Drop for SecurityContext {
    fn drop(&mut self) {
        self.dispose();
    }
}

/// Queue a protocol-level close.
///
/// One-shot: a second call on the same context reports `InternalError`.
/// The `close_notify` stays queued until the caller drains it with
/// [`drain_pending`].
pub fn shutdown(context: &mut SecurityContext) -> Status {
    if context.shut_down {
        log::warn!("shutdown called twice on {:?} context", context.role);
        return Status::internal(TlsPalError::Context("context already shut down".into()));
    }
    let result = context.engine_mut().and_then(|engine| engine.close());
    match result {
        Ok(()) => {
            context.shut_down = true;
            log::debug!("{:?} context shut down", context.role);
            Status::Ok
        },
        Err(e) => {
            log::warn!("shutdown failed: {e}");
            Status::internal(e)
        },
    }
}

/// Accept an alert request from the caller.
///
/// Always a no-op returning `Ok`: the engine raises protocol alerts itself
/// and offers no way to inject an arbitrary one.
pub fn apply_alert(context: &SecurityContext, alert: TlsAlert) -> Status {
    log::debug!(
        "ignoring {:?} alert {} on {:?} context",
        alert.level,
        alert.description,
        context.role
    );
    Status::Ok
}

/// Renegotiation is refused by the engine and never started from this side.
pub fn renegotiate(context: &SecurityContext) -> Result<()> {
    context.engine()?;
    Err(TlsPalError::Unsupported("renegotiation".into()))
}

/// Move any bytes the engine has queued (e.g. a `close_notify`) into `target`.
pub fn drain_pending(context: &mut SecurityContext, target: &mut Vec<u8>) -> Result<Drained> {
    pending::drain(context.engine_mut()?, target)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_utils::{ScriptedEngine, established};
    use tlspal_types::info::AlertLevel;
    use tlspal_types::status::StatusCode;

    #[test]
    fn shutdown_queues_close_and_reports_ok() {
        let mut ctx = established(ScriptedEngine::new());
        assert!(shutdown(&mut ctx).is_ok());
        assert!(ctx.is_shut_down());

        let mut out = Vec::new();
        let drained = drain_pending(&mut ctx, &mut out).unwrap();
        assert_eq!(drained.bytes(&out), b"close_notify");
    }

    #[test]
    fn shutdown_twice_is_internal_error() {
        let mut ctx = established(ScriptedEngine::new());
        assert!(shutdown(&mut ctx).is_ok());
        assert_eq!(shutdown(&mut ctx).code(), StatusCode::InternalError);
    }

    #[test]
    fn shutdown_failure_is_internal_error() {
        let mut engine = ScriptedEngine::new();
        engine.fail_close = true;
        let mut ctx = established(engine);
        let status = shutdown(&mut ctx);
        assert_eq!(status.code(), StatusCode::InternalError);
        assert!(!ctx.is_shut_down());
    }

    #[test]
    fn shutdown_on_disposed_context_fails_closed() {
        let mut ctx = established(ScriptedEngine::new());
        ctx.dispose();
        assert!(ctx.is_disposed());
        let status = shutdown(&mut ctx);
        assert!(matches!(status.cause(), Some(TlsPalError::Context(_))));
    }

    #[test]
    fn apply_alert_is_noop() {
        let ctx = established(ScriptedEngine::new());
        let alert = TlsAlert {
            level: AlertLevel::Fatal,
            description: 40,
        };
        assert!(apply_alert(&ctx, alert).is_ok());
    }

    #[test]
    fn renegotiate_is_unsupported() {
        let ctx = established(ScriptedEngine::new());
        assert!(matches!(
            renegotiate(&ctx),
            Err(TlsPalError::Unsupported(_))
        ));
    }

    #[test]
    fn require_established_rejects_in_progress() {
        let ctx = SecurityContext::from_engine(
            Box::new(ScriptedEngine::new()),
            Role::Server,
            HandshakeState::InProgress,
        );
        assert!(ctx.require_established().is_err());
        assert_eq!(ctx.role(), Role::Server);
        assert!(!ctx.is_handshake_complete());
    }

    #[test]
    fn require_established_cross_checks_engine() {
        let ctx = SecurityContext::from_engine(
            Box::new(ScriptedEngine::new()),
            Role::Client,
            HandshakeState::Complete,
        );
        assert!(matches!(
            ctx.require_established(),
            Err(TlsPalError::Context(_))
        ));
    }

    #[test]
    fn dispose_is_idempotent() {
        let mut ctx = established(ScriptedEngine::new());
        ctx.dispose();
        ctx.dispose();
        assert!(ctx.engine().is_err());
    }
}
