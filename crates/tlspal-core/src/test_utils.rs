//! Scripted engine for unit tests.
//!
//! `ScriptedEngine` replays queued signals instead of running a real TLS
//! stack, so every engine status (including ones rustls never produces)
//! can be pushed through the adapter.

use std::collections::VecDeque;

use tlspal_types::config::{ContextOptions, Role};
use tlspal_types::error::{Result, TlsPalError};
use tlspal_types::info::ConnectionInfo;
use tlspal_types::status::EngineSignal;

use crate::context::{HandshakeState, SecurityContext};
use crate::engine::{Credential, EngineProvider, TlsEngine};

pub(crate) struct ScriptedEngine {
    pub output: Vec<u8>,
    pub plaintext: VecDeque<u8>,
    /// Plaintext released by `process_inbound` only once `plaintext` is empty,
    /// modelling an engine that stops accepting ciphertext while decrypted
    /// bytes wait.
    pub withheld: Vec<u8>,
    pub handshake_script: VecDeque<Result<EngineSignal>>,
    pub process_script: VecDeque<Result<EngineSignal>>,
    pub encrypt_script: VecDeque<Result<EngineSignal>>,
    /// Signal reported by `read_plaintext` when no plaintext is buffered.
    pub idle_read_signal: EngineSignal,
    pub handshaking: bool,
    /// Number of upcoming `output_ready` calls that fail.
    pub output_failures: usize,
    pub fail_close: bool,
    pub alpn: Option<Vec<u8>>,
    pub server_cert: Option<Vec<u8>>,
    pub peer_cert: Option<Vec<u8>>,
    pub info: Option<ConnectionInfo>,
}

impl ScriptedEngine {
    pub fn new() -> Self {
        Self {
            output: Vec::new(),
            plaintext: VecDeque::new(),
            withheld: Vec::new(),
            handshake_script: VecDeque::new(),
            process_script: VecDeque::new(),
            encrypt_script: VecDeque::new(),
            idle_read_signal: EngineSignal::NeedsInput,
            handshaking: true,
            output_failures: 0,
            fail_close: false,
            alpn: None,
            server_cert: None,
            peer_cert: None,
            info: None,
        }
    }

    pub fn queue_output(&mut self, bytes: &[u8]) {
        self.output.extend_from_slice(bytes);
    }

    pub fn queue_plaintext(&mut self, bytes: &[u8]) {
        self.plaintext.extend(bytes.iter().copied());
    }
}

impl TlsEngine for ScriptedEngine {
    fn write_inbound(&mut self, _data: &[u8]) -> Result<()> {
        Ok(())
    }

    fn handshake_step(&mut self) -> Result<EngineSignal> {
        let signal = self
            .handshake_script
            .pop_front()
            .unwrap_or(Ok(EngineSignal::NeedsInput))?;
        if signal == EngineSignal::Success {
            self.handshaking = false;
        }
        Ok(signal)
    }

    fn process_inbound(&mut self) -> Result<EngineSignal> {
        let signal = self
            .process_script
            .pop_front()
            .unwrap_or(Ok(EngineSignal::Success))?;
        if self.plaintext.is_empty() {
            self.plaintext.extend(self.withheld.drain(..));
        }
        Ok(signal)
    }

    fn read_plaintext(&mut self, buf: &mut [u8]) -> Result<(EngineSignal, usize)> {
        if buf.is_empty() {
            return Ok((EngineSignal::NeedsInput, 0));
        }
        if self.plaintext.is_empty() {
            return Ok((self.idle_read_signal, 0));
        }
        let n = buf.len().min(self.plaintext.len());
        for (slot, byte) in buf.iter_mut().zip(self.plaintext.drain(..n)) {
            *slot = byte;
        }
        Ok((EngineSignal::Success, n))
    }

    fn encrypt(&mut self, plaintext: &[u8]) -> Result<EngineSignal> {
        let signal = self
            .encrypt_script
            .pop_front()
            .unwrap_or(Ok(EngineSignal::Success))?;
        self.output.extend_from_slice(plaintext);
        Ok(signal)
    }

    fn output_ready(&mut self) -> Result<usize> {
        if self.output_failures > 0 {
            self.output_failures -= 1;
            return Err(TlsPalError::Engine("output queue unavailable".into()));
        }
        Ok(self.output.len())
    }

    fn read_output(&mut self, dst: &mut [u8]) -> usize {
        let n = dst.len().min(self.output.len());
        dst[..n].copy_from_slice(&self.output[..n]);
        self.output.drain(..n);
        n
    }

    fn close(&mut self) -> Result<()> {
        if self.fail_close {
            return Err(TlsPalError::Engine("close failed".into()));
        }
        self.output.extend_from_slice(b"close_notify");
        Ok(())
    }

    fn is_handshaking(&self) -> bool {
        self.handshaking
    }

    fn application_protocol(&self) -> Option<Vec<u8>> {
        self.alpn.clone()
    }

    fn connection_info(&self) -> Option<ConnectionInfo> {
        self.info.clone()
    }

    fn server_certificate(&self) -> Option<Vec<u8>> {
        self.server_cert.clone()
    }

    fn peer_certificate(&self) -> Option<Vec<u8>> {
        self.peer_cert.clone()
    }
}

struct FnProvider<F>(F);

impl<F> EngineProvider for FnProvider<F>
where
    F: Fn() -> ScriptedEngine + Send + Sync,
{
    fn create_engine(&self, _options: &ContextOptions) -> Result<Box<dyn TlsEngine>> {
        Ok(Box::new((self.0)()))
    }
}

struct FailingProvider;

impl EngineProvider for FailingProvider {
    fn create_engine(&self, _options: &ContextOptions) -> Result<Box<dyn TlsEngine>> {
        Err(TlsPalError::Config("no certificate loaded".into()))
    }
}

/// A credential whose contexts are backed by engines from `make`.
pub(crate) fn provider_for<F>(make: F) -> Credential
where
    F: Fn() -> ScriptedEngine + Send + Sync + 'static,
{
    Credential::new(FnProvider(make))
}

pub(crate) fn failing_credential() -> Credential {
    Credential::new(FailingProvider)
}

/// A context whose handshake has already completed.
pub(crate) fn established(mut engine: ScriptedEngine) -> SecurityContext {
    engine.handshaking = false;
    SecurityContext::from_engine(Box::new(engine), Role::Client, HandshakeState::Complete)
}
