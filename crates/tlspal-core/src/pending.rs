//! Pending-output drain.
//!
//! Bytes an engine queues for transmission are pulled out in full on every
//! drain. The caller's buffer is used as-is when it is large enough;
//! otherwise it is replaced by a fresh allocation sized exactly to the
//! queued output, and the returned [`Drained`] says which happened.

use tlspal_types::error::Result;

use crate::engine::TlsEngine;

/// What a drain did with the caller's buffer.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Drained {
    /// Nothing was queued; the buffer is untouched.
    Empty,
    /// `n` bytes were copied into the front of the caller's buffer.
    InPlace(usize),
    /// The buffer was too small and was replaced with one holding exactly `n` bytes.
    Replaced(usize),
}

impl Drained {
    /// Number of bytes written to the buffer.
    pub fn len(&self) -> usize {
        match *self {
            Drained::Empty => 0,
            Drained::InPlace(n) | Drained::Replaced(n) => n,
        }
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// The drained bytes within `target`.
    pub fn bytes<'a>(&self, target: &'a [u8]) -> &'a [u8] {
        &target[..self.len()]
    }
}

/// Move everything `engine` has queued for transmission into `target`.
///
/// `target.len()` is the space the caller offers. Never returns more bytes
/// than the engine had queued, and leaves the engine's queue empty.
pub fn drain(engine: &mut dyn TlsEngine, target: &mut Vec<u8>) -> Result<Drained> {
    let ready = engine.output_ready()?;
    if ready == 0 {
        return Ok(Drained::Empty);
    }

    let replaced = target.len() < ready;
    if replaced {
        *target = vec![0u8; ready];
    }
    let copied = engine.read_output(&mut target[..ready]);
    log::trace!("drained {copied} of {ready} queued bytes (replaced buffer: {replaced})");

    Ok(if replaced {
        Drained::Replaced(copied)
    } else {
        Drained::InPlace(copied)
    })
}
