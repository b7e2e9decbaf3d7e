//! The embedder seam.
//!
//! A `Machine` is pure control flow; everything observable happens through
//! a `Handler`. Every method has a default, so embedders implement only
//! the callbacks their program actually wires, and `()` is the no-op
//! handler for runs where only the final state matters.
//!
//! Callbacks answer with a `Signal`. Internally the engine works with the
//! tagged form only; `Signal::from_code` and `Signal::code` bridge to the
//! classic integer encoding (0 continue, the pause sentinel, any other
//! nonzero an error) for embedders keeping that convention at their own
//! boundaries.

use crate::{
    error::code,
    program::{Slot, SpanId},
};

/// Control result returned by every handler callback.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Signal {
    /// Keep scanning.
    Continue,
    /// Suspend after the current position; resumable.
    Pause,
    /// Report match id `id`; nonzero halts the call resumably.
    Match(i32),
    /// Abort with `code`; the machine faults.
    Error(i32),
}

impl Signal {
    /// Signal for a plain match id: 0 continues, anything else matches.
    #[must_use]
    pub const fn matched(id: i32) -> Self {
        if id == 0 { Signal::Continue } else { Signal::Match(id) }
    }

    /// Decode the classic integer encoding.
    #[must_use]
    pub const fn from_code(value: i32) -> Self {
        match value {
            0 => Signal::Continue,
            code::PAUSE => Signal::Pause,
            c => Signal::Error(c),
        }
    }

    /// The integer this signal presents at the classic boundary.
    #[must_use]
    pub const fn code(self) -> i32 {
        match self {
            Signal::Continue => 0,
            Signal::Pause => code::PAUSE,
            Signal::Match(id) => id,
            Signal::Error(c) => c,
        }
    }
}

/// Callbacks a program can wire through its invoke and span steps.
///
/// `at` is an offset within the chunk currently being scanned; embedders
/// tracking positions in the whole stream add up chunk lengths across
/// calls.
pub trait Handler {
    /// A value site fired.
    fn on_value(&mut self, slot: Slot, at: usize) -> Signal {
        let _ = (slot, at);
        Signal::Continue
    }

    /// A match site fired with the id of the matched alternative.
    fn on_match(&mut self, slot: Slot, id: i32, at: usize) -> Signal {
        let _ = (slot, id, at);
        Signal::Continue
    }

    /// A return site fired; the default surfaces nonzero ids as the
    /// result of the whole scan.
    fn on_return(&mut self, slot: Slot, id: i32, at: usize) -> Signal {
        let _ = (slot, at);
        Signal::matched(id)
    }

    /// A span closed — or was flushed at a buffer boundary — covering
    /// `bytes`, which starts at offset `at` of the current chunk.
    ///
    /// During a flush the signal is delivery-only: `Error` still faults
    /// the machine, but `Pause` and `Match` are treated as `Continue`
    /// (the scan is already stopping).
    fn on_span(&mut self, span: SpanId, bytes: &[u8], at: usize) -> Signal {
        let _ = (span, bytes, at);
        Signal::Continue
    }
}

/// Scans with no instrumentation at all.
impl Handler for () {}
