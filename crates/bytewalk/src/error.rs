use alloc::string::String;

use thiserror::Error;

/// Result codes the engine reserves at the integer boundary.
///
/// Grammar and callback codes are the embedder's to choose; by convention
/// they are small positive integers, so everything reserved here is
/// negative.
pub mod code {
    /// Suspension requested by a callback rather than a pause step.
    pub const PAUSE: i32 = -1;
    /// No arm and no otherwise target for the classified byte.
    pub const NO_TRANSITION: i32 = -2;
    /// A byte contradicted a literal sequence mid-token.
    pub const SEQ_MISMATCH: i32 = -3;
    /// A count loaded from a negative match value.
    pub const BAD_COUNT: i32 = -4;
    /// A span opened twice, or closed while not open.
    pub const BAD_SPAN: i32 = -5;
}

/// Why `Machine::execute` stopped before the end of the chunk.
///
/// `Pause` and `Match` are resumable: `Machine::resume` clears them and the
/// next `execute` call picks up at the recorded offset. `Fault` is cleared
/// only by `Machine::init`; until then every further `execute` returns the
/// same fault without touching its input.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum Interrupt {
    /// Resumable suspension from a pause step or a pausing callback.
    #[error("{reason} (code {code}, offset {offset})")]
    Pause {
        /// Code carried by the pause step, or `code::PAUSE` for callbacks.
        code: i32,
        /// Offset within the chunk at which scanning stopped.
        offset: usize,
        /// Description carried by the pause step.
        reason: String,
    },
    /// A return site surfaced a nonzero match id.
    #[error("matched {id} (offset {offset})")]
    Match {
        /// The id of the matched alternative.
        id: i32,
        /// Offset within the chunk at which scanning stopped.
        offset: usize,
    },
    /// Unrecoverable failure.
    #[error("{reason} (code {code}, offset {offset})")]
    Fault {
        /// Engine-reserved or grammar/callback error code.
        code: i32,
        /// Offset within the chunk at which the failure was detected.
        offset: usize,
        /// What failed, naming the state involved.
        reason: String,
    },
}

impl Interrupt {
    /// Integer form of the result, preserving the classic encoding: the
    /// match id for a match, the stored code otherwise.
    #[must_use]
    pub fn code(&self) -> i32 {
        match self {
            Interrupt::Pause { code, .. } | Interrupt::Fault { code, .. } => *code,
            Interrupt::Match { id, .. } => *id,
        }
    }

    /// Offset within the chunk at which scanning stopped.
    #[must_use]
    pub fn offset(&self) -> usize {
        match self {
            Interrupt::Pause { offset, .. }
            | Interrupt::Match { offset, .. }
            | Interrupt::Fault { offset, .. } => *offset,
        }
    }

    /// Whether `Machine::resume` can clear this halt.
    #[must_use]
    pub fn resumable(&self) -> bool {
        !matches!(self, Interrupt::Fault { .. })
    }
}
