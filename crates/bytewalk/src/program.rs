//! Compiled scan programs.
//!
//! A `Program` is the flat transition graph a `Machine` interprets: one
//! node per state, each carrying a diagnostic name and a single `Step`
//! describing its behavior. Programs are built in two phases through
//! `Builder` — declare states up front so forward references are just
//! ids, then define each one — and the whole graph is validated once by
//! `finish`. A sealed program is immutable and can back any number of
//! machines, across threads.
//!
//! Cursor discipline: only steps that examine a byte (`Select`, `Seq`)
//! may consume one. Targets on action steps must be `Target::peek`, and a
//! sequence must consume its final byte; `finish` rejects anything else,
//! so the interpreter never needs to re-check.

#![expect(clippy::cast_possible_truncation)]

use alloc::{borrow::ToOwned, boxed::Box, string::String, vec::Vec};

use thiserror::Error;

use crate::classify::Classifier;

/// Identifier of a state in a `Program`.
pub type StateId = u32;

/// Identifier of a span kind declared on a `Program`.
pub type SpanId = u32;

/// Program-chosen integer distinguishing callback sites that share one
/// handler.
pub type Slot = u32;

/// Where a step hands control next, and what happens to the cursor.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Target {
    pub(crate) state: StateId,
    pub(crate) advance: bool,
    pub(crate) value: Option<i32>,
}

impl Target {
    /// Move to `state`, consuming the byte under the cursor.
    #[must_use]
    pub const fn skip(state: StateId) -> Self {
        Self { state, advance: true, value: None }
    }

    /// Move to `state`, leaving the byte for that state to examine.
    #[must_use]
    pub const fn peek(state: StateId) -> Self {
        Self { state, advance: false, value: None }
    }

    /// Record `value` as the machine's match value when this target is
    /// taken.
    #[must_use]
    pub const fn with_value(mut self, value: i32) -> Self {
        self.value = Some(value);
        self
    }
}

/// Which handler method an invoke step fires.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Call {
    /// `Handler::on_value`: plain notification.
    Value(Slot),
    /// `Handler::on_match`: notification carrying the current match value.
    Match(Slot),
    /// `Handler::on_return`: match whose id may short-circuit the scan.
    Return(Slot),
}

/// The behavior of one state.
#[derive(Debug, Clone)]
pub enum Step {
    /// Classify the byte under the cursor and take the arm for its class
    /// (class `k` routes to `arms[k - 1]`). Class 0 takes `otherwise`;
    /// with no otherwise it is a structural fault.
    Select {
        /// Byte-to-class dispatch for this state.
        classifier: Classifier,
        /// One target per rule class, starting at class 1.
        arms: Vec<Target>,
        /// Target for unclassified bytes.
        otherwise: Option<Target>,
    },
    /// Match `bytes` literally, suspending mid-token at buffer
    /// boundaries; a contradicting byte is a structural fault.
    Seq {
        /// The literal to match.
        bytes: Vec<u8>,
        /// Taken on the final byte; must consume it.
        done: Target,
    },
    /// Skip as many bytes as the index register holds, counting down
    /// across buffer boundaries.
    Consume {
        /// Taken once the count reaches zero.
        next: Target,
    },
    /// Load the index register from the last match value; negative values
    /// are a structural fault.
    LoadCount {
        /// Taken after the load.
        next: Target,
    },
    /// Open a span of kind `span` at the cursor. Suspends first when the
    /// cursor sits at the end of the buffer, so a chunk boundary here
    /// never opens a phantom empty span.
    SpanStart {
        /// Span kind to open.
        span: SpanId,
        /// Taken after the mark is stored.
        next: Target,
    },
    /// Close the open span of kind `span` and deliver its byte range.
    SpanEnd {
        /// Span kind to close.
        span: SpanId,
        /// Taken when the callback continues.
        next: Target,
    },
    /// Fire a handler callback and interpret its signal.
    Invoke {
        /// Which handler method, and the slot passed to it.
        call: Call,
        /// Taken when the callback continues.
        next: Target,
    },
    /// Suspend with `code` and `reason`; `resume` continues at `next`.
    Pause {
        /// Embedder-meaningful pause code (not 0).
        code: i32,
        /// Description surfaced through the interrupt.
        reason: String,
        /// Continuation after `resume`.
        next: Target,
    },
    /// Hard error with `code`; only re-initialization recovers.
    Fail {
        /// Grammar-chosen error code (not 0).
        code: i32,
        /// Description surfaced through the fault.
        reason: String,
    },
    /// Terminal state; any remaining byte is a fault.
    Stop,
}

#[derive(Debug, Clone)]
pub(crate) struct State {
    pub(crate) name: Box<str>,
    pub(crate) step: Step,
}

/// A structural defect found while sealing a program.
#[derive(Error, Debug, PartialEq, Eq)]
pub enum ProgramError {
    /// A state was declared but never defined.
    #[error("state '{state}' was never defined")]
    Undefined {
        /// Name of the undefined state.
        state: String,
    },
    /// A target refers to a state id that does not exist.
    #[error("state '{state}' targets unknown state {target}")]
    UnknownTarget {
        /// Name of the offending state.
        state: String,
        /// The dangling id.
        target: StateId,
    },
    /// A step names a span kind that was never declared.
    #[error("state '{state}' uses unknown span {span}")]
    UnknownSpan {
        /// Name of the offending state.
        state: String,
        /// The dangling span id.
        span: SpanId,
    },
    /// A classifier can produce classes with no corresponding arm.
    #[error("state '{state}' classifies into {classes} classes but has {arms} arms")]
    MissingArms {
        /// Name of the offending state.
        state: String,
        /// Largest class the classifier produces.
        classes: u8,
        /// Number of arms actually supplied.
        arms: usize,
    },
    /// A sequence step with no bytes to match.
    #[error("state '{state}' matches an empty sequence")]
    EmptySequence {
        /// Name of the offending state.
        state: String,
    },
    /// Only byte-examining steps may consume the cursor byte.
    #[error("state '{state}' advances the cursor without reading a byte")]
    BadAdvance {
        /// Name of the offending state.
        state: String,
    },
    /// A sequence must consume its final byte.
    #[error("state '{state}' leaves the final sequence byte unconsumed")]
    SequencePeek {
        /// Name of the offending state.
        state: String,
    },
    /// Code 0 is reserved for success.
    #[error("state '{state}' uses reserved code 0")]
    ReservedCode {
        /// Name of the offending state.
        state: String,
    },
    /// The designated start state does not exist.
    #[error("start state {start} does not exist")]
    BadStart {
        /// The dangling start id.
        start: StateId,
    },
}

/// A validated, immutable transition graph.
#[derive(Debug, Clone)]
pub struct Program {
    states: Vec<State>,
    spans: Vec<Box<str>>,
    start: StateId,
}

impl Program {
    pub(crate) fn state(&self, id: StateId) -> &State {
        &self.states[id as usize]
    }

    pub(crate) fn start(&self) -> StateId {
        self.start
    }

    /// Number of span kinds declared on this program.
    #[must_use]
    pub fn span_count(&self) -> usize {
        self.spans.len()
    }

    /// Diagnostic name of a span kind.
    ///
    /// # Panics
    ///
    /// Panics if `span` was not declared on this program.
    #[must_use]
    pub fn span_name(&self, span: SpanId) -> &str {
        &self.spans[span as usize]
    }

    /// Diagnostic name of a state.
    ///
    /// # Panics
    ///
    /// Panics if `state` does not belong to this program.
    #[must_use]
    pub fn state_name(&self, state: StateId) -> &str {
        &self.states[state as usize].name
    }
}

/// Two-phase program builder: `state` declares, `define` fills in.
#[derive(Debug, Default)]
pub struct Builder {
    states: Vec<(Box<str>, Option<Step>)>,
    spans: Vec<Box<str>>,
}

impl Builder {
    /// Empty builder.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Declare a state named `name`, returning its id.
    pub fn state(&mut self, name: &str) -> StateId {
        let id = self.states.len() as StateId;
        self.states.push((name.into(), None));
        id
    }

    /// Declare a span kind named `name`, returning its id.
    pub fn span(&mut self, name: &str) -> SpanId {
        let id = self.spans.len() as SpanId;
        self.spans.push(name.into());
        id
    }

    /// Define the step for a declared state.
    ///
    /// # Panics
    ///
    /// Panics if `id` was not declared or is already defined.
    pub fn define(&mut self, id: StateId, step: Step) {
        let slot = &mut self.states[id as usize];
        assert!(slot.1.is_none(), "state '{}' defined twice", slot.0);
        slot.1 = Some(step);
    }

    /// Validate the graph and seal it with `start` as the initial state.
    ///
    /// # Errors
    ///
    /// Returns the first structural defect found; see `ProgramError`.
    pub fn finish(self, start: StateId) -> Result<Program, ProgramError> {
        if start as usize >= self.states.len() {
            return Err(ProgramError::BadStart { start });
        }

        let state_count = self.states.len();
        let span_count = self.spans.len();
        let mut states = Vec::with_capacity(state_count);

        for (name, step) in self.states {
            let Some(step) = step else {
                return Err(ProgramError::Undefined { state: name.into() });
            };
            check_step(&name, &step, state_count, span_count)?;
            states.push(State { name, step });
        }

        Ok(Program { states, spans: self.spans, start })
    }
}

fn check_step(
    name: &str,
    step: &Step,
    state_count: usize,
    span_count: usize,
) -> Result<(), ProgramError> {
    let target = |t: &Target| -> Result<(), ProgramError> {
        if (t.state as usize) < state_count {
            Ok(())
        } else {
            Err(ProgramError::UnknownTarget { state: name.to_owned(), target: t.state })
        }
    };
    let action = |t: &Target| -> Result<(), ProgramError> {
        target(t)?;
        if t.advance {
            return Err(ProgramError::BadAdvance { state: name.to_owned() });
        }
        Ok(())
    };
    let span = |s: SpanId| -> Result<(), ProgramError> {
        if (s as usize) < span_count {
            Ok(())
        } else {
            Err(ProgramError::UnknownSpan { state: name.to_owned(), span: s })
        }
    };

    match step {
        Step::Select { classifier, arms, otherwise } => {
            let classes = classifier.max_class();
            if arms.len() < classes as usize {
                return Err(ProgramError::MissingArms {
                    state: name.to_owned(),
                    classes,
                    arms: arms.len(),
                });
            }
            for arm in arms {
                target(arm)?;
            }
            if let Some(t) = otherwise {
                target(t)?;
            }
        }
        Step::Seq { bytes, done } => {
            if bytes.is_empty() {
                return Err(ProgramError::EmptySequence { state: name.to_owned() });
            }
            target(done)?;
            if !done.advance {
                return Err(ProgramError::SequencePeek { state: name.to_owned() });
            }
        }
        Step::Consume { next }
        | Step::LoadCount { next }
        | Step::Invoke { next, .. }
        | Step::SpanStart { next, .. }
        | Step::SpanEnd { next, .. } => action(next)?,
        Step::Pause { code, next, .. } => {
            if *code == 0 {
                return Err(ProgramError::ReservedCode { state: name.to_owned() });
            }
            action(next)?;
        }
        Step::Fail { code, .. } => {
            if *code == 0 {
                return Err(ProgramError::ReservedCode { state: name.to_owned() });
            }
        }
        Step::Stop => {}
    }

    if let Step::SpanStart { span: s, .. } | Step::SpanEnd { span: s, .. } = step {
        span(*s)?;
    }

    Ok(())
}
