//! The step interpreter.
//!
//! Overview
//! - A `Machine` walks one `Program` over a byte stream delivered in
//!   chunks of any size. All scan state lives in a handful of integer
//!   registers (`current`, `index`, `match_value`, the error triple) plus
//!   one mark per span kind, so suspending at a buffer boundary and
//!   carrying on with the next chunk is the normal mode of operation, not
//!   a special case.
//! - Byte-examining steps (`Select`, `Seq`) suspend when the cursor
//!   reaches the end of the chunk; action steps run regardless of the
//!   cursor. `execute` returning `Ok(())` therefore means exactly "every
//!   byte consumed, nothing pending".
//!
//! Entry sequence of `execute`
//! - A halt recorded by a previous call is returned again immediately;
//!   the chunk is not touched. `resume` clears pauses and matches,
//!   `init` clears faults.
//! - Marks of still-open spans are re-anchored to offset 0: the previous
//!   chunk's content was already flushed when that call returned, and its
//!   storage is gone, so the new chunk's base is the logical continuation
//!   point.
//! - The step loop runs until the chunk is exhausted or a step interrupts.
//! - On a clean exhaustion, open spans flush their `[mark, end)` content.
//!   The same flush runs before a pause or match interrupt is returned
//!   (up to the interrupt offset), so span content is never lost to a
//!   suspension; it does not run for faults.
//!
//! Halts
//! - Pause and match halts are resumable: the continuation state was
//!   already installed when the halt was recorded, so after `resume` the
//!   embedder re-enters `execute` with the bytes from the interrupt
//!   offset onward. Faults park the machine until `init`.

use alloc::{format, string::String};

use bstr::BStr;

use crate::{
    classify::OTHERWISE,
    error::{Interrupt, code},
    handler::{Handler, Signal},
    program::{Call, Program, StateId, Step, Target},
    span::SpanTracker,
};

#[derive(Debug, Clone, Copy)]
enum Halt {
    Paused,
    Matched,
    Faulted,
}

enum SeqOutcome {
    /// The cursor sits on the final byte of the literal.
    Complete,
    /// Buffer exhausted mid-literal; progress is saved in `index`.
    Suspend,
    Mismatch { byte: u8, progress: usize },
}

/// Interpreter state for one logical stream.
#[derive(Debug, Clone)]
pub struct Machine<'p> {
    program: &'p Program,
    current: StateId,
    index: usize,
    match_value: i32,
    error: i32,
    reason: String,
    error_offset: usize,
    halt: Option<Halt>,
    spans: SpanTracker,
}

impl<'p> Machine<'p> {
    /// Fresh machine positioned at `program`'s start state.
    #[must_use]
    pub fn new(program: &'p Program) -> Self {
        Self {
            program,
            current: program.start(),
            index: 0,
            match_value: 0,
            error: 0,
            reason: String::new(),
            error_offset: 0,
            halt: None,
            spans: SpanTracker::new(program.span_count()),
        }
    }

    /// Reset to the start state, clearing every register and mark.
    pub fn init(&mut self) {
        self.current = self.program.start();
        self.index = 0;
        self.match_value = 0;
        self.error = 0;
        self.reason.clear();
        self.error_offset = 0;
        self.halt = None;
        self.spans.reset();
    }

    /// Last error code; 0 when none.
    #[must_use]
    pub fn error(&self) -> i32 {
        self.error
    }

    /// Description of the last halt, when one was recorded with a reason.
    #[must_use]
    pub fn reason(&self) -> Option<&str> {
        if self.reason.is_empty() { None } else { Some(&self.reason) }
    }

    /// Offset within its chunk at which the last halt was recorded.
    #[must_use]
    pub fn error_offset(&self) -> usize {
        self.error_offset
    }

    /// Last recorded match value.
    #[must_use]
    pub fn last_match(&self) -> i32 {
        self.match_value
    }

    /// Whether the machine is suspended on a resumable halt.
    #[must_use]
    pub fn paused(&self) -> bool {
        matches!(self.halt, Some(Halt::Paused | Halt::Matched))
    }

    /// Clear a resumable halt so the next `execute` continues the scan.
    ///
    /// Returns false when there is nothing to resume: no halt at all, or
    /// a fault, which only `init` clears.
    pub fn resume(&mut self) -> bool {
        match self.halt {
            Some(Halt::Paused | Halt::Matched) => {
                self.halt = None;
                self.error = 0;
                self.reason.clear();
                self.error_offset = 0;
                true
            }
            _ => false,
        }
    }

    /// Scan `chunk`, firing callbacks on `handler`.
    ///
    /// `Ok(())` means every byte was consumed with no pause, match, or
    /// error. Zero-length chunks are a no-op. After a resumable
    /// interrupt, call `resume` and re-enter with the bytes from the
    /// interrupt's offset onward.
    ///
    /// # Errors
    ///
    /// The interrupt that stopped the scan; a halt pending from a
    /// previous call is returned again without touching `chunk`.
    pub fn execute<H: Handler>(&mut self, chunk: &[u8], handler: &mut H) -> Result<(), Interrupt> {
        if let Some(pending) = self.pending() {
            return Err(pending);
        }
        self.spans.rebase();
        match self.run(chunk, handler) {
            Ok(stop) => {
                debug_assert_eq!(stop, chunk.len());
                self.flush(chunk, chunk.len(), handler)?;
                Ok(())
            }
            Err(interrupt) => Err(self.wind_down(chunk, interrupt, handler)),
        }
    }

    fn run<H: Handler>(&mut self, chunk: &[u8], handler: &mut H) -> Result<usize, Interrupt> {
        let program = self.program;
        let mut pos = 0usize;
        loop {
            match &program.state(self.current).step {
                Step::Select { classifier, arms, otherwise } => {
                    let Some(&byte) = chunk.get(pos) else { return Ok(pos) };
                    let class = classifier.classify(byte);
                    let target = if class == OTHERWISE {
                        otherwise.as_ref()
                    } else {
                        arms.get(usize::from(class) - 1)
                    };
                    let Some(&target) = target else {
                        let name = program.state_name(self.current);
                        return Err(self.fault(
                            code::NO_TRANSITION,
                            pos,
                            format!("unexpected byte 0x{byte:02x} in state '{name}'"),
                        ));
                    };
                    self.take(target, &mut pos);
                }
                Step::Seq { bytes, done } => match self.match_seq(chunk, &mut pos, bytes) {
                    SeqOutcome::Complete => {
                        let done = *done;
                        self.take(done, &mut pos);
                    }
                    SeqOutcome::Suspend => return Ok(pos),
                    SeqOutcome::Mismatch { byte, progress } => {
                        let name = program.state_name(self.current);
                        let literal = BStr::new(bytes);
                        return Err(self.fault(
                            code::SEQ_MISMATCH,
                            pos,
                            format!(
                                "unexpected byte 0x{byte:02x} at byte {progress} of {literal:?} in state '{name}'"
                            ),
                        ));
                    }
                },
                Step::Consume { next } => {
                    let available = chunk.len() - pos;
                    if self.index > available {
                        self.index -= available;
                        return Ok(chunk.len());
                    }
                    pos += self.index;
                    self.index = 0;
                    let next = *next;
                    self.take(next, &mut pos);
                }
                Step::LoadCount { next } => match usize::try_from(self.match_value) {
                    Ok(count) => {
                        self.index = count;
                        let next = *next;
                        self.take(next, &mut pos);
                    }
                    Err(_) => {
                        let name = program.state_name(self.current);
                        let value = self.match_value;
                        return Err(self.fault(
                            code::BAD_COUNT,
                            pos,
                            format!("negative count {value} in state '{name}'"),
                        ));
                    }
                },
                Step::SpanStart { span, next } => {
                    if pos == chunk.len() {
                        return Ok(pos);
                    }
                    let span = *span;
                    if !self.spans.open(span, pos) {
                        let name = program.span_name(span);
                        return Err(self.fault(
                            code::BAD_SPAN,
                            pos,
                            format!("span '{name}' opened twice"),
                        ));
                    }
                    let next = *next;
                    self.take(next, &mut pos);
                }
                Step::SpanEnd { span, next } => {
                    let span = *span;
                    let Some(start) = self.spans.close(span) else {
                        let name = program.span_name(span);
                        return Err(self.fault(
                            code::BAD_SPAN,
                            pos,
                            format!("span '{name}' closed while not open"),
                        ));
                    };
                    let signal = handler.on_span(span, &chunk[start..pos], start);
                    let next = *next;
                    self.apply(signal, next, &mut pos)?;
                }
                Step::Invoke { call, next } => {
                    let signal = match *call {
                        Call::Value(slot) => handler.on_value(slot, pos),
                        Call::Match(slot) => handler.on_match(slot, self.match_value, pos),
                        Call::Return(slot) => handler.on_return(slot, self.match_value, pos),
                    };
                    let next = *next;
                    self.apply(signal, next, &mut pos)?;
                }
                Step::Pause { code, reason, next } => {
                    let code = *code;
                    let next = *next;
                    self.take(next, &mut pos);
                    return Err(self.pause(code, pos, reason));
                }
                Step::Fail { code, reason } => {
                    let code = *code;
                    let reason = reason.clone();
                    return Err(self.fault(code, pos, reason));
                }
                Step::Stop => {
                    if pos == chunk.len() {
                        return Ok(pos);
                    }
                    let name = program.state_name(self.current);
                    return Err(self.fault(
                        code::NO_TRANSITION,
                        pos,
                        format!("trailing bytes after terminal state '{name}'"),
                    ));
                }
            }
        }
    }

    /// Literal matcher shared by all sequence states. On completion the
    /// cursor is left on the final byte; the done target consumes it.
    fn match_seq(&mut self, chunk: &[u8], pos: &mut usize, bytes: &[u8]) -> SeqOutcome {
        while let Some(&byte) = chunk.get(*pos) {
            if byte == bytes[self.index] {
                self.index += 1;
                if self.index == bytes.len() {
                    self.index = 0;
                    return SeqOutcome::Complete;
                }
                *pos += 1;
            } else {
                let progress = self.index;
                self.index = 0;
                return SeqOutcome::Mismatch { byte, progress };
            }
        }
        SeqOutcome::Suspend
    }

    fn take(&mut self, target: Target, pos: &mut usize) {
        if let Some(value) = target.value {
            self.match_value = value;
        }
        if target.advance {
            *pos += 1;
        }
        self.current = target.state;
    }

    /// Interpret a callback signal at an invoke or span-end site. The
    /// continuation is installed before a resumable halt is recorded, so
    /// `resume` continues past the site.
    fn apply(&mut self, signal: Signal, next: Target, pos: &mut usize) -> Result<(), Interrupt> {
        match signal {
            Signal::Continue | Signal::Match(0) => {
                self.take(next, pos);
                Ok(())
            }
            Signal::Pause => {
                self.take(next, pos);
                Err(self.pause(code::PAUSE, *pos, "paused by callback"))
            }
            Signal::Match(id) => {
                self.take(next, pos);
                Err(self.matched(id, *pos))
            }
            Signal::Error(error) => {
                let name = self.program.state_name(self.current);
                let reason = format!("callback error in state '{name}'");
                Err(self.fault(error, *pos, reason))
            }
        }
    }

    /// Flush still-open spans up to `upto`. A flush-time `Error` signal
    /// faults the machine; other signals are delivery-only.
    fn flush<H: Handler>(
        &mut self,
        chunk: &[u8],
        upto: usize,
        handler: &mut H,
    ) -> Result<(), Interrupt> {
        let result = self.spans.flush(upto, |span, start| {
            match handler.on_span(span, &chunk[start..upto], start) {
                Signal::Error(error) => Err((span, error, start)),
                _ => Ok(()),
            }
        });
        match result {
            Ok(()) => Ok(()),
            Err((span, error, start)) => {
                let name = self.program.span_name(span);
                let reason = format!("span '{name}' callback error");
                Err(self.fault(error, start, reason))
            }
        }
    }

    /// Deliver open-span content accumulated before a resumable
    /// interrupt; a fault from the flush supersedes the interrupt.
    fn wind_down<H: Handler>(
        &mut self,
        chunk: &[u8],
        interrupt: Interrupt,
        handler: &mut H,
    ) -> Interrupt {
        if matches!(interrupt, Interrupt::Fault { .. }) {
            return interrupt;
        }
        match self.flush(chunk, interrupt.offset(), handler) {
            Ok(()) => interrupt,
            Err(fault) => fault,
        }
    }

    fn pending(&self) -> Option<Interrupt> {
        Some(match self.halt? {
            Halt::Paused => Interrupt::Pause {
                code: self.error,
                offset: self.error_offset,
                reason: self.reason.clone(),
            },
            Halt::Matched => Interrupt::Match { id: self.error, offset: self.error_offset },
            Halt::Faulted => Interrupt::Fault {
                code: self.error,
                offset: self.error_offset,
                reason: self.reason.clone(),
            },
        })
    }

    fn pause(&mut self, code: i32, offset: usize, reason: &str) -> Interrupt {
        self.halt = Some(Halt::Paused);
        self.error = code;
        self.error_offset = offset;
        self.reason.clear();
        self.reason.push_str(reason);
        Interrupt::Pause { code, offset, reason: String::from(reason) }
    }

    fn matched(&mut self, id: i32, offset: usize) -> Interrupt {
        self.halt = Some(Halt::Matched);
        self.error = id;
        self.error_offset = offset;
        self.reason.clear();
        Interrupt::Match { id, offset }
    }

    fn fault(&mut self, code: i32, offset: usize, reason: String) -> Interrupt {
        self.halt = Some(Halt::Faulted);
        self.error = code;
        self.error_offset = offset;
        self.reason = reason.clone();
        Interrupt::Fault { code, offset, reason }
    }
}
