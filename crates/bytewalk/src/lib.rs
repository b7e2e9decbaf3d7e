//! A resumable, callback-driven byte-scan engine.
//!
//! `bytewalk` interprets small compiled scan programs — flat graphs of
//! select, sequence, span, and invoke steps — over byte streams delivered
//! in chunks of any size. Scan state is a handful of integer registers,
//! so a stream may be cut anywhere: mid-keyword, mid-span, even inside a
//! skipped byte count. Callbacks can pause the scan, surface a match id,
//! or abort it, and a paused machine resumes exactly where it stopped.
//!
//! ```
//! use bytewalk::{Builder, Classifier, Handler, Machine, Rule, Signal, Step, Target};
//!
//! // Label runs of lowercase letters, delivering each as a span.
//! let mut b = Builder::new();
//! let word = b.span("word");
//! let scan = b.state("scan");
//! let open = b.state("open");
//! let body = b.state("body");
//! let close = b.state("close");
//!
//! let letters = [Rule::range(b'a', b'z', 1)];
//! b.define(scan, Step::Select {
//!     classifier: Classifier::branch(letters),
//!     arms: vec![Target::peek(open)],
//!     otherwise: Some(Target::skip(scan)),
//! });
//! b.define(open, Step::SpanStart { span: word, next: Target::peek(body) });
//! b.define(body, Step::Select {
//!     classifier: Classifier::branch(letters),
//!     arms: vec![Target::skip(body)],
//!     otherwise: Some(Target::peek(close)),
//! });
//! b.define(close, Step::SpanEnd { span: word, next: Target::peek(scan) });
//! let program = b.finish(scan).unwrap();
//!
//! struct Words(Vec<Vec<u8>>);
//!
//! impl Handler for Words {
//!     fn on_span(&mut self, _span: u32, bytes: &[u8], _at: usize) -> Signal {
//!         self.0.push(bytes.to_vec());
//!         Signal::Continue
//!     }
//! }
//!
//! let mut words = Words(Vec::new());
//! let mut machine = Machine::new(&program);
//! machine.execute(b"one two ", &mut words).unwrap();
//! assert_eq!(words.0, [b"one".to_vec(), b"two".to_vec()]);
//! ```

#![no_std]
#![allow(missing_docs)]
extern crate alloc;

#[cfg(test)]
extern crate std;

mod classify;
mod error;
mod handler;
mod machine;
mod program;
mod span;


pub use classify::{Classifier, OTHERWISE, Rule};
pub use error::{Interrupt, code};
pub use handler::{Handler, Signal};
pub use machine::Machine;
pub use program::{Builder, Call, Program, ProgramError, Slot, SpanId, StateId, Step, Target};
