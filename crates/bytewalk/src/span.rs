//! Span bookkeeping.
//!
//! A span is open while its mark holds the chunk offset where it started.
//! Marks index the current chunk only: `rebase` re-anchors every open mark
//! to offset 0 when a new chunk arrives, and `flush` walks the open marks
//! when a chunk ends (or execution suspends) so content already scanned is
//! delivered before its backing buffer goes away.

use alloc::{vec, vec::Vec};

use crate::program::SpanId;

#[derive(Debug, Clone, Default)]
pub(crate) struct SpanTracker {
    marks: Vec<Option<usize>>,
}

impl SpanTracker {
    pub(crate) fn new(kinds: usize) -> Self {
        Self { marks: vec![None; kinds] }
    }

    pub(crate) fn reset(&mut self) {
        for mark in &mut self.marks {
            *mark = None;
        }
    }

    /// Re-anchor open marks to the base of a freshly supplied chunk.
    pub(crate) fn rebase(&mut self) {
        for mark in self.marks.iter_mut().flatten() {
            *mark = 0;
        }
    }

    /// Store the mark for `span`; false if it is already open.
    pub(crate) fn open(&mut self, span: SpanId, at: usize) -> bool {
        let mark = &mut self.marks[span as usize];
        if mark.is_some() {
            return false;
        }
        *mark = Some(at);
        true
    }

    /// Take the mark for `span`; `None` if it was never opened.
    pub(crate) fn close(&mut self, span: SpanId) -> Option<usize> {
        self.marks[span as usize].take()
    }

    /// Deliver `[mark, upto)` for every open span with content, advancing
    /// each mark to `upto` so nothing is delivered twice. Stops at the
    /// first delivery error.
    pub(crate) fn flush<E>(
        &mut self,
        upto: usize,
        mut deliver: impl FnMut(SpanId, usize) -> Result<(), E>,
    ) -> Result<(), E> {
        for (span, mark) in (0u32..).zip(self.marks.iter_mut()) {
            if let Some(start) = *mark {
                if start < upto {
                    deliver(span, start)?;
                    *mark = Some(upto);
                }
            }
        }
        Ok(())
    }
}
