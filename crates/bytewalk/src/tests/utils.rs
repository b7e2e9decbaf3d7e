use alloc::{boxed::Box, string::String, vec, vec::Vec};

use crate::{
    Builder, Call, Classifier, Handler, Interrupt, Machine, Program, Rule, Signal, Slot, SpanId,
    Step, Target,
};

/// One observable callback, positioned by stream offset.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Ev {
    Value { slot: Slot, at: usize },
    Match { slot: Slot, id: i32, at: usize },
    Return { slot: Slot, id: i32, at: usize },
    Span { span: SpanId, bytes: Vec<u8>, at: usize },
}

/// Recording handler with optional scripted responses. `base` is added to
/// every chunk-relative offset so traces from differently chunked runs
/// are comparable.
#[derive(Default)]
pub struct Trace {
    pub events: Vec<Ev>,
    pub base: usize,
    pub value_script: Option<Box<dyn FnMut(Slot, usize) -> Signal>>,
    pub return_script: Option<Box<dyn FnMut(Slot, i32) -> Signal>>,
    pub span_script: Option<Box<dyn FnMut(SpanId, &[u8]) -> Signal>>,
}

impl Trace {
    pub fn new() -> Self {
        Self::default()
    }
}

impl Handler for Trace {
    fn on_value(&mut self, slot: Slot, at: usize) -> Signal {
        self.events.push(Ev::Value { slot, at: self.base + at });
        match &mut self.value_script {
            Some(script) => script(slot, at),
            None => Signal::Continue,
        }
    }

    fn on_match(&mut self, slot: Slot, id: i32, at: usize) -> Signal {
        self.events.push(Ev::Match { slot, id, at: self.base + at });
        Signal::Continue
    }

    fn on_return(&mut self, slot: Slot, id: i32, at: usize) -> Signal {
        self.events.push(Ev::Return { slot, id, at: self.base + at });
        match &mut self.return_script {
            Some(script) => script(slot, id),
            None => Signal::matched(id),
        }
    }

    fn on_span(&mut self, span: SpanId, bytes: &[u8], at: usize) -> Signal {
        self.events.push(Ev::Span { span, bytes: bytes.to_vec(), at: self.base + at });
        match &mut self.span_script {
            Some(script) => script(span, bytes),
            None => Signal::Continue,
        }
    }
}

/// Feed `input` in chunks whose sizes cycle through `sizes` (each clamped
/// to at least one byte), keeping `trace.base` in step with the stream.
pub fn feed_chunks(
    machine: &mut Machine<'_>,
    trace: &mut Trace,
    input: &[u8],
    sizes: &[usize],
) -> Result<(), Interrupt> {
    let mut pos = 0;
    let mut turn = 0;
    while pos < input.len() {
        let wish = if sizes.is_empty() { input.len() } else { sizes[turn % sizes.len()] };
        let size = wish.max(1).min(input.len() - pos);
        turn += 1;
        trace.base = pos;
        machine.execute(&input[pos..pos + size], trace)?;
        pos += size;
    }
    Ok(())
}

/// Collapse span fragments that are contiguous in the stream into single
/// events, so runs with different chunking compare equal.
pub fn merge_spans(events: &[Ev]) -> Vec<Ev> {
    let mut out: Vec<Ev> = Vec::new();
    for ev in events {
        match (out.last_mut(), ev) {
            (
                Some(Ev::Span { span: prev, bytes, at }),
                Ev::Span { span, bytes: more, at: at2 },
            ) if *prev == *span && *at + bytes.len() == *at2 => {
                bytes.extend_from_slice(more);
            }
            _ => out.push(ev.clone()),
        }
    }
    out
}

/// Concatenated content delivered for one span kind.
pub fn span_content(events: &[Ev], span: SpanId) -> Vec<u8> {
    let mut out = Vec::new();
    for ev in events {
        if let Ev::Span { span: s, bytes, .. } = ev {
            if *s == span {
                out.extend_from_slice(bytes);
            }
        }
    }
    out
}

/// Events with the span deliveries filtered out.
pub fn non_span(events: &[Ev]) -> Vec<Ev> {
    events.iter().filter(|ev| !matches!(ev, Ev::Span { .. })).cloned().collect()
}

/// Final machine registers relevant to invariance comparisons.
pub fn state_key(machine: &Machine<'_>) -> (i32, i32, bool) {
    (machine.error(), machine.last_match(), machine.paused())
}

/// Runs of '.', '-', and '_' become labeled spans; all other bytes pass
/// unlabeled. Span ids are 0, 1, 2 in that order.
pub fn marker_program() -> Program {
    let mut b = Builder::new();
    let dot = b.span("dot");
    let dash = b.span("dash");
    let under = b.span("under");

    let scan = b.state("scan");
    let open_dot = b.state("open_dot");
    let run_dot = b.state("run_dot");
    let close_dot = b.state("close_dot");
    let open_dash = b.state("open_dash");
    let run_dash = b.state("run_dash");
    let close_dash = b.state("close_dash");
    let open_under = b.state("open_under");
    let run_under = b.state("run_under");
    let close_under = b.state("close_under");

    b.define(
        scan,
        Step::Select {
            classifier: Classifier::branch([
                Rule::byte(b'.', 1),
                Rule::byte(b'-', 2),
                Rule::byte(b'_', 3),
            ]),
            arms: vec![Target::peek(open_dot), Target::peek(open_dash), Target::peek(open_under)],
            otherwise: Some(Target::skip(scan)),
        },
    );

    let labeled = |b: &mut Builder, span, open, run, close, marker| {
        b.define(open, Step::SpanStart { span, next: Target::peek(run) });
        b.define(
            run,
            Step::Select {
                classifier: Classifier::branch([Rule::byte(marker, 1)]),
                arms: vec![Target::skip(run)],
                otherwise: Some(Target::peek(close)),
            },
        );
        b.define(close, Step::SpanEnd { span, next: Target::peek(scan) });
    };
    labeled(&mut b, dot, open_dot, run_dot, close_dot, b'.');
    labeled(&mut b, dash, open_dash, run_dash, close_dash, b'-');
    labeled(&mut b, under, open_under, run_under, close_under, b'_');

    b.finish(scan).unwrap()
}

/// The bytes between '(' and ')' form a span; everything else is skipped.
pub fn segment_program() -> Program {
    let mut b = Builder::new();
    let segment = b.span("segment");

    let scan = b.state("scan");
    let open = b.state("open");
    let inside = b.state("inside");
    let close = b.state("close");
    let after = b.state("after");

    b.define(
        scan,
        Step::Select {
            classifier: Classifier::branch([Rule::byte(b'(', 1)]),
            arms: vec![Target::skip(open)],
            otherwise: Some(Target::skip(scan)),
        },
    );
    b.define(open, Step::SpanStart { span: segment, next: Target::peek(inside) });
    b.define(
        inside,
        Step::Select {
            classifier: Classifier::branch([Rule::byte(b')', 1)]),
            arms: vec![Target::peek(close)],
            otherwise: Some(Target::skip(inside)),
        },
    );
    b.define(close, Step::SpanEnd { span: segment, next: Target::peek(after) });
    b.define(
        after,
        Step::Select {
            classifier: Classifier::branch([Rule::byte(b')', 1)]),
            arms: vec![Target::skip(scan)],
            otherwise: None,
        },
    );

    b.finish(scan).unwrap()
}

/// Bracketed outer spans containing parenthesized inner spans, so two
/// span kinds can be open at once. Ids: outer 0, inner 1.
pub fn nested_program() -> Program {
    let mut b = Builder::new();
    let outer = b.span("outer");
    let inner = b.span("inner");

    let scan = b.state("scan");
    let o_open = b.state("o_open");
    let o_body = b.state("o_body");
    let o_close = b.state("o_close");
    let o_after = b.state("o_after");
    let i_open = b.state("i_open");
    let i_body = b.state("i_body");
    let i_close = b.state("i_close");
    let i_after = b.state("i_after");

    b.define(
        scan,
        Step::Select {
            classifier: Classifier::branch([Rule::byte(b'[', 1)]),
            arms: vec![Target::skip(o_open)],
            otherwise: Some(Target::skip(scan)),
        },
    );
    b.define(o_open, Step::SpanStart { span: outer, next: Target::peek(o_body) });
    b.define(
        o_body,
        Step::Select {
            classifier: Classifier::branch([Rule::byte(b']', 1), Rule::byte(b'(', 2)]),
            arms: vec![Target::peek(o_close), Target::skip(i_open)],
            otherwise: Some(Target::skip(o_body)),
        },
    );
    b.define(o_close, Step::SpanEnd { span: outer, next: Target::peek(o_after) });
    b.define(
        o_after,
        Step::Select {
            classifier: Classifier::branch([Rule::byte(b']', 1)]),
            arms: vec![Target::skip(scan)],
            otherwise: None,
        },
    );
    b.define(i_open, Step::SpanStart { span: inner, next: Target::peek(i_body) });
    b.define(
        i_body,
        Step::Select {
            classifier: Classifier::branch([Rule::byte(b')', 1)]),
            arms: vec![Target::peek(i_close)],
            otherwise: Some(Target::skip(i_body)),
        },
    );
    b.define(i_close, Step::SpanEnd { span: inner, next: Target::peek(i_after) });
    b.define(
        i_after,
        Step::Select {
            classifier: Classifier::branch([Rule::byte(b')', 1)]),
            arms: vec![Target::skip(o_body)],
            otherwise: None,
        },
    );

    b.finish(scan).unwrap()
}

/// "GET", "PUT", and "DELETE" report ids 1-3 through a return site
/// (slot 0); verbs are separated by single spaces.
pub fn verbs_program() -> Program {
    let mut b = Builder::new();
    let verb = b.state("verb");
    let get = b.state("get");
    let put = b.state("put");
    let delete = b.state("delete");
    let report = b.state("report");
    let gap = b.state("gap");

    b.define(
        verb,
        Step::Select {
            classifier: Classifier::branch([
                Rule::byte(b'G', 1),
                Rule::byte(b'P', 2),
                Rule::byte(b'D', 3),
            ]),
            arms: vec![Target::peek(get), Target::peek(put), Target::peek(delete)],
            otherwise: None,
        },
    );
    b.define(get, Step::Seq { bytes: b"GET".to_vec(), done: Target::skip(report).with_value(1) });
    b.define(put, Step::Seq { bytes: b"PUT".to_vec(), done: Target::skip(report).with_value(2) });
    b.define(
        delete,
        Step::Seq { bytes: b"DELETE".to_vec(), done: Target::skip(report).with_value(3) },
    );
    b.define(report, Step::Invoke { call: Call::Return(0), next: Target::peek(gap) });
    b.define(
        gap,
        Step::Select {
            classifier: Classifier::branch([Rule::byte(b' ', 1)]),
            arms: vec![Target::skip(verb)],
            otherwise: None,
        },
    );

    b.finish(verb).unwrap()
}

/// A digit loads a countdown and that many following bytes are skipped; a
/// value site (slot 0) fires where each countdown ends.
pub fn counted_program() -> Program {
    let mut b = Builder::new();
    let start = b.state("start");
    let load = b.state("load");
    let skip = b.state("skip");
    let mark = b.state("mark");

    let digits: Vec<Rule> = (0..10u8).map(|d| Rule::byte(b'0' + d, d + 1)).collect();
    b.define(
        start,
        Step::Select {
            classifier: Classifier::branch(digits),
            arms: (0..10).map(|d| Target::skip(load).with_value(d)).collect(),
            otherwise: None,
        },
    );
    b.define(load, Step::LoadCount { next: Target::peek(skip) });
    b.define(skip, Step::Consume { next: Target::peek(mark) });
    b.define(mark, Step::Invoke { call: Call::Value(0), next: Target::peek(start) });

    b.finish(start).unwrap()
}

/// '(' opens a span, 'p' suspends inside it with code 3, ')' closes it.
pub fn pausing_span_program() -> Program {
    let mut b = Builder::new();
    let seg = b.span("seg");
    let start = b.state("start");
    let open = b.state("open");
    let body = b.state("body");
    let hold = b.state("hold");
    let close = b.state("close");

    b.define(
        start,
        Step::Select {
            classifier: Classifier::branch([Rule::byte(b'(', 1)]),
            arms: vec![Target::skip(open)],
            otherwise: Some(Target::skip(start)),
        },
    );
    b.define(open, Step::SpanStart { span: seg, next: Target::peek(body) });
    b.define(
        body,
        Step::Select {
            classifier: Classifier::branch([Rule::byte(b'p', 1), Rule::byte(b')', 2)]),
            arms: vec![Target::skip(hold), Target::peek(close)],
            otherwise: Some(Target::skip(body)),
        },
    );
    b.define(hold, Step::Pause { code: 3, reason: String::from("hold"), next: Target::peek(body) });
    b.define(close, Step::SpanEnd { span: seg, next: Target::peek(start) });

    b.finish(start).unwrap()
}
