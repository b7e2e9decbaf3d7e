//! Chunked-scan and throughput harness over a marker grammar that labels
//! runs of '.', '-', and '_' as spans.
//!
//! Usage: `scan <chunk-size> <input>` scans the input in chunks of the
//! given size, printing every delivered span; `scan bench <input>` replays
//! the input until ~2 GiB have been scanned and reports throughput.
#![allow(missing_docs)]
#![allow(clippy::cast_precision_loss)]

use std::{env, process::exit, time::Instant};

use bytewalk::{Builder, Classifier, Handler, Machine, Program, Rule, Signal, SpanId, Step, Target};

const BENCH_BYTES: u64 = 1 << 31;

fn marker_program() -> Program {
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
            classifier: Classifier::table(&[
                Rule::byte(b'.', 1),
                Rule::byte(b'-', 2),
                Rule::byte(b'_', 3),
            ]),
            arms: vec![Target::peek(open_dot), Target::peek(open_dash), Target::peek(open_under)],
            otherwise: Some(Target::skip(scan)),
        },
    );

    let mut labeled = |span, open, run, close, marker| {
        b.define(open, Step::SpanStart { span, next: Target::peek(run) });
        b.define(
            run,
            Step::Select {
                classifier: Classifier::table(&[Rule::byte(marker, 1)]),
                arms: vec![Target::skip(run)],
                otherwise: Some(Target::peek(close)),
            },
        );
        b.define(close, Step::SpanEnd { span, next: Target::peek(scan) });
    };
    labeled(dot, open_dot, run_dot, close_dot, b'.');
    labeled(dash, open_dash, run_dash, close_dash, b'-');
    labeled(under, open_under, run_under, close_under, b'_');

    b.finish(scan).expect("marker grammar is well formed")
}

/// Prints each delivered span with its stream offset.
struct Printer<'p> {
    program: &'p Program,
    base: usize,
}

impl Handler for Printer<'_> {
    fn on_span(&mut self, span: SpanId, bytes: &[u8], at: usize) -> Signal {
        println!(
            "off={} len={} span[{}]={:?}",
            self.base + at,
            bytes.len(),
            self.program.span_name(span),
            String::from_utf8_lossy(bytes),
        );
        Signal::Continue
    }
}

fn run_scan(program: &Program, scan: usize, input: &[u8]) -> i32 {
    let mut machine = Machine::new(program);
    let mut printer = Printer { program, base: 0 };

    let mut pos = 0;
    while pos < input.len() {
        let end = (pos + scan).min(input.len());
        printer.base = pos;
        if let Err(halt) = machine.execute(&input[pos..end], &mut printer) {
            eprintln!(
                "code={} error={} reason={}",
                halt.code(),
                machine.error(),
                machine.reason().unwrap_or(""),
            );
            return -1;
        }
        pos = end;
    }
    0
}

fn run_bench(program: &Program, input: &[u8]) -> i32 {
    let mut machine = Machine::new(program);
    let iterations = BENCH_BYTES / input.len() as u64;
    let total = (iterations * input.len() as u64) as f64;

    let started = Instant::now();
    for _ in 0..iterations {
        if let Err(halt) = machine.execute(input, &mut ()) {
            eprintln!(
                "code={} error={} reason={}",
                halt.code(),
                machine.error(),
                machine.reason().unwrap_or(""),
            );
            return halt.code();
        }
    }
    let time = started.elapsed().as_secs_f64();

    println!(
        "{:.2} mb | {:.2} mb/s | {:.2} s",
        total / (1024.0 * 1024.0),
        total / time / (1024.0 * 1024.0),
        time,
    );
    0
}

fn main() {
    let args: Vec<String> = env::args().collect();
    if args.len() < 3 {
        eprintln!("{} [bench or scan-size] [input]", args[0]);
        exit(-1);
    }
    let input = args[2].as_bytes();
    let program = marker_program();

    if args[1] == "bench" {
        if input.is_empty() {
            eprintln!("Empty input");
            exit(-1);
        }
        exit(run_bench(&program, input));
    }

    let scan = match args[1].parse::<usize>() {
        Ok(scan) if scan > 0 => scan,
        _ => {
            eprintln!("Invalid scan value");
            exit(-1);
        }
    };
    exit(run_scan(&program, scan, input));
}
