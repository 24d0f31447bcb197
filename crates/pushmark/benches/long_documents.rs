use std::convert::Infallible;

use criterion::{criterion_group, criterion_main, Criterion};

use pushmark::{Block, EventSink, ParserOptions, Span, TextKind};

/// Counts events without retaining them, so the benchmark measures the
/// parser rather than sink allocations.
struct CountingSink {
    events: usize,
    bytes: usize,
}

impl EventSink for CountingSink {
    type Error = Infallible;

    fn enter_block(&mut self, _: &Block<'_>) -> Result<(), Infallible> {
        self.events += 1;
        Ok(())
    }
    fn leave_block(&mut self, _: &Block<'_>) -> Result<(), Infallible> {
        self.events += 1;
        Ok(())
    }
    fn enter_span(&mut self, _: &Span<'_>) -> Result<(), Infallible> {
        self.events += 1;
        Ok(())
    }
    fn leave_span(&mut self, _: &Span<'_>) -> Result<(), Infallible> {
        self.events += 1;
        Ok(())
    }
    fn text(&mut self, _: TextKind, text: &str) -> Result<(), Infallible> {
        self.events += 1;
        self.bytes += text.len();
        Ok(())
    }
}

fn parse_counting(content: &str, options: ParserOptions) -> usize {
    let mut sink = CountingSink { events: 0, bytes: 0 };
    pushmark::parse(content, options, &mut sink).unwrap();
    sink.events
}

/// A synthesized document exercising a wide mix of constructs.
fn synthesize_document(paragraphs: usize) -> String {
    let mut out = String::new();
    for i in 0..paragraphs {
        match i % 6 {
            0 => out.push_str("# A heading with *emphasis* and `code`\n\n"),
            1 => out.push_str(
                "A paragraph that has **strong text**, a [link](/somewhere \"title\"),\nand a soft break with ~~nothing~~ special otherwise.\n\n",
            ),
            2 => out.push_str("> Quoted material across\n> a couple of lines.\n\n"),
            3 => out.push_str("- item one\n- item two with www.example.com\n- item three\n\n"),
            4 => out.push_str("```rust\nfn bench() -> usize { 42 }\n```\n\n"),
            _ => out.push_str(
                "| a | b |\n|---|---|\n| *1* | `2` |\n\n",
            ),
        }
    }
    out
}

fn long_documents(c: &mut Criterion) {
    let document = synthesize_document(600);

    let mut group = c.benchmark_group("long documents");
    group.bench_function("commonmark", |b| {
        b.iter(|| parse_counting(&document, ParserOptions::empty()))
    });
    group.bench_function("github dialect", |b| {
        b.iter(|| parse_counting(&document, ParserOptions::GITHUB))
    });
    group.finish();
}

fn short_inlines(c: &mut Criterion) {
    let content = "*this ***has some* various things* that** [create multiple elements](while/inline 'but without') taking _too_ much ![effort] to parse, and should `be a decent` test` ``of ``whether this works quickly.";

    let mut group = c.benchmark_group("inlines");
    group.bench_function("commonmark", |b| {
        b.iter(|| parse_counting(content, ParserOptions::empty()))
    });
    group.finish();
}

fn pathological(c: &mut Criterion) {
    let mut group = c.benchmark_group("pathological");
    group.bench_function("nested brackets", |b| {
        let content = format!("{}x{}", "[".repeat(2000), "]".repeat(2000));
        b.iter(|| parse_counting(&content, ParserOptions::empty()))
    });
    group.bench_function("backtick runs", |b| {
        let content = "`a` ".repeat(2000);
        b.iter(|| parse_counting(&content, ParserOptions::empty()))
    });
    group.finish();
}

criterion_group!(benches, long_documents, short_inlines, pathological);
criterion_main!(benches);
