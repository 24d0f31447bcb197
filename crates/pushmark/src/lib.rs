//! A push-style CommonMark parser.
//!
//! The parser makes a single pass over an in-memory document and reports
//! its block and span structure as a stream of events on an [`EventSink`],
//! without building any syntax tree. CommonMark is the base dialect;
//! GitHub tables, strikethrough, task lists, permissive autolinks, wiki
//! links, LaTeX math spans and a few other extensions are available
//! through [`ParserOptions`].
//!
//! ```ignore
//! struct Collector(Vec<String>);
//!
//! impl pushmark::EventSink for Collector {
//!     type Error = std::convert::Infallible;
//!     // ...record the events...
//! #   fn enter_block(&mut self, _: &pushmark::Block<'_>) -> Result<(), Self::Error> { Ok(()) }
//! #   fn leave_block(&mut self, _: &pushmark::Block<'_>) -> Result<(), Self::Error> { Ok(()) }
//! #   fn enter_span(&mut self, _: &pushmark::Span<'_>) -> Result<(), Self::Error> { Ok(()) }
//! #   fn leave_span(&mut self, _: &pushmark::Span<'_>) -> Result<(), Self::Error> { Ok(()) }
//! #   fn text(&mut self, _: pushmark::TextKind, _: &str) -> Result<(), Self::Error> { Ok(()) }
//! }
//!
//! let mut sink = Collector(Vec::new());
//! pushmark::parse("# Hello\n", pushmark::ParserOptions::empty(), &mut sink).unwrap();
//! ```

pub use attribute::Attribute;
pub use event::{
    Align, Block, CodeDetail, EventSink, HeadingDetail, ImageDetail, LinkDetail, ListItemDetail,
    OrderedListDetail, Span, TableCellDetail, TableDetail, TextKind, UnorderedListDetail,
    WikiLinkDetail,
};
pub use options::ParserOptions;

mod attribute;
mod block_parser;
mod byte_lookup;
mod event;
mod options;
mod parser;
mod ref_def;
mod render;
mod unicode;

use block_parser::{BlockParser, ParsedBlocks};
use parser::Parser;

/// Parse `text` and deliver the event stream to `sink`.
///
/// Callbacks run synchronously on the caller's thread, strictly in
/// document order. Malformed input is never an error: anything that does
/// not parse as structure is reported as plain text. The only error this
/// function returns is one produced by a sink callback, which aborts the
/// parse immediately.
pub fn parse<S: EventSink>(
    text: &str,
    options: ParserOptions,
    sink: &mut S,
) -> Result<(), S::Error> {
    let ParsedBlocks {
        blocks,
        lines,
        ref_defs,
        table_suppressed,
    } = BlockParser::new(text, options).parse_into_blocks();

    if table_suppressed {
        sink.debug_log("Suppressing table (column_count > 128)");
    }

    let mut parser = Parser::new(text, options, ref_defs, sink);
    parser.process_document(&blocks, &lines)
}
