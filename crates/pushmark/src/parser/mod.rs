//! The inline machinery: per-parse context, mark collection and the
//! resolution passes, plus the recognizers they share.

use std::borrow::Cow;

use crate::byte_lookup::{decode_utf8, decode_utf8_before};
use crate::event::EventSink;
use crate::options::ParserOptions;
use crate::ref_def::RefDefStore;
use crate::unicode;

use self::delimiter::{Mark, N_OPENER_STACKS};
use self::raw_html::HtmlHorizons;

pub(crate) mod autolink;
pub(crate) mod code_span;
pub(crate) mod delimiter;
pub(crate) mod emphasis;
pub(crate) mod entity;
pub(crate) mod inline;
pub(crate) mod link;
pub(crate) mod math;
pub(crate) mod raw_html;
pub(crate) mod strikethrough;

/// Destination and title of a confirmed link or image, kept in a side
/// arena for the duration of the owning block. The opener mark points at
/// its entry.
pub(crate) struct LinkAttr<'text> {
    pub dest_beg: usize,
    pub dest_end: usize,
    pub title: Cow<'text, str>,
}

/// Everything one parse owns: the input, the enabled options, the event
/// sink, and the reusable buffers of the inline passes. Block structure is
/// produced separately by [`crate::block_parser::BlockParser`] and walked
/// by the render driver in [`crate::render`].
pub(crate) struct Parser<'text, 'sink, S: EventSink> {
    pub(crate) text: &'text str,
    pub(crate) bytes: &'text [u8],
    pub(crate) options: ParserOptions,
    pub(crate) sink: &'sink mut S,

    /// Which bytes are worth a mark, given the enabled extensions.
    pub(crate) mark_char_map: [bool; 256],

    /// Marks of the block currently being analyzed. Reused across blocks.
    pub(crate) marks: Vec<Mark>,
    pub(crate) opener_stacks: [Vec<usize>; N_OPENER_STACKS],
    /// Bracket pairs awaiting link resolution, ordered by closer position.
    pub(crate) unresolved_links: Vec<usize>,
    pub(crate) table_cell_boundaries: Vec<usize>,
    pub(crate) html_horizons: HtmlHorizons,
    pub(crate) ref_defs: RefDefStore<'text>,
    pub(crate) resolved_links: Vec<LinkAttr<'text>>,

    /// Scratch buffer for destinations that need a synthesized scheme
    /// prefix (`mailto:`, `http://`).
    pub(crate) buffer: String,
    /// Looseness of the open list containers during rendering, for the
    /// tight-list paragraph suppression.
    pub(crate) container_looseness: Vec<bool>,
}

impl<'text, 'sink, S: EventSink> Parser<'text, 'sink, S> {
    pub(crate) fn new(
        text: &'text str,
        options: ParserOptions,
        ref_defs: RefDefStore<'text>,
        sink: &'sink mut S,
    ) -> Self {
        Parser {
            text,
            bytes: text.as_bytes(),
            options,
            sink,
            mark_char_map: inline::build_mark_char_map(options),
            marks: Vec::new(),
            opener_stacks: Default::default(),
            unresolved_links: Vec::new(),
            table_cell_boundaries: Vec::new(),
            html_horizons: HtmlHorizons::default(),
            ref_defs,
            resolved_links: Vec::new(),
            buffer: String::new(),
            container_looseness: Vec::new(),
        }
    }
}

/// Unicode whitespace test for the codepoint starting at `off`.
pub(crate) fn is_unicode_whitespace_at(text: &[u8], off: usize) -> bool {
    off < text.len() && unicode::is_unicode_whitespace(decode_utf8(text, off).0)
}

/// Unicode whitespace test for the codepoint ending just before `off`.
pub(crate) fn is_unicode_whitespace_before(text: &[u8], off: usize) -> bool {
    off > 0 && unicode::is_unicode_whitespace(decode_utf8_before(text, off))
}

/// Unicode punctuation test for the codepoint starting at `off`.
pub(crate) fn is_unicode_punct_at(text: &[u8], off: usize) -> bool {
    off < text.len() && unicode::is_unicode_punct(decode_utf8(text, off).0)
}

/// Unicode punctuation test for the codepoint ending just before `off`.
pub(crate) fn is_unicode_punct_before(text: &[u8], off: usize) -> bool {
    off > 0 && unicode::is_unicode_punct(decode_utf8_before(text, off))
}
