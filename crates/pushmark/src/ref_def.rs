//! Collection and lookup of link reference definitions.
//!
//! Definitions are stripped off the start of paragraph blocks as they
//! close. Labels are matched after normalization: leading and trailing
//! whitespace removed, internal whitespace runs collapsed to a single
//! space, and Unicode case folding applied. The first definition of a
//! label wins; later duplicates are ignored.

use std::borrow::Cow;

use rustc_hash::FxHashMap;

use crate::block_parser::LineSpan;
use crate::byte_lookup::{is_newline, is_whitespace};
use crate::parser::link;
use crate::unicode;

/// A single stored definition. Label and title borrow from the input
/// unless they spanned multiple lines and had to be merged.
struct RefDef<'a> {
    normalized_label: String,
    /// Raw (pre-normalization) label length, for the output budget.
    label_size: usize,
    dest_beg: usize,
    dest_end: usize,
    title: Cow<'a, str>,
}

/// Outcome of a reference lookup.
pub(crate) enum RefLookup<'a> {
    Found {
        dest_beg: usize,
        dest_end: usize,
        title: Cow<'a, str>,
    },
    NotFound,
    /// The label is defined, but instantiating it would exceed the
    /// per-parse output budget. The budget is now exhausted for good.
    BudgetExhausted,
}

pub(crate) struct RefDefStore<'a> {
    source: &'a str,
    defs: Vec<RefDef<'a>>,
    index: FxHashMap<String, usize>,
    /// Remaining output allowance for reference resolutions, debited by
    /// `label + title + destination` size on every hit. Guards against
    /// small inputs that request enormous rendered output.
    budget: usize,
}

impl<'a> RefDefStore<'a> {
    pub(crate) fn new(source: &'a str) -> Self {
        RefDefStore {
            source,
            defs: Vec::new(),
            index: FxHashMap::default(),
            budget: 0,
        }
    }

    /// Try to consume one reference definition from the start of `lines`.
    /// Returns the number of lines it occupied, and stores it.
    pub(crate) fn try_consume_definition(&mut self, lines: &[LineSpan]) -> Option<usize> {
        let text = self.source.as_bytes();

        let label = link::scan_link_label(text, lines, lines[0].beg)?;
        let label_is_multiline = label.beg_line_index != label.end_line_index;
        let mut line_index = label.end_line_index;
        let mut off = label.end;

        // Colon.
        if off >= lines[line_index].end || text[off] != b':' {
            return None;
        }
        off += 1;

        // Optional whitespace with up to one line break.
        while off < lines[line_index].end && is_whitespace(text[off]) {
            off += 1;
        }
        if off >= lines[line_index].end {
            line_index += 1;
            if line_index >= lines.len() {
                return None;
            }
            off = lines[line_index].beg;
        }

        // Link destination.
        let dest = link::scan_link_destination(text, off, lines[line_index].end)?;
        off = dest.end;

        // Optional title; it only counts when nothing else follows on its
        // last line.
        let mut title_is_multiline = false;
        let mut title_contents: Option<(usize, usize, usize)> = None;
        if let Some(title) = link::scan_link_title(text, &lines[line_index..], off) {
            if title.end >= lines[line_index + title.end_line_index].end {
                title_is_multiline = title.beg_line_index != title.end_line_index;
                title_contents = Some((
                    title.contents_beg,
                    title.contents_end,
                    line_index + title.beg_line_index,
                ));
                line_index += title.end_line_index;
                off = title.end;
            }
        }

        // Nothing more can follow on the last line.
        if off < lines[line_index].end {
            return None;
        }

        let label_text: Cow<'a, str> = if label_is_multiline {
            Cow::Owned(merge_lines(
                self.source,
                label.contents_beg,
                label.contents_end,
                &lines[label.beg_line_index..],
                ' ',
            ))
        } else {
            Cow::Borrowed(&self.source[label.contents_beg..label.contents_end])
        };

        let title: Cow<'a, str> = match title_contents {
            None => Cow::Borrowed(""),
            Some((beg, end, beg_line_index)) if title_is_multiline => Cow::Owned(merge_lines(
                self.source,
                beg,
                end,
                &lines[beg_line_index..],
                '\n',
            )),
            Some((beg, end, _)) => Cow::Borrowed(&self.source[beg..end]),
        };

        self.defs.push(RefDef {
            normalized_label: normalize_label(&label_text),
            label_size: label_text.len(),
            dest_beg: dest.contents_beg,
            dest_end: dest.contents_end,
            title,
        });

        Some(line_index + 1)
    }

    /// Build the lookup index once collection is finished. Duplicate
    /// labels keep the earliest definition.
    pub(crate) fn build_index(&mut self) {
        self.budget = (16usize.saturating_mul(self.source.len())).min(1024 * 1024);
        for i in 0..self.defs.len() {
            self.index
                .entry(self.defs[i].normalized_label.clone())
                .or_insert(i);
        }
    }

    /// Look up the label spanning `beg..end`, merging lines if it wraps.
    pub(crate) fn lookup(&mut self, lines: &[LineSpan], beg: usize, end: usize) -> RefLookup<'a> {
        if self.budget == 0 {
            return RefLookup::NotFound;
        }

        let Some((line_index, line)) = crate::block_parser::lookup_line(beg, lines) else {
            return RefLookup::NotFound;
        };
        let label: Cow<'_, str> = if end > line.end {
            Cow::Owned(merge_lines(self.source, beg, end, &lines[line_index..], ' '))
        } else {
            Cow::Borrowed(&self.source[beg..end])
        };

        let Some(&def_index) = self.index.get(&normalize_label(&label)) else {
            return RefLookup::NotFound;
        };

        let def = &self.defs[def_index];
        let output_size_estimation =
            def.label_size + def.title.len() + (def.dest_end - def.dest_beg);
        if output_size_estimation >= self.budget {
            self.budget = 0;
            return RefLookup::BudgetExhausted;
        }

        self.budget -= output_size_estimation;
        RefLookup::Found {
            dest_beg: def.dest_beg,
            dest_end: def.dest_end,
            title: def.title.clone(),
        }
    }
}

/// Copy the text between `beg` and `end`, replacing each line break with
/// the given replacement character.
pub(crate) fn merge_lines(
    source: &str,
    beg: usize,
    end: usize,
    lines: &[LineSpan],
    line_break_replacement: char,
) -> String {
    let mut out = String::with_capacity(end - beg);
    let mut off = beg;

    for (line_index, line) in lines.iter().enumerate() {
        let line_end = line.end.min(end);
        if off < line_end {
            out.push_str(&source[off..line_end]);
        }
        off = line_end.max(off);

        if off >= end {
            break;
        }

        out.push(line_break_replacement);
        off = lines[line_index + 1].beg;
    }

    out
}

/// Normalize a label: strip edges, collapse whitespace runs, case fold.
/// Two labels are equivalent iff their normalized forms are equal.
pub(crate) fn normalize_label(label: &str) -> String {
    let mut out = String::with_capacity(label.len());
    let mut pending_space = false;

    for c in label.chars() {
        if unicode::is_unicode_whitespace(c as u32) || is_newline_char(c) {
            pending_space = !out.is_empty();
            continue;
        }
        if pending_space {
            out.push(' ');
            pending_space = false;
        }
        unicode::fold_into(c, &mut out);
    }

    out
}

fn is_newline_char(c: char) -> bool {
    c.is_ascii() && is_newline(c as u8)
}

#[cfg(test)]
mod test {
    use super::normalize_label;
    use test_case::test_case;

    #[test_case("foo", "foo"; "plain")]
    #[test_case("  foo  ", "foo"; "edge whitespace")]
    #[test_case("foo\n   bar", "foo bar"; "internal run collapses")]
    #[test_case("ToLo", "tolo"; "ascii folds")]
    #[test_case("Страница", "страница"; "cyrillic folds")]
    fn normalizes(label: &str, expected: &str) {
        assert_eq!(normalize_label(label), expected);
    }

    #[test]
    fn sharp_s_matches_double_s() {
        assert_eq!(normalize_label("ẞ"), normalize_label("SS"));
    }
}
