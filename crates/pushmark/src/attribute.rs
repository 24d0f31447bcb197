//! Attribute values for link destinations, titles, and code info strings.
//!
//! An attribute is a small piece of resolved text that still needs its
//! entities and null characters distinguished by the consumer. It is
//! represented as the processed text plus a sequence of typed substrings
//! covering it. When the raw range contains no backslash, ampersand or
//! null byte the text is borrowed from the input untouched.

use std::borrow::Cow;

use crate::event::TextKind;
use crate::parser::entity;

#[derive(Clone, Debug, PartialEq, Eq)]
enum Substrings {
    /// One normal substring spanning the whole text.
    Trivial,
    /// `(kind, start offset)` records; each substring ends where the next
    /// one starts, the last one at `text.len()`.
    Complex(Vec<(TextKind, usize)>),
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Attribute<'a> {
    text: Cow<'a, str>,
    substrs: Substrings,
}

impl<'a> Attribute<'a> {
    pub(crate) fn empty() -> Self {
        Attribute {
            text: Cow::Borrowed(""),
            substrs: Substrings::Trivial,
        }
    }

    /// The attribute text with escapes already removed. Entities are still
    /// in their raw form; use [`Attribute::substrings`] to locate them.
    pub fn as_str(&self) -> &str {
        &self.text
    }

    pub fn is_empty(&self) -> bool {
        self.text.is_empty()
    }

    /// Iterate the typed substrings covering the text in order.
    pub fn substrings(&self) -> impl Iterator<Item = (TextKind, &str)> {
        let offsets: Vec<(TextKind, usize, usize)> = match &self.substrs {
            Substrings::Trivial => vec![(TextKind::Normal, 0, self.text.len())],
            Substrings::Complex(records) => records
                .iter()
                .enumerate()
                .map(|(i, (kind, off))| {
                    let end = records
                        .get(i + 1)
                        .map_or(self.text.len(), |(_, next)| *next);
                    (*kind, *off, end)
                })
                .collect(),
        };
        let text = &self.text;
        offsets
            .into_iter()
            .map(move |(kind, beg, end)| (kind, &text[beg..end]))
    }
}

/// Build an attribute from a raw range of (already line-merged) text.
///
/// `no_escapes` disables backslash-escape removal; autolink destinations
/// use it since CommonMark treats their content literally.
pub(crate) fn build_attribute<'a>(raw: &'a str, no_escapes: bool) -> Attribute<'a> {
    let bytes = raw.as_bytes();

    // Fast path: nothing to resolve, borrow the input.
    if !bytes.iter().any(|b| matches!(b, b'\\' | b'&' | b'\0')) {
        return Attribute {
            text: Cow::Borrowed(raw),
            substrs: Substrings::Trivial,
        };
    }

    let mut text = String::with_capacity(raw.len());
    let mut records: Vec<(TextKind, usize)> = Vec::new();
    let mut raw_off = 0;

    while raw_off < bytes.len() {
        if bytes[raw_off] == b'\0' {
            records.push((TextKind::NullChar, text.len()));
            text.push('\0');
            raw_off += 1;
            continue;
        }

        if bytes[raw_off] == b'&' {
            if let Some(ent_end) = entity::scan_entity(bytes, raw_off, bytes.len()) {
                records.push((TextKind::Entity, text.len()));
                text.push_str(&raw[raw_off..ent_end]);
                raw_off = ent_end;
                continue;
            }
        }

        if records.last().map(|(kind, _)| *kind) != Some(TextKind::Normal) {
            records.push((TextKind::Normal, text.len()));
        }

        if !no_escapes
            && bytes[raw_off] == b'\\'
            && raw_off + 1 < bytes.len()
            && (crate::byte_lookup::is_ascii_punct(bytes[raw_off + 1])
                || crate::byte_lookup::is_newline(bytes[raw_off + 1]))
        {
            raw_off += 1;
        }

        let ch_len = crate::byte_lookup::char_length_from_byte(bytes[raw_off]).max(1);
        text.push_str(&raw[raw_off..raw_off + ch_len]);
        raw_off += ch_len;
    }

    Attribute {
        text: Cow::Owned(text),
        substrs: Substrings::Complex(records),
    }
}

#[cfg(test)]
mod test {
    use super::*;
    use std::borrow::Cow;
    use test_case::test_case;

    #[test]
    fn trivial_attribute_borrows() {
        let attr = build_attribute("/some/url", false);
        assert!(matches!(attr.text, Cow::Borrowed(_)));
        assert_eq!(attr.as_str(), "/some/url");
        let substrs: Vec<_> = attr.substrings().collect();
        assert_eq!(substrs, vec![(TextKind::Normal, "/some/url")]);
    }

    #[test_case("a\\*b", "a*b"; "escaped punctuation")]
    #[test_case("a\\b", "a\\b"; "letters cannot be escaped")]
    #[test_case("\\\\", "\\"; "escaped backslash")]
    fn removes_escapes(raw: &str, expected: &str) {
        assert_eq!(build_attribute(raw, false).as_str(), expected);
    }

    #[test]
    fn keeps_escapes_for_autolinks(){
        assert_eq!(build_attribute("a\\*b", true).as_str(), "a\\*b");
    }

    #[test]
    fn splits_out_entities() {
        let attr = build_attribute("x&amp;y", false);
        let substrs: Vec<_> = attr.substrings().collect();
        assert_eq!(
            substrs,
            vec![
                (TextKind::Normal, "x"),
                (TextKind::Entity, "&amp;"),
                (TextKind::Normal, "y"),
            ]
        );
    }

    #[test]
    fn invalid_entity_stays_normal() {
        let attr = build_attribute("x&y;z&", false);
        // "&y;" is a valid named entity syntactically? No: named entities
        // need at least two characters after the ampersand.
        let substrs: Vec<_> = attr.substrings().collect();
        assert_eq!(substrs, vec![(TextKind::Normal, "x&y;z&")]);
    }

    #[test]
    fn splits_out_null_bytes() {
        let attr = build_attribute("a\0b", false);
        let kinds: Vec<_> = attr.substrings().map(|(kind, _)| kind).collect();
        assert_eq!(
            kinds,
            vec![TextKind::Normal, TextKind::NullChar, TextKind::Normal]
        );
    }
}
