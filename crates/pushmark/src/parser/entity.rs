//! Syntactic recognition of HTML entities and numeric character
//! references. Only the shape is validated; no decoding happens here and
//! no check is made against the list of known entity names.

use crate::byte_lookup::{is_alnum, is_alpha, is_digit, is_xdigit};

/// `&#xH{1,6};` after the `x`.
fn scan_hex_contents(text: &[u8], beg: usize, max_end: usize) -> Option<usize> {
    let mut off = beg;
    while off < max_end && is_xdigit(text[off]) && off - beg <= 8 {
        off += 1;
    }

    (1..=6).contains(&(off - beg)).then_some(off)
}

/// `&#D{1,7};` after the `#`.
fn scan_dec_contents(text: &[u8], beg: usize, max_end: usize) -> Option<usize> {
    let mut off = beg;
    while off < max_end && is_digit(text[off]) && off - beg <= 8 {
        off += 1;
    }

    (1..=7).contains(&(off - beg)).then_some(off)
}

/// `&[A-Za-z][A-Za-z0-9]{1,47};` after the `&`.
fn scan_named_contents(text: &[u8], beg: usize, max_end: usize) -> Option<usize> {
    let mut off = beg;
    if off < max_end && is_alpha(text[off]) {
        off += 1;
    } else {
        return None;
    }

    while off < max_end && is_alnum(text[off]) && off - beg <= 48 {
        off += 1;
    }

    (2..=48).contains(&(off - beg)).then_some(off)
}

/// If `text[beg..]` starts with a syntactically valid entity, return the
/// offset just past its closing semicolon.
pub(crate) fn scan_entity(text: &[u8], beg: usize, max_end: usize) -> Option<usize> {
    debug_assert!(text[beg] == b'&');
    let off = beg + 1;

    let contents_end = if off + 2 < max_end
        && text[off] == b'#'
        && matches!(text[off + 1], b'x' | b'X')
    {
        scan_hex_contents(text, off + 2, max_end)
    } else if off + 1 < max_end && text[off] == b'#' {
        scan_dec_contents(text, off + 1, max_end)
    } else {
        scan_named_contents(text, off, max_end)
    }?;

    (contents_end < max_end && text[contents_end] == b';').then_some(contents_end + 1)
}

#[cfg(test)]
mod test {
    use super::scan_entity;
    use test_case::test_case;

    #[test_case("&amp;", Some(5); "named")]
    #[test_case("&#35;", Some(5); "decimal")]
    #[test_case("&#xcab;", Some(7); "hex")]
    #[test_case("&#XCAB;", Some(7); "hex uppercase marker")]
    #[test_case("&#1234567;", Some(10); "decimal at limit")]
    #[test_case("&#12345678;", None; "decimal too long")]
    #[test_case("&#x1234567;", None; "hex too long")]
    #[test_case("&x;", None; "named too short")]
    #[test_case("&#;", None; "numeric without digits")]
    #[test_case("&amp", None; "missing semicolon")]
    #[test_case("&1up;", None; "named starting with digit")]
    fn recognizes(input: &str, expected: Option<usize>) {
        assert_eq!(scan_entity(input.as_bytes(), 0, input.len()), expected);
    }
}
