//! Autolink recognition: the explicit `<uri>` / `<email>` forms, and the
//! permissive bare forms (`http://...`, `user@host`, `www.host`) enabled
//! by the corresponding options.

use crate::byte_lookup::{is_alnum, is_control, is_whitespace};
use crate::event::EventSink;

use super::delimiter::MarkFlags;
use super::{is_unicode_whitespace_at, is_unicode_whitespace_before, Parser};

/// `<scheme:...>` where scheme is 1+31 characters of `[A-Za-z0-9+.-]`
/// starting with a letter, and the rest is anything but whitespace,
/// control characters and `<`.
pub(crate) fn is_autolink_uri(text: &[u8], beg: usize, max_end: usize) -> Option<usize> {
    debug_assert!(text[beg] == b'<');
    let mut off = beg + 1;

    // Scheme.
    if off >= max_end || !text[off].is_ascii_alphabetic() {
        return None;
    }
    off += 1;
    loop {
        if off >= max_end || off - beg > 32 {
            return None;
        }
        if text[off] == b':' && off - beg >= 3 {
            break;
        }
        if !is_alnum(text[off]) && !matches!(text[off], b'+' | b'-' | b'.') {
            return None;
        }
        off += 1;
    }

    // The path after the scheme.
    while off < max_end && text[off] != b'>' {
        if is_whitespace(text[off]) || is_control(text[off]) || text[off] == b'<' {
            return None;
        }
        off += 1;
    }

    (off < max_end).then_some(off + 1)
}

/// `<local@host>` following the HTML5 e-mail shape: RFC-style local part,
/// then DNS labels of 1-63 characters not starting or ending with `-`.
pub(crate) fn is_autolink_email(text: &[u8], beg: usize, max_end: usize) -> Option<usize> {
    debug_assert!(text[beg] == b'<');
    let mut off = beg + 1;

    // The local part before '@'.
    while off < max_end
        && (is_alnum(text[off])
            || matches!(
                text[off],
                b'.' | b'!' | b'#' | b'$' | b'%' | b'&' | b'\'' | b'*' | b'+' | b'/' | b'='
                    | b'?' | b'^' | b'_' | b'`' | b'{' | b'|' | b'}' | b'~' | b'-'
            ))
    {
        off += 1;
    }
    if off <= beg + 1 {
        return None;
    }

    if off >= max_end || text[off] != b'@' {
        return None;
    }
    off += 1;

    // Labels delimited with '.'.
    let mut label_len = 0;
    while off < max_end {
        if is_alnum(text[off]) {
            label_len += 1;
        } else if text[off] == b'-' && label_len > 0 {
            label_len += 1;
        } else if text[off] == b'.' && label_len > 0 && text[off - 1] != b'-' {
            label_len = 0;
        } else {
            break;
        }

        if label_len > 63 {
            return None;
        }

        off += 1;
    }

    if label_len == 0 || off >= max_end || text[off] != b'>' || text[off - 1] == b'-' {
        return None;
    }

    Some(off + 1)
}

/// Recognize either autolink form. The second value is true when the
/// rendered destination needs a `mailto:` prefix.
pub(crate) fn is_autolink(text: &[u8], beg: usize, max_end: usize) -> Option<(usize, bool)> {
    if let Some(end) = is_autolink_uri(text, beg, max_end) {
        return Some((end, false));
    }

    is_autolink_email(text, beg, max_end).map(|end| (end, true))
}

/// Grammar of one URL component for permissive autolinks.
struct UrlComponent {
    start_char: u8,
    delim_char: u8,
    allowed_nonalnum_chars: &'static [u8],
    min_components: u32,
    optional_end_char: u8,
}

static URL_MAP: [UrlComponent; 4] = [
    // Host, mandatory.
    UrlComponent {
        start_char: 0,
        delim_char: b'.',
        allowed_nonalnum_chars: b".-_",
        min_components: 2,
        optional_end_char: 0,
    },
    // Path.
    UrlComponent {
        start_char: b'/',
        delim_char: b'/',
        allowed_nonalnum_chars: b"/.-_",
        min_components: 0,
        optional_end_char: b'/',
    },
    // Query.
    UrlComponent {
        start_char: b'?',
        delim_char: b'&',
        allowed_nonalnum_chars: b"&.-+_=()",
        min_components: 1,
        optional_end_char: 0,
    },
    // Fragment.
    UrlComponent {
        start_char: b'#',
        delim_char: 0,
        allowed_nonalnum_chars: b".-+_",
        min_components: 1,
        optional_end_char: 0,
    },
];

impl<'text, S: EventSink> Parser<'text, '_, S> {
    /// Try to expand the mark at `mark_index` into a permissive autolink.
    /// These are processed last and greedily: the final range may grow in
    /// both directions from the collected mark, so every step verifies it
    /// does not cross an already-resolved span.
    pub(super) fn analyze_permissive_autolink(&mut self, mark_index: usize) {
        let opener_ch = self.marks[mark_index].ch;
        let opener_beg = self.marks[mark_index].beg;
        let opener_end = self.marks[mark_index].end;
        // The dummy after the opener carries the line bounds and reserves
        // room for the closer.
        let line_beg = self.marks[mark_index + 1].beg;
        let line_end = self.marks[mark_index + 1].end;

        let text = self.bytes;
        let mut beg = opener_beg;
        let mut end = opener_end;
        let mut left_cursor = mark_index;
        let mut right_cursor = mark_index;

        if opener_ch == b'@' {
            // Scan backwards for the user name.
            while beg > line_beg {
                if is_alnum(text[beg - 1]) {
                    beg -= 1;
                } else if beg >= line_beg + 2
                    && is_alnum(text[beg - 2])
                    && matches!(text[beg - 1], b'.' | b'-' | b'_' | b'+')
                    && is_alnum(text[beg])
                    && self
                        .scan_left_for_resolved_mark(left_cursor, beg - 1, &mut left_cursor)
                        .is_none()
                {
                    beg -= 1;
                } else {
                    break;
                }
            }
            if beg == opener_beg {
                // Empty user name.
                return;
            }
        }

        // There must be a line boundary, whitespace, allowed punctuation
        // or a resolved emphasis opener just before the suspected link.
        let left_boundary_ok = if beg == line_beg
            || is_unicode_whitespace_before(text, beg)
            || matches!(text[beg - 1], b'(' | b'{' | b'[')
        {
            true
        } else if matches!(text[beg - 1], b'*' | b'_' | b'~') {
            self.scan_left_for_resolved_mark(left_cursor, beg - 1, &mut left_cursor)
                .is_some_and(|m| self.marks[m].flags.contains(MarkFlags::OPENER))
        } else {
            false
        };
        if !left_boundary_ok {
            return;
        }

        for component in URL_MAP.iter() {
            let mut n_components: u32 = 0;
            let mut n_open_brackets: i32 = 0;

            if component.start_char != 0 {
                if end >= line_end || text[end] != component.start_char {
                    continue;
                }
                if component.min_components > 0
                    && (end + 1 >= line_end || !is_alnum(text[end + 1]))
                {
                    continue;
                }
                end += 1;
            }

            while end < line_end {
                if is_alnum(text[end]) {
                    if n_components == 0 {
                        n_components = 1;
                    }
                    end += 1;
                } else if component.allowed_nonalnum_chars.contains(&text[end])
                    && ((end > line_beg && (is_alnum(text[end - 1]) || text[end - 1] == b')'))
                        || text[end] == b'(')
                    && ((end + 1 < line_end
                        && (is_alnum(text[end + 1]) || text[end + 1] == b'('))
                        || text[end] == b')')
                    && self
                        .scan_right_for_resolved_mark(right_cursor, end, &mut right_cursor)
                        .is_none()
                {
                    if text[end] == component.delim_char {
                        n_components += 1;
                    }

                    // Brackets have to be balanced.
                    if text[end] == b'(' {
                        n_open_brackets += 1;
                    } else if text[end] == b')' {
                        if n_open_brackets <= 0 {
                            break;
                        }
                        n_open_brackets -= 1;
                    }

                    end += 1;
                } else {
                    break;
                }
            }

            if end < line_end
                && component.optional_end_char != 0
                && text[end] == component.optional_end_char
            {
                end += 1;
            }

            if n_components < component.min_components || n_open_brackets != 0 {
                return;
            }

            // An e-mail autolink wants only the host.
            if opener_ch == b'@' {
                break;
            }
        }

        // Same boundary requirements on the right side, with a resolved
        // emphasis closer allowed.
        let right_boundary_ok = if end == line_end
            || is_unicode_whitespace_at(text, end)
            || matches!(
                text[end],
                b')' | b'}' | b']' | b'.' | b'!' | b'?' | b',' | b';'
            ) {
            true
        } else {
            self.scan_right_for_resolved_mark(right_cursor, end, &mut right_cursor)
                .is_some_and(|m| self.marks[m].flags.contains(MarkFlags::CLOSER))
        };
        if !right_boundary_ok {
            return;
        }

        // Success. The opener collapses to the left edge and the dummy
        // becomes the closer at the right edge; the text between them is
        // both the link text and (with an implied scheme) the destination.
        self.marks[mark_index].beg = beg;
        self.marks[mark_index].end = beg;
        let closer = &mut self.marks[mark_index + 1];
        closer.beg = end;
        closer.end = end;
        closer.ch = opener_ch;
        self.resolve_range(mark_index, mark_index + 1);
    }
}

#[cfg(test)]
mod test {
    use super::*;
    use test_case::test_case;

    #[test_case("<http://x.y>", Some((12, false)); "uri")]
    #[test_case("<made-up.scheme:?>", Some((18, false)); "weird scheme")]
    #[test_case("<a@b.c>", Some((7, true)); "email")]
    #[test_case("<http://x y>", None; "space breaks uri")]
    #[test_case("<a@-b.c>", None; "label cannot start with dash")]
    #[test_case("<ab>", None; "no scheme nor at")]
    fn recognizes(input: &str, expected: Option<(usize, bool)>) {
        assert_eq!(is_autolink(input.as_bytes(), 0, input.len()), expected);
    }
}
