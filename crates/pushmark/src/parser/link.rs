//! Links, images and wiki links: label/destination/title scanners shared
//! with reference-definition collection, bracket pairing, and the deferred
//! resolution of bracket pairs into links.

use std::borrow::Cow;

use crate::block_parser::{lookup_line, LineSpan};
use crate::byte_lookup::{is_ascii_punct, is_control, is_newline, is_whitespace, decode_utf8};
use crate::event::EventSink;
use crate::ref_def::{merge_lines, RefLookup};
use crate::unicode;

use super::delimiter::{MarkFlags, Rollback, BRACKET_OPENERS, DUMMY};
use super::{LinkAttr, Parser};

pub(crate) struct LabelScan {
    pub end: usize,
    pub beg_line_index: usize,
    pub end_line_index: usize,
    pub contents_beg: usize,
    pub contents_end: usize,
}

/// Scan a link label `[...]` starting at `beg` on `lines[0]`. Labels are
/// capped at 999 characters, must contain some non-whitespace content and
/// cannot contain an unescaped `[`.
pub(crate) fn scan_link_label(
    text: &[u8],
    lines: &[LineSpan],
    beg: usize,
) -> Option<LabelScan> {
    let mut off = beg;
    let mut contents_beg = 0;
    let mut contents_end = 0;
    let mut beg_line_index = 0;
    let mut line_index = 0;
    let mut len = 0;

    if text[off] != b'[' {
        return None;
    }
    off += 1;

    loop {
        let line_end = lines[line_index].end;

        while off < line_end {
            if text[off] == b'\\'
                && off + 1 < text.len()
                && (is_ascii_punct(text[off + 1]) || is_newline(text[off + 1]))
            {
                if contents_end == 0 {
                    contents_beg = off;
                    beg_line_index = line_index;
                }
                contents_end = off + 2;
                off += 2;
            } else if text[off] == b'[' {
                return None;
            } else if text[off] == b']' {
                return if contents_beg < contents_end {
                    Some(LabelScan {
                        end: off + 1,
                        beg_line_index,
                        end_line_index: line_index,
                        contents_beg,
                        contents_end,
                    })
                } else {
                    // A label must have some non-whitespace contents.
                    None
                };
            } else {
                let (codepoint, char_size) = decode_utf8(text, off);
                if !unicode::is_unicode_whitespace(codepoint) {
                    if contents_end == 0 {
                        contents_beg = off;
                        beg_line_index = line_index;
                    }
                    contents_end = off + char_size;
                }

                off += char_size;
            }

            len += 1;
            if len > 999 {
                return None;
            }
        }

        line_index += 1;
        len += 1;
        if line_index < lines.len() {
            off = lines[line_index].beg;
        } else {
            return None;
        }
    }
}

pub(crate) struct DestScan {
    pub end: usize,
    pub contents_beg: usize,
    pub contents_end: usize,
}

/// `<...>`-wrapped destination: no newlines, no unescaped `<`.
fn scan_link_destination_angle(text: &[u8], beg: usize, max_end: usize) -> Option<DestScan> {
    let mut off = beg + 1;

    while off < max_end {
        if text[off] == b'\\' && off + 1 < max_end && is_ascii_punct(text[off + 1]) {
            off += 2;
            continue;
        }

        if is_newline(text[off]) || text[off] == b'<' {
            return None;
        }

        if text[off] == b'>' {
            return Some(DestScan {
                end: off + 1,
                contents_beg: beg + 1,
                contents_end: off,
            });
        }

        off += 1;
    }

    None
}

/// Plain destination: until whitespace or control, balancing up to 32
/// levels of unescaped parentheses.
fn scan_link_destination_plain(text: &[u8], beg: usize, max_end: usize) -> Option<DestScan> {
    let mut off = beg;
    let mut parenthesis_level = 0;

    while off < max_end {
        if text[off] == b'\\' && off + 1 < max_end && is_ascii_punct(text[off + 1]) {
            off += 2;
            continue;
        }

        if is_whitespace(text[off]) || is_control(text[off]) {
            break;
        }

        if text[off] == b'(' {
            parenthesis_level += 1;
            if parenthesis_level > 32 {
                return None;
            }
        } else if text[off] == b')' {
            if parenthesis_level == 0 {
                break;
            }
            parenthesis_level -= 1;
        }

        off += 1;
    }

    if parenthesis_level != 0 || off == beg {
        return None;
    }

    Some(DestScan {
        end: off,
        contents_beg: beg,
        contents_end: off,
    })
}

pub(crate) fn scan_link_destination(text: &[u8], beg: usize, max_end: usize) -> Option<DestScan> {
    if beg >= max_end {
        return None;
    }
    if text[beg] == b'<' {
        scan_link_destination_angle(text, beg, max_end)
    } else {
        scan_link_destination_plain(text, beg, max_end)
    }
}

pub(crate) struct TitleScan {
    pub end: usize,
    pub beg_line_index: usize,
    pub end_line_index: usize,
    pub contents_beg: usize,
    pub contents_end: usize,
}

/// Scan a link title starting after `beg` on `lines[0]`. There must be
/// some whitespace (with at most one line break) before the opening
/// quote; `"..."`, `'...'` and `(...)` are accepted.
pub(crate) fn scan_link_title(text: &[u8], lines: &[LineSpan], beg: usize) -> Option<TitleScan> {
    let mut off = beg;
    let mut line_index = 0;

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
    if off == beg {
        return None;
    }

    let beg_line_index = line_index;

    // The first char determines how the end is detected.
    let closer_char = match text[off] {
        b'"' => b'"',
        b'\'' => b'\'',
        b'(' => b')',
        _ => return None,
    };
    off += 1;

    let contents_beg = off;

    while line_index < lines.len() {
        let line_end = lines[line_index].end;

        while off < line_end {
            if text[off] == b'\\'
                && off + 1 < text.len()
                && (is_ascii_punct(text[off + 1]) || is_newline(text[off + 1]))
            {
                off += 1;
            } else if text[off] == closer_char {
                return Some(TitleScan {
                    end: off + 1,
                    beg_line_index,
                    end_line_index: line_index,
                    contents_beg,
                    contents_end: off,
                });
            } else if closer_char == b')' && text[off] == b'(' {
                // A ()-style title cannot contain an unescaped '('.
                return None;
            }

            off += 1;
        }

        line_index += 1;
    }

    None
}

impl<'text, S: EventSink> Parser<'text, '_, S> {
    /// Brackets cannot be resolved into links on sight; that needs more
    /// context (a following label, an enclosing pair). Here they are only
    /// paired up, ordered by the position of the closer, for
    /// [`Parser::resolve_links`] to walk inside-out.
    pub(super) fn analyze_bracket(&mut self, mark_index: usize) {
        if self.marks[mark_index]
            .flags
            .contains(MarkFlags::POTENTIAL_OPENER)
        {
            if let Some(&top) = self.opener_stacks[BRACKET_OPENERS].last() {
                self.marks[top].flags |= MarkFlags::HAS_NESTED_BRACKETS;
            }
            self.opener_stacks[BRACKET_OPENERS].push(mark_index);
            return;
        }

        if let Some(opener_index) = self.opener_stacks[BRACKET_OPENERS].pop() {
            // Interconnect the pair and queue it for resolution.
            self.marks[opener_index].next = Some(mark_index);
            self.marks[mark_index].prev = Some(opener_index);
            self.unresolved_links.push(opener_index);
        }
    }

    /// Look up a bracketed range `[label]` (or `![label]`) as a reference.
    fn link_label_lookup(
        &mut self,
        lines: &[LineSpan],
        beg: usize,
        end: usize,
    ) -> Option<LinkAttr<'text>> {
        let beg = beg + if self.bytes[beg] == b'!' { 2 } else { 1 };
        let end = end - 1;

        match self.ref_defs.lookup(lines, beg, end) {
            RefLookup::Found {
                dest_beg,
                dest_end,
                title,
            } => Some(LinkAttr {
                dest_beg,
                dest_end,
                title,
            }),
            RefLookup::NotFound => None,
            RefLookup::BudgetExhausted => {
                self.sink
                    .debug_log("Too many link reference definition instantiations.");
                None
            }
        }
    }

    /// Scan an inline link resource `(destination "title")` starting at
    /// the `(`. Returns the end offset together with the attributes.
    fn is_inline_link_spec(
        &self,
        lines: &[LineSpan],
        beg: usize,
    ) -> Option<(usize, usize, usize, Option<(usize, usize, usize, bool)>)> {
        let text = self.bytes;
        let (mut line_index, _) = lookup_line(beg, lines)?;
        let mut off = beg;

        debug_assert!(text[off] == b'(');
        off += 1;

        // Optional whitespace with up to one line break.
        while off < lines[line_index].end && is_whitespace(text[off]) {
            off += 1;
        }
        if off >= lines[line_index].end && (off >= text.len() || is_newline(text[off])) {
            line_index += 1;
            if line_index >= lines.len() {
                return None;
            }
            off = lines[line_index].beg;
        }

        // The destination may be omitted, but only without a title.
        if off < text.len() && text[off] == b')' {
            return Some((off + 1, off, off, None));
        }

        let dest = scan_link_destination(text, off, lines[line_index].end)?;
        off = dest.end;

        // Optional title.
        let mut title: Option<(usize, usize, usize, bool)> = None;
        if let Some(scan) = scan_link_title(text, &lines[line_index..], off) {
            let title_is_multiline = scan.beg_line_index != scan.end_line_index;
            title = Some((
                scan.contents_beg,
                scan.contents_end,
                line_index + scan.beg_line_index,
                title_is_multiline,
            ));
            line_index += scan.end_line_index;
            off = scan.end;
        }

        // Optional whitespace followed by the final ')'.
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
        if text[off] != b')' {
            return None;
        }
        off += 1;

        Some((off, dest.contents_beg, dest.contents_end, title))
    }

    fn build_inline_link_attr(
        &self,
        lines: &[LineSpan],
        dest_beg: usize,
        dest_end: usize,
        title: Option<(usize, usize, usize, bool)>,
    ) -> LinkAttr<'text> {
        let title_cow: Cow<'text, str> = match title {
            None => Cow::Borrowed(""),
            Some((beg, end, _, _)) if beg >= end => Cow::Borrowed(""),
            Some((beg, end, beg_line_index, true)) => Cow::Owned(merge_lines(
                self.text,
                beg,
                end,
                &lines[beg_line_index..],
                '\n',
            )),
            Some((beg, end, _, false)) => Cow::Borrowed(&self.text[beg..end]),
        };

        LinkAttr {
            dest_beg,
            dest_end,
            title: title_cow,
        }
    }

    /// Walk the queued bracket pairs inside-out and decide what each of
    /// them is: a wiki link, a full/collapsed/shortcut reference, an
    /// inline link, or nothing.
    pub(super) fn resolve_links(&mut self, lines: &[LineSpan]) {
        let mut last_link_beg = 0;
        let mut last_link_end = 0;
        let mut last_img_beg = 0;
        let mut last_img_end = 0;

        let queue = std::mem::take(&mut self.unresolved_links);
        let mut i = 0;

        while i < queue.len() {
            let opener_index = queue[i];
            let closer_index = self.marks[opener_index].next.unwrap();
            let opener_beg = self.marks[opener_index].beg;
            let opener_end = self.marks[opener_index].end;
            let opener_ch = self.marks[opener_index].ch;
            let closer_beg = self.marks[closer_index].beg;
            let mut closer_end = self.marks[closer_index].end;

            let next_opener_index = queue.get(i + 1).copied();
            let next_closer_index = next_opener_index.map(|n| self.marks[n].next.unwrap());

            // For nested brackets, the outer cannot end inside a resource
            // belonging to the inner, and the outer cannot be a link if
            // the inner already is one (images are fine).
            if (opener_beg < last_link_beg && closer_end < last_link_end)
                || (opener_beg < last_img_beg && closer_end < last_img_end)
                || (opener_beg < last_link_end && opener_ch == b'[')
            {
                i += 1;
                continue;
            }

            // Wiki links: `[[destination]]` or `[[destination|label]]`.
            if self.options.contains(crate::options::ParserOptions::WIKILINKS)
                && opener_end - opener_beg == 1
                && next_opener_index.is_some_and(|n| {
                    let next_opener = &self.marks[n];
                    next_opener.ch == b'['
                        && next_opener.beg + 1 == opener_beg
                        && next_opener.len() == 1
                })
                && next_closer_index.is_some_and(|n| {
                    let next_closer = &self.marks[n];
                    next_closer.ch == b']'
                        && next_closer.beg == closer_beg + 1
                        && next_closer.len() == 1
                })
            {
                if self.resolve_wiki_link(
                    lines,
                    opener_index,
                    closer_index,
                    next_opener_index.unwrap(),
                    next_closer_index.unwrap(),
                ) {
                    last_link_beg = self.marks[opener_index].beg;
                    last_link_end = self.marks[closer_index].end;
                    i += 2;
                    continue;
                }
            }

            let mut is_link = false;
            let mut attr: Option<LinkAttr<'text>> = None;
            let mut consumed_next = false;

            let adjacent_label = next_opener_index
                .is_some_and(|next_opener| self.marks[next_opener].beg == closer_end);

            if adjacent_label {
                let next_opener = next_opener_index.unwrap();
                let next_closer = next_closer_index.unwrap();

                if self.marks[next_closer].beg > closer_end + 1 {
                    // Might be a full reference link.
                    if !self.marks[next_opener]
                        .flags
                        .contains(MarkFlags::HAS_NESTED_BRACKETS)
                    {
                        attr = self.link_label_lookup(
                            lines,
                            self.marks[next_opener].beg,
                            self.marks[next_closer].end,
                        );
                    }
                } else {
                    // Might be a collapsed reference link.
                    if !self.marks[opener_index]
                        .flags
                        .contains(MarkFlags::HAS_NESTED_BRACKETS)
                    {
                        attr = self.link_label_lookup(lines, opener_beg, closer_end);
                    }
                }

                if attr.is_some() {
                    is_link = true;
                    // Eat the second "[...]".
                    closer_end = self.marks[next_closer].end;
                    self.marks[closer_index].end = closer_end;
                    consumed_next = true;
                }
            } else {
                if closer_end < self.bytes.len() && self.bytes[closer_end] == b'(' {
                    // Might be an inline link.
                    if let Some((inline_link_end, dest_beg, dest_end, title)) =
                        self.is_inline_link_spec(lines, closer_end)
                    {
                        // The closing ')' must not be inside a range that
                        // resolved with a higher priority (e.g. a code span).
                        let mut ok = true;
                        let mut j = closer_index + 1;
                        while j < self.marks.len() {
                            let mark = &self.marks[j];
                            if mark.beg >= inline_link_end {
                                break;
                            }
                            if mark.is_resolved_opener() {
                                let mark_next = mark.next.unwrap();
                                if self.marks[mark_next].beg >= inline_link_end {
                                    ok = false;
                                    break;
                                }
                                j = mark_next + 1;
                            } else {
                                j += 1;
                            }
                        }

                        if ok {
                            is_link = true;
                            attr =
                                Some(self.build_inline_link_attr(lines, dest_beg, dest_end, title));
                            // Eat the "(...)".
                            closer_end = inline_link_end;
                            self.marks[closer_index].end = closer_end;
                        }
                    }
                }

                if !is_link {
                    // Might be a shortcut reference link.
                    if !self.marks[opener_index]
                        .flags
                        .contains(MarkFlags::HAS_NESTED_BRACKETS)
                    {
                        attr = self.link_label_lookup(lines, opener_beg, closer_end);
                        is_link = attr.is_some();
                    }
                }
            }

            if is_link {
                self.marks[opener_index].flags |= MarkFlags::OPENER | MarkFlags::RESOLVED;
                self.marks[closer_index].flags |= MarkFlags::CLOSER | MarkFlags::RESOLVED;

                self.resolved_links.push(attr.unwrap());
                self.marks[opener_index].link_attr = Some(self.resolved_links.len() - 1);

                if opener_ch == b'[' {
                    last_link_beg = opener_beg;
                    last_link_end = closer_end;
                } else {
                    last_img_beg = opener_beg;
                    last_img_end = closer_end;
                }

                self.analyze_link_contents(lines, opener_index + 1, closer_index);
                self.suppress_fully_nested_autolink(opener_index, closer_index);
            }

            i += if consumed_next { 2 } else { 1 };
        }
    }

    /// `[[target]]` / `[[target|label]]`. The destination is capped at 100
    /// characters and cannot contain a newline.
    fn resolve_wiki_link(
        &mut self,
        lines: &[LineSpan],
        opener_index: usize,
        closer_index: usize,
        next_opener_index: usize,
        next_closer_index: usize,
    ) -> bool {
        let opener_end = self.marks[opener_index].end;
        let closer_beg = self.marks[closer_index].beg;

        // Scan for a '|' delimiter, skipping resolved inner spans. Without
        // one, the whole destination has to stay within 100 characters.
        let mut delim: Option<usize> = None;
        let mut delim_index = opener_index + 1;
        while delim_index < closer_index {
            let m = &self.marks[delim_index];
            if m.ch == b'|' {
                delim = Some(delim_index);
                break;
            }
            if m.ch != DUMMY {
                if m.beg - opener_end > 100 {
                    break;
                }
                if m.flags.contains(MarkFlags::OPENER) {
                    if let Some(next) = m.next {
                        delim_index = next;
                    }
                }
            }
            delim_index += 1;
        }

        let dest_beg = opener_end;
        let dest_end = match delim {
            Some(d) => self.marks[d].beg,
            None => closer_beg,
        };
        if dest_end == dest_beg || dest_end - dest_beg > 100 {
            return false;
        }

        // No newline may appear in the destination.
        if self.bytes[dest_beg..dest_end].iter().any(|b| is_newline(*b)) {
            return false;
        }

        if let Some(d) = delim {
            if self.marks[d].end < closer_beg {
                self.rollback(opener_index, d, Rollback::All);
                self.rollback(d, closer_index, Rollback::Crossing);
                self.marks[d].flags |= MarkFlags::RESOLVED;
                self.marks[opener_index].end = self.marks[d].beg;
            } else {
                // The pipe sits just before the closer: [[foo|]].
                self.rollback(opener_index, closer_index, Rollback::All);
                self.marks[closer_index].beg = self.marks[d].beg;
                delim = None;
            }
        }

        self.marks[opener_index].beg = self.marks[next_opener_index].beg;
        self.marks[opener_index].next = Some(closer_index);
        self.marks[opener_index].flags |= MarkFlags::OPENER | MarkFlags::RESOLVED;

        self.marks[closer_index].end = self.marks[next_closer_index].end;
        self.marks[closer_index].prev = Some(opener_index);
        self.marks[closer_index].flags |= MarkFlags::CLOSER | MarkFlags::RESOLVED;

        if let Some(d) = delim {
            self.analyze_link_contents(lines, d + 1, closer_index);
        }

        true
    }

    /// If the link text is formed by nothing but a permissive autolink,
    /// suppress the autolink so it does not render as a link nested in a
    /// link.
    fn suppress_fully_nested_autolink(&mut self, opener_index: usize, closer_index: usize) {
        if !self.options.permissive_autolinks() {
            return;
        }

        let mut first_nested = opener_index + 1;
        while first_nested < closer_index && self.marks[first_nested].ch == DUMMY {
            first_nested += 1;
        }
        let last_nested = closer_index - 1;
        if first_nested >= last_nested {
            return;
        }

        let opener_end = self.marks[opener_index].end;
        let closer_beg = self.marks[closer_index].beg;
        let first = &self.marks[first_nested];
        if first.is_resolved()
            && first.beg == opener_end
            && matches!(first.ch, b'@' | b':' | b'.')
            && first.next == Some(last_nested)
            && self.marks[last_nested].end == closer_beg
        {
            self.marks[first_nested].ch = DUMMY;
            self.marks[first_nested].flags.remove(MarkFlags::RESOLVED);
            self.marks[last_nested].ch = DUMMY;
            self.marks[last_nested].flags.remove(MarkFlags::RESOLVED);
        }
    }
}
