//! The inline mark collector and the precedence-ordered analysis passes.
//!
//! Inlines are processed in phases: a single scan collects candidate
//! marks with rough opener/closer classification, then the marks are
//! analyzed per kind in precedence order (code spans and raw HTML resolve
//! already during collection, then links, then entities, then emphasis /
//! strikethrough / math, and finally permissive autolinks). The render
//! pass in [`crate::render`] walks the resolved marks afterwards.

use crate::block_parser::{lookup_line, LineSpan};
use crate::byte_lookup::{is_alnum, is_ascii_punct, is_newline, is_whitespace};
use crate::event::EventSink;
use crate::options::ParserOptions;

use super::autolink::is_autolink;
use super::code_span::{is_code_span, CodeSpanScanState};
use super::delimiter::{Mark, MarkFlags, DUMMY, SENTINEL};
use super::raw_html::is_html_any;
use super::{is_unicode_punct_at, is_unicode_punct_before, is_unicode_whitespace_at,
    is_unicode_whitespace_before, Parser};

/// Build the map of bytes which can open a mark, given the enabled
/// extensions. Consulted for every input byte of every inline block.
pub(crate) fn build_mark_char_map(options: ParserOptions) -> [bool; 256] {
    let mut map = [false; 256];

    for byte in [
        b'\\', b'*', b'_', b'`', b'&', b';', b'<', b'>', b'[', b'!', b']', b'\0',
    ] {
        map[byte as usize] = true;
    }

    if options.contains(ParserOptions::STRIKETHROUGH) {
        map[b'~' as usize] = true;
    }
    if options.contains(ParserOptions::LATEX_MATH_SPANS) {
        map[b'$' as usize] = true;
    }
    if options.contains(ParserOptions::PERMISSIVE_EMAIL_AUTOLINKS) {
        map[b'@' as usize] = true;
    }
    if options.contains(ParserOptions::PERMISSIVE_URL_AUTOLINKS) {
        map[b':' as usize] = true;
    }
    if options.contains(ParserOptions::PERMISSIVE_WWW_AUTOLINKS) {
        map[b'.' as usize] = true;
    }
    if options.intersects(ParserOptions::TABLES | ParserOptions::WIKILINKS) {
        map[b'|' as usize] = true;
    }
    if options.contains(ParserOptions::COLLAPSE_WHITESPACE) {
        for byte in 0..=255u8 {
            if is_whitespace(byte) {
                map[byte as usize] = true;
            }
        }
    }

    map
}

/// Schemes recognized for permissive URL autolinks, with the suffix that
/// must follow the colon.
static PERMISSIVE_SCHEMES: [(&[u8], &[u8]); 3] =
    [(b"http", b"//"), (b"https", b"//"), (b"ftp", b"//")];

impl<'text, S: EventSink> Parser<'text, '_, S> {
    /// Analyze the inline contents of a block: collect marks, then run
    /// the precedence passes. With `table_mode` only links and table cell
    /// boundaries are analyzed; the caller re-analyzes each cell.
    pub(crate) fn analyze_inlines(&mut self, lines: &[LineSpan], table_mode: bool) {
        // Reset the per-block state. The buffers are retained across
        // blocks to keep reallocations low.
        self.marks.clear();
        self.resolved_links.clear();
        for stack in self.opener_stacks.iter_mut() {
            stack.clear();
        }

        self.collect_marks(lines, table_mode);

        // (1) Links.
        self.analyze_marks(lines, 0, self.marks.len(), b"[]!", false);
        self.resolve_links(lines);
        self.opener_stacks[super::delimiter::BRACKET_OPENERS].clear();

        if table_mode {
            // (2) Table cell boundaries.
            debug_assert!(lines.len() == 1);
            self.table_cell_boundaries.clear();
            self.analyze_marks(lines, 0, self.marks.len(), b"|", false);
            return;
        }

        // (3) Entities, emphasis and friends, permissive autolinks.
        self.analyze_link_contents(lines, 0, self.marks.len());
    }

    /// The passes applied both to whole blocks and to the interior of a
    /// freshly resolved link.
    pub(super) fn analyze_link_contents(
        &mut self,
        lines: &[LineSpan],
        mark_beg: usize,
        mark_end: usize,
    ) {
        self.analyze_marks(lines, mark_beg, mark_end, b"&", false);
        self.analyze_marks(lines, mark_beg, mark_end, b"*_~$", false);

        if self.options.permissive_autolinks() {
            // These must run last: they are greedy and can expand from
            // their original mark, carefully not crossing anything that
            // resolved earlier.
            self.analyze_marks(lines, mark_beg, mark_end, b"@:.", true);
        }

        for stack in self.opener_stacks.iter_mut() {
            stack.clear();
        }
    }

    /// Walk marks in `mark_beg..mark_end`, dispatching the ones in
    /// `mark_chars` to their analyzers and skipping already-resolved
    /// spans. With `noskip_emph` resolved emphasis spans are entered
    /// instead of skipped, so that permissive autolinks inside them are
    /// still analyzed.
    fn analyze_marks(
        &mut self,
        lines: &[LineSpan],
        mark_beg: usize,
        mark_end: usize,
        mark_chars: &[u8],
        noskip_emph: bool,
    ) {
        let mut i = mark_beg;
        let mut last_end = lines[0].beg;

        while i < mark_end {
            let mark = &self.marks[i];

            // Skip resolved spans.
            if mark.is_resolved() {
                if mark.flags.contains(MarkFlags::OPENER)
                    && !(noskip_emph && matches!(mark.ch, b'*' | b'_' | b'~'))
                {
                    let next = mark.next.unwrap();
                    debug_assert!(i < next);
                    i = next + 1;
                } else {
                    i += 1;
                }
                continue;
            }

            // Skip marks this pass does not deal with.
            if !mark_chars.contains(&mark.ch) {
                i += 1;
                continue;
            }

            // The resolving in a previous step could have expanded a mark.
            if mark.beg < last_end {
                i += 1;
                continue;
            }

            match mark.ch {
                b'[' | b'!' | b']' => self.analyze_bracket(i),
                b'&' => self.analyze_entity(i),
                b'|' => self.analyze_table_cell_boundary(i),
                b'_' | b'*' => self.analyze_emph(i),
                b'~' => self.analyze_tilde(i),
                b'$' => self.analyze_dollar(i),
                b'.' | b':' | b'@' => self.analyze_permissive_autolink(i),
                _ => {}
            }

            let mark = &self.marks[i];
            if mark.is_resolved() {
                last_end = if mark.flags.contains(MarkFlags::OPENER) {
                    self.marks[mark.next.unwrap()].end
                } else {
                    mark.end
                };
            }

            i += 1;
        }
    }

    /// A `&` only starts an entity when the very next mark is its `;`;
    /// anything between would be a character that cannot be part of one.
    fn analyze_entity(&mut self, mark_index: usize) {
        if mark_index + 1 >= self.marks.len() {
            return;
        }
        if self.marks[mark_index + 1].ch != b';' {
            return;
        }

        let beg = self.marks[mark_index].beg;
        let max_end = self.marks[mark_index + 1].end;
        if let Some(end) = super::entity::scan_entity(self.bytes, beg, max_end) {
            debug_assert!(end == max_end);
            self.resolve_range(mark_index, mark_index + 1);
            self.marks[mark_index].end = end;
        }
    }

    fn analyze_table_cell_boundary(&mut self, mark_index: usize) {
        self.marks[mark_index].flags |= MarkFlags::RESOLVED;
        self.table_cell_boundaries.push(mark_index);
    }

    /// Scan the block's bytes and append candidate marks for everything
    /// that may carry inline meaning.
    fn collect_marks(&mut self, lines: &[LineSpan], table_mode: bool) {
        let text = self.bytes;
        let mut codespan_state = CodeSpanScanState::new();
        let mut line_index = 0;

        while line_index < lines.len() {
            let mut line = lines[line_index];
            let mut off = line.beg;

            loop {
                // Skip insignificant bytes, with a little loop unrolling.
                while off + 3 < line.end
                    && !self.mark_char_map[text[off] as usize]
                    && !self.mark_char_map[text[off + 1] as usize]
                    && !self.mark_char_map[text[off + 2] as usize]
                    && !self.mark_char_map[text[off + 3] as usize]
                {
                    off += 4;
                }
                while off < line.end && !self.mark_char_map[text[off] as usize] {
                    off += 1;
                }

                if off >= line.end {
                    break;
                }

                let ch = text[off];

                // A backslash escape. It can go beyond line.end, as an
                // escaped newline forms a hard break.
                if ch == b'\\'
                    && off + 1 < text.len()
                    && (is_ascii_punct(text[off + 1]) || is_newline(text[off + 1]))
                {
                    // A hard break cannot be on the last line of a block.
                    if !is_newline(text[off + 1]) || line_index + 1 < lines.len() {
                        self.marks
                            .push(Mark::new(ch, off, off + 2, MarkFlags::RESOLVED));
                    }
                    off += 2;
                    continue;
                }

                // A potential (strong) emphasis start/end.
                if ch == b'*' || ch == b'_' {
                    let mut tmp = off + 1;
                    while tmp < line.end && text[tmp] == ch {
                        tmp += 1;
                    }

                    // What precedes and follows the run:
                    // 0 = whitespace, 1 = punctuation, 2 = other.
                    let mut left_level = if off == line.beg || is_unicode_whitespace_before(text, off)
                    {
                        0
                    } else if is_unicode_punct_before(text, off) {
                        1
                    } else {
                        2
                    };
                    let mut right_level = if tmp == line.end || is_unicode_whitespace_at(text, tmp)
                    {
                        0
                    } else if is_unicode_punct_at(text, tmp) {
                        1
                    } else {
                        2
                    };

                    // An intra-word underscore has no special meaning.
                    if ch == b'_' && left_level == 2 && right_level == 2 {
                        left_level = 0;
                        right_level = 0;
                    }

                    if left_level != 0 || right_level != 0 {
                        let mut flags = MarkFlags::empty();
                        if left_level > 0 && left_level >= right_level {
                            flags |= MarkFlags::POTENTIAL_CLOSER;
                        }
                        if right_level > 0 && right_level >= left_level {
                            flags |= MarkFlags::POTENTIAL_OPENER;
                        }
                        if flags
                            .contains(MarkFlags::POTENTIAL_OPENER | MarkFlags::POTENTIAL_CLOSER)
                        {
                            flags |= MarkFlags::EMPH_OC;
                        }

                        // The rule of three needs the original run length
                        // (mod 3) even after the mark is later split by a
                        // shorter closer.
                        flags |= match (tmp - off) % 3 {
                            0 => MarkFlags::EMPH_MOD3_0,
                            1 => MarkFlags::EMPH_MOD3_1,
                            _ => MarkFlags::EMPH_MOD3_2,
                        };

                        self.marks.push(Mark::new(ch, off, tmp, flags));

                        // During resolving, a run may need to split into
                        // independent span boundaries (consider
                        // "**foo* bar*"), so reserve dummies for that.
                        off += 1;
                        while off < tmp {
                            self.marks.push(Mark::dummy(off));
                            off += 1;
                        }
                        continue;
                    }

                    off = tmp;
                    continue;
                }

                // A potential code span start/end.
                if ch == b'`' {
                    let mut opener = Mark::new(b'`', off, off, MarkFlags::empty());
                    let mut closer = Mark::new(b'`', off, off, MarkFlags::empty());

                    if is_code_span(
                        text,
                        &lines[line_index..],
                        off,
                        &mut opener,
                        &mut closer,
                        &mut codespan_state,
                    ) {
                        off = closer.end;
                        self.marks.push(opener);
                        self.marks.push(closer);
                        let n = self.marks.len();
                        self.resolve_range(n - 2, n - 1);

                        // Advance the current line accordingly.
                        if off > line.end {
                            let (new_index, new_line) =
                                lookup_line(off, lines).expect("code span ends past the block");
                            line_index = new_index;
                            line = *new_line;
                        }
                        continue;
                    }

                    off = opener.end;
                    continue;
                }

                // A potential entity start.
                if ch == b'&' {
                    self.marks
                        .push(Mark::new(ch, off, off + 1, MarkFlags::POTENTIAL_OPENER));
                    off += 1;
                    continue;
                }

                // A potential entity end; there surely is no entity unless
                // the preceding mark is the '&'.
                if ch == b';' {
                    if self.marks.last().is_some_and(|m| m.ch == b'&') {
                        self.marks
                            .push(Mark::new(ch, off, off + 1, MarkFlags::POTENTIAL_CLOSER));
                    }
                    off += 1;
                    continue;
                }

                // A potential autolink or raw HTML start.
                if ch == b'<' {
                    if !self.options.contains(ParserOptions::NO_HTML_SPANS) {
                        // Raw HTML has to be recognized here: doing it
                        // later mark-by-mark would go quadratic.
                        let html_end = is_html_any(
                            text,
                            &lines[line_index..],
                            off,
                            lines[lines.len() - 1].end,
                            &mut self.html_horizons,
                        );
                        if let Some(html_end) = html_end {
                            self.marks.push(Mark::new(
                                b'<',
                                off,
                                off,
                                MarkFlags::OPENER | MarkFlags::RESOLVED,
                            ));
                            self.marks.push(Mark::new(
                                b'>',
                                html_end,
                                html_end,
                                MarkFlags::CLOSER | MarkFlags::RESOLVED,
                            ));
                            let n = self.marks.len();
                            self.marks[n - 2].next = Some(n - 1);
                            self.marks[n - 1].prev = Some(n - 2);
                            off = html_end;

                            if off > line.end {
                                let (new_index, new_line) =
                                    lookup_line(off, lines).expect("raw HTML ends past the block");
                                line_index = new_index;
                                line = *new_line;
                            }
                            continue;
                        }
                    }

                    if let Some((autolink_end, missing_mailto)) =
                        is_autolink(text, off, lines[lines.len() - 1].end)
                    {
                        let mut flags = MarkFlags::RESOLVED | MarkFlags::AUTOLINK;
                        if missing_mailto {
                            flags |= MarkFlags::AUTOLINK_MISSING_MAILTO;
                        }

                        self.marks
                            .push(Mark::new(b'<', off, off + 1, MarkFlags::OPENER | flags));
                        self.marks.push(Mark::new(
                            b'>',
                            autolink_end - 1,
                            autolink_end,
                            MarkFlags::CLOSER | flags,
                        ));
                        let n = self.marks.len();
                        self.marks[n - 2].next = Some(n - 1);
                        self.marks[n - 1].prev = Some(n - 2);
                        off = autolink_end;
                        continue;
                    }

                    off += 1;
                    continue;
                }

                // A potential link or its part.
                if ch == b'[' || (ch == b'!' && off + 1 < line.end && text[off + 1] == b'[') {
                    let tmp = if ch == b'[' { off + 1 } else { off + 2 };
                    self.marks
                        .push(Mark::new(ch, off, tmp, MarkFlags::POTENTIAL_OPENER));
                    off = tmp;
                    // Two dummies to reserve room for the data needed if
                    // this becomes a link.
                    self.marks.push(Mark::dummy(off));
                    self.marks.push(Mark::dummy(off));
                    continue;
                }
                if ch == b']' {
                    self.marks
                        .push(Mark::new(ch, off, off + 1, MarkFlags::POTENTIAL_CLOSER));
                    off += 1;
                    continue;
                }

                // A potential permissive e-mail autolink.
                if ch == b'@' {
                    if line.beg + 1 <= off
                        && is_alnum(text[off - 1])
                        && off + 3 < line.end
                        && is_alnum(text[off + 1])
                    {
                        self.marks
                            .push(Mark::new(ch, off, off + 1, MarkFlags::POTENTIAL_OPENER));
                        // A dummy as a reserve for a closer, carrying the
                        // line bounds.
                        self.marks
                            .push(Mark::new(DUMMY, line.beg, line.end, MarkFlags::empty()));
                    }

                    off += 1;
                    continue;
                }

                // A potential permissive URL autolink.
                if ch == b':' {
                    for (scheme, suffix) in PERMISSIVE_SCHEMES.iter() {
                        if line.beg + scheme.len() <= off
                            && &text[off - scheme.len()..off] == *scheme
                            && off + 1 + suffix.len() < line.end
                            && &text[off + 1..off + 1 + suffix.len()] == *suffix
                        {
                            self.marks.push(Mark::new(
                                ch,
                                off - scheme.len(),
                                off + 1 + suffix.len(),
                                MarkFlags::POTENTIAL_OPENER,
                            ));
                            self.marks.push(Mark::new(
                                DUMMY,
                                line.beg,
                                line.end,
                                MarkFlags::empty(),
                            ));
                            off += 1 + suffix.len();
                            break;
                        }
                    }

                    off += 1;
                    continue;
                }

                // A potential permissive WWW autolink.
                if ch == b'.' {
                    if line.beg + 3 <= off
                        && &text[off - 3..off] == b"www"
                        && (off - 3 == line.beg
                            || is_unicode_whitespace_before(text, off - 3)
                            || is_unicode_punct_before(text, off - 3))
                    {
                        self.marks
                            .push(Mark::new(ch, off - 3, off + 1, MarkFlags::POTENTIAL_OPENER));
                        self.marks.push(Mark::new(
                            DUMMY,
                            line.beg,
                            line.end,
                            MarkFlags::empty(),
                        ));
                    }

                    off += 1;
                    continue;
                }

                // A potential table cell boundary or wiki link delimiter.
                if (table_mode || self.options.contains(ParserOptions::WIKILINKS)) && ch == b'|' {
                    self.marks
                        .push(Mark::new(ch, off, off + 1, MarkFlags::empty()));
                    off += 1;
                    continue;
                }

                // A potential strikethrough or math span start/end.
                if ch == b'$' || ch == b'~' {
                    let mut tmp = off + 1;
                    while tmp < line.end && text[tmp] == ch {
                        tmp += 1;
                    }

                    if tmp - off <= 2 {
                        let mut flags =
                            MarkFlags::POTENTIAL_OPENER | MarkFlags::POTENTIAL_CLOSER;

                        if off > line.beg
                            && !is_unicode_whitespace_before(text, off)
                            && !is_unicode_punct_before(text, off)
                        {
                            flags.remove(MarkFlags::POTENTIAL_OPENER);
                        }
                        if tmp < line.end
                            && !is_unicode_whitespace_at(text, tmp)
                            && !is_unicode_punct_at(text, tmp)
                        {
                            flags.remove(MarkFlags::POTENTIAL_CLOSER);
                        }
                        if !flags.is_empty() {
                            self.marks.push(Mark::new(ch, off, tmp, flags));
                        }
                    }

                    off = tmp;
                    continue;
                }

                // Turn non-trivial whitespace into a single space.
                if is_whitespace(ch) {
                    let mut tmp = off + 1;
                    while tmp < line.end && is_whitespace(text[tmp]) {
                        tmp += 1;
                    }

                    if tmp - off > 1 || ch != b' ' {
                        self.marks
                            .push(Mark::new(ch, off, tmp, MarkFlags::RESOLVED));
                    }

                    off = tmp;
                    continue;
                }

                // A null character.
                if ch == b'\0' {
                    self.marks
                        .push(Mark::new(ch, off, off + 1, MarkFlags::RESOLVED));
                    off += 1;
                    continue;
                }

                off += 1;
            }

            line_index += 1;
        }

        // A terminal sentinel, so the render pass always finds a resolved
        // mark ahead of it.
        self.marks.push(Mark::new(
            SENTINEL,
            self.bytes.len(),
            self.bytes.len(),
            MarkFlags::RESOLVED,
        ));
    }
}
