//! Code span matching. Unlike the other inline constructs this resolves
//! eagerly during mark collection, since a backtick run either pairs with
//! the nearest same-length run or stays plain text.

use crate::block_parser::LineSpan;
use crate::byte_lookup::is_blank;

use super::delimiter::{Mark, MarkFlags};

/// Opening runs longer than this never form a code span. Solves the
/// pathological case of many openers of distinct lengths, whose resolving
/// would be O(n^2).
pub(crate) const CODESPAN_MARK_MAXLEN: usize = 32;

/// Memory of failed closer searches, per analyzed block: the last known
/// potential closer for each run length, and whether the scan has already
/// hit the end of the block.
pub(crate) struct CodeSpanScanState {
    pub last_potential_closers: [usize; CODESPAN_MARK_MAXLEN],
    pub reached_paragraph_end: bool,
}

impl CodeSpanScanState {
    pub(crate) fn new() -> Self {
        CodeSpanScanState {
            last_potential_closers: [0; CODESPAN_MARK_MAXLEN],
            reached_paragraph_end: false,
        }
    }
}

/// Try to match the backtick run starting at `beg` (on `lines[0]`) with a
/// closer run of the same length. On success both endpoint marks are
/// filled in, with one space or newline consumed from each side when the
/// contents allow it. On failure `opener.end` is still set so the caller
/// can skip the run.
pub(crate) fn is_code_span(
    text: &[u8],
    lines: &[LineSpan],
    beg: usize,
    opener: &mut Mark,
    closer: &mut Mark,
    state: &mut CodeSpanScanState,
) -> bool {
    let opener_beg = beg;
    let mut line_end = lines[0].end;
    let mut line_index = 0;

    let mut opener_end = opener_beg;
    while opener_end < line_end && text[opener_end] == b'`' {
        opener_end += 1;
    }
    let has_space_after_opener = opener_end < line_end && text[opener_end] == b' ';
    let has_eol_after_opener = opener_end == line_end;

    // The caller needs to know the end of the opening mark even on failure.
    opener.end = opener_end;

    let mark_len = opener_end - opener_beg;
    if mark_len > CODESPAN_MARK_MAXLEN {
        return false;
    }

    // If we already know there is no closer of this length, re-scanning
    // makes no sense.
    if state.last_potential_closers[mark_len - 1] >= lines[lines.len() - 1].end
        || (state.reached_paragraph_end && state.last_potential_closers[mark_len - 1] < opener_end)
    {
        return false;
    }

    let mut closer_beg = opener_end;
    let mut closer_end;
    let mut has_only_space = true;
    let has_space_before_closer;
    let has_eol_before_closer;

    // Find the closer mark.
    loop {
        while closer_beg < line_end && text[closer_beg] != b'`' {
            if text[closer_beg] != b' ' {
                has_only_space = false;
            }
            closer_beg += 1;
        }
        closer_end = closer_beg;
        while closer_end < line_end && text[closer_end] == b'`' {
            closer_end += 1;
        }

        if closer_end - closer_beg == mark_len {
            // Success.
            has_space_before_closer =
                closer_beg > lines[line_index].beg && text[closer_beg - 1] == b' ';
            has_eol_before_closer = closer_beg == lines[line_index].beg;
            break;
        }

        if closer_end - closer_beg > 0 {
            // A backtick run which is not our closer.
            has_only_space = false;

            // If we eventually fail, remember it as a potential closer of
            // its own length to mitigate the need for re-scans.
            if closer_end - closer_beg < CODESPAN_MARK_MAXLEN {
                let slot = &mut state.last_potential_closers[closer_end - closer_beg - 1];
                *slot = (*slot).max(closer_beg);
            }
        }

        if closer_end >= line_end {
            line_index += 1;
            if line_index >= lines.len() {
                // Reached the end of the block and still nothing.
                state.reached_paragraph_end = true;
                return false;
            }
            line_end = lines[line_index].end;
            closer_beg = lines[line_index].beg;
        } else {
            closer_beg = closer_end;
        }
    }

    // If there is a space or a newline both after the opener and before
    // the closer, and the span is not made of spaces only, one initial and
    // one trailing space become part of the marks.
    let mut opener_end = opener_end;
    let mut closer_beg = closer_beg;
    if !has_only_space
        && (has_space_after_opener || has_eol_after_opener)
        && (has_space_before_closer || has_eol_before_closer)
    {
        if has_space_after_opener {
            opener_end += 1;
        } else {
            opener_end = lines[1].beg;
        }

        if has_space_before_closer {
            closer_beg -= 1;
        } else {
            // Go back to the end of the previous line, but keep any
            // trailing whitespace as contents.
            closer_beg = lines[line_index - 1].end;
            while closer_beg < text.len() && is_blank(text[closer_beg]) {
                closer_beg += 1;
            }
        }
    }

    opener.ch = b'`';
    opener.beg = opener_beg;
    opener.end = opener_end;
    opener.flags = MarkFlags::POTENTIAL_OPENER;
    closer.ch = b'`';
    closer.beg = closer_beg;
    closer.end = closer_end;
    closer.flags = MarkFlags::POTENTIAL_CLOSER;
    true
}
