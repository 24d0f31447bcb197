//! Recognition of raw HTML constructs: inline spans and the start/end
//! conditions of HTML blocks.
//!
//! These are purely syntactic recognizers; nothing is interpreted. Each
//! multi-line scanner keeps a per-parse horizon so that repeated probing
//! of the same pattern stays linear over the whole input.

use crate::block_parser::LineSpan;
use crate::byte_lookup::{ascii_case_eq, is_alnum, is_alpha, is_blank, is_newline, is_whitespace};

/// Tags whose presence right after `<` opens an HTML block of type 1.
pub(crate) static TYPE1_TAGS: &[&str] = &["pre", "script", "style", "textarea"];

/// How far each closer scan has already looked without success. Re-used
/// for the whole parse.
#[derive(Debug, Default)]
pub(crate) struct HtmlHorizons {
    comment: usize,
    proc_instr: usize,
    declaration: usize,
    cdata: usize,
}

/// Scan an opening or closing HTML tag starting at `beg`.
///
/// With `lines` present the tag may continue across those lines (inline
/// raw HTML); without them it has to fit on a single line, which is the
/// form required by the HTML block type 7 start condition.
pub(crate) fn is_html_tag(
    text: &[u8],
    lines: Option<&[LineSpan]>,
    beg: usize,
    max_end: usize,
) -> Option<usize> {
    debug_assert!(text[beg] == b'<');

    let mut line_index = 0;
    let mut line_end = match lines {
        Some(lines) => lines[0].end,
        None => crate::block_parser::scan_line_end(text, beg),
    };
    let mut off = beg;

    if off + 1 >= line_end {
        return None;
    }
    off += 1;

    // A little state automaton for attributes:
    //   -1: no attributes are allowed.
    //    0: an attribute could follow after some whitespace.
    //    1: after whitespace (attribute name may follow).
    //    2: after an attribute name ('=' may follow).
    //    3: after '=' (value specification must follow).
    //   41: in the middle of an unquoted attribute value.
    //   42: in the middle of a single-quoted attribute value.
    //   43: in the middle of a double-quoted attribute value.
    let mut attr_state: i32 = 0;

    if text[off] == b'/' {
        // Closer tag "</ ... >". No attributes may be present.
        attr_state = -1;
        off += 1;
    }

    // Tag name.
    if off >= line_end || !is_alpha(text[off]) {
        return None;
    }
    off += 1;
    while off < line_end && (is_alnum(text[off]) || text[off] == b'-') {
        off += 1;
    }

    // Optional attributes (unless a closer), optional '/', final '>'.
    loop {
        while off < line_end && !is_newline(text[off]) {
            if attr_state > 40 {
                if attr_state == 41
                    && (is_blank(text[off]) || matches!(text[off], b'"' | b'\'' | b'=' | b'<' | b'>' | b'`'))
                {
                    attr_state = 0;
                    // Put the char back for re-inspection in the new state.
                    continue;
                } else if attr_state == 42 && text[off] == b'\'' {
                    attr_state = 0;
                } else if attr_state == 43 && text[off] == b'"' {
                    attr_state = 0;
                }
                off += 1;
            } else if is_whitespace(text[off]) {
                if attr_state == 0 {
                    attr_state = 1;
                }
                off += 1;
            } else if attr_state <= 2 && text[off] == b'>' {
                return finish_tag(off, max_end);
            } else if attr_state <= 2
                && text[off] == b'/'
                && off + 1 < line_end
                && text[off + 1] == b'>'
            {
                // End with the digraph "/>".
                return finish_tag(off + 1, max_end);
            } else if (attr_state == 1 || attr_state == 2)
                && (is_alpha(text[off]) || matches!(text[off], b'_' | b':'))
            {
                off += 1;
                // Attribute name.
                while off < line_end
                    && (is_alnum(text[off]) || matches!(text[off], b'_' | b'.' | b':' | b'-'))
                {
                    off += 1;
                }
                attr_state = 2;
            } else if attr_state == 2 && text[off] == b'=' {
                off += 1;
                attr_state = 3;
            } else if attr_state == 3 {
                // Start of an attribute value.
                match text[off] {
                    b'"' => attr_state = 43,
                    b'\'' => attr_state = 42,
                    b'=' | b'<' | b'>' | b'`' => return None,
                    b if is_newline(b) => return None,
                    _ => attr_state = 41,
                }
                off += 1;
            } else {
                // Anything unexpected.
                return None;
            }
        }

        // The tag has to fit a single line for HTML block type 7.
        let lines = lines?;

        line_index += 1;
        if line_index >= lines.len() {
            return None;
        }

        off = lines[line_index].beg;
        line_end = lines[line_index].end;

        if attr_state == 0 || attr_state == 41 {
            attr_state = 1;
        }

        if off >= max_end {
            return None;
        }
    }
}

fn finish_tag(off: usize, max_end: usize) -> Option<usize> {
    (off < max_end).then_some(off + 1)
}

/// Scan lines for the literal closer `what`, memoizing how far the scan
/// got in `horizon` so a failed scan is never repeated.
fn scan_for_html_closer(
    text: &[u8],
    what: &[u8],
    lines: &[LineSpan],
    beg: usize,
    max_end: usize,
    horizon: &mut usize,
) -> Option<usize> {
    let mut off = beg;
    let mut line_index = 0;

    if off < *horizon && *horizon >= max_end.saturating_sub(what.len()) {
        // We have already scanned this whole range and know there is
        // nothing to find.
        return None;
    }

    loop {
        // The closer cannot span lines, so each line is searched on its
        // own, clipped to `max_end`.
        let segment_end = lines[line_index].end.min(max_end);
        if off < segment_end {
            if let Some(found) = memchr::memmem::find(&text[off..segment_end], what) {
                return Some(off + found + what.len());
            }
            off = segment_end;
        }

        line_index += 1;
        if off >= max_end || line_index >= lines.len() {
            *horizon = off;
            return None;
        }

        off = lines[line_index].beg;
    }
}

pub(crate) fn is_html_comment(
    text: &[u8],
    lines: &[LineSpan],
    beg: usize,
    max_end: usize,
    horizons: &mut HtmlHorizons,
) -> Option<usize> {
    let off = beg;

    if off + 4 >= lines[0].end {
        return None;
    }
    if &text[off + 1..off + 4] != b"!--" {
        return None;
    }

    // Skip only "<!" so that "<!-->" and "<!--->" are accepted too.
    scan_for_html_closer(
        text,
        b"-->",
        lines,
        off + 2,
        max_end,
        &mut horizons.comment,
    )
}

pub(crate) fn is_html_processing_instruction(
    text: &[u8],
    lines: &[LineSpan],
    beg: usize,
    max_end: usize,
    horizons: &mut HtmlHorizons,
) -> Option<usize> {
    let off = beg;

    if off + 2 >= lines[0].end || text[off + 1] != b'?' {
        return None;
    }

    scan_for_html_closer(
        text,
        b"?>",
        lines,
        off + 2,
        max_end,
        &mut horizons.proc_instr,
    )
}

pub(crate) fn is_html_declaration(
    text: &[u8],
    lines: &[LineSpan],
    beg: usize,
    max_end: usize,
    horizons: &mut HtmlHorizons,
) -> Option<usize> {
    let mut off = beg;

    if off + 2 >= lines[0].end || text[off + 1] != b'!' {
        return None;
    }
    off += 2;

    // Declaration name.
    if off >= lines[0].end || !is_alpha(text[off]) {
        return None;
    }
    off += 1;
    while off < lines[0].end && is_alpha(text[off]) {
        off += 1;
    }

    scan_for_html_closer(text, b">", lines, off, max_end, &mut horizons.declaration)
}

pub(crate) fn is_html_cdata(
    text: &[u8],
    lines: &[LineSpan],
    beg: usize,
    max_end: usize,
    horizons: &mut HtmlHorizons,
) -> Option<usize> {
    const OPENER: &[u8] = b"<![CDATA[";

    let off = beg;

    if off + OPENER.len() >= lines[0].end {
        return None;
    }
    if &text[off..off + OPENER.len()] != OPENER {
        return None;
    }

    scan_for_html_closer(
        text,
        b"]]>",
        lines,
        off + OPENER.len(),
        max_end,
        &mut horizons.cdata,
    )
}

pub(crate) fn is_html_any(
    text: &[u8],
    lines: &[LineSpan],
    beg: usize,
    max_end: usize,
    horizons: &mut HtmlHorizons,
) -> Option<usize> {
    debug_assert!(text[beg] == b'<');
    is_html_tag(text, Some(lines), beg, max_end)
        .or_else(|| is_html_comment(text, lines, beg, max_end, horizons))
        .or_else(|| is_html_processing_instruction(text, lines, beg, max_end, horizons))
        .or_else(|| is_html_declaration(text, lines, beg, max_end, horizons))
        .or_else(|| is_html_cdata(text, lines, beg, max_end, horizons))
}

/// Block-level tags opening an HTML block of type 6, bucketed by their
/// first letter.
fn type6_tags(first: u8) -> &'static [&'static str] {
    match first.to_ascii_lowercase() {
        b'a' => &["address", "article", "aside"],
        b'b' => &["base", "basefont", "blockquote", "body"],
        b'c' => &["caption", "center", "col", "colgroup"],
        b'd' => &["dd", "details", "dialog", "dir", "div", "dl", "dt"],
        b'f' => &["fieldset", "figcaption", "figure", "footer", "form", "frame", "frameset"],
        b'h' => &["h1", "h2", "h3", "h4", "h5", "h6", "head", "header", "hr", "html"],
        b'i' => &["iframe"],
        b'l' => &["legend", "li", "link"],
        b'm' => &["main", "menu", "menuitem"],
        b'n' => &["nav", "noframes"],
        b'o' => &["ol", "optgroup", "option"],
        b'p' => &["p", "param"],
        b's' => &["search", "section", "summary"],
        b't' => &["table", "tbody", "td", "tfoot", "th", "thead", "title", "tr", "track"],
        b'u' => &["ul"],
        _ => &[],
    }
}

/// Returns the type (1-7) of the raw HTML block started at `beg`, or 0 if
/// no start condition matches. Refer to the CommonMark specification for
/// the definition of the types.
pub(crate) fn html_block_start_condition(text: &[u8], beg: usize) -> u8 {
    let off = beg + 1;

    // Type 1: <pre, <script, <style or <textarea.
    for tag in TYPE1_TAGS {
        if off + tag.len() <= text.len() && ascii_case_eq(&text[off..], tag.as_bytes()) {
            return 1;
        }
    }

    // Type 2: <!--
    if off + 3 < text.len() && &text[off..off + 3] == b"!--" {
        return 2;
    }

    // Type 3: <?
    if off < text.len() && text[off] == b'?' {
        return 3;
    }

    // Types 4 and 5: <!
    if off < text.len() && text[off] == b'!' {
        // Type 5: <![CDATA[
        if off + 8 < text.len() && &text[off..off + 8] == b"![CDATA[" {
            return 5;
        }

        // Type 4: <! followed by an uppercase letter.
        if off + 1 < text.len() && text[off + 1].is_ascii_uppercase() {
            return 4;
        }
    }

    // Type 6: the long list of block-level tags above.
    if off + 1 < text.len() && (is_alpha(text[off]) || (text[off] == b'/' && is_alpha(text[off + 1])))
    {
        let name_off = if text[off] == b'/' { off + 1 } else { off };

        for tag in type6_tags(text[name_off]) {
            if name_off + tag.len() <= text.len()
                && ascii_case_eq(&text[name_off..], tag.as_bytes())
            {
                let tmp = name_off + tag.len();
                if tmp >= text.len()
                    || is_blank(text[tmp])
                    || is_newline(text[tmp])
                    || text[tmp] == b'>'
                    || (tmp + 1 < text.len() && text[tmp] == b'/' && text[tmp + 1] == b'>')
                {
                    return 6;
                }
                break;
            }
        }
    }

    // Type 7: any complete tag followed only by whitespace.
    if off + 1 < text.len() {
        if let Some(end) = is_html_tag(text, None, beg, text.len()) {
            let mut tail = end;
            while tail < text.len() && is_whitespace(text[tail]) {
                tail += 1;
            }
            if tail >= text.len() || is_newline(text[tail]) {
                return 7;
            }
        }
    }

    0
}
