//! The block pass: a streaming, line-oriented analysis that groups the
//! input into container and leaf blocks.
//!
//! Each physical line is classified against the previous "pivot" line and
//! the stack of open containers, then folded into the growing list of
//! block records. Leaf blocks carry a range into the shared line list;
//! container blocks appear as matching opener/closer records around their
//! children. The inline structure of leaf blocks is not touched here.

use bitflags::bitflags;
use memchr::{memchr, memchr2};

use crate::byte_lookup::{is_blank, is_digit, is_newline, is_whitespace};
use crate::options::ParserOptions;
use crate::parser::raw_html;
use crate::ref_def::RefDefStore;

/// Column count cap for tables. Prevents quadratic output explosion from a
/// pathological table with thousands of requested columns per tiny row.
pub(crate) const TABLE_MAXCOLCOUNT: u32 = 128;

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub(crate) enum LineType {
    Blank,
    Hr,
    AtxHeader,
    SetextUnderline,
    IndentedCode,
    FencedCode,
    Html,
    Text,
    Table,
    TableUnderline,
}

/// Classification of one physical line, produced by
/// [`BlockParser::analyze_line`].
#[derive(Clone, Copy, Debug)]
pub(crate) struct LineAnalysis {
    pub line_type: LineType,
    /// Small type-specific payload: heading level, fence flag, table
    /// column count.
    pub data: u32,
    pub enforce_new_block: bool,
    pub beg: usize,
    pub end: usize,
    /// Indentation in visual columns, relative to the innermost container.
    pub indent: u32,
}

impl LineAnalysis {
    const fn blank() -> Self {
        LineAnalysis {
            line_type: LineType::Blank,
            data: 0,
            enforce_new_block: false,
            beg: 0,
            end: 0,
            indent: 0,
        }
    }
}

/// A content line of a leaf block. `indent` is only meaningful for
/// verbatim (code and HTML) blocks, where it is the residual indentation
/// to re-emit in front of the line.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub(crate) struct LineSpan {
    pub beg: usize,
    pub end: usize,
    pub indent: u32,
}

bitflags! {
    #[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
    pub(crate) struct BlockFlags: u8 {
        const CONTAINER_OPENER = 1;
        const CONTAINER_CLOSER = 1 << 1;
        const LOOSE_LIST = 1 << 2;
        const SETEXT_HEADER = 1 << 3;
    }
}

impl BlockFlags {
    pub(crate) fn is_container(&self) -> bool {
        self.intersects(BlockFlags::CONTAINER_OPENER | BlockFlags::CONTAINER_CLOSER)
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub(crate) enum RecordKind {
    Quote,
    UnorderedList,
    OrderedList,
    ListItem,
    Hr,
    Heading,
    Code,
    Html,
    Paragraph,
    Table,
}

/// One record in the flattened block list. Container records appear twice
/// (opener and closer); leaf records own `n_lines` entries of the shared
/// line list starting at `first_line`.
#[derive(Clone, Copy, Debug)]
pub(crate) struct BlockRecord {
    pub kind: RecordKind,
    pub flags: BlockFlags,
    /// Heading level, fence indicator, list mark / delimiter char, task
    /// mark char, or table column count.
    pub data: u32,
    pub first_line: usize,
    pub n_lines: usize,
    /// Ordered list start number, or task mark offset for list items.
    pub aux: usize,
}

/// An open container on the analysis stack.
#[derive(Clone, Copy, Debug, Default)]
struct Container {
    ch: u8,
    is_task: bool,
    start: u32,
    mark_indent: u32,
    contents_indent: u32,
    /// Index of the list-opener record in the block list, so looseness can
    /// be stamped once a loosening blank line is confirmed.
    block_index: usize,
    task_mark_off: usize,
}

/// The result of the block pass, consumed by the render driver.
pub(crate) struct ParsedBlocks<'a> {
    pub blocks: Vec<BlockRecord>,
    pub lines: Vec<LineSpan>,
    pub ref_defs: RefDefStore<'a>,
    /// True if a table was degraded to text for exceeding the column cap.
    pub table_suppressed: bool,
}

pub(crate) struct BlockParser<'a> {
    text: &'a [u8],
    options: ParserOptions,
    /// Minimal indentation to call a block an indented code block.
    /// Effectively infinite when indented code is disabled.
    code_indent_offset: u32,

    blocks: Vec<BlockRecord>,
    lines: Vec<LineSpan>,
    containers: Vec<Container>,
    current_block: Option<usize>,
    ref_defs: RefDefStore<'a>,

    // Contextual info for line analysis.
    code_fence_length: usize,
    html_block_type: u8,
    last_line_has_list_loosening_effect: bool,
    last_list_item_starts_with_two_blank_lines: bool,
    table_suppressed: bool,
}

impl<'a> BlockParser<'a> {
    pub(crate) fn new(source: &'a str, options: ParserOptions) -> Self {
        let code_indent_offset = if options.contains(ParserOptions::NO_INDENTED_CODE_BLOCKS) {
            u32::MAX
        } else {
            4
        };

        Self {
            text: source.as_bytes(),
            options,
            code_indent_offset,
            blocks: Vec::new(),
            lines: Vec::new(),
            containers: Vec::new(),
            current_block: None,
            ref_defs: RefDefStore::new(source),
            code_fence_length: 0,
            html_block_type: 0,
            last_line_has_list_loosening_effect: false,
            last_list_item_starts_with_two_blank_lines: false,
            table_suppressed: false,
        }
    }

    pub(crate) fn parse_into_blocks(mut self) -> ParsedBlocks<'a> {
        let mut pivot = LineAnalysis::blank();
        let mut off = 0;

        while off < self.text.len() {
            let line = self.analyze_line(&mut off, &pivot);
            self.process_line(&mut pivot, line);
        }

        self.end_current_block();
        self.leave_child_containers(0);
        self.ref_defs.build_index();

        ParsedBlocks {
            blocks: self.blocks,
            lines: self.lines,
            ref_defs: self.ref_defs,
            table_suppressed: self.table_suppressed,
        }
    }

    //#region Block records

    fn start_new_block(&mut self, line: &LineAnalysis) {
        debug_assert!(self.current_block.is_none());

        let kind = match line.line_type {
            LineType::Hr => RecordKind::Hr,
            LineType::AtxHeader => RecordKind::Heading,
            LineType::FencedCode | LineType::IndentedCode => RecordKind::Code,
            LineType::Text => RecordKind::Paragraph,
            LineType::Html => RecordKind::Html,
            _ => unreachable!("line type {:?} cannot start a block", line.line_type),
        };

        self.blocks.push(BlockRecord {
            kind,
            flags: BlockFlags::empty(),
            data: line.data,
            first_line: self.lines.len(),
            n_lines: 0,
            aux: 0,
        });
        self.current_block = Some(self.blocks.len() - 1);
    }

    /// Eat from the start of the current textual block any reference
    /// definitions and remember them so links referring to them can be
    /// resolved. (They can only sit at the start of the block as they
    /// cannot interrupt a paragraph.)
    fn consume_link_reference_definitions(&mut self) {
        let index = self.current_block.unwrap();
        let first = self.blocks[index].first_line;
        let n_lines = self.blocks[index].n_lines;

        let mut n = 0;
        while n < n_lines {
            match self
                .ref_defs
                .try_consume_definition(&self.lines[first + n..first + n_lines])
            {
                Some(n_def_lines) => n += n_def_lines,
                None => break,
            }
        }

        if n == 0 {
            return;
        }

        if n == n_lines {
            // All lines were definitions: the block disappears entirely.
            self.lines.truncate(first);
            self.blocks.pop();
            self.current_block = None;
        } else {
            self.lines.drain(first..first + n);
            self.blocks[index].n_lines -= n;
        }
    }

    fn end_current_block(&mut self) {
        let Some(index) = self.current_block else {
            return;
        };

        // Reference definitions can span lines, so they are collected here
        // rather than line by line during analysis.
        let block = self.blocks[index];
        let is_setext = block.kind == RecordKind::Heading
            && block.flags.contains(BlockFlags::SETEXT_HEADER);
        if (block.kind == RecordKind::Paragraph || is_setext) && block.n_lines > 0 {
            let first_line = self.lines[block.first_line];
            if first_line.beg < self.text.len() && self.text[first_line.beg] == b'[' {
                self.consume_link_reference_definitions();
                if self.current_block.is_none() {
                    return;
                }
            }
        }

        let block = &mut self.blocks[index];
        if block.kind == RecordKind::Heading && block.flags.contains(BlockFlags::SETEXT_HEADER) {
            if block.n_lines > 1 {
                // Get rid of the underline.
                block.n_lines -= 1;
                self.lines.pop();
            } else {
                // Only the underline is left after eating the definitions.
                // Keep the line as the beginning of a new paragraph block.
                block.kind = RecordKind::Paragraph;
                block.flags.remove(BlockFlags::SETEXT_HEADER);
                return;
            }
        }

        self.current_block = None;
    }

    fn add_line_into_current_block(&mut self, analysis: &LineAnalysis) {
        let index = self.current_block.expect("no current block to add a line to");
        self.lines.push(LineSpan {
            beg: analysis.beg,
            end: analysis.end,
            indent: analysis.indent,
        });
        self.blocks[index].n_lines += 1;
    }

    fn push_container_record(&mut self, kind: RecordKind, aux: usize, data: u32, flags: BlockFlags) {
        self.end_current_block();
        self.blocks.push(BlockRecord {
            kind,
            flags,
            data,
            first_line: 0,
            n_lines: 0,
            aux,
        });
    }
    //#endregion

    //#region Containers

    fn enter_child_containers(&mut self, n_children: usize) {
        for i in self.containers.len() - n_children..self.containers.len() {
            let c = self.containers[i];

            match c.ch {
                b'.' | b')' | b'-' | b'+' | b'*' => {
                    let is_ordered = matches!(c.ch, b'.' | b')');

                    // Remember the opener's record index so the block can be
                    // revisited if the list turns out to be loose.
                    self.end_current_block();
                    self.containers[i].block_index = self.blocks.len();

                    self.push_container_record(
                        if is_ordered {
                            RecordKind::OrderedList
                        } else {
                            RecordKind::UnorderedList
                        },
                        c.start as usize,
                        c.ch as u32,
                        BlockFlags::CONTAINER_OPENER,
                    );
                    self.push_container_record(
                        RecordKind::ListItem,
                        c.task_mark_off,
                        if c.is_task {
                            self.text[c.task_mark_off] as u32
                        } else {
                            0
                        },
                        BlockFlags::CONTAINER_OPENER,
                    );
                }
                b'>' => {
                    self.push_container_record(
                        RecordKind::Quote,
                        0,
                        0,
                        BlockFlags::CONTAINER_OPENER,
                    );
                }
                _ => unreachable!("unknown container mark {}", c.ch as char),
            }
        }
    }

    fn leave_child_containers(&mut self, n_keep: usize) {
        while self.containers.len() > n_keep {
            let c = *self.containers.last().unwrap();

            match c.ch {
                b'.' | b')' | b'-' | b'+' | b'*' => {
                    let is_ordered = matches!(c.ch, b'.' | b')');
                    self.push_container_record(
                        RecordKind::ListItem,
                        c.task_mark_off,
                        if c.is_task {
                            self.text[c.task_mark_off] as u32
                        } else {
                            0
                        },
                        BlockFlags::CONTAINER_CLOSER,
                    );
                    self.push_container_record(
                        if is_ordered {
                            RecordKind::OrderedList
                        } else {
                            RecordKind::UnorderedList
                        },
                        0,
                        c.ch as u32,
                        BlockFlags::CONTAINER_CLOSER,
                    );
                }
                b'>' => {
                    self.push_container_record(
                        RecordKind::Quote,
                        0,
                        0,
                        BlockFlags::CONTAINER_CLOSER,
                    );
                }
                _ => unreachable!("unknown container mark {}", c.ch as char),
            }

            self.containers.pop();
        }
    }

    /// Check for a container mark (`>`, a bullet, or an ordered-list
    /// number) at `beg` and describe it.
    fn is_container_mark(
        &self,
        indent: u32,
        beg: usize,
        p_end: &mut usize,
        container: &mut Container,
    ) -> bool {
        let mut off = beg;

        if off >= self.text.len() || indent >= self.code_indent_offset {
            return false;
        }

        // Block quote mark.
        if self.text[off] == b'>' {
            off += 1;
            *container = Container {
                ch: b'>',
                mark_indent: indent,
                contents_indent: indent + 1,
                ..Container::default()
            };
            *p_end = off;
            return true;
        }

        // Bullet list item mark.
        if matches!(self.text[off], b'-' | b'+' | b'*')
            && (off + 1 >= self.text.len()
                || is_blank(self.text[off + 1])
                || is_newline(self.text[off + 1]))
        {
            *container = Container {
                ch: self.text[off],
                mark_indent: indent,
                contents_indent: indent + 1,
                ..Container::default()
            };
            *p_end = off + 1;
            return true;
        }

        // Ordered list item mark: up to nine digits.
        let max_end = (off + 9).min(self.text.len());
        let mut start: u32 = 0;
        while off < max_end && is_digit(self.text[off]) {
            start = start * 10 + (self.text[off] - b'0') as u32;
            off += 1;
        }
        if off > beg
            && off < self.text.len()
            && matches!(self.text[off], b'.' | b')')
            && (off + 1 >= self.text.len()
                || is_blank(self.text[off + 1])
                || is_newline(self.text[off + 1]))
        {
            *container = Container {
                ch: self.text[off],
                start,
                mark_indent: indent,
                contents_indent: indent + (off - beg) as u32 + 1,
                ..Container::default()
            };
            *p_end = off + 1;
            return true;
        }

        false
    }

    /// Block quotes have no "items"; lists are compatible when the mark
    /// matches and the new mark is not indented into the item contents.
    fn is_container_compatible(pivot: &Container, container: &Container) -> bool {
        if container.ch == b'>' {
            return false;
        }
        container.ch == pivot.ch && container.mark_indent <= pivot.contents_indent
    }
    //#endregion

    //#region Single-line recognizers

    fn line_indentation(&self, total_indent: u32, beg: usize, p_end: &mut usize) -> u32 {
        let mut off = beg;
        let mut indent = total_indent;

        while off < self.text.len() && is_blank(self.text[off]) {
            if self.text[off] == b'\t' {
                indent = (indent + 4) & !3;
            } else {
                indent += 1;
            }
            off += 1;
        }

        *p_end = off;
        indent - total_indent
    }

    fn is_hr_line(&self, beg: usize, p_end: &mut usize, p_killer: &mut usize) -> bool {
        let mut off = beg + 1;
        let mut n = 1;

        while off < self.text.len()
            && (self.text[off] == self.text[beg] || is_blank(self.text[off]))
        {
            if self.text[off] == self.text[beg] {
                n += 1;
            }
            off += 1;
        }

        if n < 3 {
            *p_killer = off;
            return false;
        }

        // Nothing else can be present on the line.
        if off < self.text.len() && !is_newline(self.text[off]) {
            *p_killer = off;
            return false;
        }

        *p_end = off;
        true
    }

    fn is_atxheader_line(
        &self,
        beg: usize,
        p_beg: &mut usize,
        p_end: &mut usize,
        p_level: &mut u32,
    ) -> bool {
        let mut off = beg + 1;

        while off < self.text.len() && self.text[off] == b'#' && off - beg < 7 {
            off += 1;
        }
        let n = off - beg;

        if n > 6 {
            return false;
        }
        *p_level = n as u32;

        if !self.options.contains(ParserOptions::PERMISSIVE_ATX_HEADERS)
            && off < self.text.len()
            && !is_blank(self.text[off])
            && !is_newline(self.text[off])
        {
            return false;
        }

        while off < self.text.len() && is_blank(self.text[off]) {
            off += 1;
        }
        *p_beg = off;
        *p_end = off;
        true
    }

    fn is_setext_underline(&self, beg: usize, p_end: &mut usize, p_level: &mut u32) -> bool {
        let mut off = beg + 1;

        while off < self.text.len() && self.text[off] == self.text[beg] {
            off += 1;
        }

        // Optionally, whitespace can follow.
        while off < self.text.len() && is_blank(self.text[off]) {
            off += 1;
        }

        // But nothing more is allowed on the line.
        if off < self.text.len() && !is_newline(self.text[off]) {
            return false;
        }

        *p_level = if self.text[beg] == b'=' { 1 } else { 2 };
        *p_end = off;
        true
    }

    fn is_table_underline(&mut self, beg: usize, p_end: &mut usize, p_col_count: &mut u32) -> bool {
        let mut off = beg;
        let mut found_pipe = false;
        let mut col_count: u32 = 0;

        if off < self.text.len() && self.text[off] == b'|' {
            found_pipe = true;
            off += 1;
            while off < self.text.len() && is_whitespace(self.text[off]) {
                off += 1;
            }
        }

        loop {
            // Cell underline ("-----", ":----", "----:" or ":----:").
            let mut delimited = false;
            if off < self.text.len() && self.text[off] == b':' {
                off += 1;
            }
            if off >= self.text.len() || self.text[off] != b'-' {
                return false;
            }
            while off < self.text.len() && self.text[off] == b'-' {
                off += 1;
            }
            if off < self.text.len() && self.text[off] == b':' {
                off += 1;
            }

            col_count += 1;
            if col_count > TABLE_MAXCOLCOUNT {
                self.table_suppressed = true;
                return false;
            }

            // Pipe delimiter (optional at the end of line).
            while off < self.text.len() && is_whitespace(self.text[off]) {
                off += 1;
            }
            if off < self.text.len() && self.text[off] == b'|' {
                delimited = true;
                found_pipe = true;
                off += 1;
                while off < self.text.len() && is_whitespace(self.text[off]) {
                    off += 1;
                }
            }

            if off >= self.text.len() || is_newline(self.text[off]) {
                break;
            }

            if !delimited {
                return false;
            }
        }

        if !found_pipe {
            return false;
        }

        *p_end = off;
        *p_col_count = col_count;
        true
    }

    fn is_opening_code_fence(&mut self, beg: usize, p_end: &mut usize) -> bool {
        let mut off = beg;

        while off < self.text.len() && self.text[off] == self.text[beg] {
            off += 1;
        }

        // Fence must have at least three characters.
        if off - beg < 3 {
            return false;
        }

        self.code_fence_length = off - beg;

        while off < self.text.len() && self.text[off] == b' ' {
            off += 1;
        }

        // Optionally, an info string can follow, but a backtick-based fence
        // must not contain a backtick in it.
        while off < self.text.len() && !is_newline(self.text[off]) {
            if self.text[beg] == b'`' && self.text[off] == b'`' {
                return false;
            }
            off += 1;
        }

        *p_end = off;
        true
    }

    fn is_closing_code_fence(&self, ch: u8, beg: usize, p_end: &mut usize) -> bool {
        let mut off = beg;
        let mut ret = false;

        // Closing fence must be at least as long and use the same char.
        while off < self.text.len() && self.text[off] == ch {
            off += 1;
        }
        if off - beg >= self.code_fence_length {
            let mut tail = off;
            while tail < self.text.len() && self.text[tail] == b' ' {
                tail += 1;
            }
            if tail >= self.text.len() || is_newline(self.text[tail]) {
                off = tail;
                ret = true;
            }
        }

        // The end is filled even on failure: the caller eats the line
        // without any parsing either way.
        *p_end = off;
        ret
    }

    /// Case sensitive check whether the substring `what` occurs between
    /// `beg` and the end of line.
    fn line_contains(&self, beg: usize, what: &[u8], p_end: &mut usize) -> bool {
        let line_end =
            beg + memchr2(b'\r', b'\n', &self.text[beg..]).unwrap_or(self.text.len() - beg);
        if let Some(found) = memchr::memmem::find(&self.text[beg..line_end], what) {
            *p_end = beg + found + what.len();
            return true;
        }
        *p_end = line_end;
        false
    }

    fn is_html_block_end_condition(&self, beg: usize, p_end: &mut usize) -> u8 {
        match self.html_block_type {
            1 => {
                let mut off = beg;
                while off + 1 < self.text.len() && !is_newline(self.text[off]) {
                    if self.text[off] == b'<' && self.text[off + 1] == b'/' {
                        for tag in raw_html::TYPE1_TAGS {
                            if off + 2 + tag.len() < self.text.len()
                                && self.text[off + 2..].len() > tag.len()
                                && self.text[off + 2..off + 2 + tag.len()]
                                    .eq_ignore_ascii_case(tag.as_bytes())
                                && self.text[off + 2 + tag.len()] == b'>'
                            {
                                *p_end = off + 2 + tag.len() + 1;
                                return 1;
                            }
                        }
                    }
                    off += 1;
                }
                *p_end = off;
                0
            }
            2 => {
                if self.line_contains(beg, b"-->", p_end) {
                    2
                } else {
                    0
                }
            }
            3 => {
                if self.line_contains(beg, b"?>", p_end) {
                    3
                } else {
                    0
                }
            }
            4 => {
                if self.line_contains(beg, b">", p_end) {
                    4
                } else {
                    0
                }
            }
            5 => {
                if self.line_contains(beg, b"]]>", p_end) {
                    5
                } else {
                    0
                }
            }
            6 | 7 => {
                // A blank line ends types 6 and 7.
                if beg >= self.text.len() || is_newline(self.text[beg]) {
                    *p_end = beg;
                    self.html_block_type
                } else {
                    0
                }
            }
            _ => unreachable!("no open HTML block"),
        }
    }
    //#endregion

    /// Analyze the type of the line starting at `*p_off` and find its
    /// properties. This is the main input for determining the type and
    /// boundaries of a block. The rule ordering is load bearing: later
    /// checks only apply when earlier ones did not fire.
    fn analyze_line(&mut self, p_off: &mut usize, pivot_in: &LineAnalysis) -> LineAnalysis {
        let beg = *p_off;
        let mut pivot = *pivot_in;
        let mut total_indent: u32 = 0;
        let mut n_parents = 0;
        let mut n_brothers = 0;
        let mut n_children = 0;
        let mut container = Container::default();
        let prev_line_has_list_loosening_effect = self.last_line_has_list_loosening_effect;
        let mut off = beg;
        let mut hr_killer = 0;

        let mut line = LineAnalysis::blank();
        line.indent = self.line_indentation(total_indent, off, &mut off);
        total_indent += line.indent;
        line.beg = off;

        // Given the indentation and block quote marks, determine how many
        // of the current containers are this line's parents.
        while n_parents < self.containers.len() {
            let c = self.containers[n_parents];

            if c.ch == b'>'
                && line.indent < self.code_indent_offset
                && off < self.text.len()
                && self.text[off] == b'>'
            {
                // Block quote mark.
                off += 1;
                total_indent += 1;
                line.indent = self.line_indentation(total_indent, off, &mut off);
                total_indent += line.indent;

                // The optional first space after '>' is part of the mark.
                if line.indent > 0 {
                    line.indent -= 1;
                }

                line.beg = off;
            } else if c.ch != b'>' && line.indent >= c.contents_indent {
                // List.
                line.indent -= c.contents_indent;
            } else {
                break;
            }

            n_parents += 1;
        }

        if off >= self.text.len() || is_newline(self.text[off]) {
            // A blank line does not need any real indentation to be nested
            // inside a list.
            if n_brothers + n_children == 0 {
                while n_parents < self.containers.len() && self.containers[n_parents].ch != b'>' {
                    n_parents += 1;
                }
            }
        }

        loop {
            // Check whether this is a fenced code continuation.
            if pivot.line_type == LineType::FencedCode {
                line.beg = off;

                // Another code line, unless this is the closing fence, which
                // is transformed into a blank line.
                if line.indent < self.code_indent_offset
                    && self.is_closing_code_fence(self.text[pivot.beg], off, &mut off)
                {
                    line.line_type = LineType::Blank;
                    self.last_line_has_list_loosening_effect = false;
                    break;
                }

                if n_parents == self.containers.len() {
                    // Indentation is relative to the opening fence.
                    line.indent = line.indent.saturating_sub(pivot.indent);
                    line.line_type = LineType::FencedCode;
                    break;
                }
            }

            // Check whether this is an HTML block continuation.
            if pivot.line_type == LineType::Html && self.html_block_type > 0 {
                if n_parents < self.containers.len() {
                    // An HTML block is implicitly ended if the enclosing
                    // container block ends.
                    self.html_block_type = 0;
                } else {
                    let end_type = self.is_html_block_end_condition(off, &mut off);
                    if end_type > 0 {
                        // This is the last line of the block.
                        self.html_block_type = 0;

                        // Some end conditions serve as blank lines as well.
                        if end_type == 6 || end_type == 7 {
                            line.line_type = LineType::Blank;
                            line.indent = 0;
                            break;
                        }
                    }

                    line.line_type = LineType::Html;
                    n_parents = self.containers.len();
                    break;
                }
            }

            // Check for a blank line.
            if off >= self.text.len() || is_newline(self.text[off]) {
                if pivot.line_type == LineType::IndentedCode && n_parents == self.containers.len()
                {
                    line.line_type = LineType::IndentedCode;
                    line.indent = line.indent.saturating_sub(self.code_indent_offset);
                    self.last_line_has_list_loosening_effect = false;
                } else {
                    line.line_type = LineType::Blank;
                    self.last_line_has_list_loosening_effect = n_parents > 0
                        && n_brothers + n_children == 0
                        && self.containers[n_parents - 1].ch != b'>';

                    // We are in a (yet empty) list item, but after the line
                    // with the list item mark. A list item can begin with at
                    // most one blank line, so any following non-blank line
                    // that would otherwise be part of this item has to end
                    // the list instead.
                    if n_parents > 0
                        && self.containers[n_parents - 1].ch != b'>'
                        && n_brothers + n_children == 0
                        && self.current_block.is_none()
                        && self
                            .blocks
                            .last()
                            .is_some_and(|b| b.kind == RecordKind::ListItem)
                    {
                        self.last_list_item_starts_with_two_blank_lines = true;
                    }
                }
                break;
            } else {
                // The second half of the two-blank-lines rule: if the flag
                // is set and we would otherwise still belong to the list
                // item, enforce the end of the list.
                if self.last_list_item_starts_with_two_blank_lines {
                    if n_parents > 0
                        && n_parents == self.containers.len()
                        && self.containers[n_parents - 1].ch != b'>'
                        && n_brothers + n_children == 0
                        && self.current_block.is_none()
                        && self
                            .blocks
                            .last()
                            .is_some_and(|b| b.kind == RecordKind::ListItem)
                    {
                        n_parents -= 1;

                        line.indent = total_indent;
                        if n_parents > 0 {
                            line.indent -= line
                                .indent
                                .min(self.containers[n_parents - 1].contents_indent);
                        }
                    }

                    self.last_list_item_starts_with_two_blank_lines = false;
                }
                self.last_line_has_list_loosening_effect = false;
            }

            // Check for a setext underline.
            if line.indent < self.code_indent_offset
                && pivot.line_type == LineType::Text
                && off < self.text.len()
                && matches!(self.text[off], b'=' | b'-')
                && n_parents == self.containers.len()
            {
                let mut level = 0;
                if self.is_setext_underline(off, &mut off, &mut level) {
                    line.line_type = LineType::SetextUnderline;
                    line.data = level;
                    break;
                }
            }

            // Check for a thematic break.
            if line.indent < self.code_indent_offset
                && off < self.text.len()
                && off >= hr_killer
                && matches!(self.text[off], b'-' | b'_' | b'*')
            {
                if self.is_hr_line(off, &mut off, &mut hr_killer) {
                    line.line_type = LineType::Hr;
                    break;
                }
            }

            // Check for a "brother" container, i.e. another list item in an
            // already started list.
            if n_parents < self.containers.len() && n_brothers + n_children == 0 {
                let mut tmp = 0;
                if self.is_container_mark(line.indent, off, &mut tmp, &mut container)
                    && Self::is_container_compatible(&self.containers[n_parents], &container)
                {
                    pivot = LineAnalysis::blank();

                    off = tmp;

                    total_indent += container.contents_indent - container.mark_indent;
                    line.indent = self.line_indentation(total_indent, off, &mut off);
                    total_indent += line.indent;
                    line.beg = off;

                    // Some of the following whitespace actually still
                    // belongs to the mark.
                    if off >= self.text.len() || is_newline(self.text[off]) {
                        container.contents_indent += 1;
                    } else if line.indent <= self.code_indent_offset {
                        container.contents_indent += line.indent;
                        line.indent = 0;
                    } else {
                        container.contents_indent += 1;
                        line.indent -= 1;
                    }

                    self.containers[n_parents].mark_indent = container.mark_indent;
                    self.containers[n_parents].contents_indent = container.contents_indent;

                    n_brothers += 1;
                    continue;
                }
            }

            // Check for indented code. It cannot interrupt a paragraph.
            if line.indent >= self.code_indent_offset && pivot.line_type != LineType::Text {
                line.line_type = LineType::IndentedCode;
                line.indent -= self.code_indent_offset;
                line.data = 0;
                break;
            }

            // Check for the start of a new container block.
            if line.indent < self.code_indent_offset
                && self.is_container_mark(line.indent, off, &mut off, &mut container)
            {
                if pivot.line_type == LineType::Text
                    && n_parents == self.containers.len()
                    && (off >= self.text.len() || is_newline(self.text[off]))
                    && container.ch != b'>'
                {
                    // Noop. A list mark followed by a blank line cannot
                    // interrupt a paragraph.
                } else if pivot.line_type == LineType::Text
                    && n_parents == self.containers.len()
                    && matches!(container.ch, b'.' | b')')
                    && container.start != 1
                {
                    // Noop. An ordered list cannot interrupt a paragraph
                    // unless its start index is 1.
                } else {
                    total_indent += container.contents_indent - container.mark_indent;
                    line.indent = self.line_indentation(total_indent, off, &mut off);
                    total_indent += line.indent;

                    line.beg = off;

                    // Some of the following whitespace actually still
                    // belongs to the mark.
                    if off >= self.text.len() || is_newline(self.text[off]) {
                        container.contents_indent += 1;
                    } else if line.indent <= self.code_indent_offset {
                        container.contents_indent += line.indent;
                        line.indent = 0;
                    } else {
                        container.contents_indent += 1;
                        line.indent -= 1;
                    }

                    if n_brothers + n_children == 0 {
                        pivot = LineAnalysis::blank();
                    }

                    if n_children == 0 {
                        self.leave_child_containers(n_parents + n_brothers);
                    }

                    n_children += 1;
                    self.containers.push(container);
                    continue;
                }
            }

            // Check whether this is a table continuation.
            if pivot.line_type == LineType::Table && n_parents == self.containers.len() {
                line.line_type = LineType::Table;
                break;
            }

            // Check for an ATX header.
            if line.indent < self.code_indent_offset
                && off < self.text.len()
                && self.text[off] == b'#'
            {
                let mut level = 0;
                if self.is_atxheader_line(off, &mut line.beg, &mut off, &mut level) {
                    line.line_type = LineType::AtxHeader;
                    line.data = level;
                    break;
                }
            }

            // Check whether this opens a code fence.
            if line.indent < self.code_indent_offset
                && off < self.text.len()
                && matches!(self.text[off], b'`' | b'~')
            {
                if self.is_opening_code_fence(off, &mut off) {
                    line.line_type = LineType::FencedCode;
                    line.data = 1;
                    line.enforce_new_block = true;
                    break;
                }
            }

            // Check for the start of a raw HTML block.
            if off < self.text.len()
                && self.text[off] == b'<'
                && !self.options.contains(ParserOptions::NO_HTML_BLOCKS)
            {
                self.html_block_type =
                    raw_html::html_block_start_condition(self.text, off);

                // HTML block type 7 cannot interrupt a paragraph.
                if self.html_block_type == 7 && pivot.line_type == LineType::Text {
                    self.html_block_type = 0;
                }

                if self.html_block_type > 0 {
                    // The line itself may immediately close the block.
                    if self.is_html_block_end_condition(off, &mut off) == self.html_block_type {
                        self.html_block_type = 0;
                    }

                    line.enforce_new_block = true;
                    line.line_type = LineType::Html;
                    break;
                }
            }

            // Check for a table underline.
            if self.options.contains(ParserOptions::TABLES)
                && pivot.line_type == LineType::Text
                && off < self.text.len()
                && matches!(self.text[off], b'|' | b'-' | b':')
                && n_parents == self.containers.len()
            {
                let mut col_count = 0;
                if self
                    .current_block
                    .is_some_and(|index| self.blocks[index].n_lines == 1)
                    && self.is_table_underline(off, &mut off, &mut col_count)
                {
                    line.data = col_count;
                    line.line_type = LineType::TableUnderline;
                    break;
                }
            }

            // By default, this is a normal text line.
            line.line_type = LineType::Text;
            if pivot.line_type == LineType::Text && n_brothers + n_children == 0 {
                // Lazy continuation.
                n_parents = self.containers.len();
            }

            // Check for a task mark.
            if self.options.contains(ParserOptions::TASK_LISTS)
                && n_brothers + n_children > 0
                && matches!(
                    self.containers.last().map(|c| c.ch),
                    Some(b'-' | b'+' | b'*' | b'.' | b')')
                )
            {
                let mut tmp = off;
                while tmp < self.text.len() && tmp < off + 3 && is_blank(self.text[tmp]) {
                    tmp += 1;
                }
                if tmp + 2 < self.text.len()
                    && self.text[tmp] == b'['
                    && matches!(self.text[tmp + 1], b'x' | b'X' | b' ')
                    && self.text[tmp + 2] == b']'
                    && (tmp + 3 == self.text.len()
                        || is_blank(self.text[tmp + 3])
                        || is_newline(self.text[tmp + 3]))
                {
                    let task_container = if n_children > 0 {
                        self.containers.last_mut().unwrap()
                    } else {
                        &mut container
                    };
                    task_container.is_task = true;
                    task_container.task_mark_off = tmp + 1;
                    off = tmp + 3;
                    while off < self.text.len() && is_whitespace(self.text[off]) {
                        off += 1;
                    }
                    line.beg = off;
                }
            }

            break;
        }

        // Scan to the end of the line.
        off += memchr2(b'\r', b'\n', &self.text[off..]).unwrap_or(self.text.len() - off);
        line.end = off;

        // For an ATX header, exclude the optional trailing mark.
        if line.line_type == LineType::AtxHeader {
            let mut tmp = line.end;
            while tmp > line.beg && is_blank(self.text[tmp - 1]) {
                tmp -= 1;
            }
            while tmp > line.beg && self.text[tmp - 1] == b'#' {
                tmp -= 1;
            }
            if tmp == line.beg
                || is_blank(self.text[tmp - 1])
                || self.options.contains(ParserOptions::PERMISSIVE_ATX_HEADERS)
            {
                line.end = tmp;
            }
        }

        // Trim trailing spaces.
        if !matches!(
            line.line_type,
            LineType::IndentedCode | LineType::FencedCode | LineType::Html
        ) {
            while line.end > line.beg && is_blank(self.text[line.end - 1]) {
                line.end -= 1;
            }
        }

        // Eat the new line.
        if off < self.text.len() && self.text[off] == b'\r' {
            off += 1;
        }
        if off < self.text.len() && self.text[off] == b'\n' {
            off += 1;
        }

        *p_off = off;

        // If we still belong to a list after seeing a blank line, the list
        // is loose.
        if prev_line_has_list_loosening_effect
            && line.line_type != LineType::Blank
            && n_parents + n_brothers > 0
        {
            let c = &self.containers[n_parents + n_brothers - 1];
            if c.ch != b'>' {
                self.blocks[c.block_index].flags |= BlockFlags::LOOSE_LIST;
            }
        }

        // Leave any containers we are no longer part of.
        if n_children == 0 && n_parents + n_brothers < self.containers.len() {
            self.leave_child_containers(n_parents + n_brothers);
        }

        // Enter any container we found a mark for.
        if n_brothers > 0 {
            debug_assert!(n_brothers == 1);
            let old = self.containers[n_parents];
            self.push_container_record(
                RecordKind::ListItem,
                old.task_mark_off,
                if old.is_task {
                    self.text[old.task_mark_off] as u32
                } else {
                    0
                },
                BlockFlags::CONTAINER_CLOSER,
            );
            self.push_container_record(
                RecordKind::ListItem,
                container.task_mark_off,
                if container.is_task {
                    self.text[container.task_mark_off] as u32
                } else {
                    0
                },
                BlockFlags::CONTAINER_OPENER,
            );
            self.containers[n_parents].is_task = container.is_task;
            self.containers[n_parents].task_mark_off = container.task_mark_off;
        }

        if n_children > 0 {
            self.enter_child_containers(n_children);
        }

        line
    }

    fn process_line(&mut self, pivot: &mut LineAnalysis, mut line: LineAnalysis) {
        // A blank line ends the current leaf block.
        if line.line_type == LineType::Blank {
            self.end_current_block();
            *pivot = LineAnalysis::blank();
            return;
        }

        if line.enforce_new_block {
            self.end_current_block();
        }

        // Some line types form a block on their own.
        if matches!(line.line_type, LineType::Hr | LineType::AtxHeader) {
            self.end_current_block();
            self.start_new_block(&line);
            self.add_line_into_current_block(&line);
            self.end_current_block();
            *pivot = LineAnalysis::blank();
            return;
        }

        // A setext underline changes the meaning of the current block and
        // ends it.
        if line.line_type == LineType::SetextUnderline {
            let index = self.current_block.expect("setext underline without a block");
            self.blocks[index].kind = RecordKind::Heading;
            self.blocks[index].data = line.data;
            self.blocks[index].flags |= BlockFlags::SETEXT_HEADER;
            self.add_line_into_current_block(&line);
            self.end_current_block();
            if self.current_block.is_none() {
                *pivot = LineAnalysis::blank();
            } else {
                // The whole body was consumed as reference definitions and
                // the underline was downgraded into a new paragraph block.
                line.line_type = LineType::Text;
                *pivot = line;
            }
            return;
        }

        // A table underline changes the meaning of the current block.
        if line.line_type == LineType::TableUnderline {
            let index = self.current_block.expect("table underline without a block");
            debug_assert!(self.blocks[index].n_lines == 1);
            self.blocks[index].kind = RecordKind::Table;
            self.blocks[index].data = line.data;
            pivot.line_type = LineType::Table;
            self.add_line_into_current_block(&line);
            return;
        }

        // The current block also ends if the line has a different type.
        if line.line_type != pivot.line_type {
            self.end_current_block();
        }

        // The current line may start a new block.
        if self.current_block.is_none() {
            self.start_new_block(&line);
            *pivot = line;
        }

        // In all other cases the line is just a continuation of the
        // current block.
        self.add_line_into_current_block(&line);
    }
}

/// Find the line containing `off`; if the offset falls into a gap between
/// lines, return the following line.
pub(crate) fn lookup_line(off: usize, lines: &[LineSpan]) -> Option<(usize, &LineSpan)> {
    let index = lines.partition_point(|line| line.end < off);
    lines.get(index).map(|line| (index, line))
}

/// Scan from `beg` to the next newline. Used by recognizers that must not
/// cross a physical line.
pub(crate) fn scan_line_end(text: &[u8], beg: usize) -> usize {
    beg + memchr(b'\n', &text[beg..]).unwrap_or(text.len() - beg)
}

#[cfg(test)]
mod test {
    use super::*;
    use test_case::test_case;

    fn kinds(input: &str, options: ParserOptions) -> Vec<(RecordKind, BlockFlags)> {
        let parsed = BlockParser::new(input, options).parse_into_blocks();
        parsed
            .blocks
            .iter()
            .map(|b| (b.kind, b.flags))
            .collect()
    }

    #[test]
    fn groups_paragraph_lines() {
        let parsed =
            BlockParser::new("first\nsecond\n\nthird\n", ParserOptions::empty()).parse_into_blocks();
        assert_eq!(parsed.blocks.len(), 2);
        assert_eq!(parsed.blocks[0].kind, RecordKind::Paragraph);
        assert_eq!(parsed.blocks[0].n_lines, 2);
        assert_eq!(parsed.blocks[1].kind, RecordKind::Paragraph);
        assert_eq!(parsed.blocks[1].n_lines, 1);
    }

    #[test]
    fn wraps_list_items_in_container_records() {
        let found = kinds("- a\n- b\n", ParserOptions::empty());
        let expected = vec![
            (RecordKind::UnorderedList, BlockFlags::CONTAINER_OPENER),
            (RecordKind::ListItem, BlockFlags::CONTAINER_OPENER),
            (RecordKind::Paragraph, BlockFlags::empty()),
            (RecordKind::ListItem, BlockFlags::CONTAINER_CLOSER),
            (RecordKind::ListItem, BlockFlags::CONTAINER_OPENER),
            (RecordKind::Paragraph, BlockFlags::empty()),
            (RecordKind::ListItem, BlockFlags::CONTAINER_CLOSER),
            (RecordKind::UnorderedList, BlockFlags::CONTAINER_CLOSER),
        ];
        assert_eq!(found, expected);
    }

    #[test]
    fn loose_list_is_stamped_on_the_opener() {
        let parsed =
            BlockParser::new("- a\n\n- b\n", ParserOptions::empty()).parse_into_blocks();
        assert!(parsed.blocks[0].flags.contains(BlockFlags::LOOSE_LIST));
    }

    #[test_case("# title\n", 1; "level one")]
    #[test_case("### title ###\n", 3; "closed heading")]
    #[test_case("###### title\n", 6; "level six")]
    fn atx_headings(input: &str, level: u32) {
        let parsed = BlockParser::new(input, ParserOptions::empty()).parse_into_blocks();
        assert_eq!(parsed.blocks[0].kind, RecordKind::Heading);
        assert_eq!(parsed.blocks[0].data, level);
    }

    #[test]
    fn seven_hashes_are_a_paragraph() {
        let parsed = BlockParser::new("####### x\n", ParserOptions::empty()).parse_into_blocks();
        assert_eq!(parsed.blocks[0].kind, RecordKind::Paragraph);
    }

    #[test]
    fn setext_underline_merges_into_heading() {
        let parsed = BlockParser::new("title\n=====\n", ParserOptions::empty()).parse_into_blocks();
        assert_eq!(parsed.blocks.len(), 1);
        assert_eq!(parsed.blocks[0].kind, RecordKind::Heading);
        assert_eq!(parsed.blocks[0].data, 1);
        assert_eq!(parsed.blocks[0].n_lines, 1);
    }

    #[test]
    fn fenced_code_keeps_the_opening_fence_line() {
        let parsed =
            BlockParser::new("```rust\nlet x;\n```\n", ParserOptions::empty()).parse_into_blocks();
        assert_eq!(parsed.blocks[0].kind, RecordKind::Code);
        // Fence line plus one content line; the closing fence becomes blank.
        assert_eq!(parsed.blocks[0].n_lines, 2);
    }

    #[test]
    fn table_underline_retypes_the_paragraph() {
        let parsed = BlockParser::new("| a |\n|---|\n| 1 |\n", ParserOptions::TABLES)
            .parse_into_blocks();
        assert_eq!(parsed.blocks[0].kind, RecordKind::Table);
        assert_eq!(parsed.blocks[0].data, 1);
        assert_eq!(parsed.blocks[0].n_lines, 3);
    }

    #[test]
    fn reference_definition_block_disappears() {
        let parsed =
            BlockParser::new("[foo]: /url\n\ntext\n", ParserOptions::empty()).parse_into_blocks();
        assert_eq!(parsed.blocks.len(), 1);
        assert_eq!(parsed.blocks[0].kind, RecordKind::Paragraph);
    }
}
