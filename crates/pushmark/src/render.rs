//! The render driver: walks the block list in document order, runs inline
//! analysis per leaf block, and emits the event stream.

use crate::attribute::{build_attribute, Attribute};
use crate::block_parser::{BlockFlags, BlockRecord, LineSpan, RecordKind};
use crate::byte_lookup::{is_blank, is_newline, is_whitespace};
use crate::event::{
    Align, Block, CodeDetail, EventSink, HeadingDetail, ImageDetail, LinkDetail, ListItemDetail,
    OrderedListDetail, Span, TableCellDetail, TableDetail, TextKind, UnorderedListDetail,
    WikiLinkDetail,
};
use crate::options::ParserOptions;
use crate::parser::delimiter::{MarkFlags, SENTINEL};
use crate::parser::Parser;

impl<'text, S: EventSink> Parser<'text, '_, S> {
    pub(crate) fn process_document(
        &mut self,
        blocks: &[BlockRecord],
        lines: &[LineSpan],
    ) -> Result<(), S::Error> {
        self.sink.enter_block(&Block::Document)?;
        self.process_all_blocks(blocks, lines)?;
        self.sink.leave_block(&Block::Document)
    }

    fn container_block_value(&self, block: &BlockRecord) -> Block<'text> {
        match block.kind {
            RecordKind::Quote => Block::Quote,
            RecordKind::UnorderedList => Block::UnorderedList(UnorderedListDetail {
                is_tight: !block.flags.contains(BlockFlags::LOOSE_LIST),
                mark: block.data as u8 as char,
            }),
            RecordKind::OrderedList => Block::OrderedList(OrderedListDetail {
                start: block.aux as u32,
                is_tight: !block.flags.contains(BlockFlags::LOOSE_LIST),
                mark_delimiter: block.data as u8 as char,
            }),
            RecordKind::ListItem => Block::ListItem(ListItemDetail {
                is_task: block.data != 0,
                task_mark: block.data as u8 as char,
                task_mark_offset: block.aux,
            }),
            _ => unreachable!("not a container record"),
        }
    }

    fn process_all_blocks(
        &mut self,
        blocks: &[BlockRecord],
        lines: &[LineSpan],
    ) -> Result<(), S::Error> {
        // The container stack is reused here to track which open lists are
        // loose or tight while rendering.
        self.container_looseness.clear();

        for block in blocks {
            if block.flags.is_container() {
                let value = self.container_block_value(block);

                if block.flags.contains(BlockFlags::CONTAINER_CLOSER) {
                    self.sink.leave_block(&value)?;

                    if matches!(
                        block.kind,
                        RecordKind::UnorderedList | RecordKind::OrderedList | RecordKind::Quote
                    ) {
                        self.container_looseness.pop();
                    }
                }

                if block.flags.contains(BlockFlags::CONTAINER_OPENER) {
                    self.sink.enter_block(&value)?;

                    match block.kind {
                        RecordKind::UnorderedList | RecordKind::OrderedList => self
                            .container_looseness
                            .push(block.flags.contains(BlockFlags::LOOSE_LIST)),
                        // Any text in a block quote is wrapped in a
                        // paragraph, even when nested in a tight list item.
                        RecordKind::Quote => self.container_looseness.push(true),
                        _ => {}
                    }
                }
            } else {
                let block_lines = &lines[block.first_line..block.first_line + block.n_lines];
                self.process_leaf_block(block, block_lines)?;
            }
        }

        Ok(())
    }

    /// Build the `info` / `lang` attributes of a fenced code block out of
    /// its opening fence line.
    fn fenced_code_block_value(&self, fence_line: &LineSpan) -> Block<'text> {
        let text = self.bytes;
        let fence_char = text[fence_line.beg];

        // Skip the fence itself, then trim spaces on both sides.
        let mut beg = fence_line.beg;
        while beg < text.len() && text[beg] == fence_char {
            beg += 1;
        }
        while beg < text.len() && text[beg] == b' ' {
            beg += 1;
        }
        let mut end = fence_line.end;
        while end > beg && text[end - 1] == b' ' {
            end -= 1;
        }

        let mut lang_end = beg;
        while lang_end < end && !is_whitespace(text[lang_end]) {
            lang_end += 1;
        }

        Block::Code(CodeDetail {
            info: build_attribute(&self.text[beg..end], false),
            lang: build_attribute(&self.text[beg..lang_end], false),
            fence_char: Some(fence_char as char),
        })
    }

    fn process_leaf_block(
        &mut self,
        block: &BlockRecord,
        lines: &[LineSpan],
    ) -> Result<(), S::Error> {
        let is_in_tight_list = self.container_looseness.last().is_some_and(|loose| !loose);

        let value: Block<'text> = match block.kind {
            RecordKind::Hr => Block::ThematicBreak,
            RecordKind::Heading => Block::Heading(HeadingDetail {
                level: block.data as u8,
            }),
            RecordKind::Code if block.data != 0 => self.fenced_code_block_value(&lines[0]),
            RecordKind::Code => Block::Code(CodeDetail {
                info: Attribute::empty(),
                lang: Attribute::empty(),
                fence_char: None,
            }),
            RecordKind::Html => Block::Html,
            RecordKind::Paragraph => Block::Paragraph,
            RecordKind::Table => Block::Table(TableDetail {
                col_count: block.data,
                head_row_count: 1,
                body_row_count: (block.n_lines - 2) as u32,
            }),
            _ => unreachable!("container record reached leaf processing"),
        };

        // In a tight list, paragraph boundaries are suppressed so the
        // inlines attach directly to the list item.
        let suppress = is_in_tight_list && block.kind == RecordKind::Paragraph;

        if !suppress {
            self.sink.enter_block(&value)?;
        }

        match block.kind {
            RecordKind::Hr => {}
            RecordKind::Code => self.process_code_block_contents(block.data != 0, lines)?,
            RecordKind::Html => self.process_verbatim_block_contents(TextKind::Html, lines)?,
            RecordKind::Table => self.process_table_block_contents(block.data, lines)?,
            _ => self.process_normal_block_contents(lines)?,
        }

        if !suppress {
            self.sink.leave_block(&value)?;
        }

        Ok(())
    }

    //#region Verbatim blocks

    /// Emit a text range, replacing any null bytes with NULLCHAR events.
    fn text_with_null_replacement(
        &mut self,
        kind: TextKind,
        beg: usize,
        end: usize,
    ) -> Result<(), S::Error> {
        let mut off = beg;
        while off < end {
            let chunk_end = self.bytes[off..end]
                .iter()
                .position(|b| *b == b'\0')
                .map_or(end, |pos| off + pos);

            if chunk_end > off {
                self.sink.text(kind, &self.text[off..chunk_end])?;
            }
            if chunk_end >= end {
                break;
            }

            self.sink.text(TextKind::NullChar, "\u{fffd}")?;
            off = chunk_end + 1;
        }

        Ok(())
    }

    fn process_verbatim_block_contents(
        &mut self,
        kind: TextKind,
        lines: &[LineSpan],
    ) -> Result<(), S::Error> {
        const INDENT_CHUNK: &str = "                ";

        for line in lines {
            // Re-emit the residual indentation.
            let mut indent = line.indent as usize;
            while indent > 0 {
                let chunk = indent.min(INDENT_CHUNK.len());
                self.sink.text(kind, &INDENT_CHUNK[..chunk])?;
                indent -= chunk;
            }

            self.text_with_null_replacement(kind, line.beg, line.end)?;

            // Enforce the end of line.
            self.sink.text(kind, "\n")?;
        }

        Ok(())
    }

    fn process_code_block_contents(
        &mut self,
        is_fenced: bool,
        lines: &[LineSpan],
    ) -> Result<(), S::Error> {
        let mut lines = lines;

        if is_fenced {
            // The first line is the fence itself. (Only the opening fence
            // is present; the closing one is dropped in line analysis.)
            lines = &lines[1..];
        } else {
            // Ignore blank lines at the start and end of an indented block.
            while let Some(first) = lines.first() {
                if first.beg != first.end {
                    break;
                }
                lines = &lines[1..];
            }
            while let Some(last) = lines.last() {
                if last.beg != last.end {
                    break;
                }
                lines = &lines[..lines.len() - 1];
            }
        }

        if lines.is_empty() {
            return Ok(());
        }

        self.process_verbatim_block_contents(TextKind::Code, lines)
    }
    //#endregion

    //#region Tables

    fn analyze_table_alignment(&self, beg: usize, end: usize, aligns: &mut [Align]) {
        let text = self.bytes;
        let mut off = beg;

        for slot in aligns.iter_mut() {
            while off < end && text[off] != b'-' {
                off += 1;
            }
            let mut index = 0;
            if off > beg && off > 0 && text[off - 1] == b':' {
                index |= 1;
            }
            while off < end && text[off] == b'-' {
                off += 1;
            }
            if off < end && text[off] == b':' {
                index |= 2;
            }

            *slot = [Align::Default, Align::Left, Align::Right, Align::Center][index];
        }
    }

    fn process_table_cell(
        &mut self,
        is_header: bool,
        align: Align,
        mut beg: usize,
        mut end: usize,
    ) -> Result<(), S::Error> {
        while beg < end && is_whitespace(self.bytes[beg]) {
            beg += 1;
        }
        while end > beg && is_whitespace(self.bytes[end - 1]) {
            end -= 1;
        }

        let cell = [LineSpan {
            beg,
            end,
            indent: 0,
        }];
        let detail = TableCellDetail { align };
        let value = if is_header {
            Block::TableHeaderCell(detail)
        } else {
            Block::TableCell(detail)
        };

        self.sink.enter_block(&value)?;
        self.process_normal_block_contents(&cell)?;
        self.sink.leave_block(&value)
    }

    fn process_table_row(
        &mut self,
        is_header: bool,
        row: &LineSpan,
        aligns: &[Align],
    ) -> Result<(), S::Error> {
        let row_lines = [*row];

        // Identify the pipes forming the cell boundaries. The boundary
        // offsets are copied out because the marks are reused while the
        // cell contents are processed.
        self.analyze_inlines(&row_lines, true);
        let mut pipe_offs = Vec::with_capacity(self.table_cell_boundaries.len() + 2);
        pipe_offs.push(row.beg);
        for &boundary in &self.table_cell_boundaries {
            pipe_offs.push(self.marks[boundary].end);
        }
        pipe_offs.push(row.end + 1);

        self.sink.enter_block(&Block::TableRow)?;
        let mut k = 0;
        for i in 0..pipe_offs.len() - 1 {
            if k >= aligns.len() {
                break;
            }
            if pipe_offs[i] < pipe_offs[i + 1] - 1 {
                self.process_table_cell(is_header, aligns[k], pipe_offs[i], pipe_offs[i + 1] - 1)?;
                k += 1;
            }
        }
        // Emit enough cells even if this row contains too few of them.
        while k < aligns.len() {
            self.process_table_cell(is_header, aligns[k], 0, 0)?;
            k += 1;
        }
        self.sink.leave_block(&Block::TableRow)?;

        self.table_cell_boundaries.clear();
        Ok(())
    }

    fn process_table_block_contents(
        &mut self,
        col_count: u32,
        lines: &[LineSpan],
    ) -> Result<(), S::Error> {
        // The column headers and the underline are always present.
        debug_assert!(lines.len() >= 2);

        let mut aligns = vec![Align::Default; col_count as usize];
        self.analyze_table_alignment(lines[1].beg, lines[1].end, &mut aligns);

        self.sink.enter_block(&Block::TableHead)?;
        self.process_table_row(true, &lines[0], &aligns)?;
        self.sink.leave_block(&Block::TableHead)?;

        if lines.len() > 2 {
            self.sink.enter_block(&Block::TableBody)?;
            for row in &lines[2..] {
                self.process_table_row(false, row, &aligns)?;
            }
            self.sink.leave_block(&Block::TableBody)?;
        }

        Ok(())
    }
    //#endregion

    //#region Inline contents

    fn process_normal_block_contents(&mut self, lines: &[LineSpan]) -> Result<(), S::Error> {
        self.analyze_inlines(lines, false);
        self.process_inlines(lines)
    }

    /// Render the block contents according to the analyzed marks.
    fn process_inlines(&mut self, lines: &[LineSpan]) -> Result<(), S::Error> {
        let text = self.bytes;
        let end = lines[lines.len() - 1].end;

        let mut line_index = 0;
        let mut line = lines[0];
        let mut off = line.beg;
        let mut text_type = TextKind::Normal;
        let mut enforce_hardbreak = false;

        // Find the first resolved mark. There is always at least one: the
        // sentinel past the end of the last line, which is never actually
        // reached. This saves a lot of special cases below.
        let mut mark_index = 0;
        while !self.marks[mark_index].is_resolved() {
            mark_index += 1;
        }

        loop {
            // Process the text up to the next mark or end of line.
            let tmp = line.end.min(self.marks[mark_index].beg);
            if tmp > off {
                self.sink.text(text_type, &self.text[off..tmp])?;
                off = tmp;
            }

            // If the mark is reached, process it and move to the next one.
            if off >= self.marks[mark_index].beg {
                let mark_ch = self.marks[mark_index].ch;
                let mark_beg = self.marks[mark_index].beg;
                let mark_end = self.marks[mark_index].end;
                let mark_flags = self.marks[mark_index].flags;

                match mark_ch {
                    // Backslash escape.
                    b'\\' => {
                        if is_newline(text[mark_beg + 1]) {
                            enforce_hardbreak = true;
                        } else {
                            self.sink
                                .text(text_type, &self.text[mark_beg + 1..mark_beg + 2])?;
                        }
                    }

                    // Non-trivial whitespace run.
                    ch if is_whitespace(ch) => {
                        self.sink.text(text_type, " ")?;
                    }

                    // Code span.
                    b'`' => {
                        if mark_flags.contains(MarkFlags::OPENER) {
                            self.sink.enter_span(&Span::Code)?;
                            text_type = TextKind::Code;
                        } else {
                            self.sink.leave_span(&Span::Code)?;
                            text_type = TextKind::Normal;
                        }
                    }

                    // Underline, or emphasis when the extension is off.
                    b'_' if self.options.contains(ParserOptions::UNDERLINE) => {
                        let count = mark_end - mark_beg;
                        for _ in 0..count {
                            if mark_flags.contains(MarkFlags::OPENER) {
                                self.sink.enter_span(&Span::Underline)?;
                            } else {
                                self.sink.leave_span(&Span::Underline)?;
                            }
                        }
                    }

                    // Emphasis and strong emphasis.
                    b'*' | b'_' => {
                        let mut run = mark_end - mark_beg;
                        if mark_flags.contains(MarkFlags::OPENER) {
                            if run % 2 == 1 {
                                self.sink.enter_span(&Span::Emphasis)?;
                                run -= 1;
                            }
                            while run > 0 {
                                self.sink.enter_span(&Span::Strong)?;
                                run -= 2;
                            }
                        } else {
                            while run > 1 {
                                self.sink.leave_span(&Span::Strong)?;
                                run -= 2;
                            }
                            if run == 1 {
                                self.sink.leave_span(&Span::Emphasis)?;
                            }
                        }
                    }

                    b'~' => {
                        if mark_flags.contains(MarkFlags::OPENER) {
                            self.sink.enter_span(&Span::Strikethrough)?;
                        } else {
                            self.sink.leave_span(&Span::Strikethrough)?;
                        }
                    }

                    b'$' => {
                        let span = if (mark_end - mark_beg) % 2 == 1 {
                            Span::LatexMath
                        } else {
                            Span::LatexMathDisplay
                        };
                        if mark_flags.contains(MarkFlags::OPENER) {
                            self.sink.enter_span(&span)?;
                            text_type = TextKind::LatexMath;
                        } else {
                            self.sink.leave_span(&span)?;
                            text_type = TextKind::Normal;
                        }
                    }

                    // Link, wiki link or image.
                    b'[' | b'!' | b']' => {
                        let entering = mark_ch != b']';
                        let opener_index = if entering {
                            mark_index
                        } else {
                            self.marks[mark_index].prev.unwrap()
                        };
                        let closer_index = self.marks[opener_index].next.unwrap();

                        let opener_ch = self.marks[opener_index].ch;
                        let opener_beg = self.marks[opener_index].beg;
                        let opener_end = self.marks[opener_index].end;
                        let closer_ch = self.marks[closer_index].ch;
                        let closer_beg = self.marks[closer_index].beg;
                        let closer_len = self.marks[closer_index].len();

                        if opener_ch == b'['
                            && closer_ch == b']'
                            && opener_end - opener_beg >= 2
                            && closer_len >= 2
                        {
                            // Wiki link: the opener spans "[[" or
                            // "[[target|" when there is a label.
                            let has_label = opener_end - opener_beg > 2;
                            let target = if has_label {
                                &self.text[opener_beg + 2..opener_end]
                            } else {
                                &self.text[opener_end..closer_beg]
                            };

                            let span = Span::WikiLink(WikiLinkDetail {
                                target: build_attribute(target, false),
                            });
                            if entering {
                                self.sink.enter_span(&span)?;
                            } else {
                                self.sink.leave_span(&span)?;
                            }
                        } else {
                            let attr_index = self.marks[opener_index].link_attr.unwrap();
                            let (dest_beg, dest_end) = (
                                self.resolved_links[attr_index].dest_beg,
                                self.resolved_links[attr_index].dest_end,
                            );
                            let href = build_attribute(&self.text[dest_beg..dest_end], false);
                            let title_text: &str = &self.resolved_links[attr_index].title;
                            let title = build_attribute(title_text, false);

                            let span = if opener_ch == b'!' {
                                Span::Image(ImageDetail { src: href, title })
                            } else {
                                Span::Link(LinkDetail {
                                    href,
                                    title,
                                    is_autolink: false,
                                })
                            };
                            if entering {
                                self.sink.enter_span(&span)?;
                            } else {
                                self.sink.leave_span(&span)?;
                            }

                            // A link closer may span multiple lines.
                            if !entering {
                                while mark_end > line.end {
                                    line_index += 1;
                                    line = lines[line_index];
                                }
                            }
                        }
                    }

                    // Raw HTML, autolinks, permissive autolinks.
                    b'<' | b'>' | b'@' | b':' | b'.' => {
                        if matches!(mark_ch, b'<' | b'>')
                            && !mark_flags.contains(MarkFlags::AUTOLINK)
                        {
                            // Raw HTML.
                            if mark_flags.contains(MarkFlags::OPENER) {
                                text_type = TextKind::Html;
                            } else {
                                text_type = TextKind::Normal;
                            }
                        } else {
                            let entering = mark_flags.contains(MarkFlags::OPENER);
                            let opener_index = if entering {
                                mark_index
                            } else {
                                self.marks[mark_index].prev.unwrap()
                            };
                            let closer_index = self.marks[opener_index].next.unwrap();

                            // A permissive closer can precede its opener in
                            // mark order, since its final position is only
                            // known at resolution. Only emit the closer if
                            // the opener was actually processed.
                            if entering {
                                self.marks[closer_index].flags |=
                                    MarkFlags::VALID_PERMISSIVE_AUTOLINK;
                            }

                            if self.marks[closer_index]
                                .flags
                                .contains(MarkFlags::VALID_PERMISSIVE_AUTOLINK)
                            {
                                let opener_ch = self.marks[opener_index].ch;
                                let opener_flags = self.marks[opener_index].flags;
                                let dest_beg = self.marks[opener_index].end;
                                let dest_end = self.marks[closer_index].beg;

                                // Autolinks with an implied scheme get it
                                // prepended in the scratch buffer.
                                let needs_prefix = opener_ch == b'@'
                                    || opener_ch == b'.'
                                    || (opener_ch == b'<'
                                        && opener_flags
                                            .contains(MarkFlags::AUTOLINK_MISSING_MAILTO));

                                let href = if needs_prefix {
                                    self.buffer.clear();
                                    self.buffer.push_str(if opener_ch == b'.' {
                                        "http://"
                                    } else {
                                        "mailto:"
                                    });
                                    self.buffer.push_str(&self.text[dest_beg..dest_end]);
                                    build_attribute(&self.buffer, true)
                                } else {
                                    build_attribute(&self.text[dest_beg..dest_end], true)
                                };

                                let span = Span::Link(LinkDetail {
                                    href,
                                    title: Attribute::empty(),
                                    is_autolink: true,
                                });
                                if entering {
                                    self.sink.enter_span(&span)?;
                                } else {
                                    self.sink.leave_span(&span)?;
                                }
                            }
                        }
                    }

                    // Entity, passed through in its raw form.
                    b'&' => {
                        self.sink
                            .text(TextKind::Entity, &self.text[mark_beg..mark_end])?;
                    }

                    b'\0' => {
                        self.sink.text(TextKind::NullChar, "\u{fffd}")?;
                    }

                    SENTINEL => return Ok(()),

                    _ => {}
                }

                off = mark_end;

                // Move to the next resolved mark.
                mark_index += 1;
                while !self.marks[mark_index].is_resolved() || self.marks[mark_index].beg < off {
                    mark_index += 1;
                }
            }

            // If the end of line is reached, move to the next one.
            if off >= line.end {
                // If it is the last line, we are done.
                if off >= end {
                    break;
                }

                match text_type {
                    TextKind::Code | TextKind::LatexMath => {
                        // Inside a code span, trailing line whitespace has
                        // to be output.
                        let tmp = off;
                        while off < text.len() && is_blank(text[off]) {
                            off += 1;
                        }
                        if off > tmp {
                            self.sink.text(text_type, &self.text[tmp..off])?;
                        }

                        // New lines are transformed into single spaces.
                        if off == line.end {
                            self.sink.text(text_type, " ")?;
                        }
                    }
                    TextKind::Html => {
                        // Inside raw HTML, the new line is output verbatim,
                        // including any trailing spaces.
                        let mut tmp = off;
                        while tmp < end && is_blank(text[tmp]) {
                            tmp += 1;
                        }
                        if tmp > off {
                            self.sink.text(TextKind::Html, &self.text[off..tmp])?;
                        }
                        self.sink.text(TextKind::Html, "\n")?;
                    }
                    _ => {
                        // Output a soft or hard line break.
                        let mut break_type = TextKind::SoftBreak;

                        if text_type == TextKind::Normal {
                            if enforce_hardbreak
                                || self.options.contains(ParserOptions::HARD_SOFT_BREAKS)
                            {
                                break_type = TextKind::HardBreak;
                            } else {
                                while off < text.len() && is_blank(text[off]) {
                                    off += 1;
                                }
                                if off >= line.end + 2
                                    && text[off - 2] == b' '
                                    && text[off - 1] == b' '
                                    && off < text.len()
                                    && is_newline(text[off])
                                {
                                    break_type = TextKind::HardBreak;
                                }
                            }
                        }

                        self.sink.text(break_type, "\n")?;
                    }
                }

                // Move to the next line.
                line_index += 1;
                line = lines[line_index];
                off = line.beg;

                enforce_hardbreak = false;
            }
        }

        Ok(())
    }
    //#endregion
}
