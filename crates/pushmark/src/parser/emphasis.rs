//! Emphasis resolution for `*` and `_` runs.
//!
//! The CommonMark "rule of three" is applied in O(1) by keying opener
//! stacks on the delimiter, its opener-only/opener-and-closer status and
//! its original length mod 3. A closer probes up to six candidate stacks
//! and takes the most recent opener across them; length mismatches split
//! the longer run over its reserved dummy marks.

use crate::event::EventSink;

use super::delimiter::{emph_stack_index, Mark, MarkFlags, Rollback, DUMMY};
use super::Parser;

impl<'text, S: EventSink> Parser<'text, '_, S> {
    /// Split the mark at `mark_index` in two, with the new mark taking the
    /// trailing `n` characters. May only be called while an adequate
    /// number of dummy marks follows.
    fn split_emph_mark(&mut self, mark_index: usize, n: usize) -> usize {
        let mark = self.marks[mark_index].clone();
        let new_mark_index = mark_index + (mark.len() - n);

        debug_assert!(mark.len() > n);
        debug_assert!(self.marks[new_mark_index].ch == DUMMY);

        self.marks[new_mark_index] = Mark::new(mark.ch, mark.end - n, mark.end, mark.flags);
        self.marks[mark_index].end -= n;

        new_mark_index
    }

    pub(super) fn analyze_emph(&mut self, mark_index: usize) {
        let flags = self.marks[mark_index].flags;
        let ch = self.marks[mark_index].ch;

        // If this can be a closer, try to resolve against a preceding
        // opener.
        if flags.contains(MarkFlags::POTENTIAL_CLOSER) {
            let mod3 = flags.intersection(MarkFlags::EMPH_MOD3_MASK);

            // The allowed opener stacks under the rule of three: a sum of
            // lengths divisible by three only matches when both lengths
            // are, and the rule only applies when either side can both
            // open and close.
            let mut stacks = [0usize; 6];
            let mut n_stacks = 0;
            let mut push = |index: usize, n_stacks: &mut usize| {
                stacks[*n_stacks] = index;
                *n_stacks += 1;
            };

            push(
                emph_stack_index(ch, MarkFlags::EMPH_MOD3_0 | MarkFlags::EMPH_OC),
                &mut n_stacks,
            );
            if mod3 != MarkFlags::EMPH_MOD3_2 {
                push(
                    emph_stack_index(ch, MarkFlags::EMPH_MOD3_1 | MarkFlags::EMPH_OC),
                    &mut n_stacks,
                );
            }
            if mod3 != MarkFlags::EMPH_MOD3_1 {
                push(
                    emph_stack_index(ch, MarkFlags::EMPH_MOD3_2 | MarkFlags::EMPH_OC),
                    &mut n_stacks,
                );
            }
            push(emph_stack_index(ch, MarkFlags::EMPH_MOD3_0), &mut n_stacks);
            if !flags.contains(MarkFlags::EMPH_OC) || mod3 != MarkFlags::EMPH_MOD3_2 {
                push(emph_stack_index(ch, MarkFlags::EMPH_MOD3_1), &mut n_stacks);
            }
            if !flags.contains(MarkFlags::EMPH_OC) || mod3 != MarkFlags::EMPH_MOD3_1 {
                push(emph_stack_index(ch, MarkFlags::EMPH_MOD3_2), &mut n_stacks);
            }

            // The opener is the most recent mark across the allowed stacks.
            let mut opener: Option<usize> = None;
            for stack_index in &stacks[..n_stacks] {
                if let Some(&top) = self.opener_stacks[*stack_index].last() {
                    if opener.map_or(true, |o| self.marks[top].end > self.marks[o].end) {
                        opener = Some(top);
                    }
                }
            }

            if let Some(found_opener_index) = opener {
                let mut opener_index = found_opener_index;
                let opener_size = self.marks[opener_index].len();
                let closer_size = self.marks[mark_index].len();
                let stack_index = self.opener_stack_index(opener_index);

                if opener_size > closer_size {
                    // The remainder of the run stays on its stack as a
                    // still-pending opener.
                    opener_index = self.split_emph_mark(opener_index, closer_size);
                } else {
                    if opener_size < closer_size {
                        self.split_emph_mark(mark_index, closer_size - opener_size);
                    }
                    self.opener_stacks[stack_index].pop();
                }

                self.rollback(opener_index, mark_index, Rollback::Crossing);
                self.resolve_range(opener_index, mark_index);
                return;
            }
        }

        // Not resolvable as a closer; it may yet open something.
        if flags.contains(MarkFlags::POTENTIAL_OPENER) {
            let stack_index = emph_stack_index(ch, flags);
            self.opener_stacks[stack_index].push(mark_index);
        }
    }
}
