//! Strikethrough spans, GitHub flavored: only tilde runs of length 1 or 2
//! count, and the opener and closer lengths have to match. Matching by
//! length is what the two tilde stacks are for.

use crate::event::EventSink;

use super::delimiter::{MarkFlags, Rollback};
use super::Parser;

impl<'text, S: EventSink> Parser<'text, '_, S> {
    pub(super) fn analyze_tilde(&mut self, mark_index: usize) {
        let flags = self.marks[mark_index].flags;
        let stack_index = self.opener_stack_index(mark_index);

        if flags.contains(MarkFlags::POTENTIAL_CLOSER) {
            if let Some(&opener_index) = self.opener_stacks[stack_index].last() {
                self.opener_stacks[stack_index].pop();
                self.rollback(opener_index, mark_index, Rollback::Crossing);
                self.resolve_range(opener_index, mark_index);
                return;
            }
        }

        if flags.contains(MarkFlags::POTENTIAL_OPENER) {
            self.opener_stacks[stack_index].push(mark_index);
        }
    }
}
