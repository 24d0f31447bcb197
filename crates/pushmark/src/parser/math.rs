//! LaTeX math spans: `$...$` inline and `$$...$$` display. The opener and
//! closer run lengths have to match, and math does not nest.

use crate::event::EventSink;

use super::delimiter::{MarkFlags, Rollback, DOLLAR_OPENERS};
use super::Parser;

impl<'text, S: EventSink> Parser<'text, '_, S> {
    pub(super) fn analyze_dollar(&mut self, mark_index: usize) {
        let flags = self.marks[mark_index].flags;

        if flags.contains(MarkFlags::POTENTIAL_CLOSER) {
            if let Some(&opener_index) = self.opener_stacks[DOLLAR_OPENERS].last() {
                // A closer with a non-matching number of dollars is
                // discarded as a candidate.
                if self.marks[opener_index].len() == self.marks[mark_index].len() {
                    self.opener_stacks[DOLLAR_OPENERS].pop();
                    self.rollback(opener_index, mark_index, Rollback::All);
                    self.resolve_range(opener_index, mark_index);

                    // Math spans do not allow nesting, so any pending
                    // openers are dropped.
                    self.opener_stacks[DOLLAR_OPENERS].clear();
                    return;
                }
            }
        }

        if flags.contains(MarkFlags::POTENTIAL_OPENER) {
            self.opener_stacks[DOLLAR_OPENERS].push(mark_index);
        }
    }
}
