//! Inline marks and the opener stacks used to resolve them.
//!
//! A mark is a candidate position for a span boundary, produced by the
//! collector in [`super::inline`] and refined by the precedence passes.
//! Unresolved openers wait on per-kind stacks; once a closer matches, the
//! pair is interconnected and flagged as resolved. Dummy (`D`) marks
//! reserve room for splitting emphasis runs without insertion.

use bitflags::bitflags;

use crate::event::EventSink;

use super::Parser;

/// Mark kind for dummy marks. Dummies reserve space into which a longer
/// emphasis mark can later be split, or pad a link opener.
pub(crate) const DUMMY: u8 = b'D';

/// Mark kind of the terminal sentinel appended after every block.
pub(crate) const SENTINEL: u8 = 127;

bitflags! {
    #[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
    pub(crate) struct MarkFlags: u16 {
        /// Maybe an opener.
        const POTENTIAL_OPENER = 1;
        /// Maybe a closer.
        const POTENTIAL_CLOSER = 1 << 1;
        /// Definitely an opener.
        const OPENER = 1 << 2;
        /// Definitely a closer.
        const CLOSER = 1 << 3;
        /// Resolved in any definite way.
        const RESOLVED = 1 << 4;

        /// Opener/closer mixed candidate. Helper for the "rule of three".
        const EMPH_OC = 1 << 5;
        const EMPH_MOD3_0 = 1 << 6;
        const EMPH_MOD3_1 = 1 << 7;
        const EMPH_MOD3_2 = (1 << 6) | (1 << 7);
        const EMPH_MOD3_MASK = (1 << 6) | (1 << 7);

        /// Distinguishes an autolink from raw HTML for `<`/`>` marks.
        const AUTOLINK = 1 << 8;
        /// An e-mail autolink whose rendered destination needs `mailto:`.
        const AUTOLINK_MISSING_MAILTO = 1 << 9;
        /// Set on the closer once its permissive-autolink opener has been
        /// emitted.
        const VALID_PERMISSIVE_AUTOLINK = 1 << 10;
        /// Set on `[` marks that contain nested brackets, ruling out
        /// invalid link labels early.
        const HAS_NESTED_BRACKETS = 1 << 11;
    }
}

#[derive(Clone, Debug)]
pub(crate) struct Mark {
    pub beg: usize,
    pub end: usize,
    /// One of a small closed alphabet of mark kinds, named by the byte
    /// that produced it (plus [`DUMMY`] and [`SENTINEL`]).
    pub ch: u8,
    pub flags: MarkFlags,
    /// Index of the matching opener once resolved as a closer.
    pub prev: Option<usize>,
    /// Index of the matching closer once resolved as an opener.
    pub next: Option<usize>,
    /// Index into the resolved-link arena for confirmed link openers.
    pub link_attr: Option<usize>,
}

impl Mark {
    pub(crate) fn new(ch: u8, beg: usize, end: usize, flags: MarkFlags) -> Self {
        Mark {
            beg,
            end,
            ch,
            flags,
            prev: None,
            next: None,
            link_attr: None,
        }
    }

    pub(crate) fn dummy(off: usize) -> Self {
        Mark::new(DUMMY, off, off, MarkFlags::empty())
    }

    pub(crate) fn is_resolved(&self) -> bool {
        self.flags.contains(MarkFlags::RESOLVED)
    }

    pub(crate) fn is_resolved_opener(&self) -> bool {
        self.flags
            .contains(MarkFlags::RESOLVED | MarkFlags::OPENER)
    }

    pub(crate) fn len(&self) -> usize {
        self.end - self.beg
    }

    pub(crate) fn emph_mod3(&self) -> MarkFlags {
        self.flags.intersection(MarkFlags::EMPH_MOD3_MASK)
    }
}

/// There are sixteen concurrent opener stacks: twelve for emphasis (both
/// delimiters × opener-only/opener-and-closer × length mod 3, so the rule
/// of three resolves in O(1)), two for tildes by run length, one for
/// brackets and one for dollars.
pub(crate) const N_OPENER_STACKS: usize = 16;

pub(crate) const TILDE_OPENERS_1: usize = 12;
pub(crate) const TILDE_OPENERS_2: usize = 13;
pub(crate) const BRACKET_OPENERS: usize = 14;
pub(crate) const DOLLAR_OPENERS: usize = 15;

/// Stack slot for an emphasis opener with the given properties.
pub(crate) fn emph_stack_index(ch: u8, flags: MarkFlags) -> usize {
    let base = match ch {
        b'*' => 0,
        b'_' => 6,
        _ => unreachable!("no emphasis stack for {}", ch as char),
    };
    let oc = if flags.contains(MarkFlags::EMPH_OC) { 3 } else { 0 };
    let masked = flags.intersection(MarkFlags::EMPH_MOD3_MASK);
    let mod3 = if masked == MarkFlags::EMPH_MOD3_0 {
        0
    } else if masked == MarkFlags::EMPH_MOD3_1 {
        1
    } else if masked == MarkFlags::EMPH_MOD3_2 {
        2
    } else {
        unreachable!("emphasis mark without a mod-3 class")
    };

    base + oc + mod3
}

/// How [`Parser::rollback`] treats resolved marks inside the range.
#[derive(Clone, Copy, PartialEq, Eq)]
pub(crate) enum Rollback {
    /// Only cut the opener stacks so nothing can later resolve across the
    /// range boundary.
    Crossing,
    /// Additionally turn everything strictly inside the range into dummies.
    All,
}

impl<'text, S: EventSink> Parser<'text, '_, S> {
    /// Stack slot appropriate for an unresolved opener mark.
    pub(crate) fn opener_stack_index(&self, mark_index: usize) -> usize {
        let mark = &self.marks[mark_index];
        match mark.ch {
            b'*' | b'_' => emph_stack_index(mark.ch, mark.flags),
            b'~' => {
                if mark.len() == 1 {
                    TILDE_OPENERS_1
                } else {
                    TILDE_OPENERS_2
                }
            }
            b'[' | b'!' => BRACKET_OPENERS,
            _ => unreachable!("mark {} has no opener stack", mark.ch as char),
        }
    }

    pub(crate) fn push_opener(&mut self, stack_index: usize, mark_index: usize) {
        self.opener_stacks[stack_index].push(mark_index);
    }

    /// Interconnect an opener and closer and flag both as resolved.
    pub(crate) fn resolve_range(&mut self, opener_index: usize, closer_index: usize) {
        let opener = &mut self.marks[opener_index];
        opener.next = Some(closer_index);
        opener.flags |= MarkFlags::OPENER | MarkFlags::RESOLVED;

        let closer = &mut self.marks[closer_index];
        closer.prev = Some(opener_index);
        closer.flags |= MarkFlags::CLOSER | MarkFlags::RESOLVED;
    }

    /// Undo resolution state across `opener_index..=closer_index`: any
    /// pending openers within the range are discarded from every stack,
    /// and with [`Rollback::All`] the interior marks are dummied out.
    ///
    /// Must only be called for a range that does not cross the nesting
    /// boundaries of already-resolved ranges.
    pub(crate) fn rollback(&mut self, opener_index: usize, closer_index: usize, how: Rollback) {
        for stack in self.opener_stacks.iter_mut() {
            while stack.last().is_some_and(|top| *top >= opener_index) {
                stack.pop();
            }
        }

        if how == Rollback::All {
            for mark in &mut self.marks[opener_index + 1..closer_index] {
                mark.ch = DUMMY;
                mark.flags = MarkFlags::empty();
            }
        }
    }

    /// Scan left from `mark_from` for a resolved mark whose range covers
    /// `off`. The cursor is updated so repeated scans stay linear.
    pub(crate) fn scan_left_for_resolved_mark(
        &self,
        mark_from: usize,
        off: usize,
        cursor: &mut usize,
    ) -> Option<usize> {
        let mut i = mark_from as isize;
        while i >= 0 {
            let mark = &self.marks[i as usize];
            if mark.ch == DUMMY || mark.beg > off {
                i -= 1;
                continue;
            }
            if mark.beg <= off && off < mark.end && mark.is_resolved() {
                *cursor = i as usize;
                return Some(i as usize);
            }
            if mark.end <= off {
                break;
            }
            i -= 1;
        }

        *cursor = i.max(0) as usize;
        None
    }

    /// Scan right from `mark_from` for a resolved mark whose range covers
    /// `off`.
    pub(crate) fn scan_right_for_resolved_mark(
        &self,
        mark_from: usize,
        off: usize,
        cursor: &mut usize,
    ) -> Option<usize> {
        let mut i = mark_from;
        while i < self.marks.len() {
            let mark = &self.marks[i];
            if mark.ch == DUMMY || mark.end <= off {
                i += 1;
                continue;
            }
            if mark.beg <= off && off < mark.end && mark.is_resolved() {
                *cursor = i;
                return Some(i);
            }
            if mark.beg > off {
                break;
            }
            i += 1;
        }

        *cursor = i.min(self.marks.len() - 1);
        None
    }
}
