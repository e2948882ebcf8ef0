use std::collections::{BTreeMap, BTreeSet};

use crate::grammars::GroupId;

/// Handle on a span stored in a [`SpanTracker`]. Ids grow with creation order.
#[derive(Debug, Copy, Clone, Eq, PartialEq, Hash, PartialOrd, Ord)]
pub struct SpanId(pub u32);

/// A group match that may continue over several lines, e.g. a block comment.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MultiLineSpan {
    pub group: GroupId,
    pub start_block: usize,
    /// First column after the opening match
    pub start_col: usize,
    /// Block and column of the last character of the closing match, `None` while open
    pub end: Option<(usize, usize)>,
}

impl MultiLineSpan {
    pub fn is_open(&self) -> bool {
        self.end.is_none()
    }

    pub fn end_block(&self) -> Option<usize> {
        self.end.map(|(block, _)| block)
    }

    /// Whether `[start_col, end_col]` on `block` falls inside this span
    pub fn encloses(&self, block: usize, start_col: usize, end_col: usize) -> bool {
        if block < self.start_block {
            return false;
        }
        match self.end {
            Some((end_block, _)) if block > end_block => false,
            Some((end_block, end)) if end_block == self.start_block => {
                start_col >= self.start_col && end_col <= end
            }
            _ if block == self.start_block => start_col >= self.start_col,
            Some((end_block, end)) if block == end_block => end_col <= end,
            // Open spans cover everything after their first line, closed ones their middle lines
            _ => true,
        }
    }
}

/// Owns every multi-line span of a document.
///
/// Spans live in an arena keyed by [`SpanId`], with a secondary index from start block to the
/// spans opened on it so purging or counting a line does not scan everything.
#[derive(Debug, Clone, Default)]
pub struct SpanTracker {
    spans: BTreeMap<SpanId, MultiLineSpan>,
    by_start_block: BTreeMap<usize, BTreeSet<SpanId>>,
    next_id: u32,
}

impl SpanTracker {
    pub fn new() -> Self {
        Self::default()
    }

    /// Records a new open span
    pub fn open(&mut self, group: GroupId, start_block: usize, start_col: usize) -> SpanId {
        let id = SpanId(self.next_id);
        self.next_id += 1;
        self.spans.insert(
            id,
            MultiLineSpan {
                group,
                start_block,
                start_col,
                end: None,
            },
        );
        self.by_start_block.entry(start_block).or_default().insert(id);
        id
    }

    /// Sets the end of a span. Unknown ids are ignored.
    pub fn close(&mut self, id: SpanId, end_block: usize, end_col: usize) {
        if let Some(span) = self.spans.get_mut(&id) {
            debug_assert!(
                span.start_block < end_block
                    || (span.start_block == end_block && span.start_col <= end_col + 1)
            );
            span.end = Some((end_block, end_col));
        }
    }

    /// First span, in creation order, enclosing `[start_col, end_col]` on `block`
    pub fn enclosing(&self, block: usize, start_col: usize, end_col: usize) -> Option<SpanId> {
        self.spans
            .iter()
            .find(|(_, span)| span.encloses(block, start_col, end_col))
            .map(|(id, _)| *id)
    }

    /// Drops every span that starts on `block`, returning how many were removed
    pub fn purge_block(&mut self, block: usize) -> usize {
        let Some(ids) = self.by_start_block.remove(&block) else {
            return 0;
        };
        for id in &ids {
            self.spans.remove(id);
        }
        ids.len()
    }

    /// Number of spans starting on `block`
    pub fn count_in_block(&self, block: usize) -> usize {
        self.by_start_block.get(&block).map_or(0, BTreeSet::len)
    }

    pub fn get(&self, id: SpanId) -> Option<&MultiLineSpan> {
        self.spans.get(&id)
    }

    pub fn iter(&self) -> impl Iterator<Item = (SpanId, &MultiLineSpan)> {
        self.spans.iter().map(|(id, span)| (*id, span))
    }

    pub fn len(&self) -> usize {
        self.spans.len()
    }

    pub fn is_empty(&self) -> bool {
        self.spans.is_empty()
    }

    pub fn clear(&mut self) {
        self.spans.clear();
        self.by_start_block.clear();
    }
}
