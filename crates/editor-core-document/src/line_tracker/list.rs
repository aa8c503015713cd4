//! Ordered-array line table.
//!
//! Used for freshly loaded text: building it is a single pass and lookups are a
//! binary search over line start offsets.

use super::{LineRecord, LineTable};
use std::ops::Range;

#[derive(Debug, Clone, Default)]
pub(crate) struct ListLines {
    offsets: Vec<usize>,
    records: Vec<LineRecord>,
    length: usize,
}

impl ListLines {
    pub(crate) fn from_records(records: Vec<LineRecord>) -> Self {
        let mut lines = Self {
            offsets: Vec::with_capacity(records.len()),
            records,
            length: 0,
        };
        lines.reindex(0);
        lines
    }

    fn reindex(&mut self, from: usize) {
        self.offsets.truncate(from);
        let mut offset = match from {
            0 => 0,
            _ => self.offsets[from - 1] + self.records[from - 1].length,
        };
        for record in &self.records[from..] {
            self.offsets.push(offset);
            offset += record.length;
        }
        self.length = offset;
    }
}

impl LineTable for ListLines {
    fn line_count(&self) -> usize {
        self.records.len()
    }

    fn text_length(&self) -> usize {
        self.length
    }

    fn line(&self, index: usize) -> Option<(usize, LineRecord)> {
        Some((*self.offsets.get(index)?, *self.records.get(index)?))
    }

    fn line_at_offset(&self, offset: usize) -> (usize, usize) {
        let index = self
            .offsets
            .partition_point(|start| *start <= offset)
            .saturating_sub(1);
        (index, self.offsets.get(index).copied().unwrap_or(0))
    }

    fn splice(&mut self, lines: Range<usize>, replacement: &[LineRecord]) {
        let start = lines.start;
        self.records.splice(lines, replacement.iter().copied());
        self.reindex(start);
    }

    fn records(&self) -> Vec<LineRecord> {
        self.records.clone()
    }
}
