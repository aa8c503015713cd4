//! Coordinate translation between a parent document and a projection.

use crate::error::{BadLocation, Result};
use std::ops::Range;

/// One visible parent range and where it lands in the projection.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Chunk {
    /// Start of the range in the parent.
    pub parent_offset: usize,
    /// Start of the range in the projection.
    pub child_offset: usize,
    /// Length of the range (identical on both sides).
    pub length: usize,
}

impl Chunk {
    /// Exclusive parent end offset.
    pub fn parent_end(&self) -> usize {
        self.parent_offset + self.length
    }

    /// Exclusive projection end offset.
    pub fn child_end(&self) -> usize {
        self.child_offset + self.length
    }
}

/// Ordered chunk list of a projection.
///
/// Chunks are sorted by parent offset, which also orders them by child offset;
/// child offsets are the running sum of chunk lengths.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ProjectionMapping {
    chunks: Vec<Chunk>,
}

impl ProjectionMapping {
    /// Mapping for parent ranges given as `(offset, length)` in parent order.
    pub fn from_parent_ranges(ranges: impl IntoIterator<Item = (usize, usize)>) -> Self {
        let mut child_offset = 0;
        let chunks = ranges
            .into_iter()
            .map(|(parent_offset, length)| {
                let chunk = Chunk {
                    parent_offset,
                    child_offset,
                    length,
                };
                child_offset += length;
                chunk
            })
            .collect();
        Self { chunks }
    }

    /// The chunks, in order.
    pub fn chunks(&self) -> &[Chunk] {
        &self.chunks
    }

    /// Length of the projection text.
    pub fn child_length(&self) -> usize {
        self.chunks.last().map_or(0, Chunk::child_end)
    }

    /// Parent span `(offset, length)` from the first chunk start to the last chunk
    /// end, `None` without chunks.
    pub fn coverage(&self) -> Option<(usize, usize)> {
        let first = self.chunks.first()?;
        let last = self.chunks.last()?;
        Some((first.parent_offset, last.parent_end() - first.parent_offset))
    }

    /// Indices of the chunks whose parent range intersects `[offset, end)`.
    pub(crate) fn straddled(&self, offset: usize, end: usize) -> Range<usize> {
        let lo = self.chunks.partition_point(|chunk| chunk.parent_end() <= offset);
        let hi = self.chunks.partition_point(|chunk| chunk.parent_offset < end);
        lo..hi.max(lo)
    }

    /// Parent ranges backing the projection range `[offset, offset + length)`.
    pub(crate) fn parent_pieces(&self, offset: usize, length: usize) -> Vec<(usize, usize)> {
        let end = offset + length;
        let first = self.chunks.partition_point(|chunk| chunk.child_end() <= offset);
        self.chunks[first..]
            .iter()
            .take_while(|chunk| chunk.child_offset < end)
            .filter_map(|chunk| {
                let from = chunk.child_offset.max(offset);
                let to = chunk.child_end().min(end);
                (from < to).then(|| (chunk.parent_offset + (from - chunk.child_offset), to - from))
            })
            .collect()
    }

    /// Projection offset of a parent offset.
    ///
    /// The end of the last chunk is the append position; the end of any other chunk
    /// is followed by hidden text and does not map.
    pub fn to_child_offset(&self, parent_offset: usize) -> Result<usize> {
        let index = self
            .chunks
            .partition_point(|chunk| chunk.parent_end() <= parent_offset);
        if let Some(chunk) = self.chunks.get(index)
            && chunk.parent_offset <= parent_offset
        {
            return Ok(chunk.child_offset + (parent_offset - chunk.parent_offset));
        }
        match self.chunks.last() {
            Some(last) if last.parent_end() == parent_offset => Ok(last.child_end()),
            _ => Err(BadLocation::Unmapped {
                offset: parent_offset,
            }
            .into()),
        }
    }

    /// Parent offset of a projection offset.
    ///
    /// A chunk boundary maps to the start of the following chunk; the projection end
    /// maps to the end of the last chunk.
    pub fn to_parent_offset(&self, child_offset: usize) -> Result<usize> {
        let index = self
            .chunks
            .partition_point(|chunk| chunk.child_end() <= child_offset);
        if let Some(chunk) = self.chunks.get(index) {
            return Ok(chunk.parent_offset + (child_offset - chunk.child_offset));
        }
        match self.chunks.last() {
            Some(last) if last.child_end() == child_offset => Ok(last.parent_end()),
            _ => Err(BadLocation::Unmapped {
                offset: child_offset,
            }
            .into()),
        }
    }

    /// Visible part of a parent region, as a projection region `(offset, length)`.
    ///
    /// Fails with `Unmapped` if no part of the region is visible.
    pub fn to_child_region(&self, offset: usize, length: usize) -> Result<(usize, usize)> {
        if length == 0 {
            return Ok((self.to_child_offset(offset)?, 0));
        }
        let straddled = self.straddled(offset, offset + length);
        if straddled.is_empty() {
            return Err(BadLocation::Unmapped { offset }.into());
        }
        let first = self.chunks[straddled.start];
        let last = self.chunks[straddled.end - 1];
        let start = first.child_offset + (offset.max(first.parent_offset) - first.parent_offset);
        let end =
            last.child_offset + ((offset + length).min(last.parent_end()) - last.parent_offset);
        Ok((start, end - start))
    }

    /// Parent region `(offset, length)` of a projection region.
    ///
    /// Hidden parent text between the two ends is part of the result.
    pub fn to_parent_region(&self, offset: usize, length: usize) -> Result<(usize, usize)> {
        BadLocation::check_range(offset, length, self.child_length())?;
        let start = self.to_parent_offset(offset)?;
        if length == 0 {
            return Ok((start, 0));
        }
        let end = offset + length;
        // End-biased: a boundary maps to the end of the preceding chunk.
        let index = self.chunks.partition_point(|chunk| chunk.child_end() < end);
        let chunk = self
            .chunks
            .get(index)
            .ok_or(BadLocation::Unmapped { offset: end })?;
        let parent_end = chunk.parent_offset + (end - chunk.child_offset);
        Ok((start, parent_end - start))
    }
}
