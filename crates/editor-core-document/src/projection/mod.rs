//! Projections
//!
//! A projection is a virtual child document made of selected, disjoint ranges of a
//! parent document, concatenated in parent order. It owns no text: reads go through
//! the mapping to the parent store, and edits are translated back and applied to the
//! parent.
//!
//! Each visible range is a *chunk*: a segment position in a parent category (kept up
//! to date by [`SegmentUpdater`]) paired with a fragment position in the child's own
//! position index. After every change the chunk list is normalized: chunks are
//! sorted, empty chunks are dropped (a lone empty chunk is kept as an anchor) and
//! adjacent chunks are joined.

mod mapping;

pub use mapping::{Chunk, ProjectionMapping};

use crate::delimiters::DelimiterSet;
use crate::error::{BadLocation, Result};
use crate::event::{DocumentEvent, DocumentEventCallback};
use crate::line_tracker::LineTracker;
use crate::positions::{Position, PositionId, PositionIndex, SegmentUpdater};
use crate::text_store::TextStore;
use slotmap::new_key_type;
use std::sync::Arc;
use tracing::{debug, trace};

new_key_type! {
    /// Handle of a projection document.
    pub struct ProjectionId;
}

/// Child-side category holding the fragment of every chunk.
pub const FRAGMENTS_CATEGORY: &str = "projection.fragments";

#[derive(Debug, Clone, Copy)]
struct ChunkIds {
    segment: PositionId,
    fragment: PositionId,
}

/// State of one projection, owned by its parent document.
pub(crate) struct Projection {
    category: String,
    chunks: Vec<ChunkIds>,
    mapping: ProjectionMapping,
    pub(crate) tracker: LineTracker,
    pub(crate) positions: PositionIndex,
    callbacks: Vec<DocumentEventCallback>,
}

impl Projection {
    /// Empty projection whose segments live in `category` of `parent`.
    pub(crate) fn new(category: String, parent: &mut PositionIndex, delimiters: DelimiterSet) -> Self {
        parent.add_category_with_updater(category.clone(), Arc::new(SegmentUpdater));
        let mut positions = PositionIndex::new(0);
        positions.add_category_with_updater(FRAGMENTS_CATEGORY, Arc::new(SegmentUpdater));
        Self {
            category,
            chunks: Vec::new(),
            mapping: ProjectionMapping::default(),
            tracker: LineTracker::new(delimiters),
            positions,
            callbacks: Vec::new(),
        }
    }

    /// Parent category holding the segments.
    pub(crate) fn category(&self) -> &str {
        &self.category
    }

    pub(crate) fn mapping(&self) -> &ProjectionMapping {
        &self.mapping
    }

    pub(crate) fn child_length(&self) -> usize {
        self.mapping.child_length()
    }

    pub(crate) fn subscribe(&mut self, callback: DocumentEventCallback) {
        self.callbacks.push(callback);
    }

    pub(crate) fn notify(&mut self, event: &DocumentEvent) {
        for callback in &mut self.callbacks {
            callback(event);
        }
    }

    /// Drop the parent-side bookkeeping.
    pub(crate) fn release(self, parent: &mut PositionIndex) -> Result<()> {
        parent.remove_category(&self.category)
    }

    /// Child text `[offset, offset + length)` read from the parent store.
    pub(crate) fn get(&self, store: &dyn TextStore, offset: usize, length: usize) -> Result<String> {
        BadLocation::check_range(offset, length, self.child_length())?;
        read_mapped(&self.mapping, store, offset, length)
    }

    /// Current parent ranges in chunk-list order.
    fn ranges(&self, parent: &PositionIndex) -> Vec<(usize, usize)> {
        self.chunks
            .iter()
            .map(|ids| {
                parent
                    .position(ids.segment)
                    .map_or((0, 0), |p| (p.offset, p.length))
            })
            .collect()
    }

    /// Sort chunks, rebuild the mapping and rewrite the fragments from it.
    fn resync(&mut self, parent: &PositionIndex) {
        self.chunks.sort_by_key(|ids| {
            parent
                .position(ids.segment)
                .map_or(0, |position| position.offset)
        });
        self.mapping = ProjectionMapping::from_parent_ranges(self.ranges(parent));
        let fragments: Vec<(PositionId, Position)> = self
            .chunks
            .iter()
            .zip(self.mapping.chunks())
            .map(|(ids, chunk)| (ids.fragment, Position::new(chunk.child_offset, chunk.length)))
            .collect();
        self.positions.reposition(FRAGMENTS_CATEGORY, &fragments);
    }

    fn insert_chunk(&mut self, parent: &mut PositionIndex, offset: usize, length: usize) -> Result<()> {
        let segment = parent.add(&self.category, Position::new(offset, length))?;
        let fragment = self.positions.add(FRAGMENTS_CATEGORY, Position::new(0, 0))?;
        self.chunks.push(ChunkIds { segment, fragment });
        Ok(())
    }

    fn remove_chunk(&mut self, parent: &mut PositionIndex, index: usize) -> Result<()> {
        let ids = self.chunks.remove(index);
        parent.remove(&self.category, ids.segment)?;
        self.positions.remove(FRAGMENTS_CATEGORY, ids.fragment)?;
        Ok(())
    }

    /// Merge chunks whose parent ranges touch. Idempotent.
    pub(crate) fn join(&mut self, parent: &mut PositionIndex) -> Result<()> {
        self.resync(parent);
        let mut index = 0;
        while index + 1 < self.chunks.len() {
            let current = parent.position(self.chunks[index].segment).unwrap_or_default();
            let next = parent
                .position(self.chunks[index + 1].segment)
                .unwrap_or_default();
            if current.end() == next.offset {
                let merged = Position::new(current.offset, current.length + next.length);
                parent.reposition(&self.category, &[(self.chunks[index].segment, merged)]);
                self.remove_chunk(parent, index + 1)?;
            } else {
                index += 1;
            }
        }
        self.resync(parent);
        Ok(())
    }

    /// Drop empty chunks (keeping one if nothing else is left), then join.
    fn normalize(&mut self, parent: &mut PositionIndex) -> Result<()> {
        let ranges = self.ranges(parent);
        let keep_anchor = ranges.iter().all(|(_, length)| *length == 0);
        for index in (0..ranges.len()).rev() {
            if ranges[index].1 == 0 && !(keep_anchor && index == 0) {
                self.remove_chunk(parent, index)?;
            }
        }
        self.join(parent)
    }

    /// Apply a child change. `visible` are the parent ranges showing the child
    /// text once the change is applied.
    fn apply_child_event(
        &mut self,
        event: &DocumentEvent,
        store: &dyn TextStore,
        visible: &[(usize, usize)],
    ) -> Result<()> {
        if self.tracker.delimiters().needs_context() {
            let mapping = ProjectionMapping::from_parent_ranges(visible.iter().copied());
            self.tracker.replace_with_context(
                event.offset,
                event.length,
                &event.text,
                |offset, length| read_mapped(&mapping, store, offset, length),
            )?;
        } else {
            self.tracker.replace(event.offset, event.length, &event.text)?;
        }
        self.positions.update(event);
        Ok(())
    }

    /// Make `[offset, offset + length)` of the parent visible.
    ///
    /// Chunks overlapping the range are merged with it into one covering chunk.
    /// Returns the child changes, one insertion per newly visible gap.
    pub(crate) fn show(
        &mut self,
        parent: &mut PositionIndex,
        store: &dyn TextStore,
        offset: usize,
        length: usize,
    ) -> Result<Vec<DocumentEvent>> {
        BadLocation::check_range(offset, length, store.len())?;
        if length == 0 {
            return Ok(Vec::new());
        }
        let end = offset + length;
        let chunks = self.mapping.chunks().to_vec();
        let straddled = self.mapping.straddled(offset, end);
        let (start, stop) = if straddled.is_empty() {
            (offset, end)
        } else {
            (
                offset.min(chunks[straddled.start].parent_offset),
                end.max(chunks[straddled.end - 1].parent_end()),
            )
        };

        let mut events = Vec::new();
        let mut gaps = Vec::new();
        let mut cursor = start;
        let mut child_cursor = chunks
            .get(straddled.start)
            .map_or(self.child_length(), |chunk| chunk.child_offset);
        for chunk in &chunks[straddled.clone()] {
            if cursor < chunk.parent_offset {
                let gap = chunk.parent_offset - cursor;
                events.push(DocumentEvent::new(child_cursor, 0, store.get(cursor, gap)?));
                gaps.push((cursor, gap));
                child_cursor += gap;
            }
            child_cursor += chunk.length;
            cursor = chunk.parent_end();
        }
        if cursor < stop {
            events.push(DocumentEvent::new(
                child_cursor,
                0,
                store.get(cursor, stop - cursor)?,
            ));
            gaps.push((cursor, stop - cursor));
        }

        let mut visible: Vec<(usize, usize)> = chunks
            .iter()
            .map(|chunk| (chunk.parent_offset, chunk.length))
            .collect();
        for (event, gap) in events.iter().zip(gaps) {
            visible.push(gap);
            visible.sort_unstable();
            self.apply_child_event(event, store, &visible)?;
        }
        for index in straddled.rev() {
            self.remove_chunk(parent, index)?;
        }
        self.insert_chunk(parent, start, stop - start)?;
        self.normalize(parent)?;
        debug!(offset, length, chunks = self.chunks.len(), "projection range shown");
        Ok(events)
    }

    /// Hide `[offset, offset + length)` of the parent.
    ///
    /// The straddled chunks are replaced by their left and right remainders. Returns
    /// the child deletion, if anything visible was hidden.
    pub(crate) fn hide(
        &mut self,
        parent: &mut PositionIndex,
        store: &dyn TextStore,
        offset: usize,
        length: usize,
    ) -> Result<Option<DocumentEvent>> {
        BadLocation::check_range(offset, length, parent.document_length())?;
        if length == 0 {
            return Ok(None);
        }
        let end = offset + length;
        let straddled = self.mapping.straddled(offset, end);
        if straddled.is_empty() {
            return Ok(None);
        }
        let first = self.mapping.chunks()[straddled.start];
        let last = self.mapping.chunks()[straddled.end - 1];

        let visible_start = offset.max(first.parent_offset);
        let visible_end = end.min(last.parent_end());
        let child_start = first.child_offset + (visible_start - first.parent_offset);
        let child_end = last.child_offset + (visible_end - last.parent_offset);
        let event = DocumentEvent::new(child_start, child_end - child_start, "");
        if !event.is_empty() {
            let visible: Vec<(usize, usize)> = self
                .mapping
                .chunks()
                .iter()
                .flat_map(|chunk| {
                    let left_end = chunk.parent_end().min(offset);
                    let right_start = chunk.parent_offset.max(end);
                    [
                        (chunk.parent_offset, left_end.saturating_sub(chunk.parent_offset)),
                        (right_start, chunk.parent_end().saturating_sub(right_start)),
                    ]
                })
                .filter(|(_, length)| *length > 0)
                .collect();
            self.apply_child_event(&event, store, &visible)?;
        }

        for index in straddled.rev() {
            self.remove_chunk(parent, index)?;
        }
        if first.parent_offset < offset {
            self.insert_chunk(parent, first.parent_offset, offset - first.parent_offset)?;
        }
        if last.parent_end() > end {
            self.insert_chunk(parent, end, last.parent_end() - end)?;
        }
        self.normalize(parent)?;
        debug!(offset, length, chunks = self.chunks.len(), "projection range hidden");
        Ok((!event.is_empty()).then_some(event))
    }

    /// Follow a parent change whose segment positions were already updated.
    ///
    /// `before` is the mapping prior to the change. `echo` is the child change
    /// when the parent change was itself translated from this projection; it is
    /// applied as-is instead of being derived again. Returns the applied child
    /// change.
    pub(crate) fn parent_changed(
        &mut self,
        parent: &mut PositionIndex,
        store: &dyn TextStore,
        event: &DocumentEvent,
        before: &ProjectionMapping,
        echo: Option<DocumentEvent>,
    ) -> Result<Option<DocumentEvent>> {
        let after = self.ranges(parent);
        let child_event = match echo {
            Some(echo) => Some(echo),
            None => derive_child_event(before.chunks(), &after, event),
        };
        if let Some(child_event) = &child_event {
            trace!(?child_event, "projection follows parent change");
            self.apply_child_event(child_event, store, &after)?;
        }
        self.normalize(parent)?;
        debug_assert_eq!(self.child_length(), self.tracker.text_length());
        Ok(child_event)
    }
}

/// Text of the child range `[offset, offset + length)` under `mapping`.
fn read_mapped(
    mapping: &ProjectionMapping,
    store: &dyn TextStore,
    offset: usize,
    length: usize,
) -> Result<String> {
    let mut text = String::new();
    for (start, len) in mapping.parent_pieces(offset, length) {
        text.push_str(&store.get(start, len)?);
    }
    Ok(text)
}

/// Child change caused by a parent change.
///
/// `before` are the chunks prior to the change and `after` their parent ranges
/// after the segment update, in the same order. The deleted child span is the
/// visible part of the replaced parent range; the inserted child text is the part
/// of the inserted parent text that ended up inside a chunk.
fn derive_child_event(
    before: &[Chunk],
    after: &[(usize, usize)],
    event: &DocumentEvent,
) -> Option<DocumentEvent> {
    let offset = event.offset;
    let removed_end = event.end();

    let mut deleted: Option<(usize, usize)> = None;
    for chunk in before {
        let from = chunk.parent_offset.max(offset);
        let to = chunk.parent_end().min(removed_end);
        if from < to {
            let child_from = chunk.child_offset + (from - chunk.parent_offset);
            let child_to = chunk.child_offset + (to - chunk.parent_offset);
            deleted = Some((deleted.map_or(child_from, |(start, _)| start), child_to));
        }
    }

    let inserted_end = offset + event.text_length();
    let mut text = String::new();
    let mut anchor = None;
    for (chunk, (start, length)) in before.iter().zip(after) {
        let from = (*start).max(offset);
        let to = (start + length).min(inserted_end);
        if from < to {
            let skip = from - offset;
            text.extend(event.text.chars().skip(skip).take(to - from));
            anchor.get_or_insert(
                chunk.child_offset + offset.saturating_sub(chunk.parent_offset).min(chunk.length),
            );
        }
    }

    match (deleted, anchor) {
        (Some((start, stop)), _) => Some(DocumentEvent::new(start, stop - start, text)),
        (None, Some(at)) => Some(DocumentEvent::new(at, 0, text)),
        (None, None) => None,
    }
}
