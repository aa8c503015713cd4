//! Positions and Categories
//!
//! A [`Position`] is a range that follows the text as it is edited. Positions live in
//! an arena and are addressed by [`PositionId`], so two positions with the same range
//! are still distinct. Each position belongs to exactly one named category; a
//! category keeps its members sorted by offset and owns the [`PositionUpdater`] that
//! adjusts them on every change.
//!
//! Deleted positions stay in the arena as tombstones (`deleted == true`) until they
//! are removed, so holders of an id can observe what happened to their range.

mod updater;

pub use updater::{DefaultPositionUpdater, PositionUpdater, SegmentUpdater};

use crate::error::{BadLocation, DocumentError, Result};
use crate::event::DocumentEvent;
use slotmap::{SlotMap, new_key_type};
use std::collections::HashMap;
use std::sync::Arc;

new_key_type! {
    /// Stable handle of a position.
    pub struct PositionId;
}

/// A range that is adjusted on every text change.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash)]
pub struct Position {
    /// Start offset.
    pub offset: usize,
    /// Length.
    pub length: usize,
    /// Set once a change removed the range.
    pub deleted: bool,
}

impl Position {
    /// Live position covering `[offset, offset + length)`.
    pub fn new(offset: usize, length: usize) -> Self {
        Self {
            offset,
            length,
            deleted: false,
        }
    }

    /// Exclusive end offset.
    pub fn end(&self) -> usize {
        self.offset + self.length
    }

    /// Whether `offset` lies in `[self.offset, self.end())`.
    pub fn includes(&self, offset: usize) -> bool {
        !self.deleted && self.offset <= offset && offset < self.end()
    }

    /// Whether the range intersects `[offset, offset + length)`.
    ///
    /// An empty query range intersects a position that strictly contains it.
    pub fn overlaps_with(&self, offset: usize, length: usize) -> bool {
        if self.deleted {
            return false;
        }
        let end = offset.saturating_add(length);
        if length == 0 {
            return self.offset < offset && offset < self.end();
        }
        self.offset < end && offset < self.end()
    }
}

struct Entry {
    position: Position,
    category: String,
}

struct Category {
    members: Vec<PositionId>,
    updater: Arc<dyn PositionUpdater>,
}

/// Named categories of positions over one text.
pub struct PositionIndex {
    entries: SlotMap<PositionId, Entry>,
    categories: HashMap<String, Category>,
    document_length: usize,
}

impl PositionIndex {
    /// Index over a text of `document_length` characters.
    pub fn new(document_length: usize) -> Self {
        Self {
            entries: SlotMap::with_key(),
            categories: HashMap::new(),
            document_length,
        }
    }

    /// Length of the text the positions refer to.
    pub fn document_length(&self) -> usize {
        self.document_length
    }

    /// Register `name` with the default update policy. Registering twice keeps
    /// the existing category.
    pub fn add_category(&mut self, name: impl Into<String>) {
        self.add_category_with_updater(name, Arc::new(DefaultPositionUpdater));
    }

    /// Register `name` with a custom update policy.
    pub fn add_category_with_updater(
        &mut self,
        name: impl Into<String>,
        updater: Arc<dyn PositionUpdater>,
    ) {
        self.categories
            .entry(name.into())
            .or_insert_with(|| Category {
                members: Vec::new(),
                updater,
            });
    }

    /// Unregister `name` and drop all of its positions.
    pub fn remove_category(&mut self, name: &str) -> Result<()> {
        if self.categories.remove(name).is_none() {
            return Err(DocumentError::BadPositionCategory(name.to_string()));
        }
        self.entries.retain(|_, entry| entry.category != name);
        Ok(())
    }

    /// Whether `name` is registered.
    pub fn contains_category(&self, name: &str) -> bool {
        self.categories.contains_key(name)
    }

    /// Registered category names, sorted.
    pub fn categories(&self) -> Vec<String> {
        let mut names: Vec<String> = self.categories.keys().cloned().collect();
        names.sort();
        names
    }

    fn category(&self, name: &str) -> Result<&Category> {
        self.categories
            .get(name)
            .ok_or_else(|| DocumentError::BadPositionCategory(name.to_string()))
    }

    /// Add a position to `category`.
    pub fn add(&mut self, category: &str, position: Position) -> Result<PositionId> {
        if !self.categories.contains_key(category) {
            return Err(DocumentError::BadPositionCategory(category.to_string()));
        }
        BadLocation::check_range(position.offset, position.length, self.document_length)?;
        let id = self.entries.insert(Entry {
            position: Position::new(position.offset, position.length),
            category: category.to_string(),
        });
        let entries = &self.entries;
        if let Some(slot) = self.categories.get_mut(category) {
            let at = slot
                .members
                .partition_point(|member| entries[*member].position.offset <= position.offset);
            slot.members.insert(at, id);
        }
        Ok(id)
    }

    /// Remove a position (live or tombstoned) from `category`.
    ///
    /// Returns `false` if `id` is not a position of that category.
    pub fn remove(&mut self, category: &str, id: PositionId) -> Result<bool> {
        let slot = self
            .categories
            .get_mut(category)
            .ok_or_else(|| DocumentError::BadPositionCategory(category.to_string()))?;
        match self.entries.get(id) {
            Some(entry) if entry.category == category => {
                slot.members.retain(|member| *member != id);
                self.entries.remove(id);
                Ok(true)
            }
            _ => Ok(false),
        }
    }

    /// Current value of a position.
    pub fn position(&self, id: PositionId) -> Option<Position> {
        self.entries.get(id).map(|entry| entry.position)
    }

    /// Live positions of `category`, ordered by offset.
    pub fn snapshot(&self, category: &str) -> Result<Vec<Position>> {
        Ok(self
            .category(category)?
            .members
            .iter()
            .map(|id| self.entries[*id].position)
            .collect())
    }

    /// Live positions of `category` with their ids, ordered by offset.
    pub fn snapshot_with_ids(&self, category: &str) -> Result<Vec<(PositionId, Position)>> {
        Ok(self
            .category(category)?
            .members
            .iter()
            .map(|id| (*id, self.entries[*id].position))
            .collect())
    }

    /// Insertion index for `offset`: the number of positions starting before it.
    pub fn index_in_category(&self, category: &str, offset: usize) -> Result<usize> {
        let members = &self.category(category)?.members;
        BadLocation::check_offset(offset, self.document_length)?;
        Ok(members.partition_point(|id| self.entries[*id].position.offset < offset))
    }

    /// Positions of `category` intersecting `[offset, offset + length)`.
    pub fn overlapping(
        &self,
        category: &str,
        offset: usize,
        length: usize,
    ) -> Result<Vec<(PositionId, Position)>> {
        let members = &self.category(category)?.members;
        BadLocation::check_range(offset, length, self.document_length)?;
        let end = offset + length;
        Ok(members
            .iter()
            .map(|id| (*id, self.entries[*id].position))
            .take_while(|(_, position)| position.offset <= end)
            .filter(|(_, position)| position.overlaps_with(offset, length))
            .collect())
    }

    /// Overwrite positions of `category` (bookkeeping for projections) and restore
    /// the offset order.
    pub(crate) fn reposition(&mut self, category: &str, updates: &[(PositionId, Position)]) {
        for (id, position) in updates {
            if let Some(entry) = self.entries.get_mut(*id) {
                entry.position = *position;
            }
        }
        let entries = &self.entries;
        if let Some(slot) = self.categories.get_mut(category) {
            slot.members
                .sort_by_key(|member| entries[*member].position.offset);
        }
    }

    /// Apply a text change to every category.
    pub fn update(&mut self, event: &DocumentEvent) {
        let entries = &mut self.entries;
        for category in self.categories.values_mut() {
            let mut scratch: Vec<Position> = category
                .members
                .iter()
                .map(|id| entries[*id].position)
                .collect();
            category.updater.update(event, &mut scratch);
            for (id, position) in category.members.iter().zip(scratch) {
                entries[*id].position = position;
            }
            category.members.retain(|id| !entries[*id].position.deleted);
            category
                .members
                .sort_by_key(|id| entries[*id].position.offset);
        }
        self.document_length = self.document_length - event.length + event.text_length();
    }
}

impl std::fmt::Debug for PositionIndex {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("PositionIndex")
            .field("categories", &self.categories())
            .field("positions", &self.entries.len())
            .field("document_length", &self.document_length)
            .finish()
    }
}
