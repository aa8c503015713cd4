//! Views of a projection as a document of its own.

use super::Document;
use super::target::{DocumentCore, EditOrigin};
use crate::error::{BadLocation, DocumentError, Result};
use crate::event::DocumentEvent;
use crate::line_tracker::LineInformation;
use crate::positions::{Position, PositionId};
use crate::projection::{Chunk, FRAGMENTS_CATEGORY, Projection, ProjectionId, ProjectionMapping};
use parking_lot::RwLockReadGuard;

/// Read view of a projection.
///
/// Offsets are projection offsets unless a method says otherwise. The view keeps
/// the parent document read-locked.
pub struct ProjectionDocument<'a> {
    core: RwLockReadGuard<'a, DocumentCore>,
    id: ProjectionId,
}

impl<'a> ProjectionDocument<'a> {
    pub(super) fn new(core: RwLockReadGuard<'a, DocumentCore>, id: ProjectionId) -> Self {
        Self { core, id }
    }

    // The handle was checked when the view was created and the lock is held since.
    fn inner(&self) -> &Projection {
        &self.core.projections[self.id]
    }

    /// Handle of the projection.
    pub fn id(&self) -> ProjectionId {
        self.id
    }

    /// Length in characters.
    pub fn len(&self) -> usize {
        self.inner().child_length()
    }

    /// Whether nothing is visible.
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Whole projection text.
    pub fn text(&self) -> Result<String> {
        self.get(0, self.len())
    }

    /// Text of `[offset, offset + length)`.
    pub fn get(&self, offset: usize, length: usize) -> Result<String> {
        self.inner().get(self.core.store.as_ref(), offset, length)
    }

    /// Number of lines.
    pub fn line_count(&self) -> usize {
        self.inner().tracker.line_count()
    }

    /// Line containing `offset`.
    pub fn line_of_offset(&self, offset: usize) -> Result<usize> {
        self.inner().tracker.line_of_offset(offset)
    }

    /// Offset, length and delimiter length of `line`.
    pub fn line_information(&self, line: usize) -> Result<LineInformation> {
        self.inner().tracker.line_information(line)
    }

    /// The line containing `offset`.
    pub fn line_information_of_offset(&self, offset: usize) -> Result<LineInformation> {
        self.inner().tracker.line_information_of_offset(offset)
    }

    /// Start offset of `line`.
    pub fn line_offset(&self, line: usize) -> Result<usize> {
        self.inner().tracker.line_offset(line)
    }

    /// Length of `line` including its delimiter.
    pub fn line_length(&self, line: usize) -> Result<usize> {
        self.inner().tracker.line_length(line)
    }

    /// Delimiter ending `line`, `None` for the last line.
    pub fn line_delimiter(&self, line: usize) -> Result<Option<&str>> {
        self.inner().tracker.line_delimiter(line)
    }

    /// Number of lines touched by `[offset, offset + length)`.
    pub fn lines_spanned(&self, offset: usize, length: usize) -> Result<usize> {
        self.inner().tracker.lines_spanned(offset, length)
    }

    /// Snapshot of every line.
    pub fn lines(&self) -> Vec<LineInformation> {
        self.inner().tracker.lines()
    }

    /// The chunk list.
    pub fn chunks(&self) -> &[Chunk] {
        self.inner().mapping().chunks()
    }

    /// The full mapping.
    pub fn mapping(&self) -> &ProjectionMapping {
        self.inner().mapping()
    }

    /// Parent span from the first chunk start to the last chunk end.
    pub fn coverage(&self) -> Option<(usize, usize)> {
        self.inner().mapping().coverage()
    }

    /// Projection offset of a parent offset.
    pub fn to_child_offset(&self, parent_offset: usize) -> Result<usize> {
        BadLocation::check_offset(parent_offset, self.core.store.len())?;
        self.mapping().to_child_offset(parent_offset)
    }

    /// Parent offset of a projection offset.
    pub fn to_parent_offset(&self, child_offset: usize) -> Result<usize> {
        self.mapping().to_parent_offset(child_offset)
    }

    /// Visible part of a parent region.
    pub fn to_child_region(&self, offset: usize, length: usize) -> Result<(usize, usize)> {
        BadLocation::check_range(offset, length, self.core.store.len())?;
        self.mapping().to_child_region(offset, length)
    }

    /// Parent region of a projection region.
    pub fn to_parent_region(&self, offset: usize, length: usize) -> Result<(usize, usize)> {
        self.mapping().to_parent_region(offset, length)
    }

    /// Projection line showing the start of the visible part of `parent_line`.
    ///
    /// `None` if no part of the line is visible.
    pub fn to_child_line(&self, parent_line: usize) -> Result<Option<usize>> {
        let line = self.core.tracker.line_information(parent_line)?;
        let region = if line.length == 0 {
            self.mapping().to_child_offset(line.offset).map(|offset| (offset, 0))
        } else {
            self.mapping().to_child_region(line.offset, line.length)
        };
        match region {
            Ok((offset, _)) => Ok(Some(self.inner().tracker.line_of_offset(offset)?)),
            Err(DocumentError::BadLocation(BadLocation::Unmapped { .. })) => Ok(None),
            Err(err) => Err(err),
        }
    }

    /// First parent line and number of parent lines backing `child_line`.
    ///
    /// The line delimiter does not count, so a line maps to the parent lines its
    /// content spans.
    pub fn to_parent_lines(&self, child_line: usize) -> Result<(usize, usize)> {
        let line = self.inner().tracker.line_information(child_line)?;
        let (offset, length) = self
            .mapping()
            .to_parent_region(line.offset, line.content_length())?;
        let first = self.core.tracker.line_of_offset(offset)?;
        Ok((first, self.core.tracker.lines_spanned(offset, length)?))
    }

    /// Registered category names of the projection, sorted.
    pub fn position_categories(&self) -> Vec<String> {
        self.inner().positions.categories()
    }

    /// Positions of a projection category, ordered by offset.
    pub fn positions(&self, category: &str) -> Result<Vec<Position>> {
        self.inner().positions.snapshot(category)
    }

    /// Current value of a projection position.
    pub fn position(&self, id: PositionId) -> Option<Position> {
        self.inner().positions.position(id)
    }

    /// Number of positions of `category` starting before `offset`.
    pub fn index_in_category(&self, category: &str, offset: usize) -> Result<usize> {
        self.inner().positions.index_in_category(category, offset)
    }
}

/// Edit view of a projection.
///
/// Edits of the projection text are translated and applied to the parent
/// document; the projection follows through the regular parent change path.
pub struct ProjectionDocumentMut<'a> {
    document: &'a mut Document,
    id: ProjectionId,
}

impl<'a> ProjectionDocumentMut<'a> {
    pub(super) fn new(document: &'a mut Document, id: ProjectionId) -> Self {
        Self { document, id }
    }

    /// Read view of the same projection.
    pub fn view(&self) -> Result<ProjectionDocument<'_>> {
        self.document.projection(self.id)
    }

    fn with_projection<R>(&mut self, f: impl FnOnce(&mut Projection) -> Result<R>) -> Result<R> {
        let id = self.id;
        let mut core = self.document.core.write()?;
        let projection = core
            .projections
            .get_mut(id)
            .ok_or(DocumentError::UnknownProjection(id))?;
        f(projection)
    }

    /// Make `[offset, offset + length)` of the parent visible.
    pub fn show(&mut self, offset: usize, length: usize) -> Result<()> {
        let id = self.id;
        let mut guard = self.document.core.write()?;
        let core = &mut *guard;
        let projection = core
            .projections
            .get_mut(id)
            .ok_or(DocumentError::UnknownProjection(id))?;
        let events = projection.show(&mut core.positions, core.store.as_ref(), offset, length)?;
        for event in &events {
            projection.notify(event);
        }
        Ok(())
    }

    /// Hide `[offset, offset + length)` of the parent.
    pub fn hide(&mut self, offset: usize, length: usize) -> Result<()> {
        let id = self.id;
        let mut guard = self.document.core.write()?;
        let core = &mut *guard;
        let projection = core
            .projections
            .get_mut(id)
            .ok_or(DocumentError::UnknownProjection(id))?;
        if let Some(event) = projection.hide(&mut core.positions, core.store.as_ref(), offset, length)? {
            projection.notify(&event);
        }
        Ok(())
    }

    /// Merge chunks whose parent ranges touch.
    pub fn join(&mut self) -> Result<()> {
        let id = self.id;
        let mut guard = self.document.core.write()?;
        let core = &mut *guard;
        core.projections
            .get_mut(id)
            .ok_or(DocumentError::UnknownProjection(id))?
            .join(&mut core.positions)
    }

    /// Replace `[offset, offset + length)` of the projection with `text`.
    ///
    /// The change is applied to the parent range behind it, including any hidden
    /// text inside that range. An insertion at a chunk boundary lands at the start
    /// of the following chunk.
    pub fn replace(&mut self, offset: usize, length: usize, text: &str) -> Result<()> {
        let (parent_offset, parent_length) = {
            let view = self.view()?;
            view.to_parent_region(offset, length)?
        };
        let origin = EditOrigin::Projection {
            id: self.id,
            child_event: DocumentEvent::new(offset, length, text),
        };
        self.document
            .submit(DocumentEvent::new(parent_offset, parent_length, text), origin)
    }

    /// Replace the whole projection text.
    pub fn set(&mut self, text: &str) -> Result<()> {
        let length = self.view()?.len();
        self.replace(0, length, text)
    }

    /// Register a projection position category.
    pub fn add_position_category(&mut self, name: &str) -> Result<()> {
        self.with_projection(|projection| {
            projection.positions.add_category(name);
            Ok(())
        })
    }

    /// Unregister a projection position category and its positions.
    pub fn remove_position_category(&mut self, name: &str) -> Result<()> {
        if name == FRAGMENTS_CATEGORY {
            return Err(DocumentError::IllegalState(
                "category is owned by the projection",
            ));
        }
        self.with_projection(|projection| projection.positions.remove_category(name))
    }

    /// Track `position` (in projection offsets) in `category`.
    pub fn add_position(&mut self, category: &str, position: Position) -> Result<PositionId> {
        self.with_projection(|projection| projection.positions.add(category, position))
    }

    /// Stop tracking a projection position.
    pub fn remove_position(&mut self, category: &str, id: PositionId) -> Result<bool> {
        self.with_projection(|projection| projection.positions.remove(category, id))
    }

    /// Register a listener called after every committed projection change.
    pub fn subscribe<F>(&mut self, callback: F) -> Result<()>
    where
        F: FnMut(&DocumentEvent) + Send + Sync + 'static,
    {
        let id = self.id;
        self.document
            .core
            .target_mut()
            .projections
            .get_mut(id)
            .ok_or(DocumentError::UnknownProjection(id))?
            .subscribe(Box::new(callback));
        Ok(())
    }
}
