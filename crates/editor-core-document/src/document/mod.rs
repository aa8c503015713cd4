//! Document Facade
//!
//! [`Document`] ties the components together: a rope text store, the line
//! tracker, the position index and any number of projections, all driven through
//! one [`RewriteSessionCoordinator`]. A change is queued as a whole while a rewrite
//! session is active, so abandoning a session leaves every component untouched.
//!
//! Writers take `&mut self`. Readers take `&self` and flush a pending session
//! before answering.

mod projection_view;
mod target;

pub use projection_view::{ProjectionDocument, ProjectionDocumentMut};

use crate::delimiters::{DEFAULT_DELIMITERS, DelimiterSet};
use crate::error::{BadLocation, DocumentError, Result};
use crate::event::DocumentEvent;
use crate::line_tracker::LineInformation;
use crate::positions::{Position, PositionId, PositionUpdater};
use crate::projection::ProjectionId;
use crate::rewrite_session::{RewriteSession, RewriteSessionCoordinator};
use crate::text_store::{RopeTextStore, TextStore};
use self::target::{DocumentCore, DocumentRequest, EditOrigin};
use std::sync::Arc;
use tracing::debug;

/// Construction options for a [`Document`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DocumentOptions {
    /// Line delimiters, in tie-break order.
    pub delimiters: Vec<String>,
}

impl Default for DocumentOptions {
    fn default() -> Self {
        Self {
            delimiters: DEFAULT_DELIMITERS.iter().map(|d| d.to_string()).collect(),
        }
    }
}

impl DocumentOptions {
    /// Replace the delimiter table.
    pub fn with_delimiters<I, S>(mut self, delimiters: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.delimiters = delimiters.into_iter().map(Into::into).collect();
        self
    }
}

/// A text document with line, position and projection tracking.
pub struct Document {
    core: RewriteSessionCoordinator<DocumentCore>,
    // Length including queued changes.
    length: usize,
    delimiters: DelimiterSet,
}

impl Document {
    /// Document holding `text` with the default delimiters.
    pub fn new(text: &str) -> Self {
        Self::build(text, DelimiterSet::default())
    }

    /// Document holding `text` with custom options.
    pub fn with_options(text: &str, options: DocumentOptions) -> Result<Self> {
        let delimiters = DelimiterSet::new(options.delimiters)?;
        Ok(Self::build(text, delimiters))
    }

    fn build(text: &str, delimiters: DelimiterSet) -> Self {
        let store = RopeTextStore::new(text);
        let length = store.len();
        Self {
            core: RewriteSessionCoordinator::new(DocumentCore::new(
                Box::new(store),
                delimiters.clone(),
                text,
            )),
            length,
            delimiters,
        }
    }

    /// Length in characters, including changes queued in a rewrite session.
    pub fn len(&self) -> usize {
        self.length
    }

    /// Whether the document is empty.
    pub fn is_empty(&self) -> bool {
        self.length == 0
    }

    /// Whole text.
    pub fn text(&self) -> Result<String> {
        let core = self.core.read()?;
        core.store.get(0, core.store.len())
    }

    /// Text of `[offset, offset + length)`.
    pub fn get(&self, offset: usize, length: usize) -> Result<String> {
        self.core.read()?.store.get(offset, length)
    }

    /// Replace `[offset, offset + length)` with `text`.
    pub fn replace(&mut self, offset: usize, length: usize, text: &str) -> Result<()> {
        BadLocation::check_range(offset, length, self.length)?;
        let event = DocumentEvent::new(offset, length, text);
        self.submit(event, EditOrigin::Document)
    }

    /// Replace the whole text.
    pub fn set(&mut self, text: &str) -> Result<()> {
        let length = text.chars().count();
        self.core.submit(DocumentRequest::Set(text.to_string()))?;
        self.length = length;
        Ok(())
    }

    fn submit(&mut self, event: DocumentEvent, origin: EditOrigin) -> Result<()> {
        let length = self.length - event.length + event.text_length();
        self.core.submit(DocumentRequest::Replace { event, origin })?;
        self.length = length;
        Ok(())
    }

    /// Register a listener called after every committed change.
    pub fn subscribe<F>(&mut self, callback: F)
    where
        F: FnMut(&DocumentEvent) + Send + Sync + 'static,
    {
        self.core.target_mut().callbacks.push(Box::new(callback));
    }

    /// The delimiter table.
    pub fn legal_line_delimiters(&self) -> &[String] {
        self.delimiters.delimiters()
    }

    // Lines

    /// Number of lines.
    pub fn line_count(&self) -> Result<usize> {
        Ok(self.core.read()?.tracker.line_count())
    }

    /// Line containing `offset`.
    pub fn line_of_offset(&self, offset: usize) -> Result<usize> {
        self.core.read()?.tracker.line_of_offset(offset)
    }

    /// Offset, length and delimiter length of `line`.
    pub fn line_information(&self, line: usize) -> Result<LineInformation> {
        self.core.read()?.tracker.line_information(line)
    }

    /// The line containing `offset`.
    pub fn line_information_of_offset(&self, offset: usize) -> Result<LineInformation> {
        self.core.read()?.tracker.line_information_of_offset(offset)
    }

    /// Start offset of `line`.
    pub fn line_offset(&self, line: usize) -> Result<usize> {
        self.core.read()?.tracker.line_offset(line)
    }

    /// Length of `line` including its delimiter.
    pub fn line_length(&self, line: usize) -> Result<usize> {
        self.core.read()?.tracker.line_length(line)
    }

    /// Delimiter ending `line`, `None` for the last line.
    pub fn line_delimiter(&self, line: usize) -> Result<Option<String>> {
        Ok(self
            .core
            .read()?
            .tracker
            .line_delimiter(line)?
            .map(str::to_string))
    }

    /// Number of lines touched by `[offset, offset + length)`.
    pub fn lines_spanned(&self, offset: usize, length: usize) -> Result<usize> {
        self.core.read()?.tracker.lines_spanned(offset, length)
    }

    /// Number of line delimiters in `text`.
    pub fn count_line_breaks(&self, text: &str) -> usize {
        self.delimiters.count(text)
    }

    /// Snapshot of every line.
    pub fn lines(&self) -> Result<Vec<LineInformation>> {
        Ok(self.core.read()?.tracker.lines())
    }

    // Positions

    /// Register a position category with the default update policy.
    pub fn add_position_category(&mut self, name: &str) -> Result<()> {
        self.core.write()?.positions.add_category(name);
        Ok(())
    }

    /// Register a position category with a custom update policy.
    pub fn add_position_category_with_updater(
        &mut self,
        name: &str,
        updater: Arc<dyn PositionUpdater>,
    ) -> Result<()> {
        self.core
            .write()?
            .positions
            .add_category_with_updater(name, updater);
        Ok(())
    }

    /// Unregister a category and its positions.
    ///
    /// Categories owned by projections cannot be removed here.
    pub fn remove_position_category(&mut self, name: &str) -> Result<()> {
        let mut core = self.core.write()?;
        if core.owns_category(name) {
            return Err(DocumentError::IllegalState(
                "category is owned by a projection",
            ));
        }
        core.positions.remove_category(name)
    }

    /// Whether `name` is a registered category.
    pub fn contains_position_category(&self, name: &str) -> Result<bool> {
        Ok(self.core.read()?.positions.contains_category(name))
    }

    /// Registered category names, sorted.
    pub fn position_categories(&self) -> Result<Vec<String>> {
        Ok(self.core.read()?.positions.categories())
    }

    /// Track `position` in `category`.
    pub fn add_position(&mut self, category: &str, position: Position) -> Result<PositionId> {
        self.core.write()?.positions.add(category, position)
    }

    /// Stop tracking a position. Returns `false` if it is not in `category`.
    pub fn remove_position(&mut self, category: &str, id: PositionId) -> Result<bool> {
        self.core.write()?.positions.remove(category, id)
    }

    /// Current value of a position.
    pub fn position(&self, id: PositionId) -> Result<Option<Position>> {
        Ok(self.core.read()?.positions.position(id))
    }

    /// Positions of `category`, ordered by offset.
    pub fn positions(&self, category: &str) -> Result<Vec<Position>> {
        self.core.read()?.positions.snapshot(category)
    }

    /// Positions of `category` with their ids, ordered by offset.
    pub fn positions_with_ids(&self, category: &str) -> Result<Vec<(PositionId, Position)>> {
        self.core.read()?.positions.snapshot_with_ids(category)
    }

    /// Number of positions of `category` starting before `offset`.
    pub fn index_in_category(&self, category: &str, offset: usize) -> Result<usize> {
        self.core
            .read()?
            .positions
            .index_in_category(category, offset)
    }

    /// Positions of `category` intersecting `[offset, offset + length)`.
    pub fn overlapping_positions(
        &self,
        category: &str,
        offset: usize,
        length: usize,
    ) -> Result<Vec<(PositionId, Position)>> {
        self.core
            .read()?
            .positions
            .overlapping(category, offset, length)
    }

    // Rewrite sessions

    /// Start deferring changes. Fails with `IllegalState` if a session is active.
    pub fn start_rewrite_session(&self) -> Result<RewriteSession> {
        self.core.begin()
    }

    /// Apply the changes deferred by `session`. A stale token is ignored.
    pub fn stop_rewrite_session(&self, session: RewriteSession) -> Result<()> {
        self.core.end(session)
    }

    /// Discard the changes deferred by `session`; returns how many were dropped.
    pub fn abandon_rewrite_session(&mut self, session: RewriteSession) -> Result<usize> {
        let discarded = self.core.abandon(session)?;
        self.length = self.core.target_mut().store.len();
        Ok(discarded)
    }

    /// The active session, if any.
    pub fn active_rewrite_session(&self) -> Option<RewriteSession> {
        self.core.active_session()
    }

    // Projections

    /// New projection with nothing visible.
    pub fn create_projection(&mut self) -> Result<ProjectionId> {
        let id = self.core.write()?.create_projection();
        debug!(?id, "projection created");
        Ok(id)
    }

    /// New projection showing `[offset, offset + length)`.
    pub fn create_projection_showing(
        &mut self,
        offset: usize,
        length: usize,
    ) -> Result<ProjectionId> {
        BadLocation::check_range(offset, length, self.length)?;
        let id = self.create_projection()?;
        self.projection_mut(id)?.show(offset, length)?;
        Ok(id)
    }

    /// Drop a projection and its bookkeeping.
    pub fn remove_projection(&mut self, id: ProjectionId) -> Result<()> {
        let mut core = self.core.write()?;
        let projection = core
            .projections
            .remove(id)
            .ok_or(DocumentError::UnknownProjection(id))?;
        projection.release(&mut core.positions)?;
        debug!(?id, "projection removed");
        Ok(())
    }

    /// Live projection handles.
    pub fn projection_ids(&self) -> Result<Vec<ProjectionId>> {
        Ok(self.core.read()?.projections.keys().collect())
    }

    /// Read view of a projection.
    ///
    /// The view holds a read lock on the document until dropped.
    pub fn projection(&self, id: ProjectionId) -> Result<ProjectionDocument<'_>> {
        let core = self.core.read()?;
        core.projection(id)?;
        Ok(ProjectionDocument::new(core, id))
    }

    /// Edit view of a projection.
    pub fn projection_mut(&mut self, id: ProjectionId) -> Result<ProjectionDocumentMut<'_>> {
        self.core.read()?.projection(id)?;
        Ok(ProjectionDocumentMut::new(self, id))
    }
}

impl Default for Document {
    fn default() -> Self {
        Self::new("")
    }
}

impl std::fmt::Debug for Document {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Document")
            .field("length", &self.length)
            .field("session", &self.core.active_session())
            .finish_non_exhaustive()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Mutex;

    #[test]
    fn test_lines_follow_edits() {
        let mut document = Document::new("a\nbc\n");
        assert_eq!(document.line_count().unwrap(), 3);
        document.replace(1, 1, "").unwrap();
        assert_eq!(document.text().unwrap(), "abc\n");
        assert_eq!(document.line_count().unwrap(), 2);
        assert_eq!(document.line_delimiter(0).unwrap().as_deref(), Some("\n"));
        assert_eq!(document.line_delimiter(1).unwrap(), None);
    }

    #[test]
    fn test_replace_validates_range() {
        let mut document = Document::new("abc");
        assert!(matches!(
            document.replace(2, 5, "x"),
            Err(DocumentError::BadLocation(BadLocation::Range { .. }))
        ));
        assert_eq!(document.len(), 3);
    }

    #[test]
    fn test_custom_delimiters() {
        let options = DocumentOptions::default().with_delimiters(["::"]);
        let document = Document::with_options("a::b\nc::", options).unwrap();
        assert_eq!(document.line_count().unwrap(), 3);
        assert_eq!(document.line_length(1).unwrap(), 5);
        assert!(Document::with_options("", DocumentOptions::default().with_delimiters([""])).is_err());
    }

    #[test]
    fn test_edit_completes_custom_delimiter() {
        let options = DocumentOptions::default().with_delimiters(["<br>"]);
        let mut document = Document::with_options("a<br", options.clone()).unwrap();
        document.replace(4, 0, ">b").unwrap();
        let fresh = Document::with_options("a<br>b", options).unwrap();
        assert_eq!(document.lines().unwrap(), fresh.lines().unwrap());
        assert_eq!(document.line_count().unwrap(), 2);
        assert_eq!(document.line_delimiter(0).unwrap().as_deref(), Some("<br>"));
    }

    #[test]
    fn test_listeners_see_committed_changes() {
        let seen = Arc::new(Mutex::new(Vec::new()));
        let mut document = Document::new("hello");
        let sink = Arc::clone(&seen);
        document.subscribe(move |event| sink.lock().unwrap().push(event.clone()));

        document.replace(5, 0, " world").unwrap();
        document.set("bye").unwrap();
        assert_eq!(
            *seen.lock().unwrap(),
            vec![
                DocumentEvent::new(5, 0, " world"),
                DocumentEvent::new(0, 11, "bye"),
            ]
        );
    }

    #[test]
    fn test_session_defers_and_abandon_restores() {
        let mut document = Document::new("one\ntwo");
        document.add_position_category("marks").unwrap();
        let mark = document.add_position("marks", Position::new(4, 3)).unwrap();

        let session = document.start_rewrite_session().unwrap();
        document.replace(0, 4, "").unwrap();
        document.replace(0, 0, "zero ").unwrap();
        assert_eq!(document.len(), 8);
        assert_eq!(document.abandon_rewrite_session(session).unwrap(), 2);

        assert_eq!(document.len(), 7);
        assert_eq!(document.text().unwrap(), "one\ntwo");
        assert_eq!(document.position(mark).unwrap(), Some(Position::new(4, 3)));
    }

    #[test]
    fn test_query_flushes_session() {
        let mut document = Document::new("x");
        let session = document.start_rewrite_session().unwrap();
        document.replace(1, 0, "\ny").unwrap();
        assert_eq!(document.line_count().unwrap(), 2);
        assert_eq!(document.active_rewrite_session(), None);
        document.stop_rewrite_session(session).unwrap();
        assert!(document.abandon_rewrite_session(session).is_err());
    }

    #[test]
    fn test_projection_categories_are_protected() {
        let mut document = Document::new("abcdef");
        document.create_projection_showing(1, 2).unwrap();
        let owned = document
            .position_categories()
            .unwrap()
            .into_iter()
            .find(|name| name.starts_with("projection."))
            .unwrap();
        assert!(matches!(
            document.remove_position_category(&owned),
            Err(DocumentError::IllegalState(_))
        ));
    }

    #[test]
    fn test_remove_projection() {
        let mut document = Document::new("abcdef");
        let id = document.create_projection_showing(0, 3).unwrap();
        let categories = document.position_categories().unwrap().len();
        document.remove_projection(id).unwrap();
        assert_eq!(document.position_categories().unwrap().len(), categories - 1);
        assert!(matches!(
            document.projection(id),
            Err(DocumentError::UnknownProjection(_))
        ));
        assert!(document.remove_projection(id).is_err());
    }
}
