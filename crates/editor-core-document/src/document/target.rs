//! Mutable state behind a [`Document`](super::Document).
//!
//! Everything a text change touches lives here, so that the rewrite session
//! coordinator can defer a change as one unit: text store, line tracker, positions,
//! projections and listeners.

use crate::delimiters::DelimiterSet;
use crate::error::{DocumentError, Result};
use crate::event::{DocumentEvent, DocumentEventCallback};
use crate::line_tracker::LineTracker;
use crate::positions::PositionIndex;
use crate::projection::{Projection, ProjectionId, ProjectionMapping};
use crate::rewrite_session::RewriteTarget;
use crate::text_store::TextStore;
use slotmap::SlotMap;
use tracing::trace;

/// Where a change came from.
pub(crate) enum EditOrigin {
    /// Edited through the document itself.
    Document,
    /// Translated from an edit of a projection; `child_event` is that edit.
    Projection {
        id: ProjectionId,
        child_event: DocumentEvent,
    },
}

/// A deferred document change.
pub(crate) enum DocumentRequest {
    Set(String),
    Replace {
        event: DocumentEvent,
        origin: EditOrigin,
    },
}

pub(crate) struct DocumentCore {
    pub(crate) store: Box<dyn TextStore>,
    pub(crate) tracker: LineTracker,
    pub(crate) positions: PositionIndex,
    pub(crate) projections: SlotMap<ProjectionId, Projection>,
    pub(crate) callbacks: Vec<DocumentEventCallback>,
    next_category: u64,
}

impl DocumentCore {
    pub(crate) fn new(store: Box<dyn TextStore>, delimiters: DelimiterSet, text: &str) -> Self {
        let positions = PositionIndex::new(store.len());
        Self {
            store,
            tracker: LineTracker::with_text(delimiters, text),
            positions,
            projections: SlotMap::with_key(),
            callbacks: Vec::new(),
            next_category: 0,
        }
    }

    pub(crate) fn projection(&self, id: ProjectionId) -> Result<&Projection> {
        self.projections
            .get(id)
            .ok_or(DocumentError::UnknownProjection(id))
    }

    pub(crate) fn create_projection(&mut self) -> ProjectionId {
        let category = format!("projection.segments.{}", self.next_category);
        self.next_category += 1;
        let projection = Projection::new(
            category,
            &mut self.positions,
            self.tracker.delimiters().clone(),
        );
        self.projections.insert(projection)
    }

    /// Whether `name` is bookkeeping of a projection.
    pub(crate) fn owns_category(&self, name: &str) -> bool {
        self.projections
            .values()
            .any(|projection| projection.category() == name)
    }

    fn commit(&mut self, event: &DocumentEvent, origin: EditOrigin) -> Result<()> {
        let before: Vec<(ProjectionId, ProjectionMapping)> = self
            .projections
            .iter()
            .map(|(id, projection)| (id, projection.mapping().clone()))
            .collect();
        self.positions.update(event);

        let mut child_events = Vec::new();
        for (id, mapping) in before {
            let echo = match &origin {
                EditOrigin::Projection {
                    id: source,
                    child_event,
                } if *source == id => Some(child_event.clone()),
                _ => None,
            };
            if let Some(projection) = self.projections.get_mut(id)
                && let Some(child_event) =
                    projection.parent_changed(
                        &mut self.positions,
                        self.store.as_ref(),
                        event,
                        &mapping,
                        echo,
                    )?
            {
                child_events.push((id, child_event));
            }
        }

        for callback in &mut self.callbacks {
            callback(event);
        }
        // Projection listeners only hear about a change once the parent committed it.
        for (id, child_event) in child_events {
            if let Some(projection) = self.projections.get_mut(id) {
                projection.notify(&child_event);
            }
        }
        Ok(())
    }
}

impl RewriteTarget for DocumentCore {
    type Request = DocumentRequest;

    fn apply(&mut self, request: DocumentRequest) -> Result<()> {
        match request {
            DocumentRequest::Set(text) => {
                let event = DocumentEvent::new(0, self.store.len(), text);
                trace!(length = event.length, "set document text");
                self.store.set(&event.text);
                self.tracker.set(&event.text);
                self.commit(&event, EditOrigin::Document)
            }
            DocumentRequest::Replace { event, origin } => {
                trace!(
                    offset = event.offset,
                    length = event.length,
                    "replace document text"
                );
                self.store.replace(event.offset, event.length, &event.text)?;
                let store = &self.store;
                self.tracker.replace_with_context(
                    event.offset,
                    event.length,
                    &event.text,
                    |offset, length| store.get(offset, length),
                )?;
                self.commit(&event, origin)
            }
        }
    }
}
