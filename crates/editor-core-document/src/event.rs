//! Document change events.
//!
//! Every mutation of a document (or of a projection document) is described by a
//! single [`DocumentEvent`] expressed in **character offsets** (Unicode scalar
//! values) of the text *before* the change.

/// A single replacement of `length` characters at `offset` by `text`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DocumentEvent {
    /// Start character offset of the replaced range.
    pub offset: usize,
    /// Number of replaced characters.
    pub length: usize,
    /// Inserted text (may be empty).
    pub text: String,
}

impl DocumentEvent {
    /// Create an event replacing `[offset, offset + length)` with `text`.
    pub fn new(offset: usize, length: usize, text: impl Into<String>) -> Self {
        Self {
            offset,
            length,
            text: text.into(),
        }
    }

    /// Length of the inserted text in characters.
    pub fn text_length(&self) -> usize {
        self.text.chars().count()
    }

    /// Exclusive end of the replaced range in the pre-change text.
    pub fn end(&self) -> usize {
        self.offset + self.length
    }

    /// Returns `true` if the event neither removes nor inserts anything.
    pub fn is_empty(&self) -> bool {
        self.length == 0 && self.text.is_empty()
    }
}

/// Callback invoked after a change has been committed.
pub type DocumentEventCallback = Box<dyn FnMut(&DocumentEvent) + Send + Sync>;
