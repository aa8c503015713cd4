//! Text Storage
//!
//! The document model only talks to its text through [`TextStore`]. The bundled
//! implementation is a [`ropey::Rope`], which gives logarithmic character-indexed
//! slicing and editing.

use crate::error::{BadLocation, Result};
use ropey::Rope;

/// Character-indexed mutable text.
pub trait TextStore: Send + Sync {
    /// Length in characters.
    fn len(&self) -> usize;

    /// Whether the text is empty.
    fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Copy of `[offset, offset + length)`.
    fn get(&self, offset: usize, length: usize) -> Result<String>;

    /// Replace `[offset, offset + length)` with `text`.
    fn replace(&mut self, offset: usize, length: usize, text: &str) -> Result<()>;

    /// Replace the whole content.
    fn set(&mut self, text: &str);
}

/// Rope-backed [`TextStore`].
#[derive(Debug, Clone, Default)]
pub struct RopeTextStore {
    rope: Rope,
}

impl RopeTextStore {
    /// Store holding `text`.
    pub fn new(text: &str) -> Self {
        Self {
            rope: Rope::from_str(text),
        }
    }
}

impl TextStore for RopeTextStore {
    fn len(&self) -> usize {
        self.rope.len_chars()
    }

    fn get(&self, offset: usize, length: usize) -> Result<String> {
        BadLocation::check_range(offset, length, self.len())?;
        Ok(self.rope.slice(offset..offset + length).to_string())
    }

    fn replace(&mut self, offset: usize, length: usize, text: &str) -> Result<()> {
        BadLocation::check_range(offset, length, self.len())?;
        if length > 0 {
            self.rope.remove(offset..offset + length);
        }
        if !text.is_empty() {
            self.rope.insert(offset, text);
        }
        Ok(())
    }

    fn set(&mut self, text: &str) {
        self.rope = Rope::from_str(text);
    }
}
