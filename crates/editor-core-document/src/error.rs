//! Error taxonomy shared by every component of the document model.
//!
//! Errors are always reported to the immediate caller. Nothing in this crate
//! retries, clamps or silently corrects an invalid argument.

use crate::projection::ProjectionId;
use thiserror::Error;

/// An offset, range or line argument that does not address the current text.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
pub enum BadLocation {
    /// Offset past the end of the text.
    #[error("offset {offset} is outside of text of length {len}")]
    Offset {
        /// Requested offset.
        offset: usize,
        /// Text length at the time of the call.
        len: usize,
    },
    /// Range extending past the end of the text.
    #[error("range {offset}+{length} is outside of text of length {len}")]
    Range {
        /// Range start.
        offset: usize,
        /// Range length.
        length: usize,
        /// Text length at the time of the call.
        len: usize,
    },
    /// Line number outside of `0..count`.
    #[error("line {line} does not exist (line count {count})")]
    Line {
        /// Requested line.
        line: usize,
        /// Number of lines.
        count: usize,
    },
    /// Projection translation for an offset that no chunk covers.
    #[error("offset {offset} is not covered by any projection chunk")]
    Unmapped {
        /// Offset that could not be translated.
        offset: usize,
    },
}

impl BadLocation {
    /// Validate `offset <= len`.
    pub fn check_offset(offset: usize, len: usize) -> Result<(), BadLocation> {
        if offset > len {
            return Err(BadLocation::Offset { offset, len });
        }
        Ok(())
    }

    /// Validate `offset + length <= len` without overflowing.
    pub fn check_range(offset: usize, length: usize, len: usize) -> Result<(), BadLocation> {
        match offset.checked_add(length) {
            Some(end) if end <= len => Ok(()),
            _ => Err(BadLocation::Range {
                offset,
                length,
                len,
            }),
        }
    }

    /// Validate `line < count`.
    pub fn check_line(line: usize, count: usize) -> Result<(), BadLocation> {
        if line >= count {
            return Err(BadLocation::Line { line, count });
        }
        Ok(())
    }
}

/// Errors raised by the document model.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum DocumentError {
    /// Invalid offset, range or line argument.
    #[error("bad location: {0}")]
    BadLocation(#[from] BadLocation),
    /// Position category used before it was registered.
    #[error("position category `{0}` is not registered")]
    BadPositionCategory(String),
    /// Rewrite session protocol violation.
    #[error("illegal state: {0}")]
    IllegalState(&'static str),
    /// Projection handle that does not belong to this document (or was removed).
    #[error("projection {0:?} does not exist")]
    UnknownProjection(ProjectionId),
    /// Delimiter table rejected at construction.
    #[error("invalid delimiter table: {0}")]
    InvalidDelimiters(String),
}

/// Result alias used throughout the crate.
pub type Result<T, E = DocumentError> = std::result::Result<T, E>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_range_checks() {
        assert!(BadLocation::check_range(0, 5, 5).is_ok());
        assert!(BadLocation::check_range(5, 0, 5).is_ok());
        assert_eq!(
            BadLocation::check_range(3, 3, 5),
            Err(BadLocation::Range {
                offset: 3,
                length: 3,
                len: 5
            })
        );
        assert!(BadLocation::check_range(usize::MAX, 2, 5).is_err());
        assert!(BadLocation::check_offset(6, 5).is_err());
        assert!(BadLocation::check_line(2, 2).is_err());
    }

    #[test]
    fn test_display_wraps_location() {
        let err: DocumentError = BadLocation::Offset { offset: 9, len: 4 }.into();
        assert_eq!(
            err.to_string(),
            "bad location: offset 9 is outside of text of length 4"
        );
    }
}
