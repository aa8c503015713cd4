#![warn(missing_docs)]
//! Editor Core Document - Coordinate Tracking for Text Documents
//!
//! # Overview
//!
//! `editor-core-document` keeps derived coordinate data consistent with a mutable text
//! document: the line index, named categories of positions that move with edits,
//! batched rewrites, and projection documents that show a subset of a parent's text.
//! It does not render, parse or persist anything.
//!
//! # Core Features
//!
//! - **Incremental Line Tracking**: configurable delimiters, windowed rescans, list
//!   storage promoted to a balanced tree after the first edit
//! - **Positions**: arena-backed ranges grouped in categories, each with its own update
//!   policy
//! - **Rewrite Sessions**: queue a burst of edits and commit or abandon it as a whole
//! - **Projections**: child documents over disjoint parent ranges, with edits flowing
//!   both ways
//!
//! # Architecture Layers
//!
//! ```text
//! ┌─────────────────────────────────────────────┐
//! │  Document / ProjectionDocument              │  ← Public API
//! ├─────────────────────────────────────────────┤
//! │  RewriteSessionCoordinator                  │  ← Batching & Locking
//! ├──────────────┬──────────────┬───────────────┤
//! │ LineTracker  │ PositionIndex│ Projections   │  ← Derived Data
//! ├──────────────┴──────────────┴───────────────┤
//! │  TextStore (Rope-based)                     │  ← Text Storage
//! └─────────────────────────────────────────────┘
//! ```
//!
//! # Quick Start
//!
//! ```rust
//! use editor_core_document::{Document, Position};
//!
//! let mut document = Document::new("fn main() {\n}\n");
//! assert_eq!(document.line_count().unwrap(), 3);
//!
//! document.add_position_category("bookmarks").unwrap();
//! let mark = document.add_position("bookmarks", Position::new(12, 1)).unwrap();
//!
//! document.replace(0, 0, "// entry\n").unwrap();
//! assert_eq!(document.line_count().unwrap(), 4);
//! assert_eq!(document.position(mark).unwrap(), Some(Position::new(21, 1)));
//!
//! // Show only the signature line.
//! let folded = document.create_projection_showing(9, 12).unwrap();
//! let view = document.projection(folded).unwrap();
//! assert_eq!(view.text().unwrap(), "fn main() {\n");
//! assert_eq!(view.to_parent_offset(0).unwrap(), 9);
//! ```
//!
//! # Module Description
//!
//! - [`line_tracker`] - Line index over configurable delimiters
//! - [`positions`] - Position categories and update policies
//! - [`rewrite_session`] - Deferred, batched mutation
//! - [`projection`] - Chunk mapping between parent and child documents
//! - [`document`] - The document facade and projection views
//! - [`text_store`] - Character-indexed text storage
//!
//! # Offsets
//!
//! Every offset and length counts Unicode scalar values (`char`s), not bytes.

pub mod delimiters;
pub mod document;
pub mod error;
pub mod event;
pub mod line_tracker;
pub mod positions;
pub mod projection;
pub mod rewrite_session;
pub mod text_store;

pub use delimiters::{DEFAULT_DELIMITERS, DelimiterInfo, DelimiterSet};
pub use document::{Document, DocumentOptions, ProjectionDocument, ProjectionDocumentMut};
pub use error::{BadLocation, DocumentError, Result};
pub use event::{DocumentEvent, DocumentEventCallback};
pub use line_tracker::{LineInformation, LineTracker};
pub use positions::{
    DefaultPositionUpdater, Position, PositionId, PositionIndex, PositionUpdater, SegmentUpdater,
};
pub use projection::{Chunk, FRAGMENTS_CATEGORY, ProjectionId, ProjectionMapping};
pub use rewrite_session::{RewriteSession, RewriteSessionCoordinator, RewriteTarget, TextRequest};
pub use text_store::{RopeTextStore, TextStore};
