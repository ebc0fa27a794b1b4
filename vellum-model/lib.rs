//! The host-document surface of the vellum typing engine.
//!
//! This crate is the minimal in-process stand-in for a rich-text editing
//! framework's model layer: a rope of plain text plus run-length inline
//! formatting attributes, a single (possibly collapsed) selection, and
//! atomic, source-tagged transactions. Feature code above it never touches
//! the rope directly; every mutation flows through
//! [`document::Document::apply`].
//!
//! Block boundaries are plain `\n`. Non-text inline nodes (images, mentions,
//! widgets) occupy exactly one character position, represented by
//! [`INLINE_OBJECT`].

use smartstring::{
  LazyCompact,
  SmartString,
};

pub mod attributes;
pub mod document;
pub mod position;
pub mod selection;
pub mod transaction;

pub type Tendril = SmartString<LazyCompact>;

/// Placeholder for a non-text inline node (U+FFFC OBJECT REPLACEMENT
/// CHARACTER). Caret-context extraction and word walks treat it as an opaque
/// boundary.
pub const INLINE_OBJECT: char = '\u{FFFC}';
