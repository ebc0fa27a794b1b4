//! Caret positions and selections.
//!
//! A [`Range`] has two positions: `anchor` and `head`. The `head` is where
//! the caret visually sits, the `anchor` is the other end of the selection.
//! When `anchor == head` the range is collapsed: a simple caret, not a span.
//!
//! ```text
//! anchor=2, head=7: "he[llo w]orld"  (forward selection)
//! anchor=7, head=2: "he]llo w[orld"  (backward selection)
//! anchor=5, head=5: "hello|world"    (collapsed caret)
//! ```
//!
//! The host model here is a browser-style document with exactly one
//! selection, so [`Selection`] wraps a single [`Range`]. Typing features
//! only ever act on a collapsed selection; `is_collapsed` is the query they
//! gate on.

use crate::transaction::{
  Assoc,
  ChangeSet,
  Result,
};

/// The direction of a selection or an editing operation.
#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub enum Direction {
  /// Toward the end of the document (increasing positions).
  Forward,
  /// Toward the start of the document (decreasing positions).
  Backward,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Range {
  pub anchor: usize,
  pub head:   usize,
}

impl Range {
  pub fn new(anchor: usize, head: usize) -> Self {
    Self { anchor, head }
  }

  #[inline]
  pub fn point(head: usize) -> Self {
    Self::new(head, head)
  }

  /// Start of the range.
  #[inline]
  #[must_use]
  pub fn from(&self) -> usize {
    std::cmp::min(self.anchor, self.head)
  }

  /// End of the range.
  #[inline]
  #[must_use]
  pub fn to(&self) -> usize {
    std::cmp::max(self.anchor, self.head)
  }

  /// Length of the range.
  #[inline]
  #[must_use]
  pub fn len(&self) -> usize {
    self.to() - self.from()
  }

  /// When the head and anchor sit at the same position, we have a caret.
  #[inline]
  #[must_use]
  pub fn is_empty(&self) -> bool {
    self.anchor == self.head
  }

  #[inline]
  pub fn contains(&self, pos: usize) -> bool {
    self.from() <= pos && pos < self.to()
  }

  #[inline]
  #[must_use]
  pub fn direction(&self) -> Direction {
    if self.head < self.anchor {
      Direction::Backward
    } else {
      Direction::Forward
    }
  }

  /// Flips the direction of the selection.
  #[inline]
  #[must_use]
  pub fn flip(&self) -> Self {
    Self {
      anchor: self.head,
      head:   self.anchor,
    }
  }

  /// Map this range through a set of changes. A collapsed caret rides after
  /// text inserted at its position (that is what typing feels like); range
  /// edges stick to the outside of insertions at their boundaries.
  pub fn map(self, changes: &ChangeSet) -> Result<Self> {
    if changes.is_empty() {
      return Ok(self);
    }

    if self.is_empty() {
      let pos = changes.map_pos(self.head, Assoc::After)?;
      return Ok(Self::point(pos));
    }

    let from = changes.map_pos(self.from(), Assoc::Before)?;
    let to = changes.map_pos(self.to(), Assoc::After)?;
    let mapped = Self::new(from, to.max(from));
    Ok(match self.direction() {
      Direction::Forward => mapped,
      Direction::Backward => mapped.flip(),
    })
  }
}

/// The document's single selection.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Selection {
  range: Range,
}

impl Selection {
  pub fn new(range: Range) -> Self {
    Self { range }
  }

  /// A collapsed selection (a caret) at `pos`.
  #[inline]
  pub fn point(pos: usize) -> Self {
    Self::new(Range::point(pos))
  }

  #[inline]
  pub fn range(&self) -> Range {
    self.range
  }

  #[inline]
  pub fn head(&self) -> usize {
    self.range.head
  }

  #[inline]
  pub fn anchor(&self) -> usize {
    self.range.anchor
  }

  #[inline]
  pub fn from(&self) -> usize {
    self.range.from()
  }

  #[inline]
  pub fn to(&self) -> usize {
    self.range.to()
  }

  /// True for a caret, false for a span.
  #[inline]
  pub fn is_collapsed(&self) -> bool {
    self.range.is_empty()
  }

  /// Map the selection through a set of changes.
  pub fn map(self, changes: &ChangeSet) -> Result<Self> {
    Ok(Self::new(self.range.map(changes)?))
  }
}

impl From<Range> for Selection {
  fn from(range: Range) -> Self {
    Self::new(range)
  }
}
