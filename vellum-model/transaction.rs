//! Atomic document edits.
//!
//! This module provides the two types every mutation goes through:
//! [`ChangeSet`] for the low-level operation list and [`Transaction`] for a
//! complete edit that may also carry an explicit selection, inline attribute
//! assignments, and a provenance tag.
//!
//! # Operations
//!
//! A [`ChangeSet`] is a sequence of [`Operation`]s applied from the start of
//! the document:
//!
//! - **Retain(n)** - keep `n` characters unchanged
//! - **Delete(n)** - remove `n` characters
//! - **Insert(s)** - insert the string `s`
//!
//! A changeset records the document length it was built against and refuses
//! to apply to anything else.
//!
//! # Provenance
//!
//! Every [`Transaction`] carries a [`Source`]:
//!
//! - **UserInput** - produced by the user typing or deleting
//! - **Programmatic** - produced by feature code or the host application
//! - **Transparent** - side-channel bookkeeping that must not trigger any
//!   typing feature
//!
//! Watchers skip transparent batches entirely; the transformation engine
//! additionally requires `UserInput` before it will rewrite anything.
//!
//! # Basic Usage
//!
//! ```ignore
//! use ropey::Rope;
//! use vellum_model::transaction::Transaction;
//!
//! let mut doc = Rope::from("hello world");
//!
//! // Replace "world" with "rust".
//! let tx = Transaction::change(&doc, vec![(6, 11, Some("rust".into()))])?;
//! tx.apply(&mut doc)?;
//! assert_eq!(doc.to_string(), "hello rust");
//! ```

use ropey::{
  Rope,
  RopeBuilder,
  RopeSlice,
};
use thiserror::Error;

use crate::{
  Tendril,
  attributes::Attributes,
  selection::Selection,
};

pub type Result<T> = std::result::Result<T, TransactionError>;

/// (from, to) replacement.
pub type Change = (usize, usize, Option<Tendril>);
pub type Deletion = (usize, usize);

/// Attribute assignment over a span, in post-change coordinates.
pub type AttrAssign = (usize, usize, Attributes);

#[derive(Debug, Error, PartialEq, Eq)]
#[non_exhaustive]
pub enum TransactionError {
  #[error("changeset length mismatch: expected {expected}, got {actual}")]
  LengthMismatch { expected: usize, actual: usize },
  #[error("invalid change range: start {from} is after end {to}")]
  InvalidRange { from: usize, to: usize },
  #[error("change range {from}..{to} is out of bounds for document length {len}")]
  RangeOutOfBounds {
    from: usize,
    to:   usize,
    len:  usize,
  },
  #[error("change range {from}..{to} overlaps previous end {prev_end}")]
  OverlappingRange {
    prev_end: usize,
    from:     usize,
    to:       usize,
  },
  #[error("position {pos} is out of bounds for changeset length {len}")]
  PositionOutOfBounds { pos: usize, len: usize },
  #[error("attribute range {from}..{to} is out of bounds for document length {len}")]
  AttrRangeOutOfBounds {
    from: usize,
    to:   usize,
    len:  usize,
  },
}

/// Where a transaction came from.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub enum Source {
  /// Organic user input: typing, deleting, composing.
  UserInput,
  /// Feature code or host application edits.
  #[default]
  Programmatic,
  /// Bookkeeping edits excluded from typing-feature notifications.
  Transparent,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Operation {
  /// Move past n characters.
  Retain(usize),

  /// Delete n characters.
  Delete(usize),

  /// Insert text at position.
  Insert(Tendril),
}

impl Operation {
  pub fn len_chars(&self) -> usize {
    match self {
      Operation::Retain(n) | Operation::Delete(n) => *n,
      Operation::Insert(s) => s.chars().count(),
    }
  }
}

/// Which side of an insertion a mapped position sticks to.
#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub enum Assoc {
  Before,
  After,
}

#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct ChangeSet {
  pub(crate) changes: Vec<Operation>,
  /// The required document length. Will refuse to apply changes unless it
  /// matches.
  len:                usize,
  len_after:          usize,
}

impl ChangeSet {
  pub fn with_capacity(capacity: usize) -> Self {
    Self {
      changes:   Vec::with_capacity(capacity),
      len:       0,
      len_after: 0,
    }
  }

  #[must_use]
  pub fn new(doc: RopeSlice) -> Self {
    let len = doc.len_chars();
    Self {
      changes: Vec::new(),
      len,
      len_after: len,
    }
  }

  pub fn operations(&self) -> &[Operation] {
    &self.changes
  }

  /// Returns the expected document length for this changeset.
  pub fn len(&self) -> usize {
    self.len
  }

  /// Returns the document length after this changeset applies.
  pub fn len_after(&self) -> usize {
    self.len_after
  }

  // Changeset builder operations: delete/insert/retain.
  //

  pub fn delete(&mut self, n: usize) {
    use Operation::*;

    if n == 0 {
      return;
    }

    self.len += n;

    if let Some(Delete(count)) = self.changes.last_mut() {
      *count += n;
    } else {
      self.changes.push(Delete(n))
    }
  }

  pub fn insert(&mut self, fragment: Tendril) {
    use Operation::*;

    if fragment.is_empty() {
      return;
    }

    self.len_after += fragment.chars().count();

    let new_last = match self.changes.as_mut_slice() {
      [.., Insert(prev)] | [.., Insert(prev), Delete(_)] => {
        prev.push_str(&fragment);
        return;
      },
      [.., last @ Delete(_)] => std::mem::replace(last, Insert(fragment)),
      _ => Insert(fragment),
    };

    self.changes.push(new_last);
  }

  pub fn retain(&mut self, n: usize) {
    use Operation::*;

    if n == 0 {
      return;
    }

    self.len += n;
    self.len_after += n;

    if let Some(Retain(count)) = self.changes.last_mut() {
      *count += n;
    } else {
      self.changes.push(Retain(n))
    }
  }

  fn ensure_len(&self, text_len: usize) -> Result<()> {
    if text_len != self.len {
      return Err(TransactionError::LengthMismatch {
        expected: self.len,
        actual:   text_len,
      });
    }
    Ok(())
  }

  /// Apply this changeset in-place.
  pub fn apply(&self, text: &mut Rope) -> Result<()> {
    self.ensure_len(text.len_chars())?;
    let mut pos = 0;

    for change in &self.changes {
      use Operation::*;
      match change {
        Retain(n) => pos += n,
        Delete(n) => text.remove(pos..pos + *n),
        Insert(s) => {
          text.insert(pos, s);
          pos += s.chars().count();
        },
      }
    }

    Ok(())
  }

  /// Apply this changeset to a rope and return the updated rope, leaving the
  /// input untouched.
  pub fn apply_to(&self, text: &Rope) -> Result<Rope> {
    self.ensure_len(text.len_chars())?;
    if self.is_empty() {
      return Ok(text.clone());
    }

    let mut builder = RopeBuilder::new();
    let mut pos = 0;

    let append_slice = |from: usize, to: usize, builder: &mut RopeBuilder| {
      if from >= to {
        return;
      }
      let slice = text.slice(from..to);
      for chunk in slice.chunks() {
        builder.append(chunk);
      }
    };

    for change in &self.changes {
      use Operation::*;
      match change {
        Retain(n) => {
          append_slice(pos, pos + *n, &mut builder);
          pos += n;
        },
        Delete(n) => {
          pos += n;
        },
        Insert(s) => {
          builder.append(s.as_str());
        },
      }
    }

    append_slice(pos, self.len, &mut builder);

    Ok(builder.finish())
  }

  #[inline]
  pub fn is_empty(&self) -> bool {
    self.changes.is_empty() || self.changes == [Operation::Retain(self.len)]
  }

  /// Map a position through the changes.
  ///
  /// `assoc` indicates which side to associate the position with: `Before`
  /// keeps it in front of insertions at that exact point, `After` moves it
  /// past them. Positions inside a deleted span collapse to the start of the
  /// gap.
  pub fn map_pos(&self, pos: usize, assoc: Assoc) -> Result<usize> {
    use Operation::*;

    if pos > self.len {
      return Err(TransactionError::PositionOutOfBounds { pos, len: self.len });
    }

    let mut old_pos = 0;
    let mut new_pos = 0;

    for change in &self.changes {
      match change {
        Retain(n) => {
          if pos < old_pos + n {
            return Ok(new_pos + (pos - old_pos));
          }
          old_pos += n;
          new_pos += n;
        },
        Delete(n) => {
          if pos < old_pos + n {
            return Ok(new_pos);
          }
          old_pos += n;
        },
        Insert(s) => {
          if pos == old_pos && assoc == Assoc::Before {
            return Ok(new_pos);
          }
          new_pos += s.chars().count();
        },
      }
    }

    // Anything past the last operation sits in the implicit trailing retain.
    Ok(new_pos + (pos - old_pos))
  }

  pub fn changes_iter(&self) -> ChangeIterator<'_> {
    ChangeIterator::new(self)
  }
}

pub struct ChangeIterator<'a> {
  iter: std::iter::Peekable<std::slice::Iter<'a, Operation>>,
  pos:  usize,
}

impl<'a> ChangeIterator<'a> {
  fn new(changeset: &'a ChangeSet) -> Self {
    let iter = changeset.changes.iter().peekable();
    Self { iter, pos: 0 }
  }
}

impl Iterator for ChangeIterator<'_> {
  type Item = Change;

  fn next(&mut self) -> Option<Self::Item> {
    use Operation::*;

    loop {
      match self.iter.next()? {
        Retain(len) => {
          self.pos += len;
        },
        Delete(len) => {
          let start = self.pos;
          self.pos += len;
          return Some((start, self.pos, None));
        },
        Insert(s) => {
          let start = self.pos;
          // a subsequent delete means a replace, consume it
          if let Some(Delete(len)) = self.iter.peek() {
            self.iter.next();

            self.pos += len;
            return Some((start, self.pos, Some(s.clone())));
          } else {
            return Some((start, start, Some(s.clone())));
          }
        },
      }
    }
  }
}

fn validate_change_bounds(from: usize, to: usize, len: usize) -> Result<()> {
  if from > to {
    return Err(TransactionError::InvalidRange { from, to });
  }
  if to > len {
    return Err(TransactionError::RangeOutOfBounds { from, to, len });
  }
  Ok(())
}

impl From<ChangeSet> for Transaction {
  fn from(changes: ChangeSet) -> Self {
    Self {
      changes,
      selection: None,
      attr_assigns: Vec::new(),
      source: Source::default(),
    }
  }
}

#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct Transaction {
  changes:      ChangeSet,
  selection:    Option<Selection>,
  attr_assigns: Vec<AttrAssign>,
  source:       Source,
}

impl Transaction {
  pub fn new(doc: &Rope) -> Self {
    Self::from(ChangeSet::new(doc.slice(..)))
  }

  /// Changes made to the buffer.
  pub fn changes(&self) -> &ChangeSet {
    &self.changes
  }

  /// When set, explicitly updates the selection.
  pub fn selection(&self) -> Option<&Selection> {
    self.selection.as_ref()
  }

  /// Attribute assignments applied after the text changes, in post-change
  /// coordinates.
  pub fn attr_assigns(&self) -> &[AttrAssign] {
    &self.attr_assigns
  }

  pub fn source(&self) -> Source {
    self.source
  }

  /// Apply this transaction's text changes in-place.
  ///
  /// Attribute assignments and selection updates live on the document level;
  /// see `Document::apply`.
  pub fn apply(&self, doc: &mut Rope) -> Result<()> {
    self.changes.apply(doc)
  }

  /// Apply this transaction's text changes to a rope and return the result.
  pub fn apply_to(&self, doc: &Rope) -> Result<Rope> {
    self.changes.apply_to(doc)
  }

  pub fn with_selection(mut self, selection: Selection) -> Self {
    self.selection = Some(selection);
    self
  }

  pub fn with_source(mut self, source: Source) -> Self {
    self.source = source;
    self
  }

  /// Assign `attrs` to the span `from..to` of the post-change document.
  pub fn with_attributes(mut self, from: usize, to: usize, attrs: Attributes) -> Self {
    self.attr_assigns.push((from, to, attrs));
    self
  }

  /// Generate a transaction from a set of changes.
  pub fn change<I>(doc: &Rope, changes: I) -> Result<Self>
  where
    I: IntoIterator<Item = Change>,
  {
    let len = doc.len_chars();
    let changes = changes.into_iter();
    let (lower, upper) = changes.size_hint();
    let size = upper.unwrap_or(lower);
    let mut changeset = ChangeSet::with_capacity(2 * size + 1); // rough estimate

    let mut last = 0;
    for (from, to, tendril) in changes {
      validate_change_bounds(from, to, len)?;
      if from < last {
        return Err(TransactionError::OverlappingRange {
          prev_end: last,
          from,
          to,
        });
      }

      // Retain from last "to" to current "from"
      changeset.retain(from - last);
      let span = to - from;
      match tendril {
        Some(text) => {
          changeset.insert(text);
          changeset.delete(span);
        },
        None => changeset.delete(span),
      }
      last = to;
    }

    changeset.retain(len - last);

    Ok(Self::from(changeset))
  }

  /// Generate a transaction from a set of potentially overlapping deletions
  /// by merging overlapping deletions together.
  pub fn delete<I>(doc: &Rope, deletions: I) -> Result<Self>
  where
    I: IntoIterator<Item = Deletion>,
  {
    let len = doc.len_chars();

    let mut deletions: Vec<_> = deletions.into_iter().collect();
    deletions.sort_by_key(|(from, to)| (*from, *to));

    let mut merged = Vec::with_capacity(deletions.len());
    for (from, to) in deletions {
      validate_change_bounds(from, to, len)?;
      match merged.last_mut() {
        Some((_, last_end)) if from <= *last_end => {
          *last_end = (*last_end).max(to);
        },
        _ => merged.push((from, to)),
      }
    }

    Self::change(doc, merged.into_iter().map(|(from, to)| (from, to, None)))
  }

  /// Insert text at a single position.
  pub fn insert(doc: &Rope, pos: usize, text: Tendril) -> Result<Self> {
    Self::change(doc, std::iter::once((pos, pos, Some(text))))
  }

  pub fn changes_iter(&self) -> ChangeIterator<'_> {
    self.changes.changes_iter()
  }
}
