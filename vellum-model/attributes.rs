//! Inline formatting attributes.
//!
//! Attributes are stored as run-length spans riding alongside the rope: a
//! list of `(length, Attributes)` runs whose lengths sum to the document
//! length. Runs are rebuilt through every changeset so they stay aligned
//! with the text, and feature code assigns attributes to explicit spans
//! after the text changes land (see `Transaction::with_attributes`).
//!
//! Freshly inserted text starts with no attributes; whoever inserts it
//! decides what it inherits. The insert-text command inherits from the
//! character before the caret, while transformation replacements inherit
//! from the first replaced character.

use bitflags::bitflags;
use smallvec::SmallVec;

use crate::transaction::{
  ChangeSet,
  Operation,
};

bitflags! {
  /// Inline formatting flags carried by a span of text.
  #[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
  pub struct Attributes: u8 {
    const BOLD      = 1 << 0;
    const ITALIC    = 1 << 1;
    const UNDERLINE = 1 << 2;
    const CODE      = 1 << 3;
  }
}

/// Run-length encoded attributes covering the whole document.
///
/// Invariants: no zero-length runs, no two adjacent runs with equal
/// attributes, run lengths sum to the document length.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct AttrRuns {
  runs: SmallVec<[(usize, Attributes); 4]>,
}

impl AttrRuns {
  /// Plain (attribute-free) runs for a document of `len` characters.
  pub fn new(len: usize) -> Self {
    let mut runs = SmallVec::new();
    if len > 0 {
      runs.push((len, Attributes::empty()));
    }
    Self { runs }
  }

  /// Total number of characters covered.
  pub fn len(&self) -> usize {
    self.runs.iter().map(|(len, _)| len).sum()
  }

  pub fn is_empty(&self) -> bool {
    self.runs.is_empty()
  }

  /// Attributes of the character at `pos`. Past the end is attribute-free.
  pub fn attrs_at(&self, pos: usize) -> Attributes {
    let mut cursor = 0;
    for &(len, attrs) in &self.runs {
      if pos < cursor + len {
        return attrs;
      }
      cursor += len;
    }
    Attributes::empty()
  }

  /// Assign `attrs` to the characters in `from..to`.
  pub fn set(&mut self, from: usize, to: usize, attrs: Attributes) {
    if from >= to {
      return;
    }

    let mut out = SmallVec::new();
    let mut cursor = 0;

    for &(len, run_attrs) in &self.runs {
      let run_from = cursor;
      let run_to = cursor + len;
      cursor = run_to;

      // Piece before the assignment.
      let before = run_from..run_to.min(from);
      if before.start < before.end {
        push_run(&mut out, before.end - before.start, run_attrs);
      }

      // Piece inside the assignment.
      let inside = run_from.max(from)..run_to.min(to);
      if inside.start < inside.end {
        push_run(&mut out, inside.end - inside.start, attrs);
      }

      // Piece after the assignment.
      let after = run_from.max(to)..run_to;
      if after.start < after.end {
        push_run(&mut out, after.end - after.start, run_attrs);
      }
    }

    self.runs = out;
  }

  /// Rebuild the runs to match the document after `changes` applies.
  ///
  /// Retained text keeps its attributes, deleted text drops out, inserted
  /// text starts attribute-free.
  pub fn map_through(&self, changes: &ChangeSet) -> AttrRuns {
    if changes.operations().is_empty() {
      return self.clone();
    }

    let mut out = SmallVec::new();
    let mut pos = 0;

    for op in changes.operations() {
      match op {
        Operation::Retain(n) => {
          self.copy_span(&mut out, pos, pos + n);
          pos += n;
        },
        Operation::Delete(n) => {
          pos += n;
        },
        Operation::Insert(s) => {
          push_run(&mut out, s.chars().count(), Attributes::empty());
        },
      }
    }

    // Implicit trailing retain.
    self.copy_span(&mut out, pos, self.len());

    Self { runs: out }
  }

  fn copy_span(&self, out: &mut SmallVec<[(usize, Attributes); 4]>, from: usize, to: usize) {
    if from >= to {
      return;
    }

    let mut cursor = 0;
    for &(len, attrs) in &self.runs {
      let run_from = cursor;
      let run_to = cursor + len;
      cursor = run_to;

      let piece = run_from.max(from)..run_to.min(to);
      if piece.start < piece.end {
        push_run(out, piece.end - piece.start, attrs);
      }
      if run_to >= to {
        break;
      }
    }
  }
}

fn push_run(runs: &mut SmallVec<[(usize, Attributes); 4]>, len: usize, attrs: Attributes) {
  if len == 0 {
    return;
  }
  match runs.last_mut() {
    Some((last_len, last_attrs)) if *last_attrs == attrs => *last_len += len,
    _ => runs.push((len, attrs)),
  }
}
