//! Forward and backward deletion.
//!
//! A [`DeleteCommand`] models one deletion direction as a stateless
//! operation over the current selection (or an explicitly supplied view
//! range): pick the span for the requested unit, delete it inside a single
//! transaction, and leave the caret at the start of the removed span. The
//! document always ends with a valid selection.
//!
//! Units:
//!
//! - **Character** - one grapheme cluster; a combining sequence or an emoji
//!   flag is never split
//! - **Word** - the run of whitespace before the caret plus one word or
//!   punctuation run, never crossing a block boundary or inline object
//! - **Selection** - exactly the selected span
//!
//! An explicit view range (from the host view layer, in `(row, col)`
//! coordinates) is mapped to model positions first. When the mapping fails
//! - the range describes content that no longer exists - the command falls
//! back to the current model selection and logs a warning rather than
//! no-opping; a delete key press should not feel dead because a stale frame
//! arrived late.
//!
//! Consecutive invocations carrying the same `sequence` number coalesce
//! into the typing buffer's current change group; a new sequence starts a
//! new group.

use ropey::RopeSlice;
use vellum_core::{
  chars::{
    CharCategory,
    categorize_char,
    char_is_block_boundary,
    char_is_whitespace,
  },
  grapheme::{
    next_grapheme_boundary,
    prev_grapheme_boundary,
  },
};
use vellum_model::{
  INLINE_OBJECT,
  document::{
    Batch,
    Document,
    Result,
  },
  position::{
    Position,
    char_idx_at_coords,
  },
  selection::{
    Direction,
    Range,
    Selection,
  },
  transaction::{
    Source,
    Transaction,
  },
};

use crate::input::ChangeBuffer;

/// What one delete key press removes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum DeleteUnit {
  #[default]
  Character,
  Word,
  Selection,
}

#[derive(Debug, Clone, Copy, Default)]
pub struct DeleteParams {
  pub unit:       DeleteUnit,
  /// Coalescing key: consecutive deletes with the same sequence join one
  /// change group.
  pub sequence:   u32,
  /// Explicit span to remove, in view coordinates. Mapped to model
  /// positions; falls back to the model selection when stale.
  pub view_range: Option<(Position, Position)>,
}

#[derive(Debug)]
pub struct DeleteCommand {
  direction:     Direction,
  last_sequence: Option<u32>,
}

impl DeleteCommand {
  pub fn new(direction: Direction) -> Self {
    Self {
      direction,
      last_sequence: None,
    }
  }

  /// The `delete` command: remove content before the caret.
  pub fn backward() -> Self {
    Self::new(Direction::Backward)
  }

  /// The `forwardDelete` command: remove content after the caret.
  pub fn forward() -> Self {
    Self::new(Direction::Forward)
  }

  pub fn direction(&self) -> Direction {
    self.direction
  }

  /// Perform one deletion. Returns `None` when there is nothing to delete
  /// (the caret sits at the relevant document edge).
  pub fn execute(
    &mut self,
    doc: &mut Document,
    buffer: &mut ChangeBuffer,
    params: DeleteParams,
  ) -> Result<Option<Batch>> {
    if self.last_sequence != Some(params.sequence) {
      buffer.new_group();
      self.last_sequence = Some(params.sequence);
    }

    let target = match params.view_range {
      Some((from, to)) => {
        match map_view_range(doc, from, to) {
          Some(range) => range,
          None => {
            tracing::warn!(
              ?from,
              ?to,
              "stale view range in delete request; falling back to the model selection"
            );
            doc.selection().range()
          },
        }
      },
      None => doc.selection().range(),
    };

    let slice = doc.text().slice(..);
    let (from, to) = if !target.is_empty() || params.unit == DeleteUnit::Selection {
      (target.from(), target.to())
    } else {
      let caret = target.head;
      match (params.unit, self.direction) {
        (DeleteUnit::Character, Direction::Backward) => (prev_grapheme_boundary(slice, caret), caret),
        (DeleteUnit::Character, Direction::Forward) => (caret, next_grapheme_boundary(slice, caret)),
        (DeleteUnit::Word, Direction::Backward) => (word_boundary_backward(slice, caret), caret),
        (DeleteUnit::Word, Direction::Forward) => (caret, word_boundary_forward(slice, caret)),
        (DeleteUnit::Selection, _) => (caret, caret),
      }
    };

    if from == to {
      return Ok(None);
    }

    let transaction = Transaction::delete(doc.text(), std::iter::once((from, to)))?
      .with_selection(Selection::point(from))
      .with_source(Source::UserInput);
    let batch = doc.apply(&transaction)?;
    buffer.input(1);

    tracing::trace!(from, to, direction = ?self.direction, "deleted span");
    Ok(Some(batch))
  }
}

fn map_view_range(doc: &Document, from: Position, to: Position) -> Option<Range> {
  let slice = doc.text().slice(..);
  let from = char_idx_at_coords(slice, from)?;
  let to = char_idx_at_coords(slice, to)?;
  Some(Range::new(from, to))
}

/// Start of the span a backward word deletion removes: trailing whitespace
/// plus one word or punctuation run. A block boundary or inline object
/// directly before the caret is deleted alone (that is the paragraph-merge
/// backspace).
fn word_boundary_backward(slice: RopeSlice, caret: usize) -> usize {
  if caret == 0 {
    return 0;
  }

  let first = slice.char(caret - 1);
  if char_is_block_boundary(first) || first == INLINE_OBJECT {
    return caret - 1;
  }

  let mut pos = caret;
  while pos > 0 && char_is_whitespace(slice.char(pos - 1)) {
    pos -= 1;
  }

  if pos > 0 {
    if let Some(run) = run_category(slice.char(pos - 1)) {
      while pos > 0 && run_category(slice.char(pos - 1)) == Some(run) {
        pos -= 1;
      }
    }
  }

  pos
}

/// End of the span a forward word deletion removes; mirror of
/// [`word_boundary_backward`].
fn word_boundary_forward(slice: RopeSlice, caret: usize) -> usize {
  let len = slice.len_chars();
  if caret >= len {
    return len;
  }

  let first = slice.char(caret);
  if char_is_block_boundary(first) || first == INLINE_OBJECT {
    return caret + 1;
  }

  let mut pos = caret;
  while pos < len && char_is_whitespace(slice.char(pos)) {
    pos += 1;
  }

  if pos < len {
    if let Some(run) = run_category(slice.char(pos)) {
      while pos < len && run_category(slice.char(pos)) == Some(run) {
        pos += 1;
      }
    }
  }

  pos
}

/// Word and punctuation runs are deletable as a unit; whitespace, block
/// boundaries and inline objects terminate the walk.
fn run_category(ch: char) -> Option<CharCategory> {
  if ch == INLINE_OBJECT {
    return None;
  }
  match categorize_char(ch) {
    CharCategory::Word => Some(CharCategory::Word),
    CharCategory::Punctuation | CharCategory::Unknown => Some(CharCategory::Punctuation),
    CharCategory::Whitespace | CharCategory::BlockBoundary => None,
  }
}

#[cfg(test)]
mod test {
  use super::*;

  fn doc_with_caret(text: &str, caret: usize) -> Document {
    let mut doc = Document::new(text);
    doc.set_selection(Selection::point(caret)).unwrap();
    doc
  }

  #[test]
  fn backward_character_deletes_one_grapheme() {
    let mut doc = doc_with_caret("ae\u{0301}b", 3);
    let mut buffer = ChangeBuffer::new(20);
    let mut delete = DeleteCommand::backward();

    delete
      .execute(&mut doc, &mut buffer, DeleteParams::default())
      .unwrap()
      .unwrap();

    // The combining sequence goes as one unit.
    assert_eq!(doc.text().to_string(), "ab");
    assert_eq!(doc.selection(), &Selection::point(1));
  }

  #[test]
  fn forward_character_deletes_one_grapheme() {
    let mut doc = doc_with_caret("ae\u{0301}b", 1);
    let mut buffer = ChangeBuffer::new(20);
    let mut delete = DeleteCommand::forward();

    delete
      .execute(&mut doc, &mut buffer, DeleteParams::default())
      .unwrap()
      .unwrap();

    assert_eq!(doc.text().to_string(), "ab");
    assert_eq!(doc.selection(), &Selection::point(1));
  }

  #[test]
  fn delete_at_document_edge_is_a_noop() {
    let mut doc = doc_with_caret("ab", 0);
    let mut buffer = ChangeBuffer::new(20);

    assert!(
      DeleteCommand::backward()
        .execute(&mut doc, &mut buffer, DeleteParams::default())
        .unwrap()
        .is_none()
    );

    doc.set_selection(Selection::point(2)).unwrap();
    assert!(
      DeleteCommand::forward()
        .execute(&mut doc, &mut buffer, DeleteParams::default())
        .unwrap()
        .is_none()
    );
    assert_eq!(doc.text().to_string(), "ab");
  }

  #[test]
  fn backward_word_takes_whitespace_and_one_run() {
    let mut doc = doc_with_caret("foo bar  ", 9);
    let mut buffer = ChangeBuffer::new(20);
    let mut delete = DeleteCommand::backward();

    let params = DeleteParams {
      unit: DeleteUnit::Word,
      ..Default::default()
    };
    delete.execute(&mut doc, &mut buffer, params).unwrap();
    assert_eq!(doc.text().to_string(), "foo ");

    delete.execute(&mut doc, &mut buffer, params).unwrap();
    assert_eq!(doc.text().to_string(), "");
  }

  #[test]
  fn forward_word_mirrors_backward() {
    let mut doc = doc_with_caret("foo  bar baz", 3);
    let mut buffer = ChangeBuffer::new(20);
    let mut delete = DeleteCommand::forward();

    let params = DeleteParams {
      unit: DeleteUnit::Word,
      ..Default::default()
    };
    delete.execute(&mut doc, &mut buffer, params).unwrap();

    assert_eq!(doc.text().to_string(), "foo baz");
  }

  #[test]
  fn word_delete_stops_at_punctuation_runs() {
    let mut doc = doc_with_caret("foo bar!!", 9);
    let mut buffer = ChangeBuffer::new(20);
    let mut delete = DeleteCommand::backward();

    let params = DeleteParams {
      unit: DeleteUnit::Word,
      ..Default::default()
    };
    delete.execute(&mut doc, &mut buffer, params).unwrap();
    assert_eq!(doc.text().to_string(), "foo bar");

    delete.execute(&mut doc, &mut buffer, params).unwrap();
    assert_eq!(doc.text().to_string(), "foo ");
  }

  #[test]
  fn word_delete_does_not_cross_a_block_boundary() {
    let mut doc = doc_with_caret("one\ntwo", 4);
    let mut buffer = ChangeBuffer::new(20);
    let mut delete = DeleteCommand::backward();

    let params = DeleteParams {
      unit: DeleteUnit::Word,
      ..Default::default()
    };
    delete.execute(&mut doc, &mut buffer, params).unwrap();

    // Only the paragraph break goes: this is the merge backspace.
    assert_eq!(doc.text().to_string(), "onetwo");
  }

  #[test]
  fn non_collapsed_selection_deletes_the_range() {
    let mut doc = Document::new("hello world");
    doc
      .set_selection(Selection::new(Range::new(5, 11)))
      .unwrap();
    let mut buffer = ChangeBuffer::new(20);
    let mut delete = DeleteCommand::backward();

    delete
      .execute(&mut doc, &mut buffer, DeleteParams::default())
      .unwrap()
      .unwrap();

    assert_eq!(doc.text().to_string(), "hello");
    assert_eq!(doc.selection(), &Selection::point(5));
  }

  #[test]
  fn view_range_maps_to_model_positions() {
    let mut doc = doc_with_caret("foo\nbar baz", 0);
    let mut buffer = ChangeBuffer::new(20);
    let mut delete = DeleteCommand::backward();

    let params = DeleteParams {
      unit:       DeleteUnit::Selection,
      view_range: Some((Position::new(1, 4), Position::new(1, 7))),
      ..Default::default()
    };
    delete.execute(&mut doc, &mut buffer, params).unwrap();

    assert_eq!(doc.text().to_string(), "foo\nbar ");
  }

  #[test]
  fn stale_view_range_falls_back_to_the_selection() {
    let mut doc = Document::new("hello world");
    doc
      .set_selection(Selection::new(Range::new(0, 5)))
      .unwrap();
    let mut buffer = ChangeBuffer::new(20);
    let mut delete = DeleteCommand::backward();

    // Row 7 no longer exists; the command must fall back, not no-op.
    let params = DeleteParams {
      unit:       DeleteUnit::Selection,
      view_range: Some((Position::new(7, 0), Position::new(7, 3))),
      ..Default::default()
    };
    delete.execute(&mut doc, &mut buffer, params).unwrap();

    assert_eq!(doc.text().to_string(), " world");
  }

  #[test]
  fn same_sequence_coalesces_into_one_group() {
    let mut doc = doc_with_caret("abcdef", 6);
    let mut buffer = ChangeBuffer::new(20);
    let mut delete = DeleteCommand::backward();

    let group_before = buffer.group();
    for _ in 0..3 {
      let params = DeleteParams {
        sequence: 1,
        ..Default::default()
      };
      delete.execute(&mut doc, &mut buffer, params).unwrap();
    }
    // One new group for the sequence, shared by all three presses.
    assert_eq!(buffer.group(), group_before + 1);

    let params = DeleteParams {
      sequence: 2,
      ..Default::default()
    };
    delete.execute(&mut doc, &mut buffer, params).unwrap();
    assert_eq!(buffer.group(), group_before + 2);
  }

  #[test]
  fn deleting_an_inline_object_takes_one_position() {
    let text = format!("ab{INLINE_OBJECT}cd");
    let mut doc = doc_with_caret(&text, 3);
    let mut buffer = ChangeBuffer::new(20);
    let mut delete = DeleteCommand::backward();

    let params = DeleteParams {
      unit: DeleteUnit::Word,
      ..Default::default()
    };
    delete.execute(&mut doc, &mut buffer, params).unwrap();

    assert_eq!(doc.text().to_string(), "abcd");
  }

  #[test]
  fn word_delete_stops_at_an_inline_object() {
    let text = format!("ab{INLINE_OBJECT}cd");
    let mut doc = doc_with_caret(&text, 5);
    let mut buffer = ChangeBuffer::new(20);
    let mut delete = DeleteCommand::backward();

    let params = DeleteParams {
      unit: DeleteUnit::Word,
      ..Default::default()
    };
    delete.execute(&mut doc, &mut buffer, params).unwrap();

    assert_eq!(doc.text().to_string(), format!("ab{INLINE_OBJECT}"));
  }
}
