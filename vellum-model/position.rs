//! View coordinates and their mapping to model positions.
//!
//! The view layer reports ranges as `(row, column)` pairs with columns
//! counted in grapheme clusters. Model code works in char indices, so view
//! coordinates are mapped on the way in. The mapping is fallible by design:
//! a view range captured one frame ago may describe content that no longer
//! exists, and the caller decides what to fall back to.

use ropey::RopeSlice;
use vellum_core::grapheme::next_grapheme_boundary;

/// A single point in a document buffer, in view terms.
/// 0-indexed as all things should be.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub struct Position {
  pub row: usize,
  pub col: usize,
}

impl Position {
  pub fn new(row: usize, col: usize) -> Self {
    Self { row, col }
  }

  pub const fn zero() -> Self {
    Self { row: 0, col: 0 }
  }
}

impl From<(usize, usize)> for Position {
  fn from(value: (usize, usize)) -> Self {
    Position::new(value.0, value.1)
  }
}

/// Converts a char index into a `Position` with the column in grapheme
/// clusters.
pub fn coords_at_pos(text: RopeSlice, pos: usize) -> Position {
  let pos = pos.min(text.len_chars());
  let row = text.char_to_line(pos);
  let line_start = text.line_to_char(row);

  let mut col = 0;
  let mut idx = line_start;
  while idx < pos {
    idx = next_grapheme_boundary(text, idx);
    col += 1;
  }

  Position::new(row, col)
}

/// Converts a `(row, column)` pair (grapheme counts) to a char index.
///
/// Returns `None` when the coordinates do not name real content: the row
/// does not exist, or the column walks past the end of the line. Stale view
/// ranges fail here instead of silently landing somewhere else.
pub fn char_idx_at_coords(text: RopeSlice, coords: Position) -> Option<usize> {
  if coords.row >= text.len_lines() {
    return None;
  }

  let line_start = text.line_to_char(coords.row);
  let line_end = if coords.row + 1 < text.len_lines() {
    // Exclude the newline; a column can point past the last character but
    // never onto the line break itself.
    text.line_to_char(coords.row + 1) - 1
  } else {
    text.len_chars()
  };

  let mut idx = line_start;
  for _ in 0..coords.col {
    if idx >= line_end {
      return None;
    }
    idx = next_grapheme_boundary(text, idx);
  }

  Some(idx)
}

#[cfg(test)]
mod test {
  use ropey::Rope;

  use super::*;

  #[test]
  fn coords_roundtrip() {
    let doc = Rope::from("foo\nbar baz\n");
    let slice = doc.slice(..);

    assert_eq!(coords_at_pos(slice, 0), Position::new(0, 0));
    assert_eq!(coords_at_pos(slice, 3), Position::new(0, 3));
    assert_eq!(coords_at_pos(slice, 4), Position::new(1, 0));
    assert_eq!(coords_at_pos(slice, 7), Position::new(1, 3));

    assert_eq!(char_idx_at_coords(slice, Position::new(0, 0)), Some(0));
    assert_eq!(char_idx_at_coords(slice, Position::new(0, 3)), Some(3));
    assert_eq!(char_idx_at_coords(slice, Position::new(1, 3)), Some(7));
  }

  #[test]
  fn grapheme_columns() {
    // "e" + combining accent is one column.
    let doc = Rope::from("e\u{0301}x");
    let slice = doc.slice(..);

    assert_eq!(coords_at_pos(slice, 2), Position::new(0, 1));
    assert_eq!(char_idx_at_coords(slice, Position::new(0, 1)), Some(2));
    assert_eq!(char_idx_at_coords(slice, Position::new(0, 2)), Some(3));
  }

  #[test]
  fn stale_coordinates_fail_to_map() {
    let doc = Rope::from("ab\ncd");
    let slice = doc.slice(..);

    // Row past the end.
    assert_eq!(char_idx_at_coords(slice, Position::new(5, 0)), None);
    // Column past the end of the line.
    assert_eq!(char_idx_at_coords(slice, Position::new(0, 3)), None);
    // Column exactly at the end of the line is a valid caret position.
    assert_eq!(char_idx_at_coords(slice, Position::new(0, 2)), Some(2));
    assert_eq!(char_idx_at_coords(slice, Position::new(1, 2)), Some(5));
  }
}
