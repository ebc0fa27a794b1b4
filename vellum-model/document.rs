//! Document core state and the atomic apply path.
//!
//! [`Document`] owns the text rope, the inline attribute runs, and the
//! current selection. Every mutation goes through [`Document::apply`],
//! which validates the whole transaction against a scratch copy before
//! committing anything: on error the document is untouched, so listeners
//! only ever observe the fully-applied or the not-yet-applied state.
//!
//! A successful apply produces a [`Batch`] - the notification payload the
//! typing features consume. The batch carries the transaction's [`Source`]
//! and the coalesced change list, and answers the one structural question
//! the transformation engine cares about: was this genuine forward text
//! input ([`Batch::is_typing_shaped`])?

use ropey::Rope;
use thiserror::Error;
use vellum_core::chars::char_is_block_boundary;

use crate::{
  INLINE_OBJECT,
  attributes::{
    AttrRuns,
    Attributes,
  },
  selection::Selection,
  transaction::{
    Change,
    Source,
    Transaction,
    TransactionError,
  },
};

pub type Result<T> = std::result::Result<T, DocumentError>;

#[derive(Debug, Error, PartialEq, Eq)]
#[non_exhaustive]
pub enum DocumentError {
  #[error("selection {from}..{to} is out of bounds for document length {len}")]
  SelectionOutOfBounds {
    from: usize,
    to:   usize,
    len:  usize,
  },
  #[error(transparent)]
  Transaction(#[from] TransactionError),
}

/// Notification payload for one applied transaction.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Batch {
  source:  Source,
  changes: Vec<Change>,
}

impl Batch {
  pub fn source(&self) -> Source {
    self.source
  }

  pub fn changes(&self) -> &[Change] {
    &self.changes
  }

  /// True when this batch looks like organic forward text input: exactly one
  /// pure insertion of non-empty text that carries no block boundary and no
  /// inline object.
  ///
  /// Deletions, replacements, paragraph merges and multi-span edits all fail
  /// this test, which is what keeps them from ever triggering a text
  /// transformation.
  pub fn is_typing_shaped(&self) -> bool {
    match self.changes.as_slice() {
      [(from, to, Some(text))] => {
        from == to
          && !text.is_empty()
          && !text
            .chars()
            .any(|ch| char_is_block_boundary(ch) || ch == INLINE_OBJECT)
      },
      _ => false,
    }
  }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Document {
  text:      Rope,
  attrs:     AttrRuns,
  selection: Selection,
  version:   u64,
}

impl Document {
  pub fn new(text: impl Into<Rope>) -> Self {
    let text = text.into();
    let attrs = AttrRuns::new(text.len_chars());
    Self {
      text,
      attrs,
      selection: Selection::point(0),
      version: 0,
    }
  }

  pub fn text(&self) -> &Rope {
    &self.text
  }

  pub fn attrs(&self) -> &AttrRuns {
    &self.attrs
  }

  /// Attributes of the character at `pos` (empty past the end).
  pub fn attrs_at(&self, pos: usize) -> Attributes {
    self.attrs.attrs_at(pos)
  }

  /// Attributes of the character before `pos` - what freshly typed text at
  /// `pos` inherits.
  pub fn attrs_before(&self, pos: usize) -> Attributes {
    if pos == 0 {
      Attributes::empty()
    } else {
      self.attrs.attrs_at(pos - 1)
    }
  }

  pub fn selection(&self) -> &Selection {
    &self.selection
  }

  pub fn version(&self) -> u64 {
    self.version
  }

  pub fn is_inline_object(&self, pos: usize) -> bool {
    self.text.get_char(pos) == Some(INLINE_OBJECT)
  }

  /// Move the selection without touching content. Returns whether the
  /// selection actually changed, so the host knows to fire
  /// selection-changed notifications.
  pub fn set_selection(&mut self, selection: Selection) -> Result<bool> {
    let len = self.text.len_chars();
    if selection.to() > len {
      return Err(DocumentError::SelectionOutOfBounds {
        from: selection.from(),
        to:   selection.to(),
        len,
      });
    }

    if self.selection == selection {
      return Ok(false);
    }
    self.selection = selection;
    Ok(true)
  }

  /// Apply a transaction atomically.
  ///
  /// Everything is computed against the incoming state first - new text,
  /// remapped attribute runs, attribute assignments, the resulting
  /// selection. Only when all of it validates does the document commit, so
  /// a failing transaction rolls back by construction.
  pub fn apply(&mut self, transaction: &Transaction) -> Result<Batch> {
    let new_text = transaction.apply_to(&self.text)?;
    let new_len = new_text.len_chars();

    let mut new_attrs = self.attrs.map_through(transaction.changes());
    for &(from, to, attrs) in transaction.attr_assigns() {
      if from > to || to > new_len {
        return Err(
          TransactionError::AttrRangeOutOfBounds {
            from,
            to,
            len: new_len,
          }
          .into(),
        );
      }
      new_attrs.set(from, to, attrs);
    }

    let new_selection = match transaction.selection() {
      Some(selection) => {
        if selection.to() > new_len {
          return Err(DocumentError::SelectionOutOfBounds {
            from: selection.from(),
            to:   selection.to(),
            len:  new_len,
          });
        }
        selection.clone()
      },
      None => self.selection.clone().map(transaction.changes())?,
    };

    let changes: Vec<Change> = transaction.changes_iter().collect();

    self.text = new_text;
    self.attrs = new_attrs;
    self.selection = new_selection;
    if !transaction.changes().is_empty() {
      self.version = self.version.saturating_add(1);
    }

    tracing::trace!(
      version = self.version,
      source = ?transaction.source(),
      changes = changes.len(),
      "applied transaction"
    );

    Ok(Batch {
      source: transaction.source(),
      changes,
    })
  }
}

#[cfg(test)]
mod test {
  use super::*;
  use crate::{
    Tendril,
    selection::Range,
    transaction::Transaction,
  };

  #[test]
  fn apply_moves_text_attrs_and_selection() {
    let mut doc = Document::new("hello");
    doc.set_selection(Selection::point(5)).unwrap();

    let tx = Transaction::insert(doc.text(), 5, " world".into())
      .unwrap()
      .with_attributes(5, 11, Attributes::BOLD);
    let batch = doc.apply(&tx).unwrap();

    assert_eq!(doc.text().to_string(), "hello world");
    assert_eq!(doc.attrs_at(7), Attributes::BOLD);
    assert_eq!(doc.attrs_at(2), Attributes::empty());
    // The caret rides after the inserted text.
    assert_eq!(doc.selection(), &Selection::point(11));
    assert_eq!(doc.version(), 1);
    assert_eq!(batch.changes().len(), 1);
  }

  #[test]
  fn explicit_selection_overrides_mapping() {
    let mut doc = Document::new("abc");
    doc.set_selection(Selection::point(1)).unwrap();

    let tx = Transaction::insert(doc.text(), 2, "x".into())
      .unwrap()
      .with_selection(Selection::point(0));
    doc.apply(&tx).unwrap();

    assert_eq!(doc.selection(), &Selection::point(0));
  }

  #[test]
  fn failed_apply_leaves_the_document_untouched() {
    let mut doc = Document::new("abc");
    doc.set_selection(Selection::point(3)).unwrap();
    let before = doc.clone();

    // Attribute assignment past the post-change end.
    let tx = Transaction::insert(doc.text(), 3, "d".into())
      .unwrap()
      .with_attributes(3, 99, Attributes::BOLD);
    assert!(doc.apply(&tx).is_err());
    assert_eq!(doc, before);

    // Out-of-bounds explicit selection.
    let tx = Transaction::insert(doc.text(), 3, "d".into())
      .unwrap()
      .with_selection(Selection::point(42));
    assert!(doc.apply(&tx).is_err());
    assert_eq!(doc, before);
  }

  #[test]
  fn set_selection_reports_changes_and_validates() {
    let mut doc = Document::new("abcd");

    assert!(doc.set_selection(Selection::point(2)).unwrap());
    assert!(!doc.set_selection(Selection::point(2)).unwrap());
    assert!(
      doc
        .set_selection(Selection::new(Range::new(1, 3)))
        .unwrap()
    );

    let err = doc.set_selection(Selection::point(9)).unwrap_err();
    assert!(matches!(err, DocumentError::SelectionOutOfBounds {
      len: 4,
      ..
    }));
  }

  #[test]
  fn typing_shaped_batches() {
    let mut doc = Document::new("ab");
    doc.set_selection(Selection::point(2)).unwrap();

    // A single-character insertion is typing-shaped.
    let tx = Transaction::insert(doc.text(), 2, "c".into())
      .unwrap()
      .with_source(Source::UserInput);
    assert!(doc.apply(&tx).unwrap().is_typing_shaped());

    // A deletion is not.
    let tx = Transaction::delete(doc.text(), vec![(2, 3)]).unwrap();
    assert!(!doc.apply(&tx).unwrap().is_typing_shaped());

    // A replacement is not.
    let tx = Transaction::change(doc.text(), vec![(0, 2, Some("xy".into()))]).unwrap();
    assert!(!doc.apply(&tx).unwrap().is_typing_shaped());

    // A paragraph break is not.
    let tx = Transaction::insert(doc.text(), 2, "\n".into()).unwrap();
    assert!(!doc.apply(&tx).unwrap().is_typing_shaped());

    // An inline object insertion is not.
    let text: Tendril = INLINE_OBJECT.to_string().into();
    let tx = Transaction::insert(doc.text(), 2, text).unwrap();
    assert!(!doc.apply(&tx).unwrap().is_typing_shaped());
  }
}
