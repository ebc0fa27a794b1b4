//! Caret-context watching.
//!
//! A [`TextWatcher`] answers one question, continuously: does the text
//! right before the caret satisfy a predicate? It is fed document batches
//! and selection changes by its owner and emits state *transitions*, not
//! states:
//!
//! - `Matched { via: ContentChange }` - a batch made the predicate pass (or
//!   pass again with new context; content changes always re-emit)
//! - `Matched { via: SelectionChange }` - a pure caret move made the
//!   predicate pass where it previously did not; caret moves that merely
//!   re-confirm an existing match stay silent
//! - `Unmatched` - the predicate stopped passing, or the selection grew into
//!   a range while a match was live
//!
//! The watcher is data-change-source agnostic: the transformation engine
//! builds one per rule, but any feature needing "does the text before the
//! caret look like X" (mention triggers, link autocomplete) can own one.
//!
//! # Caret context
//!
//! The context handed to the predicate is the plain-text run immediately
//! before the caret, bounded by the nearest block boundary (`\n`), inline
//! object (U+FFFC), or the document start - the minimal window a suffix
//! pattern needs. It is recomputed on demand and never stored beyond the
//! current evaluation.

use std::fmt;

use ropey::Rope;
use vellum_core::chars::char_is_block_boundary;
use vellum_model::{
  INLINE_OBJECT,
  Tendril,
  document::{
    Batch,
    Document,
  },
  transaction::Source,
};

/// What kind of event caused a match.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MatchVia {
  ContentChange,
  SelectionChange,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum WatcherEvent {
  Matched {
    /// The caret context that satisfied the predicate.
    text:  Tendril,
    /// Document span the context covers: `range.0..range.1` ends at the
    /// caret.
    range: (usize, usize),
    via:   MatchVia,
  },
  Unmatched,
}

/// Watches the text before the caret with a caller-supplied predicate.
pub struct TextWatcher {
  test:      Box<dyn Fn(&str) -> bool>,
  has_match: bool,
}

impl fmt::Debug for TextWatcher {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    f.debug_struct("TextWatcher")
      .field("has_match", &self.has_match)
      .finish()
  }
}

impl TextWatcher {
  pub fn new(test: impl Fn(&str) -> bool + 'static) -> Self {
    Self {
      test:      Box::new(test),
      has_match: false,
    }
  }

  pub fn has_match(&self) -> bool {
    self.has_match
  }

  /// Feed an applied batch. Transparent batches and non-collapsed
  /// selections are ignored entirely.
  pub fn on_batch(&mut self, doc: &Document, batch: &Batch) -> Option<WatcherEvent> {
    if batch.source() == Source::Transparent {
      return None;
    }
    if !doc.selection().is_collapsed() {
      return None;
    }

    self.evaluate(doc, MatchVia::ContentChange)
  }

  /// Feed a selection change that did not touch content.
  pub fn on_selection_change(&mut self, doc: &Document) -> Option<WatcherEvent> {
    if !doc.selection().is_collapsed() {
      return self.drop_match();
    }

    self.evaluate(doc, MatchVia::SelectionChange)
  }

  fn evaluate(&mut self, doc: &Document, via: MatchVia) -> Option<WatcherEvent> {
    let caret = doc.selection().head();
    let (start, text) = caret_context(doc.text(), caret);
    let matched = (self.test)(&text);

    tracing::trace!(?via, matched, context = %text, "text watcher evaluation");

    match (matched, self.has_match) {
      // Content changes re-emit on every match; selection moves only on the
      // transition into a match.
      (true, was_matched) => {
        self.has_match = true;
        if via == MatchVia::ContentChange || !was_matched {
          Some(WatcherEvent::Matched {
            text,
            range: (start, caret),
            via,
          })
        } else {
          None
        }
      },
      (false, true) => self.drop_match(),
      (false, false) => None,
    }
  }

  fn drop_match(&mut self) -> Option<WatcherEvent> {
    if self.has_match {
      self.has_match = false;
      Some(WatcherEvent::Unmatched)
    } else {
      None
    }
  }
}

/// Extract the plain-text run immediately before `caret`, bounded by the
/// nearest block boundary, inline object, or the document start. Returns the
/// start position of the run and its text.
pub fn caret_context(text: &Rope, caret: usize) -> (usize, Tendril) {
  let slice = text.slice(..);
  let mut start = caret;

  while start > 0 {
    let ch = slice.char(start - 1);
    if char_is_block_boundary(ch) || ch == INLINE_OBJECT {
      break;
    }
    start -= 1;
  }

  let mut context = Tendril::new();
  for chunk in slice.slice(start..caret).chunks() {
    context.push_str(chunk);
  }

  (start, context)
}
