//! Text input: keystroke classification, the insert-text command, the
//! typing buffer, and composition (IME) session state.
//!
//! # Safe keystrokes
//!
//! During an input-method composition session, and when deciding whether a
//! raw key press is about to produce text, the plugin needs to know which
//! keystrokes can never modify the document: navigation keys, function
//! keys, and accelerator chords. [`is_safe_keystroke`] answers that from a
//! statically initialized table - there is no mutable keycode registry.
//!
//! # The typing buffer
//!
//! [`ChangeBuffer`] groups consecutive typed characters into change groups
//! (what an undo system would treat as one step). It can be locked by other
//! features around edits that should not count as typing - the
//! unsafe-keystroke handler locks it while clearing a selection.
//!
//! # Composition sessions
//!
//! [`TypingSession`] tracks one composition session: while it is open,
//! keystroke-driven selection deletion is suppressed so the uncommitted
//! composed sequence is not corrupted, and a snapshot of the selection at
//! session start is buffered for the first composed insertion to replace
//! (consumed at most once, discarded when the session ends).

use vellum_model::{
  document::{
    Batch,
    Document,
    Result,
  },
  selection::Selection,
  transaction::{
    Source,
    Transaction,
  },
};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct Modifiers {
  bits: u8,
}

impl Modifiers {
  pub const ALT: u8 = 0b0000_0010;
  pub const CTRL: u8 = 0b0000_0001;
  pub const META: u8 = 0b0000_1000;
  pub const SHIFT: u8 = 0b0000_0100;

  #[must_use]
  pub const fn empty() -> Self {
    Self { bits: 0 }
  }

  #[must_use]
  pub const fn is_empty(self) -> bool {
    self.bits == 0
  }

  #[must_use]
  pub const fn ctrl(self) -> bool {
    (self.bits & Self::CTRL) != 0
  }

  #[must_use]
  pub const fn alt(self) -> bool {
    (self.bits & Self::ALT) != 0
  }

  #[must_use]
  pub const fn shift(self) -> bool {
    (self.bits & Self::SHIFT) != 0
  }

  #[must_use]
  pub const fn meta(self) -> bool {
    (self.bits & Self::META) != 0
  }

  pub fn insert(&mut self, bits: u8) {
    self.bits |= bits;
  }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Key {
  Char(char),
  Enter,
  Escape,
  Backspace,
  Tab,
  Delete,
  Insert,
  Home,
  End,
  PageUp,
  PageDown,
  Left,
  Right,
  Up,
  Down,
  F1,
  F2,
  F3,
  F4,
  F5,
  F6,
  F7,
  F8,
  F9,
  F10,
  F11,
  F12,
  Other,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct KeyEvent {
  pub key:       Key,
  pub modifiers: Modifiers,
}

impl KeyEvent {
  pub fn new(key: Key, modifiers: Modifiers) -> Self {
    Self { key, modifiers }
  }

  pub fn plain(key: Key) -> Self {
    Self::new(key, Modifiers::empty())
  }
}

/// Keys that by themselves never produce or remove text.
pub const fn is_non_typing_key(key: Key) -> bool {
  matches!(
    key,
    Key::Escape
      | Key::Insert
      | Key::Home
      | Key::End
      | Key::PageUp
      | Key::PageDown
      | Key::Left
      | Key::Right
      | Key::Up
      | Key::Down
      | Key::F1
      | Key::F2
      | Key::F3
      | Key::F4
      | Key::F5
      | Key::F6
      | Key::F7
      | Key::F8
      | Key::F9
      | Key::F10
      | Key::F11
      | Key::F12
      | Key::Other
  )
}

/// True when this keystroke cannot modify the document: a non-typing key or
/// an accelerator chord. Ctrl+Alt counts as typing (AltGr produces
/// characters on many layouts).
pub const fn is_safe_keystroke(event: &KeyEvent) -> bool {
  if (event.modifiers.ctrl() || event.modifiers.meta()) && !event.modifiers.alt() {
    return true;
  }
  is_non_typing_key(event.key)
}

/// Groups consecutive typed characters into change groups.
///
/// Locking suspends the counting entirely: changes made while locked belong
/// to whoever locked the buffer, not to typing.
#[derive(Debug)]
pub struct ChangeBuffer {
  limit:  usize,
  count:  usize,
  locked: bool,
  group:  u64,
}

impl ChangeBuffer {
  pub fn new(limit: usize) -> Self {
    Self {
      limit: limit.max(1),
      count: 0,
      locked: false,
      group: 0,
    }
  }

  pub fn is_locked(&self) -> bool {
    self.locked
  }

  pub fn lock(&mut self) {
    self.locked = true;
  }

  pub fn unlock(&mut self) {
    self.locked = false;
  }

  /// Identifier of the current change group.
  pub fn group(&self) -> u64 {
    self.group
  }

  /// Start a new change group unconditionally.
  pub fn new_group(&mut self) {
    self.count = 0;
    self.group += 1;
  }

  /// Record `n` typed characters, rolling over to a new group at the limit.
  pub fn input(&mut self, n: usize) {
    if self.locked {
      return;
    }
    self.count += n;
    if self.count >= self.limit {
      self.new_group();
    }
  }
}

/// The `insertText` command: insert typed text at the selection, replacing
/// it when it is a range.
#[derive(Debug)]
pub struct InsertTextCommand {
  enabled: bool,
  buffer:  ChangeBuffer,
}

impl InsertTextCommand {
  pub fn new(buffer_limit: usize) -> Self {
    Self {
      enabled: true,
      buffer:  ChangeBuffer::new(buffer_limit),
    }
  }

  pub fn is_enabled(&self) -> bool {
    self.enabled
  }

  pub fn set_enabled(&mut self, enabled: bool) {
    self.enabled = enabled;
  }

  pub fn buffer(&self) -> &ChangeBuffer {
    &self.buffer
  }

  pub fn buffer_mut(&mut self) -> &mut ChangeBuffer {
    &mut self.buffer
  }

  /// Insert `text` over `selection` (default: the document selection).
  /// The inserted text inherits the inline attributes of the character
  /// before the insertion point. Returns `None` when the command is
  /// disabled.
  pub fn execute(
    &mut self,
    doc: &mut Document,
    text: &str,
    selection: Option<Selection>,
  ) -> Result<Option<Batch>> {
    if !self.enabled {
      return Ok(None);
    }

    let target = selection.unwrap_or_else(|| doc.selection().clone());
    let (from, to) = (target.from(), target.to());
    if text.is_empty() && from == to {
      return Ok(None);
    }

    let attrs = doc.attrs_before(from);
    let inserted = text.chars().count();

    let mut transaction = Transaction::change(
      doc.text(),
      std::iter::once((from, to, (!text.is_empty()).then(|| text.into()))),
    )?
    .with_selection(Selection::point(from + inserted))
    .with_source(Source::UserInput);
    if inserted > 0 {
      transaction = transaction.with_attributes(from, from + inserted, attrs);
    }

    let batch = doc.apply(&transaction)?;
    self.buffer.input(inserted.max(1));

    Ok(Some(batch))
  }
}

/// Composition (IME) session state.
#[derive(Debug, Default)]
pub struct TypingSession {
  composing:          bool,
  buffered_selection: Option<Selection>,
}

impl TypingSession {
  pub fn new() -> Self {
    Self::default()
  }

  pub fn is_composing(&self) -> bool {
    self.composing
  }

  /// Open a composition session, snapshotting a non-collapsed selection for
  /// the first composed insertion to replace.
  pub fn composition_start(&mut self, doc: &Document) {
    self.composing = true;
    self.buffered_selection = if doc.selection().is_collapsed() {
      None
    } else {
      Some(doc.selection().clone())
    };
  }

  /// Close the session, discarding any unconsumed snapshot.
  pub fn composition_end(&mut self) {
    self.composing = false;
    self.buffered_selection = None;
  }

  /// The selection buffered at session start; consumed at most once.
  pub fn take_buffered_selection(&mut self) -> Option<Selection> {
    self.buffered_selection.take()
  }
}
