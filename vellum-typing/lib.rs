//! The typing feature set of the vellum editing engine.
//!
//! This crate packages everything that happens between a keystroke and the
//! document: the caret-context [`watcher`], the text [`transform`] engine,
//! the rule-set [`config`] algebra, forward/backward [`delete`], and the
//! [`input`] layer (insert-text command, typing buffer, keystroke safety,
//! composition sessions).
//!
//! [`Typing`] wires it together the way a host embeds it:
//!
//! ```ignore
//! use vellum_model::document::Document;
//! use vellum_typing::{Typing, config::TypingConfig};
//!
//! let mut doc = Document::new("A foo");
//! let mut typing = Typing::new(&TypingConfig::default())?;
//!
//! // The host forwards typed text and drives the notification cycle.
//! typing.type_text(&mut doc, "(c)")?;
//! assert_eq!(doc.text().to_string(), "A foo©");
//! ```
//!
//! The host is responsible for three notification streams, all synchronous:
//! applied batches go to [`Typing::handle_batch`], pure selection moves go
//! to [`Typing::handle_selection_change`], and raw key presses go to
//! [`Typing::key_down`]. Commands are addressable by the names the host
//! exposes them under: `delete`, `forwardDelete`, `insertText`.

pub mod config;
pub mod delete;
pub mod input;
pub mod transform;
pub mod watcher;

use vellum_dispatch::{
  DispatchOutcome,
  Listeners,
  Priority,
};
use vellum_model::document::{
  Batch,
  Document,
  Result as DocumentResult,
};

use crate::{
  config::{
    TypingConfig,
    resolve,
  },
  delete::{
    DeleteCommand,
    DeleteParams,
  },
  input::{
    InsertTextCommand,
    KeyEvent,
    TypingSession,
    is_safe_keystroke,
  },
  transform::TransformationEngine,
};

/// Decision surface a key-down event accumulates while it propagates
/// through the listener list.
#[derive(Debug, Default)]
pub struct KeyDecision {
  /// The keystroke is about to type over the document and any non-collapsed
  /// selection should be cleared first. Set by the lowest-priority
  /// unsafe-keystroke handler; a feature that claims the key beforehand
  /// prevents it.
  pub clear_selection: bool,
}

/// The typing plugin: resolved rules, commands, session state, and the
/// key-down listener list.
pub struct Typing {
  engine:          TransformationEngine,
  delete_backward: DeleteCommand,
  delete_forward:  DeleteCommand,
  input:           InsertTextCommand,
  session:         TypingSession,
  key_listeners:   Listeners<KeyDecision, KeyEvent>,
}

impl std::fmt::Debug for Typing {
  fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
    f.debug_struct("Typing")
      .field("engine", &self.engine)
      .field("composing", &self.session.is_composing())
      .finish()
  }
}

impl Typing {
  pub fn new(config: &TypingConfig) -> transform::Result<Self> {
    let rules = resolve(&config.transformations)?;
    tracing::debug!(rules = rules.len(), "resolved transformation rule set");
    let engine = TransformationEngine::new(rules.into_values());

    let mut key_listeners: Listeners<KeyDecision, KeyEvent> = Listeners::new();
    // Runs after every feature handler has had the chance to claim the key:
    // whatever is left and unsafe is about to type over the selection.
    key_listeners.add(Priority::Lowest, |decision: &mut KeyDecision, _info, event| {
      if !is_safe_keystroke(event) {
        decision.clear_selection = true;
      }
    });

    Ok(Self {
      engine,
      delete_backward: DeleteCommand::backward(),
      delete_forward: DeleteCommand::forward(),
      input: InsertTextCommand::new(config.buffer_limit),
      session: TypingSession::new(),
      key_listeners,
    })
  }

  /// Enabled state of a command, by its host-facing name.
  pub fn is_command_enabled(&self, name: &str) -> bool {
    match name {
      "insertText" => self.input.is_enabled(),
      "delete" | "forwardDelete" => true,
      _ => false,
    }
  }

  pub fn insert_text_command(&self) -> &InsertTextCommand {
    &self.input
  }

  pub fn insert_text_command_mut(&mut self) -> &mut InsertTextCommand {
    &mut self.input
  }

  pub fn session(&self) -> &TypingSession {
    &self.session
  }

  /// The key-down listener list. Host features register here; anything they
  /// claim (via `EventInfo::stop`) never reaches the built-in handling.
  pub fn key_listeners_mut(&mut self) -> &mut Listeners<KeyDecision, KeyEvent> {
    &mut self.key_listeners
  }

  // Notification entry points, driven by the host.
  //

  /// An applied batch: feed the transformation engine. Returns the batch of
  /// a transformation this cycle applied, if any.
  ///
  /// Transformations ride on the `insertText` command: while it is
  /// disabled, the engine only observes.
  pub fn handle_batch(&mut self, doc: &mut Document, batch: &Batch) -> DocumentResult<Option<Batch>> {
    if !self.input.is_enabled() {
      self.engine.observe_batch(doc, batch);
      return Ok(None);
    }
    self.engine.on_batch(doc, batch)
  }

  /// A pure selection move, no content change.
  pub fn handle_selection_change(&mut self, doc: &Document) {
    self.engine.on_selection_change(doc);
  }

  /// A raw key press from the view layer.
  ///
  /// Dispatches through the listener list; if nothing claims the key and
  /// the lowest-priority handler marked it unsafe, a non-collapsed
  /// selection is cleared (with the typing buffer locked) so the keystroke
  /// types over clean ground. Suppressed during composition.
  pub fn key_down(&mut self, doc: &mut Document, event: KeyEvent) -> DocumentResult<Option<Batch>> {
    let mut decision = KeyDecision::default();
    let mut event = event;
    if self.key_listeners.emit(&mut decision, &mut event) == DispatchOutcome::Handled {
      return Ok(None);
    }

    if decision.clear_selection && !self.session.is_composing() && !doc.selection().is_collapsed()
    {
      tracing::trace!(?event, "unsafe keystroke clears the selection");
      self.input.buffer_mut().lock();
      let result = self.input.execute(doc, "", None);
      self.input.buffer_mut().unlock();
      return result;
    }

    Ok(None)
  }

  /// Text produced by the keystroke or composition commit. During a
  /// composition session the first insertion replaces the selection
  /// buffered at session start.
  pub fn insert_text(&mut self, doc: &mut Document, text: &str) -> DocumentResult<Option<Batch>> {
    let target = if self.session.is_composing() {
      self.session.take_buffered_selection()
    } else {
      None
    };
    self.input.execute(doc, text, target)
  }

  /// The `delete` command (backward).
  pub fn delete(&mut self, doc: &mut Document, params: DeleteParams) -> DocumentResult<Option<Batch>> {
    self
      .delete_backward
      .execute(doc, self.input.buffer_mut(), params)
  }

  /// The `forwardDelete` command.
  pub fn forward_delete(
    &mut self,
    doc: &mut Document,
    params: DeleteParams,
  ) -> DocumentResult<Option<Batch>> {
    self
      .delete_forward
      .execute(doc, self.input.buffer_mut(), params)
  }

  pub fn composition_start(&mut self, doc: &Document) {
    self.session.composition_start(doc);
  }

  pub fn composition_end(&mut self) {
    self.session.composition_end();
  }

  /// Convenience for hosts and tests: type `text` one keystroke at a time,
  /// running the full batch-notification cycle after each character.
  pub fn type_text(&mut self, doc: &mut Document, text: &str) -> DocumentResult<()> {
    let mut scratch = [0u8; 4];
    for ch in text.chars() {
      if let Some(batch) = self.insert_text(doc, ch.encode_utf8(&mut scratch))? {
        self.handle_batch(doc, &batch)?;
      }
    }
    Ok(())
  }
}
