//! # vellum-dispatch
//!
//! Priority-tiered listener lists for single-threaded, event-driven feature
//! code.
//!
//! There is no global dispatcher: each component owns a [`Listeners`] value
//! per notification kind and drives it synchronously. Handlers run in
//! priority order ([`Priority::High`] first, [`Priority::Lowest`] last) and,
//! within one tier, in registration order. A handler can stop propagation
//! through [`EventInfo::stop`], which also reports the event as handled to
//! the emitter.
//!
//! The `Lowest` tier exists for "everyone else had their chance" logic:
//! safety nets that must only act when no feature-specific handler claimed
//! the event.
//!
//! ## Basic Usage
//!
//! ```rust
//! use vellum_dispatch::{
//!   DispatchOutcome,
//!   Listeners,
//!   Priority,
//! };
//!
//! struct Ctx {
//!   log: Vec<&'static str>,
//! }
//!
//! let mut listeners: Listeners<Ctx, u32> = Listeners::new();
//!
//! listeners.add(Priority::Lowest, |ctx: &mut Ctx, _info, _event: &mut u32| {
//!   ctx.log.push("fallback");
//! });
//! listeners.on(|ctx: &mut Ctx, info, event: &mut u32| {
//!   if *event == 42 {
//!     ctx.log.push("claimed");
//!     info.stop();
//!   }
//! });
//!
//! let mut ctx = Ctx { log: Vec::new() };
//!
//! // The normal-priority handler claims the event; the fallback never runs.
//! assert_eq!(listeners.emit(&mut ctx, &mut 42), DispatchOutcome::Handled);
//! assert_eq!(ctx.log, vec!["claimed"]);
//!
//! // Nobody claims this one, so the fallback gets its turn.
//! assert_eq!(listeners.emit(&mut ctx, &mut 7), DispatchOutcome::Continue);
//! assert_eq!(ctx.log, vec!["claimed", "fallback"]);
//! ```

/// Dispatch tier for a registered handler.
///
/// Tiers dispatch top to bottom; registration order breaks ties within a
/// tier.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub enum Priority {
  High,
  Normal,
  Low,
  /// Runs after every other handler has had the chance to claim the event.
  Lowest,
}

/// Result of emitting an event through a listener list.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DispatchOutcome {
  /// Every handler ran; none claimed the event.
  Continue,
  /// A handler stopped propagation.
  Handled,
}

/// Per-emission control surface passed to every handler.
#[derive(Debug, Default)]
pub struct EventInfo {
  stopped: bool,
}

impl EventInfo {
  fn new() -> Self {
    Self { stopped: false }
  }

  /// Stop propagation: no later handler sees this event, and the emitter
  /// observes [`DispatchOutcome::Handled`].
  pub fn stop(&mut self) {
    self.stopped = true;
  }

  pub fn is_stopped(&self) -> bool {
    self.stopped
  }
}

type BoxedHandler<Ctx, E> = Box<dyn FnMut(&mut Ctx, &mut EventInfo, &mut E)>;

struct Entry<Ctx, E> {
  priority: Priority,
  handler:  BoxedHandler<Ctx, E>,
}

/// An ordered list of handlers for one notification kind.
///
/// Entries are kept sorted by priority; insertion within a tier preserves
/// registration order.
pub struct Listeners<Ctx, E> {
  entries: Vec<Entry<Ctx, E>>,
}

impl<Ctx, E> Default for Listeners<Ctx, E> {
  fn default() -> Self {
    Self::new()
  }
}

impl<Ctx, E> std::fmt::Debug for Listeners<Ctx, E> {
  fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
    f.debug_struct("Listeners")
      .field("len", &self.entries.len())
      .finish()
  }
}

impl<Ctx, E> Listeners<Ctx, E> {
  pub fn new() -> Self {
    Self {
      entries: Vec::new(),
    }
  }

  pub fn len(&self) -> usize {
    self.entries.len()
  }

  pub fn is_empty(&self) -> bool {
    self.entries.is_empty()
  }

  /// Register a handler at the given priority tier.
  pub fn add(
    &mut self,
    priority: Priority,
    handler: impl FnMut(&mut Ctx, &mut EventInfo, &mut E) + 'static,
  ) {
    // Later entries of the same tier land after earlier ones, which keeps
    // registration order stable within the tier.
    let idx = self.entries.partition_point(|entry| entry.priority <= priority);
    self.entries.insert(idx, Entry {
      priority,
      handler: Box::new(handler),
    });
  }

  /// Register a handler at [`Priority::Normal`].
  pub fn on(&mut self, handler: impl FnMut(&mut Ctx, &mut EventInfo, &mut E) + 'static) {
    self.add(Priority::Normal, handler);
  }

  /// Dispatch `event` to every handler in priority order, stopping early if
  /// one claims it.
  pub fn emit(&mut self, ctx: &mut Ctx, event: &mut E) -> DispatchOutcome {
    let mut info = EventInfo::new();

    for entry in self.entries.iter_mut() {
      (entry.handler)(ctx, &mut info, event);
      if info.is_stopped() {
        return DispatchOutcome::Handled;
      }
    }

    DispatchOutcome::Continue
  }
}

#[cfg(test)]
mod test {
  use std::{
    cell::RefCell,
    rc::Rc,
  };

  use super::*;

  fn recorder(
    log: &Rc<RefCell<Vec<&'static str>>>,
    tag: &'static str,
  ) -> impl FnMut(&mut (), &mut EventInfo, &mut u32) + 'static {
    let log = log.clone();
    move |_, _, _| log.borrow_mut().push(tag)
  }

  #[test]
  fn tiers_dispatch_high_to_lowest() {
    let log = Rc::new(RefCell::new(Vec::new()));
    let mut listeners: Listeners<(), u32> = Listeners::new();

    listeners.add(Priority::Lowest, recorder(&log, "lowest"));
    listeners.add(Priority::Low, recorder(&log, "low"));
    listeners.add(Priority::Normal, recorder(&log, "normal"));
    listeners.add(Priority::High, recorder(&log, "high"));

    listeners.emit(&mut (), &mut 0);
    assert_eq!(*log.borrow(), vec!["high", "normal", "low", "lowest"]);
  }

  #[test]
  fn registration_order_is_stable_within_a_tier() {
    let log = Rc::new(RefCell::new(Vec::new()));
    let mut listeners: Listeners<(), u32> = Listeners::new();

    listeners.on(recorder(&log, "first"));
    listeners.on(recorder(&log, "second"));
    listeners.on(recorder(&log, "third"));

    listeners.emit(&mut (), &mut 0);
    assert_eq!(*log.borrow(), vec!["first", "second", "third"]);
  }

  #[test]
  fn stop_halts_propagation() {
    let log = Rc::new(RefCell::new(Vec::new()));
    let mut listeners: Listeners<(), u32> = Listeners::new();

    listeners.on({
      let log = log.clone();
      move |_, info: &mut EventInfo, _| {
        log.borrow_mut().push("claimer");
        info.stop();
      }
    });
    listeners.add(Priority::Lowest, recorder(&log, "fallback"));

    let outcome = listeners.emit(&mut (), &mut 0);
    assert_eq!(outcome, DispatchOutcome::Handled);
    assert_eq!(*log.borrow(), vec!["claimer"]);
  }

  #[test]
  fn handlers_mutate_context_and_event() {
    let mut listeners: Listeners<Vec<u32>, u32> = Listeners::new();

    listeners.on(|ctx: &mut Vec<u32>, _, event: &mut u32| {
      *event += 1;
      ctx.push(*event);
    });
    listeners.on(|ctx: &mut Vec<u32>, _, event: &mut u32| {
      *event *= 10;
      ctx.push(*event);
    });

    let mut seen = Vec::new();
    let outcome = listeners.emit(&mut seen, &mut 4);
    assert_eq!(outcome, DispatchOutcome::Continue);
    assert_eq!(seen, vec![5, 50]);
  }
}
