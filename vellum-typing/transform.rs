//! Text transformations: rewriting typed patterns as the user types.
//!
//! This module provides the rule model and the engine that turns `(c)` into
//! `©` and straight quotes into curly ones at the moment they are typed.
//!
//! # Rules
//!
//! A [`TransformationRule`] pairs a pattern with a replacement. Patterns are
//! either a literal suffix (`"(c)"`) or a parameterized expression with
//! capture groups; both normalize at construction into one suffix-anchored
//! regex whose capture groups cover the entire match. Replacements normalize
//! into a function from the captured substrings to one replacement per
//! group, where `None` means "leave this group's text alone".
//!
//! ```ignore
//! use vellum_typing::transform::{PatternSpec, ReplacementSpec, TransformationRule};
//!
//! // Straight quotes to curly quotes, touching only the two quote marks.
//! let rule = TransformationRule::new(
//!   "quotesPrimary",
//!   PatternSpec::Parameterized(r#"(^|\s)(")([^"]*)(")"#.into()),
//!   ReplacementSpec::PerGroup(vec![None, Some("\u{201C}".into()), None, Some("\u{201D}".into())]),
//! )?;
//! ```
//!
//! # Engine
//!
//! The [`TransformationEngine`] owns one [`TextWatcher`] per rule. On every
//! applied batch it feeds the watchers; a content-change match on a batch
//! that is genuine forward typing ([`Batch::is_typing_shaped`] with
//! [`Source::UserInput`]) triggers the rewrite. Only the capture groups with
//! a replacement are touched - surrounding text, and its formatting, is
//! never rewritten. Replaced spans inherit the inline attributes of the
//! first character they replace, which is what keeps a closing quote bold
//! when the quoted run is bold.
//!
//! All spans of one match are rewritten inside a single transaction, so the
//! document never observes a half-transformed state. The transaction is
//! tagged [`Source::Programmatic`], which is exactly why the engine's own
//! output can never re-trigger a rule.
//!
//! When several rules match the same caret context, the first registered
//! rule wins and at most one transformation applies per batch; the other
//! watchers re-evaluate against the rewritten text so their state stays
//! truthful.

use std::{
  fmt,
  sync::Arc,
};

use regex::Regex;
use thiserror::Error;
use vellum_model::{
  Tendril,
  document::{
    Batch,
    Document,
    Result as DocumentResult,
  },
  transaction::{
    Change,
    Source,
    Transaction,
  },
};

use crate::watcher::{
  MatchVia,
  TextWatcher,
  WatcherEvent,
};

pub type Result<T> = std::result::Result<T, RuleError>;

#[derive(Debug, Error)]
#[non_exhaustive]
pub enum RuleError {
  #[error("invalid pattern for rule `{name}`")]
  InvalidPattern {
    name:   String,
    #[source]
    source: regex::Error,
  },
  #[error("rule `{name}` pattern has no capture groups")]
  NoCaptureGroups { name: String },
  #[error(
    "rule `{name}` replacement arity mismatch: pattern has {groups} groups, replacement has \
     {replacements}"
  )]
  ArityMismatch {
    name:         String,
    groups:       usize,
    replacements: usize,
  },
}

/// Pattern half of a rule, as authored.
#[derive(Debug, Clone)]
pub enum PatternSpec {
  /// A fixed suffix string, matched literally.
  Literal(Tendril),
  /// A regex with capture groups covering the whole match. A trailing `$`
  /// is implied and appended when missing.
  Parameterized(Tendril),
}

/// Replacement function: captured substrings in, one replacement per group
/// out (`None` leaves that group's text unchanged).
pub type ReplaceFn = Arc<dyn Fn(&[&str]) -> Vec<Option<Tendril>> + Send + Sync>;

/// Replacement half of a rule, as authored.
#[derive(Clone)]
pub enum ReplacementSpec {
  /// Replace the single capture group with this string.
  Literal(Tendril),
  /// One entry per capture group, `None` to keep that group.
  PerGroup(Vec<Option<Tendril>>),
  /// Compute replacements from the captured substrings.
  Func(ReplaceFn),
}

impl fmt::Debug for ReplacementSpec {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    match self {
      Self::Literal(text) => f.debug_tuple("Literal").field(text).finish(),
      Self::PerGroup(entries) => f.debug_tuple("PerGroup").field(entries).finish(),
      Self::Func(_) => f.write_str("Func(..)"),
    }
  }
}

/// An immutable, normalized transformation rule. Identity is by name.
#[derive(Clone)]
pub struct TransformationRule {
  name:    Tendril,
  pattern: Regex,
  groups:  usize,
  replace: ReplaceFn,
}

impl fmt::Debug for TransformationRule {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    f.debug_struct("TransformationRule")
      .field("name", &self.name)
      .field("pattern", &self.pattern.as_str())
      .field("groups", &self.groups)
      .finish()
  }
}

impl TransformationRule {
  pub fn new(name: impl Into<Tendril>, from: PatternSpec, to: ReplacementSpec) -> Result<Self> {
    let name = name.into();

    let source = match &from {
      PatternSpec::Literal(text) => format!("({})$", regex::escape(text)),
      PatternSpec::Parameterized(src) => {
        if src.ends_with('$') {
          src.to_string()
        } else {
          format!("{src}$")
        }
      },
    };

    let pattern = Regex::new(&source).map_err(|err| {
      RuleError::InvalidPattern {
        name:   name.to_string(),
        source: err,
      }
    })?;

    let groups = pattern.captures_len() - 1;
    if groups == 0 {
      return Err(RuleError::NoCaptureGroups {
        name: name.to_string(),
      });
    }

    let replace: ReplaceFn = match to {
      ReplacementSpec::Literal(text) => {
        if groups != 1 {
          return Err(RuleError::ArityMismatch {
            name: name.to_string(),
            groups,
            replacements: 1,
          });
        }
        Arc::new(move |_| vec![Some(text.clone())])
      },
      ReplacementSpec::PerGroup(entries) => {
        if entries.len() != groups {
          return Err(RuleError::ArityMismatch {
            name: name.to_string(),
            groups,
            replacements: entries.len(),
          });
        }
        Arc::new(move |_| entries.clone())
      },
      ReplacementSpec::Func(f) => f,
    };

    Ok(Self {
      name,
      pattern,
      groups,
      replace,
    })
  }

  pub fn name(&self) -> &str {
    &self.name
  }

  pub fn group_count(&self) -> usize {
    self.groups
  }

  /// Does this rule's pattern match (as a suffix) the given caret context?
  pub fn matches(&self, context: &str) -> bool {
    self.pattern.is_match(context)
  }
}

// Built-in rule table.
//

fn make_rule(name: &str, from: PatternSpec, to: ReplacementSpec) -> TransformationRule {
  TransformationRule::new(name, from, to).expect("built-in rule table entries are valid")
}

fn literal(name: &str, from: &str, to: &str) -> TransformationRule {
  make_rule(
    name,
    PatternSpec::Literal(from.into()),
    ReplacementSpec::Literal(to.into()),
  )
}

/// `1/2` style fractions: the preceding character must not extend the
/// fraction (`11/2` stays untouched).
fn fraction(name: &str, digits: &str, glyph: &str) -> TransformationRule {
  make_rule(
    name,
    PatternSpec::Parameterized(format!("(^|[^/a-z0-9])({})$", regex::escape(digits)).into()),
    ReplacementSpec::PerGroup(vec![None, Some(glyph.into())]),
  )
}

/// `" -- "` style dashes: both surrounding spaces stay.
fn dash(name: &str, dashes: &str, glyph: &str) -> TransformationRule {
  make_rule(
    name,
    PatternSpec::Parameterized(format!("(^| )({})( )$", regex::escape(dashes)).into()),
    ReplacementSpec::PerGroup(vec![None, Some(glyph.into()), None]),
  )
}

/// A quote pair: an opening quote after start-of-block or whitespace, any
/// non-quote run, and the closing quote just typed.
fn quotes(name: &str, quote: char, open: &str, close: &str) -> TransformationRule {
  let q = regex::escape(&quote.to_string());
  make_rule(
    name,
    PatternSpec::Parameterized(format!(r"(^|\s)({q})([^{q}]*)({q})$").into()),
    ReplacementSpec::PerGroup(vec![None, Some(open.into()), None, Some(close.into())]),
  )
}

/// Resolve a built-in rule by name.
pub(crate) fn builtin(name: &str) -> Option<TransformationRule> {
  let rule = match name {
    // Public symbols
    "copyright" => literal("copyright", "(c)", "©"),
    "registeredTrademark" => literal("registeredTrademark", "(r)", "®"),
    "trademark" => literal("trademark", "(tm)", "™"),

    // Common mathematical symbols
    "oneHalf" => fraction("oneHalf", "1/2", "½"),
    "oneThird" => fraction("oneThird", "1/3", "⅓"),
    "twoThirds" => fraction("twoThirds", "2/3", "⅔"),
    "oneForth" => fraction("oneForth", "1/4", "¼"),
    "threeQuarters" => fraction("threeQuarters", "3/4", "¾"),
    "notEqual" => literal("notEqual", "!=", "≠"),
    "arrowLeft" => literal("arrowLeft", "<-", "←"),
    "arrowRight" => literal("arrowRight", "->", "→"),

    // Typography
    "horizontalEllipsis" => literal("horizontalEllipsis", "...", "…"),
    "enDash" => dash("enDash", "--", "–"),
    "emDash" => dash("emDash", "---", "—"),

    // Quotes, with the locale variants resolvable by name
    "quotesPrimary" => quotes("quotesPrimary", '"', "\u{201C}", "\u{201D}"),
    "quotesSecondary" => quotes("quotesSecondary", '\'', "\u{2018}", "\u{2019}"),
    "quotesPrimaryEnGb" => quotes("quotesPrimaryEnGb", '\'', "\u{2018}", "\u{2019}"),
    "quotesSecondaryEnGb" => quotes("quotesSecondaryEnGb", '"', "\u{201C}", "\u{201D}"),
    "quotesPrimaryPl" => quotes("quotesPrimaryPl", '"', "\u{201E}", "\u{201D}"),
    "quotesSecondaryPl" => quotes("quotesSecondaryPl", '\'', "\u{201A}", "\u{2019}"),

    _ => return None,
  };

  Some(rule)
}

pub(crate) const GROUPS: &[(&str, &[&str])] = &[
  ("symbols", &["copyright", "registeredTrademark", "trademark"]),
  ("mathematical", &[
    "oneHalf",
    "oneThird",
    "twoThirds",
    "oneForth",
    "threeQuarters",
    "notEqual",
    "arrowLeft",
    "arrowRight",
  ]),
  ("typography", &["horizontalEllipsis", "enDash", "emDash"]),
  ("quotes", &["quotesPrimary", "quotesSecondary"]),
];

pub(crate) const DEFAULT_GROUPS: &[&str] = &["symbols", "mathematical", "typography", "quotes"];

pub(crate) fn group_members(name: &str) -> Option<&'static [&'static str]> {
  GROUPS
    .iter()
    .find(|(group, _)| *group == name)
    .map(|(_, members)| *members)
}

// Engine.
//

struct RuleSlot {
  rule:    TransformationRule,
  watcher: TextWatcher,
}

/// One watcher per registered rule, fed by the host's batch and
/// selection-change notifications.
pub struct TransformationEngine {
  rules: Vec<RuleSlot>,
}

impl fmt::Debug for TransformationEngine {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    f.debug_struct("TransformationEngine")
      .field("rules", &self.rules.len())
      .finish()
  }
}

impl TransformationEngine {
  pub fn new(rules: impl IntoIterator<Item = TransformationRule>) -> Self {
    let rules = rules
      .into_iter()
      .map(|rule| {
        let test = rule.clone();
        RuleSlot {
          watcher: TextWatcher::new(move |context| test.matches(context)),
          rule,
        }
      })
      .collect();

    Self { rules }
  }

  pub fn rule_count(&self) -> usize {
    self.rules.len()
  }

  /// Feed an applied batch to every rule watcher and perform at most one
  /// transformation. Returns the batch of the applied rewrite, if any.
  pub fn on_batch(&mut self, doc: &mut Document, batch: &Batch) -> DocumentResult<Option<Batch>> {
    let mut applied = None;

    for slot in &mut self.rules {
      let Some(event) = slot.watcher.on_batch(doc, batch) else {
        continue;
      };
      let WatcherEvent::Matched {
        text,
        range,
        via: MatchVia::ContentChange,
      } = event
      else {
        continue;
      };

      // First registered rule wins; later matches wait for the next cycle.
      if applied.is_some() {
        continue;
      }
      // Only organic forward typing triggers a rewrite. Programmatic edits,
      // transparent bookkeeping, deletions and paragraph merges never do.
      if batch.source() != Source::UserInput || !batch.is_typing_shaped() {
        continue;
      }

      applied = apply_rule(doc, &slot.rule, &text, range.0)?;
    }

    if let Some(rewrite) = &applied {
      // The rewrite changed the text under every watcher; re-evaluate them
      // all so match state stays truthful.
      for slot in &mut self.rules {
        let _ = slot.watcher.on_batch(doc, rewrite);
      }
    }

    Ok(applied)
  }

  /// Feed a batch to the watchers without performing any rewrite. Used when
  /// the insert-text command is disabled: typing features are off, but
  /// match state must stay truthful for when they come back.
  pub fn observe_batch(&mut self, doc: &Document, batch: &Batch) {
    for slot in &mut self.rules {
      let _ = slot.watcher.on_batch(doc, batch);
    }
  }

  /// Feed a pure selection change to every rule watcher.
  pub fn on_selection_change(&mut self, doc: &Document) {
    for slot in &mut self.rules {
      let _ = slot.watcher.on_selection_change(doc);
    }
  }
}

/// Re-run the full pattern over the matched context and rewrite the capture
/// groups that have replacements, all inside one transaction.
fn apply_rule(
  doc: &mut Document,
  rule: &TransformationRule,
  context: &str,
  context_start: usize,
) -> DocumentResult<Option<Batch>> {
  let Some(caps) = rule.pattern.captures(context) else {
    return Ok(None);
  };
  let whole = match caps.get(0) {
    Some(whole) => whole,
    None => return Ok(None),
  };

  let groups: Vec<&str> = (1..=rule.groups)
    .map(|i| caps.get(i).map_or("", |g| g.as_str()))
    .collect();

  // The pattern contract: capture groups cover the matched region exactly.
  let covered: usize = groups.iter().map(|g| g.len()).sum();
  if covered != whole.len() {
    tracing::warn!(
      rule = rule.name(),
      "capture groups do not cover the match; skipping transformation"
    );
    return Ok(None);
  }

  let replacements = (rule.replace)(&groups);

  let match_start = context_start + context[..whole.start()].chars().count();
  // `cursor` walks the pre-change document, `new_cursor` the post-change one
  // (attribute assignments land in post-change coordinates).
  let mut cursor = match_start;
  let mut new_cursor = match_start;
  let mut changes: Vec<Change> = Vec::new();
  let mut attr_assigns = Vec::new();

  for (idx, group_text) in groups.iter().enumerate() {
    let group_len = group_text.chars().count();

    match replacements.get(idx).cloned().flatten() {
      Some(replacement) => {
        // The inserted text inherits the inline attributes of the first
        // character it replaces, not of what came before it.
        let attrs = doc.attrs_at(cursor);
        let replacement_len = replacement.chars().count();

        changes.push((cursor, cursor + group_len, Some(replacement)));
        attr_assigns.push((new_cursor, new_cursor + replacement_len, attrs));
        new_cursor += replacement_len;
      },
      None => new_cursor += group_len,
    }

    cursor += group_len;
  }

  if changes.is_empty() {
    return Ok(None);
  }

  let mut tx = Transaction::change(doc.text(), changes)?.with_source(Source::Programmatic);
  for (from, to, attrs) in attr_assigns {
    tx = tx.with_attributes(from, to, attrs);
  }

  tracing::debug!(rule = rule.name(), "applying text transformation");
  let batch = doc.apply(&tx)?;
  Ok(Some(batch))
}

#[cfg(test)]
mod test {
  use vellum_model::{
    attributes::Attributes,
    selection::Selection,
  };

  use super::*;

  fn engine_for(names: &[&str]) -> TransformationEngine {
    TransformationEngine::new(names.iter().map(|name| builtin(name).unwrap()))
  }

  fn type_str(doc: &mut Document, engine: &mut TransformationEngine, text: &str) {
    for ch in text.chars() {
      let caret = doc.selection().head();
      let attrs = doc.attrs_before(caret);
      let tx = Transaction::insert(doc.text(), caret, ch.to_string().into())
        .unwrap()
        .with_attributes(caret, caret + 1, attrs)
        .with_source(Source::UserInput);
      let batch = doc.apply(&tx).unwrap();
      engine.on_batch(doc, &batch).unwrap();
    }
  }

  #[test]
  fn copyright_replacement_is_exact() {
    let mut doc = Document::new("A foo");
    doc.set_selection(Selection::point(5)).unwrap();
    let mut engine = engine_for(&["copyright"]);

    type_str(&mut doc, &mut engine, "(c)");

    assert_eq!(doc.text().to_string(), "A foo©");
    assert_eq!(doc.selection(), &Selection::point(6));
  }

  #[test]
  fn quotes_preserve_untouched_groups() {
    let mut doc = Document::new(" \"Foo 1992 — bar(1) baz: xyz.");
    let end = doc.text().len_chars();
    doc.set_selection(Selection::point(end)).unwrap();
    let mut engine = engine_for(&["quotesPrimary"]);

    type_str(&mut doc, &mut engine, "\"");

    assert_eq!(
      doc.text().to_string(),
      " \u{201C}Foo 1992 — bar(1) baz: xyz.\u{201D}"
    );
  }

  #[test]
  fn replacement_inherits_attributes_of_replaced_text() {
    // Foo "<bold>Bar</bold> with the caret after Bar.
    let mut doc = Document::new("Foo \"Bar");
    doc.set_selection(Selection::point(8)).unwrap();
    let tx = Transaction::new(doc.text()).with_attributes(5, 8, Attributes::BOLD);
    doc.apply(&tx).unwrap();

    let mut engine = engine_for(&["quotesPrimary"]);
    type_str(&mut doc, &mut engine, "\"");

    assert_eq!(doc.text().to_string(), "Foo \u{201C}Bar\u{201D}");
    // The opening quote replaced a plain character and stays plain; the
    // closing quote replaced a bold one and stays bold.
    assert_eq!(doc.attrs_at(4), Attributes::empty());
    assert_eq!(doc.attrs_at(5), Attributes::BOLD);
    assert_eq!(doc.attrs_at(8), Attributes::BOLD);
  }

  #[test]
  fn en_dash_keeps_surrounding_spaces() {
    let mut doc = Document::new("x");
    doc.set_selection(Selection::point(1)).unwrap();
    let mut engine = engine_for(&["enDash", "emDash"]);

    type_str(&mut doc, &mut engine, " -- ");
    assert_eq!(doc.text().to_string(), "x – ");
  }

  #[test]
  fn fractions_require_a_boundary() {
    let mut doc = Document::new("");
    let mut engine = engine_for(&["oneHalf"]);

    type_str(&mut doc, &mut engine, "11/2");
    assert_eq!(doc.text().to_string(), "11/2");

    type_str(&mut doc, &mut engine, " 1/2");
    assert_eq!(doc.text().to_string(), "11/2 ½");
  }

  #[test]
  fn programmatic_insertions_never_trigger() {
    let mut doc = Document::new("A foo(c");
    doc.set_selection(Selection::point(7)).unwrap();
    let mut engine = engine_for(&["copyright"]);

    let tx = Transaction::insert(doc.text(), 7, ")".into()).unwrap();
    let batch = doc.apply(&tx).unwrap();
    let applied = engine.on_batch(&mut doc, &batch).unwrap();

    assert!(applied.is_none());
    assert_eq!(doc.text().to_string(), "A foo(c)");
  }

  #[test]
  fn deletions_never_trigger() {
    // Deleting back to "(c)" must not fire the rule.
    let mut doc = Document::new("A foo(c)x");
    doc.set_selection(Selection::point(9)).unwrap();
    let mut engine = engine_for(&["copyright"]);

    let tx = Transaction::delete(doc.text(), vec![(8, 9)])
      .unwrap()
      .with_selection(Selection::point(8))
      .with_source(Source::UserInput);
    let batch = doc.apply(&tx).unwrap();
    let applied = engine.on_batch(&mut doc, &batch).unwrap();

    assert!(applied.is_none());
    assert_eq!(doc.text().to_string(), "A foo(c)");
  }

  #[test]
  fn first_registered_rule_wins() {
    let first = TransformationRule::new(
      "first",
      PatternSpec::Literal("ab".into()),
      ReplacementSpec::Literal("X".into()),
    )
    .unwrap();
    let second = TransformationRule::new(
      "second",
      PatternSpec::Literal("b".into()),
      ReplacementSpec::Literal("Y".into()),
    )
    .unwrap();

    let mut doc = Document::new("");
    let mut engine = TransformationEngine::new([first, second]);

    type_str(&mut doc, &mut engine, "ab");
    assert_eq!(doc.text().to_string(), "X");
  }

  #[test]
  fn function_replacements_see_the_captures() {
    let shout = TransformationRule::new(
      "shout",
      PatternSpec::Parameterized(r"(\w+)(!!)".into()),
      ReplacementSpec::Func(Arc::new(|groups: &[&str]| {
        vec![Some(groups[0].to_uppercase().into()), Some("!".into())]
      })),
    )
    .unwrap();

    let mut doc = Document::new("");
    let mut engine = TransformationEngine::new([shout]);

    type_str(&mut doc, &mut engine, "wow!!");
    assert_eq!(doc.text().to_string(), "WOW!");
  }

  #[test]
  fn rule_construction_errors() {
    let err = TransformationRule::new(
      "broken",
      PatternSpec::Parameterized("([unclosed".into()),
      ReplacementSpec::Literal("x".into()),
    )
    .unwrap_err();
    assert!(matches!(err, RuleError::InvalidPattern { .. }));

    let err = TransformationRule::new(
      "groupless",
      PatternSpec::Parameterized("abc".into()),
      ReplacementSpec::Literal("x".into()),
    )
    .unwrap_err();
    assert!(matches!(err, RuleError::NoCaptureGroups { .. }));

    let err = TransformationRule::new(
      "lopsided",
      PatternSpec::Parameterized("(a)(b)".into()),
      ReplacementSpec::PerGroup(vec![Some("x".into())]),
    )
    .unwrap_err();
    assert!(matches!(err, RuleError::ArityMismatch {
      groups: 2,
      replacements: 1,
      ..
    }));
  }

  #[test]
  fn builtin_table_is_complete() {
    for (_, members) in GROUPS {
      for &name in *members {
        assert!(builtin(name).is_some(), "missing built-in rule {name}");
      }
    }
    for name in [
      "quotesPrimaryEnGb",
      "quotesSecondaryEnGb",
      "quotesPrimaryPl",
      "quotesSecondaryPl",
    ] {
      assert!(builtin(name).is_some());
    }
    assert!(builtin("bogus").is_none());
  }
}
