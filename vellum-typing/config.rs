//! Typing configuration and the rule-set resolution algebra.
//!
//! The transformation rule set is resolved once, at plugin construction,
//! from three lists:
//!
//! - `include` - names (rules or groups) or inline rule definitions; when
//!   present it replaces the default group list entirely
//! - `extra` - additive, on top of include/defaults
//! - `remove` - subtractive, applied last; removing a group name removes
//!   all of its members
//!
//! Group names expand to their member rules, duplicates collapse through
//! order-preserving map semantics, and unknown plain names are dropped
//! silently - permissive parsing, a config listing a rule this build does
//! not know is not an error. An *invalid inline rule* (bad regex, arity
//! mismatch) is a programmer error and fails resolution.
//!
//! ```ignore
//! use vellum_typing::config::{TransformationsConfig, resolve};
//!
//! let config = TransformationsConfig::default()
//!   .with_include(["symbols"])
//!   .with_remove(["trademark"]);
//! let rules = resolve(&config)?;
//! assert!(rules.contains_key("copyright"));
//! assert!(!rules.contains_key("trademark"));
//! ```
//!
//! In data configs (TOML/JSON) an inline rule looks like:
//!
//! ```toml
//! extra = [
//!   "quotesPrimaryEnGb",
//!   { name = "shrug", from = "/shrug", to = "¯\\_(ツ)_/¯" },
//! ]
//! ```
//!
//! A `to` array entry that is `null` (JSON) or `""` (TOML, which has no
//! null) keeps that group's text unchanged. Function replacements are only
//! available through the builder API ([`RuleEntry::Custom`]).

use std::collections::HashSet;

use indexmap::IndexMap;
use serde::Deserialize;

use crate::transform::{
  DEFAULT_GROUPS,
  PatternSpec,
  ReplacementSpec,
  Result,
  TransformationRule,
  builtin,
  group_members,
};

/// The resolved mapping from rule name to rule, in registration order.
pub type RuleSet = IndexMap<String, TransformationRule>;

/// The `typing` configuration surface.
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct TypingConfig {
  pub transformations: TransformationsConfig,
  /// How many typed characters group into one change set before the typing
  /// buffer starts a new one.
  pub buffer_limit:    usize,
}

impl Default for TypingConfig {
  fn default() -> Self {
    Self {
      transformations: TransformationsConfig::default(),
      buffer_limit:    20,
    }
  }
}

impl TypingConfig {
  pub fn from_toml(text: &str) -> std::result::Result<Self, toml::de::Error> {
    toml::from_str(text)
  }
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct TransformationsConfig {
  /// Replaces the default rule/group list entirely when present.
  pub include: Option<Vec<RuleEntry>>,
  /// Added on top of `include` (or the defaults).
  pub extra:   Vec<RuleEntry>,
  /// Removed from the resolved set, groups included.
  pub remove:  Vec<String>,
}

impl TransformationsConfig {
  pub fn with_include(mut self, entries: impl IntoIterator<Item = impl Into<RuleEntry>>) -> Self {
    self.include = Some(entries.into_iter().map(Into::into).collect());
    self
  }

  pub fn with_extra(mut self, entries: impl IntoIterator<Item = impl Into<RuleEntry>>) -> Self {
    self.extra.extend(entries.into_iter().map(Into::into));
    self
  }

  pub fn with_remove(mut self, names: impl IntoIterator<Item = impl Into<String>>) -> Self {
    self.remove.extend(names.into_iter().map(Into::into));
    self
  }
}

/// One entry of `include`/`extra`: a name, an inline definition, or a
/// fully-built rule.
#[derive(Debug, Clone, Deserialize)]
#[serde(untagged)]
pub enum RuleEntry {
  /// A built-in rule or group name.
  Name(String),
  /// An inline data-only rule definition.
  Inline(RuleDef),
  /// A rule built through the API, closures and all.
  #[serde(skip)]
  Custom(TransformationRule),
}

impl From<&str> for RuleEntry {
  fn from(name: &str) -> Self {
    Self::Name(name.to_string())
  }
}

impl From<RuleDef> for RuleEntry {
  fn from(def: RuleDef) -> Self {
    Self::Inline(def)
  }
}

impl From<TransformationRule> for RuleEntry {
  fn from(rule: TransformationRule) -> Self {
    Self::Custom(rule)
  }
}

/// Data-only rule definition.
#[derive(Debug, Clone, Deserialize)]
pub struct RuleDef {
  pub name: String,
  pub from: FromDef,
  pub to:   ToDef,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(untagged)]
pub enum FromDef {
  /// A literal suffix string.
  Literal(String),
  /// A parameterized pattern with capture groups.
  Pattern { pattern: String },
}

#[derive(Debug, Clone, Deserialize)]
#[serde(untagged)]
pub enum ToDef {
  /// Replace the single capture group.
  Literal(String),
  /// One entry per capture group; `null`/`""` keeps the group's text.
  PerGroup(Vec<Option<String>>),
}

impl RuleDef {
  fn build(&self) -> Result<TransformationRule> {
    let from = match &self.from {
      FromDef::Literal(text) => PatternSpec::Literal(text.as_str().into()),
      FromDef::Pattern { pattern } => PatternSpec::Parameterized(pattern.as_str().into()),
    };

    let to = match &self.to {
      ToDef::Literal(text) => ReplacementSpec::Literal(text.as_str().into()),
      ToDef::PerGroup(entries) => {
        ReplacementSpec::PerGroup(
          entries
            .iter()
            .map(|entry| {
              entry
                .as_deref()
                .filter(|text| !text.is_empty())
                .map(Into::into)
            })
            .collect(),
        )
      },
    };

    TransformationRule::new(self.name.as_str(), from, to)
  }
}

/// Resolve a configuration into the final rule set.
pub fn resolve(config: &TransformationsConfig) -> Result<RuleSet> {
  // Names subtracted from the final set: the remove entries themselves plus
  // the members of any removed group. Checked both before and after group
  // expansion so a removed group name never re-expands.
  let mut removed: HashSet<&str> = HashSet::new();
  for name in &config.remove {
    removed.insert(name.as_str());
    if let Some(members) = group_members(name) {
      removed.extend(members);
    }
  }

  let base: Vec<RuleEntry> = match &config.include {
    Some(entries) => entries.clone(),
    None => {
      DEFAULT_GROUPS
        .iter()
        .map(|group| RuleEntry::Name((*group).to_string()))
        .collect()
    },
  };

  let mut out = RuleSet::new();
  for entry in base.iter().chain(config.extra.iter()) {
    match entry {
      RuleEntry::Name(name) => {
        if removed.contains(name.as_str()) {
          continue;
        }
        if let Some(members) = group_members(name) {
          for &member in members {
            if removed.contains(member) {
              continue;
            }
            insert_builtin(&mut out, member);
          }
        } else {
          insert_builtin(&mut out, name);
        }
      },
      RuleEntry::Inline(def) => {
        if !removed.contains(def.name.as_str()) {
          out.insert(def.name.clone(), def.build()?);
        }
      },
      RuleEntry::Custom(rule) => {
        if !removed.contains(rule.name()) {
          out.insert(rule.name().to_string(), rule.clone());
        }
      },
    }
  }

  for name in &removed {
    out.shift_remove(*name);
  }

  Ok(out)
}

fn insert_builtin(out: &mut RuleSet, name: &str) {
  match builtin(name) {
    Some(rule) => {
      out.insert(name.to_string(), rule);
    },
    None => {
      tracing::debug!(name, "unknown transformation name; ignoring");
    },
  }
}
