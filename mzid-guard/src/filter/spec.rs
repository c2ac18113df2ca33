//! The rule filter file.
//!
//! A rule filter file declares which rules become irrelevant given the
//! user's answers to a few questions about the search (was a decoy database
//! used, were PSMs rescored, ...) and given the outcome of other rules.
//!
//! ```json
//! {
//!   "references": {
//!     "decoy_rules": ["DecoyRule_1", "DecoyRule_2"]
//!   },
//!   "conditions": {
//!     "DATABASE_TYPE": {
//!       "description": "Which kind of database was searched",
//!       "options": {
//!         "NO_DECOY_DATABASE": { "rules": ["X"], "references": ["decoy_rules"] }
//!       }
//!     }
//!   },
//!   "outcome_rules": {
//!     "ProteinDetectionListObjectRule": { "if_invalid": ["ProteinAmbiguityGroupRule"] }
//!   }
//! }
//! ```

use crate::prelude::*;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::path::Path;

/// One user-selectable option of a condition.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ConditionOption {
    /// Human readable description
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    /// Rules skipped directly when this option is chosen
    #[serde(default)]
    pub rules: Vec<String>,
    /// Names of shared rule sets skipped when this option is chosen
    #[serde(default)]
    pub references: Vec<String>,
}

/// A question about the search with its possible answers.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Condition {
    /// Human readable description
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    /// Options keyed by value
    #[serde(default)]
    pub options: BTreeMap<String, ConditionOption>,
}

/// Rules to skip depending on another rule's outcome.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct OutcomeDependents {
    /// Skipped when the rule is valid
    #[serde(default)]
    pub if_valid: Vec<String>,
    /// Skipped when the rule is invalid
    #[serde(default)]
    pub if_invalid: Vec<String>,
}

impl OutcomeDependents {
    /// Dependents for one outcome.
    pub fn for_outcome(&self, valid: bool) -> &[String] {
        if valid {
            &self.if_valid
        } else {
            &self.if_invalid
        }
    }
}

/// Immutable rule filter configuration, loaded once.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct RuleFilterSpec {
    /// Shared rule sets by name
    #[serde(default)]
    pub references: BTreeMap<String, Vec<String>>,
    /// Conditions by identifier
    #[serde(default)]
    pub conditions: BTreeMap<String, Condition>,
    /// Outcome-driven dependents by rule identifier
    #[serde(default)]
    pub outcome_rules: BTreeMap<String, OutcomeDependents>,
}

impl RuleFilterSpec {
    /// A filter that never skips anything.
    pub fn empty() -> Self {
        Self::default()
    }

    /// Parses a filter from JSON.
    pub fn from_json_str(json: &str) -> Result<Self> {
        serde_json::from_str(json).map_err(|e| {
            ValidatorError::rule_filter_with_source("rule filter could not be parsed", Box::new(e))
        })
    }

    /// Reads a filter from a JSON file.
    pub fn from_path(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let json = std::fs::read_to_string(path).map_err(|e| {
            ValidatorError::rule_filter_with_source(
                format!("rule filter '{}' could not be read", path.display()),
                Box::new(e),
            )
        })?;
        Self::from_json_str(&json)
    }

    /// Conditions a caller may answer, for listing in a front end.
    pub fn conditions(&self) -> impl Iterator<Item = (&str, &Condition)> {
        self.conditions.iter().map(|(id, c)| (id.as_str(), c))
    }

    /// Adds a shared rule set.
    pub fn with_reference<I, S>(mut self, name: impl Into<String>, rules: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.references
            .insert(name.into(), rules.into_iter().map(Into::into).collect());
        self
    }

    /// Adds or replaces one option of a condition.
    pub fn with_option(
        mut self,
        condition: impl Into<String>,
        option: impl Into<String>,
        definition: ConditionOption,
    ) -> Self {
        self.conditions
            .entry(condition.into())
            .or_default()
            .options
            .insert(option.into(), definition);
        self
    }

    /// Declares rules to skip after `rule` produced the given outcome.
    pub fn with_outcome_rule<I, S>(
        mut self,
        rule: impl Into<String>,
        valid: bool,
        dependents: I,
    ) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let entry = self.outcome_rules.entry(rule.into()).or_default();
        let target = if valid {
            &mut entry.if_valid
        } else {
            &mut entry.if_invalid
        };
        target.extend(dependents.into_iter().map(Into::into));
        self
    }
}

impl ConditionOption {
    /// An option skipping the given rules directly.
    pub fn rules<I, S>(rules: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            rules: rules.into_iter().map(Into::into).collect(),
            ..Self::default()
        }
    }

    /// Adds a reference to a shared rule set.
    pub fn with_reference(mut self, reference: impl Into<String>) -> Self {
        self.references.push(reference.into());
        self
    }

    /// Sets the description.
    pub fn with_description(mut self, description: impl Into<String>) -> Self {
        self.description = Some(description.into());
        self
    }
}
