//! Turns user answers and rule outcomes into the set of rules to skip.

use super::RuleFilterSpec;
use crate::core::ValidatorMessage;
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, BTreeSet};
use std::sync::Arc;
use tracing::{debug, warn};

/// The caller's answers for one run: condition identifier to chosen option.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct SelectedOptions(BTreeMap<String, String>);

impl SelectedOptions {
    /// No answers.
    pub fn new() -> Self {
        Self::default()
    }

    /// Adds an answer.
    pub fn with(mut self, condition: impl Into<String>, option: impl Into<String>) -> Self {
        self.0.insert(condition.into(), option.into());
        self
    }

    /// Sets an answer, replacing any previous one.
    pub fn select(&mut self, condition: impl Into<String>, option: impl Into<String>) {
        self.0.insert(condition.into(), option.into());
    }

    /// The chosen option for a condition.
    pub fn get(&self, condition: &str) -> Option<&str> {
        self.0.get(condition).map(String::as_str)
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &str)> {
        self.0.iter().map(|(c, o)| (c.as_str(), o.as_str()))
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

impl<C: Into<String>, O: Into<String>> FromIterator<(C, O)> for SelectedOptions {
    fn from_iter<T: IntoIterator<Item = (C, O)>>(iter: T) -> Self {
        Self(
            iter.into_iter()
                .map(|(c, o)| (c.into(), o.into()))
                .collect(),
        )
    }
}

/// Run-scoped set of rule identifiers whose results are suppressed.
///
/// The set only grows; [`RuleSkipSet::clear`] is reserved to the run reset.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
#[serde(transparent)]
pub struct RuleSkipSet(BTreeSet<String>);

impl RuleSkipSet {
    /// Adds a rule, returning true if it was not yet skipped.
    pub fn insert(&mut self, rule_id: impl Into<String>) -> bool {
        self.0.insert(rule_id.into())
    }

    pub fn contains(&self, rule_id: &str) -> bool {
        self.0.contains(rule_id)
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    /// Skipped identifiers in sorted order.
    pub fn iter(&self) -> impl Iterator<Item = &str> {
        self.0.iter().map(String::as_str)
    }

    pub(crate) fn clear(&mut self) {
        self.0.clear();
    }
}

/// Maintains the skip set of a run from a [`RuleFilterSpec`].
///
/// Two additive mechanisms feed the set. Static resolution maps the caller's
/// [`SelectedOptions`] to rules once at the start of a run; dynamic
/// resolution adds the dependents declared for a rule's observed outcome.
/// Both are a plain union: a rule skipped for two reasons is skipped once.
///
/// # Examples
///
/// ```rust
/// use mzid_guard::filter::{ConditionOption, RuleFilterResolver, RuleFilterSpec, SelectedOptions};
///
/// let spec = RuleFilterSpec::empty()
///     .with_option("DATABASE_TYPE", "NO_DECOY_DATABASE", ConditionOption::rules(["X"]));
/// let mut resolver = RuleFilterResolver::new(spec);
///
/// let selected = SelectedOptions::new().with("DATABASE_TYPE", "NO_DECOY_DATABASE");
/// resolver.apply_selected_options(&selected);
/// assert!(resolver.is_skipped("X"));
/// ```
#[derive(Debug, Clone, Default)]
pub struct RuleFilterResolver {
    spec: Arc<RuleFilterSpec>,
    skipped: RuleSkipSet,
}

impl RuleFilterResolver {
    /// Creates a resolver with an empty skip set.
    pub fn new(spec: impl Into<Arc<RuleFilterSpec>>) -> Self {
        Self {
            spec: spec.into(),
            skipped: RuleSkipSet::default(),
        }
    }

    /// The filter configuration.
    pub fn spec(&self) -> &RuleFilterSpec {
        &self.spec
    }

    /// Rules declared for the selected options.
    ///
    /// Direct rule lists plus one level of shared-set references. Unknown
    /// conditions, options and references contribute nothing.
    pub fn resolve(&self, selected: &SelectedOptions) -> BTreeSet<String> {
        let mut rules = BTreeSet::new();
        for (condition_id, option_id) in selected.iter() {
            let Some(condition) = self.spec.conditions.get(condition_id) else {
                warn!(
                    filter.condition = %condition_id,
                    "Selected condition is not defined in the rule filter"
                );
                continue;
            };
            let Some(option) = condition.options.get(option_id) else {
                warn!(
                    filter.condition = %condition_id,
                    filter.option = %option_id,
                    "Selected option is not defined for condition"
                );
                continue;
            };
            rules.extend(option.rules.iter().cloned());
            for reference in &option.references {
                match self.spec.references.get(reference) {
                    Some(shared) => rules.extend(shared.iter().cloned()),
                    None => warn!(
                        filter.condition = %condition_id,
                        filter.reference = %reference,
                        "Option references an undefined rule set"
                    ),
                }
            }
        }
        rules
    }

    /// Adds the statically resolved rules to the skip set.
    pub fn apply_selected_options(&mut self, selected: &SelectedOptions) -> usize {
        let mut added = 0;
        for rule in self.resolve(selected) {
            if self.skipped.insert(rule) {
                added += 1;
            }
        }
        debug!(
            filter.selected = selected.iter().count(),
            filter.skipped = added,
            "Resolved selected options"
        );
        added
    }

    /// Records a rule's outcome, skipping its declared dependents.
    pub fn observe_outcome(&mut self, rule_id: &str, valid: bool) {
        let Some(dependents) = self.spec.outcome_rules.get(rule_id) else {
            return;
        };
        for dependent in dependents.for_outcome(valid) {
            if self.skipped.insert(dependent.clone()) {
                debug!(
                    rule.id = %rule_id,
                    rule.valid = valid,
                    skipped = %dependent,
                    "Rule outcome skips dependent rule"
                );
            }
        }
    }

    pub fn is_skipped(&self, rule_id: &str) -> bool {
        self.skipped.contains(rule_id)
    }

    /// The current skip set.
    pub fn skip_set(&self) -> &RuleSkipSet {
        &self.skipped
    }

    /// Removes skipped rules from a rule-keyed message map.
    ///
    /// Returns the kept map and the identifiers that were dropped.
    pub fn filter_messages(
        &self,
        messages: BTreeMap<String, Vec<ValidatorMessage>>,
    ) -> (BTreeMap<String, Vec<ValidatorMessage>>, Vec<String>) {
        let mut dropped = Vec::new();
        let kept = messages
            .into_iter()
            .filter(|(rule_id, _)| {
                let skip = self.is_skipped(rule_id);
                if skip {
                    dropped.push(rule_id.clone());
                }
                !skip
            })
            .collect();
        (kept, dropped)
    }

    /// Clears the skip set for a new run.
    pub fn reset(&mut self) {
        self.skipped.clear();
    }
}
