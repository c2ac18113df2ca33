//! Per-rule outcome bookkeeping for one run.
//!
//! Every Object Rule sits in exactly one of the not-checked, valid and
//! invalid buckets; every CV-mapping rule likewise, with an additional
//! xpath-health classification (`invalid_xpath`, `valid_xpath_no_data`)
//! that is independent from its outcome.
//!
//! Transitions are one-way except for skips:
//!
//! ```text
//! not-checked --0 messages--> valid --≥1 message--> invalid
//!      \______________≥1 message_________________/
//! any --skip--> not-checked
//! ```

use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;
use tracing::debug;

/// Snapshot of the rule buckets of a run.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ExtendedReport {
    pub object_rules_not_checked: BTreeSet<String>,
    pub object_rules_valid: BTreeSet<String>,
    pub object_rules_invalid: BTreeSet<String>,
    pub cv_rules_not_checked: BTreeSet<String>,
    pub cv_rules_valid: BTreeSet<String>,
    pub cv_rules_invalid: BTreeSet<String>,
    /// CV rules whose element path matches no known element type
    pub cv_rules_invalid_xpath: BTreeSet<String>,
    /// CV rules whose path is valid but where no element carried terms
    pub cv_rules_valid_xpath_no_data: BTreeSet<String>,
    /// Rendered schema defects
    pub schema_defects: BTreeSet<String>,
}

impl ExtendedReport {
    /// Number of object rules across all buckets.
    pub fn object_rule_count(&self) -> usize {
        self.object_rules_not_checked.len()
            + self.object_rules_valid.len()
            + self.object_rules_invalid.len()
    }

    /// Number of CV rules across all buckets.
    pub fn cv_rule_count(&self) -> usize {
        self.cv_rules_not_checked.len() + self.cv_rules_valid.len() + self.cv_rules_invalid.len()
    }

    /// Whether no rule occupies two outcome buckets of the same axis.
    pub fn is_disjoint(&self) -> bool {
        let object = [
            &self.object_rules_not_checked,
            &self.object_rules_valid,
            &self.object_rules_invalid,
        ];
        let cv = [&self.cv_rules_not_checked, &self.cv_rules_valid, &self.cv_rules_invalid];
        pairwise_disjoint(&object)
            && pairwise_disjoint(&cv)
            && self.cv_rules_invalid_xpath.is_disjoint(&self.cv_rules_valid_xpath_no_data)
    }

    /// Whether any rule was found invalid or the schema reported defects.
    pub fn has_failures(&self) -> bool {
        !self.object_rules_invalid.is_empty()
            || !self.cv_rules_invalid.is_empty()
            || !self.schema_defects.is_empty()
    }
}

fn pairwise_disjoint(sets: &[&BTreeSet<String>]) -> bool {
    sets.iter().enumerate().all(|(i, a)| sets[i + 1..].iter().all(|b| a.is_disjoint(b)))
}

/// Which rule family an identifier belongs to.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Axis {
    Object,
    Cv,
}

/// Maintains the [`ExtendedReport`] of a run.
#[derive(Debug, Clone, Default)]
pub struct ReportAggregator {
    object_ids: BTreeSet<String>,
    cv_ids: BTreeSet<String>,
    cv_with_data: BTreeSet<String>,
    report: ExtendedReport,
}

impl ReportAggregator {
    /// Creates an aggregator with every rule not checked.
    pub fn new<O, C>(object_ids: O, cv_ids: C) -> Self
    where
        O: IntoIterator<Item = String>,
        C: IntoIterator<Item = String>,
    {
        let mut aggregator = Self {
            object_ids: object_ids.into_iter().collect(),
            cv_ids: cv_ids.into_iter().collect(),
            ..Self::default()
        };
        aggregator.reset();
        aggregator
    }

    fn axis(&self, rule_id: &str) -> Option<Axis> {
        if self.object_ids.contains(rule_id) {
            Some(Axis::Object)
        } else if self.cv_ids.contains(rule_id) {
            Some(Axis::Cv)
        } else {
            None
        }
    }

    fn buckets(&mut self, axis: Axis) -> [&mut BTreeSet<String>; 3] {
        let r = &mut self.report;
        match axis {
            Axis::Object => [
                &mut r.object_rules_not_checked,
                &mut r.object_rules_valid,
                &mut r.object_rules_invalid,
            ],
            Axis::Cv => [
                &mut r.cv_rules_not_checked,
                &mut r.cv_rules_valid,
                &mut r.cv_rules_invalid,
            ],
        }
    }

    /// Records one execution of a rule.
    ///
    /// `valid` is true when the execution produced no message. Unknown
    /// identifiers are ignored.
    pub fn record_execution(&mut self, rule_id: &str, valid: bool) {
        let Some(axis) = self.axis(rule_id) else {
            debug!(rule.id = %rule_id, "Outcome for unregistered rule ignored");
            return;
        };
        let [not_checked, valid_set, invalid] = self.buckets(axis);
        if invalid.contains(rule_id) {
            return;
        }
        if valid {
            if not_checked.remove(rule_id) {
                valid_set.insert(rule_id.to_string());
            }
        } else {
            not_checked.remove(rule_id);
            valid_set.remove(rule_id);
            invalid.insert(rule_id.to_string());
        }
    }

    /// Records that a CV rule found terms on at least one element.
    pub fn record_cv_data(&mut self, rule_id: &str) {
        self.cv_with_data.insert(rule_id.to_string());
        self.report.cv_rules_valid_xpath_no_data.remove(rule_id);
    }

    /// Marks a CV rule whose element path does not resolve.
    pub fn mark_invalid_xpath(&mut self, rule_id: &str) {
        if self.cv_ids.contains(rule_id) {
            self.report
                .cv_rules_invalid_xpath
                .insert(rule_id.to_string());
        }
    }

    /// Classifies the resolved CV rules that never saw data.
    pub fn close_cv_stage<'a, I>(&mut self, resolved_ids: I)
    where
        I: IntoIterator<Item = &'a str>,
    {
        for id in resolved_ids {
            if self.cv_ids.contains(id)
                && !self.cv_with_data.contains(id)
                && !self.report.cv_rules_invalid_xpath.contains(id)
            {
                self.report
                    .cv_rules_valid_xpath_no_data
                    .insert(id.to_string());
            }
        }
    }

    /// Forces a rule back to not-checked, whatever its state.
    pub fn mark_skipped(&mut self, rule_id: &str) {
        let Some(axis) = self.axis(rule_id) else {
            return;
        };
        let [not_checked, valid, invalid] = self.buckets(axis);
        valid.remove(rule_id);
        invalid.remove(rule_id);
        not_checked.insert(rule_id.to_string());
    }

    /// Records a rendered schema defect.
    pub fn add_schema_defect(&mut self, defect: impl Into<String>) {
        self.report.schema_defects.insert(defect.into());
    }

    /// Current snapshot.
    pub fn report(&self) -> &ExtendedReport {
        &self.report
    }

    /// Puts every rule back to not-checked and forgets all findings.
    pub fn reset(&mut self) {
        self.cv_with_data.clear();
        self.report = ExtendedReport {
            object_rules_not_checked: self.object_ids.clone(),
            cv_rules_not_checked: self.cv_ids.clone(),
            ..ExtendedReport::default()
        };
    }
}
