//! Applying registered rules to one element, and collecting what they say.
//!
//! The serial stages and the worker pool share this code so an element is
//! checked the same way wherever it is validated, and messages are kept
//! under the same severity threshold.

use super::{Element, MessageLevel, RuleContext, ValidatorMessage};
use crate::log_rule;
use crate::logging::{truncate_field, LogConfig};
use crate::rules::RuleRegistry;
use std::collections::BTreeMap;
use tracing::warn;

/// The rule family an execution belongs to.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RuleFamily {
    Object,
    Cv,
}

/// One rule applied to one element.
#[derive(Debug, Clone)]
pub struct RuleExecution {
    pub rule_id: String,
    pub family: RuleFamily,
    /// Every message, before any severity threshold
    pub messages: Vec<ValidatorMessage>,
    /// For CV rules, whether the element carried terms at the rule's path
    pub had_data: bool,
}

impl RuleExecution {
    /// An execution is valid when it produced no message.
    pub fn is_valid(&self) -> bool {
        self.messages.is_empty()
    }
}

/// Object rule executions for one element.
#[derive(Debug, Default)]
pub struct ObjectDispatch {
    pub executions: Vec<RuleExecution>,
    /// Whether at least one registered rule accepted the element
    pub accepted: bool,
}

/// Runs every object rule registered for the element's kind.
///
/// A rule returning an error is logged and contributes nothing.
pub fn check_object_rules(
    registry: &RuleRegistry,
    element: &Element,
    ctx: &RuleContext,
    log: &LogConfig,
) -> ObjectDispatch {
    let mut dispatch = ObjectDispatch::default();
    for rule in registry.object_rules_for(element.kind) {
        if !rule.can_check(element) {
            continue;
        }
        dispatch.accepted = true;
        match rule.check(element, ctx) {
            Ok(messages) => {
                log_rule!(
                    log,
                    rule.id = %rule.id(),
                    element.location = %element.location,
                    messages = messages.len(),
                    "Object rule executed"
                );
                dispatch.executions.push(RuleExecution {
                    rule_id: rule.id().to_string(),
                    family: RuleFamily::Object,
                    messages,
                    had_data: true,
                });
            }
            Err(e) => warn!(
                rule.id = %rule.id(),
                element.location = %element.location,
                error = %truncate_field(&e.to_string(), log.max_field_length),
                "Object rule failed on element"
            ),
        }
    }
    dispatch
}

/// Runs every CV-mapping rule scoping the element's kind.
pub fn check_cv_rules(
    registry: &RuleRegistry,
    element: &Element,
    ctx: &RuleContext,
    log: &LogConfig,
) -> Vec<RuleExecution> {
    let mut executions = Vec::new();
    for rule in registry.cv_rules_for(element.kind) {
        match rule.check(element, ctx.ontology()) {
            Ok(outcome) => {
                log_rule!(
                    log,
                    rule.id = %rule.id,
                    element.location = %element.location,
                    messages = outcome.messages.len(),
                    had_data = outcome.had_data,
                    "CV mapping rule executed"
                );
                executions.push(RuleExecution {
                    rule_id: rule.id.clone(),
                    family: RuleFamily::Cv,
                    messages: outcome.messages,
                    had_data: outcome.had_data,
                });
            }
            Err(e) => warn!(
                rule.id = %rule.id,
                element.location = %element.location,
                error = %truncate_field(&e.to_string(), log.max_field_length),
                "CV mapping rule failed on element"
            ),
        }
    }
    executions
}

/// What the executions of one rule amounted to within a stage.
#[derive(Debug, Clone)]
pub struct RuleTally {
    pub family: RuleFamily,
    /// Messages at or above the run's threshold
    pub messages: Vec<ValidatorMessage>,
    /// Some execution produced no message
    pub seen_valid: bool,
    /// Some execution produced a message
    pub seen_invalid: bool,
    /// Some execution found terms at the rule's path
    pub had_data: bool,
}

impl RuleTally {
    fn new(family: RuleFamily) -> Self {
        Self {
            family,
            messages: Vec::new(),
            seen_valid: false,
            seen_invalid: false,
            had_data: false,
        }
    }

    /// Distinct outcomes observed, valid first.
    pub fn outcomes(&self) -> impl Iterator<Item = bool> {
        [
            self.seen_valid.then_some(true),
            self.seen_invalid.then_some(false),
        ]
        .into_iter()
        .flatten()
    }
}

/// Rule executions of a stage, keyed by rule identifier.
#[derive(Debug, Clone)]
pub struct MessageSink {
    min_level: MessageLevel,
    tallies: BTreeMap<String, RuleTally>,
}

impl MessageSink {
    /// An empty sink keeping messages at or above `min_level`.
    pub fn new(min_level: MessageLevel) -> Self {
        Self {
            min_level,
            tallies: BTreeMap::new(),
        }
    }

    /// Records one execution.
    pub fn record(&mut self, execution: RuleExecution) {
        let min_level = self.min_level;
        let tally = self
            .tallies
            .entry(execution.rule_id)
            .or_insert_with(|| RuleTally::new(execution.family));
        if execution.messages.is_empty() {
            tally.seen_valid = true;
        } else {
            tally.seen_invalid = true;
        }
        tally.had_data |= execution.had_data;
        tally.messages.extend(
            execution
                .messages
                .into_iter()
                .filter(|m| m.level.is_at_least(min_level)),
        );
    }

    pub fn record_all<I>(&mut self, executions: I)
    where
        I: IntoIterator<Item = RuleExecution>,
    {
        for execution in executions {
            self.record(execution);
        }
    }

    /// Number of rules with at least one execution.
    pub fn len(&self) -> usize {
        self.tallies.len()
    }

    pub fn is_empty(&self) -> bool {
        self.tallies.is_empty()
    }

    pub fn get(&self, rule_id: &str) -> Option<&RuleTally> {
        self.tallies.get(rule_id)
    }

    /// Consumes the sink, yielding tallies in rule identifier order.
    pub fn into_tallies(self) -> impl Iterator<Item = (String, RuleTally)> {
        self.tallies.into_iter()
    }
}
