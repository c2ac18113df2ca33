//! A configurable object rule requiring an attribute on an element.

use super::ObjectRule;
use crate::core::{Element, ElementKind, MessageLevel, RuleContext, SearchMode, ValidatorMessage};
use crate::prelude::*;

/// Requires a non-blank attribute on every instance of an element kind.
///
/// The rule stays silent when one of its exempt search modes is active, e.g.
/// peptide evidence references are not expected from a de novo search.
///
/// # Examples
///
/// ```rust
/// use mzid_guard::core::{ElementKind, MessageLevel, SearchMode};
/// use mzid_guard::rules::RequiredAttributeRule;
///
/// let rule = RequiredAttributeRule::new(
///     "SII_Rule",
///     ElementKind::SpectrumIdentificationItem,
///     "calculatedMassToCharge",
/// )
/// .with_level(MessageLevel::Error)
/// .exempt_in(SearchMode::DeNovo)
/// .with_tip("Report the theoretical m/z of the identified peptide");
/// ```
#[derive(Debug, Clone)]
pub struct RequiredAttributeRule {
    id: String,
    kind: ElementKind,
    attribute: String,
    level: MessageLevel,
    exempt_modes: Vec<SearchMode>,
    tips: Vec<String>,
}

impl RequiredAttributeRule {
    /// Creates a rule raising errors for a missing attribute.
    pub fn new(id: impl Into<String>, kind: ElementKind, attribute: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            kind,
            attribute: attribute.into(),
            level: MessageLevel::Error,
            exempt_modes: Vec::new(),
            tips: Vec::new(),
        }
    }

    /// Sets the severity of the raised message.
    pub fn with_level(mut self, level: MessageLevel) -> Self {
        self.level = level;
        self
    }

    /// Silences the rule when `mode` is active.
    pub fn exempt_in(mut self, mode: SearchMode) -> Self {
        self.exempt_modes.push(mode);
        self
    }

    /// Adds a remediation hint.
    pub fn with_tip(mut self, tip: impl Into<String>) -> Self {
        self.tips.push(tip.into());
        self
    }

    /// The required attribute.
    pub fn attribute(&self) -> &str {
        &self.attribute
    }
}

impl ObjectRule for RequiredAttributeRule {
    fn id(&self) -> &str {
        &self.id
    }

    fn kind(&self) -> ElementKind {
        self.kind
    }

    fn check(&self, element: &Element, ctx: &RuleContext) -> Result<Vec<ValidatorMessage>> {
        if self.exempt_modes.iter().any(|mode| ctx.search().is(*mode)) {
            return Ok(Vec::new());
        }
        let present = element
            .attribute(&self.attribute)
            .is_some_and(|value| !value.trim().is_empty());
        if present {
            return Ok(Vec::new());
        }
        Ok(vec![ValidatorMessage::for_rule(
            self.rule_ref(),
            format!("{} is missing {}", self.kind, self.attribute),
            self.level,
        )
        .at(element.location.clone())])
    }

    fn tips(&self) -> &[String] {
        &self.tips
    }
}
