//! The rule registry: ordered rules plus a dispatch table by element kind.

use super::{
    CvMappingRule, ObjectRule, SharedObjectRule, MANDATORY_ELEMENTS_RULE_ID,
    UNANTICIPATED_TERMS_RULE_ID,
};
use crate::core::ElementKind;
use crate::prelude::*;
use serde::Deserialize;
use std::collections::{BTreeSet, HashMap, HashSet};
use std::path::Path;
use std::sync::Arc;
use tracing::{debug, warn};

/// A CV mapping file: the list of CV-mapping rules.
#[derive(Debug, Clone, Deserialize)]
pub struct CvMappingFile {
    /// Rules in file order
    pub rules: Vec<CvMappingRule>,
}

/// Registered Object Rules and CV-Mapping Rules.
///
/// Rules keep their registration order. Lookups by [`ElementKind`] go through
/// an index so a kind with no rules is told apart from a kind whose rules
/// all decline an instance.
#[derive(Debug, Clone, Default)]
pub struct RuleRegistry {
    object_rules: Vec<SharedObjectRule>,
    object_index: HashMap<ElementKind, Vec<usize>>,
    cv_rules: Vec<Arc<CvMappingRule>>,
    cv_index: HashMap<ElementKind, Vec<usize>>,
    unresolved_cv_rules: Vec<usize>,
}

impl RuleRegistry {
    /// Creates a new registry builder.
    pub fn builder() -> RuleRegistryBuilder {
        RuleRegistryBuilder::default()
    }

    /// All object rules in registration order.
    pub fn object_rules(&self) -> &[SharedObjectRule] {
        &self.object_rules
    }

    /// Object rules registered against `kind`.
    pub fn object_rules_for(&self, kind: ElementKind) -> impl Iterator<Item = &SharedObjectRule> {
        self.object_index
            .get(&kind)
            .into_iter()
            .flatten()
            .map(move |&i| &self.object_rules[i])
    }

    /// Whether any object rule is registered against `kind`.
    pub fn has_object_rules_for(&self, kind: ElementKind) -> bool {
        self.object_index.contains_key(&kind)
    }

    /// All CV-mapping rules in registration order.
    pub fn cv_rules(&self) -> &[Arc<CvMappingRule>] {
        &self.cv_rules
    }

    /// CV-mapping rules scoping `kind`.
    pub fn cv_rules_for(&self, kind: ElementKind) -> impl Iterator<Item = &Arc<CvMappingRule>> {
        self.cv_index
            .get(&kind)
            .into_iter()
            .flatten()
            .map(move |&i| &self.cv_rules[i])
    }

    /// Whether any CV-mapping rule scopes `kind`.
    pub fn has_cv_rules_for(&self, kind: ElementKind) -> bool {
        self.cv_index.contains_key(&kind)
    }

    /// CV-mapping rules whose element path matches no known element type.
    pub fn unresolved_cv_rules(&self) -> impl Iterator<Item = &Arc<CvMappingRule>> {
        self.unresolved_cv_rules.iter().map(move |&i| &self.cv_rules[i])
    }

    /// Object rule identifiers in registration order.
    pub fn object_rule_ids(&self) -> Vec<String> {
        self.object_rules.iter().map(|r| r.id().to_string()).collect()
    }

    /// CV-mapping rule identifiers in registration order.
    pub fn cv_rule_ids(&self) -> Vec<String> {
        self.cv_rules.iter().map(|r| r.id.clone()).collect()
    }

    /// Absolute term xpaths covered by at least one CV-mapping rule.
    pub fn covered_term_xpaths(&self) -> HashSet<String> {
        self.cv_rules.iter().map(|r| r.term_xpath()).collect()
    }

    /// Total number of registered rules.
    pub fn len(&self) -> usize {
        self.object_rules.len() + self.cv_rules.len()
    }

    /// Returns true if no rules are registered.
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

/// Builder for [`RuleRegistry`].
///
/// # Examples
///
/// ```rust
/// use mzid_guard::core::ElementKind;
/// use mzid_guard::rules::{
///     CvMappingRule, CvTermSpec, RequiredAttributeRule, RequirementLevel, RuleRegistry,
/// };
///
/// let registry = RuleRegistry::builder()
///     .object_rule(RequiredAttributeRule::new(
///         "PeptideSequenceRule",
///         ElementKind::Peptide,
///         "PeptideSequence",
///     ))
///     .cv_rule(
///         CvMappingRule::new("SD_format", ElementKind::SpectraData, RequirementLevel::Must)
///             .at_term_path("FileFormat/cvParam")
///             .with_term(
///                 CvTermSpec::new("MS:1000560", "mass spectrometer file format")
///                     .allow_children(true),
///             ),
///     )
///     .build()
///     .unwrap();
///
/// assert_eq!(registry.len(), 2);
/// assert!(registry.has_object_rules_for(ElementKind::Peptide));
/// ```
#[derive(Debug, Default)]
pub struct RuleRegistryBuilder {
    object_rules: Vec<SharedObjectRule>,
    cv_rules: Vec<CvMappingRule>,
}

impl RuleRegistryBuilder {
    /// Adds an object rule.
    pub fn object_rule<R: ObjectRule + 'static>(mut self, rule: R) -> Self {
        self.object_rules.push(Arc::new(rule));
        self
    }

    /// Adds an already shared object rule.
    pub fn shared_object_rule(mut self, rule: SharedObjectRule) -> Self {
        self.object_rules.push(rule);
        self
    }

    /// Adds a CV-mapping rule.
    pub fn cv_rule(mut self, rule: CvMappingRule) -> Self {
        self.cv_rules.push(rule);
        self
    }

    /// Adds many CV-mapping rules.
    pub fn cv_rules<I>(mut self, rules: I) -> Self
    where
        I: IntoIterator<Item = CvMappingRule>,
    {
        self.cv_rules.extend(rules);
        self
    }

    /// Adds the rules of a JSON CV mapping file.
    pub fn cv_mapping_json(self, json: &str) -> Result<Self> {
        let file: CvMappingFile = serde_json::from_str(json).map_err(|e| {
            ValidatorError::Configuration(format!("CV mapping file could not be parsed: {e}"))
        })?;
        Ok(self.cv_rules(file.rules))
    }

    /// Reads and adds the rules of a JSON CV mapping file.
    pub fn cv_mapping_path(self, path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let json = std::fs::read_to_string(path).map_err(|e| {
            ValidatorError::Configuration(format!(
                "CV mapping file '{}' could not be read: {e}",
                path.display()
            ))
        })?;
        self.cv_mapping_json(&json)
    }

    /// Validates the rule set and builds the registry.
    ///
    /// # Errors
    ///
    /// Returns [`ValidatorError::Configuration`] for empty or duplicate rule
    /// identifiers, identifiers reserved for the engine's synthetic rules,
    /// and CV-mapping rules without any term.
    pub fn build(self) -> Result<RuleRegistry> {
        let mut seen = BTreeSet::new();
        let ids = self
            .object_rules
            .iter()
            .map(|r| r.id().to_string())
            .chain(self.cv_rules.iter().map(|r| r.id.clone()));
        for id in ids {
            if id.trim().is_empty() {
                return Err(ValidatorError::Configuration(
                    "rule with an empty identifier".to_string(),
                ));
            }
            if id == MANDATORY_ELEMENTS_RULE_ID || id == UNANTICIPATED_TERMS_RULE_ID {
                return Err(ValidatorError::Configuration(format!(
                    "rule identifier '{id}' is reserved"
                )));
            }
            if !seen.insert(id.clone()) {
                return Err(ValidatorError::Configuration(format!(
                    "duplicate rule identifier '{id}'"
                )));
            }
        }
        if let Some(rule) = self.cv_rules.iter().find(|r| r.terms.is_empty()) {
            return Err(ValidatorError::Configuration(format!(
                "CV mapping rule '{}' lists no terms",
                rule.id
            )));
        }

        let mut object_index: HashMap<ElementKind, Vec<usize>> = HashMap::new();
        for (i, rule) in self.object_rules.iter().enumerate() {
            object_index.entry(rule.kind()).or_default().push(i);
        }

        let mut cv_index: HashMap<ElementKind, Vec<usize>> = HashMap::new();
        let mut unresolved_cv_rules = Vec::new();
        for (i, rule) in self.cv_rules.iter().enumerate() {
            match rule.scope_kind() {
                Some(kind) => cv_index.entry(kind).or_default().push(i),
                None => {
                    warn!(
                        rule.id = %rule.id,
                        rule.element_path = %rule.element_path,
                        "CV mapping rule scopes an unknown element path"
                    );
                    unresolved_cv_rules.push(i);
                }
            }
        }

        debug!(
            registry.object_rules = self.object_rules.len(),
            registry.cv_rules = self.cv_rules.len(),
            registry.unresolved_cv_rules = unresolved_cv_rules.len(),
            "Rule registry built"
        );

        Ok(RuleRegistry {
            object_rules: self.object_rules,
            object_index,
            cv_rules: self.cv_rules.into_iter().map(Arc::new).collect(),
            cv_index,
            unresolved_cv_rules,
        })
    }
}
