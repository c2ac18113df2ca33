//! CV-mapping rules.
//!
//! A CV-mapping rule states which controlled-vocabulary terms must, should or
//! may annotate a given place in the document. Rules are pure data, loaded
//! from a mapping file, and evaluated by [`CvMappingRule::check`].
//!
//! ## Evaluation
//!
//! For one element the rule looks at the CV parameters found at its
//! `term_path`:
//!
//! - no parameters: a `MUST` rule reports an error, a `SHOULD` rule a warning,
//!   a `MAY` rule nothing (and the element counts as "no data");
//! - otherwise each allowed term is matched against the parameters (itself
//!   when `use_term`, any descendant when `allow_children`) and the
//!   combination logic (`OR`, `AND`, `XOR`) decides whether the rule is
//!   satisfied;
//! - a non-repeatable term matched more than once is always an error.

use crate::core::{
    CvParam, Element, ElementKind, MessageLevel, OntologyService, RuleRef, ValidatorMessage,
};
use crate::prelude::*;
use once_cell::sync::OnceCell;
use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;
use std::fmt;

/// How strongly a rule demands its terms.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum RequirementLevel {
    May,
    Should,
    Must,
}

impl RequirementLevel {
    /// Severity of messages raised by a rule at this requirement level.
    pub fn message_level(&self) -> MessageLevel {
        match self {
            RequirementLevel::May => MessageLevel::Info,
            RequirementLevel::Should => MessageLevel::Warn,
            RequirementLevel::Must => MessageLevel::Error,
        }
    }
}

impl fmt::Display for RequirementLevel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            RequirementLevel::May => f.write_str("MAY"),
            RequirementLevel::Should => f.write_str("SHOULD"),
            RequirementLevel::Must => f.write_str("MUST"),
        }
    }
}

/// How the allowed terms of a rule combine.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum CombinationLogic {
    #[default]
    Or,
    And,
    Xor,
}

impl fmt::Display for CombinationLogic {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            CombinationLogic::Or => f.write_str("at least one"),
            CombinationLogic::And => f.write_str("all"),
            CombinationLogic::Xor => f.write_str("exactly one"),
        }
    }
}

fn default_true() -> bool {
    true
}

fn default_cv_ref() -> String {
    "PSI-MS".to_string()
}

fn default_term_path() -> String {
    "cvParam".to_string()
}

/// One allowed term of a CV-mapping rule.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CvTermSpec {
    /// Term accession
    pub accession: String,
    /// Term name, for messages
    #[serde(default)]
    pub name: String,
    /// Ontology the term lives in
    #[serde(default = "default_cv_ref")]
    pub cv_ref: String,
    /// Whether the term itself is acceptable
    #[serde(default = "default_true")]
    pub use_term: bool,
    /// Whether descendants of the term are acceptable
    #[serde(default)]
    pub allow_children: bool,
    /// Whether the term may appear more than once per element
    #[serde(default = "default_true")]
    pub repeatable: bool,
}

impl CvTermSpec {
    /// A PSI-MS term usable as-is.
    pub fn new(accession: impl Into<String>, name: impl Into<String>) -> Self {
        Self {
            accession: accession.into(),
            name: name.into(),
            cv_ref: default_cv_ref(),
            use_term: true,
            allow_children: false,
            repeatable: true,
        }
    }

    /// Accept descendants of the term.
    pub fn allow_children(mut self, allow: bool) -> Self {
        self.allow_children = allow;
        self
    }

    /// Accept the term itself.
    pub fn use_term(mut self, use_term: bool) -> Self {
        self.use_term = use_term;
        self
    }

    /// Whether the term may be repeated within one element.
    pub fn repeatable(mut self, repeatable: bool) -> Self {
        self.repeatable = repeatable;
        self
    }

    /// Sets the ontology reference.
    pub fn with_cv_ref(mut self, cv_ref: impl Into<String>) -> Self {
        self.cv_ref = cv_ref.into();
        self
    }
}

impl fmt::Display for CvTermSpec {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.name.is_empty() {
            write!(f, "{}", self.accession)?;
        } else {
            write!(f, "{} ({})", self.accession, self.name)?;
        }
        if self.allow_children {
            f.write_str(if self.use_term {
                " or its children"
            } else {
                " children"
            })?;
        }
        Ok(())
    }
}

/// Result of checking one element against a CV-mapping rule.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct CvCheckOutcome {
    /// Findings for this element
    pub messages: Vec<ValidatorMessage>,
    /// Whether the element had any CV parameters at the rule's term path
    pub had_data: bool,
}

/// A controlled-vocabulary mapping rule.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CvMappingRule {
    /// Unique rule identifier
    pub id: String,
    /// Canonical xpath of the element the rule scopes
    pub element_path: String,
    /// Path of the annotated `cvParam` nodes relative to the element
    #[serde(default = "default_term_path")]
    pub term_path: String,
    /// How strongly the terms are demanded
    pub requirement: RequirementLevel,
    /// How the allowed terms combine
    #[serde(default)]
    pub combination: CombinationLogic,
    /// Allowed terms
    pub terms: Vec<CvTermSpec>,
    /// Remediation hints
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub tips: Vec<String>,
    #[serde(skip)]
    allowed: OnceCell<Vec<BTreeSet<String>>>,
}

impl CvMappingRule {
    /// Creates a rule scoping `kind` with no terms yet.
    pub fn new(id: impl Into<String>, kind: ElementKind, requirement: RequirementLevel) -> Self {
        Self::for_path(id, kind.xpath(), requirement)
    }

    /// Creates a rule scoping an arbitrary element path.
    pub fn for_path(
        id: impl Into<String>,
        element_path: impl Into<String>,
        requirement: RequirementLevel,
    ) -> Self {
        Self {
            id: id.into(),
            element_path: element_path.into(),
            term_path: default_term_path(),
            requirement,
            combination: CombinationLogic::default(),
            terms: Vec::new(),
            tips: Vec::new(),
            allowed: OnceCell::new(),
        }
    }

    /// Sets the relative path of the annotated `cvParam` nodes.
    pub fn at_term_path(mut self, term_path: impl Into<String>) -> Self {
        self.term_path = term_path.into();
        self
    }

    /// Sets the combination logic.
    pub fn with_combination(mut self, combination: CombinationLogic) -> Self {
        self.combination = combination;
        self
    }

    /// Adds an allowed term.
    pub fn with_term(mut self, term: CvTermSpec) -> Self {
        self.terms.push(term);
        self.allowed = OnceCell::new();
        self
    }

    /// Adds a remediation hint.
    pub fn with_tip(mut self, tip: impl Into<String>) -> Self {
        self.tips.push(tip.into());
        self
    }

    /// The element kind the rule scopes, or `None` for an xpath the document
    /// model does not know.
    pub fn scope_kind(&self) -> Option<ElementKind> {
        ElementKind::from_xpath(&self.element_path)
    }

    /// Absolute xpath of the annotated `cvParam` nodes.
    pub fn term_xpath(&self) -> String {
        format!(
            "{}/{}",
            self.element_path.trim_end_matches('/'),
            self.term_path
        )
    }

    /// Reference used as the owner of this rule's messages.
    pub fn rule_ref(&self) -> RuleRef {
        RuleRef::new(self.id.clone()).with_tips(self.tips.iter().cloned())
    }

    fn describe_terms(&self) -> String {
        let terms: Vec<String> = self.terms.iter().map(ToString::to_string).collect();
        format!("[{}]", terms.join(", "))
    }

    fn allowed_sets(&self, ontology: &dyn OntologyService) -> Result<&Vec<BTreeSet<String>>> {
        self.allowed.get_or_try_init(|| {
            self.terms
                .iter()
                .map(|term| {
                    let mut allowed = if term.allow_children {
                        ontology.descendants(&term.cv_ref, &term.accession)?
                    } else {
                        BTreeSet::new()
                    };
                    if term.use_term {
                        allowed.insert(term.accession.clone());
                    }
                    Ok::<_, ValidatorError>(allowed)
                })
                .collect()
        })
    }

    /// Checks the CV parameters of one element.
    pub fn check(
        &self,
        element: &Element,
        ontology: &dyn OntologyService,
    ) -> Result<CvCheckOutcome> {
        let params: Vec<&CvParam> = element.cv_params_at(&self.term_path).collect();
        let level = self.requirement.message_level();
        let path = self.term_xpath();
        let mut outcome = CvCheckOutcome {
            messages: Vec::new(),
            had_data: !params.is_empty(),
        };

        if params.is_empty() {
            if self.requirement != RequirementLevel::May {
                outcome.messages.push(
                    ValidatorMessage::for_rule(
                        self.rule_ref(),
                        format!(
                            "No CV term found at '{path}': it {} contain {} of {}",
                            self.requirement,
                            self.combination,
                            self.describe_terms()
                        ),
                        level,
                    )
                    .at(element.location.clone()),
                );
            }
            return Ok(outcome);
        }

        let allowed = self.allowed_sets(ontology)?;
        let counts: Vec<usize> = allowed
            .iter()
            .map(|set| params.iter().filter(|p| set.contains(&p.accession)).count())
            .collect();
        let matched = counts.iter().filter(|&&c| c > 0).count();
        let satisfied = match self.combination {
            CombinationLogic::Or => matched >= 1,
            CombinationLogic::And => matched == self.terms.len(),
            CombinationLogic::Xor => matched == 1,
        };

        if !satisfied {
            outcome.messages.push(
                ValidatorMessage::for_rule(
                    self.rule_ref(),
                    format!(
                        "CV terms at '{path}' do not satisfy the rule: it {} contain {} of {}",
                        self.requirement,
                        self.combination,
                        self.describe_terms()
                    ),
                    level,
                )
                .at(element.location.clone()),
            );
        }

        for (term, count) in self.terms.iter().zip(&counts) {
            if !term.repeatable && *count > 1 {
                outcome.messages.push(
                    ValidatorMessage::for_rule(
                        self.rule_ref(),
                        format!(
                            "CV term {term} is not repeatable but appears more than once at '{path}'"
                        ),
                        MessageLevel::Error,
                    )
                    .at(element.location.clone()),
                );
            }
        }

        Ok(outcome)
    }
}
