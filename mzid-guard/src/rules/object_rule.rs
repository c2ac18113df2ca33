//! Object rule trait.

use crate::core::{Element, ElementKind, RuleContext, RuleRef, ValidatorMessage};
use crate::prelude::*;
use std::fmt::Debug;
use std::sync::Arc;

/// A rule that inspects one decoded element instance.
///
/// Rules are registered against a single [`ElementKind`]; the registry only
/// offers them elements of that kind. `can_check` lets a rule decline an
/// instance it has nothing to say about. Implementations must be stateless
/// across runs: anything search-wide comes in through the [`RuleContext`].
///
/// # Examples
///
/// ```rust
/// use mzid_guard::core::{Element, ElementKind, MessageLevel, RuleContext, ValidatorMessage};
/// use mzid_guard::rules::ObjectRule;
/// use mzid_guard::prelude::*;
///
/// #[derive(Debug)]
/// struct PeptideSequenceRule;
///
/// impl ObjectRule for PeptideSequenceRule {
///     fn id(&self) -> &str {
///         "PeptideSequenceRule"
///     }
///
///     fn kind(&self) -> ElementKind {
///         ElementKind::Peptide
///     }
///
///     fn check(&self, element: &Element, _ctx: &RuleContext) -> Result<Vec<ValidatorMessage>> {
///         if element.attribute("PeptideSequence").is_some() {
///             return Ok(Vec::new());
///         }
///         Ok(vec![ValidatorMessage::for_rule(
///             self.rule_ref(),
///             "Peptide has no sequence",
///             MessageLevel::Error,
///         )
///         .at(element.location.clone())])
///     }
/// }
/// ```
pub trait ObjectRule: Debug + Send + Sync {
    /// Unique rule identifier.
    fn id(&self) -> &str;

    /// The element kind this rule is registered against.
    fn kind(&self) -> ElementKind;

    /// Whether this rule has anything to say about `element`.
    fn can_check(&self, element: &Element) -> bool {
        element.kind == self.kind()
    }

    /// Checks one element. An empty result means the element passed.
    fn check(&self, element: &Element, ctx: &RuleContext) -> Result<Vec<ValidatorMessage>>;

    /// Remediation hints attached to every message of this rule.
    fn tips(&self) -> &[String] {
        &[]
    }

    /// Reference used as the owner of this rule's messages.
    fn rule_ref(&self) -> RuleRef {
        RuleRef::new(self.id()).with_tips(self.tips().iter().cloned())
    }
}

/// A shared object rule for use in collections.
pub type SharedObjectRule = Arc<dyn ObjectRule>;
