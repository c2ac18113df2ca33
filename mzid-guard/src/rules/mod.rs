//! Validation rules and the registry that dispatches them.
//!
//! Two kinds of rule exist. [`ObjectRule`]s are code: each inspects one
//! decoded element of a single [`ElementKind`](crate::core::ElementKind).
//! [`CvMappingRule`]s are data: each states which controlled-vocabulary
//! terms annotate a place in the document. Both are registered in a
//! [`RuleRegistry`] and looked up by element kind.

mod attribute;
mod cv_mapping;
mod object_rule;
mod registry;

pub use attribute::RequiredAttributeRule;
pub use cv_mapping::{
    CombinationLogic, CvCheckOutcome, CvMappingRule, CvTermSpec, RequirementLevel,
};
pub use object_rule::{ObjectRule, SharedObjectRule};
pub use registry::{CvMappingFile, RuleRegistry, RuleRegistryBuilder};

/// Owner of the errors raised for missing mandatory elements.
pub const MANDATORY_ELEMENTS_RULE_ID: &str = "MandatoryElementsObjectRule";

/// Owner of the warnings raised for CV terms no mapping rule covers.
pub const UNANTICIPATED_TERMS_RULE_ID: &str = "UnanticipatedCvTermsRule";
