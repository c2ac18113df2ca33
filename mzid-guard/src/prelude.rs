//! Prelude for commonly used types and traits in mzid-guard.

pub use crate::cluster::ClusteredMessage;
pub use crate::core::{
    DocumentAccessor, MessageLevel, MzIdentValidator, OntologyService, SchemaValidator,
    ValidatorConfig, ValidatorMessage,
};
pub use crate::error::{Result, ValidatorError};
pub use crate::filter::{RuleFilterSpec, SelectedOptions};
pub use crate::formatters::{FormatterConfig, ResultFormatter};
pub use crate::logging::LogConfig;
pub use crate::rules::{ObjectRule, RuleRegistry};
