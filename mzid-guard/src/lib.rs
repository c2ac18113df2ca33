//! # mzid-guard - mzIdentML validation for Rust
//!
//! mzid-guard validates mzIdentML proteomics identification documents
//! against three independent rule layers: the XML schema, coded per-element
//! Object Rules, and controlled-vocabulary (CV) mapping rules. Findings are
//! filtered by what the user says about the search and clustered so that a
//! defect repeated on 100,000 identification items is reported once.
//!
//! ## Quick Start
//!
//! ```rust
//! use mzid_guard::prelude::*;
//! use mzid_guard::core::{CvParam, DocumentRoot, Element, ElementKind, InMemoryDocument};
//! use mzid_guard::rules::{CvMappingRule, CvTermSpec, RequiredAttributeRule, RequirementLevel};
//!
//! # async fn example() -> Result<()> {
//! let rules = RuleRegistry::builder()
//!     .object_rule(RequiredAttributeRule::new(
//!         "SII_Rule",
//!         ElementKind::SpectrumIdentificationItem,
//!         "calculatedMassToCharge",
//!     ))
//!     .cv_rule(
//!         CvMappingRule::new(
//!             "SII_qvalue",
//!             ElementKind::SpectrumIdentificationItem,
//!             RequirementLevel::Should,
//!         )
//!         .with_term(CvTermSpec::new("MS:1002354", "PSM-level q-value")),
//!     );
//!
//! let mut validator = MzIdentValidator::builder(rules)
//!     .config(ValidatorConfig::lenient().with_mandatory_elements([]))
//!     .build()?;
//!
//! let document = InMemoryDocument::new(DocumentRoot::mzidentml("1.2.0")).with_elements(
//!     (0..1000).map(|i| {
//!         Element::new(ElementKind::SpectrumIdentificationItem)
//!             .with_id(format!("SII_{i}"))
//!             .with_cv_param(CvParam::new("MS:1002354", "PSM-level q-value").with_value("0.01"))
//!     }),
//! );
//!
//! let messages = validator
//!     .run(&document, &SelectedOptions::new(), MessageLevel::Warn)
//!     .await?;
//!
//! // one cluster for 1000 items missing their m/z
//! assert_eq!(messages.len(), 1);
//! assert!(messages[0].render_context().unwrap().ends_with("in 1000 locations"));
//! # Ok(())
//! # }
//! ```
//!
//! ## Pipeline
//!
//! [`MzIdentValidator::run`](core::MzIdentValidator::run) runs, in order: a
//! structural pre-check, optional schema validation, an optional
//! self-consistency check of the CV mapping rules, the mandatory element
//! check, the Object Rules, the CV-mapping rules (identification items on a
//! worker pool) and a scan for CV terms no rule anticipated.
//!
//! ## Rule filtering
//!
//! A [`RuleFilterSpec`](filter::RuleFilterSpec) maps answers such as
//! "no decoy database was searched" to rules whose findings are irrelevant,
//! and rule outcomes to dependent rules. Skipped rules are reported as not
//! checked.
//!
//! ## Logging
//!
//! The crate logs through `tracing`. Install a subscriber with
//! [`logging::setup::init_logging`] or your own.

pub mod cluster;
pub mod core;
pub mod error;
pub mod filter;
pub mod formatters;
pub mod logging;
pub mod prelude;
pub mod rules;
