//! Core types of the mzIdentML validation engine.
//!
//! ## Overview
//!
//! - **[`MzIdentValidator`]**: the orchestrator running the validation pipeline
//! - **[`DocumentAccessor`]**, **[`SchemaValidator`]**, **[`OntologyService`]**:
//!   the seams to document decoding, schema validation and ontology lookup
//! - **[`Element`]** / **[`ElementKind`]**: decoded element instances and the
//!   tag rules are dispatched on
//! - **[`ValidatorMessage`]** / **[`MessageLevel`]**: findings and their severity
//! - **[`ExtendedReport`]**: per-rule outcome buckets of a run
//! - **[`ConcurrentElementValidator`]**: the worker pool for the
//!   high-cardinality element kind
//!
//! ## Architecture
//!
//! ```text
//! MzIdentValidator::run
//!     ├── structural pre-check ──────────── FATAL, stop
//!     ├── SchemaValidator
//!     ├── CV mapping self-check ─────────── OntologyService
//!     ├── mandatory elements
//!     ├── object rules        ┐
//!     ├── CV mapping rules    ├─ RuleRegistry ── RuleFilterResolver
//!     │   └── ConcurrentElementValidator (N workers)
//!     ├── unanticipated CV terms
//!     └── skip filtering ── MessageClusterer
//! ```

mod concurrent;
mod config;
mod dispatch;
mod document;
mod element;
mod level;
mod message;
mod ontology;
mod report;
mod rule_context;
mod schema;
mod validator;

pub use concurrent::{ConcurrentElementValidator, ConcurrentOutcome, ElementCursor};
pub use config::ValidatorConfig;
pub use dispatch::{MessageSink, RuleExecution, RuleFamily, RuleTally};
pub use document::{DocumentAccessor, DocumentRoot, InMemoryDocument};
pub use element::{CvParam, Element, ElementKind, SchemaVersion};
pub use level::MessageLevel;
pub use message::{Context, RuleRef, ValidatorMessage};
pub use ontology::{InMemoryOntology, OntologyService};
pub use report::{ExtendedReport, ReportAggregator};
pub use rule_context::{RuleContext, SearchCharacteristics, SearchMode};
pub use schema::{SchemaDefect, SchemaValidator};
pub use validator::{MzIdentValidator, MzIdentValidatorBuilder, RunStats, RunSummary};
