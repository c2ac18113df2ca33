//! Error types for the mzid-guard validation engine.
//!
//! All fallible operations in the crate return [`ValidatorError`] through the
//! [`Result`] alias. Element-level rule failures never surface here: the
//! orchestrator catches them per element. Only configuration and stage-level
//! faults reach the caller.

use thiserror::Error;

/// The main error type for mzid-guard.
#[derive(Error, Debug)]
pub enum ValidatorError {
    /// Rule definitions or validator settings are inconsistent.
    #[error("Configuration error: {0}")]
    Configuration(String),

    /// The rule filter file could not be loaded.
    #[error("Rule filter error: {message}")]
    RuleFilter {
        /// Human-readable error message
        message: String,
        /// Optional underlying error
        #[source]
        source: Option<Box<dyn std::error::Error + Send + Sync>>,
    },

    /// The document accessor failed to produce elements.
    #[error("Document access error: {message}")]
    Document {
        /// Human-readable error message
        message: String,
        /// Optional underlying error
        #[source]
        source: Option<Box<dyn std::error::Error + Send + Sync>>,
    },

    /// The schema validator could not run (e.g. the schema failed to load).
    #[error("Schema validation error: {message}")]
    SchemaValidation {
        /// Human-readable error message
        message: String,
        /// Optional underlying error
        #[source]
        source: Option<Box<dyn std::error::Error + Send + Sync>>,
    },

    /// A rule failed while checking an element.
    #[error("Rule '{rule}' failed: {message}")]
    RuleExecution {
        /// Identifier of the rule that failed
        rule: String,
        /// Detailed error message
        message: String,
    },

    /// Error from I/O operations.
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// Error from serialization/deserialization operations.
    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    /// Generic internal error for unexpected conditions.
    #[error("Internal error: {0}")]
    Internal(String),
}

/// A type alias for `Result<T, ValidatorError>`.
pub type Result<T> = std::result::Result<T, ValidatorError>;

impl ValidatorError {
    /// Creates a new rule filter error.
    pub fn rule_filter(message: impl Into<String>) -> Self {
        Self::RuleFilter {
            message: message.into(),
            source: None,
        }
    }

    /// Creates a new rule filter error with a source error.
    pub fn rule_filter_with_source(
        message: impl Into<String>,
        source: Box<dyn std::error::Error + Send + Sync>,
    ) -> Self {
        Self::RuleFilter {
            message: message.into(),
            source: Some(source),
        }
    }

    /// Creates a new document access error.
    pub fn document(message: impl Into<String>) -> Self {
        Self::Document {
            message: message.into(),
            source: None,
        }
    }

    /// Creates a new document access error with a source error.
    pub fn document_with_source(
        message: impl Into<String>,
        source: Box<dyn std::error::Error + Send + Sync>,
    ) -> Self {
        Self::Document {
            message: message.into(),
            source: Some(source),
        }
    }

    /// Creates a new schema validation error with a source error.
    pub fn schema_with_source(
        message: impl Into<String>,
        source: Box<dyn std::error::Error + Send + Sync>,
    ) -> Self {
        Self::SchemaValidation {
            message: message.into(),
            source: Some(source),
        }
    }

    /// Creates a new rule execution error.
    pub fn rule_execution(rule: impl Into<String>, message: impl Into<String>) -> Self {
        Self::RuleExecution {
            rule: rule.into(),
            message: message.into(),
        }
    }
}
