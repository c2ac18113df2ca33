//! The schema validation seam.

use super::{DocumentAccessor, MessageLevel};
use crate::prelude::*;
use serde::{Deserialize, Serialize};
use std::fmt;

/// One schema non-compliance found in the document.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SchemaDefect {
    /// Line in the source document, when known
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub line: Option<u64>,
    /// Severity reported by the schema validator
    pub level: MessageLevel,
    /// Defect description
    pub message: String,
}

impl SchemaDefect {
    /// Creates a defect at an optional line.
    pub fn new(line: Option<u64>, level: MessageLevel, message: impl Into<String>) -> Self {
        Self {
            line,
            level,
            message: message.into(),
        }
    }
}

impl fmt::Display for SchemaDefect {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.line {
            Some(line) => write!(f, "line {line}: {}", self.message),
            None => f.write_str(&self.message),
        }
    }
}

/// Validates a document against a compiled schema.
///
/// `Ok(vec![])` means the document is schema-compliant. `Err` is reserved
/// for the validator itself being unusable (e.g. the schema could not be
/// loaded); that error aborts the run.
pub trait SchemaValidator: Send + Sync {
    fn validate(&self, document: &dyn DocumentAccessor) -> Result<Vec<SchemaDefect>>;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defect_display() {
        let defect = SchemaDefect::new(Some(42), MessageLevel::Error, "element 'Foo' not allowed");
        assert_eq!(defect.to_string(), "line 42: element 'Foo' not allowed");

        let unlocated = SchemaDefect::new(None, MessageLevel::Warn, "namespace missing");
        assert_eq!(unlocated.to_string(), "namespace missing");
    }
}
