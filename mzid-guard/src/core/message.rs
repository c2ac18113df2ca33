//! Validator messages and their locations.

use super::MessageLevel;
use serde::{Deserialize, Serialize};
use std::fmt;

/// A location descriptor attached to a message, typically an xpath to the
/// offending element instance.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Context {
    location: String,
}

impl Context {
    /// Creates a context for the given location.
    pub fn new(location: impl Into<String>) -> Self {
        Self {
            location: location.into(),
        }
    }

    /// Returns the location string.
    pub fn location(&self) -> &str {
        &self.location
    }
}

impl fmt::Display for Context {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.location)
    }
}

/// The rule that produced a message.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct RuleRef {
    /// Unique rule identifier
    pub id: String,
    /// Remediation hints shown next to the message
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub tips: Vec<String>,
}

impl RuleRef {
    /// Creates a rule reference without tips.
    pub fn new(id: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            tips: Vec::new(),
        }
    }

    /// Attaches remediation tips.
    pub fn with_tips<I, S>(mut self, tips: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.tips = tips.into_iter().map(Into::into).collect();
        self
    }
}

/// A single finding produced during validation.
///
/// Messages with an owning rule take part in rule filtering and clustering.
/// Messages without one (schema defects, structural faults) are passed
/// through verbatim.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ValidatorMessage {
    /// Message text
    pub message: String,
    /// Severity of the finding
    pub level: MessageLevel,
    /// Rule that produced the message, if any
    #[serde(skip_serializing_if = "Option::is_none")]
    pub rule: Option<RuleRef>,
    /// Where in the document the finding applies
    #[serde(skip_serializing_if = "Option::is_none")]
    pub context: Option<Context>,
}

impl ValidatorMessage {
    /// Creates a message without rule or context.
    pub fn new(message: impl Into<String>, level: MessageLevel) -> Self {
        Self {
            message: message.into(),
            level,
            rule: None,
            context: None,
        }
    }

    /// Creates a message owned by a rule.
    pub fn for_rule(rule: RuleRef, message: impl Into<String>, level: MessageLevel) -> Self {
        Self {
            message: message.into(),
            level,
            rule: Some(rule),
            context: None,
        }
    }

    /// Sets the location of the message.
    pub fn at(mut self, location: impl Into<String>) -> Self {
        self.context = Some(Context::new(location));
        self
    }

    /// Returns the owning rule id, if any.
    pub fn rule_id(&self) -> Option<&str> {
        self.rule.as_ref().map(|r| r.id.as_str())
    }
}

impl fmt::Display for ValidatorMessage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "[{}] {}", self.level, self.message)?;
        if let Some(ctx) = &self.context {
            write!(f, " ({ctx})")?;
        }
        Ok(())
    }
}
