//! Message clustering.
//!
//! A single missing attribute on identification items can produce one
//! message per item. The clusterer merges messages sharing text, owning
//! rule and severity into one [`ClusteredMessage`] listing every location,
//! rendered as `"<first location> in K locations"`.
//!
//! Severity is part of the key, so a rule emitting the same text at two
//! levels yields two clusters.

use crate::core::{MessageLevel, RuleRef, ValidatorMessage};
use serde::{Deserialize, Serialize};
use std::collections::{HashMap, HashSet};
use std::fmt;

/// A group of identical findings and the places they were made.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ClusteredMessage {
    pub message: String,
    pub level: MessageLevel,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub rule: Option<RuleRef>,
    /// Distinct locations in order of first appearance
    pub locations: Vec<String>,
}

impl ClusteredMessage {
    fn from_message(message: ValidatorMessage) -> Self {
        Self {
            locations: message
                .context
                .map(|c| vec![c.location().to_string()])
                .unwrap_or_default(),
            message: message.message,
            level: message.level,
            rule: message.rule,
        }
    }

    pub fn rule_id(&self) -> Option<&str> {
        self.rule.as_ref().map(|r| r.id.as_str())
    }

    /// Number of distinct locations.
    pub fn occurrences(&self) -> usize {
        self.locations.len()
    }

    /// `"<loc>"` for one location, `"<first> in K locations"` for more.
    pub fn render_context(&self) -> Option<String> {
        match self.locations.as_slice() {
            [] => None,
            [only] => Some(only.clone()),
            [first, ..] => Some(format!("{first} in {} locations", self.locations.len())),
        }
    }
}

impl fmt::Display for ClusteredMessage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "[{}] {}", self.level, self.message)?;
        if let Some(context) = self.render_context() {
            write!(f, " ({context})")?;
        }
        Ok(())
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Hash)]
struct ClusterKey {
    message: String,
    rule_id: String,
    level: MessageLevel,
}

struct Cluster {
    message: ClusteredMessage,
    seen: HashSet<String>,
}

/// Merges near-duplicate messages.
///
/// # Examples
///
/// ```rust
/// use mzid_guard::cluster::MessageClusterer;
/// use mzid_guard::core::{MessageLevel, RuleRef, ValidatorMessage};
///
/// let messages = (0..3).map(|i| {
///     ValidatorMessage::for_rule(RuleRef::new("SII_Rule"), "missing m/z", MessageLevel::Error)
///         .at(format!("SII_{i}"))
/// });
/// let clusters = MessageClusterer::cluster(messages);
///
/// assert_eq!(clusters.len(), 1);
/// assert_eq!(clusters[0].render_context().unwrap(), "SII_0 in 3 locations");
/// ```
#[derive(Debug, Default, Clone, Copy)]
pub struct MessageClusterer;

impl MessageClusterer {
    /// Clusters messages.
    ///
    /// Messages without an owning rule come first, verbatim and in arrival
    /// order. Clusters follow, most severe first, then by rule identifier
    /// and text.
    pub fn cluster<I>(messages: I) -> Vec<ClusteredMessage>
    where
        I: IntoIterator<Item = ValidatorMessage>,
    {
        let mut passthrough = Vec::new();
        let mut clusters: HashMap<ClusterKey, Cluster> = HashMap::new();

        for message in messages {
            let Some(rule_id) = message.rule_id().map(str::to_string) else {
                passthrough.push(ClusteredMessage::from_message(message));
                continue;
            };
            let key = ClusterKey {
                message: message.message.clone(),
                rule_id,
                level: message.level,
            };
            let location = message.context.as_ref().map(|c| c.location().to_string());
            let cluster = clusters.entry(key).or_insert_with(|| Cluster {
                message: ClusteredMessage {
                    message: message.message,
                    level: message.level,
                    rule: message.rule,
                    locations: Vec::new(),
                },
                seen: HashSet::new(),
            });
            if let Some(location) = location {
                if cluster.seen.insert(location.clone()) {
                    cluster.message.locations.push(location);
                }
            }
        }

        let mut clustered: Vec<ClusteredMessage> =
            clusters.into_values().map(|c| c.message).collect();
        clustered.sort_by(|a, b| {
            b.level
                .cmp(&a.level)
                .then_with(|| a.rule_id().cmp(&b.rule_id()))
                .then_with(|| a.message.cmp(&b.message))
        });

        passthrough.extend(clustered);
        passthrough
    }
}
