//! Validator configuration.

use super::{ElementKind, SearchMode};
use crate::logging::LogConfig;
use crate::prelude::*;
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, BTreeSet};
use std::path::Path;

/// Terms that legitimately appear at unmapped paths in a search mode.
fn default_unmapped_terms() -> BTreeMap<SearchMode, BTreeSet<String>> {
    let mut terms = BTreeMap::new();
    terms.insert(
        SearchMode::CrossLinking,
        ["MS:1002509", "MS:1002510", "MS:1002511"]
            .into_iter()
            .map(String::from)
            .collect(),
    );
    terms.insert(
        SearchMode::Proteogenomics,
        ["MS:1002637", "MS:1002638", "MS:1002644"]
            .into_iter()
            .map(String::from)
            .collect(),
    );
    terms
}

fn default_mandatory_elements() -> Vec<ElementKind> {
    vec![
        ElementKind::Cv,
        ElementKind::SpectrumIdentificationProtocol,
        ElementKind::SpectrumIdentification,
        ElementKind::SearchDatabase,
        ElementKind::SpectraData,
        ElementKind::SpectrumIdentificationList,
    ]
}

fn default_concurrent_kind() -> Option<ElementKind> {
    Some(ElementKind::SpectrumIdentificationItem)
}

fn default_true() -> bool {
    true
}

/// Settings of a [`MzIdentValidator`](super::MzIdentValidator).
///
/// # Examples
///
/// ```rust
/// use mzid_guard::core::{ElementKind, ValidatorConfig};
///
/// let config = ValidatorConfig::strict()
///     .with_worker_count(4)
///     .with_mandatory_elements([ElementKind::Cv, ElementKind::SpectraData]);
/// assert!(config.schema_validation);
/// assert_eq!(config.worker_count, Some(4));
/// ```
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ValidatorConfig {
    /// Run the schema validator
    #[serde(default = "default_true")]
    pub schema_validation: bool,
    /// Check the CV-mapping rules against the ontology before applying them
    #[serde(default)]
    pub cv_mapping_self_check: bool,
    /// Flag CV terms at paths no mapping rule covers
    #[serde(default = "default_true")]
    pub unanticipated_term_scan: bool,
    /// Element kinds that must occur at least once
    #[serde(default = "default_mandatory_elements")]
    pub mandatory_elements: Vec<ElementKind>,
    /// Element kind validated by the worker pool
    #[serde(default = "default_concurrent_kind")]
    pub concurrent_kind: Option<ElementKind>,
    /// Worker count, `None` for one per CPU
    #[serde(default)]
    pub worker_count: Option<usize>,
    /// Terms excused from the unanticipated-term scan per search mode
    #[serde(default = "default_unmapped_terms")]
    pub unmapped_terms: BTreeMap<SearchMode, BTreeSet<String>>,
    /// Logging behaviour
    #[serde(skip)]
    pub log: LogConfig,
}

impl Default for ValidatorConfig {
    fn default() -> Self {
        Self {
            schema_validation: true,
            cv_mapping_self_check: false,
            unanticipated_term_scan: true,
            mandatory_elements: default_mandatory_elements(),
            concurrent_kind: default_concurrent_kind(),
            worker_count: None,
            unmapped_terms: default_unmapped_terms(),
            log: LogConfig::default(),
        }
    }
}

impl ValidatorConfig {
    /// Every optional check enabled.
    pub fn strict() -> Self {
        Self {
            cv_mapping_self_check: true,
            ..Self::default()
        }
    }

    /// Rule layers only: no schema validation, self-check or term scan.
    pub fn lenient() -> Self {
        Self {
            schema_validation: false,
            cv_mapping_self_check: false,
            unanticipated_term_scan: false,
            ..Self::default()
        }
    }

    /// Parses a configuration from JSON; missing fields take defaults.
    pub fn from_json_str(json: &str) -> Result<Self> {
        serde_json::from_str(json)
            .map_err(|e| ValidatorError::Configuration(format!("invalid validator config: {e}")))
    }

    /// Reads a configuration from a JSON file.
    pub fn from_path(path: impl AsRef<Path>) -> Result<Self> {
        let json = std::fs::read_to_string(path)?;
        Self::from_json_str(&json)
    }

    pub fn with_schema_validation(mut self, enabled: bool) -> Self {
        self.schema_validation = enabled;
        self
    }

    pub fn with_cv_mapping_self_check(mut self, enabled: bool) -> Self {
        self.cv_mapping_self_check = enabled;
        self
    }

    pub fn with_unanticipated_term_scan(mut self, enabled: bool) -> Self {
        self.unanticipated_term_scan = enabled;
        self
    }

    /// Replaces the mandatory element kinds.
    pub fn with_mandatory_elements<I>(mut self, kinds: I) -> Self
    where
        I: IntoIterator<Item = ElementKind>,
    {
        self.mandatory_elements = kinds.into_iter().collect();
        self
    }

    /// Sets the kind validated concurrently, `None` to validate everything serially.
    pub fn with_concurrent_kind(mut self, kind: Option<ElementKind>) -> Self {
        self.concurrent_kind = kind;
        self
    }

    pub fn with_worker_count(mut self, workers: usize) -> Self {
        self.worker_count = Some(workers);
        self
    }

    /// Excuses a term from the unanticipated-term scan in one search mode.
    pub fn with_unmapped_term(mut self, mode: SearchMode, accession: impl Into<String>) -> Self {
        self.unmapped_terms
            .entry(mode)
            .or_default()
            .insert(accession.into());
        self
    }

    pub fn with_log_config(mut self, log: LogConfig) -> Self {
        self.log = log;
        self
    }

    /// Effective worker count.
    pub fn workers(&self) -> usize {
        self.worker_count.unwrap_or_else(num_cpus::get).max(1)
    }

    /// Checks the settings for contradictions.
    pub fn validate(&self) -> Result<()> {
        if self.worker_count == Some(0) {
            return Err(ValidatorError::Configuration(
                "worker_count must be at least 1".to_string(),
            ));
        }
        Ok(())
    }
}
