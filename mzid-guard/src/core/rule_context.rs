//! Per-run context handed to every rule invocation.
//!
//! Facts about the search as a whole (is it de novo, cross-linking,
//! proteogenomics) are computed once per run from the protocol elements and
//! passed by reference into each rule. They are plain data, so workers of the
//! concurrent stage read them without synchronization and nothing leaks from
//! one run into the next.

use super::{DocumentAccessor, ElementKind, OntologyService, SchemaVersion};
use crate::prelude::*;
use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;
use std::fmt;
use std::sync::Arc;

/// Specialized search modes that change which CV obligations apply.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SearchMode {
    DeNovo,
    CrossLinking,
    Proteogenomics,
}

impl SearchMode {
    /// The PSI-MS term that declares this mode in `AdditionalSearchParams`.
    pub fn accession(&self) -> &'static str {
        match self {
            SearchMode::DeNovo => "MS:1001010",
            SearchMode::CrossLinking => "MS:1002494",
            SearchMode::Proteogenomics => "MS:1002635",
        }
    }

    fn from_accession(accession: &str) -> Option<SearchMode> {
        [
            SearchMode::DeNovo,
            SearchMode::CrossLinking,
            SearchMode::Proteogenomics,
        ]
        .into_iter()
        .find(|mode| mode.accession() == accession)
    }
}

impl fmt::Display for SearchMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SearchMode::DeNovo => f.write_str("de novo"),
            SearchMode::CrossLinking => f.write_str("cross-linking"),
            SearchMode::Proteogenomics => f.write_str("proteogenomics"),
        }
    }
}

/// Search-wide facts shared by every rule in a run.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct SearchCharacteristics {
    modes: BTreeSet<SearchMode>,
}

impl SearchCharacteristics {
    /// Characteristics with the given modes active.
    pub fn with_modes<I>(modes: I) -> Self
    where
        I: IntoIterator<Item = SearchMode>,
    {
        Self {
            modes: modes.into_iter().collect(),
        }
    }

    /// Scans every SpectrumIdentificationProtocol for mode-declaring terms.
    pub fn detect(document: &dyn DocumentAccessor) -> Result<Self> {
        let mut modes = BTreeSet::new();
        for protocol in document.elements(ElementKind::SpectrumIdentificationProtocol)? {
            modes.extend(
                protocol
                    .cv_params
                    .iter()
                    .filter_map(|p| SearchMode::from_accession(&p.accession)),
            );
        }
        Ok(Self { modes })
    }

    /// Whether a mode is active.
    pub fn is(&self, mode: SearchMode) -> bool {
        self.modes.contains(&mode)
    }

    pub fn is_de_novo(&self) -> bool {
        self.is(SearchMode::DeNovo)
    }

    pub fn is_cross_linking(&self) -> bool {
        self.is(SearchMode::CrossLinking)
    }

    pub fn is_proteogenomics(&self) -> bool {
        self.is(SearchMode::Proteogenomics)
    }

    /// Active modes in a stable order.
    pub fn modes(&self) -> impl Iterator<Item = SearchMode> + '_ {
        self.modes.iter().copied()
    }
}

/// Everything a rule may consult besides the element it checks.
#[derive(Clone)]
pub struct RuleContext {
    version: SchemaVersion,
    search: SearchCharacteristics,
    ontology: Arc<dyn OntologyService>,
}

impl RuleContext {
    /// Creates a rule context.
    pub fn new(
        version: SchemaVersion,
        search: SearchCharacteristics,
        ontology: Arc<dyn OntologyService>,
    ) -> Self {
        Self {
            version,
            search,
            ontology,
        }
    }

    /// Schema version of the document under validation.
    pub fn version(&self) -> SchemaVersion {
        self.version
    }

    /// Search-wide characteristics.
    pub fn search(&self) -> &SearchCharacteristics {
        &self.search
    }

    /// Ontology lookups.
    pub fn ontology(&self) -> &dyn OntologyService {
        self.ontology.as_ref()
    }
}

impl fmt::Debug for RuleContext {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("RuleContext")
            .field("version", &self.version)
            .field("search", &self.search)
            .finish_non_exhaustive()
    }
}
