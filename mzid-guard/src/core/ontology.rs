//! The ontology lookup seam used by CV-mapping rules.

use crate::prelude::*;
use std::collections::{BTreeSet, HashMap};

/// Term lookups against controlled vocabularies such as PSI-MS or UNIMOD.
pub trait OntologyService: Send + Sync {
    /// Returns the canonical name of a term, or `None` if the term is unknown.
    fn term_name(&self, ontology: &str, accession: &str) -> Result<Option<String>>;

    /// Returns the accessions of every descendant of `parent` (not including
    /// `parent` itself).
    fn descendants(&self, ontology: &str, parent: &str) -> Result<BTreeSet<String>>;

    /// Whether the term expects a value.
    fn expects_value(&self, _ontology: &str, _accession: &str) -> Result<bool> {
        Ok(false)
    }

    /// Whether the term exists.
    fn term_exists(&self, ontology: &str, accession: &str) -> Result<bool> {
        Ok(self.term_name(ontology, accession)?.is_some())
    }
}

#[derive(Debug, Clone)]
struct TermEntry {
    name: String,
    parents: Vec<String>,
    expects_value: bool,
}

/// A small in-memory ontology, keyed by (ontology, accession).
///
/// # Examples
///
/// ```rust
/// use mzid_guard::core::{InMemoryOntology, OntologyService};
///
/// let ontology = InMemoryOntology::new()
///     .with_term("PSI-MS", "MS:1001143", "PSM-level search engine specific statistic", &[])
///     .with_term("PSI-MS", "MS:1001328", "OMSSA:evalue", &["MS:1001143"]);
///
/// let children = ontology.descendants("PSI-MS", "MS:1001143").unwrap();
/// assert!(children.contains("MS:1001328"));
/// ```
#[derive(Debug, Clone, Default)]
pub struct InMemoryOntology {
    terms: HashMap<(String, String), TermEntry>,
}

impl InMemoryOntology {
    /// Creates an empty ontology.
    pub fn new() -> Self {
        Self::default()
    }

    /// Registers a term with its direct parents.
    pub fn with_term(
        mut self,
        ontology: &str,
        accession: &str,
        name: &str,
        parents: &[&str],
    ) -> Self {
        self.terms.insert(
            (ontology.to_string(), accession.to_string()),
            TermEntry {
                name: name.to_string(),
                parents: parents.iter().map(|p| p.to_string()).collect(),
                expects_value: false,
            },
        );
        self
    }

    /// Registers a term that carries a value.
    pub fn with_valued_term(
        self,
        ontology: &str,
        accession: &str,
        name: &str,
        parents: &[&str],
    ) -> Self {
        let mut ontology_with_term = self.with_term(ontology, accession, name, parents);
        if let Some(entry) = ontology_with_term
            .terms
            .get_mut(&(ontology.to_string(), accession.to_string()))
        {
            entry.expects_value = true;
        }
        ontology_with_term
    }

    /// Number of registered terms.
    pub fn len(&self) -> usize {
        self.terms.len()
    }

    /// Returns true if no terms are registered.
    pub fn is_empty(&self) -> bool {
        self.terms.is_empty()
    }
}

impl OntologyService for InMemoryOntology {
    fn term_name(&self, ontology: &str, accession: &str) -> Result<Option<String>> {
        Ok(self
            .terms
            .get(&(ontology.to_string(), accession.to_string()))
            .map(|t| t.name.clone()))
    }

    fn descendants(&self, ontology: &str, parent: &str) -> Result<BTreeSet<String>> {
        let mut found = BTreeSet::new();
        let mut frontier = vec![parent.to_string()];
        while let Some(current) = frontier.pop() {
            for ((onto, accession), entry) in &self.terms {
                if onto == ontology
                    && entry.parents.iter().any(|p| *p == current)
                    && found.insert(accession.clone())
                {
                    frontier.push(accession.clone());
                }
            }
        }
        Ok(found)
    }

    fn expects_value(&self, ontology: &str, accession: &str) -> Result<bool> {
        Ok(self
            .terms
            .get(&(ontology.to_string(), accession.to_string()))
            .map(|t| t.expects_value)
            .unwrap_or(false))
    }
}
