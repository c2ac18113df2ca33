//! The document accessor seam.
//!
//! Decoding mzIdentML is not the engine's job. The orchestrator talks to a
//! [`DocumentAccessor`] that yields typed [`Element`]s for an
//! [`ElementKind`] selector. [`InMemoryDocument`] is a reference
//! implementation that holds already-decoded elements and can be loaded from
//! JSON.

use super::{Element, ElementKind};
use crate::prelude::*;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::path::Path;

/// Root element information used by the structural pre-check.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DocumentRoot {
    /// Local name of the root element
    pub name: String,
    /// The root `version` attribute
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub version: Option<String>,
}

impl DocumentRoot {
    /// Creates an `MzIdentML` root with the given version.
    pub fn mzidentml(version: impl Into<String>) -> Self {
        Self {
            name: "MzIdentML".to_string(),
            version: Some(version.into()),
        }
    }
}

/// Source of typed elements.
///
/// Implementations must be shareable across threads; the engine only ever
/// iterates from the orchestrating task and pre-materializes the
/// high-cardinality kind before fanning out, so iterators themselves need not
/// be `Send`.
pub trait DocumentAccessor: Send + Sync {
    /// Returns the root element.
    ///
    /// `Ok(None)` means the document is empty; `Err` means it could not be
    /// read as a well-formed document.
    fn root(&self) -> Result<Option<DocumentRoot>>;

    /// Returns a single-pass sequence of every instance of `kind`.
    fn elements(&self, kind: ElementKind) -> Result<Box<dyn Iterator<Item = Element> + '_>>;

    /// Returns the first instance of `kind`, or `None` when absent.
    fn first(&self, kind: ElementKind) -> Result<Option<Element>> {
        Ok(self.elements(kind)?.next())
    }
}

/// A fully decoded document held in memory.
///
/// # Examples
///
/// ```rust
/// use mzid_guard::core::{DocumentAccessor, DocumentRoot, Element, ElementKind, InMemoryDocument};
///
/// let doc = InMemoryDocument::new(DocumentRoot::mzidentml("1.2.0"))
///     .with_element(Element::new(ElementKind::Peptide).with_id("PEP_1"));
///
/// assert_eq!(doc.elements(ElementKind::Peptide).unwrap().count(), 1);
/// assert!(doc.first(ElementKind::DbSequence).unwrap().is_none());
/// ```
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct InMemoryDocument {
    #[serde(default)]
    root: Option<DocumentRoot>,
    #[serde(default)]
    elements: Vec<Element>,
    #[serde(skip)]
    index: HashMap<ElementKind, Vec<usize>>,
}

impl InMemoryDocument {
    /// Creates a document with a root and no elements.
    pub fn new(root: DocumentRoot) -> Self {
        Self {
            root: Some(root),
            elements: Vec::new(),
            index: HashMap::new(),
        }
    }

    /// Creates a document with no root at all.
    pub fn empty() -> Self {
        Self::default()
    }

    /// Adds an element.
    pub fn with_element(mut self, element: Element) -> Self {
        self.push(element);
        self
    }

    /// Adds many elements.
    pub fn with_elements<I>(mut self, elements: I) -> Self
    where
        I: IntoIterator<Item = Element>,
    {
        for element in elements {
            self.push(element);
        }
        self
    }

    /// Appends an element, keeping the kind index current.
    pub fn push(&mut self, element: Element) {
        self.index
            .entry(element.kind)
            .or_default()
            .push(self.elements.len());
        self.elements.push(element);
    }

    /// Total number of elements across all kinds.
    pub fn len(&self) -> usize {
        self.elements.len()
    }

    /// Returns true if the document has no elements.
    pub fn is_empty(&self) -> bool {
        self.elements.is_empty()
    }

    /// Parses a JSON rendering of a decoded document.
    pub fn from_json_str(json: &str) -> Result<Self> {
        let mut doc: InMemoryDocument = serde_json::from_str(json)?;
        doc.rebuild_index();
        Ok(doc)
    }

    /// Reads a JSON rendering of a decoded document from disk.
    pub fn from_json_path(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let json = std::fs::read_to_string(path).map_err(|e| {
            ValidatorError::document_with_source(
                format!("cannot read document '{}'", path.display()),
                Box::new(e),
            )
        })?;
        Self::from_json_str(&json)
    }

    fn rebuild_index(&mut self) {
        self.index.clear();
        for (position, element) in self.elements.iter().enumerate() {
            self.index.entry(element.kind).or_default().push(position);
        }
    }
}

impl DocumentAccessor for InMemoryDocument {
    fn root(&self) -> Result<Option<DocumentRoot>> {
        Ok(self.root.clone())
    }

    fn elements(&self, kind: ElementKind) -> Result<Box<dyn Iterator<Item = Element> + '_>> {
        let positions = self.index.get(&kind).map(Vec::as_slice).unwrap_or_default();
        Ok(Box::new(
            positions.iter().map(move |&i| self.elements[i].clone()),
        ))
    }
}
