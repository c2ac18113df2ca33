//! Typed element handles produced by a document accessor.
//!
//! An [`Element`] is a decoded instance of one mzIdentML element type. The
//! engine never looks at raw XML: it sees the element's kind, its location,
//! its attributes and the CV parameters nested beneath it.

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;

use crate::error::ValidatorError;

/// The mzIdentML element types the engine dispatches on.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum ElementKind {
    Cv,
    AnalysisSoftware,
    Provider,
    AuditCollection,
    AnalysisSampleCollection,
    SequenceCollection,
    DbSequence,
    Peptide,
    PeptideEvidence,
    AnalysisCollection,
    SpectrumIdentification,
    ProteinDetection,
    AnalysisProtocolCollection,
    SpectrumIdentificationProtocol,
    ProteinDetectionProtocol,
    DataCollection,
    SourceFile,
    SearchDatabase,
    SpectraData,
    SpectrumIdentificationList,
    SpectrumIdentificationResult,
    SpectrumIdentificationItem,
    ProteinDetectionList,
    ProteinAmbiguityGroup,
    ProteinDetectionHypothesis,
}

impl ElementKind {
    /// Every known kind, in document order.
    pub const ALL: [ElementKind; 25] = [
        ElementKind::Cv,
        ElementKind::AnalysisSoftware,
        ElementKind::Provider,
        ElementKind::AuditCollection,
        ElementKind::AnalysisSampleCollection,
        ElementKind::SequenceCollection,
        ElementKind::DbSequence,
        ElementKind::Peptide,
        ElementKind::PeptideEvidence,
        ElementKind::AnalysisCollection,
        ElementKind::SpectrumIdentification,
        ElementKind::ProteinDetection,
        ElementKind::AnalysisProtocolCollection,
        ElementKind::SpectrumIdentificationProtocol,
        ElementKind::ProteinDetectionProtocol,
        ElementKind::DataCollection,
        ElementKind::SourceFile,
        ElementKind::SearchDatabase,
        ElementKind::SpectraData,
        ElementKind::SpectrumIdentificationList,
        ElementKind::SpectrumIdentificationResult,
        ElementKind::SpectrumIdentificationItem,
        ElementKind::ProteinDetectionList,
        ElementKind::ProteinAmbiguityGroup,
        ElementKind::ProteinDetectionHypothesis,
    ];

    /// The canonical (instance-free) xpath of this element type.
    pub fn xpath(&self) -> &'static str {
        match self {
            ElementKind::Cv => "/MzIdentML/cvList/cv",
            ElementKind::AnalysisSoftware => "/MzIdentML/AnalysisSoftwareList/AnalysisSoftware",
            ElementKind::Provider => "/MzIdentML/Provider",
            ElementKind::AuditCollection => "/MzIdentML/AuditCollection",
            ElementKind::AnalysisSampleCollection => "/MzIdentML/AnalysisSampleCollection",
            ElementKind::SequenceCollection => "/MzIdentML/SequenceCollection",
            ElementKind::DbSequence => "/MzIdentML/SequenceCollection/DBSequence",
            ElementKind::Peptide => "/MzIdentML/SequenceCollection/Peptide",
            ElementKind::PeptideEvidence => "/MzIdentML/SequenceCollection/PeptideEvidence",
            ElementKind::AnalysisCollection => "/MzIdentML/AnalysisCollection",
            ElementKind::SpectrumIdentification => {
                "/MzIdentML/AnalysisCollection/SpectrumIdentification"
            }
            ElementKind::ProteinDetection => "/MzIdentML/AnalysisCollection/ProteinDetection",
            ElementKind::AnalysisProtocolCollection => "/MzIdentML/AnalysisProtocolCollection",
            ElementKind::SpectrumIdentificationProtocol => {
                "/MzIdentML/AnalysisProtocolCollection/SpectrumIdentificationProtocol"
            }
            ElementKind::ProteinDetectionProtocol => {
                "/MzIdentML/AnalysisProtocolCollection/ProteinDetectionProtocol"
            }
            ElementKind::DataCollection => "/MzIdentML/DataCollection",
            ElementKind::SourceFile => "/MzIdentML/DataCollection/Inputs/SourceFile",
            ElementKind::SearchDatabase => "/MzIdentML/DataCollection/Inputs/SearchDatabase",
            ElementKind::SpectraData => "/MzIdentML/DataCollection/Inputs/SpectraData",
            ElementKind::SpectrumIdentificationList => {
                "/MzIdentML/DataCollection/AnalysisData/SpectrumIdentificationList"
            }
            ElementKind::SpectrumIdentificationResult => {
                "/MzIdentML/DataCollection/AnalysisData/SpectrumIdentificationList/SpectrumIdentificationResult"
            }
            ElementKind::SpectrumIdentificationItem => {
                "/MzIdentML/DataCollection/AnalysisData/SpectrumIdentificationList/SpectrumIdentificationResult/SpectrumIdentificationItem"
            }
            ElementKind::ProteinDetectionList => {
                "/MzIdentML/DataCollection/AnalysisData/ProteinDetectionList"
            }
            ElementKind::ProteinAmbiguityGroup => {
                "/MzIdentML/DataCollection/AnalysisData/ProteinDetectionList/ProteinAmbiguityGroup"
            }
            ElementKind::ProteinDetectionHypothesis => {
                "/MzIdentML/DataCollection/AnalysisData/ProteinDetectionList/ProteinAmbiguityGroup/ProteinDetectionHypothesis"
            }
        }
    }

    /// Resolves a canonical xpath back to its kind.
    pub fn from_xpath(xpath: &str) -> Option<ElementKind> {
        let trimmed = xpath.trim_end_matches('/');
        ElementKind::ALL
            .into_iter()
            .find(|kind| kind.xpath() == trimmed)
    }

    /// The local element name (last xpath segment).
    pub fn element_name(&self) -> &'static str {
        self.xpath().rsplit('/').next().unwrap_or_default()
    }
}

impl fmt::Display for ElementKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.element_name())
    }
}

/// The mzIdentML schema versions the engine understands.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum SchemaVersion {
    #[serde(rename = "1.1")]
    V1_1,
    #[serde(rename = "1.2")]
    V1_2,
}

impl SchemaVersion {
    /// Parses the root `version` attribute (`1.1.0`, `1.1.1`, `1.2.0`, ...).
    pub fn parse(version: &str) -> Result<Self, ValidatorError> {
        let mut parts = version.trim().split('.');
        match (parts.next(), parts.next()) {
            (Some("1"), Some("1")) => Ok(SchemaVersion::V1_1),
            (Some("1"), Some("2")) => Ok(SchemaVersion::V1_2),
            _ => Err(ValidatorError::Configuration(format!(
                "unsupported mzIdentML version '{version}'"
            ))),
        }
    }

    /// Ordered element kinds whose instances are handed to Object Rules.
    ///
    /// Protocols come first because they carry the search characteristics
    /// the remaining rules depend on.
    pub fn object_rule_kinds(&self) -> Vec<ElementKind> {
        use ElementKind::*;
        let mut kinds = vec![
            Cv,
            AnalysisSoftware,
            Provider,
            AuditCollection,
            AnalysisSampleCollection,
            SpectrumIdentificationProtocol,
            ProteinDetectionProtocol,
            SourceFile,
            SearchDatabase,
            SpectraData,
            DbSequence,
            Peptide,
            PeptideEvidence,
            SpectrumIdentification,
            ProteinDetection,
            SpectrumIdentificationList,
            SpectrumIdentificationResult,
            SpectrumIdentificationItem,
            ProteinDetectionList,
            ProteinAmbiguityGroup,
        ];
        if *self == SchemaVersion::V1_2 {
            // 1.2 moved pass-threshold semantics onto individual hypotheses.
            kinds.push(ProteinDetectionHypothesis);
        }
        kinds
    }

    /// Ordered element kinds whose CV terms are checked by CV-mapping rules.
    pub fn cv_mapping_kinds(&self) -> Vec<ElementKind> {
        use ElementKind::*;
        vec![
            AnalysisSoftware,
            Provider,
            AuditCollection,
            AnalysisSampleCollection,
            DbSequence,
            Peptide,
            PeptideEvidence,
            SpectrumIdentificationProtocol,
            ProteinDetectionProtocol,
            SourceFile,
            SearchDatabase,
            SpectraData,
            SpectrumIdentificationList,
            SpectrumIdentificationResult,
            SpectrumIdentificationItem,
            ProteinDetectionList,
            ProteinAmbiguityGroup,
            ProteinDetectionHypothesis,
        ]
    }
}

impl fmt::Display for SchemaVersion {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SchemaVersion::V1_1 => f.write_str("1.1"),
            SchemaVersion::V1_2 => f.write_str("1.2"),
        }
    }
}

/// A CV parameter nested somewhere beneath an element.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct CvParam {
    /// Path of the `cvParam` node relative to its element, e.g.
    /// `cvParam` or `Modification/cvParam`
    #[serde(default = "CvParam::default_path")]
    pub path: String,
    /// Term accession, e.g. `MS:1001010`
    pub accession: String,
    /// Term name as written in the document
    #[serde(default)]
    pub name: String,
    /// Ontology reference, e.g. `PSI-MS`
    #[serde(default)]
    pub cv_ref: String,
    /// Optional value
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub value: Option<String>,
}

impl CvParam {
    fn default_path() -> String {
        "cvParam".to_string()
    }

    /// Creates a parameter directly beneath its element.
    pub fn new(accession: impl Into<String>, name: impl Into<String>) -> Self {
        Self {
            path: Self::default_path(),
            accession: accession.into(),
            name: name.into(),
            cv_ref: "PSI-MS".to_string(),
            value: None,
        }
    }

    /// Places the parameter under a nested relative path.
    pub fn at_path(mut self, path: impl Into<String>) -> Self {
        self.path = path.into();
        self
    }

    /// Sets the ontology reference.
    pub fn with_cv_ref(mut self, cv_ref: impl Into<String>) -> Self {
        self.cv_ref = cv_ref.into();
        self
    }

    /// Sets the value.
    pub fn with_value(mut self, value: impl Into<String>) -> Self {
        self.value = Some(value.into());
        self
    }
}

/// A decoded element instance.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Element {
    /// Element type
    pub kind: ElementKind,
    /// Instance location, used as the message context
    pub location: String,
    /// The element's `id` attribute, if it has one
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub id: Option<String>,
    /// Remaining attributes
    #[serde(default)]
    pub attributes: BTreeMap<String, String>,
    /// CV parameters nested beneath the element
    #[serde(default)]
    pub cv_params: Vec<CvParam>,
}

impl Element {
    /// Creates an element located at its kind's canonical xpath.
    pub fn new(kind: ElementKind) -> Self {
        Self {
            kind,
            location: kind.xpath().to_string(),
            id: None,
            attributes: BTreeMap::new(),
            cv_params: Vec::new(),
        }
    }

    /// Sets the `id` attribute and derives an instance location from it.
    pub fn with_id(mut self, id: impl Into<String>) -> Self {
        let id = id.into();
        self.location = format!("{}[@id='{}']", self.kind.xpath(), id);
        self.id = Some(id);
        self
    }

    /// Overrides the instance location.
    pub fn with_location(mut self, location: impl Into<String>) -> Self {
        self.location = location.into();
        self
    }

    /// Adds an attribute.
    pub fn with_attribute(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.attributes.insert(name.into(), value.into());
        self
    }

    /// Adds a CV parameter.
    pub fn with_cv_param(mut self, param: CvParam) -> Self {
        self.cv_params.push(param);
        self
    }

    /// Looks up an attribute value.
    pub fn attribute(&self, name: &str) -> Option<&str> {
        self.attributes.get(name).map(String::as_str)
    }

    /// CV parameters at the given relative path.
    pub fn cv_params_at<'a>(&'a self, path: &'a str) -> impl Iterator<Item = &'a CvParam> + 'a {
        self.cv_params.iter().filter(move |p| p.path == path)
    }

    /// Absolute xpath of a nested CV parameter.
    pub fn term_xpath(&self, param: &CvParam) -> String {
        format!("{}/{}", self.kind.xpath(), param.path)
    }
}
