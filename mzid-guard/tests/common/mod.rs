//! Shared fixtures for the integration tests.

#![allow(dead_code)]

use mzid_guard::core::{
    CvParam, DocumentAccessor, DocumentRoot, Element, ElementKind, InMemoryDocument,
    InMemoryOntology, MessageLevel, RuleContext, SchemaDefect, SchemaValidator, ValidatorConfig,
    ValidatorMessage,
};
use mzid_guard::prelude::*;
use mzid_guard::rules::{
    CvMappingRule, CvTermSpec, RequiredAttributeRule, RequirementLevel, RuleRegistry,
    RuleRegistryBuilder,
};
use std::collections::HashMap;
use std::sync::{Arc, Mutex};

/// A small slice of PSI-MS.
pub fn ontology() -> InMemoryOntology {
    InMemoryOntology::new()
        .with_term("PSI-MS", "MS:1001143", "PSM-level search engine specific statistic", &[])
        .with_term("PSI-MS", "MS:1002354", "PSM-level q-value", &["MS:1001143"])
        .with_term("PSI-MS", "MS:1001328", "OMSSA:evalue", &["MS:1001143"])
        .with_term("PSI-MS", "MS:1000560", "mass spectrometer file format", &[])
        .with_term("PSI-MS", "MS:1000584", "mzML format", &["MS:1000560"])
        .with_term("PSI-MS", "MS:1001083", "ms-ms search", &[])
        .with_term("PSI-MS", "MS:1002494", "cross-linking search", &[])
        .with_term("PSI-MS", "MS:1002509", "cross-link donor", &[])
}

/// Elements every valid document carries.
pub fn mandatory_elements() -> Vec<Element> {
    vec![
        Element::new(ElementKind::Cv).with_id("PSI-MS"),
        Element::new(ElementKind::SpectrumIdentificationProtocol)
            .with_id("SIP_1")
            .with_cv_param(
                CvParam::new("MS:1001083", "ms-ms search").at_path("SearchType/cvParam"),
            ),
        Element::new(ElementKind::SpectrumIdentification).with_id("SI_1"),
        Element::new(ElementKind::SearchDatabase).with_id("SDB_1"),
        Element::new(ElementKind::SpectraData)
            .with_id("SD_1")
            .with_cv_param(CvParam::new("MS:1000584", "mzML format").at_path("FileFormat/cvParam")),
        Element::new(ElementKind::SpectrumIdentificationList).with_id("SIL_1"),
    ]
}

/// An identification item, with or without its computed m/z.
pub fn sii(index: usize, with_mz: bool) -> Element {
    let element = Element::new(ElementKind::SpectrumIdentificationItem)
        .with_id(format!("SII_{index}"))
        .with_cv_param(CvParam::new("MS:1002354", "PSM-level q-value").with_value("0.01"));
    if with_mz {
        element.with_attribute("calculatedMassToCharge", "523.77")
    } else {
        element
    }
}

/// A structurally valid 1.2 document with `items` identification items.
pub fn document(items: usize, with_mz: bool) -> InMemoryDocument {
    InMemoryDocument::new(DocumentRoot::mzidentml("1.2.0"))
        .with_elements(mandatory_elements())
        .with_elements((0..items).map(|i| sii(i, with_mz)))
}

pub fn sii_rule() -> RequiredAttributeRule {
    RequiredAttributeRule::new(
        "SII_Rule",
        ElementKind::SpectrumIdentificationItem,
        "calculatedMassToCharge",
    )
    .with_tip("Report the theoretical m/z of the identified peptide")
}

pub fn score_rule() -> CvMappingRule {
    CvMappingRule::new(
        "SII_score_rule",
        ElementKind::SpectrumIdentificationItem,
        RequirementLevel::Must,
    )
    .with_term(
        CvTermSpec::new("MS:1001143", "PSM-level search engine specific statistic")
            .use_term(false)
            .allow_children(true),
    )
}

pub fn format_rule() -> CvMappingRule {
    CvMappingRule::new("SD_format", ElementKind::SpectraData, RequirementLevel::Must)
        .at_term_path("FileFormat/cvParam")
        .with_term(
            CvTermSpec::new("MS:1000560", "mass spectrometer file format")
                .use_term(false)
                .allow_children(true),
        )
}

pub fn search_type_rule() -> CvMappingRule {
    CvMappingRule::new(
        "SIP_search_type",
        ElementKind::SpectrumIdentificationProtocol,
        RequirementLevel::Must,
    )
    .at_term_path("SearchType/cvParam")
    .with_term(CvTermSpec::new("MS:1001083", "ms-ms search"))
}

/// The usual rule set: one object rule and three CV rules.
pub fn rules() -> RuleRegistryBuilder {
    RuleRegistry::builder()
        .object_rule(sii_rule())
        .cv_rule(score_rule())
        .cv_rule(format_rule())
        .cv_rule(search_type_rule())
}

/// Quiet configuration with a fixed worker count.
pub fn config() -> ValidatorConfig {
    ValidatorConfig::lenient().with_worker_count(4)
}

pub fn validator(rules: RuleRegistryBuilder, config: ValidatorConfig) -> MzIdentValidator {
    MzIdentValidator::builder(rules)
        .config(config)
        .ontology(ontology())
        .build()
        .expect("fixture validator builds")
}

/// Counts how often each element location is checked.
#[derive(Debug, Clone)]
pub struct CountingRule {
    id: String,
    kind: ElementKind,
    pub visits: Arc<Mutex<HashMap<String, usize>>>,
}

impl CountingRule {
    pub fn new(id: &str, kind: ElementKind) -> Self {
        Self {
            id: id.to_string(),
            kind,
            visits: Arc::new(Mutex::new(HashMap::new())),
        }
    }

    pub fn visit_counts(&self) -> HashMap<String, usize> {
        self.visits.lock().unwrap().clone()
    }
}

impl ObjectRule for CountingRule {
    fn id(&self) -> &str {
        &self.id
    }

    fn kind(&self) -> ElementKind {
        self.kind
    }

    fn check(&self, element: &Element, _ctx: &RuleContext) -> Result<Vec<ValidatorMessage>> {
        *self
            .visits
            .lock()
            .unwrap()
            .entry(element.location.clone())
            .or_default() += 1;
        Ok(Vec::new())
    }
}

/// Always fails.
#[derive(Debug)]
pub struct FailingRule {
    pub kind: ElementKind,
}

impl ObjectRule for FailingRule {
    fn id(&self) -> &str {
        "FailingRule"
    }

    fn kind(&self) -> ElementKind {
        self.kind
    }

    fn check(&self, _element: &Element, _ctx: &RuleContext) -> Result<Vec<ValidatorMessage>> {
        Err(ValidatorError::rule_execution("FailingRule", "unexpected null"))
    }
}

/// Reports fixed defects.
#[derive(Debug, Clone, Default)]
pub struct StaticSchema {
    pub defects: Vec<SchemaDefect>,
}

impl SchemaValidator for StaticSchema {
    fn validate(&self, _document: &dyn DocumentAccessor) -> Result<Vec<SchemaDefect>> {
        Ok(self.defects.clone())
    }
}

/// A schema that cannot be loaded.
#[derive(Debug)]
pub struct MissingSchema;

impl SchemaValidator for MissingSchema {
    fn validate(&self, _document: &dyn DocumentAccessor) -> Result<Vec<SchemaDefect>> {
        Err(ValidatorError::schema_with_source(
            "schema could not be loaded",
            Box::new(std::io::Error::new(
                std::io::ErrorKind::NotFound,
                "mzIdentML1.2.0.xsd",
            )),
        ))
    }
}

/// A document whose root cannot be read.
#[derive(Debug)]
pub struct MalformedDocument;

impl DocumentAccessor for MalformedDocument {
    fn root(&self) -> Result<Option<DocumentRoot>> {
        Err(ValidatorError::document("unexpected end of file at line 12"))
    }

    fn elements(&self, _kind: ElementKind) -> Result<Box<dyn Iterator<Item = Element> + '_>> {
        Ok(Box::new(std::iter::empty()))
    }
}

/// Severity of every message, as a sorted list.
pub fn levels(messages: &[ClusteredMessage]) -> Vec<MessageLevel> {
    let mut levels: Vec<_> = messages.iter().map(|m| m.level).collect();
    levels.sort();
    levels
}
