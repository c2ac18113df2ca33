//! End-to-end runs of the validation pipeline.

mod common;

use common::*;
use mzid_guard::core::{
    CvParam, DocumentRoot, Element, ElementKind, InMemoryDocument, MessageLevel, SchemaDefect,
};
use mzid_guard::filter::{ConditionOption, RuleFilterSpec, SelectedOptions};
use mzid_guard::prelude::*;
use mzid_guard::rules::{
    CvMappingRule, CvTermSpec, RequirementLevel, MANDATORY_ELEMENTS_RULE_ID,
    UNANTICIPATED_TERMS_RULE_ID,
};

fn no_decoy_filter() -> RuleFilterSpec {
    RuleFilterSpec::empty()
        .with_reference("mass_rules", ["SII_Rule"])
        .with_option(
            "DATABASE_TYPE",
            "NO_DECOY_DATABASE",
            ConditionOption::default().with_reference("mass_rules"),
        )
}

#[tokio::test]
async fn test_selected_option_skips_rule() {
    let mut validator = MzIdentValidator::builder(rules())
        .config(config())
        .ontology(ontology())
        .rule_filter(no_decoy_filter())
        .build()
        .unwrap();
    let selected = SelectedOptions::new().with("DATABASE_TYPE", "NO_DECOY_DATABASE");

    let messages = validator
        .run(&document(20, false), &selected, MessageLevel::Info)
        .await
        .unwrap();

    assert!(messages.iter().all(|m| m.rule_id() != Some("SII_Rule")));
    let report = validator.report();
    assert!(report.object_rules_not_checked.contains("SII_Rule"));
    assert!(!report.object_rules_invalid.contains("SII_Rule"));
    assert_eq!(validator.stats().skipped_rules, 1);
}

#[tokio::test]
async fn test_unselected_option_keeps_rule() {
    let mut validator = MzIdentValidator::builder(rules())
        .config(config())
        .ontology(ontology())
        .rule_filter(no_decoy_filter())
        .build()
        .unwrap();

    let messages = validator
        .run(&document(20, false), &SelectedOptions::new(), MessageLevel::Info)
        .await
        .unwrap();

    assert_eq!(messages.len(), 1);
    assert_eq!(messages[0].rule_id(), Some("SII_Rule"));
    assert!(validator.report().object_rules_invalid.contains("SII_Rule"));
}

#[tokio::test]
async fn test_valid_document_reports_rules_valid() {
    let mut validator = validator(rules(), config());

    let messages = validator
        .run(&document(500, true), &SelectedOptions::new(), MessageLevel::Info)
        .await
        .unwrap();

    assert!(messages.is_empty(), "unexpected messages: {messages:?}");
    let report = validator.report();
    assert!(report.object_rules_valid.contains("SII_Rule"));
    assert!(report.object_rules_valid.contains(MANDATORY_ELEMENTS_RULE_ID));
    for id in ["SII_score_rule", "SD_format", "SIP_search_type"] {
        assert!(report.cv_rules_valid.contains(id), "{id} not valid");
    }
    assert!(!report.has_failures());
    assert_eq!(validator.stats().concurrent_elements, 500);
}

#[tokio::test]
async fn test_repeated_defect_collapses_to_one_cluster() {
    let mut validator = validator(rules(), config());

    let messages = validator
        .run(&document(10_000, false), &SelectedOptions::new(), MessageLevel::Warn)
        .await
        .unwrap();

    assert_eq!(messages.len(), 1);
    let cluster = &messages[0];
    assert_eq!(cluster.rule_id(), Some("SII_Rule"));
    assert_eq!(cluster.occurrences(), 10_000);
    assert!(cluster
        .render_context()
        .unwrap()
        .ends_with("in 10000 locations"));
    assert_eq!(validator.stats().concurrent_elements, 10_000);
    assert_eq!(validator.stats().workers, 4);
}

#[tokio::test]
async fn test_empty_document_is_fatal() {
    let mut validator = validator(rules(), config());

    let messages = validator
        .run(&InMemoryDocument::empty(), &SelectedOptions::new(), MessageLevel::Info)
        .await
        .unwrap();

    assert_eq!(messages.len(), 1);
    assert_eq!(messages[0].level, MessageLevel::Fatal);
    assert_eq!(messages[0].message, "The document is empty");
    assert!(validator.stats().halted);

    let report = validator.report();
    assert_eq!(report.object_rules_not_checked.len(), report.object_rule_count());
    assert_eq!(report.cv_rules_not_checked.len(), report.cv_rule_count());
}

#[tokio::test]
async fn test_structural_failures_are_fatal() {
    let mut validator = validator(rules(), config());
    let selected = SelectedOptions::new();

    let messages = validator
        .run(&MalformedDocument, &selected, MessageLevel::Info)
        .await
        .unwrap();
    assert_eq!(levels(&messages), vec![MessageLevel::Fatal]);
    assert!(messages[0]
        .message
        .starts_with("The document is not well-formed"));

    let wrong_root = InMemoryDocument::new(DocumentRoot {
        name: "indexedmzML".to_string(),
        version: Some("1.1.0".to_string()),
    });
    let messages = validator.run(&wrong_root, &selected, MessageLevel::Info).await.unwrap();
    assert_eq!(
        messages[0].message,
        "Unexpected root element 'indexedmzML': expected 'MzIdentML'"
    );

    let unversioned = InMemoryDocument::new(DocumentRoot {
        name: "MzIdentML".to_string(),
        version: None,
    });
    let messages = validator.run(&unversioned, &selected, MessageLevel::Info).await.unwrap();
    assert_eq!(messages.len(), 1);
    assert!(messages[0].message.contains("no version attribute"));

    let future = InMemoryDocument::new(DocumentRoot::mzidentml("1.3.0"));
    let messages = validator.run(&future, &selected, MessageLevel::Info).await.unwrap();
    assert_eq!(messages[0].message, "Unsupported mzIdentML version '1.3.0'");
}

#[tokio::test]
async fn test_missing_mandatory_element() {
    let mut validator = validator(rules(), config());
    let document = InMemoryDocument::new(DocumentRoot::mzidentml("1.2.0")).with_elements(
        mandatory_elements()
            .into_iter()
            .filter(|e| e.kind != ElementKind::SearchDatabase),
    );

    let messages = validator
        .run(&document, &SelectedOptions::new(), MessageLevel::Info)
        .await
        .unwrap();

    let missing: Vec<_> = messages
        .iter()
        .filter(|m| m.rule_id() == Some(MANDATORY_ELEMENTS_RULE_ID))
        .collect();
    assert_eq!(missing.len(), 1);
    assert_eq!(missing[0].message, "Mandatory element SearchDatabase is missing");
    assert_eq!(missing[0].level, MessageLevel::Error);
    assert_eq!(
        missing[0].render_context().as_deref(),
        Some(ElementKind::SearchDatabase.xpath())
    );
    assert!(validator
        .report()
        .object_rules_invalid
        .contains(MANDATORY_ELEMENTS_RULE_ID));
}

#[tokio::test]
async fn test_schema_defects_pass_through() {
    let config = config().with_schema_validation(true);
    let mut validator = MzIdentValidator::builder(rules())
        .config(config)
        .ontology(ontology())
        .schema_validator(StaticSchema {
            defects: vec![
                SchemaDefect::new(Some(3), MessageLevel::Error, "element 'Foo' not allowed"),
                SchemaDefect::new(None, MessageLevel::Info, "namespace prefix unused"),
            ],
        })
        .build()
        .unwrap();

    let messages = validator
        .run(&document(3, false), &SelectedOptions::new(), MessageLevel::Warn)
        .await
        .unwrap();

    assert_eq!(messages[0].message, "line 3: element 'Foo' not allowed");
    assert_eq!(messages[0].rule_id(), None);
    assert!(messages.iter().all(|m| m.message != "namespace prefix unused"));
    // defects are recorded regardless of the threshold
    let report = validator.report();
    assert_eq!(report.schema_defects.len(), 2);
    assert!(report.has_failures());
}

#[tokio::test]
async fn test_unusable_schema_aborts_run() {
    let mut validator = MzIdentValidator::builder(rules())
        .config(config().with_schema_validation(true))
        .ontology(ontology())
        .schema_validator(MissingSchema)
        .build()
        .unwrap();

    let err = validator
        .run(&document(3, true), &SelectedOptions::new(), MessageLevel::Info)
        .await
        .unwrap_err();

    assert!(matches!(err, ValidatorError::SchemaValidation { .. }));
    assert!(std::error::Error::source(&err).is_some());
}

#[tokio::test]
async fn test_failing_rule_does_not_abort_run() {
    let rules = rules().object_rule(FailingRule {
        kind: ElementKind::Peptide,
    });
    let mut validator = validator(rules, config());
    let document = document(5, false)
        .with_element(Element::new(ElementKind::Peptide).with_id("PEP_1"));

    let messages = validator
        .run(&document, &SelectedOptions::new(), MessageLevel::Info)
        .await
        .unwrap();

    assert!(messages.iter().all(|m| m.rule_id() != Some("FailingRule")));
    assert!(messages.iter().any(|m| m.rule_id() == Some("SII_Rule")));
    assert!(validator
        .report()
        .object_rules_not_checked
        .contains("FailingRule"));
}

#[tokio::test]
async fn test_outcome_driven_skip() {
    let filter = RuleFilterSpec::empty().with_outcome_rule("SD_format", true, ["SII_Rule"]);
    let mut validator = MzIdentValidator::builder(rules())
        .config(config())
        .ontology(ontology())
        .rule_filter(filter)
        .build()
        .unwrap();

    let messages = validator
        .run(&document(50, false), &SelectedOptions::new(), MessageLevel::Info)
        .await
        .unwrap();

    assert!(messages.is_empty(), "unexpected messages: {messages:?}");
    let report = validator.report();
    assert!(report.cv_rules_valid.contains("SD_format"));
    assert!(report.object_rules_not_checked.contains("SII_Rule"));
}

#[tokio::test]
async fn test_threshold_filters_messages_but_not_outcomes() {
    let mut validator = validator(rules(), config());

    let messages = validator
        .run(&document(10, false), &SelectedOptions::new(), MessageLevel::Fatal)
        .await
        .unwrap();

    assert!(messages.is_empty());
    assert!(validator.report().object_rules_invalid.contains("SII_Rule"));
}

#[tokio::test]
async fn test_runs_are_independent() {
    let filter = RuleFilterSpec::empty().with_outcome_rule("SII_Rule", false, ["SD_format"]);
    let mut validator = MzIdentValidator::builder(rules())
        .config(config())
        .ontology(ontology())
        .rule_filter(filter)
        .build()
        .unwrap();
    let selected = SelectedOptions::new();

    let first = validator
        .run(&document(10, false), &selected, MessageLevel::Info)
        .await
        .unwrap();
    let first_report = validator.report();
    let again = validator
        .run(&document(10, false), &selected, MessageLevel::Info)
        .await
        .unwrap();
    assert_eq!(first, again);
    assert_eq!(first_report, validator.report());
    assert!(validator.report().cv_rules_not_checked.contains("SD_format"));

    // the skip triggered by the first document must not leak into this one
    validator
        .run(&document(10, true), &selected, MessageLevel::Info)
        .await
        .unwrap();
    assert!(validator.report().cv_rules_valid.contains("SD_format"));
    assert_eq!(validator.stats().skipped_rules, 0);
}

#[tokio::test]
async fn test_report_buckets_cover_every_rule() {
    let rules = rules()
        .cv_rule(
            CvMappingRule::new(
                "PDH_threshold",
                ElementKind::ProteinDetectionHypothesis,
                RequirementLevel::May,
            )
            .with_term(CvTermSpec::new("MS:1002415", "protein group passes threshold")),
        )
        .cv_rule(
            CvMappingRule::for_path("Nowhere_rule", "/MzIdentML/Nowhere", RequirementLevel::Must)
                .with_term(CvTermSpec::new("MS:1001083", "ms-ms search")),
        );
    let mut validator = validator(rules, config());

    validator
        .run(&document(10, false), &SelectedOptions::new(), MessageLevel::Info)
        .await
        .unwrap();

    let report = validator.report();
    assert_eq!(
        report.object_rule_count(),
        validator.registry().object_rules().len() + 1
    );
    assert_eq!(report.cv_rule_count(), validator.registry().cv_rules().len());
    assert!(report.is_disjoint());
    assert!(report.cv_rules_invalid_xpath.contains("Nowhere_rule"));
    assert!(report.cv_rules_valid_xpath_no_data.contains("PDH_threshold"));
    assert!(report.cv_rules_not_checked.contains("PDH_threshold"));
    assert!(!report.cv_rules_valid_xpath_no_data.contains("SD_format"));
}

fn protocol_with_extras(cross_linking: bool) -> Element {
    let mut protocol = Element::new(ElementKind::SpectrumIdentificationProtocol)
        .with_id("SIP_1")
        .with_cv_param(CvParam::new("MS:1001083", "ms-ms search").at_path("SearchType/cvParam"))
        .with_cv_param(
            CvParam::new("MS:1002509", "cross-link donor")
                .at_path("AdditionalSearchParams/cvParam"),
        )
        .with_cv_param(
            CvParam::new("MS:1001328", "OMSSA:evalue").at_path("AdditionalSearchParams/cvParam"),
        );
    if cross_linking {
        protocol = protocol.with_cv_param(
            CvParam::new("MS:1002494", "cross-linking search").at_path("SearchType/cvParam"),
        );
    }
    protocol
}

fn scan_document(cross_linking: bool) -> InMemoryDocument {
    InMemoryDocument::new(DocumentRoot::mzidentml("1.2.0")).with_elements(
        mandatory_elements()
            .into_iter()
            .filter(|e| e.kind != ElementKind::SpectrumIdentificationProtocol)
            .chain([protocol_with_extras(cross_linking), sii(0, true)]),
    )
}

#[tokio::test]
async fn test_unanticipated_terms_respect_search_mode() {
    let config = config().with_unanticipated_term_scan(true);
    let mut validator = validator(rules(), config);
    let selected = SelectedOptions::new();

    let messages = validator
        .run(&scan_document(true), &selected, MessageLevel::Info)
        .await
        .unwrap();
    let flagged: Vec<_> = messages
        .iter()
        .filter(|m| m.rule_id() == Some(UNANTICIPATED_TERMS_RULE_ID))
        .collect();
    assert_eq!(flagged.len(), 1);
    assert_eq!(
        flagged[0].message,
        "CV term MS:1001328 (OMSSA:evalue) at \
         '/MzIdentML/AnalysisProtocolCollection/SpectrumIdentificationProtocol/AdditionalSearchParams/cvParam' \
         is not anticipated by any CV mapping rule"
    );
    assert_eq!(flagged[0].level, MessageLevel::Warn);

    // outside a cross-linking search the donor term is unexpected too
    let messages = validator
        .run(&scan_document(false), &selected, MessageLevel::Info)
        .await
        .unwrap();
    let flagged = messages
        .iter()
        .filter(|m| m.rule_id() == Some(UNANTICIPATED_TERMS_RULE_ID))
        .count();
    assert_eq!(flagged, 2);
}

#[tokio::test]
async fn test_unanticipated_scan_needs_cv_rules() {
    let rules = mzid_guard::rules::RuleRegistry::builder().object_rule(sii_rule());
    let mut validator = validator(rules, config().with_unanticipated_term_scan(true));

    let messages = validator
        .run(&scan_document(false), &SelectedOptions::new(), MessageLevel::Info)
        .await
        .unwrap();

    assert!(messages.is_empty(), "unexpected messages: {messages:?}");
}

#[tokio::test]
async fn test_self_check_flags_bad_mapping_terms() {
    let rules = rules().cv_rule(
        CvMappingRule::new("Broken_rule", ElementKind::Peptide, RequirementLevel::May)
            .with_term(CvTermSpec::new("MS:9999999", "no such term"))
            .with_term(CvTermSpec::new("not-an-accession", "junk"))
            .with_term(CvTermSpec::new("MS:1000584", "mzML file")),
    );
    let mut validator = validator(rules, config().with_cv_mapping_self_check(true));

    let messages = validator
        .run(&document(1, true), &SelectedOptions::new(), MessageLevel::Info)
        .await
        .unwrap();

    let findings: Vec<_> = messages.iter().filter(|m| m.rule_id().is_none()).collect();
    assert_eq!(findings.len(), 3);
    assert!(findings
        .iter()
        .any(|m| m.level == MessageLevel::Error && m.message.contains("MS:9999999")));
    assert!(findings
        .iter()
        .any(|m| m.level == MessageLevel::Error && m.message.contains("'not-an-accession'")));
    assert!(findings.iter().any(|m| m.level == MessageLevel::Warn
        && m.message.contains("the ontology calls it 'mzML format'")));
}

#[tokio::test]
async fn test_summary_feeds_formatters() {
    let mut validator = validator(rules(), config());

    let summary = validator
        .run_with_summary(&document(25, false), &SelectedOptions::new(), MessageLevel::Info)
        .await
        .unwrap();

    assert!(summary.has_errors());
    let human = mzid_guard::formatters::HumanFormatter::new()
        .format(&summary)
        .unwrap();
    assert!(human.contains("Validation FAILED"));
    assert!(human.contains("in 25 locations"));

    let json = mzid_guard::formatters::JsonFormatter::new()
        .format(&summary)
        .unwrap();
    let value: serde_json::Value = serde_json::from_str(&json).unwrap();
    assert_eq!(value["status"], "failure");
    assert_eq!(value["total_messages"], 1);
}
