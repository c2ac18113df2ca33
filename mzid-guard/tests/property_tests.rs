//! Property-based tests for mzid-guard.
//!
//! ## Test Categories
//!
//! ### 1. Rule filter resolution
//! - Resolution is exactly the union of the selected options' rules and
//!   their references
//! - Answering more conditions never un-skips a rule
//!
//! ### 2. Report aggregation
//! - Every rule sits in exactly one outcome bucket per axis
//! - An invalid outcome is never overwritten
//!
//! ### 3. Clustering
//! - One cluster per (text, rule, level), no location counted twice
//! - Clusters are ordered by decreasing severity
//!
//! ### 4. End-to-end runs
//! - The cluster for a missing attribute counts exactly the defective items

mod common;

use common::*;
use mzid_guard::cluster::MessageClusterer;
use mzid_guard::core::{
    DocumentRoot, InMemoryDocument, MessageLevel, ReportAggregator, RuleRef, ValidatorMessage,
};
use mzid_guard::filter::{ConditionOption, RuleFilterResolver, RuleFilterSpec, SelectedOptions};
use proptest::prelude::*;
use std::collections::{BTreeSet, HashSet};

const CONDITIONS: [&str; 3] = ["DATABASE_TYPE", "SEARCH_ENGINE", "QUANTIFICATION"];
const OPTIONS: [&str; 2] = ["A", "B"];

fn level_strategy() -> impl Strategy<Value = MessageLevel> {
    prop_oneof![
        Just(MessageLevel::Debug),
        Just(MessageLevel::Info),
        Just(MessageLevel::Warn),
        Just(MessageLevel::Error),
        Just(MessageLevel::Fatal),
    ]
}

/// A filter where condition `c`, option `o` skips `R{c}{o}_{k}` rules and
/// option `B` also references a shared set.
fn filter_spec(rules_per_option: usize) -> RuleFilterSpec {
    let mut spec = RuleFilterSpec::empty().with_reference("shared", ["Shared_1", "Shared_2"]);
    for (c, condition) in CONDITIONS.iter().enumerate() {
        for (o, option) in OPTIONS.iter().enumerate() {
            let rules = (0..rules_per_option).map(|k| format!("R{c}{o}_{k}"));
            let mut definition = ConditionOption::rules(rules);
            if *option == "B" {
                definition = definition.with_reference("shared");
            }
            spec = spec.with_option(*condition, *option, definition);
        }
    }
    spec
}

fn selection(answers: &[Option<usize>]) -> SelectedOptions {
    answers
        .iter()
        .zip(CONDITIONS)
        .filter_map(|(answer, condition)| {
            answer.map(|o| (condition.to_string(), OPTIONS[o].to_string()))
        })
        .collect()
}

fn expected_rules(answers: &[Option<usize>], rules_per_option: usize) -> BTreeSet<String> {
    let mut expected = BTreeSet::new();
    for (c, answer) in answers.iter().enumerate() {
        let Some(o) = answer else { continue };
        expected.extend((0..rules_per_option).map(|k| format!("R{c}{o}_{k}")));
        if *o == 1 {
            expected.insert("Shared_1".to_string());
            expected.insert("Shared_2".to_string());
        }
    }
    expected
}

// ============================================================================
// Rule filter resolution
// ============================================================================

proptest! {
    #[test]
    fn test_resolution_is_exact(
        answers in prop::collection::vec(prop::option::of(0usize..2), 3),
        rules_per_option in 0usize..5
    ) {
        let resolver = RuleFilterResolver::new(filter_spec(rules_per_option));
        let resolved = resolver.resolve(&selection(&answers));
        prop_assert_eq!(resolved, expected_rules(&answers, rules_per_option));
    }

    #[test]
    fn test_more_answers_never_unskip(
        answers in prop::collection::vec(prop::option::of(0usize..2), 3),
        extra in prop::collection::vec(prop::option::of(0usize..2), 3)
    ) {
        // fill unanswered conditions from `extra`, keeping existing answers
        let widened: Vec<Option<usize>> = answers
            .iter()
            .zip(&extra)
            .map(|(a, e)| a.or(*e))
            .collect();
        let resolver = RuleFilterResolver::new(filter_spec(2));
        let narrow = resolver.resolve(&selection(&answers));
        let wide = resolver.resolve(&selection(&widened));
        prop_assert!(narrow.is_subset(&wide));
    }

    #[test]
    fn test_skip_set_only_grows(
        outcomes in prop::collection::vec((0usize..4, any::<bool>()), 0..40)
    ) {
        let spec = (0..4).fold(RuleFilterSpec::empty(), |spec, i| {
            spec.with_outcome_rule(format!("Rule_{i}"), true, [format!("Dep_{i}_valid")])
                .with_outcome_rule(format!("Rule_{i}"), false, [format!("Dep_{i}_invalid")])
        });
        let mut resolver = RuleFilterResolver::new(spec);
        let mut previous: BTreeSet<String> = BTreeSet::new();
        for (rule, valid) in outcomes {
            resolver.observe_outcome(&format!("Rule_{rule}"), valid);
            let current: BTreeSet<String> = resolver.skip_set().iter().map(String::from).collect();
            prop_assert!(previous.is_subset(&current));
            let suffix = if valid { "valid" } else { "invalid" };
            let expected = format!("Dep_{rule}_{suffix}");
            prop_assert!(resolver.is_skipped(&expected));
            previous = current;
        }
    }
}

// ============================================================================
// Report aggregation
// ============================================================================

proptest! {
    #[test]
    fn test_buckets_stay_disjoint_and_complete(
        events in prop::collection::vec((0usize..6, any::<bool>()), 0..60),
        skipped in prop::collection::vec(0usize..6, 0..3)
    ) {
        let object_ids: Vec<String> = (0..3).map(|i| format!("O{i}")).collect();
        let cv_ids: Vec<String> = (0..3).map(|i| format!("C{i}")).collect();
        let all: Vec<String> = object_ids.iter().chain(&cv_ids).cloned().collect();
        let mut aggregator = ReportAggregator::new(object_ids, cv_ids);

        let mut invalid_seen = HashSet::new();
        for (rule, valid) in &events {
            aggregator.record_execution(&all[*rule], *valid);
            if !valid {
                invalid_seen.insert(all[*rule].clone());
            }
        }
        for rule in &skipped {
            aggregator.mark_skipped(&all[*rule]);
        }

        let report = aggregator.report();
        prop_assert!(report.is_disjoint());
        prop_assert_eq!(report.object_rule_count(), 3);
        prop_assert_eq!(report.cv_rule_count(), 3);
        for id in &all {
            let is_skipped = skipped.iter().any(|s| &all[*s] == id);
            let invalid = report.object_rules_invalid.contains(id)
                || report.cv_rules_invalid.contains(id);
            prop_assert_eq!(invalid, invalid_seen.contains(id) && !is_skipped);
        }
    }
}

// ============================================================================
// Clustering
// ============================================================================

fn message_strategy() -> impl Strategy<Value = (usize, usize, MessageLevel, usize)> {
    (0usize..3, 0usize..3, level_strategy(), 0usize..20)
}

proptest! {
    #[test]
    fn test_cluster_counts(messages in prop::collection::vec(message_strategy(), 0..200)) {
        let raw: Vec<ValidatorMessage> = messages
            .iter()
            .map(|(rule, text, level, location)| {
                ValidatorMessage::for_rule(
                    RuleRef::new(format!("Rule_{rule}")),
                    format!("defect {text}"),
                    *level,
                )
                .at(format!("/MzIdentML/Peptide[@id='PEP_{location}']"))
            })
            .collect();

        let keys: HashSet<_> = messages.iter().map(|(r, t, l, _)| (*r, *t, *l)).collect();
        let placements: HashSet<_> = messages.iter().copied().collect();

        let clusters = MessageClusterer::cluster(raw);
        prop_assert_eq!(clusters.len(), keys.len());
        let occurrences: usize = clusters.iter().map(|c| c.occurrences()).sum();
        prop_assert_eq!(occurrences, placements.len());
        for pair in clusters.windows(2) {
            prop_assert!(pair[0].level >= pair[1].level);
        }
        for cluster in &clusters {
            let unique: HashSet<_> = cluster.locations.iter().collect();
            prop_assert_eq!(unique.len(), cluster.locations.len());
        }
    }
}

// ============================================================================
// End-to-end runs
// ============================================================================

proptest! {
    #![proptest_config(ProptestConfig::with_cases(16))]

    #[test]
    fn test_missing_attribute_cluster_counts_defects(
        present in prop::collection::vec(any::<bool>(), 1..300),
        workers in 1usize..8
    ) {
        let rt = tokio::runtime::Runtime::new().unwrap();
        rt.block_on(async {
            let document = InMemoryDocument::new(DocumentRoot::mzidentml("1.2.0"))
                .with_elements(mandatory_elements())
                .with_elements(present.iter().enumerate().map(|(i, &mz)| sii(i, mz)));
            let mut validator = validator(rules(), config().with_worker_count(workers));

            let messages = validator
                .run(&document, &SelectedOptions::new(), MessageLevel::Info)
                .await
                .unwrap();

            let missing = present.iter().filter(|&&mz| !mz).count();
            let report = validator.report();
            if missing == 0 {
                prop_assert!(messages.is_empty());
                prop_assert!(report.object_rules_valid.contains("SII_Rule"));
            } else {
                prop_assert_eq!(messages.len(), 1);
                prop_assert_eq!(messages[0].occurrences(), missing);
                prop_assert!(report.object_rules_invalid.contains("SII_Rule"));
            }
            prop_assert_eq!(validator.stats().concurrent_elements, present.len());
            Ok::<(), TestCaseError>(())
        })?;
    }
}
