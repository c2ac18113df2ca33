//! The validation orchestrator.
//!
//! [`MzIdentValidator::run`] drives an ordered, short-circuiting pipeline:
//!
//! 1. structural pre-check (one FATAL message and nothing else on failure)
//! 2. optional schema validation
//! 3. optional CV-mapping self-consistency check
//! 4. mandatory elements
//! 5. object rules over the version's element kinds
//! 6. CV-mapping rules, with the high-cardinality kind sent to the worker pool
//! 7. scan for CV terms no mapping rule anticipated
//!
//! Rule outcomes feed the [`RuleFilterResolver`] and the report as stages
//! complete. At the end the skip set filters the rule-owned messages and the
//! survivors are clustered.

use super::concurrent::ConcurrentElementValidator;
use super::dispatch::{check_cv_rules, check_object_rules, MessageSink, RuleExecution, RuleFamily};
use super::report::{ExtendedReport, ReportAggregator};
use super::{
    DocumentAccessor, InMemoryOntology, MessageLevel, OntologyService, RuleContext, RuleRef,
    SchemaValidator, SchemaVersion, SearchCharacteristics, ValidatorConfig, ValidatorMessage,
};
use crate::cluster::{ClusteredMessage, MessageClusterer};
use crate::filter::{RuleFilterResolver, RuleFilterSpec, SelectedOptions};
use crate::log_stage;
use crate::prelude::*;
use crate::rules::{
    RuleRegistry, RuleRegistryBuilder, MANDATORY_ELEMENTS_RULE_ID, UNANTICIPATED_TERMS_RULE_ID,
};
use chrono::{DateTime, Utc};
use once_cell::sync::Lazy;
use regex::Regex;
use serde::Serialize;
use std::collections::{BTreeMap, HashSet};
use std::sync::Arc;
use std::time::Instant;
use tracing::{debug, info, instrument, warn};

static ACCESSION: Lazy<Regex> = Lazy::new(|| {
    #[allow(clippy::expect_used)]
    Regex::new(r"^[A-Za-z][A-Za-z0-9_-]*:\d+$").expect("Hard-coded regex pattern should be valid")
});

/// Counters of the last run.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct RunStats {
    /// Elements checked by the serial stages
    pub elements_checked: usize,
    /// Elements checked by the worker pool
    pub concurrent_elements: usize,
    /// Workers the pool used
    pub workers: usize,
    /// Serially visited elements that every registered object rule declined
    pub declined_elements: usize,
    /// Rules in the final skip set
    pub skipped_rules: usize,
    /// Whether the structural pre-check stopped the run
    pub halted: bool,
    pub duration_ms: u64,
}

/// Everything a formatter needs to present a run.
#[derive(Debug, Clone, Serialize)]
pub struct RunSummary {
    pub started_at: DateTime<Utc>,
    pub min_level: MessageLevel,
    pub messages: Vec<ClusteredMessage>,
    pub report: ExtendedReport,
    pub stats: RunStats,
}

impl RunSummary {
    /// Number of clusters at or above `level`.
    pub fn count_at_least(&self, level: MessageLevel) -> usize {
        self.messages
            .iter()
            .filter(|m| m.level.is_at_least(level))
            .count()
    }

    /// Whether the run produced any ERROR or FATAL finding.
    pub fn has_errors(&self) -> bool {
        self.count_at_least(MessageLevel::Error) > 0
    }
}

/// Validates mzIdentML documents against a fixed rule set.
///
/// The validator owns the run-scoped state (skip set, report, raw
/// messages), so it is reused across documents by calling `run` again;
/// every run starts from a reset state.
///
/// # Examples
///
/// ```rust
/// use mzid_guard::core::{
///     DocumentRoot, Element, ElementKind, InMemoryDocument, MessageLevel, MzIdentValidator,
///     ValidatorConfig,
/// };
/// use mzid_guard::filter::SelectedOptions;
/// use mzid_guard::rules::{RequiredAttributeRule, RuleRegistry};
///
/// # async fn example() -> mzid_guard::prelude::Result<()> {
/// let rules = RuleRegistry::builder().object_rule(RequiredAttributeRule::new(
///     "PeptideSequenceRule",
///     ElementKind::Peptide,
///     "PeptideSequence",
/// ));
/// let mut validator = MzIdentValidator::builder(rules)
///     .config(ValidatorConfig::lenient().with_mandatory_elements([]))
///     .build()?;
///
/// let document = InMemoryDocument::new(DocumentRoot::mzidentml("1.2.0"))
///     .with_element(Element::new(ElementKind::Peptide).with_id("PEP_1"));
/// let messages = validator
///     .run(&document, &SelectedOptions::new(), MessageLevel::Warn)
///     .await?;
///
/// assert_eq!(messages.len(), 1);
/// assert!(validator.report().object_rules_invalid.contains("PeptideSequenceRule"));
/// # Ok(())
/// # }
/// ```
pub struct MzIdentValidator {
    config: ValidatorConfig,
    registry: Arc<RuleRegistry>,
    ontology: Arc<dyn OntologyService>,
    schema: Option<Arc<dyn SchemaValidator>>,
    resolver: RuleFilterResolver,
    aggregator: ReportAggregator,
    messages: BTreeMap<String, Vec<ValidatorMessage>>,
    ruleless: Vec<ValidatorMessage>,
    stats: RunStats,
}

impl std::fmt::Debug for MzIdentValidator {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("MzIdentValidator")
            .field("config", &self.config)
            .field("rules", &self.registry.len())
            .field("schema", &self.schema.is_some())
            .field("skipped", &self.resolver.skip_set().len())
            .finish_non_exhaustive()
    }
}

impl MzIdentValidator {
    /// Starts building a validator over the given rules.
    pub fn builder(rules: RuleRegistryBuilder) -> MzIdentValidatorBuilder {
        MzIdentValidatorBuilder::new(rules)
    }

    /// The active configuration.
    pub fn config(&self) -> &ValidatorConfig {
        &self.config
    }

    /// The registered rules.
    pub fn registry(&self) -> &RuleRegistry {
        &self.registry
    }

    /// The rule filter in use.
    pub fn rule_filter(&self) -> &RuleFilterSpec {
        self.resolver.spec()
    }

    /// Snapshot of the rule buckets of the current or last run.
    pub fn report(&self) -> ExtendedReport {
        self.aggregator.report().clone()
    }

    /// Counters of the last run.
    pub fn stats(&self) -> &RunStats {
        &self.stats
    }

    /// Clears the skip set, the report and every accumulated message.
    pub fn reset_run_state(&mut self) {
        self.resolver.reset();
        self.aggregator.reset();
        self.messages.clear();
        self.ruleless.clear();
        self.stats = RunStats::default();
    }

    /// Validates a document.
    ///
    /// Returns the clustered findings at or above `min_level`. A document
    /// failing the structural pre-check yields exactly one FATAL message.
    ///
    /// # Errors
    ///
    /// Fails when the schema validator cannot run, the document accessor
    /// cannot produce elements, the ontology cannot be queried during the
    /// self-check, or a validation worker dies.
    #[instrument(skip(self, document, selected), fields(
        run.min_level = %min_level,
        rules.object = self.registry.object_rules().len(),
        rules.cv = self.registry.cv_rules().len(),
        run.selected = selected.iter().count()
    ))]
    pub async fn run(
        &mut self,
        document: &dyn DocumentAccessor,
        selected: &SelectedOptions,
        min_level: MessageLevel,
    ) -> Result<Vec<ClusteredMessage>> {
        self.reset_run_state();
        let start = Instant::now();
        info!(
            rules.object = self.registry.object_rules().len(),
            rules.cv = self.registry.cv_rules().len(),
            "Starting mzIdentML validation"
        );

        let version = match structural_check(document) {
            Ok(version) => version,
            Err(fatal) => {
                warn!(message = %fatal.message, "Document failed the structural pre-check");
                self.stats.halted = true;
                self.ruleless.push(fatal);
                return Ok(self.finish(start));
            }
        };

        self.resolver.apply_selected_options(selected);

        self.schema_stage(document, min_level)?;
        if self.config.cv_mapping_self_check {
            self.cv_mapping_self_check(min_level)?;
        }

        let search = SearchCharacteristics::detect(document)?;
        debug!(
            document.version = %version,
            search.modes = ?search.modes().collect::<Vec<_>>(),
            "Search characteristics detected"
        );
        let ctx = RuleContext::new(version, search, Arc::clone(&self.ontology));

        let mut sink = MessageSink::new(min_level);
        self.mandatory_stage(document, &mut sink)?;
        self.absorb(sink);

        let mut sink = MessageSink::new(min_level);
        let checked = self.object_stage(document, &ctx, &mut sink)?;
        self.stats.elements_checked += checked;
        self.absorb(sink);

        let mut sink = MessageSink::new(min_level);
        self.stats.elements_checked += self.cv_stage(document, &ctx, &mut sink)?;
        self.absorb(sink);

        self.concurrent_stage(document, &ctx, min_level).await?;

        let resolved: Vec<String> = self
            .registry
            .cv_rules()
            .iter()
            .filter(|rule| rule.scope_kind().is_some())
            .map(|rule| rule.id.clone())
            .collect();
        self.aggregator
            .close_cv_stage(resolved.iter().map(String::as_str));

        self.unanticipated_term_scan(document, &ctx, min_level)?;

        Ok(self.finish(start))
    }

    /// Runs a document and bundles the findings with the report and counters.
    pub async fn run_with_summary(
        &mut self,
        document: &dyn DocumentAccessor,
        selected: &SelectedOptions,
        min_level: MessageLevel,
    ) -> Result<RunSummary> {
        let started_at = Utc::now();
        let messages = self.run(document, selected, min_level).await?;
        Ok(RunSummary {
            started_at,
            min_level,
            messages,
            report: self.report(),
            stats: self.stats.clone(),
        })
    }

    fn push_ruleless(&mut self, message: ValidatorMessage, min_level: MessageLevel) {
        if message.level.is_at_least(min_level) {
            self.ruleless.push(message);
        }
    }

    /// Feeds a stage's executions to the resolver and the report, and keeps
    /// the messages that passed the threshold.
    fn absorb(&mut self, sink: MessageSink) {
        for (rule_id, tally) in sink.into_tallies() {
            for valid in tally.outcomes() {
                self.aggregator.record_execution(&rule_id, valid);
                self.resolver.observe_outcome(&rule_id, valid);
            }
            if tally.family == RuleFamily::Cv && tally.had_data {
                self.aggregator.record_cv_data(&rule_id);
            }
            if !tally.messages.is_empty() {
                self.messages
                    .entry(rule_id)
                    .or_default()
                    .extend(tally.messages);
            }
        }
    }

    fn schema_stage(
        &mut self,
        document: &dyn DocumentAccessor,
        min_level: MessageLevel,
    ) -> Result<()> {
        if !self.config.schema_validation {
            return Ok(());
        }
        let Some(schema) = self.schema.clone() else {
            warn!("Schema validation is enabled but no schema validator is configured");
            return Ok(());
        };
        log_stage!(self.config.log, stage = "schema", "Validating against the schema");
        let defects = schema.validate(document)?;
        info!(defects = defects.len(), "Schema validation completed");
        for defect in defects {
            let text = defect.to_string();
            self.aggregator.add_schema_defect(text.clone());
            self.push_ruleless(ValidatorMessage::new(text, defect.level), min_level);
        }
        Ok(())
    }

    fn cv_mapping_self_check(&mut self, min_level: MessageLevel) -> Result<()> {
        log_stage!(
            self.config.log,
            stage = "cv_self_check",
            "Checking CV mapping rules against the ontology"
        );
        let registry = Arc::clone(&self.registry);
        let mut findings = Vec::new();
        for rule in registry.cv_rules() {
            for term in &rule.terms {
                if !ACCESSION.is_match(&term.accession) {
                    findings.push(ValidatorMessage::new(
                        format!(
                            "CV mapping rule '{}' references malformed accession '{}'",
                            rule.id, term.accession
                        ),
                        MessageLevel::Error,
                    ));
                    continue;
                }
                match self.ontology.term_name(&term.cv_ref, &term.accession)? {
                    None => findings.push(ValidatorMessage::new(
                        format!(
                            "CV mapping rule '{}' references {} which is not in {}",
                            rule.id, term.accession, term.cv_ref
                        ),
                        MessageLevel::Error,
                    )),
                    Some(name) if !term.name.is_empty() && name != term.name => {
                        findings.push(ValidatorMessage::new(
                            format!(
                                "CV mapping rule '{}' names {} '{}' but the ontology calls it '{}'",
                                rule.id, term.accession, term.name, name
                            ),
                            MessageLevel::Warn,
                        ))
                    }
                    Some(_) => {}
                }
            }
        }
        debug!(findings = findings.len(), "CV mapping self-check completed");
        for finding in findings {
            self.push_ruleless(finding, min_level);
        }
        Ok(())
    }

    fn mandatory_stage(
        &self,
        document: &dyn DocumentAccessor,
        sink: &mut MessageSink,
    ) -> Result<()> {
        let rule = RuleRef::new(MANDATORY_ELEMENTS_RULE_ID);
        for &kind in &self.config.mandatory_elements {
            let messages = if document.first(kind)?.is_some() {
                Vec::new()
            } else {
                debug!(element.kind = ?kind, "Mandatory element missing");
                vec![ValidatorMessage::for_rule(
                    rule.clone(),
                    format!("Mandatory element {} is missing", kind.element_name()),
                    MessageLevel::Error,
                )
                .at(kind.xpath())]
            };
            sink.record(RuleExecution {
                rule_id: MANDATORY_ELEMENTS_RULE_ID.to_string(),
                family: RuleFamily::Object,
                messages,
                had_data: true,
            });
        }
        Ok(())
    }

    fn object_stage(
        &mut self,
        document: &dyn DocumentAccessor,
        ctx: &RuleContext,
        sink: &mut MessageSink,
    ) -> Result<usize> {
        log_stage!(self.config.log, stage = "object_rules", "Applying object rules");
        let mut checked = 0;
        for kind in ctx.version().object_rule_kinds() {
            if self.config.concurrent_kind == Some(kind) {
                continue;
            }
            if !self.registry.has_object_rules_for(kind) {
                crate::perf_debug!(
                    self.config.log,
                    element.kind = ?kind,
                    "No object rules registered"
                );
                continue;
            }
            let mut instances = 0;
            let mut declined = 0;
            for element in document.elements(kind)? {
                instances += 1;
                let dispatch = check_object_rules(&self.registry, &element, ctx, &self.config.log);
                if !dispatch.accepted {
                    declined += 1;
                }
                sink.record_all(dispatch.executions);
            }
            if declined > 0 {
                warn!(
                    element.kind = ?kind,
                    instances,
                    declined,
                    "Object rules are registered for this kind but some instances were not checked"
                );
            }
            self.stats.declined_elements += declined;
            checked += instances;
        }
        Ok(checked)
    }

    fn cv_stage(
        &mut self,
        document: &dyn DocumentAccessor,
        ctx: &RuleContext,
        sink: &mut MessageSink,
    ) -> Result<usize> {
        log_stage!(self.config.log, stage = "cv_rules", "Applying CV mapping rules");
        let registry = Arc::clone(&self.registry);
        for rule in registry.unresolved_cv_rules() {
            self.aggregator.mark_invalid_xpath(&rule.id);
        }

        let mut checked = 0;
        for kind in ctx.version().cv_mapping_kinds() {
            if self.config.concurrent_kind == Some(kind) || !registry.has_cv_rules_for(kind) {
                continue;
            }
            for element in document.elements(kind)? {
                checked += 1;
                sink.record_all(check_cv_rules(&registry, &element, ctx, &self.config.log));
            }
        }
        Ok(checked)
    }

    async fn concurrent_stage(
        &mut self,
        document: &dyn DocumentAccessor,
        ctx: &RuleContext,
        min_level: MessageLevel,
    ) -> Result<()> {
        let Some(kind) = self.config.concurrent_kind else {
            return Ok(());
        };
        if !self.registry.has_cv_rules_for(kind) && !self.registry.has_object_rules_for(kind) {
            debug!(element.kind = ?kind, "No rules for the concurrently validated kind");
            return Ok(());
        }
        let elements: Vec<_> = document.elements(kind)?.collect();
        log_stage!(
            self.config.log,
            stage = "concurrent",
            element.kind = ?kind,
            elements = elements.len(),
            "Validating high-cardinality elements"
        );
        let outcome = ConcurrentElementValidator::new(Arc::clone(&self.registry))
            .with_workers(self.config.workers())
            .with_log_config(self.config.log.clone())
            .validate(elements, ctx, min_level)
            .await?;
        self.stats.concurrent_elements = outcome.visited;
        self.stats.workers = outcome.workers;
        self.absorb(outcome.sink);
        Ok(())
    }

    fn unanticipated_term_scan(
        &mut self,
        document: &dyn DocumentAccessor,
        ctx: &RuleContext,
        min_level: MessageLevel,
    ) -> Result<()> {
        if !self.config.unanticipated_term_scan {
            return Ok(());
        }
        if self.registry.cv_rules().is_empty() {
            debug!("No CV mapping rules, skipping the unanticipated term scan");
            return Ok(());
        }
        log_stage!(
            self.config.log,
            stage = "unanticipated_terms",
            "Scanning for unmapped CV terms"
        );

        let covered = self.registry.covered_term_xpaths();
        let excused: HashSet<&str> = ctx
            .search()
            .modes()
            .filter_map(|mode| self.config.unmapped_terms.get(&mode))
            .flatten()
            .map(String::as_str)
            .collect();
        let rule = RuleRef::new(UNANTICIPATED_TERMS_RULE_ID);
        let mut found = Vec::new();
        for kind in ctx.version().cv_mapping_kinds() {
            for element in document.elements(kind)? {
                for param in &element.cv_params {
                    let xpath = element.term_xpath(param);
                    if covered.contains(&xpath) || excused.contains(param.accession.as_str()) {
                        continue;
                    }
                    found.push(
                        ValidatorMessage::for_rule(
                            rule.clone(),
                            format!(
                                "CV term {} ({}) at '{}' is not anticipated by any CV mapping rule",
                                param.accession, param.name, xpath
                            ),
                            MessageLevel::Warn,
                        )
                        .at(element.location.clone()),
                    );
                }
            }
        }

        debug!(terms = found.len(), "Unanticipated term scan completed");
        if !found.is_empty() && MessageLevel::Warn.is_at_least(min_level) {
            self.messages
                .entry(UNANTICIPATED_TERMS_RULE_ID.to_string())
                .or_default()
                .extend(found);
        }
        Ok(())
    }

    /// Filters by the skip set, reclassifies skipped rules and clusters.
    fn finish(&mut self, start: Instant) -> Vec<ClusteredMessage> {
        let (kept, dropped) = self.resolver.filter_messages(std::mem::take(&mut self.messages));
        let skipped: Vec<String> = self.resolver.skip_set().iter().map(String::from).collect();
        for rule_id in &skipped {
            self.aggregator.mark_skipped(rule_id);
        }
        self.stats.skipped_rules = skipped.len();

        let raw = std::mem::take(&mut self.ruleless)
            .into_iter()
            .chain(kept.into_values().flatten());
        let clustered = MessageClusterer::cluster(raw);
        self.stats.duration_ms = start.elapsed().as_millis() as u64;

        info!(
            clusters = clustered.len(),
            rules.skipped = skipped.len(),
            rules.dropped_with_messages = dropped.len(),
            elements = self.stats.elements_checked + self.stats.concurrent_elements,
            duration_ms = self.stats.duration_ms,
            "mzIdentML validation completed"
        );
        clustered
    }
}

/// Rejects documents that cannot be validated at all.
fn structural_check(
    document: &dyn DocumentAccessor,
) -> std::result::Result<SchemaVersion, ValidatorMessage> {
    let fatal = |text: String| ValidatorMessage::new(text, MessageLevel::Fatal);
    let root = match document.root() {
        Ok(Some(root)) => root,
        Ok(None) => return Err(fatal("The document is empty".to_string())),
        Err(e) => return Err(fatal(format!("The document is not well-formed: {e}"))),
    };
    if root.name != "MzIdentML" {
        return Err(fatal(format!(
            "Unexpected root element '{}': expected 'MzIdentML'",
            root.name
        )));
    }
    let Some(version) = root.version.as_deref() else {
        return Err(fatal(
            "The MzIdentML root element has no version attribute".to_string(),
        ));
    };
    SchemaVersion::parse(version)
        .map_err(|_| fatal(format!("Unsupported mzIdentML version '{version}'")))
}

/// Builder for [`MzIdentValidator`].
pub struct MzIdentValidatorBuilder {
    rules: RuleRegistryBuilder,
    config: ValidatorConfig,
    ontology: Option<Arc<dyn OntologyService>>,
    schema: Option<Arc<dyn SchemaValidator>>,
    filter: RuleFilterSpec,
}

impl MzIdentValidatorBuilder {
    fn new(rules: RuleRegistryBuilder) -> Self {
        Self {
            rules,
            config: ValidatorConfig::default(),
            ontology: None,
            schema: None,
            filter: RuleFilterSpec::empty(),
        }
    }

    pub fn config(mut self, config: ValidatorConfig) -> Self {
        self.config = config;
        self
    }

    pub fn ontology<O: OntologyService + 'static>(mut self, ontology: O) -> Self {
        self.ontology = Some(Arc::new(ontology));
        self
    }

    pub fn shared_ontology(mut self, ontology: Arc<dyn OntologyService>) -> Self {
        self.ontology = Some(ontology);
        self
    }

    pub fn schema_validator<S: SchemaValidator + 'static>(mut self, schema: S) -> Self {
        self.schema = Some(Arc::new(schema));
        self
    }

    pub fn rule_filter(mut self, filter: RuleFilterSpec) -> Self {
        self.filter = filter;
        self
    }

    /// Validates the configuration and the rule set.
    ///
    /// # Errors
    ///
    /// Returns [`ValidatorError::Configuration`] for an invalid rule set or
    /// inconsistent settings.
    pub fn build(self) -> Result<MzIdentValidator> {
        self.config.validate()?;
        let registry = self.rules.build()?;

        let object_ids = registry
            .object_rule_ids()
            .into_iter()
            .chain(std::iter::once(MANDATORY_ELEMENTS_RULE_ID.to_string()));
        let aggregator = ReportAggregator::new(object_ids, registry.cv_rule_ids());

        debug!(
            rules.object = registry.object_rules().len(),
            rules.cv = registry.cv_rules().len(),
            filter.conditions = self.filter.conditions.len(),
            "Validator built"
        );

        Ok(MzIdentValidator {
            config: self.config,
            registry: Arc::new(registry),
            ontology: self
                .ontology
                .unwrap_or_else(|| Arc::new(InMemoryOntology::new())),
            schema: self.schema,
            resolver: RuleFilterResolver::new(self.filter),
            aggregator,
            messages: BTreeMap::new(),
            ruleless: Vec::new(),
            stats: RunStats::default(),
        })
    }
}
