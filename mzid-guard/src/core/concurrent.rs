//! Parallel validation of the high-cardinality element kind.
//!
//! Identification items can number in the hundreds of thousands, so their
//! instances are pre-materialized and handed to a fixed group of blocking
//! workers. Each worker repeatedly claims the next element from a shared
//! [`ElementCursor`], runs the CV-mapping rules and then the object rules on
//! it, and keeps the executions tagged with the element's position. Draining
//! the `JoinSet` is the barrier: once every worker has seen the cursor run
//! dry, the batches are recorded into one [`MessageSink`] in document order,
//! so the merged result does not depend on how the workers interleaved.

use super::dispatch::{check_cv_rules, check_object_rules, MessageSink};
use super::{Element, MessageLevel, RuleContext, RuleExecution};
use crate::logging::LogConfig;
use crate::prelude::*;
use crate::rules::RuleRegistry;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Instant;
use tokio::task::JoinSet;
use tracing::{debug, error, info, instrument};

/// Hands out each element of a fixed list exactly once.
#[derive(Debug)]
pub struct ElementCursor {
    elements: Arc<[Element]>,
    next: AtomicUsize,
}

impl ElementCursor {
    pub fn new(elements: impl Into<Arc<[Element]>>) -> Self {
        Self {
            elements: elements.into(),
            next: AtomicUsize::new(0),
        }
    }

    /// Claims the next unclaimed element with its position, or `None` once
    /// exhausted.
    pub fn take_next(&self) -> Option<(usize, &Element)> {
        let index = self.next.fetch_add(1, Ordering::Relaxed);
        self.elements.get(index).map(|element| (index, element))
    }

    pub fn len(&self) -> usize {
        self.elements.len()
    }

    pub fn is_empty(&self) -> bool {
        self.elements.is_empty()
    }
}

/// Executions of one element, keyed by its position in the input list.
type IndexedExecutions = (usize, Vec<RuleExecution>);

/// What one worker hands back at fan-in.
struct WorkerBatch {
    visited: usize,
    executions: Vec<IndexedExecutions>,
}

/// Result of the concurrent stage.
#[derive(Debug)]
pub struct ConcurrentOutcome {
    /// Executions of every rule, merged from all workers
    pub sink: MessageSink,
    /// Elements checked across all workers
    pub visited: usize,
    /// Workers spawned, zero when the stage was skipped
    pub workers: usize,
}

/// Validates every instance of one element kind on a worker pool.
///
/// # Examples
///
/// ```rust
/// use mzid_guard::core::{
///     ConcurrentElementValidator, Element, ElementKind, InMemoryOntology, MessageLevel,
///     RuleContext, SchemaVersion, SearchCharacteristics,
/// };
/// use mzid_guard::rules::{RequiredAttributeRule, RuleRegistry};
/// use std::sync::Arc;
///
/// # async fn example() -> mzid_guard::prelude::Result<()> {
/// let registry = RuleRegistry::builder()
///     .object_rule(RequiredAttributeRule::new(
///         "SII_Rule",
///         ElementKind::SpectrumIdentificationItem,
///         "calculatedMassToCharge",
///     ))
///     .build()?;
/// let validator = ConcurrentElementValidator::new(Arc::new(registry)).with_workers(4);
/// let ctx = RuleContext::new(
///     SchemaVersion::V1_2,
///     SearchCharacteristics::default(),
///     Arc::new(InMemoryOntology::new()),
/// );
/// let items: Vec<Element> = (0..100)
///     .map(|i| Element::new(ElementKind::SpectrumIdentificationItem).with_id(format!("SII_{i}")))
///     .collect();
///
/// let outcome = validator.validate(items, &ctx, MessageLevel::Warn).await?;
/// assert_eq!(outcome.visited, 100);
/// # Ok(())
/// # }
/// ```
#[derive(Debug, Clone)]
pub struct ConcurrentElementValidator {
    registry: Arc<RuleRegistry>,
    workers: usize,
    log: LogConfig,
}

impl ConcurrentElementValidator {
    /// One worker per CPU.
    pub fn new(registry: Arc<RuleRegistry>) -> Self {
        Self {
            registry,
            workers: num_cpus::get().max(1),
            log: LogConfig::default(),
        }
    }

    pub fn with_workers(mut self, workers: usize) -> Self {
        self.workers = workers.max(1);
        self
    }

    pub fn with_log_config(mut self, log: LogConfig) -> Self {
        self.log = log;
        self
    }

    /// Whether any rule would look at `element`.
    fn matches_any_rule(&self, element: &Element) -> bool {
        self.registry.has_cv_rules_for(element.kind)
            || self
                .registry
                .object_rules_for(element.kind)
                .any(|rule| rule.can_check(element))
    }

    /// Validates `elements` and merges what every worker found.
    ///
    /// Returns without spawning workers when the list is empty or when its
    /// first element matches no registered rule.
    #[instrument(skip_all, fields(elements = elements.len(), workers = self.workers))]
    pub async fn validate(
        &self,
        elements: Vec<Element>,
        ctx: &RuleContext,
        min_level: MessageLevel,
    ) -> Result<ConcurrentOutcome> {
        let skipped = ConcurrentOutcome {
            sink: MessageSink::new(min_level),
            visited: 0,
            workers: 0,
        };
        let Some(first) = elements.first() else {
            return Ok(skipped);
        };
        if !self.matches_any_rule(first) {
            debug!(
                element.kind = ?first.kind,
                "No rule configured for the concurrently validated kind"
            );
            return Ok(skipped);
        }

        let start = Instant::now();
        let total = elements.len();
        let cursor = Arc::new(ElementCursor::new(elements));
        let workers = self.workers.min(total);

        let mut set = JoinSet::new();
        for worker in 0..workers {
            let cursor = Arc::clone(&cursor);
            let registry = Arc::clone(&self.registry);
            let ctx = ctx.clone();
            let log = self.log.clone();
            set.spawn_blocking(move || {
                let mut batch = WorkerBatch {
                    visited: 0,
                    executions: Vec::new(),
                };
                while let Some((index, element)) = cursor.take_next() {
                    let mut executions = check_cv_rules(&registry, element, &ctx, &log);
                    executions
                        .extend(check_object_rules(&registry, element, &ctx, &log).executions);
                    batch.visited += 1;
                    if !executions.is_empty() {
                        batch.executions.push((index, executions));
                    }
                }
                debug!(worker, visited = batch.visited, "Worker finished");
                batch
            });
        }

        // every worker is joined before an error is returned
        let mut visited = 0;
        let mut batches = Vec::with_capacity(workers);
        let mut first_error = None;
        while let Some(joined) = set.join_next().await {
            match joined {
                Ok(batch) => {
                    visited += batch.visited;
                    batches.push(batch.executions);
                }
                Err(e) => {
                    error!(error = %e, "Validation worker failed");
                    first_error.get_or_insert_with(|| {
                        ValidatorError::Internal(format!("validation worker failed: {e}"))
                    });
                }
            }
        }
        if let Some(e) = first_error {
            return Err(e);
        }

        let sink = merge_in_order(batches, min_level);

        info!(
            visited,
            workers,
            rules = sink.len(),
            duration_ms = start.elapsed().as_millis() as u64,
            "Concurrent validation completed"
        );

        Ok(ConcurrentOutcome {
            sink,
            visited,
            workers,
        })
    }
}

/// Records every batch into one sink in ascending element position.
fn merge_in_order(batches: Vec<Vec<IndexedExecutions>>, min_level: MessageLevel) -> MessageSink {
    let mut indexed: Vec<IndexedExecutions> = batches.into_iter().flatten().collect();
    indexed.sort_unstable_by_key(|(index, _)| *index);

    let mut sink = MessageSink::new(min_level);
    for (_, executions) in indexed {
        sink.record_all(executions);
    }
    sink
}
