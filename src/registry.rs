//! Issue registry and deduplicating executor.
//!
//! Every issue type is owned by exactly one [`Analyzer`]. Analyzers that own
//! several issue types compute them in a single pass, so requesting any one of
//! those types pulls in its siblings and the pass still runs once.
//!
//! ```rust,ignore
//! let registry = IssueRegistry::with_default_analyzers(CheckConfig::default());
//! let report = registry.run("duplicate-network", &store, false)?;
//! assert!(report.findings.contains_key(&IssueType::DuplicateRouter));
//! ```

use crate::checks::{Analyzer, AnalyzerOutput, default_analyzers};
use crate::config::CheckConfig;
use crate::error::{CheckError, Result};
use crate::finding::{Finding, IssueCategory, IssueType, Severity};
use crate::graph::BacnetGraph;
use crate::metrics::{CheckMetrics, METRICS};
use crate::store::{Triple, TripleSource};
use indexmap::IndexMap;
use serde::Serialize;
use std::collections::{BTreeMap, BTreeSet, HashSet};
use std::panic::{AssertUnwindSafe, catch_unwind};
use std::str::FromStr;
use std::sync::Arc;
use std::time::Instant;

/// Selector that expands to every registered issue type.
pub const ALL_SELECTOR: &str = "all";

/// Analyzers slower than this are logged at `warn`.
const SLOW_ANALYZER_MS: u64 = 500;

/// Catalog row for one issue type.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct CatalogEntry {
    pub issue_type: IssueType,
    pub description: &'static str,
    pub category: IssueCategory,
    pub single_check: bool,
    pub related_types: Vec<IssueType>,
}

/// An analyzer that failed during `execute_checks`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct AnalyzerFailure {
    pub analyzer: String,
    pub issue_types: Vec<IssueType>,
    pub error: String,
    pub error_type: &'static str,
}

/// Aggregated result of one `execute_checks` call.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct CheckReport {
    /// One bucket per issue type whose analyzer ran, empty buckets included.
    pub findings: BTreeMap<IssueType, Vec<Finding>>,
    pub affected_entities: BTreeSet<String>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub failures: Vec<AnalyzerFailure>,
    /// Analyzer keys in execution order.
    pub executed: Vec<String>,
}

impl CheckReport {
    pub fn total_findings(&self) -> usize {
        self.findings.values().map(Vec::len).sum()
    }

    /// Drives the non-zero exit status of a presentation layer.
    pub fn has_findings(&self) -> bool {
        self.findings.values().any(|bucket| !bucket.is_empty())
    }

    pub fn findings_for(&self, issue_type: IssueType) -> &[Finding] {
        self.findings
            .get(&issue_type)
            .map(Vec::as_slice)
            .unwrap_or_default()
    }

    pub fn severity_counts(&self) -> BTreeMap<Severity, usize> {
        let mut counts = BTreeMap::new();
        for finding in self.findings.values().flatten() {
            *counts.entry(finding.severity).or_insert(0) += 1;
        }
        counts
    }

    /// Every triple whose subject is an affected entity, for verbose dumps.
    pub fn affected_triples(&self, source: &dyn TripleSource) -> Result<Vec<Triple>> {
        let mut triples = Vec::new();
        for entity in &self.affected_entities {
            triples.extend(source.match_pattern(Some(entity), None, None)?);
        }
        Ok(triples)
    }

    fn absorb(&mut self, issue_types: &[IssueType], output: AnalyzerOutput) {
        for issue_type in issue_types {
            self.findings.entry(*issue_type).or_default();
        }
        for finding in output.findings {
            self.findings
                .entry(finding.issue_type)
                .or_default()
                .push(finding);
        }
        self.affected_entities.extend(output.affected);
    }
}

/// Maps issue types to the analyzers that compute them.
pub struct IssueRegistry {
    config: CheckConfig,
    owners: IndexMap<IssueType, Arc<dyn Analyzer>>,
    metrics: Arc<CheckMetrics>,
}

impl IssueRegistry {
    /// Registry with no analyzers.
    pub fn new(config: CheckConfig) -> Self {
        Self {
            config,
            owners: IndexMap::new(),
            metrics: METRICS.clone(),
        }
    }

    pub fn with_default_analyzers(config: CheckConfig) -> Self {
        let mut registry = Self::new(config);
        for analyzer in default_analyzers() {
            registry.register(analyzer);
        }
        registry
    }

    pub fn with_metrics(mut self, metrics: Arc<CheckMetrics>) -> Self {
        self.metrics = metrics;
        self
    }

    /// Registers an analyzer for every issue type it declares. A later
    /// registration takes over issue types an earlier one already owned.
    pub fn register(&mut self, analyzer: Arc<dyn Analyzer>) {
        for issue_type in analyzer.issue_types() {
            if let Some(previous) = self.owners.insert(*issue_type, analyzer.clone()) {
                tracing::warn!(
                    issue_type = issue_type.as_str(),
                    previous = previous.key(),
                    replacement = analyzer.key(),
                    "issue type re-registered"
                );
            }
        }
    }

    pub fn config(&self) -> &CheckConfig {
        &self.config
    }

    pub fn metrics(&self) -> &Arc<CheckMetrics> {
        &self.metrics
    }

    /// Registered issue types in registration order.
    pub fn all_issue_types(&self) -> Vec<IssueType> {
        self.owners.keys().copied().collect()
    }

    pub fn cli_choices(&self) -> Vec<&'static str> {
        self.owners
            .keys()
            .map(|t| t.as_str())
            .chain(std::iter::once(ALL_SELECTOR))
            .collect()
    }

    pub fn description(&self, issue_type: IssueType) -> &'static str {
        if self.owners.contains_key(&issue_type) {
            issue_type.description()
        } else {
            "Unknown issue type"
        }
    }

    pub fn category(&self, issue_type: IssueType) -> IssueCategory {
        issue_type.category()
    }

    /// Other issue types computed by the same analyzer.
    pub fn related_types(&self, issue_type: IssueType) -> Vec<IssueType> {
        self.owners
            .get(&issue_type)
            .map(|analyzer| {
                analyzer
                    .issue_types()
                    .iter()
                    .copied()
                    .filter(|t| *t != issue_type)
                    .collect()
            })
            .unwrap_or_default()
    }

    /// Unregistered types count as single checks.
    pub fn is_single_check(&self, issue_type: IssueType) -> bool {
        self.owners
            .get(&issue_type)
            .is_none_or(|analyzer| analyzer.issue_types().len() == 1)
    }

    pub fn issues_by_category(&self, category: IssueCategory) -> Vec<IssueType> {
        self.owners
            .keys()
            .copied()
            .filter(|t| t.category() == category)
            .collect()
    }

    pub fn catalog(&self) -> Vec<CatalogEntry> {
        self.owners
            .keys()
            .map(|issue_type| CatalogEntry {
                issue_type: *issue_type,
                description: issue_type.description(),
                category: issue_type.category(),
                single_check: self.is_single_check(*issue_type),
                related_types: self.related_types(*issue_type),
            })
            .collect()
    }

    /// Expands a selector into the issue types to check.
    ///
    /// `"all"` yields every registered type. A registered type yields itself
    /// followed by its related types.
    pub fn resolve(&self, selector: &str) -> Result<Vec<IssueType>> {
        if selector == ALL_SELECTOR {
            return Ok(self.all_issue_types());
        }
        let issue_type = IssueType::from_str(selector)
            .ok()
            .filter(|t| self.owners.contains_key(t))
            .ok_or_else(|| CheckError::UnknownIssueType(selector.to_string()))?;

        let mut resolved = vec![issue_type];
        resolved.extend(self.related_types(issue_type));
        Ok(resolved)
    }

    /// Runs the analyzers owning `issues`, each at most once.
    ///
    /// A failing or panicking analyzer is recorded in
    /// [`CheckReport::failures`] and leaves its buckets empty; the remaining
    /// analyzers still run.
    pub fn execute_checks(
        &self,
        issues: &[IssueType],
        source: &dyn TripleSource,
        verbose: bool,
    ) -> CheckReport {
        let span = tracing::info_span!("execute_checks", requested = issues.len(), verbose);
        let _guard = span.enter();
        let start = Instant::now();

        self.metrics.record_execution();
        let graph = BacnetGraph::new(source, &self.config.vocabulary);
        let mut report = CheckReport::default();
        let mut executed: HashSet<String> = HashSet::new();

        for issue_type in issues {
            let Some(analyzer) = self.owners.get(issue_type) else {
                tracing::debug!(
                    issue_type = issue_type.as_str(),
                    "no analyzer registered, skipping"
                );
                continue;
            };
            let key = analyzer.key().to_string();
            if !executed.insert(key.clone()) {
                continue;
            }

            let analyzer_start = Instant::now();
            let outcome = catch_unwind(AssertUnwindSafe(|| {
                analyzer.analyze(&graph, &self.config, verbose)
            }))
            .unwrap_or_else(|payload| {
                Err(CheckError::AnalyzerPanicked {
                    analyzer: key.clone(),
                    message: panic_message(payload.as_ref()),
                })
            });
            let elapsed = analyzer_start.elapsed();

            match outcome {
                Ok(output) => {
                    self.metrics.record_success(&key, elapsed);
                    for finding in &output.findings {
                        self.metrics.record_findings(finding.issue_type.as_str(), 1);
                    }
                    crate::log_slow_operation!(
                        elapsed,
                        SLOW_ANALYZER_MS,
                        analyzer = %key,
                        findings = output.len(),
                        "analyzer completed"
                    );
                    report.absorb(analyzer.issue_types(), output);
                }
                Err(err) => {
                    tracing::error!(
                        analyzer = %key,
                        error = %err,
                        error_type = err.category(),
                        "analyzer failed"
                    );
                    self.metrics.record_failure(&key, elapsed, err.category());
                    report.absorb(analyzer.issue_types(), AnalyzerOutput::new());
                    report.failures.push(AnalyzerFailure {
                        analyzer: key.clone(),
                        issue_types: analyzer.issue_types().to_vec(),
                        error: err.to_string(),
                        error_type: err.category(),
                    });
                }
            }
            report.executed.push(key);
        }

        tracing::info!(
            analyzers = report.executed.len(),
            findings = report.total_findings(),
            failures = report.failures.len(),
            duration_ms = start.elapsed().as_millis() as u64,
            "checks completed"
        );
        report
    }

    /// Resolves `selector` and executes the matching checks.
    pub fn run(
        &self,
        selector: &str,
        source: &dyn TripleSource,
        verbose: bool,
    ) -> Result<CheckReport> {
        let issues = self.resolve(selector)?;
        Ok(self.execute_checks(&issues, source, verbose))
    }
}

fn panic_message(payload: &(dyn std::any::Any + Send)) -> String {
    if let Some(message) = payload.downcast_ref::<&str>() {
        (*message).to_string()
    } else if let Some(message) = payload.downcast_ref::<String>() {
        message.clone()
    } else {
        "unknown panic".to_string()
    }
}
