/// Prometheus metrics for analyzer execution.
///
/// The registry records one run per analyzer execution, labelled by outcome,
/// plus per-issue-type finding counts and per-analyzer latency.
use once_cell::sync::Lazy;
use parking_lot::RwLock;
use prometheus_client::encoding::{EncodeLabelSet, text::encode};
use prometheus_client::metrics::counter::Counter;
use prometheus_client::metrics::family::Family;
use prometheus_client::metrics::histogram::{Histogram, exponential_buckets};
use prometheus_client::registry::Registry;
use std::sync::Arc;
use std::time::Duration;

/// Process-wide metrics instance used by registries that are not given their own.
pub static METRICS: Lazy<Arc<CheckMetrics>> = Lazy::new(|| Arc::new(CheckMetrics::new()));

pub const STATUS_SUCCESS: &str = "success";
pub const STATUS_ERROR: &str = "error";

#[derive(Clone, Debug, Hash, PartialEq, Eq, EncodeLabelSet)]
pub struct RunLabels {
    /// Analyzer key (e.g. "duplicate-networks")
    pub analyzer: String,
    /// "success" or "error"
    pub status: String,
}

#[derive(Clone, Debug, Hash, PartialEq, Eq, EncodeLabelSet)]
pub struct AnalyzerLabels {
    pub analyzer: String,
}

#[derive(Clone, Debug, Hash, PartialEq, Eq, EncodeLabelSet)]
pub struct ErrorLabels {
    pub analyzer: String,
    /// Error classification from `CheckError::category`
    pub error_type: String,
}

#[derive(Clone, Debug, Hash, PartialEq, Eq, EncodeLabelSet)]
pub struct IssueLabels {
    pub issue_type: String,
}

pub struct CheckMetrics {
    registry: RwLock<Registry>,

    /// Analyzer executions by analyzer and outcome
    pub analyzer_runs_total: Family<RunLabels, Counter>,

    /// Analyzer latency in seconds
    pub analyzer_duration_seconds: Family<AnalyzerLabels, Histogram>,

    /// Analyzer failures by error category
    pub analyzer_errors_total: Family<ErrorLabels, Counter>,

    /// Findings reported per issue type
    pub findings_total: Family<IssueLabels, Counter>,

    /// `execute_checks` invocations
    pub check_executions_total: Counter,
}

impl CheckMetrics {
    pub fn new() -> Self {
        let mut registry = Registry::default();

        let analyzer_runs_total = Family::<RunLabels, Counter>::default();
        registry.register(
            "analyzer_runs",
            "Total number of analyzer executions",
            analyzer_runs_total.clone(),
        );

        let analyzer_duration_seconds =
            Family::<AnalyzerLabels, Histogram>::new_with_constructor(|| {
                // 100us up to ~2.6s
                Histogram::new(exponential_buckets(0.0001, 3.0, 10))
            });
        registry.register(
            "analyzer_duration_seconds",
            "Analyzer latency histogram in seconds",
            analyzer_duration_seconds.clone(),
        );

        let analyzer_errors_total = Family::<ErrorLabels, Counter>::default();
        registry.register(
            "analyzer_errors",
            "Total number of analyzer failures by error type",
            analyzer_errors_total.clone(),
        );

        let findings_total = Family::<IssueLabels, Counter>::default();
        registry.register(
            "findings",
            "Total number of findings by issue type",
            findings_total.clone(),
        );

        let check_executions_total = Counter::default();
        registry.register(
            "check_executions",
            "Total number of check executions",
            check_executions_total.clone(),
        );

        Self {
            registry: RwLock::new(registry),
            analyzer_runs_total,
            analyzer_duration_seconds,
            analyzer_errors_total,
            findings_total,
            check_executions_total,
        }
    }

    /// Encode metrics in Prometheus text format
    pub fn encode(&self) -> String {
        let mut buffer = String::new();
        let registry = self.registry.read();
        if let Err(err) = encode(&mut buffer, &registry) {
            tracing::warn!(error = %err, "failed to encode metrics");
        }
        buffer
    }

    pub fn record_execution(&self) {
        self.check_executions_total.inc();
    }

    pub fn record_success(&self, analyzer: &str, duration: Duration) {
        self.record_run(analyzer, STATUS_SUCCESS, duration);
    }

    pub fn record_failure(&self, analyzer: &str, duration: Duration, error_type: &str) {
        self.record_run(analyzer, STATUS_ERROR, duration);
        self.analyzer_errors_total
            .get_or_create(&ErrorLabels {
                analyzer: analyzer.to_string(),
                error_type: error_type.to_string(),
            })
            .inc();
    }

    fn record_run(&self, analyzer: &str, status: &str, duration: Duration) {
        self.analyzer_runs_total
            .get_or_create(&RunLabels {
                analyzer: analyzer.to_string(),
                status: status.to_string(),
            })
            .inc();
        self.analyzer_duration_seconds
            .get_or_create(&AnalyzerLabels {
                analyzer: analyzer.to_string(),
            })
            .observe(duration.as_secs_f64());
    }

    pub fn record_findings(&self, issue_type: &str, count: usize) {
        self.findings_total
            .get_or_create(&IssueLabels {
                issue_type: issue_type.to_string(),
            })
            .inc_by(count as u64);
    }

    /// Number of recorded runs for an analyzer with the given status.
    pub fn runs(&self, analyzer: &str, status: &str) -> u64 {
        self.analyzer_runs_total
            .get_or_create(&RunLabels {
                analyzer: analyzer.to_string(),
                status: status.to_string(),
            })
            .get()
    }

    pub fn findings(&self, issue_type: &str) -> u64 {
        self.findings_total
            .get_or_create(&IssueLabels {
                issue_type: issue_type.to_string(),
            })
            .get()
    }
}

impl Default for CheckMetrics {
    fn default() -> Self {
        Self::new()
    }
}
