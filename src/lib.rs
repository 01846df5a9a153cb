//! Static analysis of BACnet network topologies encoded as RDF graphs.
//!
//! A [`GraphStore`] holds the triples of one building network. The
//! [`IssueRegistry`] resolves an issue selector to the analyzers under
//! [`checks`], runs each of them once and collects their [`Finding`]s into a
//! [`CheckReport`].

pub mod addressing;
pub mod checks;
pub mod config;
pub mod error;
pub mod finding;
pub mod graph;
pub mod logging;
pub mod metrics;
pub mod registry;
pub mod store;
pub mod topology;
pub mod vocab;

pub use checks::{Analyzer, AnalyzerOutput, default_analyzers};
pub use config::CheckConfig;
pub use error::{CheckError, Result};
pub use finding::{Finding, FindingDetails, IssueCategory, IssueType, NetworkKind, Severity};
pub use graph::BacnetGraph;
pub use logging::{LoggingConfig, init_logging};
pub use metrics::{CheckMetrics, METRICS};
pub use registry::{ALL_SELECTOR, AnalyzerFailure, CatalogEntry, CheckReport, IssueRegistry};
pub use store::{GraphStore, Object, Triple, TripleSource};
pub use vocab::Vocabulary;
