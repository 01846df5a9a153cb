//! Error types for graph analysis.
//!
//! Malformed property values are never errors: analyzers either turn them into
//! findings or skip the entity. `CheckError` covers the failures that sit
//! outside that policy (store access, Turtle parsing, configuration, unknown
//! issue selectors) and the analyzer-boundary failures the registry isolates.

use thiserror::Error;

/// Result alias used across the crate.
pub type Result<T> = std::result::Result<T, CheckError>;

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum CheckError {
    /// The triple store could not answer a pattern query.
    #[error("triple store error: {0}")]
    Store(String),

    /// An input document could not be parsed.
    #[error("failed to parse {format} input: {message}")]
    Parse { format: String, message: String },

    /// The requested issue selector does not name a registered issue type.
    #[error("unknown issue type: {0}")]
    UnknownIssueType(String),

    /// An analyzer panicked while traversing the graph.
    #[error("analyzer {analyzer} panicked: {message}")]
    AnalyzerPanicked { analyzer: String, message: String },

    /// Configuration is structurally invalid.
    #[error("invalid configuration: {0}")]
    Config(String),
}

impl CheckError {
    pub fn store(err: impl std::fmt::Display) -> Self {
        CheckError::Store(err.to_string())
    }

    pub fn parse(format: impl Into<String>, err: impl std::fmt::Display) -> Self {
        CheckError::Parse {
            format: format.into(),
            message: err.to_string(),
        }
    }

    /// Short classification used as a metrics label.
    pub fn category(&self) -> &'static str {
        match self {
            CheckError::Store(_) => "store_error",
            CheckError::Parse { .. } => "parse_error",
            CheckError::UnknownIssueType(_) => "not_found",
            CheckError::AnalyzerPanicked { .. } => "panic",
            CheckError::Config(_) => "config_error",
        }
    }
}
