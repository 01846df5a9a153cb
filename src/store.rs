//! Triple store adapter.
//!
//! Analyzers only need subject/predicate/object pattern matching, expressed by
//! [`TripleSource`]. [`GraphStore`] is the in-memory snapshot every analyzer
//! runs against; it is populated from an oxigraph [`Store`] (usually filled by
//! parsing one or more Turtle documents) or directly from [`Triple`] values.
//!
//! ```rust,ignore
//! use bacnet_graph_checks::store::GraphStore;
//!
//! let graph = GraphStore::from_turtle(ttl_text)?;
//! let routers = graph.match_pattern(None, Some(RDF_TYPE), Some(&router_class))?;
//! ```

use crate::error::{CheckError, Result};
use indexmap::IndexSet;
use oxigraph::io::RdfFormat;
use oxigraph::model::Term;
use oxigraph::store::Store;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::fmt;

/// Object position of a triple.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(tag = "kind", content = "value", rename_all = "lowercase")]
pub enum Object {
    Iri(String),
    Blank(String),
    Literal(String),
}

impl Object {
    /// IRI, blank node label, or literal lexical form.
    pub fn as_str(&self) -> &str {
        match self {
            Object::Iri(value) | Object::Blank(value) | Object::Literal(value) => value,
        }
    }

    pub fn is_literal(&self) -> bool {
        matches!(self, Object::Literal(_))
    }
}

impl fmt::Display for Object {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Object::Iri(iri) => write!(f, "<{iri}>"),
            Object::Blank(id) => write!(f, "_:{id}"),
            Object::Literal(value) => write!(f, "\"{value}\""),
        }
    }
}

/// One immutable statement.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct Triple {
    pub subject: String,
    pub predicate: String,
    pub object: Object,
}

impl Triple {
    pub fn new(subject: impl Into<String>, predicate: impl Into<String>, object: Object) -> Self {
        Self {
            subject: subject.into(),
            predicate: predicate.into(),
            object,
        }
    }

    pub fn iri(
        subject: impl Into<String>,
        predicate: impl Into<String>,
        object: impl Into<String>,
    ) -> Self {
        Self::new(subject, predicate, Object::Iri(object.into()))
    }

    pub fn literal(
        subject: impl Into<String>,
        predicate: impl Into<String>,
        value: impl Into<String>,
    ) -> Self {
        Self::new(subject, predicate, Object::Literal(value.into()))
    }
}

impl fmt::Display for Triple {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "<{}> <{}> {}", self.subject, self.predicate, self.object)
    }
}

/// Pattern-match access to a read-only set of triples.
///
/// `None` in any position is a wildcard; other positions match exactly
/// against the subject IRI, predicate IRI, or `Object::as_str`.
pub trait TripleSource: Send + Sync {
    fn match_pattern(
        &self,
        subject: Option<&str>,
        predicate: Option<&str>,
        object: Option<&str>,
    ) -> Result<Vec<Triple>>;
}

/// In-memory, insertion-ordered triple set indexed by subject and predicate.
#[derive(Debug, Clone, Default)]
pub struct GraphStore {
    triples: IndexSet<Triple>,
    by_subject: HashMap<String, Vec<usize>>,
    by_predicate: HashMap<String, Vec<usize>>,
}

impl GraphStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn from_triples(triples: impl IntoIterator<Item = Triple>) -> Self {
        let mut store = Self::new();
        for triple in triples {
            store.insert(triple);
        }
        store
    }

    /// Parses a single Turtle document.
    pub fn from_turtle(document: &str) -> Result<Self> {
        Self::from_turtle_documents([document])
    }

    /// Parses several Turtle documents into one store; repeated triples collapse.
    pub fn from_turtle_documents<'a>(documents: impl IntoIterator<Item = &'a str>) -> Result<Self> {
        let store = Store::new().map_err(CheckError::store)?;
        for document in documents {
            store
                .load_from_reader(RdfFormat::Turtle, document.as_bytes())
                .map_err(|e| CheckError::parse("turtle", e))?;
        }
        Self::from_oxigraph(&store)
    }

    /// Snapshots every quad of an oxigraph store, ignoring graph names.
    pub fn from_oxigraph(store: &Store) -> Result<Self> {
        let mut graph = Self::new();
        for quad in store.iter() {
            let quad = quad.map_err(CheckError::store)?;
            let object = match quad.object {
                Term::NamedNode(node) => Object::Iri(node.into_string()),
                Term::BlankNode(node) => Object::Blank(node.into_string()),
                Term::Literal(literal) => Object::Literal(literal.value().to_owned()),
                // Triple terms never carry BACnet topology.
                #[allow(unreachable_patterns)]
                _ => continue,
            };
            graph.insert(Triple::new(
                node_text(quad.subject.to_string()),
                quad.predicate.into_string(),
                object,
            ));
        }
        tracing::debug!(triples = graph.len(), "snapshotted oxigraph store");
        Ok(graph)
    }

    /// Inserts a triple; returns false when it was already present.
    pub fn insert(&mut self, triple: Triple) -> bool {
        let subject = triple.subject.clone();
        let predicate = triple.predicate.clone();
        let (index, inserted) = self.triples.insert_full(triple);
        if inserted {
            self.by_subject.entry(subject).or_default().push(index);
            self.by_predicate.entry(predicate).or_default().push(index);
        }
        inserted
    }

    pub fn len(&self) -> usize {
        self.triples.len()
    }

    pub fn is_empty(&self) -> bool {
        self.triples.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = &Triple> {
        self.triples.iter()
    }

    fn candidates(&self, subject: Option<&str>, predicate: Option<&str>) -> Vec<&Triple> {
        let indices = match (subject, predicate) {
            (Some(subject), _) => self.by_subject.get(subject),
            (None, Some(predicate)) => self.by_predicate.get(predicate),
            (None, None) => return self.triples.iter().collect(),
        };
        indices
            .map(|indices| {
                indices
                    .iter()
                    .filter_map(|&index| self.triples.get_index(index))
                    .collect()
            })
            .unwrap_or_default()
    }
}

impl TripleSource for GraphStore {
    fn match_pattern(
        &self,
        subject: Option<&str>,
        predicate: Option<&str>,
        object: Option<&str>,
    ) -> Result<Vec<Triple>> {
        Ok(self
            .candidates(subject, predicate)
            .into_iter()
            .filter(|t| subject.is_none_or(|s| t.subject == s))
            .filter(|t| predicate.is_none_or(|p| t.predicate == p))
            .filter(|t| object.is_none_or(|o| t.object.as_str() == o))
            .cloned()
            .collect())
    }
}

/// Oxigraph renders named nodes as `<iri>` and blank nodes as `_:id`.
/// Subjects keep the bare IRI or id so they compare equal to [`Object::as_str`].
fn node_text(rendered: String) -> String {
    if let Some(iri) = rendered
        .strip_prefix('<')
        .and_then(|rest| rest.strip_suffix('>'))
    {
        return iri.to_owned();
    }
    match rendered.strip_prefix("_:") {
        Some(id) => id.to_owned(),
        None => rendered,
    }
}
