//! Read-only query view over a triple source.
//!
//! [`BacnetGraph`] resolves BACnet local names through the injected
//! [`Vocabulary`] and returns sorted, deduplicated results so that analyzers
//! see the same iteration order regardless of how the source stores triples.

use crate::error::Result;
use crate::store::{Triple, TripleSource};
use crate::vocab::{Vocabulary, prop};
use std::collections::BTreeSet;

#[derive(Clone, Copy)]
pub struct BacnetGraph<'a> {
    source: &'a dyn TripleSource,
    vocab: &'a Vocabulary,
}

impl<'a> BacnetGraph<'a> {
    pub fn new(source: &'a dyn TripleSource, vocab: &'a Vocabulary) -> Self {
        Self { source, vocab }
    }

    pub fn vocab(&self) -> &'a Vocabulary {
        self.vocab
    }

    pub fn source(&self) -> &'a dyn TripleSource {
        self.source
    }

    /// Subjects typed `ns:class`.
    pub fn instances_of(&self, class: &str) -> Result<Vec<String>> {
        let class_iri = self.vocab.iri(class);
        let subjects: BTreeSet<String> = self
            .source
            .match_pattern(None, Some(&self.vocab.rdf_type), Some(&class_iri))?
            .into_iter()
            .map(|t| t.subject)
            .collect();
        Ok(subjects.into_iter().collect())
    }

    pub fn is_a(&self, subject: &str, class: &str) -> Result<bool> {
        let class_iri = self.vocab.iri(class);
        Ok(!self
            .source
            .match_pattern(Some(subject), Some(&self.vocab.rdf_type), Some(&class_iri))?
            .is_empty())
    }

    /// Object values of `subject ns:prop ?o`, sorted.
    pub fn objects(&self, subject: &str, prop: &str) -> Result<Vec<String>> {
        self.objects_of(subject, &self.vocab.iri(prop))
    }

    fn objects_of(&self, subject: &str, predicate: &str) -> Result<Vec<String>> {
        let values: BTreeSet<String> = self
            .source
            .match_pattern(Some(subject), Some(predicate), None)?
            .into_iter()
            .map(|t| t.object.as_str().to_owned())
            .collect();
        Ok(values.into_iter().collect())
    }

    /// Smallest object value of `subject ns:prop ?o`, if any.
    pub fn first(&self, subject: &str, prop: &str) -> Result<Option<String>> {
        Ok(self.objects(subject, prop)?.into_iter().next())
    }

    pub fn has(&self, subject: &str, prop: &str) -> Result<bool> {
        Ok(!self
            .source
            .match_pattern(Some(subject), Some(&self.vocab.iri(prop)), None)?
            .is_empty())
    }

    /// Subjects of `?s ns:prop object`, sorted.
    pub fn subjects_with(&self, prop: &str, object: &str) -> Result<Vec<String>> {
        let subjects: BTreeSet<String> = self
            .source
            .match_pattern(None, Some(&self.vocab.iri(prop)), Some(object))?
            .into_iter()
            .map(|t| t.subject)
            .collect();
        Ok(subjects.into_iter().collect())
    }

    /// Every `(subject, object)` pair for `ns:prop`, sorted.
    pub fn pairs(&self, prop: &str) -> Result<Vec<(String, String)>> {
        let pairs: BTreeSet<(String, String)> = self
            .source
            .match_pattern(None, Some(&self.vocab.iri(prop)), None)?
            .into_iter()
            .map(|t| (t.subject, t.object.as_str().to_owned()))
            .collect();
        Ok(pairs.into_iter().collect())
    }

    pub fn label(&self, subject: &str) -> Result<Option<String>> {
        Ok(self
            .objects_of(subject, &self.vocab.rdfs_label)?
            .into_iter()
            .next())
    }

    /// Human-readable network name: label, then `Network {number}`, then URI tail.
    pub fn network_name(&self, network: &str) -> Result<String> {
        if let Some(label) = self.label(network)? {
            return Ok(label);
        }
        if let Some(number) = self.first(network, prop::NETWORK_NUMBER)? {
            return Ok(format!("Network {number}"));
        }
        Ok(uri_tail(network).to_owned())
    }

    /// Label if present, else the full URI.
    pub fn display_name(&self, subject: &str) -> Result<String> {
        Ok(self.label(subject)?.unwrap_or_else(|| subject.to_owned()))
    }

    /// All triples with `subject` in subject position.
    pub fn describe(&self, subject: &str) -> Result<Vec<Triple>> {
        let mut triples = self.source.match_pattern(Some(subject), None, None)?;
        triples.sort();
        Ok(triples)
    }
}

/// Last `/`-separated segment of a URI, or the whole string when it has none.
pub fn uri_tail(uri: &str) -> &str {
    uri.rsplit('/').next().unwrap_or(uri)
}
