use crate::capture::CapturedRequest;
use crate::error::{AnalysisError, Result};
use crate::locator::{SearchResult, locate_all};
use serde::Serialize;
use serde_json::Value;
use tracing::{debug, warn};

/// Every location in the sample item that could supply one detail parameter.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct FieldCandidates {
    pub key: String,
    pub candidates: Vec<SearchResult<Value>>,
}

/// Candidate sources for each key of the detail request template, in
/// template key order. Ambiguity is kept: a key may have many candidates.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
#[serde(transparent)]
pub struct Mapping {
    entries: Vec<FieldCandidates>,
}

impl Mapping {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&mut self, key: &str, candidates: Vec<SearchResult<Value>>) {
        match self.entries.iter_mut().find(|e| e.key == key) {
            Some(entry) => entry.candidates = candidates,
            None => self.entries.push(FieldCandidates {
                key: key.to_string(),
                candidates,
            }),
        }
    }

    pub fn get(&self, key: &str) -> Option<&[SearchResult<Value>]> {
        self.entries
            .iter()
            .find(|e| e.key == key)
            .map(|e| e.candidates.as_slice())
    }

    /// First candidate in traversal order.
    pub fn best(&self, key: &str) -> Option<&SearchResult<Value>> {
        self.get(key).and_then(|candidates| candidates.first())
    }

    pub fn keys(&self) -> impl Iterator<Item = &str> {
        self.entries.iter().map(|e| e.key.as_str())
    }

    pub fn entries(&self) -> &[FieldCandidates] {
        &self.entries
    }

    /// Keys with at least one candidate.
    pub fn related_fields(&self) -> Vec<&str> {
        self.entries
            .iter()
            .filter(|e| !e.candidates.is_empty())
            .map(|e| e.key.as_str())
            .collect()
    }

    pub fn has_candidates(&self) -> bool {
        self.entries.iter().any(|e| !e.candidates.is_empty())
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

/// Correlates a detail request template with a sample list item.
pub struct FieldMappingAnalyzer;

impl FieldMappingAnalyzer {
    /// Fail-soft variant: problems are logged and produce an empty mapping.
    pub fn analyze(list_items: &[Value], detail_template: &CapturedRequest) -> Mapping {
        match Self::try_analyze(list_items, detail_template) {
            Ok(mapping) => mapping,
            Err(e) => {
                warn!(
                    has_list_data = !list_items.is_empty(),
                    has_request_body = detail_template.request_body.is_some(),
                    "Field mapping analysis failed: {}",
                    e
                );
                Mapping::new()
            }
        }
    }

    /// Only the first item is inspected; the list is assumed to be homogeneous.
    pub fn try_analyze(list_items: &[Value], detail_template: &CapturedRequest) -> Result<Mapping> {
        let sample = list_items.first().ok_or(AnalysisError::EmptyList)?;
        let body = detail_template.body_object()?;

        let mut mapping = Mapping::new();
        for key in body.keys() {
            let candidates: Vec<SearchResult<Value>> = locate_all(&sample, key)
                .iter()
                .map(|r| r.to_owned_value())
                .collect();
            debug!(key = %key, candidates = candidates.len(), "Mapped template key");
            mapping.insert(key, candidates);
        }

        Ok(mapping)
    }
}
