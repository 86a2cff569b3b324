use crate::locator::SearchResult;
use crate::mapping::Mapping;
use crate::path::FieldPath;
use serde::Serialize;
use serde_json::Value;
use std::sync::Arc;

/// Log-observable moments of an analysis run, delivered to an [`EventSink`].
#[derive(Debug, Clone, Serialize)]
#[serde(tag = "event", rename_all = "snake_case")]
pub enum AnalysisEvent {
    RunStarted {
        run_id: u64,
    },
    ListFetched {
        items: usize,
        elapsed_ms: u64,
    },
    MappingDiscovered {
        mapping: Mapping,
        related_fields: Vec<String>,
    },
    DetailUrlBuilt {
        index: usize,
        url: String,
    },
    ItemMatched {
        index: usize,
        url: String,
        path: FieldPath,
        value: Value,
        elapsed_ms: u64,
    },
    ItemMismatched {
        index: usize,
        url: String,
        found: Option<SearchResult<Value>>,
        elapsed_ms: u64,
    },
    ItemFailed {
        index: usize,
        url: Option<String>,
        error: String,
        elapsed_ms: u64,
    },
    Progress {
        progress: usize,
        total: usize,
    },
    RunStopped {
        progress: usize,
        total: usize,
    },
    RunCompleted {
        processed: usize,
        matched: usize,
        elapsed_ms: u64,
    },
    RunFailed {
        reason: String,
    },
}

pub type EventSink = Arc<dyn Fn(&AnalysisEvent) + Send + Sync>;
