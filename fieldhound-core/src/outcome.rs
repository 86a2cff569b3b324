use crate::error::AnalysisError;
use crate::locator::SearchResult;
use crate::mapping::Mapping;
use crate::path::FieldPath;
use serde::Serialize;
use serde_json::Value;

/// What the detail response said about one list item.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum Verdict {
    Match { path: FieldPath, value: Value },
    Mismatch { found: Option<SearchResult<Value>> },
    Error { message: String },
    /// Never sent: the run was stopped before a slot freed up.
    Skipped,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ItemOutcome {
    pub index: usize,
    pub url: Option<String>,
    pub verdict: Verdict,
    pub elapsed_ms: u64,
}

impl ItemOutcome {
    pub fn failed(index: usize, url: Option<String>, message: String, elapsed_ms: u64) -> Self {
        Self {
            index,
            url,
            verdict: Verdict::Error { message },
            elapsed_ms,
        }
    }

    pub fn is_match(&self) -> bool {
        matches!(self.verdict, Verdict::Match { .. })
    }

    pub fn is_error(&self) -> bool {
        matches!(self.verdict, Verdict::Error { .. })
    }

    pub fn is_skipped(&self) -> bool {
        matches!(self.verdict, Verdict::Skipped)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum RunStatus {
    Completed,
    Stopped,
    Failed,
}

#[derive(Debug, Clone, Serialize)]
pub struct RunSummary {
    pub run_id: u64,
    pub started_at: String,
    pub total: usize,
    pub processed: usize,
    pub matched: usize,
    pub mismatched: usize,
    pub failed: usize,
    pub skipped: usize,
    pub elapsed_ms: u64,
    pub mapping: Mapping,
    /// Every item, ordered by list index.
    pub items: Vec<ItemOutcome>,
}

impl RunSummary {
    pub fn new(
        run_id: u64,
        started_at: String,
        total: usize,
        mut items: Vec<ItemOutcome>,
        mapping: Mapping,
        elapsed_ms: u64,
    ) -> Self {
        items.sort_by_key(|item| item.index);
        let matched = items.iter().filter(|i| i.is_match()).count();
        let failed = items.iter().filter(|i| i.is_error()).count();
        let skipped = items.iter().filter(|i| i.is_skipped()).count();
        let processed = items.len() - skipped;

        Self {
            run_id,
            started_at,
            total,
            processed,
            matched,
            mismatched: processed - matched - failed,
            failed,
            skipped,
            elapsed_ms,
            mapping,
            items,
        }
    }

    pub fn matches(&self) -> impl Iterator<Item = &ItemOutcome> {
        self.items.iter().filter(|i| i.is_match())
    }
}

/// Result of one `start_analysis` call.
#[derive(Debug)]
pub enum RunOutcome {
    /// Another run was active; nothing changed.
    AlreadyRunning,
    Completed(RunSummary),
    /// Stopped on request. Items still in flight were allowed to finish.
    Stopped { progress: usize, total: usize },
    Failed(AnalysisError),
}

impl RunOutcome {
    pub fn status(&self) -> Option<RunStatus> {
        match self {
            RunOutcome::AlreadyRunning => None,
            RunOutcome::Completed(_) => Some(RunStatus::Completed),
            RunOutcome::Stopped { .. } => Some(RunStatus::Stopped),
            RunOutcome::Failed(_) => Some(RunStatus::Failed),
        }
    }

    pub fn summary(&self) -> Option<&RunSummary> {
        match self {
            RunOutcome::Completed(summary) => Some(summary),
            _ => None,
        }
    }

    pub fn into_summary(self) -> Option<RunSummary> {
        match self {
            RunOutcome::Completed(summary) => Some(summary),
            _ => None,
        }
    }
}
