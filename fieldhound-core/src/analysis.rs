// Drives fetch -> infer -> fan-out -> compare -> aggregate

use crate::builder::{DetailRequest, DetailRequestBuilder};
use crate::capture::{CapturedRequest, ListConfig};
use crate::concurrency::ConcurrencyController;
use crate::error::{AnalysisError, Result};
use crate::events::{AnalysisEvent, EventSink};
use crate::locator::{FieldTree, locate};
use crate::mapping::{FieldMappingAnalyzer, Mapping};
use crate::outcome::{ItemOutcome, RunOutcome, RunStatus, RunSummary, Verdict};
use crate::path::FieldPath;
use fieldhound_scanner::Transport;
use futures::FutureExt;
use futures::future::join_all;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::any::Any;
use std::panic::{self, AssertUnwindSafe};
use std::sync::{Mutex, PoisonError};
use std::time::Instant;
use tracing::{Instrument, Span, debug, debug_span, error, info, info_span, warn};

/// Items slower than this are logged at warn level.
const SLOW_ITEM_MS: u64 = 1000;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AnalysisConfig {
    /// Field to extract from each detail response.
    pub search_field: String,
    pub target_value: Value,
    pub max_concurrency: usize,
}

impl Default for AnalysisConfig {
    fn default() -> Self {
        Self {
            search_field: String::new(),
            target_value: Value::String(String::new()),
            max_concurrency: 5,
        }
    }
}

/// Partial update for [`AnalysisConfig`]; `None` leaves a field unchanged.
#[derive(Debug, Clone, Default)]
pub struct ConfigUpdate {
    pub search_field: Option<String>,
    pub target_value: Option<Value>,
    pub max_concurrency: Option<usize>,
}

impl ConfigUpdate {
    pub fn search_field(mut self, field: &str) -> Self {
        self.search_field = Some(field.to_string());
        self
    }

    pub fn target_value(mut self, value: impl Into<Value>) -> Self {
        self.target_value = Some(value.into());
        self
    }

    pub fn max_concurrency(mut self, max: usize) -> Self {
        self.max_concurrency = Some(max);
        self
    }
}

impl AnalysisConfig {
    pub fn merge(&mut self, update: ConfigUpdate) -> Result<()> {
        if update.max_concurrency == Some(0) {
            return Err(AnalysisError::InvalidConfig(
                "max_concurrency must be at least 1".to_string(),
            ));
        }

        if let Some(field) = update.search_field {
            self.search_field = field;
        }
        if let Some(value) = update.target_value {
            self.target_value = value;
        }
        if let Some(max) = update.max_concurrency {
            self.max_concurrency = max;
        }
        Ok(())
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct AnalysisState {
    pub is_running: bool,
    pub progress: usize,
    pub total: usize,
    pub mapping: Mapping,
    pub config: AnalysisConfig,
    pub last_status: Option<RunStatus>,
}

impl Default for AnalysisState {
    fn default() -> Self {
        Self {
            is_running: false,
            progress: 0,
            total: 0,
            mapping: Mapping::new(),
            config: AnalysisConfig::default(),
            last_status: None,
        }
    }
}

struct Shared {
    state: AnalysisState,
    run_id: u64,
}

impl Shared {
    fn owns(&self, run_id: u64) -> bool {
        self.run_id == run_id
    }

    fn is_live(&self, run_id: u64) -> bool {
        self.owns(run_id) && self.state.is_running
    }
}

#[derive(Default)]
struct Endpoints {
    list: Option<CapturedRequest>,
    detail: Option<CapturedRequest>,
    list_config: ListConfig,
}

/// Owns the analysis state and runs one analysis at a time.
pub struct AnalysisOrchestrator<T> {
    transport: T,
    shared: Mutex<Shared>,
    endpoints: Mutex<Endpoints>,
    sink: Option<EventSink>,
    span: Span,
}

impl<T: Transport> AnalysisOrchestrator<T> {
    pub fn new(transport: T) -> Self {
        Self {
            transport,
            shared: Mutex::new(Shared {
                state: AnalysisState::default(),
                run_id: 0,
            }),
            endpoints: Mutex::new(Endpoints::default()),
            sink: None,
            span: info_span!("analysis"),
        }
    }

    pub fn with_event_sink(mut self, sink: EventSink) -> Self {
        self.sink = Some(sink);
        self
    }

    /// Parent span for everything this orchestrator logs.
    pub fn with_span(mut self, span: Span) -> Self {
        self.span = span;
        self
    }

    pub fn set_list_request(&self, request: CapturedRequest) {
        debug!(url = %request.url(), "List request configured");
        self.with_endpoints(|endpoints| endpoints.list = Some(request));
    }

    pub fn set_detail_request(&self, request: CapturedRequest) {
        debug!(url = %request.url(), "Detail request configured");
        self.with_endpoints(|endpoints| endpoints.detail = Some(request));
    }

    pub fn set_list_config(&self, config: ListConfig) {
        self.with_endpoints(|endpoints| endpoints.list_config = config);
    }

    /// Merge `update` into the config. Takes effect on the next run.
    pub fn update_config(&self, update: ConfigUpdate) -> Result<()> {
        self.with_shared(|shared| {
            let mut config = shared.state.config.clone();
            config.merge(update)?;
            debug!(old = ?shared.state.config, new = ?config, "Analysis config updated");
            shared.state.config = config;
            Ok(())
        })
    }

    pub fn config(&self) -> AnalysisConfig {
        self.with_shared(|shared| shared.state.config.clone())
    }

    pub fn snapshot(&self) -> AnalysisState {
        self.with_shared(|shared| shared.state.clone())
    }

    pub fn is_running(&self) -> bool {
        self.with_shared(|shared| shared.state.is_running)
    }

    /// Request cancellation. Items already admitted keep running; their
    /// outcomes are logged but no longer counted.
    pub fn stop_analysis(&self) -> bool {
        let stopped = self.with_shared(|shared| {
            if !shared.state.is_running {
                return None;
            }
            shared.state.is_running = false;
            shared.state.last_status = Some(RunStatus::Stopped);
            Some((shared.state.progress, shared.state.total))
        });

        match stopped {
            Some((progress, total)) => {
                warn!(progress, total, "Analysis stopped manually");
                self.emit(AnalysisEvent::RunStopped { progress, total });
                true
            }
            None => false,
        }
    }

    pub async fn start_analysis(&self) -> RunOutcome {
        let Some(run_id) = self.begin_run() else {
            warn!("Analysis already running, ignoring start request");
            return RunOutcome::AlreadyRunning;
        };

        let span = info_span!(parent: &self.span, "run", run_id);
        let started = Instant::now();
        let started_at = chrono::Local::now().to_rfc3339();

        span.in_scope(|| info!("Starting analysis"));
        self.emit(AnalysisEvent::RunStarted { run_id });

        let result = AssertUnwindSafe(self.run(run_id, started_at, started))
            .catch_unwind()
            .instrument(span.clone())
            .await
            .unwrap_or_else(|panic| Err(panicked(&*panic)));

        span.in_scope(|| self.finish_run(run_id, result))
    }

    async fn run(&self, run_id: u64, started_at: String, started: Instant) -> Result<RunSummary> {
        let (list, detail, list_config) =
            self.with_endpoints(|e| (e.list.clone(), e.detail.clone(), e.list_config.clone()));

        let list = list.ok_or(AnalysisError::MissingListEndpoint)?;
        let items = self.fetch_list(&list, &list_config).await?;

        let detail = detail.ok_or(AnalysisError::MissingDetailEndpoint)?;

        let mapping = FieldMappingAnalyzer::analyze(&items, &detail);
        let related_fields: Vec<String> =
            mapping.related_fields().into_iter().map(String::from).collect();
        self.with_shared(|shared| {
            if shared.owns(run_id) {
                shared.state.mapping = mapping.clone();
            }
        });
        info!(related_fields = ?related_fields, keys = mapping.len(), "Field mapping discovered");
        self.emit(AnalysisEvent::MappingDiscovered {
            mapping: mapping.clone(),
            related_fields,
        });

        if !mapping.has_candidates() {
            return Err(AnalysisError::NoMapping);
        }

        // Read once; later updates apply to the next run
        let config = self.config();
        let total = items.len();
        self.with_shared(|shared| {
            if shared.owns(run_id) {
                shared.state.total = total;
            }
        });

        let controller = ConcurrencyController::new(config.max_concurrency);
        info!(
            total,
            max_concurrency = controller.max_concurrency(),
            "Dispatching detail requests"
        );

        let (mapping_ref, detail_ref, config_ref) = (&mapping, &detail, &config);
        let tasks = items.iter().enumerate().map(|(index, item)| {
            controller.execute(async move {
                let span = debug_span!("item", index);
                let outcome = AssertUnwindSafe(
                    self.process_item(run_id, index, item, mapping_ref, detail_ref, config_ref),
                )
                .catch_unwind()
                .instrument(span.clone())
                .await
                .unwrap_or_else(|panic| {
                    ItemOutcome::failed(index, None, panicked(&*panic).to_string(), 0)
                });
                Ok(span.in_scope(|| self.settle(run_id, outcome)))
            })
        });

        let outcomes: Vec<ItemOutcome> = join_all(tasks)
            .await
            .into_iter()
            .enumerate()
            .map(|(index, result)| {
                result.unwrap_or_else(|e| ItemOutcome::failed(index, None, e.to_string(), 0))
            })
            .collect();

        Ok(RunSummary::new(
            run_id,
            started_at,
            total,
            outcomes,
            mapping,
            elapsed_ms(started),
        ))
    }

    async fn fetch_list(&self, list: &CapturedRequest, list_config: &ListConfig) -> Result<Vec<Value>> {
        let started = Instant::now();
        let url = list.url();
        info!(url = %url, "Fetching list data");

        let body = if list.is_body_method() {
            list.request_body.clone()
        } else {
            None
        };

        let fetched = async {
            let response = self.transport.send(list.to_outbound(&url, body)).await?;
            let json = response.into_json()?;
            extract_list(&json, list_config)
        }
        .await;

        match fetched {
            Ok(items) => {
                let elapsed_ms = elapsed_ms(started);
                info!(items = items.len(), elapsed_ms, "List data fetched");
                self.emit(AnalysisEvent::ListFetched {
                    items: items.len(),
                    elapsed_ms,
                });
                Ok(items)
            }
            Err(e) => {
                error!(url = %url, elapsed_ms = elapsed_ms(started), "Fetching list data failed: {}", e);
                Err(e)
            }
        }
    }

    async fn process_item(
        &self,
        run_id: u64,
        index: usize,
        item: &Value,
        mapping: &Mapping,
        detail: &CapturedRequest,
        config: &AnalysisConfig,
    ) -> ItemOutcome {
        let started = Instant::now();

        // Admitted after a stop: give the slot back without sending anything
        if !self.with_shared(|shared| shared.is_live(run_id)) {
            return ItemOutcome {
                index,
                url: None,
                verdict: Verdict::Skipped,
                elapsed_ms: 0,
            };
        }

        let request = match DetailRequestBuilder::build(item, mapping, detail) {
            Ok(request) => request,
            Err(e) => return ItemOutcome::failed(index, None, e.to_string(), elapsed_ms(started)),
        };

        debug!(url = %request.url, omitted = ?request.omitted, "Built detail request");
        self.emit(AnalysisEvent::DetailUrlBuilt {
            index,
            url: request.url.clone(),
        });

        let fetched = AssertUnwindSafe(self.fetch_detail(&request, detail))
            .catch_unwind()
            .await
            .unwrap_or_else(|panic| Err(panicked(&*panic)));

        let verdict = match fetched {
            Ok(response) => compare(&response, config),
            Err(e) => Verdict::Error {
                message: e.to_string(),
            },
        };

        ItemOutcome {
            index,
            url: Some(request.url),
            verdict,
            elapsed_ms: elapsed_ms(started),
        }
    }

    async fn fetch_detail(&self, request: &DetailRequest, detail: &CapturedRequest) -> Result<Value> {
        let response = self.transport.send(request.to_outbound(detail)).await?;
        Ok(response.into_json()?)
    }

    /// Count the outcome towards progress, then log and emit it. A panicking
    /// event sink cannot take the rest of the batch down with it.
    fn settle(&self, run_id: u64, outcome: ItemOutcome) -> ItemOutcome {
        if outcome.is_skipped() {
            debug!("Item #{} skipped, run was stopped", outcome.index + 1);
            return outcome;
        }

        let reported = panic::catch_unwind(AssertUnwindSafe(|| {
            self.advance(run_id);
            self.report_outcome(&outcome);
        }));
        if let Err(panic) = reported {
            error!("Reporting item #{} failed: {}", outcome.index + 1, panicked(&*panic));
        }
        outcome
    }

    fn report_outcome(&self, outcome: &ItemOutcome) {
        let index = outcome.index;
        let url = outcome.url.clone().unwrap_or_default();
        let elapsed_ms = outcome.elapsed_ms;

        match &outcome.verdict {
            Verdict::Match { path, value } => {
                info!(url = %url, path = %path, value = %value, "Match found for item #{}", index + 1);
                self.emit(AnalysisEvent::ItemMatched {
                    index,
                    url,
                    path: path.clone(),
                    value: value.clone(),
                    elapsed_ms,
                });
            }
            Verdict::Mismatch { found } => {
                debug!(
                    url = %url,
                    path = ?found.as_ref().map(|f| f.path.to_string()),
                    "No match for item #{}",
                    index + 1
                );
                self.emit(AnalysisEvent::ItemMismatched {
                    index,
                    url,
                    found: found.clone(),
                    elapsed_ms,
                });
            }
            Verdict::Error { message } => {
                error!(url = %url, elapsed_ms, "Item #{} failed: {}", index + 1, message);
                self.emit(AnalysisEvent::ItemFailed {
                    index,
                    url: outcome.url.clone(),
                    error: message.clone(),
                    elapsed_ms,
                });
            }
            Verdict::Skipped => return,
        }

        if elapsed_ms > SLOW_ITEM_MS {
            warn!(elapsed_ms, "Item #{} was slow", index + 1);
        } else {
            debug!(elapsed_ms, "Item #{} processed", index + 1);
        }
    }

    fn advance(&self, run_id: u64) {
        let progress = self.with_shared(|shared| {
            if !shared.is_live(run_id) {
                return None;
            }
            let state = &mut shared.state;
            state.progress = (state.progress + 1).min(state.total);
            Some((state.progress, state.total))
        });

        if let Some((progress, total)) = progress {
            self.emit(AnalysisEvent::Progress { progress, total });
        }
    }

    fn begin_run(&self) -> Option<u64> {
        self.with_shared(|shared| {
            if shared.state.is_running {
                return None;
            }
            shared.run_id += 1;
            let state = &mut shared.state;
            state.is_running = true;
            state.progress = 0;
            state.total = 0;
            state.mapping = Mapping::new();
            state.last_status = None;
            Some(shared.run_id)
        })
    }

    fn finish_run(&self, run_id: u64, result: Result<RunSummary>) -> RunOutcome {
        let status = match &result {
            Err(_) => RunStatus::Failed,
            Ok(_) => RunStatus::Completed,
        };

        // A run is stopped when cancellation was requested or a newer run took over
        let (stopped, progress, total) = self.with_shared(|shared| {
            let stopped = !shared.is_live(run_id);
            if shared.owns(run_id) {
                shared.state.is_running = false;
                if !stopped {
                    shared.state.last_status = Some(status);
                }
            }
            (stopped, shared.state.progress, shared.state.total)
        });

        match result {
            Err(e) => {
                if e.is_precondition() {
                    warn!("Analysis aborted: {}", e);
                } else {
                    error!("Analysis failed: {}", e);
                }
                self.emit(AnalysisEvent::RunFailed {
                    reason: e.to_string(),
                });
                RunOutcome::Failed(e)
            }
            Ok(summary) if stopped => {
                info!(
                    processed = summary.processed,
                    "Stopped analysis drained its in-flight items"
                );
                RunOutcome::Stopped { progress, total }
            }
            Ok(summary) => {
                info!(
                    processed = summary.processed,
                    matched = summary.matched,
                    failed = summary.failed,
                    elapsed_ms = summary.elapsed_ms,
                    "Analysis complete: processed {} items in {}ms",
                    summary.processed,
                    summary.elapsed_ms
                );
                self.emit(AnalysisEvent::RunCompleted {
                    processed: summary.processed,
                    matched: summary.matched,
                    elapsed_ms: summary.elapsed_ms,
                });
                RunOutcome::Completed(summary)
            }
        }
    }

    fn emit(&self, event: AnalysisEvent) {
        if let Some(sink) = &self.sink {
            sink(&event);
        }
    }

    fn with_shared<R>(&self, f: impl FnOnce(&mut Shared) -> R) -> R {
        let mut shared = self.shared.lock().unwrap_or_else(PoisonError::into_inner);
        f(&mut shared)
    }

    fn with_endpoints<R>(&self, f: impl FnOnce(&mut Endpoints) -> R) -> R {
        let mut endpoints = self.endpoints.lock().unwrap_or_else(PoisonError::into_inner);
        f(&mut endpoints)
    }
}

/// Reduce a list response to its item array using `list_config.list_path`.
/// An empty path selects the response itself.
pub fn extract_list(response: &Value, list_config: &ListConfig) -> Result<Vec<Value>> {
    let path = FieldPath::parse(&list_config.list_path);
    let list = if path.is_root() {
        Some(response)
    } else {
        response.resolve(&path)
    };

    let Some(Value::Array(items)) = list else {
        return Err(AnalysisError::ListNotArray(list_config.list_path.clone()));
    };

    for (name, meta_path) in [
        ("total", &list_config.total_path),
        ("page", &list_config.page_path),
        ("page_size", &list_config.page_size_path),
    ] {
        if let Some(meta_path) = meta_path {
            let value = response.resolve(&FieldPath::parse(meta_path));
            debug!(meta = name, path = %meta_path, value = ?value, "Pagination metadata");
        }
    }

    if items.is_empty() {
        return Err(AnalysisError::EmptyList);
    }
    Ok(items.clone())
}

fn compare(response: &Value, config: &AnalysisConfig) -> Verdict {
    match locate(&response, &config.search_field) {
        Some(found) if *found.value == config.target_value => Verdict::Match {
            path: found.path,
            value: found.value.clone(),
        },
        found => Verdict::Mismatch {
            found: found.map(|f| f.to_owned_value()),
        },
    }
}

fn elapsed_ms(started: Instant) -> u64 {
    started.elapsed().as_millis() as u64
}

fn panicked(panic: &(dyn Any + Send)) -> AnalysisError {
    AnalysisError::Panicked(panic_message(panic))
}

fn panic_message(panic: &(dyn Any + Send)) -> String {
    if let Some(message) = panic.downcast_ref::<&str>() {
        message.to_string()
    } else if let Some(message) = panic.downcast_ref::<String>() {
        message.clone()
    } else {
        "unknown panic".to_string()
    }
}
