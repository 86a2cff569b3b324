pub mod analysis;
pub mod builder;
pub mod capture;
pub mod concurrency;
pub mod error;
pub mod events;
pub mod graph;
pub mod locator;
pub mod mapping;
pub mod outcome;
pub mod path;
pub mod report;

pub use analysis::{AnalysisConfig, AnalysisOrchestrator, AnalysisState, ConfigUpdate, extract_list};
pub use builder::{DetailRequest, DetailRequestBuilder};
pub use capture::{CapturedRequest, ListConfig, load_capture};
pub use concurrency::ConcurrencyController;
pub use error::AnalysisError;
pub use events::{AnalysisEvent, EventSink};
pub use graph::SharedNode;
pub use locator::{FieldTree, SearchResult, locate, locate_all};
pub use mapping::{FieldCandidates, FieldMappingAnalyzer, Mapping};
pub use outcome::{ItemOutcome, RunOutcome, RunStatus, RunSummary, Verdict};
pub use path::FieldPath;
pub use report::{ReportFormat, generate_analysis_report, generate_json_report, render_report, save_report};
