use fieldhound_scanner::ScanError;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum AnalysisError {
    #[error("No list endpoint configured")]
    MissingListEndpoint,

    #[error("No detail endpoint configured")]
    MissingDetailEndpoint,

    #[error("List path '{0}' does not resolve to an array")]
    ListNotArray(String),

    #[error("List endpoint returned no items")]
    EmptyList,

    #[error("No field mapping found between list items and the detail request")]
    NoMapping,

    #[error("Detail request template has no usable body: {0}")]
    InvalidTemplate(String),

    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),

    #[error("Invalid URL: {0}")]
    InvalidUrl(String),

    #[error("Failed to load capture {path}: {reason}")]
    CaptureLoad { path: String, reason: String },

    #[error("Concurrency controller closed")]
    SchedulerClosed(#[from] tokio::sync::AcquireError),

    #[error("Task panicked: {0}")]
    Panicked(String),

    #[error(transparent)]
    Scan(#[from] ScanError),
}

impl AnalysisError {
    /// Errors raised before any detail request is sent.
    pub fn is_precondition(&self) -> bool {
        matches!(
            self,
            AnalysisError::MissingListEndpoint
                | AnalysisError::MissingDetailEndpoint
                | AnalysisError::ListNotArray(_)
                | AnalysisError::EmptyList
                | AnalysisError::NoMapping
        )
    }
}

pub type Result<T> = std::result::Result<T, AnalysisError>;
