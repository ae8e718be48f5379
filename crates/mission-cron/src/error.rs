use thiserror::Error;

/// Errors within the cron occurrence engine.
///
/// None of these reach HTTP callers: job-level errors degrade a single job,
/// refresh-level errors degrade a read to cached or fallback data.
#[derive(Debug, Error)]
pub enum CronError {
    /// The external scheduler could not be queried (spawn failure, non-zero
    /// exit, timeout, unusable output).
    #[error("Fetch failed: {0}")]
    Fetch(String),

    /// Malformed JSON or an unparseable cron expression / timezone.
    #[error("Parse error: {0}")]
    Parse(String),

    /// The descriptor carries no usable recurrence information.
    #[error("No schedule rule for job {id}")]
    NoRule { id: String },

    /// Persisting the snapshot or the cache payload failed.
    #[error("Store error: {0}")]
    Store(#[from] mission_store::StoreError),

    /// The refresh task panicked or was cancelled by the runtime.
    #[error("Refresh task failed: {0}")]
    Task(String),
}

pub type Result<T> = std::result::Result<T, CronError>;
