use thiserror::Error;

#[derive(Debug, Error)]
pub enum MissionError {
    #[error("Configuration error: {0}")]
    Config(String),

    #[error("Invalid request: {0}")]
    BadRequest(String),

    #[error("{kind} not found: {id}")]
    NotFound { kind: &'static str, id: String },

    #[error("Storage error: {0}")]
    Storage(String),

    /// The automation backend failed or answered with an error status.
    #[error("Upstream error: {0}")]
    Upstream(String),

    #[error("Internal error: {0}")]
    Internal(String),
}

impl MissionError {
    /// Short error code string, stable across releases.
    pub fn code(&self) -> &'static str {
        match self {
            MissionError::Config(_) => "CONFIG_ERROR",
            MissionError::BadRequest(_) => "BAD_REQUEST",
            MissionError::NotFound { .. } => "NOT_FOUND",
            MissionError::Storage(_) => "STORAGE_ERROR",
            MissionError::Upstream(_) => "UPSTREAM_ERROR",
            MissionError::Internal(_) => "INTERNAL_ERROR",
        }
    }

    /// HTTP status the gateway answers with for this error.
    pub fn status_code(&self) -> u16 {
        match self {
            MissionError::BadRequest(_) => 400,
            MissionError::NotFound { .. } => 404,
            _ => 500,
        }
    }
}

pub type Result<T> = std::result::Result<T, MissionError>;
