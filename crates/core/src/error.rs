use thiserror::Error;

/// Top-level error type used across the entire application.
#[derive(Debug, Error)]
pub enum HoldError {
    #[error("config error: {0}")]
    Config(String),

    /// Transport failure or non-2xx status from a holder-count source.
    #[error("source error: {0}")]
    Source(String),

    /// The source answered, but the payload is unusable.
    #[error("invalid payload: {0}")]
    Payload(String),

    #[error("storage error: {0}")]
    Storage(String),

    #[error("I/O error: {source}")]
    Io {
        #[from]
        source: std::io::Error,
    },

    #[error("JSON error: {source}")]
    Json {
        #[from]
        source: serde_json::Error,
    },
}

pub type Result<T, E = HoldError> = std::result::Result<T, E>;
