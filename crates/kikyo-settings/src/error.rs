use thiserror::Error;

pub type Result<T> = std::result::Result<T, Error>;

/// Failures surfaced by the settings components.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum Error {
    /// The command could not be delivered or the backend did not answer.
    #[error("backend unavailable: {0}")]
    BackendUnavailable(String),

    /// The backend refused the payload.
    #[error("rejected by backend: {0}")]
    ValidationRejected(String),

    /// A stale id was referenced, typically after a concurrent delete.
    #[error("not found: {0}")]
    NotFound(String),

    /// The reply did not decode into the expected shape.
    #[error("malformed response: {0}")]
    MalformedResponse(String),

    /// A percentage outside 0..=100 was entered in the form.
    #[error("percentage out of range: {0}")]
    InvalidPercent(u32),

    /// Client-local key-value storage failed.
    #[error("local storage error: {0}")]
    Storage(String),
}

impl Error {
    pub fn unavailable(msg: impl Into<String>) -> Self {
        Self::BackendUnavailable(msg.into())
    }

    pub fn rejected(msg: impl Into<String>) -> Self {
        Self::ValidationRejected(msg.into())
    }

    pub fn not_found(msg: impl Into<String>) -> Self {
        Self::NotFound(msg.into())
    }
}
