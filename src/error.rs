use std::time::Duration;

/// Raised when the store cannot produce a batch for this tick.
#[derive(Debug, Clone, thiserror::Error)]
pub enum FetchError {
    #[error("store unavailable: {message}")]
    StoreUnavailable { message: String },
    #[error("store did not answer within {0:?}")]
    Timeout(Duration),
    #[error(transparent)]
    Malformed(#[from] MalformedResponseError),
}

impl FetchError {
    pub fn unavailable(message: impl Into<String>) -> Self {
        Self::StoreUnavailable {
            message: message.into(),
        }
    }
}

/// The store answered, but the rows are missing required fields or cannot be
/// represented.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("malformed store response: {reason}")]
pub struct MalformedResponseError {
    pub reason: String,
}

impl MalformedResponseError {
    pub fn new(reason: impl Into<String>) -> Self {
        Self {
            reason: reason.into(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("unknown view identifier '{0}'")]
pub struct UnknownViewError(pub String);

/// Anything that turns a refresh tick into a no-op.
#[derive(Debug, Clone, thiserror::Error)]
pub enum CycleError {
    #[error(transparent)]
    Fetch(#[from] FetchError),
    #[error(transparent)]
    Malformed(#[from] MalformedResponseError),
}
