use thiserror::Error;

/// Failure of a single upstream request.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum FetchError {
    #[error("Transport error for {url}: {message}")]
    Transport { url: String, message: String },

    #[error("Upstream {url} returned status {status}")]
    Status { url: String, status: u16 },

    #[error("Empty response from {url}")]
    EmptyResponse { url: String },

    #[error("Unexpected response shape from {url}: {message}")]
    Decode { url: String, message: String },

    #[error("Page at {url} unavailable after {attempts} attempts")]
    PageUnavailable { url: String, attempts: u32 },

    #[error("Invalid request: {0}")]
    InvalidRequest(String),
}

impl FetchError {
    /// Whether another attempt may succeed. Client errors and malformed
    /// bodies fail fast.
    pub fn is_transient(&self) -> bool {
        match self {
            FetchError::Transport { .. } | FetchError::EmptyResponse { .. } => true,
            FetchError::Status { status, .. } => *status == 429 || *status >= 500,
            FetchError::Decode { .. }
            | FetchError::PageUnavailable { .. }
            | FetchError::InvalidRequest(_) => false,
        }
    }

    pub fn is_not_found(&self) -> bool {
        matches!(self, FetchError::Status { status: 404, .. })
    }
}

/// A raw record that could not be turned into a domain record.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum ExtractError {
    #[error("Invalid {source_name} record: {message}")]
    Invalid { source_name: &'static str, message: String },

    #[error("Invalid hex quantity: {0}")]
    InvalidHex(String),

    #[error("Invalid timestamp: {0}")]
    InvalidTimestamp(String),
}

impl ExtractError {
    pub fn invalid(source_name: &'static str, err: impl std::fmt::Display) -> Self {
        ExtractError::Invalid { source_name, message: err.to_string() }
    }
}
