use reqwest::StatusCode;
use thiserror::Error;

/// Failure of a single endpoint during one poll cycle.
///
/// These never abort a cycle. The collector reports them to the
/// accumulator and keeps going with the remaining endpoints.
#[derive(Debug, Error)]
pub enum FetchError {
    /// The request could not be built (bad method or URL)
    #[error("invalid request: {0}")]
    Request(String),

    /// Connection refused, DNS failure, timeout, truncated body
    #[error(transparent)]
    Transport(#[from] reqwest::Error),

    /// Anything other than 200 OK
    #[error(
        "Received status code {} ({}), expected {} ({})",
        .actual.as_u16(),
        .actual.canonical_reason().unwrap_or("Unknown"),
        StatusCode::OK.as_u16(),
        StatusCode::OK.canonical_reason().unwrap_or("OK")
    )]
    Status { actual: StatusCode },

    /// Body is not JSON or does not match the snapshot shape
    #[error("decode: {0}")]
    Decode(#[from] serde_json::Error),

    /// The endpoint task panicked or was cancelled
    #[error("task failed: {0}")]
    Task(String),
}

/// A `FetchError` labelled with the endpoint it came from.
#[derive(Debug, Error)]
#[error("[url={url}]: {source}")]
pub struct EndpointError {
    pub url: String,
    #[source]
    pub source: FetchError,
}

impl EndpointError {
    pub fn new(url: impl Into<String>, source: FetchError) -> Self {
        Self {
            url: url.into(),
            source,
        }
    }
}
