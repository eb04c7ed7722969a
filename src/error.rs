//! Typed errors at the HTTP boundaries.

use thiserror::Error;

/// Failure to load the releases list from the kubescout API.
///
/// The dashboard reports every variant the same way ("failed to load");
/// the distinction exists for logs and tests.
#[derive(Debug, Error)]
pub enum FetchError {
    /// No response: connection refused, DNS, timeout.
    #[error("network error: {0}")]
    Network(String),

    /// The server answered with a non-success status.
    #[error("HTTP {status}: {message}")]
    Http { status: u16, message: String },

    /// The body was not a JSON array of comparison results.
    #[error("invalid response body: {0}")]
    Decode(String),
}

impl FetchError {
    pub fn from_transport(error: reqwest::Error) -> Self {
        if error.is_decode() {
            Self::Decode(error.to_string())
        } else {
            Self::Network(error.to_string())
        }
    }
}

/// Failure to resolve the latest published version of a chart.
#[derive(Debug, Error)]
pub enum UpstreamError {
    #[error("upstream request failed: {0}")]
    Transport(#[from] reqwest::Error),

    #[error("upstream returned {status} for {url}")]
    Status { status: u16, url: String },

    #[error("invalid upstream payload from {url}: {message}")]
    Parse { url: String, message: String },

    #[error("no package named {0} found upstream")]
    NotFound(String),
}
