//! Error types for the reqwest-based GitHub client.

use reqwest::StatusCode;
use thiserror::Error;

/// Result type alias for reqwest operations.
pub type Result<T> = std::result::Result<T, Error>;

/// Error type for reqwest operations.
#[derive(Debug, Error)]
pub enum Error {
    /// HTTP request failed before a response was received.
    #[error("HTTP error: {0}")]
    Reqwest(#[from] reqwest::Error),
    /// The API answered with a non-success status.
    #[error("GitHub API {endpoint} returned {status}: {body}")]
    Status {
        endpoint: String,
        status: StatusCode,
        body: String,
    },
    /// Configured base URL cannot carry API paths.
    #[error("Invalid API base URL: {0}")]
    BaseUrl(String),
    /// Response body was not the expected JSON shape.
    #[error("Serialization error: {0}")]
    Serde(#[from] serde_json::Error),
    /// File content was not valid base64.
    #[error("Invalid base64 content: {0}")]
    Base64(#[from] base64::DecodeError),
}

impl From<Error> for crate::Error {
    fn from(err: Error) -> Self {
        match err {
            Error::Reqwest(e) => {
                if e.is_timeout() {
                    crate::Error::timeout()
                        .with_message(e.to_string())
                        .with_source(e)
                } else if e.is_connect() {
                    crate::Error::network_error()
                        .with_message("Connection failed")
                        .with_source(e)
                } else if e.is_decode() {
                    crate::Error::serialization()
                        .with_message(e.to_string())
                        .with_source(e)
                } else {
                    crate::Error::network_error()
                        .with_message(e.to_string())
                        .with_source(e)
                }
            }
            Error::Status {
                endpoint,
                status,
                body,
            } => {
                let error = match status {
                    StatusCode::NOT_FOUND => crate::Error::not_found(),
                    StatusCode::UNAUTHORIZED | StatusCode::FORBIDDEN => {
                        crate::Error::authentication()
                    }
                    StatusCode::TOO_MANY_REQUESTS => crate::Error::rate_limited(),
                    _ => crate::Error::external_error(),
                };
                error.with_message(format!("GitHub API {endpoint} returned {status}: {body}"))
            }
            Error::BaseUrl(url) => crate::Error::configuration()
                .with_message(format!("Invalid API base URL: {url}")),
            Error::Serde(e) => crate::Error::serialization()
                .with_message(e.to_string())
                .with_source(e),
            Error::Base64(e) => crate::Error::serialization()
                .with_message(e.to_string())
                .with_source(e),
        }
    }
}
