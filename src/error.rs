use serde::{Deserialize, Serialize};
use std::fmt;

/// JSON body returned for every relay-level failure.
#[derive(Debug, Serialize, Deserialize, Clone, PartialEq, Eq)]
pub struct ErrorResponse {
    pub error: String,
    pub message: String,
}

#[derive(Debug)]
pub enum ApiError {
    /// A required credential is not configured.
    Configuration(String),
    MethodNotAllowed,
    BadRequest(String),
    NotFound,
    /// The client exceeded its request window; carries the window length in seconds.
    RateLimited(u64),
    Upstream(String),
    UpstreamTimeout(String),
    Internal(String),
}

impl fmt::Display for ApiError {
    fn fmt(
        &self,
        f: &mut fmt::Formatter<'_>,
    ) -> fmt::Result {
        match self {
            ApiError::Configuration(msg) => write!(f, "Configuration error: {msg}"),
            ApiError::MethodNotAllowed => write!(f, "Method not allowed"),
            ApiError::BadRequest(msg) => write!(f, "Bad request: {msg}"),
            ApiError::NotFound => write!(f, "Not found"),
            ApiError::RateLimited(window) => write!(f, "Rate limited for {window}s"),
            ApiError::Upstream(msg) => write!(f, "{msg}"),
            ApiError::UpstreamTimeout(msg) => write!(f, "Upstream timeout: {msg}"),
            ApiError::Internal(msg) => write!(f, "{msg}"),
        }
    }
}

impl std::error::Error for ApiError {}

impl ApiError {
    #[must_use]
    pub fn status_code(&self) -> u16 {
        match self {
            ApiError::Configuration(_) | ApiError::Upstream(_) | ApiError::Internal(_) => 500,
            ApiError::MethodNotAllowed => 405,
            ApiError::BadRequest(_) => 400,
            ApiError::NotFound => 404,
            ApiError::RateLimited(_) => 429,
            ApiError::UpstreamTimeout(_) => 504,
        }
    }

    /// Builds the `{error, message}` body.
    ///
    /// `label` is the handler's generic failure label ("Internal server error",
    /// "Search failed") used for upstream and internal failures; the remaining
    /// variants carry their own label.
    #[must_use]
    pub fn error_response(
        &self,
        label: &str,
    ) -> ErrorResponse {
        let (error, message) = match self {
            ApiError::Configuration(msg) => ("Configuration error", msg.clone()),
            ApiError::MethodNotAllowed => ("Method not allowed", "Use POST for this endpoint.".to_string()),
            ApiError::BadRequest(msg) => (msg.as_str(), msg.clone()),
            ApiError::NotFound => ("Not Found", "No route for this path.".to_string()),
            ApiError::RateLimited(window) => (
                "Too many requests",
                format!("Request limit reached, retry in {window} seconds."),
            ),
            ApiError::UpstreamTimeout(_) => ("Upstream timeout", self.to_string()),
            ApiError::Upstream(msg) | ApiError::Internal(msg) => (label, msg.clone()),
        };

        ErrorResponse {
            error: error.to_string(),
            message,
        }
    }

    pub fn configuration(msg: impl Into<String>) -> Self {
        ApiError::Configuration(msg.into())
    }

    pub fn bad_request(msg: impl Into<String>) -> Self {
        ApiError::BadRequest(msg.into())
    }

    pub fn upstream(msg: impl Into<String>) -> Self {
        ApiError::Upstream(msg.into())
    }

    pub fn internal(msg: impl Into<String>) -> Self {
        ApiError::Internal(msg.into())
    }
}

impl From<serde_json::Error> for ApiError {
    fn from(err: serde_json::Error) -> Self {
        ApiError::Internal(format!("Failed to parse JSON: {err}"))
    }
}

impl From<reqwest::Error> for ApiError {
    fn from(err: reqwest::Error) -> Self {
        if err.is_timeout() {
            ApiError::UpstreamTimeout(err.to_string())
        } else {
            ApiError::Internal(format!("Network error: {err}"))
        }
    }
}
