//! Errors surfaced by REST calls.

use std::fmt;

use serde::{Deserialize, Serialize};
use serde_json::Value;

/// Categories of API errors.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ApiErrorKind {
    /// Non-2xx status other than 401
    HttpStatus,
    /// 401, including a failed session recovery
    Unauthorized,
    /// Request exceeded the configured timeout
    Timeout,
    /// Connection-level failure
    Network,
    /// Response body did not have the expected shape
    Parse,
}

impl fmt::Display for ApiErrorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ApiErrorKind::HttpStatus => write!(f, "http_status"),
            ApiErrorKind::Unauthorized => write!(f, "unauthorized"),
            ApiErrorKind::Timeout => write!(f, "timeout"),
            ApiErrorKind::Network => write!(f, "network"),
            ApiErrorKind::Parse => write!(f, "parse"),
        }
    }
}

/// Structured error from the backend or the transport.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ApiError {
    pub kind: ApiErrorKind,
    /// HTTP status, when a response was received
    pub status: Option<u16>,
    /// One-line summary suitable for display
    pub message: String,
    /// Raw body or transport detail
    pub details: Option<String>,
}

impl ApiError {
    pub fn new(kind: ApiErrorKind, message: impl Into<String>) -> Self {
        Self {
            kind,
            status: None,
            message: message.into(),
            details: None,
        }
    }

    /// Builds an error from a non-success status and its body.
    ///
    /// Backend bodies look like `{"statusCode":400,"message":"..."}` where
    /// `message` may also be a list of validation messages.
    pub fn http_status(status: u16, body: &str) -> Self {
        let kind = if status == 401 {
            ApiErrorKind::Unauthorized
        } else {
            ApiErrorKind::HttpStatus
        };
        let details = (!body.is_empty()).then(|| body.to_string());
        let message = match extract_message(body) {
            Some(msg) => format!("HTTP {status}: {msg}"),
            None => format!("HTTP {status}"),
        };
        Self {
            kind,
            status: Some(status),
            message,
            details,
        }
    }

    /// The session could not be recovered after a 401.
    pub fn session_expired(reason: impl Into<String>) -> Self {
        Self {
            kind: ApiErrorKind::Unauthorized,
            status: Some(401),
            message: "Session expired, please log in again".to_string(),
            details: Some(reason.into()),
        }
    }

    pub fn timeout(message: impl Into<String>) -> Self {
        Self::new(ApiErrorKind::Timeout, message)
    }

    pub fn network(message: impl Into<String>) -> Self {
        Self::new(ApiErrorKind::Network, message)
    }

    pub fn parse(message: impl Into<String>) -> Self {
        Self::new(ApiErrorKind::Parse, message)
    }

    pub fn with_details(mut self, details: impl Into<String>) -> Self {
        self.details = Some(details.into());
        self
    }

    pub fn is_unauthorized(&self) -> bool {
        self.kind == ApiErrorKind::Unauthorized
    }

    pub(crate) fn from_reqwest(err: &reqwest::Error) -> Self {
        if err.is_timeout() {
            Self::timeout("Request timed out").with_details(err.to_string())
        } else if err.is_decode() {
            Self::parse("Failed to decode response body").with_details(err.to_string())
        } else {
            Self::network("Failed to reach the booking service").with_details(err.to_string())
        }
    }
}

fn extract_message(body: &str) -> Option<String> {
    let json: Value = serde_json::from_str(body).ok()?;
    match json.get("message")? {
        Value::String(msg) if !msg.trim().is_empty() => Some(msg.trim().to_string()),
        Value::Array(items) => {
            let joined = items
                .iter()
                .filter_map(Value::as_str)
                .collect::<Vec<_>>()
                .join("; ");
            (!joined.is_empty()).then_some(joined)
        }
        _ => None,
    }
}

impl fmt::Display for ApiError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.message)
    }
}

impl std::error::Error for ApiError {}

/// Result type for API operations.
pub type ApiResult<T> = std::result::Result<T, ApiError>;
