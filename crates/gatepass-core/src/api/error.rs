//! Error taxonomy for calls to the estate API.

use std::fmt;

use reqwest::StatusCode;
use serde::{Deserialize, Serialize};
use serde_json::Value;

/// Shown for failures where no useful server message exists.
pub const GENERIC_NETWORK_MESSAGE: &str =
    "Unable to reach the server. Please check your connection and try again.";
const GENERIC_SERVER_MESSAGE: &str = "Something went wrong on our side. Please try again.";
const SESSION_EXPIRED_MESSAGE: &str = "Your session has expired. Please sign in again.";

/// Categories of API errors for consistent error handling.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ApiErrorKind {
    /// No response received (DNS, connect, reset)
    Network,
    /// No response within the configured bound
    Timeout,
    /// 401 from the server; the session has been cleared
    Auth,
    /// Other 4xx with a message meant for the user
    Validation,
    /// 5xx
    Server,
    /// Response body could not be decoded
    Parse,
}

impl fmt::Display for ApiErrorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ApiErrorKind::Network => write!(f, "network"),
            ApiErrorKind::Timeout => write!(f, "timeout"),
            ApiErrorKind::Auth => write!(f, "auth"),
            ApiErrorKind::Validation => write!(f, "validation"),
            ApiErrorKind::Server => write!(f, "server"),
            ApiErrorKind::Parse => write!(f, "parse"),
        }
    }
}

/// Structured error from the API layer with kind and details.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ApiError {
    /// Error category
    pub kind: ApiErrorKind,
    /// One-line summary suitable for display
    pub message: String,
    /// HTTP status, when a response was received
    pub status: Option<u16>,
    /// Optional additional details (e.g., raw error body)
    pub details: Option<String>,
}

impl ApiError {
    pub fn new(kind: ApiErrorKind, message: impl Into<String>) -> Self {
        Self {
            kind,
            message: message.into(),
            status: None,
            details: None,
        }
    }

    pub fn network(message: impl Into<String>) -> Self {
        Self::new(ApiErrorKind::Network, message)
    }

    pub fn timeout(message: impl Into<String>) -> Self {
        Self::new(ApiErrorKind::Timeout, message)
    }

    pub fn parse(message: impl Into<String>) -> Self {
        Self::new(ApiErrorKind::Parse, message)
    }

    /// Creates an error from a non-success HTTP status and its body.
    ///
    /// The server's `message` field is kept verbatim; for Laravel-style
    /// validation bodies without one, the first field error is used.
    pub fn http_status(status: StatusCode, body: &str) -> Self {
        let server_message = extract_message(body);
        let kind = if status == StatusCode::UNAUTHORIZED {
            ApiErrorKind::Auth
        } else if status.is_client_error() {
            ApiErrorKind::Validation
        } else {
            ApiErrorKind::Server
        };

        let message = match (kind, server_message) {
            (_, Some(msg)) => msg,
            (ApiErrorKind::Auth, None) => SESSION_EXPIRED_MESSAGE.to_string(),
            (_, None) => format!("HTTP {}", status.as_u16()),
        };

        Self {
            kind,
            message,
            status: Some(status.as_u16()),
            details: (!body.trim().is_empty()).then(|| body.to_string()),
        }
    }

    pub fn is_auth(&self) -> bool {
        self.kind == ApiErrorKind::Auth
    }

    /// Message suitable for a toast.
    ///
    /// Validation and auth messages come from the server and are shown as-is;
    /// transport failures collapse to a generic line.
    pub fn user_message(&self) -> String {
        match self.kind {
            ApiErrorKind::Validation | ApiErrorKind::Auth => self.message.clone(),
            ApiErrorKind::Network | ApiErrorKind::Timeout => GENERIC_NETWORK_MESSAGE.to_string(),
            ApiErrorKind::Server | ApiErrorKind::Parse => GENERIC_SERVER_MESSAGE.to_string(),
        }
    }
}

impl fmt::Display for ApiError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.message)
    }
}

impl std::error::Error for ApiError {}

impl From<reqwest::Error> for ApiError {
    fn from(e: reqwest::Error) -> Self {
        classify_reqwest_error(&e)
    }
}

/// Classifies a reqwest error into an `ApiError`.
pub fn classify_reqwest_error(e: &reqwest::Error) -> ApiError {
    if e.is_timeout() {
        ApiError::timeout(format!("Request timed out: {e}"))
    } else if e.is_decode() {
        ApiError::parse(format!("Failed to decode response: {e}"))
    } else if e.is_builder() {
        ApiError::network(format!("Request error: {e}"))
    } else {
        ApiError::network(format!("Network error: {e}"))
    }
}

/// Result type for API operations.
pub type ApiResult<T> = std::result::Result<T, ApiError>;

fn extract_message(body: &str) -> Option<String> {
    let json: Value = serde_json::from_str(body).ok()?;

    if let Some(msg) = json.get("message").and_then(Value::as_str)
        && !msg.trim().is_empty()
    {
        return Some(msg.to_string());
    }

    if let Some(msg) = json
        .get("error")
        .and_then(|e| e.get("message").or(Some(e)))
        .and_then(Value::as_str)
        && !msg.trim().is_empty()
    {
        return Some(msg.to_string());
    }

    json.get("errors")
        .and_then(Value::as_object)
        .and_then(|fields| fields.values().next())
        .and_then(|first| match first {
            Value::Array(items) => items.first().and_then(Value::as_str),
            other => other.as_str(),
        })
        .map(str::to_string)
}
