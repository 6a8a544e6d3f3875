//! Error types for the library client

use std::collections::BTreeMap;
use std::fmt;

use reqwest::StatusCode;
use serde::Deserialize;
use thiserror::Error;

/// Failure kinds surfaced to the user
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKind {
    Validation,
    Network,
    NotFound,
    Server,
    Unknown,
}

/// Per-field validation messages, keyed by field name
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct FieldErrors(BTreeMap<String, String>);

impl FieldErrors {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&mut self, field: impl Into<String>, message: impl Into<String>) {
        self.0.insert(field.into(), message.into());
    }

    /// Message for a single field, if it failed
    pub fn get(&self, field: &str) -> Option<&str> {
        self.0.get(field).map(String::as_str)
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &str)> {
        self.0.iter().map(|(k, v)| (k.as_str(), v.as_str()))
    }
}

impl From<validator::ValidationErrors> for FieldErrors {
    fn from(errors: validator::ValidationErrors) -> Self {
        let mut fields = FieldErrors::new();
        for (field, errs) in errors.field_errors() {
            let message = errs
                .first()
                .and_then(|e| e.message.as_ref().map(|m| m.to_string()))
                .unwrap_or_else(|| format!("{} is invalid", field));
            fields.insert(field.to_string(), message);
        }
        fields
    }
}

impl fmt::Display for FieldErrors {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let parts: Vec<String> = self.iter().map(|(k, v)| format!("{}: {}", k, v)).collect();
        write!(f, "{}", parts.join("; "))
    }
}

/// Main application error type
#[derive(Error, Debug, Clone)]
pub enum AppError {
    #[error("Validation error: {0}")]
    Validation(FieldErrors),

    #[error("Rejected by server: {0}")]
    Rejected(String),

    #[error("Network error: {0}")]
    Network(String),

    #[error("Not found: {0}")]
    NotFound(String),

    #[error("Server error: {0}")]
    Server(String),

    #[error("Unexpected error: {0}")]
    Unknown(String),
}

impl AppError {
    pub fn kind(&self) -> ErrorKind {
        match self {
            AppError::Validation(_) | AppError::Rejected(_) => ErrorKind::Validation,
            AppError::Network(_) => ErrorKind::Network,
            AppError::NotFound(_) => ErrorKind::NotFound,
            AppError::Server(_) => ErrorKind::Server,
            AppError::Unknown(_) => ErrorKind::Unknown,
        }
    }

    /// Short human-readable reason, used in notifications
    pub fn reason(&self) -> String {
        match self {
            AppError::Validation(fields) => fields.to_string(),
            AppError::Rejected(msg)
            | AppError::Network(msg)
            | AppError::NotFound(msg)
            | AppError::Server(msg)
            | AppError::Unknown(msg) => msg.clone(),
        }
    }

    /// Single-field validation error
    pub fn field(field: &str, message: &str) -> Self {
        let mut fields = FieldErrors::new();
        fields.insert(field, message);
        AppError::Validation(fields)
    }

    /// Classify a non-success HTTP response
    pub fn from_status(status: StatusCode, body: &str) -> Self {
        let reason = ApiErrorBody::reason(body)
            .unwrap_or_else(|| format!("HTTP {}", status.as_u16()));

        if status == StatusCode::NOT_FOUND {
            AppError::NotFound(reason)
        } else if status.is_client_error() {
            AppError::Rejected(reason)
        } else if status.is_server_error() {
            AppError::Server(reason)
        } else {
            AppError::Unknown(reason)
        }
    }
}

impl From<reqwest::Error> for AppError {
    fn from(e: reqwest::Error) -> Self {
        if let Some(status) = e.status() {
            return AppError::from_status(status, "");
        }
        if e.is_timeout() {
            AppError::Network(format!("request timed out: {}", e))
        } else if e.is_decode() {
            AppError::Unknown(format!("unexpected response format: {}", e))
        } else {
            AppError::Network(e.to_string())
        }
    }
}

/// Error body returned by the library API
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct ApiErrorBody {
    message: Option<String>,
    debug_message: Option<String>,
}

impl ApiErrorBody {
    fn reason(body: &str) -> Option<String> {
        let parsed: ApiErrorBody = serde_json::from_str(body).ok()?;
        parsed
            .debug_message
            .or(parsed.message)
            .filter(|m| !m.trim().is_empty())
    }
}

/// Result type alias for client operations
pub type AppResult<T> = Result<T, AppError>;
