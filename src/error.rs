//! Cambio error types

use std::fmt;
use std::time::Duration;

/// Transport-level failure category, reported when no usable response
/// was received from the upstream.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum TransportErrorKind {
    /// The attempt exceeded its timeout budget.
    Timeout,
    /// Connection could not be established (refused, DNS failure, TLS).
    Connect,
    /// The connection broke while sending the request.
    Request,
    /// The response body could not be read to completion.
    Body,
    /// The request could not be built (bad URL, invalid header).
    Builder,
}

impl TransportErrorKind {
    /// Error code used for the `reason` metric label.
    pub fn code(self) -> &'static str {
        match self {
            Self::Timeout => "ETIMEDOUT",
            Self::Connect => "ECONNREFUSED",
            Self::Request => "ECONNRESET",
            Self::Body => "EBODY",
            Self::Builder => "EBUILDER",
        }
    }

    /// Classify a reqwest error.
    pub fn from_reqwest(err: &reqwest::Error) -> Self {
        if err.is_timeout() {
            Self::Timeout
        } else if err.is_connect() {
            Self::Connect
        } else if err.is_body() || err.is_decode() {
            Self::Body
        } else if err.is_builder() {
            Self::Builder
        } else {
            Self::Request
        }
    }
}

impl fmt::Display for TransportErrorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.code())
    }
}

/// Cambio error types
#[derive(Debug, Clone, thiserror::Error)]
pub enum CambioError {
    // Transport errors
    #[error("HTTP error ({kind}): {message}")]
    Http {
        kind: TransportErrorKind,
        message: String,
    },

    // Upstream responses
    #[error("API error ({status}): {message}")]
    Api { status: u16, message: String },

    #[error("rate limited, retry after {retry_after:?}")]
    RateLimited { retry_after: Option<Duration> },

    #[error("unexpected redirect ({status}) to {location:?}")]
    Redirect {
        status: u16,
        location: Option<String>,
    },

    // Data errors
    #[error("JSON error: {0}")]
    Json(String),

    #[error("invalid input: {0}")]
    InvalidInput(String),

    // Configuration errors
    #[error("configuration error: {0}")]
    Configuration(String),
}

impl CambioError {
    /// Build an error from an unsuccessful upstream status.
    pub fn from_status(status: u16, message: impl Into<String>) -> Self {
        Self::Api {
            status,
            message: message.into(),
        }
    }

    /// Whether the failure is worth retrying.
    ///
    /// Network failures, 429 and 5xx responses are transient (every
    /// upstream call is an idempotent GET). Request-building failures,
    /// redirects and other 4xx statuses are permanent.
    pub fn is_transient(&self) -> bool {
        match self {
            Self::Http { kind, .. } => *kind != TransportErrorKind::Builder,
            Self::RateLimited { .. } => true,
            Self::Api { status, .. } => (500..600).contains(status),
            _ => false,
        }
    }

    /// Provider-supplied delay hint, if any.
    pub fn retry_after(&self) -> Option<Duration> {
        match self {
            Self::RateLimited { retry_after } => *retry_after,
            _ => None,
        }
    }

    /// HTTP status of the upstream response, if one was received.
    pub fn status(&self) -> Option<u16> {
        match self {
            Self::Api { status, .. } | Self::Redirect { status, .. } => Some(*status),
            Self::RateLimited { .. } => Some(429),
            _ => None,
        }
    }

    /// Value of the `reason` label on the error counter: the transport
    /// error code when present, else the HTTP status, else `"unknown"`.
    pub fn reason(&self) -> String {
        match self {
            Self::Http { kind, .. } => kind.code().to_owned(),
            other => other
                .status()
                .map(|s| s.to_string())
                .unwrap_or_else(|| "unknown".to_owned()),
        }
    }
}

impl From<reqwest::Error> for CambioError {
    fn from(err: reqwest::Error) -> Self {
        CambioError::Http {
            kind: TransportErrorKind::from_reqwest(&err),
            message: err.to_string(),
        }
    }
}

impl From<serde_json::Error> for CambioError {
    fn from(err: serde_json::Error) -> Self {
        CambioError::Json(err.to_string())
    }
}

/// Result type alias for Cambio operations
pub type Result<T> = std::result::Result<T, CambioError>;
