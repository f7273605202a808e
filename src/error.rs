//! Error types for azrm
//!
//! Every failure carries the operation name and URL it happened on, so callers
//! can log or render it without re-deriving context.

use std::fmt;
use std::time::Duration;

use reqwest::StatusCode;
use thiserror::Error;

use crate::lro::OperationState;
use crate::models::ErrorDetail;
use crate::resourceids::ParseError;

/// Why a poll loop stopped on the caller's side
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CancelReason {
    /// The caller's cancellation token fired
    Token,
    /// The overall timeout configured in `PollOptions` elapsed
    Timeout(Duration),
}

impl fmt::Display for CancelReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            CancelReason::Token => write!(f, "cancelled by caller"),
            CancelReason::Timeout(timeout) => write!(f, "timed out after {:?}", timeout),
        }
    }
}

/// Errors returned by the ARM client, poller and pager
#[derive(Error, Debug)]
pub enum Error {
    /// The server signalled asynchronous completion but gave no usable polling URL
    #[error("{operation}: {url} returned {status} without a usable polling URL")]
    MalformedAsyncResponse {
        operation: String,
        url: String,
        status: StatusCode,
    },

    /// The server-side operation finished as Failed or Canceled
    #[error("{operation}: long-running operation at {url} finished as {state}{suffix}", suffix = detail_suffix(.error))]
    OperationFailed {
        operation: String,
        url: String,
        state: OperationState,
        error: Option<ErrorDetail>,
        /// Raw body of the last poll response, verbatim
        body: String,
    },

    /// The caller gave up waiting
    #[error("{operation}: polling {url} stopped: {reason}")]
    Cancelled {
        operation: String,
        url: String,
        reason: CancelReason,
    },

    /// `load_more` was called on an exhausted page
    #[error("no more pages: the page carried no nextLink")]
    NoMorePages,

    /// `result()` was asked for before the operation reached a terminal state
    #[error("{operation}: operation at {url} has not finished yet")]
    OperationNotDone { operation: String, url: String },

    /// Non-success HTTP status from ARM
    #[error("{operation}: {method} {url} returned {status}{suffix}", suffix = detail_suffix(.error))]
    Http {
        operation: String,
        method: String,
        url: String,
        status: StatusCode,
        error: Option<ErrorDetail>,
        body: String,
    },

    /// Transport failure that escaped the HTTP client
    #[error("HTTP transport error: {0}")]
    Transport(#[from] reqwest::Error),

    /// Response body did not match the expected shape
    #[error("{operation}: failed to decode response from {url}: {source}")]
    Decode {
        operation: String,
        url: String,
        #[source]
        source: serde_json::Error,
    },

    /// A list response carried a nextLink that is not a URL
    #[error("{operation}: invalid nextLink {link}: {source}")]
    InvalidPageLink {
        operation: String,
        link: String,
        #[source]
        source: url::ParseError,
    },

    #[error(transparent)]
    InvalidResourceId(#[from] ParseError),

    #[error("credential error: {0}")]
    Credential(String),

    #[error("configuration error: {0}")]
    Config(String),
}

/// Result type alias for azrm operations
pub type Result<T> = std::result::Result<T, Error>;

fn detail_suffix(error: &Option<ErrorDetail>) -> String {
    match error {
        Some(detail) => format!(": {}", detail),
        None => String::new(),
    }
}

impl Error {
    /// HTTP status carried by the error, if any
    pub fn status(&self) -> Option<StatusCode> {
        match self {
            Error::Http { status, .. } => Some(*status),
            Error::MalformedAsyncResponse { status, .. } => Some(*status),
            Error::Transport(e) => e.status(),
            _ => None,
        }
    }

    /// Server-reported error payload, if any
    pub fn service_error(&self) -> Option<&ErrorDetail> {
        match self {
            Error::Http { error, .. } | Error::OperationFailed { error, .. } => error.as_ref(),
            _ => None,
        }
    }

    /// Returns true if this is a "not found" error (404)
    #[must_use]
    pub fn is_not_found(&self) -> bool {
        self.status() == Some(StatusCode::NOT_FOUND)
    }

    /// Returns true if this is an authentication/authorization error (401/403)
    #[must_use]
    pub fn is_unauthorized(&self) -> bool {
        matches!(
            self.status(),
            Some(StatusCode::UNAUTHORIZED) | Some(StatusCode::FORBIDDEN)
        )
    }

    /// Returns true if the caller gave up (token or timeout)
    #[must_use]
    pub fn is_cancelled(&self) -> bool {
        matches!(self, Error::Cancelled { .. })
    }

    /// Returns true if retrying the whole call might succeed.
    ///
    /// Throttling and 5xx responses qualify, as do connection-level transport
    /// errors. Server-reported operation failures never do.
    #[must_use]
    pub fn is_retryable(&self) -> bool {
        match self {
            Error::Http { status, .. } => {
                *status == StatusCode::TOO_MANY_REQUESTS || status.is_server_error()
            }
            Error::Transport(e) => e.is_timeout() || e.is_connect(),
            _ => false,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn http_error(status: StatusCode) -> Error {
        Error::Http {
            operation: "ResourceGroupsClient.Get".to_string(),
            method: "GET".to_string(),
            url: "https://management.azure.com/subscriptions/x".to_string(),
            status,
            error: Some(ErrorDetail::new("ResourceGroupNotFound", "Resource group 'rg' could not be found.")),
            body: String::new(),
        }
    }

    #[test]
    fn test_status_helpers() {
        assert!(http_error(StatusCode::NOT_FOUND).is_not_found());
        assert!(http_error(StatusCode::FORBIDDEN).is_unauthorized());
        assert!(http_error(StatusCode::TOO_MANY_REQUESTS).is_retryable());
        assert!(http_error(StatusCode::SERVICE_UNAVAILABLE).is_retryable());
        assert!(!http_error(StatusCode::BAD_REQUEST).is_retryable());
    }

    #[test]
    fn test_display_includes_server_message() {
        let message = http_error(StatusCode::NOT_FOUND).to_string();
        assert!(message.contains("ResourceGroupNotFound"));
        assert!(message.contains("could not be found"));
        assert!(message.contains("404"));
    }

    #[test]
    fn test_operation_failed_is_not_retryable() {
        let err = Error::OperationFailed {
            operation: "VirtualNetworksClient.CreateOrUpdate".to_string(),
            url: "https://management.azure.com/operations/1".to_string(),
            state: OperationState::Failed,
            error: Some(ErrorDetail::new("InternalError", "boom")),
            body: "{}".to_string(),
        };
        assert!(!err.is_retryable());
        assert!(!err.is_cancelled());
        assert_eq!(err.service_error().and_then(|e| e.code.as_deref()), Some("InternalError"));
        assert!(err.to_string().contains("Failed: InternalError: boom"));
    }

    #[test]
    fn test_cancel_reason_display() {
        let err = Error::Cancelled {
            operation: "op".to_string(),
            url: "u".to_string(),
            reason: CancelReason::Timeout(Duration::from_secs(5)),
        };
        assert!(err.is_cancelled());
        assert!(err.to_string().contains("timed out after 5s"));
    }
}
