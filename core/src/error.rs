//! Error types for the journal API client.
//!
//! # Design
//! Every failure surfaced by `JournalClient` is an `ApiError`. The variant
//! tells the caller which layer failed: the network (`Transport`), the
//! per-attempt deadline (`Timeout`), the server's status code (`Http`), or
//! the body contract (`Validation`). Not-found and unauthorized are not
//! separate variants; callers branch on `status()` or the `is_*` helpers.

use thiserror::Error;

/// Coarse classification of an `ApiError`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ErrorKind {
    Transport,
    Timeout,
    Http,
    Validation,
    Serialization,
}

/// Errors returned by `JournalClient` operations and `JournalCodec` parsers.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ApiError {
    /// The request never produced a response: connection refused, DNS
    /// failure, reset mid-body, etc.
    #[error("transport error: {0}")]
    Transport(String),

    /// The final attempt did not complete within the configured timeout.
    #[error("request timed out after {timeout_ms} ms")]
    Timeout { timeout_ms: u64 },

    /// The server answered with a non-2xx status.
    #[error("HTTP {status}: {body}")]
    Http { status: u16, body: String },

    /// The response body could not be parsed or did not match the entry shape.
    #[error("invalid response: {0}")]
    Validation(String),

    /// The request payload could not be serialized to JSON.
    #[error("serialization failed: {0}")]
    Serialization(String),
}

impl ApiError {
    pub fn kind(&self) -> ErrorKind {
        match self {
            ApiError::Transport(_) => ErrorKind::Transport,
            ApiError::Timeout { .. } => ErrorKind::Timeout,
            ApiError::Http { .. } => ErrorKind::Http,
            ApiError::Validation(_) => ErrorKind::Validation,
            ApiError::Serialization(_) => ErrorKind::Serialization,
        }
    }

    /// HTTP status code, when the server answered.
    pub fn status(&self) -> Option<u16> {
        match self {
            ApiError::Http { status, .. } => Some(*status),
            _ => None,
        }
    }

    pub fn is_not_found(&self) -> bool {
        self.status() == Some(404)
    }

    pub fn is_unauthorized(&self) -> bool {
        self.status() == Some(401)
    }

    /// Whether a user-facing retry action makes sense.
    ///
    /// Validation failures mean the server broke its contract; asking again
    /// returns the same body.
    pub fn is_retryable(&self) -> bool {
        matches!(
            self.kind(),
            ErrorKind::Transport | ErrorKind::Timeout | ErrorKind::Http
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn http_error_exposes_status() {
        let err = ApiError::Http {
            status: 404,
            body: "missing".to_string(),
        };
        assert_eq!(err.kind(), ErrorKind::Http);
        assert_eq!(err.status(), Some(404));
        assert!(err.is_not_found());
        assert!(!err.is_unauthorized());
        assert_eq!(err.to_string(), "HTTP 404: missing");
    }

    #[test]
    fn non_http_errors_have_no_status() {
        assert_eq!(ApiError::Timeout { timeout_ms: 10 }.status(), None);
        assert_eq!(ApiError::Transport("refused".into()).status(), None);
        assert!(!ApiError::Validation("bad".into()).is_not_found());
    }

    #[test]
    fn validation_is_not_retryable() {
        assert!(!ApiError::Validation("bad".into()).is_retryable());
        assert!(!ApiError::Serialization("bad".into()).is_retryable());
        assert!(ApiError::Transport("refused".into()).is_retryable());
        assert!(ApiError::Timeout { timeout_ms: 1 }.is_retryable());
        assert!(ApiError::Http {
            status: 503,
            body: String::new()
        }
        .is_retryable());
    }

    #[test]
    fn timeout_message_names_budget() {
        let err = ApiError::Timeout { timeout_ms: 10000 };
        assert_eq!(err.to_string(), "request timed out after 10000 ms");
    }
}
