//! Transfer Error Types
//!
//! Transport failures, submit rejections and terminal failure reasons are kept
//! apart: a well-formed "insufficient funds" reply is a value, never one of these.

use std::time::Duration;

use thiserror::Error;

/// Category of a transport-level failure
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TransportErrorKind {
    /// Endpoint unreachable (DNS, refused, reset)
    Connect,
    /// Request exceeded its timeout
    Timeout,
    /// Endpoint answered with a non-2xx status
    HttpStatus(u16),
    /// Body was not decodable JSON
    Decode,
}

/// Network/HTTP failure reaching the intent or balance endpoint
#[derive(Error, Debug, Clone, PartialEq, Eq)]
#[error("{endpoint} transport error ({}): {message}", self.code())]
pub struct TransportError {
    pub kind: TransportErrorKind,
    pub endpoint: &'static str,
    pub message: String,
}

impl TransportError {
    pub fn new(
        kind: TransportErrorKind,
        endpoint: &'static str,
        message: impl Into<String>,
    ) -> Self {
        Self {
            kind,
            endpoint,
            message: message.into(),
        }
    }

    /// Map a reqwest failure onto a transport kind
    pub fn from_reqwest(endpoint: &'static str, e: reqwest::Error) -> Self {
        let kind = if e.is_timeout() {
            TransportErrorKind::Timeout
        } else if let Some(status) = e.status() {
            TransportErrorKind::HttpStatus(status.as_u16())
        } else if e.is_decode() {
            TransportErrorKind::Decode
        } else {
            TransportErrorKind::Connect
        };
        Self::new(kind, endpoint, e.to_string())
    }

    /// Get the error code for presentation
    pub fn code(&self) -> &'static str {
        match self.kind {
            TransportErrorKind::Connect => "CONNECT",
            TransportErrorKind::Timeout => "TIMEOUT",
            TransportErrorKind::HttpStatus(_) => "HTTP_STATUS",
            TransportErrorKind::Decode => "DECODE",
        }
    }

    /// Transport failures are surfaced as retryable by the user
    pub fn is_retryable(&self) -> bool {
        true
    }
}

/// Rejection of `submit` before any state change
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum OrchestratorError {
    #[error("A transfer for user {user_id} is already in progress")]
    AlreadyInProgress { user_id: String },

    #[error("Invalid transfer request: {0}")]
    InvalidRequest(String),
}

impl OrchestratorError {
    pub fn code(&self) -> &'static str {
        match self {
            OrchestratorError::AlreadyInProgress { .. } => "ALREADY_IN_PROGRESS",
            OrchestratorError::InvalidRequest(_) => "INVALID_REQUEST",
        }
    }
}

/// Why an attempt ended in FAILED
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum FailureReason {
    #[error(transparent)]
    Transport(#[from] TransportError),

    #[error("{0}")]
    Business(String),

    #[error("Funds did not arrive within {}s", .waited.as_secs())]
    FundingTimeout { waited: Duration },

    #[error("Still insufficient funds after {retries} automatic retries")]
    RetryLimitExceeded { retries: u32 },
}

impl FailureReason {
    /// Stable kind string for presentation
    pub fn kind(&self) -> &'static str {
        match self {
            FailureReason::Transport(_) => "TRANSPORT_ERROR",
            FailureReason::Business(_) => "BUSINESS_ERROR",
            FailureReason::FundingTimeout { .. } => "FUNDING_TIMEOUT",
            FailureReason::RetryLimitExceeded { .. } => "RETRY_LIMIT_EXCEEDED",
        }
    }

    pub fn is_transport(&self) -> bool {
        matches!(self, FailureReason::Transport(_))
    }
}
