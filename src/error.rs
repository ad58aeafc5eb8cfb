//! Error types for the event bus.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::sync::Arc;
use thiserror::Error;

/// Failure talking to the remote conversation service.
#[derive(Debug, Error)]
pub enum ApiError {
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    #[error("{method} returned status {status}: {message}")]
    Status {
        method: String,
        status: u16,
        message: String,
    },

    #[error("Decode error: {0}")]
    Decode(#[from] serde_json::Error),

    #[error("Transport error: {0}")]
    Transport(String),
}

/// Errors returned synchronously by the bus API.
#[derive(Debug, Error)]
pub enum BusError {
    #[error("Event bus must be created inside a tokio runtime")]
    NoRuntime,

    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),
}

/// Classification of the fault that put the bus into the error state.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ErrorCode {
    /// Fetching the initial cursor failed.
    InitFailed,
    /// A periodic log fetch failed.
    PollFailed,
    /// Error state entered without a payload.
    Unknown,
}

impl fmt::Display for ErrorCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            ErrorCode::InitFailed => "init_failed",
            ErrorCode::PollFailed => "poll_failed",
            ErrorCode::Unknown => "unknown",
        };
        f.write_str(s)
    }
}

/// Callback that restarts initialization of the bus that produced a fault.
#[derive(Clone)]
pub struct Retry(Arc<dyn Fn() + Send + Sync>);

impl Retry {
    pub fn new(f: impl Fn() + Send + Sync + 'static) -> Self {
        Retry(Arc::new(f))
    }

    /// Ask the bus to initialize again.
    pub fn retry(&self) {
        (self.0)()
    }
}

impl fmt::Debug for Retry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("Retry(..)")
    }
}

/// Error payload carried by the bus while it is in the error state.
#[derive(Clone, Debug)]
pub struct BusFault {
    pub code: ErrorCode,
    /// The error that caused the fault, if there was one.
    pub cause: Option<Arc<ApiError>>,
    pub retry: Retry,
}

impl BusFault {
    pub fn new(code: ErrorCode, cause: Option<ApiError>, retry: Retry) -> Self {
        Self {
            code,
            cause: cause.map(Arc::new),
            retry,
        }
    }
}

impl fmt::Display for BusFault {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.cause {
            Some(cause) => write!(f, "{}: {}", self.code, cause),
            None => write!(f, "{}", self.code),
        }
    }
}

/// Result type for bus operations.
pub type Result<T> = std::result::Result<T, BusError>;
