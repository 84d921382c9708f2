// src/utils/error.rs

use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::fmt;
use thiserror::Error;

pub type PulseResult<T> = Result<T, PulseError>;

/// Custom error details for additional context
pub type ErrorDetails = HashMap<String, serde_json::Value>;

/// Main error type for the market pulse core.
///
/// Transport failures against the KV backend are absorbed below this layer, so a
/// `PulseError` reaching a caller is almost always a fetch (business logic) failure,
/// a configuration problem, or a degraded cache-aside path reported to `on_error`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PulseError {
    pub message: String,
    pub details: Option<Box<ErrorDetails>>,
    pub error_code: Option<String>,
    pub kind: ErrorKind,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ErrorKind {
    #[default]
    UnknownError,
    CacheError,
    LockContention,
    FetchError,
    ConfigurationError,
    SerializationError,
    DeserializationError,
    TimeoutError,
    ServiceUnavailable,
    Internal,
}

impl fmt::Display for PulseError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.message)
    }
}

impl std::error::Error for PulseError {}

impl PulseError {
    pub fn new(kind: ErrorKind, message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
            details: None,
            error_code: None,
            kind,
        }
    }

    pub fn with_details(mut self, details: ErrorDetails) -> Self {
        self.details = Some(Box::new(details));
        self
    }

    pub fn with_detail(mut self, key: &str, value: impl Into<serde_json::Value>) -> Self {
        self.details
            .get_or_insert_with(Default::default)
            .insert(key.to_string(), value.into());
        self
    }

    pub fn with_code(mut self, error_code: impl Into<String>) -> Self {
        self.error_code = Some(error_code.into());
        self
    }

    pub fn is_kind(&self, kind: ErrorKind) -> bool {
        self.kind == kind
    }

    pub fn cache_error<T: Into<String>>(message: T) -> Self {
        Self::new(ErrorKind::CacheError, message).with_code("CACHE_ERROR")
    }

    /// Raised on the degraded cache-aside path: another caller holds the
    /// recompute lock and the value did not show up after the backoff.
    pub fn lock_contention(key: &str) -> Self {
        Self::new(
            ErrorKind::LockContention,
            format!("Cache key {} is being recomputed by another caller", key),
        )
        .with_code("LOCK_CONTENTION")
        .with_detail("key", key)
    }

    pub fn fetch_error<T: Into<String>>(message: T) -> Self {
        Self::new(ErrorKind::FetchError, message).with_code("FETCH_ERROR")
    }

    pub fn config_error(message: impl Into<String>) -> Self {
        Self::new(ErrorKind::ConfigurationError, message).with_code("CONFIG_ERROR")
    }

    pub fn serialization_error<T: Into<String>>(message: T) -> Self {
        Self::new(ErrorKind::SerializationError, message).with_code("SERIALIZATION_ERROR")
    }

    pub fn parse_error(message: impl Into<String>) -> Self {
        Self::new(ErrorKind::DeserializationError, message).with_code("PARSE_ERROR")
    }

    pub fn timeout_error(message: impl Into<String>) -> Self {
        Self::new(ErrorKind::TimeoutError, message).with_code("TIMEOUT_ERROR")
    }

    pub fn service_unavailable<T: Into<String>>(message: T) -> Self {
        Self::new(ErrorKind::ServiceUnavailable, message).with_code("SERVICE_UNAVAILABLE")
    }

    pub fn internal_error<T: Into<String>>(message: T) -> Self {
        Self::new(ErrorKind::Internal, message).with_code("INTERNAL_ERROR")
    }
}

/// Errors raised by a KV backend. These never leave the adapter/lock layer
/// except through `KvStoreAdapter::set_if_absent`.
#[derive(Error, Debug)]
pub enum KvOperationError {
    #[error("KV operation timed out after {0}ms")]
    Timeout(u64),
    #[error("KV connection error: {0}")]
    Connection(String),
    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
    #[error("KV command error: {0}")]
    Command(String),
    #[error("Storage error: {0}")]
    Storage(String),
    #[error("KV backend unavailable")]
    Unavailable,
}

pub type KvResult<T> = Result<T, KvOperationError>;

impl From<redis::RedisError> for KvOperationError {
    fn from(err: redis::RedisError) -> Self {
        if err.is_timeout() {
            KvOperationError::Timeout(0)
        } else if err.is_connection_refusal() || err.is_connection_dropped() || err.is_io_error() {
            KvOperationError::Connection(err.to_string())
        } else {
            KvOperationError::Command(err.to_string())
        }
    }
}

impl From<serde_json::Error> for PulseError {
    fn from(err: serde_json::Error) -> Self {
        PulseError::parse_error(format!("JSON parsing error: {}", err))
    }
}

impl From<KvOperationError> for PulseError {
    fn from(err: KvOperationError) -> Self {
        match err {
            KvOperationError::Timeout(ms) => {
                PulseError::timeout_error(format!("KV operation timed out after {}ms", ms))
            }
            KvOperationError::Serialization(e) => PulseError::serialization_error(format!(
                "KV serialization/deserialization error: {}",
                e
            )),
            KvOperationError::Unavailable => {
                PulseError::service_unavailable("KV service unavailable")
            }
            other => PulseError::cache_error(other.to_string()),
        }
    }
}

// Helper macro for creating errors with context
#[macro_export]
macro_rules! pulse_error {
    ($kind:expr, $msg:expr) => {
        $crate::utils::error::PulseError::new($kind, $msg)
    };
    ($kind:expr, $msg:expr, $($key:expr => $value:expr),+) => {{
        let mut details = std::collections::HashMap::new();
        $(
            details.insert($key.to_string(), serde_json::json!($value));
        )+
        $crate::utils::error::PulseError::new($kind, $msg).with_details(details)
    }};
}
