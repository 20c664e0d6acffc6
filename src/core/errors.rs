//! SIM-prefixed error types with structured error codes.

#![allow(missing_docs)]

use std::path::{Path, PathBuf};

use serde_json::{Value, json};
use thiserror::Error;

/// Shared `Result` alias for the project.
pub type Result<T> = std::result::Result<T, SimError>;

/// Top-level error type for the storage console simulator.
///
/// Request-level variants (1xxx) are raised by handlers and the dispatcher and
/// carry the exact `detail` text the client sees. Everything else is an
/// infrastructure failure that never reaches a response body.
#[derive(Debug, Error)]
pub enum SimError {
    #[error("[SIM-1001] validation failed: {detail}")]
    Validation { detail: String },

    #[error("[SIM-1002] conflict: {detail}")]
    Conflict { detail: String },

    #[error("[SIM-1003] not found: {detail}")]
    NotFound { detail: String },

    #[error("[SIM-1004] authentication failed: {detail}")]
    Authentication { detail: String },

    #[error("[SIM-1005] no route for {method} {path}")]
    Unrouted { method: String, path: String },

    #[error("[SIM-2001] invalid configuration: {details}")]
    InvalidConfig { details: String },

    #[error("[SIM-2002] missing configuration file: {path}")]
    MissingConfig { path: PathBuf },

    #[error("[SIM-2003] configuration parse failure in {context}: {details}")]
    ConfigParse {
        context: &'static str,
        details: String,
    },

    #[error("[SIM-2004] route table conflict: {details}")]
    RouteConflict { details: String },

    #[error("[SIM-3001] serialization failure in {context}: {details}")]
    Serialization {
        context: &'static str,
        details: String,
    },

    #[error("[SIM-3002] IO failure at {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
}

/// Message used for requests that match no registered route.
pub const OFFLINE_UNSUPPORTED: &str = "This endpoint is not supported in offline mode.";

impl SimError {
    /// Stable machine-parseable error code.
    #[must_use]
    pub const fn code(&self) -> &'static str {
        match self {
            Self::Validation { .. } => "SIM-1001",
            Self::Conflict { .. } => "SIM-1002",
            Self::NotFound { .. } => "SIM-1003",
            Self::Authentication { .. } => "SIM-1004",
            Self::Unrouted { .. } => "SIM-1005",
            Self::InvalidConfig { .. } => "SIM-2001",
            Self::MissingConfig { .. } => "SIM-2002",
            Self::ConfigParse { .. } => "SIM-2003",
            Self::RouteConflict { .. } => "SIM-2004",
            Self::Serialization { .. } => "SIM-3001",
            Self::Io { .. } => "SIM-3002",
        }
    }

    /// HTTP status the real backend would answer with for this failure.
    ///
    /// Infrastructure failures surface as 500.
    #[must_use]
    pub const fn http_status(&self) -> u16 {
        match self {
            Self::Validation { .. } => 400,
            Self::Conflict { .. } => 409,
            Self::NotFound { .. } | Self::Unrouted { .. } => 404,
            Self::Authentication { .. } => 401,
            _ => 500,
        }
    }

    /// Client-facing message without the code prefix.
    #[must_use]
    pub fn detail(&self) -> String {
        match self {
            Self::Validation { detail }
            | Self::Conflict { detail }
            | Self::NotFound { detail }
            | Self::Authentication { detail } => detail.clone(),
            Self::Unrouted { .. } => OFFLINE_UNSUPPORTED.to_string(),
            other => other.to_string(),
        }
    }

    /// Failure body in the backend's `{detail}` envelope.
    #[must_use]
    pub fn envelope(&self) -> Value {
        match self {
            Self::Unrouted { method, path } => json!({
                "detail": OFFLINE_UNSUPPORTED,
                "method": method,
                "path": path,
            }),
            other => json!({ "detail": other.detail() }),
        }
    }

    /// Whether this error belongs to a single request rather than the simulator itself.
    #[must_use]
    pub const fn is_request_error(&self) -> bool {
        matches!(
            self,
            Self::Validation { .. }
                | Self::Conflict { .. }
                | Self::NotFound { .. }
                | Self::Authentication { .. }
                | Self::Unrouted { .. }
        )
    }

    #[must_use]
    pub fn validation(detail: impl Into<String>) -> Self {
        Self::Validation {
            detail: detail.into(),
        }
    }

    #[must_use]
    pub fn conflict(detail: impl Into<String>) -> Self {
        Self::Conflict {
            detail: detail.into(),
        }
    }

    #[must_use]
    pub fn not_found(detail: impl Into<String>) -> Self {
        Self::NotFound {
            detail: detail.into(),
        }
    }

    /// Convenience constructor for IO errors with a known path.
    #[must_use]
    pub fn io(path: impl AsRef<Path>, source: std::io::Error) -> Self {
        Self::Io {
            path: path.as_ref().to_path_buf(),
            source,
        }
    }
}

impl From<serde_json::Error> for SimError {
    fn from(value: serde_json::Error) -> Self {
        Self::Serialization {
            context: "serde_json",
            details: value.to_string(),
        }
    }
}

impl From<toml::de::Error> for SimError {
    fn from(value: toml::de::Error) -> Self {
        Self::ConfigParse {
            context: "toml",
            details: value.to_string(),
        }
    }
}
