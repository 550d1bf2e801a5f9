//! Universal error types for kinko.
//!
//! Every error maps to a category and a recoverability flag. Fetchers and
//! the aggregator recover from network-class errors locally (fallback or
//! "unknown" sentinel); only validation errors and sync version conflicts
//! reach callers of the public operations.
//!
//! JSON envelope used by the CLI:
//! ```json
//! {
//!   "ok": false,
//!   "error": {
//!     "code": "VERSION_CONFLICT",
//!     "message": "Remote portfolio is at version 5",
//!     "category": "conflict",
//!     "recoverable": true
//!   }
//! }
//! ```

use serde::Serialize;
use thiserror::Error;

/// Error class. Decides whether a failure is degraded locally or surfaced.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum ErrorCategory {
    Network,
    Validation,
    Conflict,
    Storage,
    Config,
    System,
}

impl ErrorCategory {
    /// Process exit code for the CLI.
    pub fn exit_code(self) -> i32 {
        match self {
            ErrorCategory::Validation | ErrorCategory::Config => 1,
            ErrorCategory::Network => 2,
            ErrorCategory::Conflict => 4,
            ErrorCategory::Storage | ErrorCategory::System => 3,
        }
    }
}

/// Structured error detail for JSON output.
#[derive(Debug, Clone, Serialize)]
pub struct ErrorDetail {
    pub code: String,
    pub message: String,
    pub category: ErrorCategory,
    pub recoverable: bool,
}

/// Top-level error type for all kinko operations.
#[derive(Debug, Clone, Error)]
pub enum KinkoError {
    // ── Network ─────────────────────────────────────────────────────
    #[error("Network error: {0}")]
    Network(String),

    #[error("Request timed out: {0}")]
    Timeout(String),

    #[error("Rate limited: {0}")]
    RateLimited(String),

    #[error("HTTP {status}: {body}")]
    Http { status: u16, body: String },

    #[error("Malformed response: {0}")]
    Parse(String),

    // ── Validation ───────────────────────────────────────────────────
    #[error("Unsupported chain: {0}")]
    InvalidChain(String),

    #[error("Invalid wallet address: {0}")]
    InvalidAddress(String),

    #[error("Not found: {0}")]
    NotFound(String),

    // ── Conflict ─────────────────────────────────────────────────────
    #[error("Version conflict: remote portfolio is at version {expected}")]
    VersionConflict { expected: u64 },

    // ── Storage / config ─────────────────────────────────────────────
    #[error("Storage error: {0}")]
    Storage(String),

    #[error("Configuration error: {0}")]
    Config(String),

    #[error("{0}")]
    Other(String),
}

impl KinkoError {
    pub fn category(&self) -> ErrorCategory {
        match self {
            KinkoError::Network(_)
            | KinkoError::Timeout(_)
            | KinkoError::RateLimited(_)
            | KinkoError::Http { .. }
            | KinkoError::Parse(_) => ErrorCategory::Network,
            KinkoError::InvalidChain(_)
            | KinkoError::InvalidAddress(_)
            | KinkoError::NotFound(_) => ErrorCategory::Validation,
            KinkoError::VersionConflict { .. } => ErrorCategory::Conflict,
            KinkoError::Storage(_) => ErrorCategory::Storage,
            KinkoError::Config(_) => ErrorCategory::Config,
            KinkoError::Other(_) => ErrorCategory::System,
        }
    }

    /// Whether retrying (or choosing another source) can succeed.
    pub fn is_recoverable(&self) -> bool {
        match self {
            KinkoError::Http { status, .. } => *status >= 500 || *status == 429,
            KinkoError::InvalidChain(_) | KinkoError::InvalidAddress(_) => false,
            KinkoError::Storage(_) | KinkoError::Other(_) => false,
            _ => true,
        }
    }

    pub fn code(&self) -> &'static str {
        match self {
            KinkoError::Network(_) => "NETWORK_ERROR",
            KinkoError::Timeout(_) => "TIMEOUT",
            KinkoError::RateLimited(_) => "RATE_LIMITED",
            KinkoError::Http { .. } => "HTTP_ERROR",
            KinkoError::Parse(_) => "MALFORMED_RESPONSE",
            KinkoError::InvalidChain(_) => "INVALID_CHAIN",
            KinkoError::InvalidAddress(_) => "INVALID_ADDRESS",
            KinkoError::NotFound(_) => "NOT_FOUND",
            KinkoError::VersionConflict { .. } => "VERSION_CONFLICT",
            KinkoError::Storage(_) => "STORAGE_ERROR",
            KinkoError::Config(_) => "CONFIG_ERROR",
            KinkoError::Other(_) => "UNKNOWN_ERROR",
        }
    }

    pub fn detail(&self) -> ErrorDetail {
        ErrorDetail {
            code: self.code().into(),
            message: self.to_string(),
            category: self.category(),
            recoverable: self.is_recoverable(),
        }
    }

    pub fn exit_code(&self) -> i32 {
        self.category().exit_code()
    }

    /// Serialize this error as the JSON error envelope.
    pub fn to_json(&self) -> serde_json::Value {
        serde_json::json!({
            "ok": false,
            "error": self.detail(),
        })
    }
}

impl From<serde_json::Error> for KinkoError {
    fn from(e: serde_json::Error) -> Self {
        KinkoError::Parse(e.to_string())
    }
}

pub type KinkoResult<T> = Result<T, KinkoError>;
