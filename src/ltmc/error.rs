//! Crate-wide error type.
//!
//! One variant per error kind in §7 of the specification. `Degraded` is
//! deliberately absent here: it is carried as a field on a successful
//! result, never as a failure (see [`crate::ltmc::store::DegradedStatus`]).

use std::fmt;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum LtmcError {
    /// Malformed JSON on the wire.
    ParseError(String),
    /// The JSON-RPC `method` does not name a known tool.
    MethodNotFound(String),
    /// The tool exists but `params`/`action` failed validation.
    InvalidParams(String),
    /// A referenced id/resource does not exist.
    NotFound(String),
    /// A uniqueness constraint would be violated.
    AlreadyExists(String),
    /// A hash-chain or content-hash check failed.
    IntegrityError(String),
    /// A required store write failed after retries.
    WriteFailed(String),
    /// A call exceeded its allotted time budget.
    Timeout(String),
    /// The server is shedding load.
    Overloaded(String),
    /// The bearer token was missing or did not match.
    Unauthorized(String),
    /// A write was attempted while the server is in read-only mode.
    ReadOnlyViolation(String),
    /// Anything else; always logged at `error!`.
    Internal(String),
}

impl LtmcError {
    /// Maps to the JSON-RPC 2.0 transport-level error code. Only the three
    /// wire-level kinds get a distinct code; everything else collapses to
    /// the generic internal-error code, with the specific kind still
    /// carried in the tool-result body as a string.
    pub fn json_rpc_code(&self) -> i64 {
        match self {
            LtmcError::ParseError(_) => -32700,
            LtmcError::MethodNotFound(_) => -32601,
            LtmcError::InvalidParams(_) => -32602,
            _ => -32603,
        }
    }

    /// The §7 kind name, used as the `error.kind` string in tool results.
    pub fn kind(&self) -> &'static str {
        match self {
            LtmcError::ParseError(_) => "parse_error",
            LtmcError::MethodNotFound(_) => "method_not_found",
            LtmcError::InvalidParams(_) => "invalid_params",
            LtmcError::NotFound(_) => "not_found",
            LtmcError::AlreadyExists(_) => "already_exists",
            LtmcError::IntegrityError(_) => "integrity_error",
            LtmcError::WriteFailed(_) => "write_failed",
            LtmcError::Timeout(_) => "timeout",
            LtmcError::Overloaded(_) => "overloaded",
            LtmcError::Unauthorized(_) => "unauthorized",
            LtmcError::ReadOnlyViolation(_) => "read_only_violation",
            LtmcError::Internal(_) => "internal",
        }
    }

    fn message(&self) -> &str {
        match self {
            LtmcError::ParseError(m)
            | LtmcError::MethodNotFound(m)
            | LtmcError::InvalidParams(m)
            | LtmcError::NotFound(m)
            | LtmcError::AlreadyExists(m)
            | LtmcError::IntegrityError(m)
            | LtmcError::WriteFailed(m)
            | LtmcError::Timeout(m)
            | LtmcError::Overloaded(m)
            | LtmcError::Unauthorized(m)
            | LtmcError::ReadOnlyViolation(m)
            | LtmcError::Internal(m) => m,
        }
    }

    /// Per §7's propagation policy: only these three kinds warrant `error!`.
    pub fn should_log_as_error(&self) -> bool {
        matches!(
            self,
            LtmcError::IntegrityError(_) | LtmcError::WriteFailed(_) | LtmcError::Internal(_)
        )
    }
}

impl fmt::Display for LtmcError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}: {}", self.kind(), self.message())
    }
}

impl std::error::Error for LtmcError {}

impl From<rusqlite::Error> for LtmcError {
    fn from(e: rusqlite::Error) -> Self {
        match e {
            rusqlite::Error::QueryReturnedNoRows => LtmcError::NotFound(e.to_string()),
            other => LtmcError::WriteFailed(other.to_string()),
        }
    }
}

impl From<serde_json::Error> for LtmcError {
    fn from(e: serde_json::Error) -> Self {
        LtmcError::ParseError(e.to_string())
    }
}

#[cfg(feature = "cache")]
impl From<redis::RedisError> for LtmcError {
    fn from(e: redis::RedisError) -> Self {
        LtmcError::WriteFailed(e.to_string())
    }
}

pub type LtmcResult<T> = Result<T, LtmcError>;
