//! # Client Error Taxonomy
//!
//! Purpose: Surface every caller-visible failure of the configuration layer
//! and the operations delegated through it as a distinct, matchable variant.
//!
//! Validation errors (`InvalidServerSpec`, `InvalidOption`,
//! `InvalidArgument`) are eager and local; `KeyTooBig` is deferred to the
//! first connection; engine conditions pass through without being coerced
//! into a generic failure.

use memc_common::{BehaviorError, EngineError};
use thiserror::Error;

/// Result type for the client layer.
pub type ClientResult<T> = Result<T, ClientError>;

/// Errors surfaced by the client.
#[derive(Debug, Error)]
pub enum ClientError {
    /// A server descriptor string failed to parse.
    #[error("invalid server spec {spec:?}: {reason}")]
    InvalidServerSpec { spec: String, reason: String },

    /// An option name, type, or combination was rejected.
    #[error("invalid option: {0}")]
    InvalidOption(#[from] BehaviorError),

    /// A malformed argument outside the option table, such as an
    /// empty-string namespace assignment.
    #[error("invalid argument: {0}")]
    InvalidArgument(String),

    /// A key or namespace prefix exceeds its share of the wire key budget.
    #[error("key of {length} bytes exceeds the {limit} byte limit")]
    KeyTooBig { length: usize, limit: usize },

    /// A value exceeds the protocol value budget.
    #[error("value of {length} bytes exceeds the {limit} byte limit")]
    ValueTooLarge { length: usize, limit: usize },

    /// The key does not exist; reported by delete/append/prepend.
    #[error("key not found")]
    NotFound,

    /// A server returned a protocol-level error response.
    #[error("server error: {0}")]
    Server(String),

    /// The engine could not be established or lost its connection. The
    /// engine generation is dropped; the next operation rebuilds it.
    #[error("connection failure: {0}")]
    ConnectionFailure(#[source] EngineError),

    /// Structured-codec or byte-codec failure.
    #[error("codec error: {0}")]
    Codec(String),
}

impl ClientError {
    /// Shorthand for a parse failure on one server spec.
    pub(crate) fn invalid_spec(spec: &str, reason: impl Into<String>) -> Self {
        ClientError::InvalidServerSpec {
            spec: spec.to_string(),
            reason: reason.into(),
        }
    }
}
