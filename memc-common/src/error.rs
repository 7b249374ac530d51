//! # Shared Error Taxonomies
//!
//! Purpose: Define the error types shared between the configuration layer
//! and connection engines: behavior-table violations and engine-reported
//! conditions.
//!
//! ## Design Principles
//! 1. **Distinguished Conditions**: Not-found, not-connected, and size
//!    violations are separate variants, never folded into a generic failure.
//! 2. **Fail Fast**: Behavior errors carry enough context to report the
//!    offending option by name.

use thiserror::Error;

use crate::behavior::Behavior;
use crate::protocol::{KEY_MAX_SIZE, VALUE_MAX_SIZE};

/// Result type for engine operations.
pub type EngineResult<T> = Result<T, EngineError>;

/// Conditions reported by a connection engine.
#[derive(Debug, Error)]
pub enum EngineError {
    /// The engine has no live connection to any server.
    #[error("not connected")]
    NotConnected,

    /// The key does not exist on any server.
    #[error("key not found")]
    NotFound,

    /// A key (prefix included) exceeds the wire key budget.
    #[error("key of {length} bytes exceeds the {limit} byte limit")]
    KeyTooBig { length: usize, limit: usize },

    /// A value exceeds the protocol value budget.
    #[error("value of {length} bytes exceeds the {limit} byte limit")]
    ValueTooLarge { length: usize, limit: usize },

    /// The configuration string handed to `establish` was unusable.
    #[error("invalid engine configuration: {0}")]
    InvalidConfig(String),

    /// Transport-level failure while talking to a server.
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),

    /// A server returned an error response.
    #[error("server error: {0}")]
    Server(String),
}

impl EngineError {
    /// Builds a `KeyTooBig` error against the protocol key budget.
    pub fn key_too_big(length: usize) -> Self {
        EngineError::KeyTooBig {
            length,
            limit: KEY_MAX_SIZE,
        }
    }

    /// Builds a `ValueTooLarge` error against the protocol value budget.
    pub fn value_too_large(length: usize) -> Self {
        EngineError::ValueTooLarge {
            length,
            limit: VALUE_MAX_SIZE,
        }
    }

    /// Returns true when the condition means the connection is unusable and
    /// the engine should be rebuilt before the next operation.
    pub fn is_connection_failure(&self) -> bool {
        matches!(self, EngineError::NotConnected | EngineError::Io(_))
    }
}

/// Violations of the behavior option table.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum BehaviorError {
    /// The option name is not in the recognized table.
    #[error("unknown behavior option: {0}")]
    UnknownOption(String),

    /// Two requested options contradict each other.
    #[error("behavior {left} cannot be combined with {right}")]
    IncompatibleOptions { left: Behavior, right: Behavior },

    /// The supplied value does not match the option's type.
    #[error("behavior {behavior} expects a {expected} value")]
    TypeMismatch {
        behavior: Behavior,
        expected: &'static str,
    },
}
