//! # Namespace Prefix
//!
//! Purpose: Hold the optional key prefix shared by every thread using a
//! client, with validation on write and atomic reads.
//!
//! The prefix length is deliberately not validated here; the key-budget
//! check runs when a connection is established (and per operation by the
//! engine), keeping assignment cheap and the failure lazy.

use std::sync::{Arc, RwLock};

use crate::error::{ClientError, ClientResult};

/// Shared, mutable key prefix.
///
/// Cloning shares the underlying slot; mutation through any clone is
/// visible to all of them. A reader never observes a half-written value.
#[derive(Debug, Clone, Default)]
pub struct Namespace {
    inner: Arc<RwLock<Option<String>>>,
}

impl Namespace {
    /// Creates a namespace, validating a present prefix.
    pub fn new(prefix: Option<String>) -> ClientResult<Self> {
        if let Some(prefix) = &prefix {
            validate(prefix)?;
        }
        Ok(Namespace {
            inner: Arc::new(RwLock::new(prefix)),
        })
    }

    /// Returns the current prefix, if any.
    pub fn get(&self) -> Option<String> {
        self.inner.read().expect("namespace lock poisoned").clone()
    }

    /// Replaces the prefix; `None` clears it.
    ///
    /// An empty string is rejected with `InvalidArgument` and the previous
    /// value is left in place.
    pub fn set(&self, prefix: Option<&str>) -> ClientResult<()> {
        if let Some(prefix) = prefix {
            validate(prefix)?;
        }
        *self.inner.write().expect("namespace lock poisoned") = prefix.map(str::to_string);
        Ok(())
    }
}

fn validate(prefix: &str) -> ClientResult<()> {
    if prefix.is_empty() {
        return Err(ClientError::InvalidArgument(
            "namespace prefix must not be empty".to_string(),
        ));
    }
    Ok(())
}

/// Prepends `prefix` to `key`.
pub(crate) fn apply_prefix(prefix: &Option<String>, key: &[u8]) -> Vec<u8> {
    match prefix {
        Some(prefix) => {
            let mut out = Vec::with_capacity(prefix.len() + key.len());
            out.extend_from_slice(prefix.as_bytes());
            out.extend_from_slice(key);
            out
        }
        None => key.to_vec(),
    }
}

/// Strips `prefix` from a key returned by the engine.
pub(crate) fn strip_prefix(prefix: &Option<String>, key: &[u8]) -> Vec<u8> {
    match prefix {
        Some(prefix) => key
            .strip_prefix(prefix.as_bytes())
            .unwrap_or(key)
            .to_vec(),
        None => key.to_vec(),
    }
}
