//! # Connection Engine Contract
//!
//! Purpose: Define the seam between the configuration layer and whatever
//! performs protocol I/O. The client hands a finished configuration string
//! and behavior set to `establish` and drives the resulting engine; it never
//! sees sockets, framing, or ring math.
//!
//! ## Design Principles
//! 1. **Strategy Pattern**: Engines are swappable behind one trait, so tests
//!    can drive the client against an in-process implementation.
//! 2. **Distinguished Conditions**: Missing keys, dead connections, and size
//!    violations surface as separate outcomes, never a generic failure.
//! 3. **Flags Travel With Values**: Engines store the caller's flag word
//!    verbatim and return it on reads; codec semantics stay above the seam.

use std::time::Duration;

use bytes::Bytes;

use crate::behavior::{Behavior, BehaviorSet, BehaviorValue};
use crate::error::EngineResult;

/// A stored value together with its flag word.
pub type FlaggedValue = (Bytes, u32);

/// The contract a connection engine fulfills for the client layer.
///
/// `establish` receives the canonical configuration string produced by the
/// client configuration (one `--SERVER=`/`--SOCKET=` token per endpoint plus
/// non-default behavior tokens) and a snapshot of the behavior set. One
/// engine instance spans one connection generation; the client drops it on
/// fatal errors and establishes a fresh one lazily.
pub trait ConnectionEngine: Send + Sync + Sized {
    /// Builds an engine from a configuration string and behavior snapshot.
    fn establish(config: &str, behaviors: &BehaviorSet) -> EngineResult<Self>;

    /// Fetches a value; `None` when the key is missing.
    fn get(&self, key: &[u8]) -> EngineResult<Option<FlaggedValue>>;

    /// Fetches many keys in one round trip; missing keys are omitted.
    fn get_multi(&self, keys: &[Vec<u8>]) -> EngineResult<Vec<(Vec<u8>, Bytes, u32)>>;

    /// Stores a value, optionally with a time-to-live.
    fn set(&self, key: &[u8], value: Bytes, flags: u32, ttl: Option<Duration>)
        -> EngineResult<()>;

    /// Appends bytes to an existing value; `NotFound` when missing.
    fn append(&self, key: &[u8], value: &[u8]) -> EngineResult<()>;

    /// Prepends bytes to an existing value; `NotFound` when missing.
    fn prepend(&self, key: &[u8], value: &[u8]) -> EngineResult<()>;

    /// Deletes a key; `NotFound` when missing.
    fn delete(&self, key: &[u8]) -> EngineResult<()>;

    /// Forces delivery of any locally buffered writes.
    fn flush_buffers(&self) -> EngineResult<()>;

    /// Reads a behavior as the engine currently applies it.
    fn get_behavior(&self, behavior: Behavior) -> BehaviorValue;

    /// Applies a runtime-settable behavior to the live engine.
    fn set_behavior(&self, behavior: Behavior, value: BehaviorValue) -> EngineResult<()>;
}
