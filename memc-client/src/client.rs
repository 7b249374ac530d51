//! # Client Facade
//!
//! Purpose: Expose the user-facing cache handle. The client owns one
//! configuration aggregate and, lazily, one connection-engine instance per
//! generation; every operation prefixes keys, applies the codec, and
//! delegates to the engine.
//!
//! ## Design Principles
//! 1. **Facade Pattern**: Callers see get/set/delete; topology, behaviors,
//!    and engine lifecycle stay behind the handle.
//! 2. **Lazy Engine**: Construction validates eagerly but never connects;
//!    the engine is built on first use behind a double-checked slot, so
//!    concurrent first use converges on a single instance.
//! 3. **Generations**: Reconnect-required behavior changes and connection
//!    failures drop the engine; the next operation rebuilds it. A failed
//!    operation is reported to its caller, never retried in-call.

use std::collections::HashMap;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, RwLock};
use std::time::Duration;

use bytes::Bytes;
use serde::de::DeserializeOwned;
use serde::Serialize;
use tracing::{debug, trace};

use memc_common::{
    prefix_fits, Behavior, BehaviorError, BehaviorSet, BehaviorValue, ConnectionEngine,
    EngineError, EngineResult, PREFIX_MAX_SIZE,
};

use crate::codec::{deserialize_value, serialize_value, Codec, IdentityCodec};
use crate::config::ClientConfig;
use crate::error::{ClientError, ClientResult};
use crate::namespace::{apply_prefix, strip_prefix};
use crate::server::{IntoServerList, ServerDescriptor};

/// Thread-safe cache client.
///
/// Share one instance across threads via `Arc`; independent operations may
/// run concurrently. The engine type is pluggable so tests and embedders
/// can supply their own protocol implementation.
pub struct Client<E: ConnectionEngine> {
    config: ClientConfig,
    codec: Arc<dyn Codec>,
    engine: RwLock<Option<Arc<E>>>,
    /// Number of engines established so far; one per generation.
    generation: AtomicU64,
}

impl<E: ConnectionEngine> std::fmt::Debug for Client<E> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Client")
            .field("config", &self.config)
            .field("generation", &self.generation.load(Ordering::Relaxed))
            .finish_non_exhaustive()
    }
}

impl<E: ConnectionEngine> Client<E> {
    /// Builds a client from raw servers and behaviors.
    ///
    /// All eagerly checkable validation happens here; no connection is
    /// opened until the first operation or an explicit `connect`.
    pub fn new(servers: impl IntoServerList, behaviors: BehaviorSet) -> ClientResult<Self> {
        Ok(Client {
            config: ClientConfig::build(servers, behaviors)?,
            codec: Arc::new(IdentityCodec),
            engine: RwLock::new(None),
            generation: AtomicU64::new(0),
        })
    }

    /// Replaces the byte-transform codec.
    pub fn with_codec(mut self, codec: Arc<dyn Codec>) -> Self {
        self.codec = codec;
        self
    }

    /// Current server list in effective order.
    pub fn servers(&self) -> Vec<ServerDescriptor> {
        self.config.servers()
    }

    /// Canonical engine-initialization string for the current state.
    pub fn config_string(&self) -> String {
        self.config.config_string()
    }

    /// True while an engine generation is live.
    pub fn is_connected(&self) -> bool {
        self.engine.read().expect("engine lock poisoned").is_some()
    }

    /// Number of engine generations established so far.
    pub fn generation(&self) -> u64 {
        self.generation.load(Ordering::Relaxed)
    }

    /// Establishes the engine now instead of on the first operation.
    pub fn connect(&self) -> ClientResult<()> {
        self.engine_handle().map(|_| ())
    }

    /// Drops the live engine; the next operation rebuilds it.
    pub fn disconnect(&self) {
        self.invalidate("explicit disconnect");
    }

    // --- namespace ---------------------------------------------------------

    /// Current namespace prefix.
    pub fn namespace(&self) -> Option<String> {
        self.config.namespace().get()
    }

    /// Replaces or clears the namespace prefix.
    ///
    /// Takes effect for all subsequent operations from any thread; no
    /// reconnection happens. Length against the key budget is checked at
    /// the next engine establishment and per operation by the engine.
    pub fn set_namespace(&self, prefix: Option<&str>) -> ClientResult<()> {
        self.config.namespace().set(prefix)?;
        trace!(prefix = prefix.unwrap_or(""), "namespace updated");
        Ok(())
    }

    // --- behaviors ---------------------------------------------------------

    /// Effective value of one behavior.
    pub fn get_behavior(&self, behavior: Behavior) -> BehaviorValue {
        self.config.get_behavior(behavior)
    }

    /// Mutates one behavior with the same validation as construction.
    ///
    /// Reconnect-required behaviors drop the engine generation; hot ones
    /// are pushed to the live engine when present.
    pub fn set_behavior(
        &self,
        behavior: Behavior,
        value: impl Into<BehaviorValue>,
    ) -> ClientResult<()> {
        let value = value.into();

        if behavior == Behavior::PrefixKey {
            return match &value {
                BehaviorValue::Str(prefix) => self.set_namespace(Some(prefix.as_str())),
                _ => Err(BehaviorError::TypeMismatch {
                    behavior,
                    expected: behavior.expected_kind(),
                }
                .into()),
            };
        }

        self.config.set_behavior(behavior, value.clone())?;

        if behavior.requires_reconnect() {
            self.invalidate("behavior change requires reconnect");
        } else if let Some(engine) = self.live_engine() {
            engine
                .set_behavior(behavior, value)
                .map_err(|err| self.engine_error(err))?;
        }
        trace!(behavior = %behavior, "behavior updated");
        Ok(())
    }

    // --- operations --------------------------------------------------------

    /// Fetches a raw value; `Ok(None)` when the key is missing.
    pub fn get(&self, key: impl AsRef<[u8]>) -> ClientResult<Option<Bytes>> {
        Ok(self.fetch(key.as_ref())?.map(|(value, _)| value))
    }

    /// Fetches and deserializes a value stored with `set_value`.
    pub fn get_value<T: DeserializeOwned>(&self, key: impl AsRef<[u8]>) -> ClientResult<Option<T>> {
        match self.fetch(key.as_ref())? {
            Some((payload, flags)) => Ok(Some(deserialize_value(&payload, flags)?)),
            None => Ok(None),
        }
    }

    /// True when the key holds a value; missing keys are not an error.
    pub fn exists(&self, key: impl AsRef<[u8]>) -> ClientResult<bool> {
        let key = self.prefixed(key.as_ref());
        match self.run(|engine| engine.get(&key)) {
            Ok(found) => Ok(found.is_some()),
            Err(ClientError::NotFound) => Ok(false),
            Err(err) => Err(err),
        }
    }

    /// Fetches many keys in one engine round trip.
    ///
    /// The result is keyed by the caller's unprefixed keys; missing keys
    /// are absent from the map.
    pub fn get_multi<K: AsRef<[u8]>>(&self, keys: &[K]) -> ClientResult<HashMap<Vec<u8>, Bytes>> {
        // One prefix snapshot covers application and stripping, so a
        // concurrent namespace change cannot tear a single operation.
        let prefix = self.config.namespace().get();
        let prefixed: Vec<Vec<u8>> = keys
            .iter()
            .map(|key| apply_prefix(&prefix, key.as_ref()))
            .collect();

        let found = self.run(|engine| engine.get_multi(&prefixed))?;

        let mut values = HashMap::with_capacity(found.len());
        for (key, payload, flags) in found {
            let value = self.codec.decode(&key, payload, flags)?;
            values.insert(strip_prefix(&prefix, &key), value);
        }
        Ok(values)
    }

    /// Stores a raw value without expiration.
    pub fn set(&self, key: impl AsRef<[u8]>, value: impl Into<Bytes>) -> ClientResult<()> {
        self.store(key.as_ref(), value.into(), 0, None)
    }

    /// Stores a raw value with a time-to-live.
    pub fn set_with_ttl(
        &self,
        key: impl AsRef<[u8]>,
        value: impl Into<Bytes>,
        ttl: Duration,
    ) -> ClientResult<()> {
        self.store(key.as_ref(), value.into(), 0, Some(ttl))
    }

    /// Serializes and stores a typed value without expiration.
    pub fn set_value<T: Serialize>(&self, key: impl AsRef<[u8]>, value: &T) -> ClientResult<()> {
        let (payload, flags) = serialize_value(value, 0)?;
        self.store(key.as_ref(), payload, flags, None)
    }

    /// Serializes and stores a typed value with a time-to-live.
    pub fn set_value_with_ttl<T: Serialize>(
        &self,
        key: impl AsRef<[u8]>,
        value: &T,
        ttl: Duration,
    ) -> ClientResult<()> {
        let (payload, flags) = serialize_value(value, 0)?;
        self.store(key.as_ref(), payload, flags, Some(ttl))
    }

    /// Appends raw bytes to an existing value; `NotFound` when missing.
    pub fn append(&self, key: impl AsRef<[u8]>, value: impl AsRef<[u8]>) -> ClientResult<()> {
        let key = self.prefixed(key.as_ref());
        self.run(|engine| engine.append(&key, value.as_ref()))
    }

    /// Prepends raw bytes to an existing value; `NotFound` when missing.
    pub fn prepend(&self, key: impl AsRef<[u8]>, value: impl AsRef<[u8]>) -> ClientResult<()> {
        let key = self.prefixed(key.as_ref());
        self.run(|engine| engine.prepend(&key, value.as_ref()))
    }

    /// Deletes a key; `NotFound` when missing.
    pub fn delete(&self, key: impl AsRef<[u8]>) -> ClientResult<()> {
        let key = self.prefixed(key.as_ref());
        self.run(|engine| engine.delete(&key))
    }

    /// Forces delivery of buffered writes, the explicit visibility point
    /// for buffered/no-block mode.
    pub fn flush_buffers(&self) -> ClientResult<()> {
        self.run(|engine| engine.flush_buffers())
    }

    // --- engine lifecycle --------------------------------------------------

    /// Returns the live engine, establishing one if none exists.
    ///
    /// The slot is double-checked under the write lock so concurrent first
    /// use converges on a single instance with no duplicate left behind.
    fn engine_handle(&self) -> ClientResult<Arc<E>> {
        if let Some(engine) = self.live_engine() {
            return Ok(engine);
        }

        let mut slot = self.engine.write().expect("engine lock poisoned");
        if let Some(engine) = slot.as_ref() {
            return Ok(Arc::clone(engine));
        }

        // Deferred key-budget check: a prefix may be assigned freely, but it
        // must fit before any connection is built.
        if let Some(prefix) = self.config.namespace().get() {
            if !prefix_fits(prefix.len()) {
                return Err(ClientError::KeyTooBig {
                    length: prefix.len(),
                    limit: PREFIX_MAX_SIZE,
                });
            }
        }

        let config_string = self.config.config_string();
        let behaviors = self.config.behaviors();
        let engine = E::establish(&config_string, &behaviors)
            .map_err(ClientError::ConnectionFailure)?;

        let generation = self.generation.fetch_add(1, Ordering::Relaxed) + 1;
        debug!(generation, "connection engine established");

        let engine = Arc::new(engine);
        *slot = Some(Arc::clone(&engine));
        Ok(engine)
    }

    fn live_engine(&self) -> Option<Arc<E>> {
        self.engine
            .read()
            .expect("engine lock poisoned")
            .as_ref()
            .map(Arc::clone)
    }

    /// Ends the current generation, if any.
    fn invalidate(&self, reason: &str) {
        let mut slot = self.engine.write().expect("engine lock poisoned");
        if slot.take().is_some() {
            debug!(reason, "connection engine dropped");
        }
    }

    /// Runs one engine operation, translating engine conditions.
    fn run<R>(&self, op: impl FnOnce(&E) -> EngineResult<R>) -> ClientResult<R> {
        let engine = self.engine_handle()?;
        op(&engine).map_err(|err| self.engine_error(err))
    }

    /// Maps an engine error to the caller-visible taxonomy.
    ///
    /// Connection-kind failures additionally end the generation so the next
    /// call rebuilds the engine; the failing call itself is never retried.
    fn engine_error(&self, err: EngineError) -> ClientError {
        if err.is_connection_failure() {
            self.invalidate("connection failure");
            return ClientError::ConnectionFailure(err);
        }
        match err {
            EngineError::NotFound => ClientError::NotFound,
            EngineError::KeyTooBig { length, limit } => ClientError::KeyTooBig { length, limit },
            EngineError::ValueTooLarge { length, limit } => {
                ClientError::ValueTooLarge { length, limit }
            }
            EngineError::Server(message) => ClientError::Server(message),
            other => ClientError::ConnectionFailure(other),
        }
    }

    // --- helpers -----------------------------------------------------------

    fn prefixed(&self, key: &[u8]) -> Vec<u8> {
        apply_prefix(&self.config.namespace().get(), key)
    }

    fn fetch(&self, key: &[u8]) -> ClientResult<Option<(Bytes, u32)>> {
        let key = self.prefixed(key);
        match self.run(|engine| engine.get(&key))? {
            Some((payload, flags)) => {
                let value = self.codec.decode(&key, payload, flags)?;
                Ok(Some((value, flags)))
            }
            None => Ok(None),
        }
    }

    fn store(
        &self,
        key: &[u8],
        value: Bytes,
        flags: u32,
        ttl: Option<Duration>,
    ) -> ClientResult<()> {
        let key = self.prefixed(key);
        let (payload, flags) = self.codec.encode(&key, value, flags)?;
        self.run(|engine| engine.set(&key, payload, flags, ttl))
    }
}
