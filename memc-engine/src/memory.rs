//! # In-Memory Engine
//!
//! Sharded key/value storage behind the `ConnectionEngine` trait, with
//! TTL-aware lookups and protocol size limits enforced at the edge.
//!
//! ## Design Principles
//! 1. **Sharded Locks**: Per-shard locks reduce contention under concurrency.
//! 2. **TTL Fast Path**: Expiration is checked on access for O(1) reads.
//! 3. **Strategy Pattern**: Implements `ConnectionEngine` so the client
//!    layer stays decoupled from storage details.
//!
//! ## Structure Overview
//!
//! ```text
//! MemoryEngine
//!   ├── servers: Vec<String>          (parsed from the config string)
//!   ├── behaviors: RwLock<BehaviorSet>
//!   └── shards: Vec<Shard>
//!         └── Shard
//!               └── inner: RwLock<HashMap<Vec<u8>, Entry>>
//!                     └── Entry { value, flags, expires_at }
//! ```

use std::hash::{BuildHasher, Hasher};
use std::time::{Duration, Instant};

use ahash::RandomState;
use bytes::Bytes;
use hashbrown::HashMap;
use parking_lot::RwLock;

use memc_common::{
    Behavior, BehaviorSet, BehaviorValue, ConnectionEngine, EngineError, EngineResult,
    FlaggedValue, KEY_MAX_SIZE, VALUE_MAX_SIZE,
};

/// Default shards = CPU count * multiplier to reduce lock contention.
const DEFAULT_SHARD_MULTIPLIER: usize = 4;

/// A single stored entry.
#[derive(Debug, Clone)]
struct Entry {
    value: Bytes,
    /// Caller's flag word, returned verbatim on reads.
    flags: u32,
    /// Absolute expiration timestamp.
    expires_at: Option<Instant>,
}

impl Entry {
    /// Returns true when the entry has expired at `now`.
    fn is_expired(&self, now: Instant) -> bool {
        match self.expires_at {
            Some(deadline) => now >= deadline,
            None => false,
        }
    }
}

/// Per-shard storage container.
#[derive(Debug)]
struct Shard {
    inner: RwLock<HashMap<Vec<u8>, Entry, RandomState>>,
}

/// Sharded in-memory implementation of `ConnectionEngine`.
///
/// Eviction policy is a server concern and deliberately absent; the engine
/// stores whatever the size limits admit and drops entries only on delete
/// or expiry.
#[derive(Debug)]
pub struct MemoryEngine {
    /// Endpoint texts parsed out of the configuration string.
    servers: Vec<String>,
    /// Behavior snapshot, updated through the passthrough setters.
    behaviors: RwLock<BehaviorSet>,
    /// Per-shard storage.
    shards: Vec<Shard>,
    /// Bitmask for fast shard selection (power-of-two shard count).
    shard_mask: usize,
    /// Hash state used to pick shards deterministically.
    hash_state: RandomState,
}

impl MemoryEngine {
    /// Creates an engine with a shard count based on CPU parallelism.
    fn with_servers(servers: Vec<String>, behaviors: BehaviorSet) -> Self {
        let threads = std::thread::available_parallelism()
            .map(|count| count.get())
            .unwrap_or(1);
        let shard_count = normalize_shard_count(threads.saturating_mul(DEFAULT_SHARD_MULTIPLIER));

        let hash_state = RandomState::new();
        let mut shards = Vec::with_capacity(shard_count);
        for _ in 0..shard_count {
            shards.push(Shard {
                inner: RwLock::new(HashMap::with_hasher(hash_state.clone())),
            });
        }

        MemoryEngine {
            servers,
            behaviors: RwLock::new(behaviors),
            shards,
            shard_mask: shard_count - 1,
            hash_state,
        }
    }

    /// Endpoint texts this engine was configured with.
    pub fn servers(&self) -> &[String] {
        &self.servers
    }

    /// Hashes a key to its owning shard index.
    fn shard_index(&self, key: &[u8]) -> usize {
        let mut hasher = self.hash_state.build_hasher();
        hasher.write(key);
        (hasher.finish() as usize) & self.shard_mask
    }

    /// Returns the shard responsible for a given key.
    fn shard_for(&self, key: &[u8]) -> &Shard {
        &self.shards[self.shard_index(key)]
    }

    /// Rejects keys over the wire budget.
    fn check_key(key: &[u8]) -> EngineResult<()> {
        if key.len() > KEY_MAX_SIZE {
            return Err(EngineError::key_too_big(key.len()));
        }
        Ok(())
    }

    /// Rejects values over the protocol budget.
    fn check_value(len: usize) -> EngineResult<()> {
        if len > VALUE_MAX_SIZE {
            return Err(EngineError::value_too_large(len));
        }
        Ok(())
    }

    /// Extends an existing live entry with `more`, front or back.
    fn splice(&self, key: &[u8], more: &[u8], front: bool) -> EngineResult<()> {
        Self::check_key(key)?;
        let shard = self.shard_for(key);
        let now = Instant::now();
        let mut inner = shard.inner.write();

        let entry = match inner.get_mut(key) {
            Some(entry) if !entry.is_expired(now) => entry,
            Some(_) => {
                inner.remove(key);
                return Err(EngineError::NotFound);
            }
            None => return Err(EngineError::NotFound),
        };

        let combined_len = entry.value.len() + more.len();
        Self::check_value(combined_len)?;

        let mut combined = Vec::with_capacity(combined_len);
        if front {
            combined.extend_from_slice(more);
            combined.extend_from_slice(&entry.value);
        } else {
            combined.extend_from_slice(&entry.value);
            combined.extend_from_slice(more);
        }
        entry.value = Bytes::from(combined);
        Ok(())
    }
}

impl ConnectionEngine for MemoryEngine {
    /// Parses the canonical configuration string and builds an engine.
    ///
    /// Server tokens are collected; behavior tokens are redundant with the
    /// supplied snapshot and only checked for shape. At least one endpoint
    /// is required.
    fn establish(config: &str, behaviors: &BehaviorSet) -> EngineResult<Self> {
        let mut servers = Vec::new();
        for token in config.split_whitespace() {
            if let Some(text) = token.strip_prefix("--SERVER=") {
                servers.push(text.to_string());
            } else if let Some(text) = token.strip_prefix("--SOCKET=") {
                servers.push(text.trim_matches('"').to_string());
            } else if !token.starts_with("--") {
                return Err(EngineError::InvalidConfig(format!(
                    "unrecognized token: {token}"
                )));
            }
        }

        if servers.is_empty() {
            return Err(EngineError::InvalidConfig("no servers configured".into()));
        }

        Ok(MemoryEngine::with_servers(servers, behaviors.clone()))
    }

    /// Looks a key up, dropping it if it expired.
    fn get(&self, key: &[u8]) -> EngineResult<Option<FlaggedValue>> {
        Self::check_key(key)?;
        let shard = self.shard_for(key);
        let now = Instant::now();

        {
            let inner = shard.inner.read();
            match inner.get(key) {
                Some(entry) if !entry.is_expired(now) => {
                    return Ok(Some((entry.value.clone(), entry.flags)));
                }
                None => return Ok(None),
                Some(_) => {}
            }
        }

        // Expired on access: upgrade to a write lock and remove.
        let mut inner = shard.inner.write();
        if let Some(entry) = inner.get(key) {
            if entry.is_expired(Instant::now()) {
                inner.remove(key);
            } else {
                return Ok(Some((entry.value.clone(), entry.flags)));
            }
        }
        Ok(None)
    }

    /// Fetches many keys; missing or expired keys are omitted.
    fn get_multi(&self, keys: &[Vec<u8>]) -> EngineResult<Vec<(Vec<u8>, Bytes, u32)>> {
        let mut found = Vec::with_capacity(keys.len());
        for key in keys {
            if let Some((value, flags)) = self.get(key)? {
                found.push((key.clone(), value, flags));
            }
        }
        Ok(found)
    }

    /// Inserts or replaces an entry, resetting its TTL.
    fn set(
        &self,
        key: &[u8],
        value: Bytes,
        flags: u32,
        ttl: Option<Duration>,
    ) -> EngineResult<()> {
        Self::check_key(key)?;
        Self::check_value(value.len())?;

        let entry = Entry {
            value,
            flags,
            expires_at: ttl.map(|ttl| Instant::now() + ttl),
        };

        let shard = self.shard_for(key);
        shard.inner.write().insert(key.to_vec(), entry);
        Ok(())
    }

    fn append(&self, key: &[u8], value: &[u8]) -> EngineResult<()> {
        self.splice(key, value, false)
    }

    fn prepend(&self, key: &[u8], value: &[u8]) -> EngineResult<()> {
        self.splice(key, value, true)
    }

    /// Deletes a key; missing or expired keys report `NotFound`.
    fn delete(&self, key: &[u8]) -> EngineResult<()> {
        Self::check_key(key)?;
        let shard = self.shard_for(key);
        let now = Instant::now();
        let mut inner = shard.inner.write();

        match inner.remove(key) {
            Some(entry) if !entry.is_expired(now) => Ok(()),
            _ => Err(EngineError::NotFound),
        }
    }

    /// Writes are delivered eagerly, so flushing is a no-op.
    fn flush_buffers(&self) -> EngineResult<()> {
        Ok(())
    }

    fn get_behavior(&self, behavior: Behavior) -> BehaviorValue {
        self.behaviors.read().get(behavior)
    }

    fn set_behavior(&self, behavior: Behavior, value: BehaviorValue) -> EngineResult<()> {
        self.behaviors
            .write()
            .set(behavior, value)
            .map_err(|err| EngineError::InvalidConfig(err.to_string()))
    }
}

/// Normalizes shard counts to a power of two for fast masking.
fn normalize_shard_count(count: usize) -> usize {
    count.max(1).next_power_of_two()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn engine() -> MemoryEngine {
        MemoryEngine::establish("--SERVER=localhost:11211", &BehaviorSet::new()).unwrap()
    }

    #[test]
    fn establish_requires_a_server_token() {
        let err = MemoryEngine::establish("", &BehaviorSet::new()).unwrap_err();
        assert!(matches!(err, EngineError::InvalidConfig(_)));
    }

    #[test]
    fn establish_collects_server_and_socket_tokens() {
        let engine = MemoryEngine::establish(
            "--SERVER=localhost:43042 --SOCKET=\"/tmp/memcached0\" --NO-BLOCK",
            &BehaviorSet::new(),
        )
        .unwrap();
        assert_eq!(engine.servers(), ["localhost:43042", "/tmp/memcached0"]);
    }

    #[test]
    fn set_get_roundtrip_preserves_flags() {
        let engine = engine();
        engine
            .set(b"alpha", Bytes::from_static(b"value"), 7, None)
            .unwrap();
        let (value, flags) = engine.get(b"alpha").unwrap().unwrap();
        assert_eq!(&value[..], b"value");
        assert_eq!(flags, 7);
    }

    #[test]
    fn expired_entries_read_as_missing() {
        let engine = engine();
        engine
            .set(
                b"alpha",
                Bytes::from_static(b"value"),
                0,
                Some(Duration::from_millis(1)),
            )
            .unwrap();
        std::thread::sleep(Duration::from_millis(5));
        assert!(engine.get(b"alpha").unwrap().is_none());
    }

    #[test]
    fn delete_missing_key_reports_not_found() {
        let engine = engine();
        assert!(matches!(
            engine.delete(b"missing").unwrap_err(),
            EngineError::NotFound
        ));

        engine
            .set(b"alpha", Bytes::from_static(b"value"), 0, None)
            .unwrap();
        engine.delete(b"alpha").unwrap();
        assert!(engine.get(b"alpha").unwrap().is_none());
    }

    #[test]
    fn append_and_prepend_extend_live_entries() {
        let engine = engine();
        assert!(matches!(
            engine.append(b"missing", b"x").unwrap_err(),
            EngineError::NotFound
        ));

        engine
            .set(b"alpha", Bytes::from_static(b"bb"), 0, None)
            .unwrap();
        engine.append(b"alpha", b"cc").unwrap();
        engine.prepend(b"alpha", b"aa").unwrap();
        let (value, _) = engine.get(b"alpha").unwrap().unwrap();
        assert_eq!(&value[..], b"aabbcc");
    }

    #[test]
    fn get_multi_omits_missing_keys() {
        let engine = engine();
        engine
            .set(b"one", Bytes::from_static(b"1"), 0, None)
            .unwrap();
        engine
            .set(b"two", Bytes::from_static(b"2"), 0, None)
            .unwrap();

        let found = engine
            .get_multi(&[b"one".to_vec(), b"gone".to_vec(), b"two".to_vec()])
            .unwrap();
        let keys: Vec<_> = found.iter().map(|(key, _, _)| key.clone()).collect();
        assert_eq!(keys, [b"one".to_vec(), b"two".to_vec()]);
    }

    #[test]
    fn oversized_keys_and_values_are_rejected() {
        let engine = engine();
        let long_key = vec![b'k'; KEY_MAX_SIZE + 1];
        assert!(matches!(
            engine.get(&long_key).unwrap_err(),
            EngineError::KeyTooBig { .. }
        ));

        let big_value = Bytes::from(vec![0u8; VALUE_MAX_SIZE + 1]);
        assert!(matches!(
            engine.set(b"alpha", big_value, 0, None).unwrap_err(),
            EngineError::ValueTooLarge { .. }
        ));
    }

    #[test]
    fn behaviors_pass_through_live_engine() {
        let engine = engine();
        assert!(!engine.get_behavior(Behavior::NoBlock).as_bool());
        engine
            .set_behavior(Behavior::NoBlock, BehaviorValue::Bool(true))
            .unwrap();
        assert!(engine.get_behavior(Behavior::NoBlock).as_bool());
    }
}
