//! # memc Client
//!
//! Purpose: Provide the configuration-and-topology layer for a distributed
//! key-value cache client: server-list parsing, behavior validation,
//! namespace management, and a thread-safe client facade over a pluggable
//! connection engine.
//!
//! ## Design Principles
//! 1. **Validate Eagerly, Connect Lazily**: Construction rejects bad input
//!    immediately but never opens a connection.
//! 2. **Closed Configuration**: Every behavior is a typed entry in one
//!    enumerated table, validated in one place.
//! 3. **Engine Behind a Seam**: Protocol I/O lives behind the
//!    `ConnectionEngine` trait; the client only builds and drives it.
//! 4. **Shared Handle**: One client serves many threads; mutation of
//!    behaviors and namespace is atomic and process-wide for that client.

mod client;
mod codec;
mod config;
mod error;
mod namespace;
mod server;

pub use client::Client;
pub use codec::{deserialize_value, serialize_value, Codec, IdentityCodec};
pub use config::ClientConfig;
pub use error::{ClientError, ClientResult};
pub use namespace::Namespace;
pub use server::{default_server_list, IntoServerList, ServerDescriptor};

// Shared contracts, re-exported so most callers need only this crate.
pub use memc_common::{
    Behavior, BehaviorError, BehaviorSet, BehaviorValue, ConnectionEngine, Distribution,
    EngineError, EngineResult, HashFunction, DEFAULT_PORT, FLAG_SERIALIZED, KEY_MAX_SIZE,
    PREFIX_MAX_SIZE, VALUE_MAX_SIZE,
};
