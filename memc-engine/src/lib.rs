//! # In-Process Reference Engine
//!
//! Purpose: Provide an in-memory implementation of the connection-engine
//! contract so the configuration layer can be exercised end-to-end without
//! a server or socket I/O.
//!
//! ## Design Principles
//! 1. **Contract Fidelity**: Every distinguished condition of the real
//!    protocol (missing keys, size limits) is reproduced faithfully.
//! 2. **Sharded Locks**: Per-shard locks keep concurrent workloads honest.
//! 3. **Eager Delivery**: Writes are visible immediately, which satisfies
//!    the buffered-mode read-your-writes guarantee trivially.

mod memory;

pub use memory::MemoryEngine;
