//! # Client Configuration Aggregate
//!
//! Purpose: Combine the parsed server topology, validated behavior set, and
//! namespace into the configuration a connection engine is built from, and
//! render the canonical engine-initialization string.
//!
//! ## Design Principles
//! 1. **Deterministic Output**: `config_string` is a pure function of the
//!    aggregate state; servers render in effective order, behaviors in
//!    declaration order.
//! 2. **Sorting Is Destructive**: Enabling `sort_hosts` re-orders the stored
//!    list by canonical text; the input order is not retained anywhere.
//! 3. **Namespace Stays Out**: The prefix never appears in the config
//!    string, so namespace mutation cannot force a reconnect.

use std::sync::RwLock;

use memc_common::{Behavior, BehaviorError, BehaviorSet, BehaviorValue};

use crate::error::ClientResult;
use crate::namespace::Namespace;
use crate::server::{IntoServerList, ServerDescriptor};

/// Aggregate configuration owned by a client.
///
/// Behavior and server state live behind locks so one aggregate can be
/// shared by every thread holding the client; mutation is atomic.
#[derive(Debug)]
pub struct ClientConfig {
    servers: RwLock<Vec<ServerDescriptor>>,
    behaviors: RwLock<BehaviorSet>,
    namespace: Namespace,
}

impl ClientConfig {
    /// Builds a configuration from raw servers and a behavior set.
    ///
    /// Eager validation happens here: server syntax via `IntoServerList`,
    /// option compatibility via the set itself, and rejection of an empty
    /// `prefix_key`. The prefix moves out of the behavior table into the
    /// namespace.
    pub fn build(servers: impl IntoServerList, behaviors: BehaviorSet) -> ClientResult<Self> {
        let mut servers = servers.into_server_list()?;
        let mut behaviors = behaviors;
        behaviors.validate()?;

        let namespace = Namespace::new(behaviors.take_prefix_key())?;

        if behaviors.is_enabled(Behavior::SortHosts) {
            sort_by_canonical_text(&mut servers);
        }

        Ok(ClientConfig {
            servers: RwLock::new(servers),
            behaviors: RwLock::new(behaviors),
            namespace,
        })
    }

    /// Current server list in effective order.
    pub fn servers(&self) -> Vec<ServerDescriptor> {
        self.servers.read().expect("server lock poisoned").clone()
    }

    /// The shared namespace handle.
    pub fn namespace(&self) -> &Namespace {
        &self.namespace
    }

    /// Snapshot of the behavior set, for engine establishment.
    pub fn behaviors(&self) -> BehaviorSet {
        self.behaviors.read().expect("behavior lock poisoned").clone()
    }

    /// Effective value of one behavior.
    ///
    /// `prefix_key` aliases into the namespace rather than the table.
    pub fn get_behavior(&self, behavior: Behavior) -> BehaviorValue {
        if behavior == Behavior::PrefixKey {
            return BehaviorValue::Str(self.namespace.get().unwrap_or_default());
        }
        self.behaviors
            .read()
            .expect("behavior lock poisoned")
            .get(behavior)
    }

    /// Mutates one behavior with full validation.
    ///
    /// Enabling `sort_hosts` re-orders the server list immediately so every
    /// later observer (including the next engine) sees the sorted topology.
    pub(crate) fn set_behavior(
        &self,
        behavior: Behavior,
        value: BehaviorValue,
    ) -> Result<(), BehaviorError> {
        let enable_sort = behavior == Behavior::SortHosts && value.as_bool();
        self.behaviors
            .write()
            .expect("behavior lock poisoned")
            .set(behavior, value)?;

        if enable_sort {
            let mut servers = self.servers.write().expect("server lock poisoned");
            sort_by_canonical_text(&mut servers);
        }
        Ok(())
    }

    /// Renders the canonical engine-initialization string.
    ///
    /// One `--SERVER=<text>` token per TCP endpoint and `--SOCKET="<path>"`
    /// per local socket, in effective order, followed by one token per
    /// non-default behavior.
    pub fn config_string(&self) -> String {
        let servers = self.servers.read().expect("server lock poisoned");
        let behaviors = self.behaviors.read().expect("behavior lock poisoned");

        let mut tokens: Vec<String> = servers.iter().map(server_token).collect();
        tokens.extend(
            behaviors
                .non_defaults()
                .filter_map(|(behavior, value)| behavior.config_token(value)),
        );
        tokens.join(" ")
    }
}

fn server_token(server: &ServerDescriptor) -> String {
    if server.is_socket() {
        format!("--SOCKET=\"{}\"", server.hostname())
    } else {
        format!("--SERVER={}", server)
    }
}

fn sort_by_canonical_text(servers: &mut [ServerDescriptor]) {
    servers.sort_by_key(|server| server.to_string());
}
