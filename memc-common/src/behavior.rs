//! # Behavior Option Table
//!
//! Purpose: Define the closed set of client behaviors, their value types and
//! defaults, and the validated `BehaviorSet` container shared between the
//! client and its connection engine.
//!
//! ## Design Principles
//! 1. **Closed Table**: Every recognized option is a `Behavior` variant with
//!    one declared type and default; unknown names are rejected at the edge.
//! 2. **Validate Once**: Cross-option constraints run in a single place, at
//!    construction and on every mutation, never as scattered checks.
//! 3. **Atomic Mutation**: A rejected `set` leaves the container untouched.
//! 4. **Stable Ordering**: Iteration follows the enum order so derived
//!    artifacts (the engine config string) are deterministic.

use std::collections::BTreeMap;
use std::fmt;
use std::str::FromStr;

use crate::error::BehaviorError;

/// Recognized behavior options.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum Behavior {
    /// Queue writes locally and deliver them in batches.
    BufferRequests,
    /// Issue requests without blocking on the round trip.
    NoBlock,
    /// Suppress server replies for mutation commands.
    Noreply,
    /// Disable Nagle's algorithm on server sockets.
    TcpNodelay,
    /// Use the binary framing instead of ASCII.
    BinaryProtocol,
    /// Order servers by their canonical text instead of input order.
    SortHosts,
    /// Weight servers when building the consistent-hash ring.
    KetamaWeighted,
    /// Key-to-server distribution strategy.
    Distribution,
    /// Key hashing function.
    Hash,
    /// Namespace prefix applied to every key.
    PrefixKey,
}

/// Every behavior, in declaration order.
pub const ALL_BEHAVIORS: [Behavior; 10] = [
    Behavior::BufferRequests,
    Behavior::NoBlock,
    Behavior::Noreply,
    Behavior::TcpNodelay,
    Behavior::BinaryProtocol,
    Behavior::SortHosts,
    Behavior::KetamaWeighted,
    Behavior::Distribution,
    Behavior::Hash,
    Behavior::PrefixKey,
];

impl Behavior {
    /// Canonical option name, as accepted by the string-keyed entry points.
    pub fn name(self) -> &'static str {
        match self {
            Behavior::BufferRequests => "buffer_requests",
            Behavior::NoBlock => "no_block",
            Behavior::Noreply => "noreply",
            Behavior::TcpNodelay => "tcp_nodelay",
            Behavior::BinaryProtocol => "binary_protocol",
            Behavior::SortHosts => "sort_hosts",
            Behavior::KetamaWeighted => "ketama_weighted",
            Behavior::Distribution => "distribution",
            Behavior::Hash => "hash",
            Behavior::PrefixKey => "prefix_key",
        }
    }

    /// Default value when the option was never set.
    pub fn default_value(self) -> BehaviorValue {
        match self {
            Behavior::Distribution => BehaviorValue::Distribution(Distribution::Modula),
            Behavior::Hash => BehaviorValue::Hash(HashFunction::Default),
            Behavior::PrefixKey => BehaviorValue::Str(String::new()),
            _ => BehaviorValue::Bool(false),
        }
    }

    /// Human-readable name of the expected value type.
    pub fn expected_kind(self) -> &'static str {
        match self {
            Behavior::Distribution => "distribution",
            Behavior::Hash => "hash function",
            Behavior::PrefixKey => "string",
            _ => "boolean",
        }
    }

    /// Whether `value` matches this option's declared type.
    pub fn accepts(self, value: &BehaviorValue) -> bool {
        match self {
            Behavior::Distribution => matches!(value, BehaviorValue::Distribution(_)),
            Behavior::Hash => matches!(value, BehaviorValue::Hash(_)),
            Behavior::PrefixKey => matches!(value, BehaviorValue::Str(_)),
            _ => matches!(value, BehaviorValue::Bool(_)),
        }
    }

    /// Whether changing this option invalidates the live connection.
    ///
    /// Options that affect key placement or wire framing only take effect on
    /// a freshly built engine; I/O-mode toggles apply to the live one.
    pub fn requires_reconnect(self) -> bool {
        matches!(
            self,
            Behavior::BinaryProtocol
                | Behavior::SortHosts
                | Behavior::KetamaWeighted
                | Behavior::Distribution
                | Behavior::Hash
        )
    }

    /// Engine-config token for a non-default value, when the option is part
    /// of the engine initialization string.
    ///
    /// `prefix_key` returns `None`: the namespace is runtime state and must
    /// not force a reconnect by changing the config string.
    pub fn config_token(self, value: &BehaviorValue) -> Option<String> {
        match (self, value) {
            (Behavior::PrefixKey, _) => None,
            (Behavior::Distribution, BehaviorValue::Distribution(d)) => {
                Some(format!("--DISTRIBUTION={}", d))
            }
            (Behavior::Hash, BehaviorValue::Hash(h)) => Some(format!("--HASH={}", h)),
            (_, BehaviorValue::Bool(true)) => Some(format!("--{}", self.flag_name())),
            _ => None,
        }
    }

    fn flag_name(self) -> &'static str {
        match self {
            Behavior::BufferRequests => "BUFFER-REQUESTS",
            Behavior::NoBlock => "NO-BLOCK",
            Behavior::Noreply => "NOREPLY",
            Behavior::TcpNodelay => "TCP-NODELAY",
            Behavior::BinaryProtocol => "BINARY-PROTOCOL",
            Behavior::SortHosts => "SORT-HOSTS",
            Behavior::KetamaWeighted => "KETAMA-WEIGHTED",
            // Valued options are formatted in config_token directly.
            Behavior::Distribution | Behavior::Hash | Behavior::PrefixKey => "",
        }
    }
}

impl fmt::Display for Behavior {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

impl FromStr for Behavior {
    type Err = BehaviorError;

    fn from_str(name: &str) -> Result<Self, Self::Err> {
        ALL_BEHAVIORS
            .iter()
            .copied()
            .find(|behavior| behavior.name() == name)
            .ok_or_else(|| BehaviorError::UnknownOption(name.to_string()))
    }
}

/// Key-to-server distribution strategies.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Distribution {
    /// Modular hashing over the server list.
    #[default]
    Modula,
    /// Consistent hashing; placement follows the input server order.
    Consistent,
    /// Random server selection.
    Random,
}

impl Distribution {
    pub fn as_str(self) -> &'static str {
        match self {
            Distribution::Modula => "modula",
            Distribution::Consistent => "consistent",
            Distribution::Random => "random",
        }
    }
}

impl fmt::Display for Distribution {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Key hashing functions offered by the protocol.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum HashFunction {
    /// The engine's default hash.
    #[default]
    Default,
    Md5,
    Crc,
    Fnv1a64,
    Murmur,
}

impl HashFunction {
    pub fn as_str(self) -> &'static str {
        match self {
            HashFunction::Default => "default",
            HashFunction::Md5 => "md5",
            HashFunction::Crc => "crc",
            HashFunction::Fnv1a64 => "fnv1a_64",
            HashFunction::Murmur => "murmur",
        }
    }
}

impl fmt::Display for HashFunction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A typed behavior value.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum BehaviorValue {
    Bool(bool),
    Distribution(Distribution),
    Hash(HashFunction),
    Str(String),
}

impl From<bool> for BehaviorValue {
    fn from(value: bool) -> Self {
        BehaviorValue::Bool(value)
    }
}

impl From<Distribution> for BehaviorValue {
    fn from(value: Distribution) -> Self {
        BehaviorValue::Distribution(value)
    }
}

impl From<HashFunction> for BehaviorValue {
    fn from(value: HashFunction) -> Self {
        BehaviorValue::Hash(value)
    }
}

impl From<&str> for BehaviorValue {
    fn from(value: &str) -> Self {
        BehaviorValue::Str(value.to_string())
    }
}

impl From<String> for BehaviorValue {
    fn from(value: String) -> Self {
        BehaviorValue::Str(value)
    }
}

impl BehaviorValue {
    /// Returns the boolean payload, or false for non-boolean values.
    pub fn as_bool(&self) -> bool {
        matches!(self, BehaviorValue::Bool(true))
    }
}

/// Validated mapping of behaviors to values.
///
/// Options never set report their default; stored defaults are
/// indistinguishable from absent ones.
#[derive(Debug, Clone, Default)]
pub struct BehaviorSet {
    values: BTreeMap<Behavior, BehaviorValue>,
}

impl BehaviorSet {
    /// Creates a set where every option holds its default.
    pub fn new() -> Self {
        Self::default()
    }

    /// Builds a set from string-keyed pairs, validating names, types, and
    /// cross-option constraints in one pass.
    pub fn from_pairs<I, K, V>(pairs: I) -> Result<Self, BehaviorError>
    where
        I: IntoIterator<Item = (K, V)>,
        K: AsRef<str>,
        V: Into<BehaviorValue>,
    {
        let mut set = BehaviorSet::new();
        for (name, value) in pairs {
            let behavior = Behavior::from_str(name.as_ref())?;
            let value = value.into();
            if !behavior.accepts(&value) {
                return Err(BehaviorError::TypeMismatch {
                    behavior,
                    expected: behavior.expected_kind(),
                });
            }
            set.values.insert(behavior, value);
        }
        set.validate()?;
        Ok(set)
    }

    /// Builder-style `set`, consuming and returning the container.
    pub fn with(
        mut self,
        behavior: Behavior,
        value: impl Into<BehaviorValue>,
    ) -> Result<Self, BehaviorError> {
        self.set(behavior, value)?;
        Ok(self)
    }

    /// Sets one option, re-running type and compatibility validation.
    ///
    /// On error the container is left exactly as it was.
    pub fn set(
        &mut self,
        behavior: Behavior,
        value: impl Into<BehaviorValue>,
    ) -> Result<(), BehaviorError> {
        let value = value.into();
        if !behavior.accepts(&value) {
            return Err(BehaviorError::TypeMismatch {
                behavior,
                expected: behavior.expected_kind(),
            });
        }

        // Check compatibility against the prospective state before mutating.
        let sort_hosts = if behavior == Behavior::SortHosts {
            value.as_bool()
        } else {
            self.is_enabled(Behavior::SortHosts)
        };
        let distribution = if behavior == Behavior::Distribution {
            match &value {
                BehaviorValue::Distribution(d) => *d,
                _ => unreachable!("type checked above"),
            }
        } else {
            self.distribution()
        };
        if sort_hosts && distribution == Distribution::Consistent {
            return Err(BehaviorError::IncompatibleOptions {
                left: Behavior::SortHosts,
                right: Behavior::Distribution,
            });
        }

        self.values.insert(behavior, value);
        Ok(())
    }

    /// String-keyed `set`, for loosely-keyed callers.
    pub fn set_named(
        &mut self,
        name: &str,
        value: impl Into<BehaviorValue>,
    ) -> Result<(), BehaviorError> {
        self.set(Behavior::from_str(name)?, value)
    }

    /// Returns the effective value of an option (stored or default).
    pub fn get(&self, behavior: Behavior) -> BehaviorValue {
        self.values
            .get(&behavior)
            .cloned()
            .unwrap_or_else(|| behavior.default_value())
    }

    /// Returns true when a boolean option is enabled.
    pub fn is_enabled(&self, behavior: Behavior) -> bool {
        self.get(behavior).as_bool()
    }

    /// Effective distribution strategy.
    pub fn distribution(&self) -> Distribution {
        match self.get(Behavior::Distribution) {
            BehaviorValue::Distribution(d) => d,
            _ => Distribution::default(),
        }
    }

    /// Effective hash function.
    pub fn hash_function(&self) -> HashFunction {
        match self.get(Behavior::Hash) {
            BehaviorValue::Hash(h) => h,
            _ => HashFunction::default(),
        }
    }

    /// The configured namespace prefix, if any.
    pub fn prefix_key(&self) -> Option<String> {
        match self.values.get(&Behavior::PrefixKey) {
            Some(BehaviorValue::Str(prefix)) => Some(prefix.clone()),
            _ => None,
        }
    }

    /// Removes and returns the namespace prefix.
    ///
    /// The configuration layer moves the prefix into its `Namespace` so the
    /// behavior table never carries runtime key state.
    pub fn take_prefix_key(&mut self) -> Option<String> {
        match self.values.remove(&Behavior::PrefixKey) {
            Some(BehaviorValue::Str(prefix)) => Some(prefix),
            _ => None,
        }
    }

    /// Iterates options whose value differs from the default, in enum order.
    pub fn non_defaults(&self) -> impl Iterator<Item = (Behavior, &BehaviorValue)> + '_ {
        self.values
            .iter()
            .filter(|(behavior, value)| **value != behavior.default_value())
            .map(|(behavior, value)| (*behavior, value))
    }

    /// Re-runs cross-option validation over the full container.
    pub fn validate(&self) -> Result<(), BehaviorError> {
        if self.is_enabled(Behavior::SortHosts) && self.distribution() == Distribution::Consistent
        {
            return Err(BehaviorError::IncompatibleOptions {
                left: Behavior::SortHosts,
                right: Behavior::Distribution,
            });
        }
        Ok(())
    }
}
