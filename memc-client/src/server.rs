//! # Server Descriptors and List Parsing
//!
//! Purpose: Turn raw endpoint descriptions into validated, immutable
//! `ServerDescriptor` values, and define which input shapes a client
//! accepts for its server list.
//!
//! ## Design Principles
//! 1. **Canonical Grammar**: `hostname[:port][/?weight]` is the observable
//!    contract; parse → format → parse is stable for well-formed input.
//! 2. **Fail Fast**: Malformed descriptors are rejected during parsing with
//!    the offending spec in the error, never at connection time.
//! 3. **Closed Input Shapes**: `IntoServerList` enumerates the accepted
//!    inputs; anything else is a compile error rather than a runtime check.

use std::fmt;
use std::str::FromStr;

use memc_common::DEFAULT_PORT;

use crate::error::{ClientError, ClientResult};

/// One server endpoint: a TCP host/port pair or a local socket path.
///
/// Port `0` marks a local socket; the hostname field then holds the
/// filesystem path. Descriptors are created by parsing and never mutated.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ServerDescriptor {
    hostname: String,
    port: u16,
    weight: Option<u32>,
}

impl ServerDescriptor {
    /// Creates a TCP descriptor.
    pub fn new(hostname: impl Into<String>, port: u16) -> Self {
        ServerDescriptor {
            hostname: hostname.into(),
            port,
            weight: None,
        }
    }

    /// Creates a local-socket descriptor from a filesystem path.
    pub fn socket(path: impl Into<String>) -> Self {
        Self::new(path, 0)
    }

    /// Attaches a ring weight.
    pub fn with_weight(mut self, weight: u32) -> Self {
        self.weight = Some(weight);
        self
    }

    pub fn hostname(&self) -> &str {
        &self.hostname
    }

    pub fn port(&self) -> u16 {
        self.port
    }

    pub fn weight(&self) -> Option<u32> {
        self.weight
    }

    /// True for local-socket descriptors (no TCP port).
    pub fn is_socket(&self) -> bool {
        self.port == 0
    }

    /// Parses one descriptor from its textual form.
    ///
    /// Accepted shapes: `hostname`, `hostname:port`, either with a
    /// `/?weight` suffix, or a bare `/path/to/socket`.
    pub fn parse(spec: &str) -> ClientResult<Self> {
        // The weight suffix is considered after port splitting, but it is
        // syntactically a suffix, so strip it first.
        let (body, weight) = match spec.rfind("/?") {
            Some(idx) => {
                let raw = &spec[idx + 2..];
                let weight: u32 = raw
                    .parse()
                    .map_err(|_| ClientError::invalid_spec(spec, "weight must be an integer"))?;
                if weight == 0 {
                    return Err(ClientError::invalid_spec(spec, "weight must be positive"));
                }
                (&spec[..idx], Some(weight))
            }
            None => (spec, None),
        };

        if body.is_empty() {
            return Err(ClientError::invalid_spec(spec, "empty hostname"));
        }

        // A bare path is a local socket; no port segment to parse.
        if body.starts_with('/') && !body.contains(':') {
            return Ok(ServerDescriptor {
                hostname: body.to_string(),
                port: 0,
                weight,
            });
        }

        let (hostname, port) = match body.match_indices(':').count() {
            0 => (body, DEFAULT_PORT),
            1 => {
                let (hostname, port) = body.split_once(':').expect("one colon present");
                let port = port
                    .parse::<u16>()
                    .map_err(|_| ClientError::invalid_spec(spec, "port must be an integer"))?;
                (hostname, port)
            }
            _ => return Err(ClientError::invalid_spec(spec, "too many colons")),
        };

        if hostname.is_empty() {
            return Err(ClientError::invalid_spec(spec, "empty hostname"));
        }
        if hostname.chars().any(char::is_whitespace) {
            return Err(ClientError::invalid_spec(spec, "whitespace in hostname"));
        }

        Ok(ServerDescriptor {
            hostname: hostname.to_string(),
            port,
            weight,
        })
    }
}

impl fmt::Display for ServerDescriptor {
    /// Canonical textual form: `hostname[:port][/?weight]`.
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.hostname)?;
        if self.port != 0 {
            write!(f, ":{}", self.port)?;
        }
        if let Some(weight) = self.weight {
            write!(f, "/?{}", weight)?;
        }
        Ok(())
    }
}

impl FromStr for ServerDescriptor {
    type Err = ClientError;

    fn from_str(spec: &str) -> Result<Self, Self::Err> {
        Self::parse(spec)
    }
}

/// The default topology when no servers are supplied.
pub fn default_server_list() -> Vec<ServerDescriptor> {
    vec![ServerDescriptor::new("localhost", DEFAULT_PORT)]
}

/// Input shapes accepted for a client's server list.
///
/// A single descriptor string or value, an ordered sequence of either, `()`
/// or `None` for the default topology. An empty sequence also yields the
/// default.
pub trait IntoServerList {
    fn into_server_list(self) -> ClientResult<Vec<ServerDescriptor>>;
}

impl IntoServerList for () {
    fn into_server_list(self) -> ClientResult<Vec<ServerDescriptor>> {
        Ok(default_server_list())
    }
}

impl IntoServerList for &str {
    fn into_server_list(self) -> ClientResult<Vec<ServerDescriptor>> {
        Ok(vec![ServerDescriptor::parse(self)?])
    }
}

impl IntoServerList for String {
    fn into_server_list(self) -> ClientResult<Vec<ServerDescriptor>> {
        self.as_str().into_server_list()
    }
}

impl IntoServerList for ServerDescriptor {
    fn into_server_list(self) -> ClientResult<Vec<ServerDescriptor>> {
        Ok(vec![self])
    }
}

impl IntoServerList for Vec<ServerDescriptor> {
    fn into_server_list(self) -> ClientResult<Vec<ServerDescriptor>> {
        if self.is_empty() {
            return Ok(default_server_list());
        }
        Ok(self)
    }
}

impl IntoServerList for Vec<&str> {
    fn into_server_list(self) -> ClientResult<Vec<ServerDescriptor>> {
        parse_all(self.into_iter())
    }
}

impl IntoServerList for Vec<String> {
    fn into_server_list(self) -> ClientResult<Vec<ServerDescriptor>> {
        parse_all(self.iter().map(String::as_str))
    }
}

impl IntoServerList for &[&str] {
    fn into_server_list(self) -> ClientResult<Vec<ServerDescriptor>> {
        parse_all(self.iter().copied())
    }
}

impl<const N: usize> IntoServerList for [&str; N] {
    fn into_server_list(self) -> ClientResult<Vec<ServerDescriptor>> {
        parse_all(self.into_iter())
    }
}

impl<T: IntoServerList> IntoServerList for Option<T> {
    fn into_server_list(self) -> ClientResult<Vec<ServerDescriptor>> {
        match self {
            Some(inner) => inner.into_server_list(),
            None => Ok(default_server_list()),
        }
    }
}

fn parse_all<'a, I>(specs: I) -> ClientResult<Vec<ServerDescriptor>>
where
    I: Iterator<Item = &'a str>,
{
    let parsed: Vec<ServerDescriptor> = specs
        .map(ServerDescriptor::parse)
        .collect::<ClientResult<_>>()?;
    if parsed.is_empty() {
        return Ok(default_server_list());
    }
    Ok(parsed)
}
