//! # Topology Check Tool
//!
//! Purpose: Validate server descriptors and print the effective topology
//! and canonical engine configuration without opening any connection,
//! using the same eager validation path as client construction.
//!
//! Usage: `memc-check [server-spec ...]`
//! With no arguments the default topology (`localhost:11211`) is shown.

use anyhow::{Context, Result};
use tracing_subscriber::EnvFilter;

use memc_client::{BehaviorSet, ClientConfig};

fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .init();

    let specs: Vec<String> = std::env::args().skip(1).collect();
    let config =
        ClientConfig::build(specs, BehaviorSet::new()).context("server list rejected")?;

    for server in config.servers() {
        let kind = if server.is_socket() { "socket" } else { "tcp" };
        println!("{:>6}  {}", kind, server);
    }
    println!();
    println!("{}", config.config_string());
    Ok(())
}
