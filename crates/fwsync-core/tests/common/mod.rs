//! Shared fixtures for sync contract tests
//!
//! Builds engines over the recording in-memory fakes and hands back clones of
//! the fakes so tests can inspect calls after the run.

#![allow(dead_code)]

use fwsync_core::config::{ObjectSelection, RunConfig};
use fwsync_core::memory::{MemoryControlPlane, MemoryDnsTransport};
use fwsync_core::traits::FirewallObject;
use fwsync_core::{RunReport, SyncEngine};

/// Fakes wired into an engine
pub struct Harness {
    /// Control plane shared with the engine
    pub plane: MemoryControlPlane,
    /// DNS transport shared with the engine
    pub dns: MemoryDnsTransport,
    /// Engine under test
    pub engine: SyncEngine,
}

impl Harness {
    /// Run the engine once, expecting success
    pub async fn run(&self) -> RunReport {
        self.engine.run().await.expect("run succeeds")
    }
}

/// Live run over `objects` with the default configuration
pub fn harness(objects: Vec<FirewallObject>) -> Harness {
    harness_with(objects, RunConfig::new())
}

/// Dry run over `objects`
pub fn dry_run_harness(objects: Vec<FirewallObject>) -> Harness {
    harness_with(objects, RunConfig::new().with_dry_run(true))
}

/// Run over `objects` with a custom configuration
pub fn harness_with(objects: Vec<FirewallObject>, config: RunConfig) -> Harness {
    let plane = MemoryControlPlane::with_objects(objects);
    let dns = MemoryDnsTransport::new();
    let engine = SyncEngine::new(Box::new(plane.clone()), Box::new(dns.clone()), config)
        .expect("engine construction succeeds");

    Harness { plane, dns, engine }
}

/// Rebuild the engine over the same fakes with a different configuration
pub fn reconfigure(harness: Harness, config: RunConfig) -> Harness {
    let engine = SyncEngine::new(
        Box::new(harness.plane.clone()),
        Box::new(harness.dns.clone()),
        config,
    )
    .expect("engine construction succeeds");

    Harness { engine, ..harness }
}

/// Configuration with run-wide default DNS servers
pub fn with_defaults(servers: &[&str]) -> RunConfig {
    RunConfig::new().with_default_dns_servers(servers.iter().copied())
}

/// Configuration limited to one selection
pub fn only(selection: ObjectSelection) -> RunConfig {
    RunConfig::new().with_selection(selection)
}

/// Managed IPSet
pub fn managed_ipset(name: &str, directive: &str, entries: &[&str]) -> FirewallObject {
    FirewallObject::ipset(name, Some(directive), entries.iter().copied())
}

/// Managed alias
pub fn managed_alias(name: &str, directive: &str, value: &str) -> FirewallObject {
    FirewallObject::alias(name, Some(directive), value)
}

/// Owned address list
pub fn addrs(items: &[&str]) -> Vec<String> {
    items.iter().map(|s| s.to_string()).collect()
}
