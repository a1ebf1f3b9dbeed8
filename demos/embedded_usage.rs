//! Minimal embedding example for fwsync-core
//!
//! Drives the sync engine as a library: a hand-written DNS transport answers
//! from a static table, the in-memory control plane stands in for the
//! firewall. The same objects are first previewed with a dry run, then
//! synced for real.

use std::collections::HashMap;

use fwsync_core::memory::MemoryControlPlane;
use fwsync_core::traits::{DnsTransport, FirewallObject, ObjectType};
use fwsync_core::{Error, Result, RunConfig, SyncEngine};
use tracing::Level;
use tracing_subscriber::FmtSubscriber;

/// DNS transport answering from a fixed table
struct StaticDns {
    records: HashMap<&'static str, Vec<&'static str>>,
}

impl StaticDns {
    fn new() -> Self {
        let records = HashMap::from([
            ("web.example.com", vec!["192.0.2.10", "192.0.2.11"]),
            ("api.example.com", vec!["192.0.2.20"]),
            ("gw.example.com", vec!["198.51.100.1"]),
        ]);
        Self { records }
    }

    fn answer(&self, server: &str, domain: &str) -> Result<Vec<String>> {
        self.records
            .get(domain)
            .map(|addrs| addrs.iter().map(|a| a.to_string()).collect())
            .ok_or_else(|| Error::dns(domain, server, "NXDOMAIN"))
    }
}

#[async_trait::async_trait]
impl DnsTransport for StaticDns {
    async fn resolve_system(&self, domain: &str) -> Result<Vec<String>> {
        self.answer("system", domain)
    }

    async fn resolve_with(&self, server: &str, domain: &str) -> Result<Vec<String>> {
        self.answer(server, domain)
    }

    fn transport_name(&self) -> &'static str {
        "static"
    }
}

fn firewall() -> MemoryControlPlane {
    MemoryControlPlane::with_objects([
        FirewallObject::ipset(
            "frontends",
            Some("Public frontends #resolve=web.example.com,api.example.com"),
            ["dc/office", "192.0.2.10", "192.0.2.99"],
        ),
        FirewallObject::ipset("office", Some("static, not DNS managed"), ["10.0.0.0/24"]),
        FirewallObject::alias("uplink", Some("#resolve: gw.example.com"), "198.51.100.254"),
    ])
}

#[tokio::main(flavor = "current_thread")]
async fn main() -> Result<()> {
    let subscriber = FmtSubscriber::builder()
        .with_max_level(Level::INFO)
        .finish();
    tracing::subscriber::set_global_default(subscriber)
        .map_err(|e| Error::config(e.to_string()))?;

    let plane = firewall();

    println!("=== Dry run ===");
    let preview = SyncEngine::new(
        Box::new(plane.clone()),
        Box::new(StaticDns::new()),
        RunConfig::new().with_dry_run(true),
    )?
    .run()
    .await?;
    println!("{preview}");
    println!("mutations so far: {}", plane.mutation_count());

    println!("=== Live run ===");
    let report = SyncEngine::new(Box::new(plane.clone()), Box::new(StaticDns::new()), RunConfig::new())?
        .run()
        .await?;
    println!("{report}");

    for call in plane.mutations() {
        println!("  {call:?}");
    }
    println!(
        "frontends: {:?}",
        plane.entries(ObjectType::Ipset, "frontends")
    );
    println!("uplink:    {:?}", plane.entries(ObjectType::Alias, "uplink"));

    Ok(())
}
