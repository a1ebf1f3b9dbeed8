// # fwsync-core
//
// Core library keeping firewall objects in sync with DNS.
//
// ## Architecture Overview
//
// A firewall object (IPSet or Alias) opts in to DNS management through a
// directive in its comment, e.g. `#resolve=a.example.com,b.example.com #queries=3`.
// Each run is computed from scratch against live data:
//
// - **directive**: Parses the comment into a `ResolveDirective`
// - **resolver**: Turns a directive into `ResolvedAddresses` via a `DnsTransport`
// - **policy**: Builds type-specific desired/current sets (IPSet vs. Alias)
// - **reconcile**: Computes the minimal `ReconciliationPlan`
// - **engine**: `SyncEngine` drives one run against a `ControlPlane`
// - **memory**: Recording in-memory fakes of both capability traits
//
// ## Design Principles
//
// 1. **Stateless runs**: Nothing is persisted between runs
// 2. **Sequential**: One object at a time, one lookup at a time
// 3. **Tolerant parsing**: Malformed options fall back to defaults
// 4. **Library-first**: The binary only wires configuration to the engine

pub mod config;
pub mod directive;
pub mod engine;
pub mod error;
pub mod memory;
pub mod policy;
pub mod reconcile;
pub mod resolver;
pub mod traits;

// Re-export core types for convenience
pub use config::{ControlPlaneConfig, ObjectSelection, RunConfig};
pub use directive::{DnsServers, ResolveDirective};
pub use engine::{ObjectOutcome, RunReport, SyncEngine};
pub use error::{Error, ParseWarning, Result};
pub use reconcile::ReconciliationPlan;
pub use resolver::{ResolvedAddresses, Resolver};
pub use traits::{ControlPlane, DnsTransport, FirewallObject, ObjectType};
