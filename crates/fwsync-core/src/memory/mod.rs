//! In-memory implementations of the capability traits
//!
//! Deterministic stand-ins for the firewall and DNS, recording every call
//! for later assertion. Used by the test suites and by embedders who want to
//! preview what a run would do against a hand-built configuration.

pub mod control_plane;
pub mod dns;

pub use control_plane::{ControlPlaneCall, MemoryControlPlane};
pub use dns::{DnsLookup, MemoryDnsTransport};
