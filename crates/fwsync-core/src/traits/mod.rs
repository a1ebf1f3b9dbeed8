//! Core traits for the firewall sync system
//!
//! This module defines the abstract interfaces that all implementations must follow.
//!
//! - [`ControlPlane`]: Read and mutate firewall objects
//! - [`DnsTransport`]: Perform single raw DNS lookups

pub mod control_plane;
pub mod dns_transport;

pub use control_plane::{ControlPlane, FirewallObject, ObjectType};
pub use dns_transport::DnsTransport;
