// # Control Plane Trait
//
// Defines the interface used to read and mutate firewall objects on the
// target platform.
//
// ## Implementations
//
// - Proxmox VE (pvesh CLI and REST API): `fwsync-plane-pve` crate
// - In-memory recording fake: `fwsync_core::memory::MemoryControlPlane`
//
// ## Usage
//
// ```rust,ignore
// use fwsync_core::traits::{ControlPlane, ObjectType};
//
// #[tokio::main]
// async fn main() -> anyhow::Result<()> {
//     let plane = /* ControlPlane implementation */;
//
//     for object in plane.list_objects(ObjectType::Ipset).await? {
//         let entries = plane.get_entries(&object).await?;
//         println!("{} has {} entries", object.name, entries.len());
//     }
//
//     Ok(())
// }
// ```

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::fmt;

/// Kind of firewall object
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ObjectType {
    /// A set of address and reference entries
    Ipset,
    /// Exactly one address value
    Alias,
}

impl fmt::Display for ObjectType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ObjectType::Ipset => f.write_str("IPSet"),
            ObjectType::Alias => f.write_str("Alias"),
        }
    }
}

/// A firewall object as listed by the control plane
///
/// Fetched fresh on every run; never cached across runs.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FirewallObject {
    /// Object name (identity)
    pub name: String,
    /// Object kind
    pub kind: ObjectType,
    /// Metadata comment, which may carry a resolve directive
    pub comment: Option<String>,
    /// Current entries, in control plane order, unique
    pub entries: Vec<String>,
}

impl FirewallObject {
    /// Create an IPSet with the given entries
    pub fn ipset(
        name: impl Into<String>,
        comment: Option<&str>,
        entries: impl IntoIterator<Item = impl Into<String>>,
    ) -> Self {
        Self {
            name: name.into(),
            kind: ObjectType::Ipset,
            comment: comment.map(str::to_string),
            entries: entries.into_iter().map(Into::into).collect(),
        }
    }

    /// Create an Alias holding `value`
    pub fn alias(name: impl Into<String>, comment: Option<&str>, value: impl Into<String>) -> Self {
        let value = value.into();
        Self {
            name: name.into(),
            kind: ObjectType::Alias,
            comment: comment.map(str::to_string),
            entries: if value.is_empty() { Vec::new() } else { vec![value] },
        }
    }

    /// Same object with a freshly fetched entry list
    pub fn with_entries(mut self, entries: Vec<String>) -> Self {
        self.entries = entries;
        self
    }
}

/// Trait for firewall control plane implementations
///
/// Every call is a single, independent operation. Implementations must not
/// retry, batch, or cache; the engine decides what to call and in what order,
/// and treats any failure as affecting that one call only.
///
/// # Idempotency
///
/// `add_entry`, `remove_entry` and `set_alias_value` are re-applied on the
/// next scheduled run if a run is interrupted, so they must be safe to repeat.
#[async_trait]
pub trait ControlPlane: Send + Sync {
    /// List all objects of the given kind, in platform order
    ///
    /// # Returns
    ///
    /// - `Ok(Vec<FirewallObject>)`: The objects; `entries` may be empty for
    ///   IPSets if the listing does not include them
    /// - `Err(Error)`: If the listing could not be obtained (fatal for a run)
    async fn list_objects(&self, kind: ObjectType) -> Result<Vec<FirewallObject>, crate::Error>;

    /// Fetch the current entries of an object
    ///
    /// For an Alias this is its single value (or nothing).
    async fn get_entries(&self, object: &FirewallObject) -> Result<Vec<String>, crate::Error>;

    /// Add one entry to an IPSet
    async fn add_entry(&self, object: &FirewallObject, address: &str) -> Result<(), crate::Error>;

    /// Remove one entry from an IPSet
    async fn remove_entry(&self, object: &FirewallObject, address: &str)
        -> Result<(), crate::Error>;

    /// Rewrite the value of an Alias
    ///
    /// Implementations keep `object.comment` so the directive survives.
    async fn set_alias_value(
        &self,
        object: &FirewallObject,
        address: &str,
    ) -> Result<(), crate::Error>;

    /// Get the backend name (for logging/debugging)
    fn backend_name(&self) -> &'static str;
}
