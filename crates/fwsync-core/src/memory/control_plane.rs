// # Memory Control Plane
//
// In-memory implementation of ControlPlane.
//
// ## Purpose
//
// Holds firewall objects in a Vec (listing order is insertion order) and
// records every call made against it. Tests use it to assert exactly which
// mutations a run performed, and that a dry run performed none.
//
// ## Failure Injection
//
// - `fail_listing(kind)`: `list_objects(kind)` fails
// - `fail_get_entries(name)`: `get_entries` for that object fails
// - `fail_address(name, address)`: add/remove/set of that address fails
//
// Failed calls are still recorded.

use std::collections::HashSet;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use async_trait::async_trait;

use crate::Error;
use crate::traits::{ControlPlane, FirewallObject, ObjectType};

/// One recorded control plane call
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ControlPlaneCall {
    /// `list_objects`
    ListObjects(ObjectType),
    /// `get_entries`
    GetEntries {
        /// Object name
        object: String,
    },
    /// `add_entry`
    AddEntry {
        /// Object name
        object: String,
        /// Added address
        address: String,
    },
    /// `remove_entry`
    RemoveEntry {
        /// Object name
        object: String,
        /// Removed address
        address: String,
    },
    /// `set_alias_value`
    SetAliasValue {
        /// Object name
        object: String,
        /// New value
        address: String,
    },
}

impl ControlPlaneCall {
    /// Whether this call changes firewall state
    pub fn is_mutation(&self) -> bool {
        matches!(
            self,
            ControlPlaneCall::AddEntry { .. }
                | ControlPlaneCall::RemoveEntry { .. }
                | ControlPlaneCall::SetAliasValue { .. }
        )
    }
}

#[derive(Debug, Default)]
struct PlaneState {
    objects: Vec<FirewallObject>,
    calls: Vec<ControlPlaneCall>,
    failing_listings: HashSet<ObjectType>,
    failing_objects: HashSet<String>,
    failing_addresses: HashSet<(String, String)>,
}

impl PlaneState {
    fn find_mut(&mut self, kind: ObjectType, name: &str) -> Option<&mut FirewallObject> {
        self.objects
            .iter_mut()
            .find(|o| o.kind == kind && o.name == name)
    }

    fn check_address(&self, operation: &str, object: &str, address: &str) -> Result<(), Error> {
        if self
            .failing_addresses
            .contains(&(object.to_string(), address.to_string()))
        {
            return Err(Error::control_plane(
                operation,
                object,
                format!("injected failure for {address}"),
            ));
        }
        Ok(())
    }
}

/// In-memory control plane that records every call
///
/// Clones share state.
///
/// # Example
///
/// ```rust
/// use fwsync_core::memory::MemoryControlPlane;
/// use fwsync_core::traits::{ControlPlane, FirewallObject, ObjectType};
///
/// #[tokio::main]
/// async fn main() -> Result<(), Box<dyn std::error::Error>> {
///     let plane = MemoryControlPlane::new();
///     plane.insert(FirewallObject::ipset("web", Some("#resolve=web.example.com"), ["192.0.2.1"]));
///
///     let ipsets = plane.list_objects(ObjectType::Ipset).await?;
///     plane.add_entry(&ipsets[0], "192.0.2.2").await?;
///
///     assert_eq!(plane.entries(ObjectType::Ipset, "web"), ["192.0.2.1", "192.0.2.2"]);
///     assert_eq!(plane.mutation_count(), 1);
///
///     Ok(())
/// }
/// ```
#[derive(Debug, Clone, Default)]
pub struct MemoryControlPlane {
    inner: Arc<Mutex<PlaneState>>,
}

impl MemoryControlPlane {
    /// Create an empty control plane
    pub fn new() -> Self {
        Self::default()
    }

    /// Create a control plane holding `objects`, in order
    pub fn with_objects(objects: impl IntoIterator<Item = FirewallObject>) -> Self {
        let plane = Self::new();
        for object in objects {
            plane.insert(object);
        }
        plane
    }

    /// Add an object, replacing one with the same kind and name
    pub fn insert(&self, object: FirewallObject) {
        let mut state = self.state();
        match state.find_mut(object.kind, &object.name) {
            Some(existing) => *existing = object,
            None => state.objects.push(object),
        }
    }

    /// Current state of an object
    pub fn object(&self, kind: ObjectType, name: &str) -> Option<FirewallObject> {
        self.state()
            .objects
            .iter()
            .find(|o| o.kind == kind && o.name == name)
            .cloned()
    }

    /// Current entries of an object (empty if unknown)
    pub fn entries(&self, kind: ObjectType, name: &str) -> Vec<String> {
        self.object(kind, name)
            .map(|o| o.entries)
            .unwrap_or_default()
    }

    /// All calls made so far, in order
    pub fn calls(&self) -> Vec<ControlPlaneCall> {
        self.state().calls.clone()
    }

    /// Mutating calls made so far, in order
    pub fn mutations(&self) -> Vec<ControlPlaneCall> {
        self.state()
            .calls
            .iter()
            .filter(|c| c.is_mutation())
            .cloned()
            .collect()
    }

    /// Number of mutating calls made so far
    pub fn mutation_count(&self) -> usize {
        self.state().calls.iter().filter(|c| c.is_mutation()).count()
    }

    /// Make `list_objects(kind)` fail
    pub fn fail_listing(&self, kind: ObjectType) {
        self.state().failing_listings.insert(kind);
    }

    /// Make `get_entries` fail for the named object
    pub fn fail_get_entries(&self, name: &str) {
        self.state().failing_objects.insert(name.to_string());
    }

    /// Make any mutation of `address` on the named object fail
    pub fn fail_address(&self, name: &str, address: &str) {
        self.state()
            .failing_addresses
            .insert((name.to_string(), address.to_string()));
    }

    fn state(&self) -> MutexGuard<'_, PlaneState> {
        self.inner.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

#[async_trait]
impl ControlPlane for MemoryControlPlane {
    async fn list_objects(&self, kind: ObjectType) -> Result<Vec<FirewallObject>, Error> {
        let mut state = self.state();
        state.calls.push(ControlPlaneCall::ListObjects(kind));

        if state.failing_listings.contains(&kind) {
            return Err(Error::control_plane(
                "list_objects",
                kind.to_string(),
                "injected failure",
            ));
        }

        Ok(state
            .objects
            .iter()
            .filter(|o| o.kind == kind)
            .cloned()
            .collect())
    }

    async fn get_entries(&self, object: &FirewallObject) -> Result<Vec<String>, Error> {
        let mut state = self.state();
        state.calls.push(ControlPlaneCall::GetEntries {
            object: object.name.clone(),
        });

        if state.failing_objects.contains(&object.name) {
            return Err(Error::control_plane(
                "get_entries",
                &object.name,
                "injected failure",
            ));
        }

        state
            .find_mut(object.kind, &object.name)
            .map(|o| o.entries.clone())
            .ok_or_else(|| Error::control_plane("get_entries", &object.name, "no such object"))
    }

    async fn add_entry(&self, object: &FirewallObject, address: &str) -> Result<(), Error> {
        let mut state = self.state();
        state.calls.push(ControlPlaneCall::AddEntry {
            object: object.name.clone(),
            address: address.to_string(),
        });
        state.check_address("add_entry", &object.name, address)?;

        let ipset = state
            .find_mut(ObjectType::Ipset, &object.name)
            .ok_or_else(|| Error::control_plane("add_entry", &object.name, "no such IPSet"))?;
        if !ipset.entries.iter().any(|e| e == address) {
            ipset.entries.push(address.to_string());
        }
        Ok(())
    }

    async fn remove_entry(&self, object: &FirewallObject, address: &str) -> Result<(), Error> {
        let mut state = self.state();
        state.calls.push(ControlPlaneCall::RemoveEntry {
            object: object.name.clone(),
            address: address.to_string(),
        });
        state.check_address("remove_entry", &object.name, address)?;

        let ipset = state
            .find_mut(ObjectType::Ipset, &object.name)
            .ok_or_else(|| Error::control_plane("remove_entry", &object.name, "no such IPSet"))?;
        ipset.entries.retain(|e| e != address);
        Ok(())
    }

    async fn set_alias_value(&self, object: &FirewallObject, address: &str) -> Result<(), Error> {
        let mut state = self.state();
        state.calls.push(ControlPlaneCall::SetAliasValue {
            object: object.name.clone(),
            address: address.to_string(),
        });
        state.check_address("set_alias_value", &object.name, address)?;

        let alias = state
            .find_mut(ObjectType::Alias, &object.name)
            .ok_or_else(|| Error::control_plane("set_alias_value", &object.name, "no such alias"))?;
        alias.entries = vec![address.to_string()];
        alias.comment = object.comment.clone();
        Ok(())
    }

    fn backend_name(&self) -> &'static str {
        "memory"
    }
}
