//! Type-specific desired/current sets
//!
//! - **IPSet**: desired is the whole aggregate. Current entries pointing at
//!   other managed objects (`dc/...`, `guest/...`) are preserved references:
//!   they are left out of the comparison entirely, so they are never removed.
//! - **Alias**: desired is the first valid address of the first domain only;
//!   current is the alias's single value. Only that domain is looked up.

use crate::directive::ResolveDirective;
use crate::reconcile::ReconciliationPlan;
use crate::resolver::ResolvedAddresses;
use crate::traits::{FirewallObject, ObjectType};

/// Entry prefixes marking references to other managed objects
pub const PRESERVED_PREFIXES: [&str; 2] = ["dc/", "guest/"];

/// Desired and current sets ready for reconciliation
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct EntrySets {
    /// What DNS says the object should hold
    pub desired: Vec<String>,
    /// What the object holds today, minus preserved references
    pub current: Vec<String>,
    /// Preserved references, passed through untouched
    pub preserved: Vec<String>,
}

/// Whether an IPSet entry is a preserved reference
pub fn is_preserved_reference(entry: &str) -> bool {
    PRESERVED_PREFIXES
        .iter()
        .any(|prefix| entry.starts_with(prefix))
}

/// Split IPSet entries into (DNS-managed, preserved)
pub fn partition_entries(entries: &[String]) -> (Vec<String>, Vec<String>) {
    entries
        .iter()
        .cloned()
        .partition(|entry| !is_preserved_reference(entry))
}

/// Domains worth looking up for an object kind
///
/// Aliases only ever use the first domain, so later ones are not resolved.
pub fn lookup_domains(kind: ObjectType, directive: &ResolveDirective) -> &[String] {
    let domains = directive.domains();
    match kind {
        ObjectType::Ipset => domains,
        ObjectType::Alias => &domains[..1],
    }
}

/// Build the type-specific desired/current sets for an object
pub fn entry_sets(object: &FirewallObject, resolved: &ResolvedAddresses) -> EntrySets {
    match object.kind {
        ObjectType::Ipset => {
            let (current, preserved) = partition_entries(&object.entries);
            EntrySets {
                desired: resolved.aggregate().to_vec(),
                current,
                preserved,
            }
        }
        ObjectType::Alias => EntrySets {
            desired: resolved.primary().iter().take(1).cloned().collect(),
            current: object.entries.iter().take(1).cloned().collect(),
            preserved: Vec::new(),
        },
    }
}

/// Compute the reconciliation plan for an object
pub fn plan(object: &FirewallObject, resolved: &ResolvedAddresses) -> ReconciliationPlan {
    let sets = entry_sets(object, resolved);
    ReconciliationPlan::compute(&sets.current, &sets.desired)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::resolver::DomainAddresses;

    fn resolved(domains: &[(&str, &[&str])]) -> ResolvedAddresses {
        ResolvedAddresses::from_domains(
            domains
                .iter()
                .map(|(domain, addresses)| DomainAddresses {
                    domain: domain.to_string(),
                    addresses: addresses.iter().map(|a| a.to_string()).collect(),
                })
                .collect(),
        )
    }

    #[test]
    fn test_lookup_domains_per_kind() {
        let directive = ResolveDirective::new(["x.com", "y.com", "z.com"]).unwrap();

        assert_eq!(lookup_domains(ObjectType::Ipset, &directive), ["x.com", "y.com", "z.com"]);
        assert_eq!(lookup_domains(ObjectType::Alias, &directive), ["x.com"]);
    }

    #[test]
    fn test_preserved_prefixes() {
        assert!(is_preserved_reference("dc/office"));
        assert!(is_preserved_reference("guest/vm-100"));
        assert!(!is_preserved_reference("10.0.0.1"));
        assert!(!is_preserved_reference("dcx/office"));
        assert!(!is_preserved_reference("+dc/office"));
    }

    #[test]
    fn test_ipset_preserves_references() {
        let object = FirewallObject::ipset("web", None, ["dc/foo", "1.2.3.4"]);
        let plan = plan(&object, &resolved(&[("web.example.com", &["5.6.7.8"])]));

        assert_eq!(plan.to_remove(), ["1.2.3.4"]);
        assert_eq!(plan.to_add(), ["5.6.7.8"]);
    }

    #[test]
    fn test_ipset_entry_sets() {
        let object = FirewallObject::ipset(
            "web",
            None,
            ["guest/vm-100", "10.0.0.1", "dc/foo", "10.0.0.2"],
        );
        let sets = entry_sets(
            &object,
            &resolved(&[("a.com", &["10.0.0.2"]), ("b.com", &["10.0.0.3"])]),
        );

        assert_eq!(sets.desired, ["10.0.0.2", "10.0.0.3"]);
        assert_eq!(sets.current, ["10.0.0.1", "10.0.0.2"]);
        assert_eq!(sets.preserved, ["guest/vm-100", "dc/foo"]);
    }

    #[test]
    fn test_alias_uses_first_address_of_first_domain() {
        let object = FirewallObject::alias("gw", None, "0.0.0.0");
        let sets = entry_sets(
            &object,
            &resolved(&[("x.com", &["9.9.9.9", "9.9.9.8"]), ("y.com", &["1.1.1.1"])]),
        );

        assert_eq!(sets.desired, ["9.9.9.9"]);
        assert_eq!(sets.current, ["0.0.0.0"]);
    }

    #[test]
    fn test_alias_ignores_later_domains_when_first_is_empty() {
        let object = FirewallObject::alias("gw", None, "0.0.0.0");
        let sets = entry_sets(&object, &resolved(&[("x.com", &[]), ("y.com", &["1.1.1.1"])]));

        assert!(sets.desired.is_empty());
    }

    #[test]
    fn test_alias_up_to_date() {
        let object = FirewallObject::alias("gw", None, "9.9.9.9");
        assert!(plan(&object, &resolved(&[("x.com", &["9.9.9.9", "9.9.9.8"])])).is_empty());
    }

    #[test]
    fn test_alias_has_no_preserved_references() {
        let object = FirewallObject::alias("gw", None, "dc/foo");
        let plan = plan(&object, &resolved(&[("x.com", &["9.9.9.9"])]));

        assert_eq!(plan.to_remove(), ["dc/foo"]);
        assert_eq!(plan.to_add(), ["9.9.9.9"]);
    }
}
