//! Resolved address sets

use std::collections::HashSet;
use std::net::Ipv4Addr;

/// Addresses one domain resolved to, in first-seen order
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DomainAddresses {
    /// The domain
    pub domain: String,
    /// Unique valid addresses across all of the domain's queries
    pub addresses: Vec<String>,
}

/// Resolution result for a whole directive
///
/// Keeps the per-domain breakdown (in directive order) next to the
/// de-duplicated union of all domains, ordered by first appearance across
/// domain order, then query order.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct ResolvedAddresses {
    per_domain: Vec<DomainAddresses>,
    aggregate: Vec<String>,
}

impl ResolvedAddresses {
    /// Build from per-domain results given in directive order
    pub fn from_domains(per_domain: Vec<DomainAddresses>) -> Self {
        let mut aggregate = Vec::new();
        let mut seen = HashSet::new();
        for address in per_domain.iter().flat_map(|d| d.addresses.iter()) {
            if seen.insert(address.as_str()) {
                aggregate.push(address.clone());
            }
        }

        Self {
            per_domain,
            aggregate,
        }
    }

    /// Union of all domains' addresses, first-seen order, unique
    pub fn aggregate(&self) -> &[String] {
        &self.aggregate
    }

    /// Per-domain results in directive order
    pub fn per_domain(&self) -> &[DomainAddresses] {
        &self.per_domain
    }

    /// Addresses of the first domain in directive order
    pub fn primary(&self) -> &[String] {
        self.per_domain
            .first()
            .map(|d| d.addresses.as_slice())
            .unwrap_or_default()
    }

    /// Addresses of a specific domain (empty if it was not resolved)
    pub fn for_domain(&self, domain: &str) -> &[String] {
        self.per_domain
            .iter()
            .find(|d| d.domain == domain)
            .map(|d| d.addresses.as_slice())
            .unwrap_or_default()
    }

    /// Whether nothing at all was resolved
    pub fn is_empty(&self) -> bool {
        self.aggregate.is_empty()
    }
}

/// Parse a returned token as a dotted-quad IPv4 address
///
/// Returns the canonical text form, or `None` for anything else (IPv6,
/// hostnames, out-of-range octets, leading zeros).
pub fn validate_ipv4(token: &str) -> Option<String> {
    token
        .trim()
        .parse::<Ipv4Addr>()
        .ok()
        .map(|addr| addr.to_string())
}

/// Append `items` to `target`, skipping anything already present
pub(crate) fn extend_unique(target: &mut Vec<String>, items: impl IntoIterator<Item = String>) {
    for item in items {
        if !target.contains(&item) {
            target.push(item);
        }
    }
}
