//! PVE firewall resources and their JSON shapes
//!
//! Both backends see the same JSON: `pvesh --output-format json` prints what
//! the REST API wraps in `{"data": ...}`.

use fwsync_core::traits::{FirewallObject, ObjectType};
use fwsync_core::{Error, Result};
use serde::Deserialize;
use serde_json::Value;

/// Resource path of all objects of a kind
pub fn collection_path(kind: ObjectType) -> &'static str {
    match kind {
        ObjectType::Ipset => "cluster/firewall/ipset",
        ObjectType::Alias => "cluster/firewall/aliases",
    }
}

/// Resource path of one object
pub fn object_path(object: &FirewallObject) -> String {
    format!("{}/{}", collection_path(object.kind), object.name)
}

/// `GET cluster/firewall/ipset` item
#[derive(Debug, Deserialize)]
struct IpsetSummary {
    name: String,
    #[serde(default)]
    comment: Option<String>,
}

/// `GET cluster/firewall/ipset/<name>` item
#[derive(Debug, Deserialize)]
struct IpsetEntry {
    cidr: String,
}

/// `GET cluster/firewall/aliases[/<name>]` item
#[derive(Debug, Deserialize)]
struct AliasRecord {
    name: String,
    #[serde(default)]
    cidr: String,
    #[serde(default)]
    comment: Option<String>,
}

/// Parse an object listing
///
/// IPSet listings carry no entries; those are fetched per object.
pub fn parse_listing(kind: ObjectType, json: Value) -> Result<Vec<FirewallObject>> {
    match kind {
        ObjectType::Ipset => {
            let sets: Vec<IpsetSummary> = serde_json::from_value(json)?;
            Ok(sets
                .into_iter()
                .map(|s| FirewallObject::ipset(s.name, s.comment.as_deref(), Vec::<String>::new()))
                .collect())
        }
        ObjectType::Alias => {
            let aliases: Vec<AliasRecord> = serde_json::from_value(json)?;
            Ok(aliases
                .into_iter()
                .map(|a| FirewallObject::alias(a.name, a.comment.as_deref(), a.cidr))
                .collect())
        }
    }
}

/// Parse the current entries of one object
///
/// An alias answers with a single record; its `cidr` is its only entry.
pub fn parse_entries(kind: ObjectType, json: Value) -> Result<Vec<String>> {
    match kind {
        ObjectType::Ipset => {
            let entries: Vec<IpsetEntry> = serde_json::from_value(json)?;
            let mut cidrs: Vec<String> = Vec::with_capacity(entries.len());
            for entry in entries {
                if !cidrs.contains(&entry.cidr) {
                    cidrs.push(entry.cidr);
                }
            }
            Ok(cidrs)
        }
        ObjectType::Alias => {
            let alias: AliasRecord = serde_json::from_value(json)?;
            if alias.cidr.is_empty() {
                return Err(Error::invalid_input(format!(
                    "alias `{}` has no cidr",
                    alias.name
                )));
            }
            Ok(vec![alias.cidr])
        }
    }
}
