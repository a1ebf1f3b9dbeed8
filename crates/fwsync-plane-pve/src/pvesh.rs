//! `pvesh` CLI backend
//!
//! Runs on a cluster node as root and shells out once per operation:
//!
//! ```text
//! pvesh get    cluster/firewall/ipset --output-format json
//! pvesh get    cluster/firewall/ipset/<name> --output-format json
//! pvesh create cluster/firewall/ipset/<name> --cidr <address>
//! pvesh delete cluster/firewall/ipset/<name>/<address>
//! pvesh get    cluster/firewall/aliases --output-format json
//! pvesh get    cluster/firewall/aliases/<name> --output-format json
//! pvesh set    cluster/firewall/aliases/<name> --cidr <address> [--comment <comment>]
//! ```

use async_trait::async_trait;
use fwsync_core::traits::{ControlPlane, FirewallObject, ObjectType};
use fwsync_core::{Error, Result};
use serde_json::Value;
use tokio::process::Command;
use tracing::debug;

use crate::model::{collection_path, object_path, parse_entries, parse_listing};

/// Default name of the CLI
pub const DEFAULT_PVESH_BINARY: &str = "pvesh";

/// Control plane backed by the `pvesh` CLI
#[derive(Debug, Clone)]
pub struct PveshControlPlane {
    /// Path or name of the binary
    binary: String,
}

impl PveshControlPlane {
    /// Create a backend invoking `binary`
    pub fn new(binary: impl Into<String>) -> Self {
        Self {
            binary: binary.into(),
        }
    }

    /// The configured binary
    pub fn binary(&self) -> &str {
        &self.binary
    }

    /// Run one pvesh invocation, returning stdout
    async fn run(&self, args: &[String], operation: &str, object: &str) -> Result<Vec<u8>> {
        debug!(binary = %self.binary, ?args, "Running pvesh");

        let output = Command::new(&self.binary)
            .args(args)
            .kill_on_drop(true)
            .output()
            .await
            .map_err(|e| {
                Error::control_plane(
                    operation,
                    object,
                    format!("failed to run `{}`: {e}", self.binary),
                )
            })?;

        if !output.status.success() {
            let stderr = String::from_utf8_lossy(&output.stderr);
            return Err(Error::control_plane(
                operation,
                object,
                format!("{} ({})", stderr.trim(), output.status),
            ));
        }

        Ok(output.stdout)
    }

    async fn get_json(&self, path: &str, operation: &str, object: &str) -> Result<Value> {
        let stdout = self.run(&get_args(path), operation, object).await?;
        serde_json::from_slice(&stdout).map_err(|e| {
            Error::control_plane(operation, object, format!("unreadable pvesh output: {e}"))
        })
    }
}

impl Default for PveshControlPlane {
    fn default() -> Self {
        Self::new(DEFAULT_PVESH_BINARY)
    }
}

fn args(items: &[&str]) -> Vec<String> {
    items.iter().map(|s| s.to_string()).collect()
}

/// `get <path> --output-format json`
fn get_args(path: &str) -> Vec<String> {
    args(&["get", path, "--output-format", "json"])
}

/// `create <ipset> --cidr <address>`
fn add_args(object: &FirewallObject, address: &str) -> Vec<String> {
    args(&["create", &object_path(object), "--cidr", address])
}

/// `delete <ipset>/<address>`
fn remove_args(object: &FirewallObject, address: &str) -> Vec<String> {
    args(&["delete", &format!("{}/{}", object_path(object), address)])
}

/// `set <alias> --cidr <address> [--comment <comment>]`
///
/// The comment is re-sent so the directive survives the rewrite.
fn set_alias_args(object: &FirewallObject, address: &str) -> Vec<String> {
    let mut argv = args(&["set", &object_path(object), "--cidr", address]);
    if let Some(comment) = &object.comment {
        argv.extend(args(&["--comment", comment]));
    }
    argv
}

#[async_trait]
impl ControlPlane for PveshControlPlane {
    async fn list_objects(&self, kind: ObjectType) -> Result<Vec<FirewallObject>> {
        let json = self
            .get_json(collection_path(kind), "list_objects", &kind.to_string())
            .await?;
        parse_listing(kind, json)
    }

    async fn get_entries(&self, object: &FirewallObject) -> Result<Vec<String>> {
        let json = self
            .get_json(&object_path(object), "get_entries", &object.name)
            .await?;
        parse_entries(object.kind, json)
    }

    async fn add_entry(&self, object: &FirewallObject, address: &str) -> Result<()> {
        self.run(&add_args(object, address), "add_entry", &object.name)
            .await
            .map(drop)
    }

    async fn remove_entry(&self, object: &FirewallObject, address: &str) -> Result<()> {
        self.run(&remove_args(object, address), "remove_entry", &object.name)
            .await
            .map(drop)
    }

    async fn set_alias_value(&self, object: &FirewallObject, address: &str) -> Result<()> {
        self.run(&set_alias_args(object, address), "set_alias_value", &object.name)
            .await
            .map(drop)
    }

    fn backend_name(&self) -> &'static str {
        "pvesh"
    }
}
