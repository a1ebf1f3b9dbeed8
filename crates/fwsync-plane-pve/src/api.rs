//! PVE REST API backend
//!
//! Same resources as the CLI, served under `<base_url>/api2/json/` and
//! authenticated with an API token:
//!
//! ```http
//! GET    /api2/json/cluster/firewall/ipset
//! GET    /api2/json/cluster/firewall/ipset/<name>
//! POST   /api2/json/cluster/firewall/ipset/<name>          {"cidr": "<address>"}
//! DELETE /api2/json/cluster/firewall/ipset/<name>/<cidr>
//! GET    /api2/json/cluster/firewall/aliases
//! GET    /api2/json/cluster/firewall/aliases/<name>
//! PUT    /api2/json/cluster/firewall/aliases/<name>        {"cidr": "<address>", "comment": "..."}
//! Authorization: PVEAPIToken=USER@REALM!TOKENID=SECRET
//! ```
//!
//! Every response body is wrapped as `{"data": ...}`.

use async_trait::async_trait;
use fwsync_core::traits::{ControlPlane, FirewallObject, ObjectType};
use fwsync_core::{Error, Result};
use serde::Deserialize;
use serde_json::{Value, json};
use std::time::Duration;
use tracing::debug;

use crate::model::{collection_path, object_path, parse_entries, parse_listing};

/// Default HTTP timeout for API requests (30 seconds)
const DEFAULT_HTTP_TIMEOUT: Duration = Duration::from_secs(30);

/// Response envelope
#[derive(Debug, Deserialize)]
struct Envelope {
    #[serde(default)]
    data: Value,
}

/// Control plane backed by the PVE REST API
///
/// The Debug implementation does not expose the API token.
#[derive(Clone)]
pub struct ApiControlPlane {
    /// Base URL without the `/api2/json` suffix
    base_url: String,

    /// API token (`USER@REALM!TOKENID=SECRET`)
    /// ⚠️ NEVER log this value
    api_token: String,

    /// HTTP client for API requests
    client: reqwest::Client,
}

// Custom Debug implementation that hides the API token
impl std::fmt::Debug for ApiControlPlane {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ApiControlPlane")
            .field("base_url", &self.base_url)
            .field("api_token", &"<REDACTED>")
            .finish()
    }
}

impl ApiControlPlane {
    /// Create an API backend
    ///
    /// # Parameters
    ///
    /// - `base_url`: e.g. `https://pve1.example.com:8006`
    /// - `api_token`: Token in `USER@REALM!TOKENID=SECRET` form
    /// - `verify_tls`: Set to false to accept self-signed certificates
    pub fn new(
        base_url: impl Into<String>,
        api_token: impl Into<String>,
        verify_tls: bool,
    ) -> Result<Self> {
        let api_token = api_token.into();
        if api_token.is_empty() {
            return Err(Error::config("PVE API token cannot be empty"));
        }

        let client = reqwest::Client::builder()
            .timeout(DEFAULT_HTTP_TIMEOUT)
            .danger_accept_invalid_certs(!verify_tls)
            .build()
            .map_err(|e| Error::http(format!("failed to build HTTP client: {e}")))?;

        Ok(Self {
            base_url: base_url.into().trim_end_matches('/').to_string(),
            api_token,
            client,
        })
    }

    fn url(&self, path: &str) -> String {
        format!("{}/api2/json/{}", self.base_url, path)
    }

    fn auth_header(&self) -> String {
        format!("PVEAPIToken={}", self.api_token)
    }

    /// Send a request and unwrap the `data` envelope
    async fn send(
        &self,
        request: reqwest::RequestBuilder,
        operation: &str,
        object: &str,
    ) -> Result<Value> {
        let response = request
            .header("Authorization", self.auth_header())
            .send()
            .await
            .map_err(|e| {
                Error::control_plane(operation, object, format!("HTTP request failed: {e}"))
            })?;

        let status = response.status();
        if !status.is_success() {
            let error_text = response
                .text()
                .await
                .unwrap_or_else(|_| "Unable to read error response".to_string());

            let message = match status.as_u16() {
                401 | 403 => format!(
                    "Authentication failed: invalid API token or insufficient permissions. Status: {status}"
                ),
                404 => format!("Not found. Status: {status}"),
                500..=599 => format!("PVE server error: {status} - {}", error_text.trim()),
                _ => format!("Request failed: {status} - {}", error_text.trim()),
            };
            return Err(Error::control_plane(operation, object, message));
        }

        let envelope: Envelope = response.json().await.map_err(|e| {
            Error::control_plane(operation, object, format!("Failed to parse response: {e}"))
        })?;
        Ok(envelope.data)
    }

    async fn get(&self, path: &str, operation: &str, object: &str) -> Result<Value> {
        let url = self.url(path);
        debug!(%url, "GET");
        self.send(self.client.get(&url), operation, object).await
    }
}

/// Path of one IPSet entry; `/` inside a CIDR is percent-encoded
fn entry_path(object: &FirewallObject, cidr: &str) -> String {
    format!("{}/{}", object_path(object), cidr.replace('/', "%2F"))
}

#[async_trait]
impl ControlPlane for ApiControlPlane {
    async fn list_objects(&self, kind: ObjectType) -> Result<Vec<FirewallObject>> {
        let data = self
            .get(collection_path(kind), "list_objects", &kind.to_string())
            .await?;
        parse_listing(kind, data)
    }

    async fn get_entries(&self, object: &FirewallObject) -> Result<Vec<String>> {
        let data = self
            .get(&object_path(object), "get_entries", &object.name)
            .await?;
        parse_entries(object.kind, data)
    }

    async fn add_entry(&self, object: &FirewallObject, address: &str) -> Result<()> {
        let url = self.url(&object_path(object));
        debug!(%url, address, "POST");
        let request = self.client.post(&url).json(&json!({ "cidr": address }));
        self.send(request, "add_entry", &object.name).await.map(drop)
    }

    async fn remove_entry(&self, object: &FirewallObject, address: &str) -> Result<()> {
        let url = self.url(&entry_path(object, address));
        debug!(%url, "DELETE");
        self.send(self.client.delete(&url), "remove_entry", &object.name)
            .await
            .map(drop)
    }

    async fn set_alias_value(&self, object: &FirewallObject, address: &str) -> Result<()> {
        let url = self.url(&object_path(object));
        let mut body = json!({ "cidr": address });
        if let Some(comment) = &object.comment {
            body["comment"] = Value::String(comment.clone());
        }
        debug!(%url, address, "PUT");
        self.send(self.client.put(&url).json(&body), "set_alias_value", &object.name)
            .await
            .map(drop)
    }

    fn backend_name(&self) -> &'static str {
        "api"
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_url_building() {
        let plane = ApiControlPlane::new("https://pve:8006/", "root@pam!sync=secret", true).unwrap();
        assert_eq!(
            plane.url("cluster/firewall/ipset"),
            "https://pve:8006/api2/json/cluster/firewall/ipset"
        );
        assert_eq!(plane.auth_header(), "PVEAPIToken=root@pam!sync=secret");
    }

    #[test]
    fn test_entry_path_encodes_cidr() {
        let web = FirewallObject::ipset("web", None, ["10.0.0.0/24"]);
        assert_eq!(
            entry_path(&web, "10.0.0.0/24"),
            "cluster/firewall/ipset/web/10.0.0.0%2F24"
        );
        assert_eq!(entry_path(&web, "10.0.0.1"), "cluster/firewall/ipset/web/10.0.0.1");
    }

    #[test]
    fn test_empty_token_rejected() {
        assert!(ApiControlPlane::new("https://pve:8006", "", true).is_err());
    }

    #[test]
    fn test_api_token_not_exposed_in_debug() {
        let plane =
            ApiControlPlane::new("https://pve:8006", "root@pam!sync=secret-uuid", false).unwrap();

        let debug_str = format!("{plane:?}");
        assert!(!debug_str.contains("secret-uuid"));
        assert!(debug_str.contains("ApiControlPlane"));
    }
}
