//! Configuration types for the firewall sync system
//!
//! This module defines the run configuration consumed by the engine and the
//! control plane selection consumed by the binary.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::net::{IpAddr, SocketAddr};

use crate::traits::ObjectType;

/// Default DNS port for configured servers
pub const DEFAULT_DNS_PORT: u16 = 53;

/// Configuration of one sync run
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct RunConfig {
    /// Which object types to process
    #[serde(default)]
    pub selection: ObjectSelection,

    /// Compute and log plans without applying them
    #[serde(default)]
    pub dry_run: bool,

    /// Servers used when a directive names none
    #[serde(default)]
    pub default_dns_servers: Vec<String>,

    /// Detailed logging (presentation only)
    #[serde(default)]
    pub verbose: bool,
}

impl RunConfig {
    /// Create a configuration with defaults
    pub fn new() -> Self {
        Self::default()
    }

    /// Set the object selection
    pub fn with_selection(mut self, selection: ObjectSelection) -> Self {
        self.selection = selection;
        self
    }

    /// Enable or disable dry-run mode
    pub fn with_dry_run(mut self, dry_run: bool) -> Self {
        self.dry_run = dry_run;
        self
    }

    /// Enable or disable per-object outcome logging
    pub fn with_verbose(mut self, verbose: bool) -> Self {
        self.verbose = verbose;
        self
    }

    /// Set the default DNS servers
    pub fn with_default_dns_servers(
        mut self,
        servers: impl IntoIterator<Item = impl Into<String>>,
    ) -> Self {
        self.default_dns_servers = servers.into_iter().map(Into::into).collect();
        self
    }

    /// Validate the configuration
    pub fn validate(&self) -> Result<(), crate::Error> {
        for server in &self.default_dns_servers {
            if parse_server_addr(server).is_none() {
                return Err(crate::Error::config(format!(
                    "Default DNS server `{server}` is not an IP address or ip:port"
                )));
            }
        }
        Ok(())
    }
}

/// Which object types a run processes
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ObjectSelection {
    /// IPSets only
    Ipsets,
    /// Aliases only
    Aliases,
    /// IPSets, then aliases
    #[default]
    All,
}

impl ObjectSelection {
    /// Build from the CLI flags; no flag at all means everything
    pub fn from_flags(ipsets: bool, aliases: bool, all: bool) -> Self {
        match (ipsets, aliases) {
            _ if all => ObjectSelection::All,
            (true, false) => ObjectSelection::Ipsets,
            (false, true) => ObjectSelection::Aliases,
            _ => ObjectSelection::All,
        }
    }

    /// Object types in processing order
    pub fn types(&self) -> &'static [ObjectType] {
        match self {
            ObjectSelection::Ipsets => &[ObjectType::Ipset],
            ObjectSelection::Aliases => &[ObjectType::Alias],
            ObjectSelection::All => &[ObjectType::Ipset, ObjectType::Alias],
        }
    }
}

/// Control plane backend configuration
#[derive(Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ControlPlaneConfig {
    /// Shell out to the `pvesh` CLI on a cluster node
    Pvesh {
        /// Path or name of the pvesh binary
        #[serde(default = "default_pvesh_binary")]
        binary: String,
    },

    /// Talk to the REST API with an API token
    Api {
        /// Base URL, e.g. `https://pve1.example.com:8006`
        base_url: String,
        /// Token in `USER@REALM!TOKENID=SECRET` form
        api_token: String,
        /// Verify the server certificate
        #[serde(default = "default_verify_tls")]
        verify_tls: bool,
    },
}

impl ControlPlaneConfig {
    /// Validate the control plane configuration
    pub fn validate(&self) -> Result<(), crate::Error> {
        match self {
            ControlPlaneConfig::Pvesh { binary } => {
                if binary.trim().is_empty() {
                    return Err(crate::Error::config("pvesh binary cannot be empty"));
                }
                Ok(())
            }
            ControlPlaneConfig::Api {
                base_url,
                api_token,
                ..
            } => {
                if !base_url.starts_with("https://") && !base_url.starts_with("http://") {
                    return Err(crate::Error::config(format!(
                        "API URL must use http or https. Got: {base_url}"
                    )));
                }
                let well_formed = api_token
                    .split_once('!')
                    .and_then(|(user, rest)| {
                        rest.split_once('=')
                            .map(|(id, secret)| (user, id, secret))
                    })
                    .is_some_and(|(user, id, secret)| {
                        user.contains('@') && !id.is_empty() && !secret.is_empty()
                    });
                if !well_formed {
                    return Err(crate::Error::config(
                        "API token must look like USER@REALM!TOKENID=SECRET",
                    ));
                }
                Ok(())
            }
        }
    }

    /// Get the backend type name
    pub fn type_name(&self) -> &'static str {
        match self {
            ControlPlaneConfig::Pvesh { .. } => "pvesh",
            ControlPlaneConfig::Api { .. } => "api",
        }
    }
}

impl Default for ControlPlaneConfig {
    fn default() -> Self {
        ControlPlaneConfig::Pvesh {
            binary: default_pvesh_binary(),
        }
    }
}

// Custom Debug implementation that hides the API token
impl fmt::Debug for ControlPlaneConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ControlPlaneConfig::Pvesh { binary } => {
                f.debug_struct("Pvesh").field("binary", binary).finish()
            }
            ControlPlaneConfig::Api {
                base_url,
                verify_tls,
                ..
            } => f
                .debug_struct("Api")
                .field("base_url", base_url)
                .field("api_token", &"<REDACTED>")
                .field("verify_tls", verify_tls)
                .finish(),
        }
    }
}

fn default_pvesh_binary() -> String {
    "pvesh".to_string()
}

fn default_verify_tls() -> bool {
    true
}

/// Parse a configured DNS server (`ip`, `ip:port` or `[v6]:port`)
pub fn parse_server_addr(server: &str) -> Option<SocketAddr> {
    let server = server.trim();
    if let Ok(ip) = server.parse::<IpAddr>() {
        return Some(SocketAddr::new(ip, DEFAULT_DNS_PORT));
    }
    server.parse::<SocketAddr>().ok()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_selection_from_flags() {
        assert_eq!(ObjectSelection::from_flags(false, false, false), ObjectSelection::All);
        assert_eq!(ObjectSelection::from_flags(true, false, false), ObjectSelection::Ipsets);
        assert_eq!(ObjectSelection::from_flags(false, true, false), ObjectSelection::Aliases);
        assert_eq!(ObjectSelection::from_flags(true, true, false), ObjectSelection::All);
        assert_eq!(ObjectSelection::from_flags(true, false, true), ObjectSelection::All);
    }

    #[test]
    fn test_selection_order() {
        assert_eq!(
            ObjectSelection::All.types(),
            [ObjectType::Ipset, ObjectType::Alias]
        );
        assert_eq!(ObjectSelection::Aliases.types(), [ObjectType::Alias]);
    }

    #[test]
    fn test_parse_server_addr() {
        assert_eq!(
            parse_server_addr("9.9.9.9"),
            Some("9.9.9.9:53".parse().unwrap())
        );
        assert_eq!(
            parse_server_addr(" 9.9.9.9:5353 "),
            Some("9.9.9.9:5353".parse().unwrap())
        );
        assert_eq!(
            parse_server_addr("2620:fe::fe"),
            Some("[2620:fe::fe]:53".parse().unwrap())
        );
        assert_eq!(parse_server_addr("dns.example.com"), None);
        assert_eq!(parse_server_addr(""), None);
    }

    #[test]
    fn test_run_config_validation() {
        assert!(RunConfig::new().validate().is_ok());
        assert!(
            RunConfig::new()
                .with_default_dns_servers(["9.9.9.9", "1.1.1.1:53"])
                .validate()
                .is_ok()
        );
        assert!(
            RunConfig::new()
                .with_default_dns_servers(["resolver.local"])
                .validate()
                .is_err()
        );
    }

    #[test]
    fn test_run_config_deserializes_with_defaults() {
        let config: RunConfig = serde_json::from_str(r#"{"dry_run": true}"#).unwrap();
        assert!(config.dry_run);
        assert_eq!(config.selection, ObjectSelection::All);
        assert!(config.default_dns_servers.is_empty());
    }

    #[test]
    fn test_control_plane_validation() {
        assert!(ControlPlaneConfig::default().validate().is_ok());
        assert!(
            ControlPlaneConfig::Pvesh {
                binary: " ".to_string()
            }
            .validate()
            .is_err()
        );

        let api = |url: &str, token: &str| ControlPlaneConfig::Api {
            base_url: url.to_string(),
            api_token: token.to_string(),
            verify_tls: true,
        };
        assert!(api("https://pve:8006", "root@pam!sync=0000-1111").validate().is_ok());
        assert!(api("ftp://pve", "root@pam!sync=0000-1111").validate().is_err());
        assert!(api("https://pve:8006", "secret").validate().is_err());
        assert!(api("https://pve:8006", "root@pam!sync=").validate().is_err());
    }

    #[test]
    fn test_api_token_not_exposed_in_debug() {
        let config = ControlPlaneConfig::Api {
            base_url: "https://pve:8006".to_string(),
            api_token: "root@pam!sync=secret-uuid".to_string(),
            verify_tls: false,
        };
        let debug_str = format!("{config:?}");
        assert!(!debug_str.contains("secret-uuid"));
        assert!(debug_str.contains("REDACTED"));
    }

    #[test]
    fn test_control_plane_config_tagged() {
        let config: ControlPlaneConfig = serde_json::from_str(r#"{"type": "pvesh"}"#).unwrap();
        assert_eq!(config, ControlPlaneConfig::default());
        assert_eq!(config.type_name(), "pvesh");
    }
}
