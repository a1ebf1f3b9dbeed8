//! Command line and environment configuration
//!
//! Every flag can also be set through a `FWSYNC_*` environment variable,
//! which is how cron jobs and systemd units usually configure the tool.

use anyhow::{Result, bail};
use clap::{Parser, ValueEnum};
use fwsync_core::config::{ControlPlaneConfig, ObjectSelection, RunConfig};
use tracing::Level;

/// Control plane backend
#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum Backend {
    /// `pvesh` CLI on a cluster node
    Pvesh,
    /// REST API with an API token
    Api,
}

#[derive(Debug, Parser)]
#[command(name = "fwsync", version)]
#[command(about = "Update Proxmox VE firewall IPSets and aliases from DNS.")]
#[command(
    long_about = "Update Proxmox VE firewall IPSets and aliases from DNS.\n\n\
    Objects opt in through their comment:\n  \
    #resolve=a.example.com,b.example.com #queries=3 #delay=2 #dns-servers=9.9.9.9"
)]
pub struct Cli {
    /// Process IPSets only
    #[arg(long, env = "FWSYNC_IPSETS")]
    pub ipsets: bool,

    /// Process aliases only
    #[arg(long, env = "FWSYNC_ALIASES")]
    pub aliases: bool,

    /// Process IPSets and aliases (default)
    #[arg(long, env = "FWSYNC_ALL")]
    pub all: bool,

    /// Show planned changes without applying them
    #[arg(short = 'n', long, env = "FWSYNC_DRY_RUN")]
    pub dry_run: bool,

    /// Detailed logging
    #[arg(short, long, env = "FWSYNC_VERBOSE")]
    pub verbose: bool,

    /// Default DNS servers for directives naming none (comma separated)
    #[arg(long, env = "FWSYNC_DNS_SERVERS", value_delimiter = ',')]
    pub dns_servers: Vec<String>,

    /// Control plane backend
    #[arg(long, env = "FWSYNC_BACKEND", value_enum, default_value_t = Backend::Pvesh)]
    pub backend: Backend,

    /// Path to the pvesh binary
    #[arg(long, env = "FWSYNC_PVESH_BINARY", default_value = "pvesh")]
    pub pvesh_binary: String,

    /// PVE API base URL, e.g. https://pve1.example.com:8006
    #[arg(long, env = "FWSYNC_API_URL")]
    pub api_url: Option<String>,

    /// PVE API token (USER@REALM!TOKENID=SECRET)
    #[arg(long, env = "FWSYNC_API_TOKEN", hide_env_values = true)]
    pub api_token: Option<String>,

    /// Accept self-signed API certificates
    #[arg(long, env = "FWSYNC_INSECURE")]
    pub insecure: bool,

    /// Log level (trace, debug, info, warn, error)
    #[arg(long, env = "FWSYNC_LOG_LEVEL", default_value = "info")]
    pub log_level: String,
}

impl Cli {
    /// Engine configuration
    pub fn run_config(&self) -> RunConfig {
        RunConfig {
            selection: ObjectSelection::from_flags(self.ipsets, self.aliases, self.all),
            dry_run: self.dry_run,
            default_dns_servers: self
                .dns_servers
                .iter()
                .map(|s| s.trim().to_string())
                .filter(|s| !s.is_empty())
                .collect(),
            verbose: self.verbose,
        }
    }

    /// Control plane configuration
    pub fn control_plane_config(&self) -> Result<ControlPlaneConfig> {
        let config = match self.backend {
            Backend::Pvesh => ControlPlaneConfig::Pvesh {
                binary: self.pvesh_binary.clone(),
            },
            Backend::Api => {
                let Some(base_url) = self.api_url.clone() else {
                    bail!("--api-url (FWSYNC_API_URL) is required with --backend api");
                };
                let Some(api_token) = self.api_token.clone() else {
                    bail!("--api-token (FWSYNC_API_TOKEN) is required with --backend api");
                };
                ControlPlaneConfig::Api {
                    base_url,
                    api_token,
                    verify_tls: !self.insecure,
                }
            }
        };

        config.validate()?;
        Ok(config)
    }

    /// Maximum log level; `--verbose` means DEBUG
    pub fn max_level(&self) -> Result<Level> {
        if self.verbose {
            return Ok(Level::DEBUG);
        }

        match self.log_level.to_lowercase().as_str() {
            "trace" => Ok(Level::TRACE),
            "debug" => Ok(Level::DEBUG),
            "info" => Ok(Level::INFO),
            "warn" => Ok(Level::WARN),
            "error" => Ok(Level::ERROR),
            other => bail!(
                "Log level '{}' is not valid. Valid levels: trace, debug, info, warn, error",
                other
            ),
        }
    }
}
