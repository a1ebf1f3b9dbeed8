// # Proxmox VE Control Plane
//
// Implements `fwsync_core::ControlPlane` for the cluster-wide firewall of a
// Proxmox VE cluster (datacenter IPSets and aliases).
//
// ## Backends
//
// - **pvesh** (default): shells out to the `pvesh` CLI on a cluster node.
//   Needs no credentials, but must run as root on the node.
// - **api**: talks to `https://<host>:8006/api2/json` with an API token.
//   Can run anywhere that reaches the API.
//
// Both backends make exactly one request per trait call and never retry;
// failures are returned to the engine, which logs them and moves on.
//
// ## Security
//
// - API token NEVER appears in logs or Debug output

pub mod api;
pub mod model;
pub mod pvesh;

pub use api::ApiControlPlane;
pub use pvesh::PveshControlPlane;

use fwsync_core::config::ControlPlaneConfig;
use fwsync_core::traits::ControlPlane;
use fwsync_core::Result;

/// Factory for PVE control planes
pub struct PveFactory;

impl PveFactory {
    /// Build the backend selected by `config`
    ///
    /// # Errors
    ///
    /// Returns `Error::Config` if the configuration is invalid.
    pub fn create(&self, config: &ControlPlaneConfig) -> Result<Box<dyn ControlPlane>> {
        config.validate()?;

        match config {
            ControlPlaneConfig::Pvesh { binary } => {
                Ok(Box::new(PveshControlPlane::new(binary.clone())))
            }
            ControlPlaneConfig::Api {
                base_url,
                api_token,
                verify_tls,
            } => {
                if !verify_tls {
                    tracing::warn!("TLS certificate verification disabled for the PVE API");
                }
                Ok(Box::new(ApiControlPlane::new(
                    base_url.clone(),
                    api_token.clone(),
                    *verify_tls,
                )?))
            }
        }
    }
}
