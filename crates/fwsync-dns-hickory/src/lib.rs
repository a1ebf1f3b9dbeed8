// # Hickory DNS Transport
//
// Implements `fwsync_core::DnsTransport` on top of hickory-resolver.
//
// ## Resolvers
//
// - **System**: built once from the host configuration (`/etc/resolv.conf`).
//   If the configuration cannot be read the transport reports the system
//   resolver as unavailable.
// - **Per server**: one resolver per configured server, created on first use
//   and reused for the rest of the run.
//
// All resolvers ask for A records only and keep no cache, so repeated
// queries of the same domain observe round-robin answers.
//
// The system resolver gets names as written, so `search` and `ndots` from
// the host configuration still expand short names like `fileserver`.
// Explicit servers get absolute names.

use async_trait::async_trait;
use fwsync_core::config::parse_server_addr;
use fwsync_core::traits::DnsTransport;
use fwsync_core::{Error, Result};
use hickory_resolver::TokioAsyncResolver;
use hickory_resolver::config::{
    LookupIpStrategy, NameServerConfigGroup, ResolverConfig, ResolverOpts,
};
use hickory_resolver::error::{ResolveError, ResolveErrorKind};
use std::collections::HashMap;
use std::net::{IpAddr, SocketAddr};
use std::sync::{Mutex, PoisonError};
use std::time::Duration;
use tracing::{debug, warn};

/// Per-lookup timeout
const DNS_TIMEOUT: Duration = Duration::from_secs(5);

/// Label used for the system resolver in errors
const SYSTEM_LABEL: &str = "system";

/// DNS transport backed by hickory-resolver
pub struct HickoryTransport {
    /// Host resolver, `None` if the host configuration is unusable
    system: Option<TokioAsyncResolver>,

    /// Resolvers for explicitly configured servers
    servers: Mutex<HashMap<SocketAddr, TokioAsyncResolver>>,
}

impl std::fmt::Debug for HickoryTransport {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("HickoryTransport")
            .field("system_available", &self.system.is_some())
            .finish()
    }
}

impl HickoryTransport {
    /// Create a transport using the host's resolver configuration
    pub fn new() -> Self {
        let system = match hickory_resolver::system_conf::read_system_conf() {
            Ok((config, opts)) => Some(TokioAsyncResolver::tokio(config, tune(opts))),
            Err(e) => {
                warn!(error = %e, "System resolver configuration unusable");
                None
            }
        };

        Self {
            system,
            servers: Mutex::new(HashMap::new()),
        }
    }

    /// Create a transport without a system resolver
    ///
    /// Only explicitly configured servers can be used.
    pub fn without_system() -> Self {
        Self {
            system: None,
            servers: Mutex::new(HashMap::new()),
        }
    }

    /// Resolver for one configured server, created on first use
    fn server_resolver(&self, server: &str, domain: &str) -> Result<TokioAsyncResolver> {
        let addr = parse_server_addr(server)
            .ok_or_else(|| Error::dns(domain, server, "not an IP address or ip:port"))?;

        let mut servers = self.servers.lock().unwrap_or_else(PoisonError::into_inner);
        let resolver = servers.entry(addr).or_insert_with(|| {
            debug!(%addr, "Creating resolver for server");
            let group = NameServerConfigGroup::from_ips_clear(&[addr.ip()], addr.port(), true);
            let config = ResolverConfig::from_parts(None, vec![], group);
            let mut opts = tune(ResolverOpts::default());
            opts.use_hosts_file = false;
            TokioAsyncResolver::tokio(config, opts)
        });

        Ok(resolver.clone())
    }
}

impl Default for HickoryTransport {
    fn default() -> Self {
        Self::new()
    }
}

/// A records only, no cache, one short attempt
fn tune(mut opts: ResolverOpts) -> ResolverOpts {
    opts.ip_strategy = LookupIpStrategy::Ipv4Only;
    opts.cache_size = 0;
    opts.timeout = DNS_TIMEOUT;
    opts.attempts = 1;
    opts
}

/// Which resolver a lookup goes to
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Route {
    /// Host resolver, search list applies
    System,
    /// Explicitly configured server
    Server,
}

/// Name handed to hickory for a lookup
fn query_name(domain: &str, route: Route) -> String {
    match route {
        Route::System => domain.to_string(),
        Route::Server if domain.ends_with('.') => domain.to_string(),
        Route::Server => format!("{domain}."),
    }
}

async fn lookup(
    resolver: &TokioAsyncResolver,
    route: Route,
    server: &str,
    domain: &str,
) -> Result<Vec<String>> {
    match resolver.lookup_ip(query_name(domain, route).as_str()).await {
        Ok(response) => Ok(response
            .iter()
            .filter(IpAddr::is_ipv4)
            .map(|ip| ip.to_string())
            .collect()),
        Err(e) if is_no_records(&e) => {
            debug!(domain, server, "No A records");
            Ok(Vec::new())
        }
        Err(e) => Err(Error::dns(domain, server, e.to_string())),
    }
}

fn is_no_records(error: &ResolveError) -> bool {
    matches!(error.kind(), ResolveErrorKind::NoRecordsFound { .. })
}

#[async_trait]
impl DnsTransport for HickoryTransport {
    async fn resolve_system(&self, domain: &str) -> Result<Vec<String>> {
        let resolver = self
            .system
            .as_ref()
            .ok_or_else(|| Error::dns(domain, SYSTEM_LABEL, "system resolver unavailable"))?;
        lookup(resolver, Route::System, SYSTEM_LABEL, domain).await
    }

    async fn resolve_with(&self, server: &str, domain: &str) -> Result<Vec<String>> {
        let resolver = self.server_resolver(server, domain)?;
        lookup(&resolver, Route::Server, server, domain).await
    }

    fn system_available(&self) -> bool {
        self.system.is_some()
    }

    fn transport_name(&self) -> &'static str {
        "hickory"
    }
}
