//! Directive resolution
//!
//! The [`Resolver`] turns a [`ResolveDirective`] into [`ResolvedAddresses`]:
//!
//! 1. Pick the servers: `#dns-servers=system` forces the host resolver, an
//!    explicit directive list wins over the caller's defaults, and with
//!    neither the host resolver is used.
//! 2. For each domain run `queries` lookups back to back, sleeping `delay`
//!    between consecutive lookups only.
//! 3. Within one lookup, ask explicit servers in order and accept the first
//!    one returning at least one valid IPv4 address. If none does, that
//!    lookup falls back to the host resolver.
//! 4. Drop invalid tokens, de-duplicate, keep first-seen order.
//!
//! Resolution never fails as a whole: a domain that produced nothing
//! contributes an empty set and the caller decides what that means.

mod addresses;

pub use addresses::{DomainAddresses, ResolvedAddresses, validate_ipv4};

use crate::directive::{DnsServers, ResolveDirective};
use crate::traits::DnsTransport;
use addresses::extend_unique;
use std::time::Duration;
use tracing::{debug, warn};

/// Server label used in logs for the host resolver
const SYSTEM_LABEL: &str = "system";

/// Where lookups for one directive are sent
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ServerSelection<'a> {
    /// The host's system resolver
    System,
    /// Explicit servers in order, then the system resolver as fallback
    Explicit(&'a [String]),
}

impl<'a> ServerSelection<'a> {
    /// Apply the server precedence rules
    ///
    /// # Parameters
    ///
    /// - `requested`: Servers named by the directive
    /// - `defaults`: Run-wide default servers supplied by the caller
    pub fn select(requested: &'a DnsServers, defaults: &'a [String]) -> Self {
        match requested {
            DnsServers::System => ServerSelection::System,
            DnsServers::Explicit(servers) if !servers.is_empty() => {
                ServerSelection::Explicit(servers)
            }
            _ if !defaults.is_empty() => ServerSelection::Explicit(defaults),
            _ => ServerSelection::System,
        }
    }
}

/// Resolves directives through a [`DnsTransport`]
pub struct Resolver {
    transport: Box<dyn DnsTransport>,
}

impl Resolver {
    /// Create a resolver on top of a transport
    pub fn new(transport: Box<dyn DnsTransport>) -> Self {
        Self { transport }
    }

    /// The underlying transport
    pub fn transport(&self) -> &dyn DnsTransport {
        self.transport.as_ref()
    }

    /// Resolve every domain of a directive
    ///
    /// # Parameters
    ///
    /// - `directive`: Parsed directive
    /// - `default_servers`: Run-wide default servers (may be empty)
    pub async fn resolve(
        &self,
        directive: &ResolveDirective,
        default_servers: &[String],
    ) -> ResolvedAddresses {
        self.resolve_domains(directive, directive.domains(), default_servers)
            .await
    }

    /// Resolve a subset of a directive's domains with the directive's options
    ///
    /// The first entry of `domains` becomes the primary domain of the result.
    pub async fn resolve_domains(
        &self,
        directive: &ResolveDirective,
        domains: &[String],
        default_servers: &[String],
    ) -> ResolvedAddresses {
        let selection = ServerSelection::select(directive.dns_servers(), default_servers);
        debug!(directive = %directive, ?domains, ?selection, "Resolving directive");

        let mut per_domain = Vec::with_capacity(domains.len());
        for domain in domains {
            let addresses = self
                .resolve_domain(domain, directive.queries(), directive.delay(), selection)
                .await;
            per_domain.push(DomainAddresses {
                domain: domain.clone(),
                addresses,
            });
        }

        ResolvedAddresses::from_domains(per_domain)
    }

    /// Run all queries for one domain
    async fn resolve_domain(
        &self,
        domain: &str,
        queries: u32,
        delay: Duration,
        selection: ServerSelection<'_>,
    ) -> Vec<String> {
        let mut addresses = Vec::new();

        for query in 1..=queries {
            if query > 1 && !delay.is_zero() {
                debug!(domain, ?delay, "Waiting before next query");
                tokio::time::sleep(delay).await;
            }

            let found = self.lookup(domain, selection).await;
            debug!(domain, query, queries, ?found, "Query finished");
            extend_unique(&mut addresses, found);
        }

        if addresses.is_empty() {
            warn!(domain, queries, "Domain yielded no valid address");
        } else if queries > 1 {
            debug!(domain, queries, ?addresses, "Combined addresses of all queries");
        }

        addresses
    }

    /// One lookup, honoring the server selection
    async fn lookup(&self, domain: &str, selection: ServerSelection<'_>) -> Vec<String> {
        if let ServerSelection::Explicit(servers) = selection {
            for server in servers {
                match self.transport.resolve_with(server, domain).await {
                    Ok(tokens) => {
                        let valid = validate_tokens(domain, server, tokens);
                        if !valid.is_empty() {
                            return valid;
                        }
                        debug!(domain, server = %server, "Server returned no valid address");
                    }
                    Err(e) => {
                        warn!(domain, server = %server, error = %e, "Lookup via server failed");
                    }
                }
            }
            warn!(domain, "No configured server answered, falling back to system resolver");
        }

        self.lookup_system(domain).await
    }

    async fn lookup_system(&self, domain: &str) -> Vec<String> {
        if !self.transport.system_available() {
            warn!(domain, "System resolver unavailable");
            return Vec::new();
        }

        match self.transport.resolve_system(domain).await {
            Ok(tokens) => validate_tokens(domain, SYSTEM_LABEL, tokens),
            Err(e) => {
                warn!(domain, server = SYSTEM_LABEL, error = %e, "Lookup failed");
                Vec::new()
            }
        }
    }
}

/// Keep valid IPv4 tokens, logging the rest
fn validate_tokens(domain: &str, server: &str, tokens: Vec<String>) -> Vec<String> {
    let mut valid = Vec::with_capacity(tokens.len());
    for token in tokens {
        match validate_ipv4(&token) {
            Some(address) => extend_unique(&mut valid, [address]),
            None => warn!(domain, server, token = %token, "Discarding invalid address"),
        }
    }
    valid
}
