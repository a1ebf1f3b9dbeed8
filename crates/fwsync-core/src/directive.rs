//! Resolve directives embedded in firewall object comments
//!
//! A comment opts an object into DNS sync with one of two forms:
//!
//! ```text
//! #resolve=api.example.com,cdn.example.com #queries=3 #delay=2.5 #dns-servers=9.9.9.9,1.1.1.1
//! #resolve: api.example.com
//! ```
//!
//! The `#resolve=` form takes a comma separated domain list and wins when both
//! forms are present. The legacy `#resolve:` form names exactly one domain.
//! Option tokens may appear anywhere, in any order. Unknown tokens are
//! ignored, and a malformed option falls back to its default with a
//! [`ParseWarning`]; configuration comments already deployed in the field rely
//! on that leniency. When an option appears more than once, the first
//! occurrence wins.

use crate::error::ParseWarning;
use std::fmt;
use std::time::Duration;

/// Default number of lookups per domain
pub const DEFAULT_QUERIES: u32 = 1;

/// Default pause between consecutive lookups of one domain
pub const DEFAULT_DELAY: Duration = Duration::from_secs(3);

/// Sentinel value of `#dns-servers=` selecting the host resolver
pub const SYSTEM_RESOLVER: &str = "system";

const RESOLVE_MARKER: &str = "#resolve=";
const LEGACY_RESOLVE_MARKER: &str = "#resolve:";
const QUERIES_MARKER: &str = "#queries=";
const DELAY_MARKER: &str = "#delay=";
const DNS_SERVERS_MARKER: &str = "#dns-servers=";

/// Name servers requested by a directive
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub enum DnsServers {
    /// No `#dns-servers=` token; the caller's defaults apply
    #[default]
    Unset,
    /// `#dns-servers=system`: always use the host resolver
    System,
    /// Explicit, non-empty, ordered server list
    Explicit(Vec<String>),
}

/// Parsed form of a resolve directive
///
/// Recomputed from the live comment on every run; `domains` is never empty.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ResolveDirective {
    domains: Vec<String>,
    queries: u32,
    delay: Duration,
    dns_servers: DnsServers,
}

/// A directive together with the warnings raised while parsing it
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ParsedDirective {
    /// The directive
    pub directive: ResolveDirective,
    /// Malformed options that were replaced by defaults
    pub warnings: Vec<ParseWarning>,
}

impl ResolveDirective {
    /// Create a directive with default options
    ///
    /// Domains are trimmed and empty ones dropped. Returns `None` when no
    /// domain remains.
    pub fn new(domains: impl IntoIterator<Item = impl AsRef<str>>) -> Option<Self> {
        let domains: Vec<String> = domains
            .into_iter()
            .map(|d| d.as_ref().trim().to_string())
            .filter(|d| !d.is_empty())
            .collect();

        if domains.is_empty() {
            return None;
        }

        Some(Self {
            domains,
            queries: DEFAULT_QUERIES,
            delay: DEFAULT_DELAY,
            dns_servers: DnsServers::Unset,
        })
    }

    /// Set the number of lookups per domain (values below 1 become 1)
    pub fn with_queries(mut self, queries: u32) -> Self {
        self.queries = queries.max(1);
        self
    }

    /// Set the pause between consecutive lookups
    pub fn with_delay(mut self, delay: Duration) -> Self {
        self.delay = delay;
        self
    }

    /// Set the requested name servers
    pub fn with_dns_servers(mut self, dns_servers: DnsServers) -> Self {
        self.dns_servers = match dns_servers {
            DnsServers::Explicit(servers) if servers.is_empty() => DnsServers::Unset,
            other => other,
        };
        self
    }

    /// Parse a comment, discarding warnings
    ///
    /// Returns `None` when the object is not managed by DNS sync.
    pub fn parse(comment: Option<&str>) -> Option<Self> {
        Self::parse_with_warnings(comment).map(|parsed| parsed.directive)
    }

    /// Parse a comment, keeping warnings about malformed options
    pub fn parse_with_warnings(comment: Option<&str>) -> Option<ParsedDirective> {
        let comment = comment?;
        let directive = Self::new(resolve_domains(comment)?)?;
        let mut warnings = Vec::new();

        let queries = token_after(comment, QUERIES_MARKER)
            .map(|raw| {
                parse_queries(raw).unwrap_or_else(|| {
                    warnings.push(ParseWarning::InvalidQueries {
                        value: raw.to_string(),
                        default: DEFAULT_QUERIES,
                    });
                    DEFAULT_QUERIES
                })
            })
            .unwrap_or(DEFAULT_QUERIES);

        let delay = token_after(comment, DELAY_MARKER)
            .map(|raw| {
                parse_delay(raw).unwrap_or_else(|| {
                    warnings.push(ParseWarning::InvalidDelay {
                        value: raw.to_string(),
                        default: DEFAULT_DELAY,
                    });
                    DEFAULT_DELAY
                })
            })
            .unwrap_or(DEFAULT_DELAY);

        let dns_servers = match token_after(comment, DNS_SERVERS_MARKER) {
            None => DnsServers::Unset,
            Some(raw) if raw.eq_ignore_ascii_case(SYSTEM_RESOLVER) => DnsServers::System,
            Some(raw) => {
                let servers = split_csv(raw);
                if servers.is_empty() {
                    warnings.push(ParseWarning::EmptyDnsServers);
                    DnsServers::Unset
                } else {
                    DnsServers::Explicit(servers)
                }
            }
        };

        Some(ParsedDirective {
            directive: directive
                .with_queries(queries)
                .with_delay(delay)
                .with_dns_servers(dns_servers),
            warnings,
        })
    }

    /// Domains in directive order (never empty)
    pub fn domains(&self) -> &[String] {
        &self.domains
    }

    /// First configured domain
    pub fn primary_domain(&self) -> &str {
        &self.domains[0]
    }

    /// Lookups per domain (at least 1)
    pub fn queries(&self) -> u32 {
        self.queries
    }

    /// Pause between consecutive lookups of one domain
    pub fn delay(&self) -> Duration {
        self.delay
    }

    /// Requested name servers
    pub fn dns_servers(&self) -> &DnsServers {
        &self.dns_servers
    }
}

impl fmt::Display for ResolveDirective {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{}{} {}{} {}{}",
            RESOLVE_MARKER,
            self.domains.join(","),
            QUERIES_MARKER,
            self.queries,
            DELAY_MARKER,
            self.delay.as_secs_f64()
        )?;
        match &self.dns_servers {
            DnsServers::Unset => Ok(()),
            DnsServers::System => write!(f, " {}{}", DNS_SERVERS_MARKER, SYSTEM_RESOLVER),
            DnsServers::Explicit(servers) => {
                write!(f, " {}{}", DNS_SERVERS_MARKER, servers.join(","))
            }
        }
    }
}

/// Domains named by whichever resolve form the comment uses
fn resolve_domains(comment: &str) -> Option<Vec<String>> {
    if let Some(raw) = token_after(comment, RESOLVE_MARKER) {
        let domains = split_csv(raw);
        return (!domains.is_empty()).then_some(domains);
    }

    let start = comment.find(LEGACY_RESOLVE_MARKER)? + LEGACY_RESOLVE_MARKER.len();
    let rest = comment[start..].trim_start_matches([' ', '\t']);
    let token = rest.split(char::is_whitespace).next().unwrap_or_default();
    // The legacy form never carried a list.
    let domain = token.split(',').next().unwrap_or_default().trim();

    (!domain.is_empty()).then(|| vec![domain.to_string()])
}

/// Value of the first `marker` token, up to the next whitespace
fn token_after<'a>(comment: &'a str, marker: &str) -> Option<&'a str> {
    let start = comment.find(marker)? + marker.len();
    Some(
        comment[start..]
            .split(char::is_whitespace)
            .next()
            .unwrap_or_default(),
    )
}

fn split_csv(raw: &str) -> Vec<String> {
    raw.split(',')
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .map(str::to_string)
        .collect()
}

fn parse_queries(raw: &str) -> Option<u32> {
    raw.parse::<u32>().ok().filter(|q| *q >= 1)
}

fn parse_delay(raw: &str) -> Option<Duration> {
    let secs = raw.parse::<f64>().ok()?;
    Duration::try_from_secs_f64(secs).ok()
}
