// # Memory DNS Transport
//
// Deterministic in-memory implementation of DnsTransport.
//
// ## Purpose
//
// Answers lookups from tables set up by the caller and records every lookup
// (which server, which domain, when) so tests can assert on server order
// and on the spacing between queries.
//
// ## Answers
//
// - Static: `set_system_answer` / `set_server_answer` answer every lookup the same
// - Scripted: `script_system_answers` answers successive lookups in turn; the last
//   answer repeats once the script is exhausted
// - Unknown domains and failing servers produce `Error::Dns`

use std::collections::{HashMap, HashSet, VecDeque};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use async_trait::async_trait;
use tokio::time::Instant;

use crate::Error;
use crate::traits::DnsTransport;

/// One recorded lookup
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DnsLookup {
    /// Server asked, `None` for the system resolver
    pub server: Option<String>,
    /// Domain looked up
    pub domain: String,
    /// When the lookup happened (tokio clock, so paused-time tests see exact offsets)
    pub at: Instant,
}

#[derive(Debug, Default)]
struct DnsState {
    system: HashMap<String, VecDeque<Vec<String>>>,
    servers: HashMap<(String, String), VecDeque<Vec<String>>>,
    failing_servers: HashSet<String>,
    system_unavailable: bool,
    lookups: Vec<DnsLookup>,
}

/// In-memory DNS transport
///
/// Clones share state, so a test can hand one clone to the engine and
/// inspect the recorded lookups through another.
///
/// # Example
///
/// ```rust
/// use fwsync_core::memory::MemoryDnsTransport;
/// use fwsync_core::traits::DnsTransport;
///
/// #[tokio::main]
/// async fn main() -> Result<(), Box<dyn std::error::Error>> {
///     let dns = MemoryDnsTransport::new();
///     dns.set_system_answer("example.com", &["192.0.2.10"]);
///
///     let answer = dns.resolve_system("example.com").await?;
///     assert_eq!(answer, vec!["192.0.2.10".to_string()]);
///     assert_eq!(dns.lookups().len(), 1);
///
///     Ok(())
/// }
/// ```
#[derive(Debug, Clone, Default)]
pub struct MemoryDnsTransport {
    inner: Arc<Mutex<DnsState>>,
}

impl MemoryDnsTransport {
    /// Create an empty transport (every lookup fails)
    pub fn new() -> Self {
        Self::default()
    }

    /// Answer every system lookup of `domain` with `addresses`
    pub fn set_system_answer(&self, domain: &str, addresses: &[&str]) {
        self.state()
            .system
            .insert(domain.to_string(), VecDeque::from([to_owned(addresses)]));
    }

    /// Answer successive system lookups of `domain` with `answers` in turn
    pub fn script_system_answers(&self, domain: &str, answers: &[&[&str]]) {
        let script = answers.iter().map(|a| to_owned(a)).collect();
        self.state().system.insert(domain.to_string(), script);
    }

    /// Answer every lookup of `domain` sent to `server` with `addresses`
    pub fn set_server_answer(&self, server: &str, domain: &str, addresses: &[&str]) {
        self.state().servers.insert(
            (server.to_string(), domain.to_string()),
            VecDeque::from([to_owned(addresses)]),
        );
    }

    /// Make every lookup sent to `server` fail
    pub fn fail_server(&self, server: &str) {
        self.state().failing_servers.insert(server.to_string());
    }

    /// Toggle availability of the system resolver
    pub fn set_system_available(&self, available: bool) {
        self.state().system_unavailable = !available;
    }

    /// All lookups performed so far, in order
    pub fn lookups(&self) -> Vec<DnsLookup> {
        self.state().lookups.clone()
    }

    /// Number of lookups of `domain`, across all servers
    pub fn lookup_count(&self, domain: &str) -> usize {
        self.state()
            .lookups
            .iter()
            .filter(|l| l.domain == domain)
            .count()
    }

    fn state(&self) -> MutexGuard<'_, DnsState> {
        self.inner.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

#[async_trait]
impl DnsTransport for MemoryDnsTransport {
    async fn resolve_system(&self, domain: &str) -> Result<Vec<String>, Error> {
        let mut state = self.state();
        state.lookups.push(DnsLookup {
            server: None,
            domain: domain.to_string(),
            at: Instant::now(),
        });

        if state.system_unavailable {
            return Err(Error::dns(domain, "system", "system resolver unavailable"));
        }

        state
            .system
            .get_mut(domain)
            .map(next_answer)
            .ok_or_else(|| Error::dns(domain, "system", "no such domain"))
    }

    async fn resolve_with(&self, server: &str, domain: &str) -> Result<Vec<String>, Error> {
        let mut state = self.state();
        state.lookups.push(DnsLookup {
            server: Some(server.to_string()),
            domain: domain.to_string(),
            at: Instant::now(),
        });

        if state.failing_servers.contains(server) {
            return Err(Error::dns(domain, server, "server unreachable"));
        }

        state
            .servers
            .get_mut(&(server.to_string(), domain.to_string()))
            .map(next_answer)
            .ok_or_else(|| Error::dns(domain, server, "no such domain"))
    }

    fn system_available(&self) -> bool {
        !self.state().system_unavailable
    }

    fn transport_name(&self) -> &'static str {
        "memory"
    }
}

/// Pop the next scripted answer, repeating the last one
fn next_answer(script: &mut VecDeque<Vec<String>>) -> Vec<String> {
    if script.len() > 1 {
        script.pop_front().unwrap_or_default()
    } else {
        script.front().cloned().unwrap_or_default()
    }
}

fn to_owned(addresses: &[&str]) -> Vec<String> {
    addresses.iter().map(|a| a.to_string()).collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_scripted_answers_repeat_last() {
        let dns = MemoryDnsTransport::new();
        dns.script_system_answers("a.com", &[&["10.0.0.1"], &["10.0.0.2"]]);

        assert_eq!(dns.resolve_system("a.com").await.unwrap(), ["10.0.0.1"]);
        assert_eq!(dns.resolve_system("a.com").await.unwrap(), ["10.0.0.2"]);
        assert_eq!(dns.resolve_system("a.com").await.unwrap(), ["10.0.0.2"]);
        assert_eq!(dns.lookup_count("a.com"), 3);
    }

    #[tokio::test]
    async fn test_unknown_domain_fails() {
        let dns = MemoryDnsTransport::new();
        assert!(dns.resolve_system("missing.example.com").await.is_err());
        assert!(dns.resolve_with("9.9.9.9", "missing.example.com").await.is_err());
    }

    #[tokio::test]
    async fn test_failing_server_is_recorded() {
        let dns = MemoryDnsTransport::new();
        dns.set_server_answer("9.9.9.9", "a.com", &["10.0.0.1"]);
        dns.fail_server("9.9.9.9");

        assert!(dns.resolve_with("9.9.9.9", "a.com").await.is_err());
        assert_eq!(dns.lookups()[0].server.as_deref(), Some("9.9.9.9"));
    }

    #[tokio::test]
    async fn test_clones_share_state() {
        let dns = MemoryDnsTransport::new();
        let handle = dns.clone();
        dns.set_system_answer("a.com", &["10.0.0.1"]);

        handle.resolve_system("a.com").await.unwrap();
        assert_eq!(dns.lookups().len(), 1);
    }
}
