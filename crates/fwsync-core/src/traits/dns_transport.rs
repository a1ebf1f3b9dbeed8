// # DNS Transport Trait
//
// Defines the interface for raw name lookups.
//
// ## Implementations
//
// - Hickory resolver: `fwsync-dns-hickory` crate
// - In-memory recording fake: `fwsync_core::memory::MemoryDnsTransport`
//
// A transport answers exactly one question per call. Retrying, sleeping
// between queries, server fallback and address validation are owned by
// `fwsync_core::resolver::Resolver`.

use async_trait::async_trait;

/// Trait for DNS transport implementations
#[async_trait]
pub trait DnsTransport: Send + Sync {
    /// Look up `domain` with the host's system resolver
    ///
    /// # Returns
    ///
    /// - `Ok(Vec<String>)`: Zero or more address tokens, unvalidated
    /// - `Err(Error)`: If the lookup failed
    async fn resolve_system(&self, domain: &str) -> Result<Vec<String>, crate::Error>;

    /// Look up `domain` by asking `server` directly
    ///
    /// `server` is the string configured by the operator (`"9.9.9.9"` or
    /// `"9.9.9.9:5353"`); implementations report unusable values as errors.
    async fn resolve_with(&self, server: &str, domain: &str)
        -> Result<Vec<String>, crate::Error>;

    /// Whether the system resolver can be used at all
    fn system_available(&self) -> bool {
        true
    }

    /// Get the transport name (for logging/debugging)
    fn transport_name(&self) -> &'static str;
}
