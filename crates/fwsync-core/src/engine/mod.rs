//! Sync engine
//!
//! The SyncEngine is responsible for:
//! - Listing firewall objects of the selected kinds
//! - Parsing the resolve directive in each object's comment
//! - Resolving the directive's domains
//! - Planning and applying the minimal entry changes
//!
//! ## Flow
//!
//! ```text
//! ┌──────────────┐   objects   ┌────────────┐  directive  ┌──────────┐
//! │ ControlPlane │────────────▶│ SyncEngine │────────────▶│ Resolver │
//! └──────────────┘             └────────────┘             └──────────┘
//!        ▲                           │                          │
//!        │      add/remove/set       │◀──── ResolvedAddresses ──┘
//!        └───────────────────────────┤
//!                                    ▼
//!                        policy::plan → ReconciliationPlan
//! ```
//!
//! Objects are processed strictly one after another, in listing order, with
//! IPSets before aliases. Failing to list objects aborts the run after
//! logging what was done so far; any other failure is logged and only
//! affects the call or object it happened on.
//!
//! `verbose` only adds a per-object outcome line at the end of the run.

mod report;

pub use report::{ObjectOutcome, ObjectReport, RunReport};

use crate::config::RunConfig;
use crate::directive::ResolveDirective;
use crate::error::Result;
use crate::policy;
use crate::reconcile::ReconciliationPlan;
use crate::resolver::{ResolvedAddresses, Resolver};
use crate::traits::{ControlPlane, DnsTransport, FirewallObject, ObjectType};
use tracing::{debug, error, info, warn};

/// Core sync engine
///
/// One call to [`SyncEngine::run()`] is one complete, stateless pass over
/// the firewall configuration. Nothing is remembered between runs.
pub struct SyncEngine {
    /// Firewall control plane
    plane: Box<dyn ControlPlane>,

    /// Directive resolver over the DNS transport
    resolver: Resolver,

    /// Run configuration
    config: RunConfig,
}

impl SyncEngine {
    /// Create a new sync engine
    ///
    /// # Parameters
    ///
    /// - `plane`: Control plane to read and mutate firewall objects
    /// - `transport`: DNS transport used by the resolver
    /// - `config`: Run configuration
    ///
    /// # Errors
    ///
    /// Returns `Error::Config` if the configuration is invalid.
    pub fn new(
        plane: Box<dyn ControlPlane>,
        transport: Box<dyn DnsTransport>,
        config: RunConfig,
    ) -> Result<Self> {
        config.validate()?;

        Ok(Self {
            plane,
            resolver: Resolver::new(transport),
            config,
        })
    }

    /// The run configuration
    pub fn config(&self) -> &RunConfig {
        &self.config
    }

    /// Run one sync pass
    ///
    /// # Errors
    ///
    /// Only a failed object listing is returned as an error.
    pub async fn run(&self) -> Result<RunReport> {
        info!(
            backend = self.plane.backend_name(),
            transport = self.resolver.transport().transport_name(),
            selection = ?self.config.selection,
            dry_run = self.config.dry_run,
            "Starting sync run"
        );

        let mut report = RunReport::start(self.config.dry_run);

        for &kind in self.config.selection.types() {
            let objects = match self.plane.list_objects(kind).await {
                Ok(objects) => objects,
                Err(e) => {
                    let partial = report.finish();
                    self.log_outcomes(&partial);
                    error!(
                        %kind,
                        error = %e,
                        completed = %partial,
                        "Failed to list objects, aborting run"
                    );
                    return Err(e);
                }
            };
            debug!(%kind, count = objects.len(), "Listed objects");

            for object in objects {
                let outcome = self.process_object(&object).await;
                report.record(&object.name, kind, outcome);
            }
        }

        let report = report.finish();
        self.log_outcomes(&report);
        info!(
            summary = %report,
            duration_ms = report.duration().num_milliseconds(),
            "Sync run finished"
        );
        Ok(report)
    }

    /// Parse, resolve, plan and apply one object
    async fn process_object(&self, object: &FirewallObject) -> ObjectOutcome {
        let name = object.name.as_str();
        let kind = object.kind;

        let Some(parsed) = ResolveDirective::parse_with_warnings(object.comment.as_deref()) else {
            debug!(object = name, %kind, "No resolve directive, skipping");
            return ObjectOutcome::Unmanaged;
        };
        for warning in &parsed.warnings {
            warn!(object = name, %kind, %warning, "Malformed directive option");
        }
        let directive = parsed.directive;
        debug!(object = name, %kind, %directive, "Managed object");

        let resolved = self
            .resolver
            .resolve_domains(
                &directive,
                policy::lookup_domains(kind, &directive),
                &self.config.default_dns_servers,
            )
            .await;
        if relevant_addresses(kind, &resolved).is_empty() {
            warn!(
                object = name,
                %kind,
                domain = directive.primary_domain(),
                "DNS returned no usable address, leaving object untouched"
            );
            return ObjectOutcome::Unresolved;
        }

        let entries = match self.plane.get_entries(object).await {
            Ok(entries) => entries,
            Err(e) => {
                error!(object = name, %kind, error = %e, "Failed to fetch current entries");
                return ObjectOutcome::Failed {
                    error: e.to_string(),
                };
            }
        };
        let object = object.clone().with_entries(entries);

        if kind == ObjectType::Ipset {
            for preserved in object
                .entries
                .iter()
                .filter(|entry| policy::is_preserved_reference(entry))
            {
                debug!(object = name, %kind, entry = %preserved, "Keeping preserved reference");
            }
        }
        let plan = policy::plan(&object, &resolved);

        if plan.is_empty() {
            debug!(object = name, %kind, entries = ?object.entries, "Up to date");
            return ObjectOutcome::UpToDate;
        }

        self.log_plan(&object, &plan);

        if self.config.dry_run {
            info!(object = name, %kind, %plan, "dry-run: skipping changes");
            return ObjectOutcome::Planned(plan);
        }

        let failed = match kind {
            ObjectType::Ipset => self.apply_ipset(&object, &plan).await,
            ObjectType::Alias => self.apply_alias(&object, &plan).await,
        };
        ObjectOutcome::Applied { plan, failed }
    }

    /// One line per processed object, in verbose mode only
    fn log_outcomes(&self, report: &RunReport) {
        if !self.config.verbose {
            return;
        }
        for object in &report.objects {
            info!(
                object = %object.name,
                kind = %object.kind,
                outcome = object.outcome.label(),
                "Object result"
            );
        }
    }

    fn log_plan(&self, object: &FirewallObject, plan: &ReconciliationPlan) {
        let name = object.name.as_str();
        let kind = object.kind;
        match kind {
            ObjectType::Ipset => {
                for address in plan.to_remove() {
                    info!(object = name, %kind, %address, "Planned removal");
                }
                for address in plan.to_add() {
                    info!(object = name, %kind, %address, "Planned addition");
                }
            }
            ObjectType::Alias => {
                info!(
                    object = name,
                    %kind,
                    from = ?plan.to_remove().first(),
                    to = ?plan.to_add().first(),
                    "Planned rewrite"
                );
            }
        }
    }

    /// Removals first, then additions; returns the number of failed calls
    async fn apply_ipset(&self, object: &FirewallObject, plan: &ReconciliationPlan) -> usize {
        let name = object.name.as_str();
        let mut failed = 0;

        for address in plan.to_remove() {
            match self.plane.remove_entry(object, address).await {
                Ok(()) => info!(object = name, %address, "Removed entry"),
                Err(e) => {
                    error!(object = name, %address, error = %e, "Failed to remove entry");
                    failed += 1;
                }
            }
        }

        for address in plan.to_add() {
            match self.plane.add_entry(object, address).await {
                Ok(()) => info!(object = name, %address, "Added entry"),
                Err(e) => {
                    error!(object = name, %address, error = %e, "Failed to add entry");
                    failed += 1;
                }
            }
        }

        failed
    }

    /// One rewrite carrying the new value
    async fn apply_alias(&self, object: &FirewallObject, plan: &ReconciliationPlan) -> usize {
        let name = object.name.as_str();
        let Some(address) = plan.to_add().first() else {
            return 0;
        };

        match self.plane.set_alias_value(object, address).await {
            Ok(()) => {
                info!(object = name, %address, "Rewrote alias");
                0
            }
            Err(e) => {
                error!(object = name, %address, error = %e, "Failed to rewrite alias");
                1
            }
        }
    }
}

/// The part of a resolution an object kind actually uses
fn relevant_addresses(kind: ObjectType, resolved: &ResolvedAddresses) -> &[String] {
    match kind {
        ObjectType::Ipset => resolved.aggregate(),
        ObjectType::Alias => resolved.primary(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::ObjectSelection;
    use crate::memory::{ControlPlaneCall, MemoryControlPlane, MemoryDnsTransport};

    fn engine(plane: &MemoryControlPlane, dns: &MemoryDnsTransport, config: RunConfig) -> SyncEngine {
        SyncEngine::new(Box::new(plane.clone()), Box::new(dns.clone()), config).unwrap()
    }

    #[test]
    fn test_new_rejects_invalid_config() {
        let result = SyncEngine::new(
            Box::new(MemoryControlPlane::new()),
            Box::new(MemoryDnsTransport::new()),
            RunConfig::new().with_default_dns_servers(["not-an-ip"]),
        );
        assert!(result.is_err());
    }

    #[tokio::test]
    async fn test_unmanaged_objects_are_not_fetched() {
        let plane = MemoryControlPlane::with_objects([FirewallObject::ipset(
            "static",
            Some("office network"),
            ["10.0.0.1"],
        )]);
        let dns = MemoryDnsTransport::new();

        let report = engine(&plane, &dns, RunConfig::new()).run().await.unwrap();

        assert_eq!(
            report.outcome(ObjectType::Ipset, "static"),
            Some(&ObjectOutcome::Unmanaged)
        );
        assert_eq!(
            plane.calls(),
            [
                ControlPlaneCall::ListObjects(ObjectType::Ipset),
                ControlPlaneCall::ListObjects(ObjectType::Alias),
            ]
        );
        assert!(dns.lookups().is_empty());
    }

    #[tokio::test]
    async fn test_ipset_removes_before_adding() {
        let plane = MemoryControlPlane::with_objects([FirewallObject::ipset(
            "web",
            Some("#resolve=web.example.com"),
            ["10.0.0.1", "10.0.0.2"],
        )]);
        let dns = MemoryDnsTransport::new();
        dns.set_system_answer("web.example.com", &["10.0.0.2", "10.0.0.3"]);

        engine(&plane, &dns, RunConfig::new()).run().await.unwrap();

        assert_eq!(
            plane.mutations(),
            [
                ControlPlaneCall::RemoveEntry {
                    object: "web".to_string(),
                    address: "10.0.0.1".to_string()
                },
                ControlPlaneCall::AddEntry {
                    object: "web".to_string(),
                    address: "10.0.0.3".to_string()
                },
            ]
        );
        assert_eq!(plane.entries(ObjectType::Ipset, "web"), ["10.0.0.2", "10.0.0.3"]);
    }

    #[tokio::test]
    async fn test_unresolved_object_left_untouched() {
        let plane = MemoryControlPlane::with_objects([
            FirewallObject::ipset("web", Some("#resolve=gone.example.com"), ["10.0.0.1"]),
            FirewallObject::alias("gw", Some("#resolve=gone.example.com"), "10.0.0.254"),
        ]);
        let dns = MemoryDnsTransport::new();
        dns.set_system_answer("gone.example.com", &[]);

        let report = engine(&plane, &dns, RunConfig::new()).run().await.unwrap();

        assert_eq!(report.unresolved(), 2);
        assert_eq!(plane.mutation_count(), 0);
        assert_eq!(plane.entries(ObjectType::Ipset, "web"), ["10.0.0.1"]);
        assert_eq!(plane.entries(ObjectType::Alias, "gw"), ["10.0.0.254"]);
    }

    #[tokio::test]
    async fn test_selection_limits_listed_kinds() {
        let plane = MemoryControlPlane::new();
        let dns = MemoryDnsTransport::new();
        let config = RunConfig::new().with_selection(ObjectSelection::Aliases);

        engine(&plane, &dns, config).run().await.unwrap();

        assert_eq!(plane.calls(), [ControlPlaneCall::ListObjects(ObjectType::Alias)]);
    }

    #[tokio::test]
    async fn test_verbose_only_changes_logging() {
        let objects = || {
            [
                FirewallObject::ipset("web", Some("#resolve=web.example.com"), ["10.0.0.1"]),
                FirewallObject::alias("gw", Some("#resolve=gw.example.com"), "10.0.0.254"),
                FirewallObject::ipset("static", None, ["10.9.9.9"]),
            ]
        };
        let dns = MemoryDnsTransport::new();
        dns.set_system_answer("web.example.com", &["10.0.0.2"]);
        dns.set_system_answer("gw.example.com", &["10.0.0.1"]);

        let quiet = MemoryControlPlane::with_objects(objects());
        let loud = MemoryControlPlane::with_objects(objects());
        let quiet_report = engine(&quiet, &dns, RunConfig::new()).run().await.unwrap();
        let loud_report = engine(&loud, &dns, RunConfig::new().with_verbose(true))
            .run()
            .await
            .unwrap();

        assert_eq!(quiet_report.objects, loud_report.objects);
        assert_eq!(quiet.mutations(), loud.mutations());
    }

    #[tokio::test]
    async fn test_dry_run_plan_matches_policy() {
        let web = FirewallObject::ipset(
            "web",
            Some("#resolve=a.example.com,b.example.com"),
            ["dc/office", "10.0.0.1", "10.0.0.2"],
        );
        let plane = MemoryControlPlane::with_objects([web.clone()]);
        let dns = MemoryDnsTransport::new();
        dns.set_system_answer("a.example.com", &["10.0.0.2"]);
        dns.set_system_answer("b.example.com", &["10.0.0.3"]);

        let report = engine(&plane, &dns, RunConfig::new().with_dry_run(true))
            .run()
            .await
            .unwrap();

        let directive = ResolveDirective::parse(web.comment.as_deref()).unwrap();
        let resolved = Resolver::new(Box::new(dns.clone()))
            .resolve(&directive, &[])
            .await;
        let expected = policy::plan(&web, &resolved);

        assert_eq!(expected.to_remove(), ["10.0.0.1"]);
        assert_eq!(expected.to_add(), ["10.0.0.3"]);
        assert_eq!(
            report.outcome(ObjectType::Ipset, "web"),
            Some(&ObjectOutcome::Planned(expected))
        );
    }

    #[tokio::test]
    async fn test_alias_rewritten_with_single_call() {
        let plane = MemoryControlPlane::with_objects([FirewallObject::alias(
            "gw",
            Some("#resolve=gw.example.com"),
            "10.0.0.254",
        )]);
        let dns = MemoryDnsTransport::new();
        dns.set_system_answer("gw.example.com", &["10.0.0.1"]);

        let report = engine(&plane, &dns, RunConfig::new()).run().await.unwrap();

        assert_eq!(
            plane.mutations(),
            [ControlPlaneCall::SetAliasValue {
                object: "gw".to_string(),
                address: "10.0.0.1".to_string()
            }]
        );
        assert!(matches!(
            report.outcome(ObjectType::Alias, "gw"),
            Some(ObjectOutcome::Applied { failed: 0, .. })
        ));
    }
}
