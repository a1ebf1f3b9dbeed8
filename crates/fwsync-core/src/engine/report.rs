//! Per-run outcome reporting

use chrono::{DateTime, Utc};
use std::fmt;

use crate::reconcile::ReconciliationPlan;
use crate::traits::ObjectType;

/// What happened to one object during a run
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ObjectOutcome {
    /// The comment carries no resolve directive
    Unmanaged,

    /// DNS produced nothing relevant; the object was left untouched
    Unresolved,

    /// Current entries already match DNS
    UpToDate,

    /// Dry run: the plan was computed and logged, nothing was applied
    Planned(ReconciliationPlan),

    /// The plan was applied; `failed` counts control plane calls that failed
    Applied {
        /// The applied plan
        plan: ReconciliationPlan,
        /// Number of failed mutating calls
        failed: usize,
    },

    /// The object could not be processed (e.g. entries could not be fetched)
    Failed {
        /// Error message
        error: String,
    },
}

impl ObjectOutcome {
    /// Whether the object carries a resolve directive
    pub fn is_managed(&self) -> bool {
        !matches!(self, ObjectOutcome::Unmanaged)
    }

    /// Short name for log lines
    pub fn label(&self) -> &'static str {
        match self {
            ObjectOutcome::Unmanaged => "unmanaged",
            ObjectOutcome::Unresolved => "unresolved",
            ObjectOutcome::UpToDate => "up-to-date",
            ObjectOutcome::Planned(_) => "planned",
            ObjectOutcome::Applied { failed: 0, .. } => "applied",
            ObjectOutcome::Applied { .. } => "partially-applied",
            ObjectOutcome::Failed { .. } => "failed",
        }
    }

    /// Whether a non-empty plan was computed for the object
    pub fn has_changes(&self) -> bool {
        matches!(
            self,
            ObjectOutcome::Planned(_) | ObjectOutcome::Applied { .. }
        )
    }
}

/// One processed object
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ObjectReport {
    /// Object name
    pub name: String,
    /// Object kind
    pub kind: ObjectType,
    /// Outcome
    pub outcome: ObjectOutcome,
}

/// Summary of one sync run
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RunReport {
    /// When the run started
    pub started_at: DateTime<Utc>,
    /// When the run finished
    pub finished_at: DateTime<Utc>,
    /// Whether the run was a dry run
    pub dry_run: bool,
    /// Processed objects, in processing order
    pub objects: Vec<ObjectReport>,
}

impl RunReport {
    pub(crate) fn start(dry_run: bool) -> Self {
        let now = Utc::now();
        Self {
            started_at: now,
            finished_at: now,
            dry_run,
            objects: Vec::new(),
        }
    }

    pub(crate) fn record(&mut self, name: &str, kind: ObjectType, outcome: ObjectOutcome) {
        self.objects.push(ObjectReport {
            name: name.to_string(),
            kind,
            outcome,
        });
    }

    pub(crate) fn finish(mut self) -> Self {
        self.finished_at = Utc::now();
        self
    }

    /// Outcome of a named object, if it was processed
    pub fn outcome(&self, kind: ObjectType, name: &str) -> Option<&ObjectOutcome> {
        self.objects
            .iter()
            .find(|o| o.kind == kind && o.name == name)
            .map(|o| &o.outcome)
    }

    /// Number of objects carrying a resolve directive
    pub fn managed(&self) -> usize {
        self.objects.iter().filter(|o| o.outcome.is_managed()).count()
    }

    /// Number of objects with a non-empty plan
    pub fn changed(&self) -> usize {
        self.objects
            .iter()
            .filter(|o| o.outcome.has_changes())
            .count()
    }

    /// Number of objects left untouched because DNS produced nothing
    pub fn unresolved(&self) -> usize {
        self.objects
            .iter()
            .filter(|o| o.outcome == ObjectOutcome::Unresolved)
            .count()
    }

    /// Failed control plane operations, including failed objects
    pub fn failures(&self) -> usize {
        self.objects
            .iter()
            .map(|o| match &o.outcome {
                ObjectOutcome::Applied { failed, .. } => *failed,
                ObjectOutcome::Failed { .. } => 1,
                _ => 0,
            })
            .sum()
    }

    /// Wall-clock duration of the run
    pub fn duration(&self) -> chrono::Duration {
        self.finished_at - self.started_at
    }
}

impl fmt::Display for RunReport {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{} objects, {} managed, {} {}, {} unresolved, {} failures",
            self.objects.len(),
            self.managed(),
            self.changed(),
            if self.dry_run { "with pending changes" } else { "changed" },
            self.unresolved(),
            self.failures(),
        )
    }
}
