//! Minimal add/remove diff between current and desired entries

use std::collections::HashSet;
use std::fmt;

/// Immutable diff for one object
///
/// `to_add` is `desired - current` in desired order, `to_remove` is
/// `current - desired` in current order. Applying both to `current`
/// yields exactly `desired` (as a set).
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct ReconciliationPlan {
    to_add: Vec<String>,
    to_remove: Vec<String>,
}

impl ReconciliationPlan {
    /// Compute the plan turning `current` into `desired`
    ///
    /// Pure; duplicate inputs are collapsed to their first occurrence.
    pub fn compute(current: &[String], desired: &[String]) -> Self {
        let current_set: HashSet<&str> = current.iter().map(String::as_str).collect();
        let desired_set: HashSet<&str> = desired.iter().map(String::as_str).collect();

        Self {
            to_add: difference(desired, &current_set),
            to_remove: difference(current, &desired_set),
        }
    }

    /// Entries to add, in desired order
    pub fn to_add(&self) -> &[String] {
        &self.to_add
    }

    /// Entries to remove, in current order
    pub fn to_remove(&self) -> &[String] {
        &self.to_remove
    }

    /// Whether current already matches desired
    pub fn is_empty(&self) -> bool {
        self.to_add.is_empty() && self.to_remove.is_empty()
    }

    /// Apply the plan to an entry list: additions appended, removals dropped
    pub fn apply_to(&self, current: &[String]) -> Vec<String> {
        let removed: HashSet<&str> = self.to_remove.iter().map(String::as_str).collect();
        let mut result: Vec<String> = current
            .iter()
            .filter(|entry| !removed.contains(entry.as_str()))
            .cloned()
            .collect();
        for entry in &self.to_add {
            if !result.contains(entry) {
                result.push(entry.clone());
            }
        }
        result
    }
}

impl fmt::Display for ReconciliationPlan {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "+[{}] -[{}]",
            self.to_add.join(", "),
            self.to_remove.join(", ")
        )
    }
}

/// Items of `items` absent from `exclude`, first occurrence only
fn difference(items: &[String], exclude: &HashSet<&str>) -> Vec<String> {
    let mut seen = HashSet::new();
    items
        .iter()
        .filter(|item| !exclude.contains(item.as_str()) && seen.insert(item.as_str()))
        .cloned()
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn set(items: &[&str]) -> Vec<String> {
        items.iter().map(|s| s.to_string()).collect()
    }

    fn same_set(a: &[String], b: &[String]) -> bool {
        let a: HashSet<&String> = a.iter().collect();
        let b: HashSet<&String> = b.iter().collect();
        a == b
    }

    #[test]
    fn test_add_and_remove_orders() {
        let plan = ReconciliationPlan::compute(
            &set(&["10.0.0.3", "10.0.0.1", "10.0.0.4"]),
            &set(&["10.0.0.9", "10.0.0.1", "10.0.0.8"]),
        );
        assert_eq!(plan.to_add(), ["10.0.0.9", "10.0.0.8"]);
        assert_eq!(plan.to_remove(), ["10.0.0.3", "10.0.0.4"]);
        assert!(!plan.is_empty());
    }

    #[test]
    fn test_equal_sets_give_empty_plan() {
        let plan = ReconciliationPlan::compute(
            &set(&["10.0.0.1", "10.0.0.2"]),
            &set(&["10.0.0.2", "10.0.0.1"]),
        );
        assert!(plan.is_empty());
        assert_eq!(plan, ReconciliationPlan::default());
    }

    #[test]
    fn test_duplicates_collapse() {
        let plan = ReconciliationPlan::compute(
            &set(&["10.0.0.5", "10.0.0.5"]),
            &set(&["10.0.0.1", "10.0.0.1"]),
        );
        assert_eq!(plan.to_add(), ["10.0.0.1"]);
        assert_eq!(plan.to_remove(), ["10.0.0.5"]);
    }

    #[test]
    fn test_round_trip_law() {
        let cases: &[(&[&str], &[&str])] = &[
            (&[], &[]),
            (&[], &["10.0.0.1"]),
            (&["10.0.0.1"], &[]),
            (&["10.0.0.1", "10.0.0.2"], &["10.0.0.2", "10.0.0.3"]),
            (&["10.0.0.1", "10.0.0.2", "10.0.0.3"], &["10.0.0.3", "10.0.0.2", "10.0.0.1"]),
            (&["10.0.0.1"], &["10.0.0.7", "10.0.0.8", "10.0.0.9"]),
            (&["10.0.0.0/24", "10.0.0.1"], &["10.0.0.1"]),
        ];

        for (current, desired) in cases {
            let current = set(current);
            let desired = set(desired);
            let plan = ReconciliationPlan::compute(&current, &desired);
            let applied = plan.apply_to(&current);
            assert!(
                same_set(&applied, &desired),
                "current={current:?} desired={desired:?} applied={applied:?}"
            );
            assert_eq!(plan.is_empty(), same_set(&current, &desired));
        }
    }

    #[test]
    fn test_display() {
        let plan = ReconciliationPlan::compute(&set(&["10.0.0.1"]), &set(&["10.0.0.2"]));
        assert_eq!(plan.to_string(), "+[10.0.0.2] -[10.0.0.1]");
    }
}
