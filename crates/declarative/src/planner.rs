//! Execution planner - orders planned changes into stages
//!
//! Changes that must not run together are split into stages that run one
//! after another; everything within a stage may run in parallel. Creates and
//! updates are staged by kind (see [`crate::ManagedResource::STAGE`]) and then
//! by reference depth within a kind, so a parent exists before its children.
//! Deletions run first, in the reverse order.

use crate::diff::{DiffSummary, ResourceDiff};
use crate::types::Action;
use std::collections::{BTreeMap, HashMap};

/// A group of changes that may run in parallel
#[derive(Debug, Clone)]
pub struct Stage {
    pub label: String,
    pub diffs: Vec<ResourceDiff>,
}

impl Stage {
    fn new(diffs: Vec<ResourceDiff>, deleting: bool) -> Self {
        let mut types: Vec<&str> = diffs.iter().map(|d| d.resource_type.as_str()).collect();
        types.dedup();
        let verb = if deleting { "destroy" } else { "apply" };
        let label = format!("{verb} {}", types.join(", "));
        Self { label, diffs }
    }
}

/// An execution plan: stages in the order they must run
#[derive(Debug, Clone, Default)]
pub struct ExecutionPlan {
    pub stages: Vec<Stage>,
    /// Declarations that need no change
    pub unchanged: usize,
}

impl ExecutionPlan {
    /// Create a new empty plan
    pub fn new() -> Self {
        Self::default()
    }

    /// Stage a set of planned changes
    pub fn from_diffs(diffs: impl IntoIterator<Item = ResourceDiff>) -> Self {
        let mut unchanged = 0;
        let mut applies = Vec::new();
        let mut deletes = Vec::new();
        for diff in diffs {
            match diff.action {
                Action::NoOp => unchanged += 1,
                Action::Delete => deletes.push(diff),
                Action::Create | Action::Update | Action::Replace => applies.push(diff),
            }
        }

        let mut stages = group(deletes, true);
        stages.extend(group(applies, false));
        Self { stages, unchanged }
    }

    /// All staged changes, in execution order
    pub fn diffs(&self) -> impl Iterator<Item = &ResourceDiff> {
        self.stages.iter().flat_map(|s| s.diffs.iter())
    }

    /// Filter plan to only include changes matching a predicate
    pub fn filter<F>(self, predicate: F) -> Self
    where
        F: Fn(&ResourceDiff) -> bool,
    {
        let stages = self
            .stages
            .into_iter()
            .filter_map(|stage| {
                let diffs: Vec<ResourceDiff> =
                    stage.diffs.into_iter().filter(|d| predicate(d)).collect();
                (!diffs.is_empty()).then_some(Stage {
                    label: stage.label,
                    diffs,
                })
            })
            .collect();
        Self {
            stages,
            unchanged: self.unchanged,
        }
    }

    /// Filter plan to only include changes matching a target pattern
    ///
    /// Target format: "type" or "type.name"
    pub fn filter_by_target(self, target: Option<&str>) -> Self {
        match target {
            None => self,
            Some(t) => {
                let (resource_type, name) = parse_target(t);
                self.filter(|d| matches_filter(d, resource_type.as_deref(), name.as_deref()))
            }
        }
    }

    /// Total number of changes in the plan
    pub fn total_resources(&self) -> usize {
        self.stages.iter().map(|s| s.diffs.len()).sum()
    }

    /// Check if plan is empty
    pub fn is_empty(&self) -> bool {
        self.stages.is_empty()
    }

    pub fn summary(&self) -> DiffSummary {
        DiffSummary::from_diffs(self.diffs())
    }
}

fn group(diffs: Vec<ResourceDiff>, deleting: bool) -> Vec<Stage> {
    let depths = depths(&diffs);
    let mut buckets: BTreeMap<(u32, usize), Vec<ResourceDiff>> = BTreeMap::new();
    for (diff, depth) in diffs.into_iter().zip(depths) {
        buckets.entry((diff.stage, depth)).or_default().push(diff);
    }
    let mut stages: Vec<Stage> = buckets
        .into_values()
        .map(|diffs| Stage::new(diffs, deleting))
        .collect();
    if deleting {
        stages.reverse();
    }
    stages
}

/// Reference depth of every diff among diffs of its own kind.
fn depths(diffs: &[ResourceDiff]) -> Vec<usize> {
    let index: HashMap<(&str, &str), usize> = diffs
        .iter()
        .enumerate()
        .filter_map(|(i, d)| d.id.as_deref().map(|id| ((d.resource_type.as_str(), id), i)))
        .collect();
    let mut memo = vec![None; diffs.len()];
    (0..diffs.len())
        .map(|i| depth_of(i, diffs, &index, &mut memo, 0))
        .collect()
}

fn depth_of(
    i: usize,
    diffs: &[ResourceDiff],
    index: &HashMap<(&str, &str), usize>,
    memo: &mut [Option<usize>],
    hops: usize,
) -> usize {
    if let Some(depth) = memo[i] {
        return depth;
    }
    // A reference cycle; the remote system rejects it, so any order will do.
    if hops > diffs.len() {
        return 0;
    }
    let diff = &diffs[i];
    let depth = diff
        .references
        .iter()
        .filter_map(|r| index.get(&(diff.resource_type.as_str(), r.as_str())))
        .filter(|&&j| j != i)
        .map(|&j| depth_of(j, diffs, index, memo, hops + 1) + 1)
        .max()
        .unwrap_or(0);
    memo[i] = Some(depth);
    depth
}

/// Split an address `type.name` into its parts.
pub fn split_address(address: &str) -> Option<(&str, &str)> {
    address
        .split_once('.')
        .filter(|(t, n)| !t.is_empty() && !n.is_empty())
}

/// Parse a target string like "type.name" into (type, name)
fn parse_target(target: &str) -> (Option<String>, Option<String>) {
    let parts: Vec<&str> = target.split('.').collect();
    match parts.len() {
        1 => (Some(parts[0].to_string()), None),
        2 => (Some(parts[0].to_string()), Some(parts[1].to_string())),
        _ => (None, Some(target.to_string())),
    }
}

/// Check if a change matches the filter criteria
fn matches_filter(diff: &ResourceDiff, resource_type: Option<&str>, name: Option<&str>) -> bool {
    if let Some(rt) = resource_type {
        // "device", "devices" and "iotcentral_device" all select iotcentral_device
        let singular = rt.strip_suffix('s').unwrap_or(rt);
        let actual = diff.resource_type.as_str();
        let matches_type = [rt, singular]
            .iter()
            .any(|t| actual == *t || actual.ends_with(&format!("_{t}")));
        if !matches_type {
            return false;
        }
    }

    if let Some(n) = name
        && diff.name() != n
    {
        return false;
    }

    true
}
