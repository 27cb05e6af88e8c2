//! Diff computation for resources
//!
//! Compares a declaration with the prior canonical state of the same
//! address and decides what reconciliation has to do. Computed attributes the
//! operator left unset are either carried forward from the prior state or
//! marked unknown until the remote system answers.

use crate::schema::{Diagnostic, Schema};
use crate::types::Action;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use std::collections::{BTreeSet, HashMap};

/// One attribute whose value changes.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AttributeChange {
    pub name: String,
    pub before: Value,
    /// `None` when the value is only known after apply.
    pub after: Option<Value>,
    /// The change forces replacement.
    pub replace: bool,
}

/// Value-level outcome of planning one declaration.
#[derive(Debug, Clone, PartialEq)]
pub struct PlannedValues {
    pub action: Action,
    /// Attributes to converge to; `None` for deletions.
    pub planned: Option<Value>,
    /// Attributes whose value is known only after apply.
    pub unknown: BTreeSet<String>,
    pub changes: Vec<AttributeChange>,
    pub replace_triggers: Vec<String>,
}

/// Plan one declaration against its prior state.
///
/// `config` is `None` when the declaration was removed; `prior` is `None`
/// when nothing has been created yet. Configuration problems are returned
/// as diagnostics before anything else is looked at.
pub fn compute_diff(
    schema: &Schema,
    config: Option<&Value>,
    prior: Option<&Value>,
) -> Result<PlannedValues, Vec<Diagnostic>> {
    let Some(config) = config else {
        return Ok(match prior {
            Some(prior) => delete_plan(schema, prior),
            None => PlannedValues {
                action: Action::NoOp,
                planned: None,
                unknown: BTreeSet::new(),
                changes: Vec::new(),
                replace_triggers: Vec::new(),
            },
        });
    };

    let diagnostics = schema.validate(config);
    if !diagnostics.is_empty() {
        return Err(diagnostics);
    }

    let mut planned = propose(schema, config, prior);

    let Some(prior) = prior else {
        let changes = schema
            .iter()
            .filter_map(|(name, _)| {
                let known = planned.values.get(name).filter(|v| !v.is_null());
                let unknown = planned.unknown.contains(name);
                (known.is_some() || unknown).then(|| AttributeChange {
                    name: name.to_string(),
                    before: Value::Null,
                    after: known.cloned(),
                    replace: false,
                })
            })
            .collect();
        return Ok(PlannedValues {
            action: Action::Create,
            planned: Some(Value::Object(planned.values)),
            unknown: planned.unknown,
            changes,
            replace_triggers: Vec::new(),
        });
    };

    let replace_triggers = schema.replace_triggers(prior, &Value::Object(planned.values.clone()));
    if !replace_triggers.is_empty() {
        // The replacement is a new entity: every unset computed value is
        // produced afresh.
        planned = propose(schema, config, None);
    }

    let changes = attribute_changes(schema, prior, &planned, &replace_triggers);
    let action = if !replace_triggers.is_empty() {
        Action::Replace
    } else if changes.is_empty() {
        Action::NoOp
    } else {
        Action::Update
    };

    Ok(PlannedValues {
        action,
        planned: Some(Value::Object(planned.values)),
        unknown: planned.unknown,
        changes,
        replace_triggers,
    })
}

struct Proposal {
    values: Map<String, Value>,
    unknown: BTreeSet<String>,
}

fn propose(schema: &Schema, config: &Value, prior: Option<&Value>) -> Proposal {
    let mut values = Map::new();
    let mut unknown = BTreeSet::new();
    let mut deferred = Vec::new();

    for (name, attr) in schema.iter() {
        let declared = config.get(name).filter(|v| !v.is_null());
        match (declared, prior) {
            (Some(value), _) => {
                values.insert(name.to_string(), value.clone());
            }
            (None, None) if attr.mutability.is_computed() => {
                unknown.insert(name.to_string());
                values.insert(name.to_string(), Value::Null);
            }
            (None, Some(prior)) if attr.mutability.is_computed() => {
                if attr.use_state_for_unknown {
                    values.insert(name.to_string(), prior_value(prior, name));
                } else {
                    deferred.push(name);
                }
            }
            (None, _) => {
                values.insert(name.to_string(), Value::Null);
            }
        }
    }

    if let Some(prior) = prior {
        // Computed values without a carry-forward hint stay put only when
        // nothing else moves; any other change may make the remote recompute them.
        let others_change = values
            .iter()
            .any(|(name, v)| !schema.values_equal(name, Some(v), prior.get(name)));
        for name in deferred {
            if others_change {
                unknown.insert(name.to_string());
                values.insert(name.to_string(), Value::Null);
            } else {
                values.insert(name.to_string(), prior_value(prior, name));
            }
        }
    }

    Proposal { values, unknown }
}

fn prior_value(prior: &Value, name: &str) -> Value {
    prior.get(name).cloned().unwrap_or(Value::Null)
}

fn attribute_changes(
    schema: &Schema,
    prior: &Value,
    planned: &Proposal,
    replace_triggers: &[String],
) -> Vec<AttributeChange> {
    schema
        .iter()
        .filter_map(|(name, _)| {
            let before = prior_value(prior, name);
            let replace = replace_triggers.iter().any(|t| t == name);
            if planned.unknown.contains(name) {
                return Some(AttributeChange {
                    name: name.to_string(),
                    before,
                    after: None,
                    replace,
                });
            }
            let after = planned.values.get(name);
            (!schema.values_equal(name, Some(&before), after)).then(|| AttributeChange {
                name: name.to_string(),
                before,
                after: Some(after.cloned().unwrap_or(Value::Null)),
                replace,
            })
        })
        .collect()
}

fn delete_plan(schema: &Schema, prior: &Value) -> PlannedValues {
    let changes = schema
        .iter()
        .filter_map(|(name, _)| {
            let before = prior_value(prior, name);
            (!before.is_null()).then(|| AttributeChange {
                name: name.to_string(),
                before,
                after: Some(Value::Null),
                replace: false,
            })
        })
        .collect();
    PlannedValues {
        action: Action::Delete,
        planned: None,
        unknown: BTreeSet::new(),
        changes,
        replace_triggers: Vec::new(),
    }
}

/// The planned change for one declared address
#[derive(Debug, Clone, PartialEq)]
pub struct ResourceDiff {
    /// Declaration address, `<resource_type>.<name>`
    pub address: String,
    /// Type of the resource
    pub resource_type: String,
    pub action: Action,
    /// Canonical state before the change
    pub prior: Option<Value>,
    /// Attributes to converge to
    pub planned: Option<Value>,
    pub unknown: BTreeSet<String>,
    pub changes: Vec<AttributeChange>,
    pub replace_triggers: Vec<String>,
    /// Remote ID, when already known
    pub id: Option<String>,
    /// IDs of same-kind entities this one must be created after
    pub references: Vec<String>,
    /// Position of the resource kind in the apply order
    pub stage: u32,
}

impl ResourceDiff {
    /// The name part of the address.
    pub fn name(&self) -> &str {
        self.address
            .strip_prefix(&self.resource_type)
            .and_then(|rest| rest.strip_prefix('.'))
            .unwrap_or(&self.address)
    }
}

/// Diff summary statistics
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct DiffSummary {
    /// Number of resources to add
    pub additions: usize,
    /// Number of resources to remove
    pub removals: usize,
    /// Number of resources to update in place
    pub modifications: usize,
    /// Number of resources to delete and recreate
    pub replacements: usize,
}

impl DiffSummary {
    /// Create a summary from a list of diffs
    pub fn from_diffs<'a>(diffs: impl IntoIterator<Item = &'a ResourceDiff>) -> Self {
        let mut summary = Self::default();
        for diff in diffs {
            match diff.action {
                Action::Create => summary.additions += 1,
                Action::Delete => summary.removals += 1,
                Action::Update => summary.modifications += 1,
                Action::Replace => summary.replacements += 1,
                Action::NoOp => {}
            }
        }
        summary
    }

    /// Total number of changes
    pub fn total(&self) -> usize {
        self.additions + self.removals + self.modifications + self.replacements
    }

    /// Check if there are any changes
    pub fn has_changes(&self) -> bool {
        self.total() > 0
    }
}

/// Group diffs by resource type
pub fn group_by_type(diffs: &[ResourceDiff]) -> HashMap<String, Vec<&ResourceDiff>> {
    let mut groups: HashMap<String, Vec<&ResourceDiff>> = HashMap::new();
    for diff in diffs {
        groups
            .entry(diff.resource_type.clone())
            .or_default()
            .push(diff);
    }
    groups
}
