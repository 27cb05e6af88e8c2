//! Plan building: every declaration against its state entry, plus every
//! state entry whose declaration is gone

use crate::config::Config;
use crate::state::State;
use anyhow::Result;
use declarative::{ExecutionPlan, Registry, ResourceDiff, error::chain};

/// Plan every declaration in `config` and delete whatever `state` holds
/// beyond it.
///
/// All configuration errors are collected before failing, so one run
/// reports every invalid declaration.
pub fn build(config: &Config, state: &State, registry: &Registry) -> Result<ExecutionPlan> {
    let mut diffs = Vec::new();
    let mut errors = Vec::new();

    for declaration in &config.declarations {
        let prior = state.attributes(&declaration.address);
        match registry.diff(
            &declaration.address,
            declaration.resource_type,
            Some(&declaration.attributes),
            prior,
        ) {
            Ok(diff) => diffs.push(diff),
            Err(e) => errors.push(chain(&e)),
        }
    }

    for (address, entry) in state.iter() {
        if config.get(address).is_some() {
            continue;
        }
        match registry.diff(address, &entry.resource_type, None, Some(&entry.attributes)) {
            Ok(diff) => diffs.push(diff),
            Err(e) => errors.push(chain(&e)),
        }
    }

    if !errors.is_empty() {
        anyhow::bail!(
            "{} declaration(s) could not be planned:\n  {}",
            errors.len(),
            errors.join("\n  ")
        );
    }

    log::debug!("Planned {} declarations", diffs.len());
    Ok(ExecutionPlan::from_diffs(diffs))
}

/// Plan the deletion of every entry in `state`
pub fn build_destroy(state: &State, registry: &Registry) -> Result<ExecutionPlan> {
    let diffs = state
        .iter()
        .map(|(address, entry)| {
            registry.diff(address, &entry.resource_type, None, Some(&entry.attributes))
        })
        .collect::<declarative::Result<Vec<ResourceDiff>>>()?;
    Ok(ExecutionPlan::from_diffs(diffs))
}
