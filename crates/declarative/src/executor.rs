//! Execution engine - applies staged changes with parallelism
//!
//! Stages run one after another. Within a stage every change is independent,
//! so changes run in parallel on a rayon pool; each one blocks on its own
//! remote call.

use crate::context::{ConfirmCallback, ProgressCallback};
use crate::diff::ResourceDiff;
use crate::error::{Result as EngineResult, chain};
use crate::planner::ExecutionPlan;
use crate::resource::Registry;
use crate::types::{ApplyResult, ExecuteOptions, ExecuteSummary, MissingPolicy, StateUpdate};
use anyhow::Result;
use rayon::prelude::*;
use serde_json::Value;

/// What happened to one declaration
#[derive(Debug, Clone)]
pub struct Outcome {
    pub address: String,
    pub resource_type: String,
    pub result: ApplyResult,
    pub state: StateUpdate,
}

/// Results of executing a plan
#[derive(Debug, Clone, Default)]
pub struct ExecuteReport {
    pub summary: ExecuteSummary,
    /// One entry per executed change, in execution order
    pub outcomes: Vec<Outcome>,
}

/// Execute a plan with the given options and callbacks
///
/// # Arguments
/// * `plan` - The staged plan to run
/// * `registry` - Resource kinds that carry out the changes
/// * `opts` - Execution options (dry_run, jobs)
/// * `progress` - Progress callback
/// * `confirm` - Confirmation callback
///
/// # Returns
/// Summary of execution results plus the state update of every change
pub fn execute<P, C>(
    plan: ExecutionPlan,
    registry: &Registry,
    opts: ExecuteOptions,
    progress: &mut P,
    confirm: &mut C,
) -> Result<ExecuteReport>
where
    P: ProgressCallback,
    C: ConfirmCallback,
{
    let mut report = ExecuteReport::default();
    report.summary.no_change = plan.unchanged;

    let total_changes = plan.total_resources();
    if total_changes == 0 {
        return Ok(report);
    }

    // Confirm before proceeding (unless dry_run)
    if !opts.dry_run && !confirm.confirm("Apply changes?")? {
        report.summary.skipped = total_changes;
        return Ok(report);
    }

    if opts.dry_run {
        return Ok(report);
    }

    let pool = rayon::ThreadPoolBuilder::new()
        .num_threads(opts.jobs.max(1))
        .build()
        .map_err(|e| anyhow::anyhow!("Failed to create thread pool: {e}"))?;

    for (index, stage) in plan.stages.iter().enumerate() {
        progress.on_stage_start(index, stage.diffs.len(), &stage.label);
        let outcomes = execute_stage(&stage.diffs, registry, opts.jobs, &pool, progress);
        progress.on_stage_complete();
        progress.on_stage_outcomes(&outcomes)?;
        for outcome in outcomes {
            report.summary.add_result(&outcome.result);
            report.outcomes.push(outcome);
        }
    }

    Ok(report)
}

/// Execute the changes of one stage
fn execute_stage<P: ProgressCallback>(
    diffs: &[ResourceDiff],
    registry: &Registry,
    jobs: usize,
    pool: &rayon::ThreadPool,
    progress: &mut P,
) -> Vec<Outcome> {
    if jobs <= 1 || diffs.len() == 1 {
        // Sequential execution
        let mut outcomes = Vec::with_capacity(diffs.len());
        for diff in diffs {
            progress.on_resource_start(&diff.address, diff.action);
            let outcome = apply_diff(registry, diff);
            progress.on_resource_complete(&outcome.address, &outcome.result);
            outcomes.push(outcome);
        }
        outcomes
    } else {
        // The progress callback is not thread-safe; report after the stage.
        for diff in diffs {
            progress.on_resource_start(&diff.address, diff.action);
        }
        let outcomes: Vec<Outcome> =
            pool.install(|| diffs.par_iter().map(|d| apply_diff(registry, d)).collect());
        for outcome in &outcomes {
            progress.on_resource_complete(&outcome.address, &outcome.result);
        }
        outcomes
    }
}

/// Apply a single change
fn apply_diff(registry: &Registry, diff: &ResourceDiff) -> Outcome {
    let (result, state) = match registry.require(&diff.resource_type) {
        Ok(resource) => resource.apply(diff),
        Err(e) => (
            ApplyResult::Failed {
                error: chain(&e),
            },
            StateUpdate::Unchanged,
        ),
    };
    Outcome {
        address: diff.address.clone(),
        resource_type: diff.resource_type.clone(),
        result,
        state,
    }
}

/// Simple execution without callbacks
///
/// For basic use cases where you don't need progress or confirmation.
pub fn execute_simple(
    plan: ExecutionPlan,
    registry: &Registry,
    opts: ExecuteOptions,
) -> Result<ExecuteReport> {
    use crate::context::{AutoConfirm, NoProgress};

    execute(plan, registry, opts, &mut NoProgress, &mut AutoConfirm)
}

/// A persisted state entry to re-read
#[derive(Debug, Clone)]
pub struct RefreshTarget {
    pub address: String,
    pub resource_type: String,
    pub state: Value,
}

/// Re-read many state entries in parallel.
///
/// Results come back in input order. `Ok(None)` means the entity is gone
/// and the policy allows dropping it.
pub fn refresh_all(
    targets: &[RefreshTarget],
    registry: &Registry,
    policy: MissingPolicy,
    jobs: usize,
) -> Result<Vec<EngineResult<Option<Value>>>> {
    let pool = rayon::ThreadPoolBuilder::new()
        .num_threads(jobs.max(1))
        .build()
        .map_err(|e| anyhow::anyhow!("Failed to create thread pool: {e}"))?;

    Ok(pool.install(|| {
        targets
            .par_iter()
            .map(|target| {
                registry
                    .require(&target.resource_type)?
                    .refresh(&target.state, policy)
            })
            .collect()
    }))
}
