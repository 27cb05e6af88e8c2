//! Execution engine - runs plans and refreshes against the state file with
//! terminal progress and confirmation

use anyhow::Result;
use colored::Colorize;
use indicatif::ProgressBar;
use std::path::Path;

use crate::progress;
use crate::state::State;
use crate::ui;
use declarative::{
    Action, ApplyResult, ConfirmCallback, ExecuteOptions, ExecuteReport, ExecuteSummary,
    ExecutionPlan, MissingPolicy, Outcome, ProgressCallback, RefreshTarget, Registry,
    error::chain,
};

/// indicatif bar per stage; failures are printed above the bar
pub struct CliProgress {
    quiet: bool,
    bar: Option<ProgressBar>,
}

impl CliProgress {
    pub fn new(quiet: bool) -> Self {
        Self { quiet, bar: None }
    }

    fn println(&self, line: &str) {
        match &self.bar {
            Some(pb) => pb.suspend(|| println!("{line}")),
            None => println!("{line}"),
        }
    }
}

impl ProgressCallback for CliProgress {
    fn on_stage_start(&mut self, index: usize, count: usize, label: &str) {
        log::debug!("Stage {}: {label} ({count} changes)", index + 1);
        self.bar = Some(progress::bar(count as u64, label, self.quiet));
    }

    fn on_resource_start(&mut self, address: &str, action: Action) {
        log::debug!("{action} {address}");
        if let Some(pb) = &self.bar {
            pb.set_message(format!("{action} {address}"));
        }
    }

    fn on_resource_complete(&mut self, address: &str, result: &ApplyResult) {
        let line = match result {
            ApplyResult::NoChange => None,
            ApplyResult::Created => Some(format!("    {} {address} created", "✓".green())),
            ApplyResult::Modified => Some(format!("    {} {address} updated", "✓".green())),
            ApplyResult::Replaced => Some(format!("    {} {address} replaced", "✓".green())),
            ApplyResult::Removed => Some(format!("    {} {address} destroyed", "✓".green())),
            ApplyResult::Failed { error } => {
                Some(format!("    {} {address}: {}", "✗".red(), error.red()))
            }
        };
        if let Some(line) = line
            && !self.quiet
        {
            self.println(&line);
        }
        if let Some(pb) = &self.bar {
            pb.inc(1);
        }
    }

    fn on_stage_complete(&mut self) {
        if let Some(pb) = self.bar.take() {
            pb.finish_and_clear();
        }
    }
}

/// Confirmation through dialoguer, skipped with `--yes`
pub struct DialoguerConfirm {
    assume_yes: bool,
}

impl DialoguerConfirm {
    pub fn new(assume_yes: bool) -> Self {
        Self { assume_yes }
    }
}

impl ConfirmCallback for DialoguerConfirm {
    fn confirm(&mut self, prompt: &str) -> Result<bool> {
        if self.assume_yes {
            return Ok(true);
        }
        println!();
        let confirmed = dialoguer::Confirm::new()
            .with_prompt(prompt)
            .default(false)
            .interact()?;
        Ok(confirmed)
    }
}

/// Execute a plan and record every outcome's state transition.
///
/// `state` holds only successful transitions afterwards; failures leave
/// the prior entry in place (or drop it when a replacement deleted the old
/// entity and then failed to create the new one). With `state_path`, the
/// state file is rewritten after every stage, so an interrupted apply still
/// remembers the entities it already created.
pub fn run<P, C>(
    plan: ExecutionPlan,
    registry: &Registry,
    state: &mut State,
    state_path: Option<&Path>,
    opts: ExecuteOptions,
    progress: &mut P,
    confirm: &mut C,
) -> Result<ExecuteReport>
where
    P: ProgressCallback,
    C: ConfirmCallback,
{
    let mut recording = Recording {
        inner: progress,
        state,
        state_path,
    };
    declarative::execute(plan, registry, opts, &mut recording, confirm)
}

/// Forwards progress and writes each finished stage into the state
struct Recording<'a, P> {
    inner: &'a mut P,
    state: &'a mut State,
    state_path: Option<&'a Path>,
}

impl<P: ProgressCallback> ProgressCallback for Recording<'_, P> {
    fn on_stage_start(&mut self, index: usize, count: usize, label: &str) {
        self.inner.on_stage_start(index, count, label);
    }

    fn on_resource_start(&mut self, address: &str, action: Action) {
        self.inner.on_resource_start(address, action);
    }

    fn on_resource_complete(&mut self, address: &str, result: &ApplyResult) {
        self.inner.on_resource_complete(address, result);
    }

    fn on_stage_complete(&mut self) {
        self.inner.on_stage_complete();
    }

    fn on_stage_outcomes(&mut self, outcomes: &[Outcome]) -> Result<()> {
        for outcome in outcomes {
            self.state
                .apply_update(&outcome.address, &outcome.resource_type, outcome.state.clone());
        }
        if let Some(path) = self.state_path {
            self.state.save(path)?;
        }
        self.inner.on_stage_outcomes(outcomes)
    }
}

/// What a refresh did to the state file
#[derive(Debug, Default)]
pub struct RefreshReport {
    /// Entries whose remote attributes drifted
    pub updated: Vec<String>,
    /// Entries dropped because their entity is gone
    pub removed: Vec<String>,
    /// Entries that could not be read, with the reason
    pub failed: Vec<(String, String)>,
    pub unchanged: usize,
}

/// Re-read every state entry and store what the application reports now
pub fn refresh(
    state: &mut State,
    registry: &Registry,
    policy: MissingPolicy,
    jobs: usize,
) -> Result<RefreshReport> {
    let targets: Vec<RefreshTarget> = state
        .iter()
        .map(|(address, entry)| RefreshTarget {
            address: address.to_string(),
            resource_type: entry.resource_type.clone(),
            state: entry.attributes.clone(),
        })
        .collect();

    let results = declarative::refresh_all(&targets, registry, policy, jobs)?;

    let mut report = RefreshReport::default();
    for (target, result) in targets.into_iter().zip(results) {
        match result {
            Ok(Some(fresh)) if fresh == target.state => report.unchanged += 1,
            Ok(Some(fresh)) => {
                state.set(&target.address, &target.resource_type, fresh);
                report.updated.push(target.address);
            }
            Ok(None) => {
                state.remove(&target.address);
                report.removed.push(target.address);
            }
            Err(e) => report.failed.push((target.address, chain(&e))),
        }
    }
    Ok(report)
}

/// Print final summary
pub fn print_summary(summary: &ExecuteSummary) {
    println!();
    if summary.is_success() {
        println!("  {} Changes applied successfully!", "✓".green().bold());
    } else {
        println!("  {} Changes applied with errors", "⚠".yellow().bold());
    }

    if summary.created > 0 {
        println!("    • {} created", ui::plural(summary.created, "resource"));
    }
    if summary.modified > 0 {
        println!("    • {} updated", ui::plural(summary.modified, "resource"));
    }
    if summary.replaced > 0 {
        println!("    • {} replaced", ui::plural(summary.replaced, "resource"));
    }
    if summary.removed > 0 {
        println!("    • {} destroyed", ui::plural(summary.removed, "resource"));
    }
    if summary.no_change > 0 {
        println!("    • {} unchanged", ui::plural(summary.no_change, "resource"));
    }
    if summary.skipped > 0 {
        println!("    • {} skipped", ui::plural(summary.skipped, "resource"));
    }
    if summary.failed > 0 {
        println!("    • {} {} failed", summary.failed, "resources".red());
    }
}
