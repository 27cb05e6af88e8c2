use anyhow::Result;
use colored::Colorize;
use declarative::{MissingPolicy, Registry};

use super::Project;
use crate::Context;
use crate::engine::executor::{self, RefreshReport};
use crate::progress;
use crate::state::State;
use crate::ui;

/// Re-read every managed entity and store what the application reports
pub fn run(ctx: &Context, jobs: usize) -> Result<()> {
    ui::header("Refreshing State");

    let project = Project::load(ctx, false)?;
    let mut state = State::load(&project.state_path)?;
    if state.is_empty() {
        ui::info("Nothing in state to refresh");
        return Ok(());
    }

    let (_, registry) = project.connect()?;
    let policy = project.config.provider.missing_on_read;
    let report = refresh_in_place(ctx, &mut state, &registry, policy, jobs)?;

    state.save(&project.state_path)?;

    println!();
    if report.failed.is_empty() {
        ui::success(&format!(
            "State refreshed ({} drifted, {} gone, {} unchanged)",
            report.updated.len(),
            report.removed.len(),
            report.unchanged
        ));
        Ok(())
    } else {
        anyhow::bail!(
            "{} could not be refreshed",
            ui::plural(report.failed.len(), "resource")
        )
    }
}

/// Refresh `state` in memory and print what changed
pub fn refresh_in_place(
    ctx: &Context,
    state: &mut State,
    registry: &Registry,
    policy: MissingPolicy,
    jobs: usize,
) -> Result<RefreshReport> {
    let spinner = progress::spinner(
        &format!("Reading {}", ui::plural(state.len(), "resource")),
        ctx.quiet,
    );
    let report = executor::refresh(state, registry, policy, jobs);
    spinner.finish_and_clear();
    let report = report?;

    for address in &report.updated {
        println!("  {} {address} changed outside of iotc", "~".yellow());
    }
    for address in &report.removed {
        println!("  {} {address} no longer exists", "-".red());
    }
    for (address, error) in &report.failed {
        ui::error(&format!("{address}: {error}"));
    }
    Ok(report)
}
