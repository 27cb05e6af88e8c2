use anyhow::Result;
use declarative::{ExecuteOptions, ExecutionPlan, Registry};

use super::Project;
use super::refresh::refresh_in_place;
use crate::Context;
use crate::engine::{CliProgress, DialoguerConfirm, display_plan, executor, planner, print_summary};
use crate::state::State;
use crate::ui;

/// Options shared by `apply` and `destroy`
#[derive(Debug, Clone, Default)]
pub struct ApplyOptions<'a> {
    pub target: Option<&'a str>,
    pub yes: bool,
    pub dry_run: bool,
    pub jobs: usize,
    pub refresh: bool,
}

/// Converge the application to the declaration file
pub fn apply(ctx: &Context, opts: &ApplyOptions<'_>) -> Result<()> {
    ui::header("Applying Configuration");
    if opts.dry_run {
        ui::warn("Dry run - no changes will be made");
    }

    let project = Project::load(ctx, true)?;
    let mut state = State::load(&project.state_path)?;
    let (provider, registry) = project.connect()?;
    ui::kv("Application", &provider.host);

    if opts.refresh {
        refresh_in_place(ctx, &mut state, &registry, provider.missing_on_read, opts.jobs)?;
        if !opts.dry_run {
            state.save(&project.state_path)?;
        }
    }

    let plan = planner::build(&project.config, &state, &registry)?.filter_by_target(opts.target);
    execute(ctx, plan, &registry, &mut state, &project, opts)
}

/// Delete every managed entity (or the targeted ones)
pub fn destroy(ctx: &Context, opts: &ApplyOptions<'_>) -> Result<()> {
    ui::header("Destroying Resources");

    let project = Project::load(ctx, false)?;
    let mut state = State::load(&project.state_path)?;
    if state.is_empty() {
        ui::info("Nothing in state to destroy");
        return Ok(());
    }
    let (provider, registry) = project.connect()?;
    ui::kv("Application", &provider.host);

    let plan = planner::build_destroy(&state, &registry)?.filter_by_target(opts.target);
    execute(ctx, plan, &registry, &mut state, &project, opts)
}

fn execute(
    ctx: &Context,
    plan: ExecutionPlan,
    registry: &Registry,
    state: &mut State,
    project: &Project,
    opts: &ApplyOptions<'_>,
) -> Result<()> {
    display_plan(&plan);
    if plan.is_empty() {
        return Ok(());
    }
    if opts.dry_run {
        println!();
        ui::info("Dry run - no changes made");
        return Ok(());
    }

    let changes = plan.total_resources();
    let report = executor::run(
        plan,
        registry,
        state,
        Some(project.state_path.as_path()),
        ExecuteOptions {
            dry_run: false,
            jobs: opts.jobs,
        },
        &mut CliProgress::new(ctx.quiet),
        &mut DialoguerConfirm::new(opts.yes),
    )?;

    if report.outcomes.is_empty() {
        println!();
        ui::warn(&format!(
            "Aborted; {} not applied",
            ui::plural(changes, "change")
        ));
        return Ok(());
    }

    log::info!("State written to {}", project.state_path.display());
    print_summary(&report.summary);

    if report.summary.is_success() {
        Ok(())
    } else {
        anyhow::bail!("{} failed", ui::plural(report.summary.failed, "change"))
    }
}
