use anyhow::Result;

use super::Project;
use super::refresh::refresh_in_place;
use crate::Context;
use crate::engine::{display_plan, planner};
use crate::state::State;
use crate::ui;

/// Show what `apply` would change; never writes the state file
pub fn run(ctx: &Context, target: Option<&str>, refresh: bool, jobs: usize) -> Result<()> {
    ui::header("Execution Plan");

    let project = Project::load(ctx, true)?;
    let mut state = State::load(&project.state_path)?;
    let (provider, registry) = project.connect()?;
    ui::kv("Application", &provider.host);
    ui::kv("Declarations", &project.config_path.display().to_string());

    if refresh {
        refresh_in_place(ctx, &mut state, &registry, provider.missing_on_read, jobs)?;
    }

    let plan = planner::build(&project.config, &state, &registry)?.filter_by_target(target);
    display_plan(&plan);
    Ok(())
}
