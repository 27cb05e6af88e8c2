use anyhow::{Context as AnyhowContext, Result};
use declarative::split_address;

use super::Project;
use crate::Context;
use crate::progress;
use crate::state::State;
use crate::ui;

/// Bring an existing entity under management at `address`
pub fn run(ctx: &Context, address: &str, id: &str) -> Result<()> {
    ui::header("Importing");

    let Some((resource_type, _)) = split_address(address) else {
        anyhow::bail!("Invalid address {address:?}; expected <resource_type>.<name>");
    };

    let project = Project::load(ctx, false)?;
    let mut state = State::load(&project.state_path)?;
    if state.get(address).is_some() {
        anyhow::bail!("{address} is already managed; remove it from state first");
    }

    let (_, registry) = project.connect()?;
    let resource = registry.require(resource_type)?;

    let spinner = progress::spinner(&format!("Reading {resource_type} {id}"), ctx.quiet);
    let imported = resource.import(id);
    spinner.finish_and_clear();
    let attributes = imported.with_context(|| format!("Could not import {address}"))?;

    state.set(address, resource_type, attributes);
    state.save(&project.state_path)?;
    ui::success(&format!("Imported {id} as {address}"));

    if project.config.get(address).is_none() {
        ui::warn(&format!(
            "{address} is not declared in {}; the next apply will destroy it",
            project.config_path.display()
        ));
    }
    Ok(())
}
