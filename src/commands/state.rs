use anyhow::{Context as AnyhowContext, Result};

use super::Project;
use crate::Context;
use crate::state::State;
use crate::ui;

/// List every managed address
pub fn list(ctx: &Context) -> Result<()> {
    let project = Project::load(ctx, false)?;
    let state = State::load(&project.state_path)?;

    ui::header(&format!("State ({})", project.state_path.display()));
    if state.is_empty() {
        ui::dim("No managed resources");
        return Ok(());
    }

    let rows: Vec<Vec<String>> = state
        .iter()
        .map(|(address, entry)| {
            vec![
                address.to_string(),
                entry.attributes["id"].as_str().unwrap_or("-").to_string(),
            ]
        })
        .collect();
    ui::table(&["ADDRESS", "ID"], &rows);
    println!();
    ui::dim(&format!(
        "{}, last updated {}",
        ui::plural(state.len(), "resource"),
        state.last_updated.format("%Y-%m-%d %H:%M:%S UTC")
    ));
    Ok(())
}

/// Print the stored attributes of one address
pub fn show(ctx: &Context, address: &str) -> Result<()> {
    let project = Project::load(ctx, false)?;
    let state = State::load(&project.state_path)?;

    let entry = state
        .get(address)
        .with_context(|| format!("{address} is not in state"))?;

    ui::header(address);
    ui::kv("type", &entry.resource_type);
    println!();
    println!(
        "{}",
        serde_json::to_string_pretty(&entry.attributes).context("Failed to render attributes")?
    );
    Ok(())
}
