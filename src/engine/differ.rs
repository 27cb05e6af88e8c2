//! Plan display

use colored::{ColoredString, Colorize};
use declarative::{Action, AttributeChange, DiffSummary, ExecutionPlan, ResourceDiff};
use serde_json::Value;

/// Display a plan grouped by resource type, in execution order
pub fn display_plan(plan: &ExecutionPlan) {
    if plan.is_empty() {
        println!();
        println!(
            "  {} No changes needed ({} up to date)",
            "✓".green(),
            plan.unchanged
        );
        return;
    }

    let mut by_type: Vec<(&str, Vec<&ResourceDiff>)> = Vec::new();
    for diff in plan.diffs() {
        match by_type
            .iter_mut()
            .find(|(t, _)| *t == diff.resource_type.as_str())
        {
            Some((_, diffs)) => diffs.push(diff),
            None => by_type.push((diff.resource_type.as_str(), vec![diff])),
        }
    }

    println!();
    println!(
        "┌─ {} ─────────────────────────────────────────┐",
        "Execution Plan".bold()
    );
    println!("│");

    for (resource_type, diffs) in &by_type {
        println!("│ {}", resource_type.bold());
        for diff in diffs {
            println!(
                "│   {} {:<30} {}",
                colored_symbol(diff.action),
                diff.name(),
                headline(diff).dimmed()
            );
            for change in &diff.changes {
                let line = change_line(change, diff.action);
                if change.replace {
                    println!("│       {} {}", line, "# forces replacement".red());
                } else {
                    println!("│       {}", line.dimmed());
                }
            }
        }
        println!("│");
    }

    println!("├─────────────────────────────────────────────────────┤");
    println!(
        "│ Summary: {} ({} unchanged)",
        summary_line(&plan.summary()).bold(),
        plan.unchanged
    );
    println!("└─────────────────────────────────────────────────────┘");
}

fn colored_symbol(action: Action) -> ColoredString {
    let symbol = action.symbol();
    match action {
        Action::Create => symbol.green(),
        Action::Delete => symbol.red(),
        Action::Update => symbol.yellow(),
        Action::Replace => symbol.magenta(),
        Action::NoOp => symbol.dimmed(),
    }
}

fn headline(diff: &ResourceDiff) -> String {
    let id = diff.id.as_deref().unwrap_or("(known after apply)");
    match diff.action {
        Action::Create => format!("(will create {id})"),
        Action::Update => format!("(will update {id} in place)"),
        Action::Replace => format!(
            "(will replace {id}: {} changed)",
            diff.replace_triggers.join(", ")
        ),
        Action::Delete => format!("(will destroy {id})"),
        Action::NoOp => String::new(),
    }
}

/// One attribute of a change, e.g. `display_name: "Old" → "New"`
pub fn change_line(change: &AttributeChange, action: Action) -> String {
    let after = change
        .after
        .as_ref()
        .map_or_else(|| "(known after apply)".to_string(), render);
    match action {
        Action::Create => format!("{} = {after}", change.name),
        Action::Delete => format!("{} = {}", change.name, render(&change.before)),
        _ => format!("{}: {} → {after}", change.name, render(&change.before)),
    }
}

fn render(value: &Value) -> String {
    value.to_string()
}

/// `2 to add, 1 to change, 0 to replace, 0 to destroy`
pub fn summary_line(summary: &DiffSummary) -> String {
    format!(
        "{} to add, {} to change, {} to replace, {} to destroy",
        summary.additions, summary.modifications, summary.replacements, summary.removals
    )
}
