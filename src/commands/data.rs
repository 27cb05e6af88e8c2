//! Read-only views of the application

use anyhow::{Context as AnyhowContext, Result};
use declarative::{DataSource, data_source};
use serde::Serialize;

use super::Project;
use crate::Context;
use crate::data_source::{
    DevicesDataSource, ListAll, OrganizationsDataSource, RoleDataSource, RoleQuery,
};
use crate::progress;
use crate::provider::Provider;
use crate::resource::SharedClient;
use crate::ui;

pub fn devices(ctx: &Context, json: bool) -> Result<()> {
    let devices = read(ctx, &DevicesDataSource::new(connect(ctx)?), &ListAll {})?;
    if json {
        return print_json(&devices);
    }

    ui::header("Devices");
    let rows: Vec<Vec<String>> = devices
        .iter()
        .map(|d| {
            vec![
                text(d.id.as_deref()),
                text(d.display_name.as_deref()),
                text(d.template.as_deref()),
                flag(d.enabled),
                flag(d.provisioned),
                flag(d.simulated),
                d.organizations
                    .as_deref()
                    .map(|orgs| orgs.join(","))
                    .unwrap_or_default(),
            ]
        })
        .collect();
    ui::table(
        &[
            "ID",
            "NAME",
            "TEMPLATE",
            "ENABLED",
            "PROVISIONED",
            "SIMULATED",
            "ORGANIZATIONS",
        ],
        &rows,
    );
    println!();
    ui::dim(&ui::plural(devices.len(), "device"));
    Ok(())
}

pub fn organizations(ctx: &Context, json: bool) -> Result<()> {
    let organizations = read(ctx, &OrganizationsDataSource::new(connect(ctx)?), &ListAll {})?;
    if json {
        return print_json(&organizations);
    }

    ui::header("Organizations");
    let rows: Vec<Vec<String>> = organizations
        .iter()
        .map(|o| {
            vec![
                text(o.id.as_deref()),
                text(o.display_name.as_deref()),
                text(o.parent.as_deref()),
            ]
        })
        .collect();
    ui::table(&["ID", "NAME", "PARENT"], &rows);
    println!();
    ui::dim(&ui::plural(organizations.len(), "organization"));
    Ok(())
}

pub fn role(ctx: &Context, display_name: &str, json: bool) -> Result<()> {
    let role = read(
        ctx,
        &RoleDataSource::new(connect(ctx)?),
        &RoleQuery::new(display_name),
    )?;
    if json {
        return print_json(&role);
    }

    ui::header(&role.display_name);
    ui::kv("id", &role.id);
    Ok(())
}

fn connect(ctx: &Context) -> Result<SharedClient> {
    let project = Project::load(ctx, false)?;
    Ok(Provider::connect(&project.config.provider)?.client)
}

fn read<D: DataSource>(ctx: &Context, source: &D, query: &D::Query) -> Result<D::Output> {
    let spinner = progress::spinner(&format!("Reading {}", D::TYPE_NAME), ctx.quiet);
    let output = data_source::read(source, query);
    spinner.finish_and_clear();
    Ok(output?)
}

fn print_json<T: Serialize>(value: &T) -> Result<()> {
    println!(
        "{}",
        serde_json::to_string_pretty(value).context("Failed to render JSON")?
    );
    Ok(())
}

fn text(value: Option<&str>) -> String {
    value.unwrap_or("-").to_string()
}

fn flag(value: Option<bool>) -> String {
    match value {
        Some(true) => "yes".to_string(),
        Some(false) => "no".to_string(),
        None => "-".to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_cell_rendering() {
        assert_eq!(text(Some("north")), "north");
        assert_eq!(text(None), "-");
        assert_eq!(flag(Some(true)), "yes");
        assert_eq!(flag(Some(false)), "no");
        assert_eq!(flag(None), "-");
    }
}
