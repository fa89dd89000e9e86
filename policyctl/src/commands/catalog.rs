//! Registry-level commands: nothing here touches tenant documents.

use anyhow::{bail, Result};
use clap::Args;
use std::path::Path;
use tabled::{settings::style::Style, Table, Tabled};
use wards::{policy_schema, EventStatus, FieldDefinition, FieldKind};

use super::{load_registries, Context};

#[derive(Args, Debug)]
pub struct CatalogArgs {
    /// Also list rules that are not live yet
    #[arg(long)]
    pub include_planned: bool,

    /// Output machine-readable JSON
    #[arg(long)]
    pub json: bool,
}

#[derive(Args, Debug)]
pub struct FieldsArgs {
    /// Rule id, e.g. payment_due_reminder
    #[arg(value_name = "EVENT")]
    pub event: String,

    /// Output machine-readable JSON
    #[arg(long)]
    pub json: bool,
}

#[derive(Debug, Tabled, serde::Serialize)]
struct CatalogRow {
    #[tabled(rename = "EVENT")]
    event: String,
    #[tabled(rename = "CATEGORY")]
    category: String,
    #[tabled(rename = "STATUS")]
    status: String,
    #[tabled(rename = "TITLE")]
    title: String,
}

#[derive(Debug, Tabled)]
struct FieldRow {
    #[tabled(rename = "FIELD")]
    field: String,
    #[tabled(rename = "TYPE")]
    kind: String,
    #[tabled(rename = "PATH")]
    path: String,
    #[tabled(rename = "CONSTRAINTS")]
    constraints: String,
    #[tabled(rename = "DEFAULT")]
    default: String,
}

pub fn list(ctx: &Context, args: CatalogArgs) -> Result<()> {
    let reg = &ctx.registries;
    let rows: Vec<CatalogRow> = reg
        .catalog
        .entries()
        .iter()
        .filter(|entry| args.include_planned || entry.status == EventStatus::Active)
        .map(|entry| {
            let desc = reg.descriptions.description_for(entry.event_type.as_str());
            CatalogRow {
                event: entry.event_type.to_string(),
                category: desc.map(|d| d.category.clone()).unwrap_or_default(),
                status: entry.status.to_string(),
                title: desc.map(|d| d.title.clone()).unwrap_or_default(),
            }
        })
        .collect();

    if args.json {
        println!("{}", serde_json::to_string_pretty(&rows)?);
        return Ok(());
    }
    let count = rows.len();
    let mut table = Table::new(rows);
    table.with(Style::rounded());
    println!("{table}");
    println!("{count} rules");
    Ok(())
}

pub fn fields(ctx: &Context, args: FieldsArgs) -> Result<()> {
    let reg = &ctx.registries;
    reg.catalog.require(&args.event)?;
    let defs = reg.fields.fields_for(&args.event);

    if args.json {
        println!("{}", serde_json::to_string_pretty(defs)?);
        return Ok(());
    }
    if defs.is_empty() {
        println!("{} has no parameters", args.event);
        return Ok(());
    }
    let rows: Vec<FieldRow> = defs.iter().map(field_row).collect();
    let mut table = Table::new(rows);
    table.with(Style::rounded());
    println!("{table}");
    Ok(())
}

fn field_row(def: &FieldDefinition) -> FieldRow {
    let constraints = match def.kind() {
        FieldKind::Number { bounds, .. } => match (bounds.min(), bounds.max()) {
            (Some(min), Some(max)) => format!("{min}..={max}"),
            (Some(min), None) => format!(">= {min}"),
            (None, Some(max)) => format!("<= {max}"),
            (None, None) => String::new(),
        },
        FieldKind::Select { options, .. } => options
            .as_slice()
            .iter()
            .map(|o| o.value.to_string())
            .collect::<Vec<_>>()
            .join(" | "),
        FieldKind::Text { .. } | FieldKind::Boolean { .. } => String::new(),
    };
    FieldRow {
        field: def.field().to_string(),
        kind: def.kind().name().to_string(),
        path: def.policy_path().to_string(),
        constraints,
        default: def
            .kind()
            .default_value()
            .map(|v| v.to_string())
            .unwrap_or_default(),
    }
}

/// Runs the consistency check regardless of `WARDS_VALIDATION_MODE` and
/// fails when anything is off.
pub fn validate(registry: Option<&Path>) -> Result<()> {
    let registries = load_registries(registry)?;
    match registries.validate() {
        Ok(()) => {
            println!(
                "registries are consistent ({} events)",
                registries.catalog.len()
            );
            Ok(())
        }
        Err(errors) => {
            eprint!("{}", errors.report());
            bail!("{errors}")
        }
    }
}

pub fn schema(ctx: &Context) -> Result<()> {
    println!(
        "{}",
        serde_json::to_string_pretty(&policy_schema(&ctx.registries))?
    );
    Ok(())
}
