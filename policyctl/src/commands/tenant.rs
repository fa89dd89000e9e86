use anyhow::{bail, Context as _, Result};
use clap::Args;
use config_loader::{
    provision_tenant, update_event_policy, Concurrency, ConfigManager, TenantConfigStore,
};
use owo_colors::OwoColorize;
use serde_json::Value;
use tracing::debug;
use wards::{
    builtin, summarize, BulkUpdate, ConfigTree, EventSummary, LegacyAlias, PolicyGate, ProvisionOptions,
};

use super::{should_use_color, Context};

#[derive(Args, Debug)]
pub struct InitArgs {
    #[arg(long, env = "POLICY_TENANT")]
    pub tenant: String,

    /// Provision active rules switched off
    #[arg(long)]
    pub disabled: bool,
}

#[derive(Args, Debug)]
pub struct ShowArgs {
    #[arg(long, env = "POLICY_TENANT")]
    pub tenant: String,

    /// Only this rule
    #[arg(long)]
    pub event: Option<String>,

    /// Output machine-readable JSON
    #[arg(long)]
    pub json: bool,
}

#[derive(Args, Debug)]
pub struct GateArgs {
    #[arg(long, env = "POLICY_TENANT")]
    pub tenant: String,

    #[arg(value_name = "EVENT")]
    pub event: String,

    /// Output machine-readable JSON
    #[arg(long)]
    pub json: bool,
}

#[derive(Args, Debug)]
pub struct SetArgs {
    #[arg(long, env = "POLICY_TENANT")]
    pub tenant: String,

    #[arg(value_name = "EVENT")]
    pub event: String,

    /// Switch the rule on or off
    #[arg(long)]
    pub enabled: Option<bool>,

    /// Parameter as FIELD=VALUE; VALUE is read as JSON, falling back to a string.
    /// `FIELD=null` leaves the stored value untouched.
    #[arg(long = "param", value_name = "FIELD=VALUE", value_parser = parse_param)]
    pub params: Vec<(String, Value)>,

    /// Refuse to write unless the stored document is at this revision
    #[arg(long, conflicts_with = "checked")]
    pub expect_revision: Option<u64>,

    /// Refuse to write if the document changed after it was read
    #[arg(long)]
    pub checked: bool,
}

#[derive(Args, Debug)]
pub struct AuditArgs {
    #[arg(long, env = "POLICY_TENANT")]
    pub tenant: String,
}

fn parse_param(raw: &str) -> Result<(String, Value), String> {
    let (field, value) = raw
        .split_once('=')
        .ok_or_else(|| format!("expected FIELD=VALUE, got '{raw}'"))?;
    if field.is_empty() {
        return Err(format!("missing field name in '{raw}'"));
    }
    let value = serde_json::from_str(value).unwrap_or_else(|_| Value::String(value.to_string()));
    Ok((field.to_string(), value))
}

/// The stored tree, or an empty one for a tenant nobody has written yet.
fn load_tree(ctx: &Context, tenant: &str) -> Result<ConfigTree> {
    let doc = ctx
        .store
        .fetch(tenant)
        .with_context(|| format!("failed to read config for tenant {tenant}"))?;
    Ok(match doc {
        Some(doc) => {
            debug!(tenant, revision = doc.revision, "loaded tenant document");
            doc.value
        }
        None => ConfigTree::new(),
    })
}

/// Aliases consulted on read, or none when `WARDS_LEGACY_FALLBACK` is off.
fn legacy_aliases(ctx: &Context) -> Result<Vec<LegacyAlias>> {
    if !ctx.config.legacy_fallback {
        return Ok(Vec::new());
    }
    Ok(builtin::legacy_aliases()?)
}

pub fn init(ctx: &Context, args: InitArgs) -> Result<()> {
    let options = ProvisionOptions {
        enable_active: ctx.config.provision_enabled && !args.disabled,
    };
    match provision_tenant(&ctx.store, &ctx.registries, &args.tenant, options)? {
        Some(revision) => println!("provisioned tenant {} at revision {revision}", args.tenant),
        None => println!("tenant {} already provisioned", args.tenant),
    }
    Ok(())
}

pub fn show(ctx: &Context, args: ShowArgs) -> Result<()> {
    let tree = load_tree(ctx, &args.tenant)?;
    let legacy = legacy_aliases(ctx)?;
    let summaries: Vec<EventSummary> = match &args.event {
        Some(event) => vec![summarize(&ctx.registries, &tree, event, &legacy)?],
        None => ctx
            .registries
            .catalog
            .events()
            .map(|event| summarize(&ctx.registries, &tree, event.as_str(), &legacy))
            .collect::<Result<_, _>>()?,
    };

    if args.json {
        println!("{}", serde_json::to_string_pretty(&summaries)?);
        return Ok(());
    }
    for summary in &summaries {
        print!("{summary}");
    }
    Ok(())
}

/// Prints the decision and returns whether the rule may run.
pub fn gate(ctx: &Context, args: GateArgs) -> Result<bool> {
    let tree = load_tree(ctx, &args.tenant)?;
    let decision = PolicyGate::new(&ctx.registries)
        .with_legacy_aliases(legacy_aliases(ctx)?)
        .evaluate(&tree, &args.event);

    if args.json {
        println!("{}", serde_json::to_string(&decision)?);
        return Ok(decision.allowed);
    }
    let verdict = match (should_use_color(), decision.allowed) {
        (false, true) => "run".to_string(),
        (false, false) => "skip".to_string(),
        (true, true) => "run".green().to_string(),
        (true, false) => "skip".yellow().to_string(),
    };
    println!("{verdict}: {} ({})", decision.event, decision.reason);
    Ok(decision.allowed)
}

pub fn set(ctx: &Context, args: SetArgs) -> Result<()> {
    let mut update = BulkUpdate::new();
    if let Some(enabled) = args.enabled {
        update = update.with_enabled(enabled);
    }
    for (field, value) in args.params {
        update = update.with_criterion(&field, value);
    }
    if update.is_empty() {
        bail!("nothing to update: pass --enabled or --param");
    }

    let concurrency = match (args.expect_revision, args.checked) {
        (Some(revision), _) => Concurrency::Expect(revision),
        (None, true) => Concurrency::Checked,
        (None, false) => Concurrency::LastWriterWins,
    };
    let revision = update_event_policy(
        &ctx.store,
        &ctx.registries,
        &args.tenant,
        &args.event,
        &update,
        concurrency,
    )?;
    println!("updated {} for {} (revision {revision})", args.event, args.tenant);
    Ok(())
}

pub fn audit(ctx: &Context, args: AuditArgs) -> Result<()> {
    let Some(doc) = ctx.store.fetch(&args.tenant)? else {
        bail!("no config stored for tenant {}", args.tenant);
    };
    let manager = ConfigManager::new(&ctx.registries)?;
    let findings = manager.audit(&doc.value);
    if findings.is_empty() {
        println!("{}: clean (revision {})", args.tenant, doc.revision);
        return Ok(());
    }
    for finding in &findings {
        let pointer = if finding.json_pointer.is_empty() { "/" } else { &finding.json_pointer };
        println!("{pointer}: {}", finding.message);
    }
    bail!("{} schema violations in tenant {}", findings.len(), args.tenant)
}
