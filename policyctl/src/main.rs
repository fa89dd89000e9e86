use anyhow::Result;
use clap::{Parser, Subcommand};
use std::path::PathBuf;
use tracing_subscriber::{fmt, EnvFilter};

mod commands;

use commands::{catalog, tenant, Context};

/// Exit status of `gate` when the rule must not run.
const SKIP_EXIT_CODE: i32 = 3;

#[derive(Parser)]
#[command(name = "policyctl", version, about = "Inspect and edit tenant automation policies")]
struct Cli {
    /// Registry document replacing the built-in rule tables
    #[arg(long, global = true, env = "POLICY_REGISTRY_FILE")]
    registry: Option<PathBuf>,

    /// Directory holding one config document per tenant
    #[arg(long, global = true, env = "POLICY_STORE_DIR", default_value = ".policy/tenants")]
    store: PathBuf,

    #[command(subcommand)]
    cmd: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// List automation rules
    Catalog(catalog::CatalogArgs),
    /// Show the parameters of one rule
    Fields(catalog::FieldsArgs),
    /// Cross-check catalog, parameter schemas and descriptions
    Validate,
    /// Print the JSON Schema of a tenant document
    Schema,
    /// Write the default document for a new tenant
    Init(tenant::InitArgs),
    /// Show a tenant's policies, unset values as "not set"
    Show(tenant::ShowArgs),
    /// Decide whether a rule may run for a tenant (exit 0 = run, 3 = skip)
    Gate(tenant::GateArgs),
    /// Update one rule of a tenant
    Set(tenant::SetArgs),
    /// Report stored values that do not match the schema
    Audit(tenant::AuditArgs),
    /// Print version and exit
    Version,
}

fn init_tracing() {
    let _ = fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .with_target(false)
        .with_writer(std::io::stderr)
        .try_init();
}

fn main() -> Result<()> {
    init_tracing();
    let cli = Cli::parse();

    let registry = cli.registry.as_deref();
    let load = || Context::load(registry, &cli.store);

    match cli.cmd {
        Commands::Catalog(args) => catalog::list(&load()?, args)?,
        Commands::Fields(args) => catalog::fields(&load()?, args)?,
        Commands::Validate => catalog::validate(registry)?,
        Commands::Schema => catalog::schema(&load()?)?,
        Commands::Init(args) => tenant::init(&load()?, args)?,
        Commands::Show(args) => tenant::show(&load()?, args)?,
        Commands::Gate(args) => {
            if !tenant::gate(&load()?, args)? {
                std::process::exit(SKIP_EXIT_CODE);
            }
        }
        Commands::Set(args) => tenant::set(&load()?, args)?,
        Commands::Audit(args) => tenant::audit(&load()?, args)?,
        Commands::Version => println!("{}", env!("CARGO_PKG_VERSION")),
    }
    Ok(())
}
