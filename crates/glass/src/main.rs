//! glass - looking glass for network diagnostics
//!
//! Commands:
//! - list: Show routers and their commands
//! - run: Validate and run one command on a router
//! - refresh: Recompute live options and remember them
//! - store: Inspect or edit the persistent store
//! - init: Write a starter configuration

use anyhow::{bail, Context, Result};
use clap::{Parser, Subcommand};
use glass::{config::GlassConfig, store::PersistentStorage, Router};
use glass_core::Paths;
use serde_json::{json, Value};
use std::path::{Path, PathBuf};
use tracing_subscriber::EnvFilter;

#[derive(Parser)]
#[command(name = "glass")]
#[command(about = "Looking glass: run validated diagnostic commands on local or remote routers")]
#[command(version)]
#[command(after_help = r#"WORKFLOW:
    1. glass init                     # write ~/.config/glass/glass.yaml
    2. glass list                     # see routers and numbered commands
    3. glass run localhost 1 4 example.net
    4. glass refresh                  # re-read live options (e.g. BGP peers)

Every value is checked against its parameter before any command text is
built. Rejected or failed runs print a short error only; details go to the
log file configured in settings.log_file.
"#)]
struct Cli {
    /// Configuration file (default: ~/.config/glass/glass.yaml)
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// List routers and their commands (alias: ls)
    #[command(alias = "ls")]
    List {
        /// Only this router
        router: Option<String>,

        /// Output as JSON
        #[arg(long)]
        json: bool,
    },

    /// Run a command by router name and command number
    Run {
        /// Router name
        router: String,

        /// Command number as shown by `glass list`
        index: usize,

        /// Parameter values, in slot order
        values: Vec<String>,
    },

    /// Recompute live command options and remember them
    Refresh,

    /// Inspect or edit the persistent store
    Store {
        #[command(subcommand)]
        action: StoreAction,
    },

    /// Write a starter configuration
    Init {
        /// Overwrite an existing configuration
        #[arg(long)]
        force: bool,
    },
}

#[derive(Subcommand)]
enum StoreAction {
    /// Print one value
    Get { key: String },
    /// Set a value (JSON, or a plain string)
    Set { key: String, value: String },
    /// Delete a key
    Delete { key: String },
    /// List all keys
    List,
}

fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();
    let config_path = cli.config.unwrap_or_else(|| Paths::new().config_file());

    match cli.command {
        Commands::List { router, json } => cmd_list(&config_path, router.as_deref(), json),
        Commands::Run {
            router,
            index,
            values,
        } => cmd_run(&config_path, &router, index, &values),
        Commands::Refresh => cmd_refresh(&config_path),
        Commands::Store { action } => cmd_store(&config_path, action),
        Commands::Init { force } => cmd_init(&config_path, force),
    }
}

/// Configuration, routers with remembered options, and the store
fn load(config_path: &Path) -> Result<(GlassConfig, Vec<Router>, PersistentStorage)> {
    let config = GlassConfig::load_from(config_path)?;
    let routers = config
        .build_routers()
        .with_context(|| format!("Invalid configuration in {}", config_path.display()))?;
    let store = PersistentStorage::load(&config.settings.storage_file)?;

    for router in &routers {
        let restored = store.restore_options(router);
        tracing::debug!(router = router.name(), restored, "restored stored options");
    }

    Ok((config, routers, store))
}

fn find_router<'a>(routers: &'a [Router], name: &str) -> Result<&'a Router> {
    match routers.iter().find(|r| r.name() == name) {
        Some(router) => Ok(router),
        None => bail!("Unknown router: {} (see `glass list`)", name),
    }
}

fn cmd_list(config_path: &Path, only: Option<&str>, json_output: bool) -> Result<()> {
    let (_, routers, _) = load(config_path)?;

    let selected: Vec<&Router> = match only {
        Some(name) => vec![find_router(&routers, name)?],
        None => routers.iter().collect(),
    };

    if json_output {
        let listing: Vec<Value> = selected.iter().map(|r| router_json(r)).collect();
        println!("{}", serde_json::to_string_pretty(&listing)?);
        return Ok(());
    }

    if selected.is_empty() {
        println!("No routers configured. Run `glass init` to create a starter configuration.");
        return Ok(());
    }

    for router in selected {
        let backend = router
            .backend()
            .map(|b| b.describe())
            .unwrap_or_else(|| "no backend".to_string());
        println!("{} [{}]", router.name(), backend);

        for (idx, command) in router.commands().iter().enumerate() {
            println!("  {:>2}  {}", idx, command.name());
            for param in command.param_specs() {
                let options = param.options();
                if options.is_empty() {
                    println!("        <{}> {} default={:?}", param.name(), param.kind(), param.default_value());
                } else {
                    let values: Vec<&str> = options.iter().map(|o| o.value.as_str()).collect();
                    println!(
                        "        <{}> {} [{}] default={:?}",
                        param.name(),
                        param.kind(),
                        values.join(", "),
                        param.default_value()
                    );
                }
            }
        }
        println!();
    }

    Ok(())
}

fn router_json(router: &Router) -> Value {
    let commands: Vec<Value> = router
        .commands()
        .iter()
        .enumerate()
        .map(|(idx, command)| {
            let params: Vec<Value> = command
                .param_specs()
                .iter()
                .map(|p| {
                    json!({
                        "name": p.name(),
                        "kind": p.kind(),
                        "default": p.default_value(),
                        "options": p.options(),
                    })
                })
                .collect();
            json!({ "index": idx, "name": command.name(), "parameters": params })
        })
        .collect();

    json!({
        "name": router.name(),
        "backend": router.backend().map(|b| b.describe()),
        "fork_needed": router.fork_needed(),
        "commands": commands,
    })
}

fn cmd_run(config_path: &Path, router: &str, index: usize, values: &[String]) -> Result<()> {
    let (_, routers, _) = load(config_path)?;
    let router = find_router(&routers, router)?;

    let result = router.dispatch_index(index, values, None)?;
    println!("{}", result);
    Ok(())
}

fn cmd_refresh(config_path: &Path) -> Result<()> {
    let (config, routers, mut store) = load(config_path)?;

    for router in &routers {
        let report = router.refresh();
        let saved = store.remember_options(router)?;

        println!(
            "{}: {} refreshed, {} failed, {} option sets stored",
            router.name(),
            report.refreshed,
            report.failures.len(),
            saved
        );
        for failure in &report.failures {
            println!("  {:>2}  {}: {}", failure.index, failure.command, failure.error);
        }
    }

    store.save(&config.settings.storage_file)?;
    Ok(())
}

fn cmd_store(config_path: &Path, action: StoreAction) -> Result<()> {
    let config = GlassConfig::load_from(config_path)?;
    let path = &config.settings.storage_file;
    let mut store = PersistentStorage::load(path)?;

    match action {
        StoreAction::Get { key } => match store.get(&key) {
            Some(value) => println!("{}", serde_json::to_string_pretty(value)?),
            None => bail!("No such key: {}", key),
        },
        StoreAction::Set { key, value } => {
            let value = serde_json::from_str(&value).unwrap_or(Value::String(value));
            store.set(&key, value);
            store.save(path)?;
            println!("Set {}", key);
        }
        StoreAction::Delete { key } => {
            if store.delete(&key) {
                store.save(path)?;
                println!("Deleted {}", key);
            } else {
                println!("No such key: {}", key);
            }
        }
        StoreAction::List => {
            for key in store.entries().keys() {
                println!("{}", key);
            }
        }
    }

    Ok(())
}

fn cmd_init(config_path: &Path, force: bool) -> Result<()> {
    if config_path.exists() && !force {
        bail!(
            "Configuration already exists at {} (use --force to overwrite)",
            config_path.display()
        );
    }

    GlassConfig::sample().save_to(config_path)?;
    println!("Wrote starter configuration to {}", config_path.display());
    Ok(())
}
