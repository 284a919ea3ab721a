//! pcheck - parameter checker for network-element configuration dumps
//!
//! `pcheck run` validates every dump file of the configured vendor and
//! technology groups and writes one result database per dump.
//! `pcheck compile` prints the validation queries of a group without
//! touching any dump. `pcheck init` writes a config file with the defaults.

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use pcheck::{compile, load_catalog, Dialect};
use pcheck_common::config::{
    init_config_file, load_or_default, resolve_root_folder, Overrides, Settings, TomlConfig,
    CONFIG_FILE_NAME,
};
use pcheck_common::Group;
use std::path::PathBuf;
use tokio::signal;
use tokio_util::sync::CancellationToken;
use tracing::{info, warn};
use tracing_subscriber::EnvFilter;

/// Command-line arguments for pcheck
#[derive(Parser, Debug)]
#[command(name = "pcheck")]
#[command(about = "Validate network-element configuration dumps against rule catalogs")]
#[command(version = concat!(env!("CARGO_PKG_VERSION"), " (", env!("PCHECK_REVISION"), ")"))]
struct Cli {
    /// Root folder holding the rule store, template, dumps and outputs
    #[arg(short, long, global = true, env = "PCHECK_ROOT_FOLDER")]
    root: Option<PathBuf>,

    /// TOML configuration file
    #[arg(short, long, global = true, env = "PCHECK_CONFIG")]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Validate all dump files of the selected groups
    Run {
        /// Maximum number of files processed at once
        #[arg(short, long)]
        workers: Option<usize>,

        /// Restrict the run to a group, e.g. Huawei-2G (repeatable)
        #[arg(short, long = "group")]
        groups: Vec<Group>,
    },

    /// Print the compiled validation queries of one group
    Compile {
        /// Group whose rules are compiled, e.g. Nokia-4G
        #[arg(short, long)]
        group: Group,

        /// SQL dialect to render
        #[arg(short, long, value_enum, default_value_t = Dialect::Sqlite)]
        dialect: Dialect,

        /// Print JSON instead of annotated SQL
        #[arg(long)]
        json: bool,
    },

    /// Write pcheck.toml with the compiled defaults into the root folder
    Init {
        /// Replace an existing file
        #[arg(long)]
        force: bool,
    },
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    // The file may not exist yet, so init never loads one
    if let Command::Init { force } = cli.command {
        let config = TomlConfig::default();
        init_tracing(&config);
        return init(cli.config, cli.root, &config, force);
    }

    let (config, config_source) = load_or_default(cli.config.as_deref(), cli.root.as_deref())
        .context("Failed to load configuration")?;

    init_tracing(&config);

    info!(
        "Starting pcheck v{} [{}] built {} ({})",
        env!("CARGO_PKG_VERSION"),
        env!("PCHECK_REVISION"),
        env!("PCHECK_BUILT_ON"),
        env!("PCHECK_PROFILE")
    );
    match &config_source {
        Some(path) => info!("Loaded configuration from {}", path.display()),
        None => warn!("No configuration file found, using compiled defaults"),
    }

    match cli.command {
        Command::Run { workers, groups } => {
            let overrides = Overrides {
                root_folder: cli.root,
                max_workers: workers,
                groups,
            };
            run(&config, &overrides).await
        }
        Command::Compile {
            group,
            dialect,
            json,
        } => {
            let overrides = Overrides {
                root_folder: cli.root,
                max_workers: None,
                groups: vec![group],
            };
            print_queries(&config, &overrides, group, dialect, json).await
        }
        Command::Init { .. } => Ok(()),
    }
}

/// `RUST_LOG` wins over the configured level. Logs go to stderr so that
/// compiled queries on stdout stay clean.
fn init_tracing(config: &TomlConfig) {
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(&config.logging.level));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();
}

async fn run(config: &TomlConfig, overrides: &Overrides) -> Result<()> {
    let settings = Settings::resolve(config, overrides).context("Invalid configuration")?;
    info!("Root folder: {}", settings.root_folder.display());
    info!("Rule store: {}", settings.rule_store.display());
    info!("Template: {}", settings.template.display());

    let cancel = CancellationToken::new();
    let signal_token = cancel.clone();
    tokio::spawn(async move {
        if signal::ctrl_c().await.is_ok() {
            warn!("Received Ctrl+C, finishing in-flight files");
            signal_token.cancel();
        }
    });

    let report = pcheck::run(&settings, cancel)
        .await
        .context("Validation run aborted")?;

    for group in &report.groups {
        for failure in &group.failed {
            warn!(
                group = %group.group,
                file = %failure.source.display(),
                "Not validated: {}",
                failure.error
            );
        }
    }
    info!(
        run_id = %report.run_id,
        completed = report.files_completed(),
        failed = report.files_failed(),
        not_scheduled = report.files_not_scheduled(),
        "Run finished"
    );
    Ok(())
}

fn init(
    config_path: Option<PathBuf>,
    root: Option<PathBuf>,
    config: &TomlConfig,
    force: bool,
) -> Result<()> {
    let path = config_path.unwrap_or_else(|| {
        resolve_root_folder(root.as_deref(), config).join(CONFIG_FILE_NAME)
    });
    init_config_file(&path, config, force)
        .with_context(|| format!("Failed to write {}", path.display()))?;
    info!("Wrote default configuration to {}", path.display());
    Ok(())
}

async fn print_queries(
    config: &TomlConfig,
    overrides: &Overrides,
    group: Group,
    dialect: Dialect,
    json: bool,
) -> Result<()> {
    let settings = Settings::resolve(config, overrides).context("Invalid configuration")?;
    let catalog = load_catalog(&settings.rule_store, group)
        .await
        .with_context(|| format!("Failed to load rule catalog for {}", group))?;
    let compiled = compile(&catalog, dialect);

    if json {
        println!("{}", serde_json::to_string_pretty(&compiled)?);
    } else {
        for (table, sql) in compiled.iter() {
            println!("-- {} ({})", table, dialect);
            println!("{};\n", sql);
        }
    }
    Ok(())
}
