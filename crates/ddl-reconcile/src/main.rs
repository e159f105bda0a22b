//! ddl-reconcile CLI
//!
//! Command-line front end: reads a model manifest and a live snapshot from
//! JSON files and prints the DDL that reconciles them. Never executes it.

use std::fs;
use std::path::{Path, PathBuf};

use anyhow::{bail, Context};
use clap::{Parser, Subcommand, ValueEnum};
use tracing::{info, warn, Level};
use tracing_subscriber::FmtSubscriber;

use ddl_reconcile::prelude::*;

/// Reconciles a declared entity model against a live database schema.
#[derive(Parser)]
#[command(name = "ddl-reconcile")]
#[command(author, version, about, long_about = None)]
struct Cli {
    /// Target database engine.
    #[arg(short, long, env = "DDL_RECONCILE_DIALECT", default_value = "POSTGRES")]
    dialect: String,

    /// Enable verbose output.
    #[arg(short, long)]
    verbose: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Clone, Copy, ValueEnum)]
enum SummaryFormat {
    Text,
    Json,
}

#[derive(Subcommand)]
enum Commands {
    /// Print the DDL that brings the live schema in line with the model.
    Diff {
        /// Model manifest (JSON).
        #[arg(short, long, env = "DDL_RECONCILE_MODEL")]
        model: PathBuf,

        /// Live schema snapshot (JSON).
        #[arg(short, long, env = "DDL_RECONCILE_SNAPSHOT")]
        snapshot: PathBuf,

        /// Policy file (JSON); flags below override it.
        #[arg(short, long)]
        policy: Option<PathBuf>,

        /// Do not emit missing indexes.
        #[arg(long)]
        no_indexes: bool,

        /// Do not emit foreign key changes.
        #[arg(long)]
        no_foreign_keys: bool,

        /// Emit DROP statements for obsolete foreign keys.
        #[arg(long)]
        allow_drop: bool,

        /// Summary format printed to stderr.
        #[arg(long, value_enum, default_value = "text")]
        summary: SummaryFormat,

        /// Write the script to a file instead of stdout.
        #[arg(short, long)]
        output: Option<PathBuf>,

        /// Replay the changes and check that a second diff is empty.
        #[arg(long)]
        verify: bool,
    },

    /// Print the full schema for a model.
    Schema {
        /// Model manifest (JSON).
        #[arg(short, long, env = "DDL_RECONCILE_MODEL")]
        model: PathBuf,
    },

    /// List registered dialects.
    Dialects,
}

fn load_policy(path: Option<&Path>) -> anyhow::Result<DiffPolicy> {
    match path {
        Some(path) => {
            let content = fs::read_to_string(path)
                .with_context(|| format!("Cannot read policy {}", path.display()))?;
            serde_json::from_str(&content)
                .with_context(|| format!("Malformed policy {}", path.display()))
        }
        None => Ok(DiffPolicy::default()),
    }
}

fn write_script(script: &str, output: Option<&Path>) -> anyhow::Result<()> {
    match output {
        Some(path) => {
            fs::write(path, script)
                .with_context(|| format!("Cannot write {}", path.display()))?;
            info!("Wrote {}", path.display());
        }
        None => print!("{script}"),
    }
    Ok(())
}

fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    // Setup logging
    let log_level = if cli.verbose {
        Level::DEBUG
    } else {
        Level::INFO
    };
    let subscriber = FmtSubscriber::builder()
        .with_max_level(log_level)
        .with_target(false)
        .without_time()
        .with_writer(std::io::stderr)
        .finish();
    tracing::subscriber::set_global_default(subscriber)?;

    let registry = DialectRegistry::with_builtins();

    match cli.command {
        Commands::Dialects => {
            for id in registry.supported_databases() {
                println!("{id}");
            }
        }

        Commands::Schema { model } => {
            let generator = DdlGenerator::for_database(&cli.dialect, &registry)?;
            let entities = ManifestFile::new(model).declared_model()?;
            let report = generator.generate_schema_report(&entities);
            let mut script: String = report
                .warnings
                .iter()
                .map(|w| format!("-- warning: {w}\n"))
                .collect();
            script.extend(report.statements.iter().map(|s| format!("{s};\n")));
            print!("{script}");
        }

        Commands::Diff {
            model,
            snapshot,
            policy,
            no_indexes,
            no_foreign_keys,
            allow_drop,
            summary,
            output,
            verify,
        } => {
            let mut policy = load_policy(policy.as_deref())?;
            if no_indexes {
                policy.manage_indexes = false;
            }
            if no_foreign_keys {
                policy.manage_foreign_keys = false;
            }
            if allow_drop {
                policy.allow_dropping_foreign_keys = true;
            }

            let generator = DdlGenerator::for_database(&cli.dialect, &registry)?;
            let model = ManifestFile::new(model);
            let snapshot = SnapshotFile::new(snapshot);
            let result = reconcile(&model, &snapshot, &policy, &generator)?;

            write_script(&result.to_script(), output.as_deref())?;

            match summary {
                SummaryFormat::Text => eprintln!("{}", result.summary()),
                SummaryFormat::Json => {
                    eprintln!("{}", serde_json::to_string_pretty(&result.summary())?)
                }
            }

            if verify {
                let live = snapshot.live_snapshot()?;
                let replayed = apply_changes(&live, &result.changes, generator.dialect())?;
                let entities = model.declared_model()?;
                let second = generate_diff_ddl(&entities, &replayed, &policy, &generator);
                if !second.is_empty() {
                    for statement in second.executable() {
                        warn!("Not converged: {statement}");
                    }
                    bail!(
                        "Diff did not converge: {} statements remain after replay",
                        second.summary().total_statements
                    );
                }
                info!("Verified: replaying the diff leaves nothing to change");
            }
        }
    }

    Ok(())
}
