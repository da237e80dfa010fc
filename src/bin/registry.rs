//! Schema Registry CLI
//!
//! Inspect the registered API schemas.

use std::path::PathBuf;

use anyhow::Context;
use api_schemas::{MatchKind, SchemaConfig, SchemaResolver};
use clap::{Parser, Subcommand};
use tracing_subscriber::EnvFilter;

#[derive(Parser)]
#[command(name = "schema-registry")]
#[command(about = "Inspect versioned API response schemas")]
struct Cli {
    /// Configuration file (defaults to schemas.toml lookup)
    #[arg(short, long)]
    config: Option<String>,

    /// Extra directories of schema definition files
    #[arg(short, long)]
    schemas: Vec<PathBuf>,

    /// Skip the schema bundle compiled into this binary
    #[arg(long)]
    no_embedded: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// List registered versions
    List,

    /// List components of a version
    Components {
        #[arg(short, long)]
        version: Option<String>,
    },

    /// Print the schema for a component and operation
    Show {
        /// Component key or request path (e.g. /api/v1/hosts/)
        component: String,
        /// Operation name (get, post, options, unauthorized, ...)
        operation: String,
        #[arg(short, long)]
        version: Option<String>,
    },

    /// Explain how a request path maps onto a component
    Resolve {
        path: String,
        #[arg(short, long)]
        version: Option<String>,
    },

    /// Print the registry fingerprint
    Checksum,

    /// Write the effective configuration to a TOML file
    SaveConfig {
        #[arg(default_value = "schemas.toml")]
        output: String,
    },
}

fn main() {
    let cli = Cli::parse();

    if let Err(e) = run(cli) {
        eprintln!("Error: {:#}", e);
        std::process::exit(1);
    }
}

fn run(cli: Cli) -> anyhow::Result<()> {
    let mut config = SchemaConfig::load_from(cli.config.as_deref()).context("loading configuration")?;
    config.registry.schema_dirs.extend(cli.schemas);
    if cli.no_embedded {
        config.registry.include_embedded = false;
    }

    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(&config.logging.filter)),
        )
        .init();

    match cli.command {
        Commands::SaveConfig { output } => {
            config.save(&output)?;
            println!("✅ Configuration written to {}", output);
            Ok(())
        }
        command => inspect(&SchemaResolver::from_config(&config)?, command),
    }
}

fn inspect(resolver: &SchemaResolver, command: Commands) -> anyhow::Result<()> {
    let registry = resolver.registry();

    match command {
        Commands::List => {
            if registry.is_empty() {
                println!("No schemas registered.");
                return Ok(());
            }
            println!("📚 Registered versions:");
            for version in registry.versions() {
                let count = registry.version(&version).map(|set| set.len()).unwrap_or(0);
                println!("  {} ({} components)", version, count);
            }
        }

        Commands::Components { version } => {
            let version = resolver.select_version(version.as_deref())?;
            let set = registry
                .version(version)
                .with_context(|| format!("version {} not registered", version))?;

            println!("📦 {} components in {}:", set.len(), version);
            for holder in set.holders() {
                let marker = if holder.key().has_metacharacters() {
                    " (pattern)"
                } else {
                    ""
                };
                println!(
                    "  {}{}  [{}] {} shared definition(s)",
                    holder.key(),
                    marker,
                    holder.operation_names().join(", "),
                    holder.definitions().len()
                );
            }
        }

        Commands::Show {
            component,
            operation,
            version,
        } => {
            let schema = resolver.resolve(version.as_deref(), &component, &operation)?;
            println!("{}", serde_json::to_string_pretty(&schema)?);
        }

        Commands::Resolve { path, version } => {
            let (version, holder, matched_by) = resolver.locate(version.as_deref(), &path)?;
            let how = match matched_by {
                MatchKind::Exact => "exact key".to_string(),
                MatchKind::Normalized(stage) => format!("normalized ({:?})", stage),
                MatchKind::Pattern => "pattern".to_string(),
            };
            println!("🔍 {} -> {} ({}, {})", path, holder.key(), version, how);
            println!("  operations: {}", holder.operation_names().join(", "));
        }

        Commands::Checksum => {
            println!("🔒 Registry checksum: {}", registry.checksum().as_str());
            for version in registry.versions() {
                if let Some(set) = registry.version(&version) {
                    for holder in set.holders() {
                        println!("  {}  {}:{}", holder.checksum().short(), version, holder.key());
                    }
                }
            }
        }

        Commands::SaveConfig { .. } => {}
    }

    Ok(())
}
