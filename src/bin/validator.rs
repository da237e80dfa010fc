//! Schema Validator CLI
//!
//! Validates a JSON payload against the schema documented for an endpoint.

use std::io::Read;
use std::path::PathBuf;

use anyhow::Context;
use api_schemas::{SchemaConfig, SchemaError, SchemaResolver};
use clap::Parser;
use tracing_subscriber::EnvFilter;

#[derive(Parser)]
#[command(name = "schema-validator")]
#[command(about = "Validate a JSON payload against an API schema")]
struct Cli {
    /// Component key or request path (e.g. /api/v1/me/)
    component: String,

    /// Operation name (get, post, options, unauthorized, ...)
    operation: String,

    /// API version, optional when only one is registered
    #[arg(short, long)]
    version: Option<String>,

    /// Payload file, `-` for stdin
    #[arg(short, long, default_value = "-")]
    file: String,

    /// Print a JSON report instead of text
    #[arg(long)]
    report: bool,

    /// Configuration file (defaults to schemas.toml lookup)
    #[arg(short, long)]
    config: Option<String>,

    /// Extra directories of schema definition files
    #[arg(short, long)]
    schemas: Vec<PathBuf>,
}

fn main() {
    let cli = Cli::parse();

    let result = run(cli);
    if let Err(e) = &result {
        eprintln!("Error: {:#}", e);
    }
    std::process::exit(exit_code(&result));
}

/// 0 valid, 1 invalid payload, 2 anything else
fn exit_code(result: &anyhow::Result<bool>) -> i32 {
    match result {
        Ok(true) => 0,
        Ok(false) => 1,
        Err(_) => 2,
    }
}

/// Returns whether the payload is valid
fn run(cli: Cli) -> anyhow::Result<bool> {
    let mut config = SchemaConfig::load_from(cli.config.as_deref()).context("loading configuration")?;
    config.registry.schema_dirs.extend(cli.schemas.iter().cloned());

    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(&config.logging.filter)),
        )
        .with_writer(std::io::stderr)
        .init();

    let resolver = SchemaResolver::from_config(&config)?;
    check(&resolver, &cli)
}

/// Validate the payload named by `cli` and print the outcome
fn check(resolver: &SchemaResolver, cli: &Cli) -> anyhow::Result<bool> {
    let payload = read_payload(&cli.file)?;

    let result = resolver.validate(&payload, &cli.component, &cli.operation, cli.version.as_deref());
    let failures = match result {
        Ok(()) => Vec::new(),
        Err(SchemaError::ValidationFailed { failures, .. }) => failures,
        Err(e) => return Err(e.into()),
    };
    let version = resolver.select_version(cli.version.as_deref())?;

    if cli.report {
        let report = serde_json::json!({
            "generated_at": chrono::Utc::now().to_rfc3339(),
            "component": cli.component,
            "operation": cli.operation,
            "version": version,
            "valid": failures.is_empty(),
            "errors": failures,
        });
        println!("{}", serde_json::to_string_pretty(&report)?);
    } else if failures.is_empty() {
        println!("✅ {} {} ({}) - valid", cli.component, cli.operation, version);
    } else {
        println!("❌ {} {} ({}) - {} error(s)", cli.component, cli.operation, version, failures.len());
        for failure in &failures {
            println!("   └─ [{}] {}", failure.keyword, failure);
        }
    }

    Ok(failures.is_empty())
}

fn read_payload(file: &str) -> anyhow::Result<serde_json::Value> {
    let content = if file == "-" {
        let mut buf = String::new();
        std::io::stdin().read_to_string(&mut buf)?;
        buf
    } else {
        std::fs::read_to_string(file).with_context(|| format!("reading {}", file))?
    };
    serde_json::from_str(&content).with_context(|| format!("parsing {} as JSON", file))
}
