use std::{fs, path::Path, path::PathBuf, sync::Arc};

use anyhow::{Context, Result};
use clap::{Args, Parser, Subcommand};
use logctx_fields::{FieldBinding, FieldBindings, FieldRecord, FieldRegistry, FieldsConfig};
use logctx_types::SessionAccessor;
use logctx_util::{MemorySession, ProcessToken, RequestSnapshot};
use serde::de::DeserializeOwned;
use tracing::info;
use tracing_subscriber::EnvFilter;

/// Evaluate contextual log fields for a captured request.
#[derive(Parser, Debug)]
#[command(name = "logctx", version, about)]
struct Cli {
    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Evaluate fields and print the resulting record as JSON
    Eval(EvalArgs),
    /// List the built-in field names
    Fields,
}

#[derive(Args, Debug)]
struct EvalArgs {
    /// Request snapshot (JSON)
    #[arg(long)]
    request: PathBuf,

    /// Session snapshot (JSON)
    #[arg(long)]
    session: Option<PathBuf>,

    /// Field configuration; defaults to $LOGCTX_CONFIG_PATH or the user config directory
    #[arg(long)]
    config: Option<PathBuf>,

    /// Environment label, overriding the configured one
    #[arg(long)]
    environment: Option<String>,

    /// Record entry as key=binding, e.g. cart=fromSession:cart_id (repeatable)
    #[arg(long = "field", value_parser = parse_field_assignment)]
    fields: Vec<(String, FieldBinding)>,

    /// Process token to report instead of a generated one
    #[arg(long)]
    token: Option<String>,
}

fn main() -> Result<()> {
    init_tracing();
    match Cli::parse().command {
        Command::Eval(args) => {
            let record = run_eval(&args)?;
            println!("{}", serde_json::to_string_pretty(&record)?);
        }
        Command::Fields => {
            for name in FieldRegistry::new().field_names() {
                println!("{name}");
            }
        }
    }
    Ok(())
}

fn init_tracing() {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    let _ = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .try_init();
}

fn run_eval(args: &EvalArgs) -> Result<FieldRecord> {
    let config = match &args.config {
        Some(path) => logctx_fields::load_config_from_path(path),
        None => logctx_fields::load_config(),
    }
    .context("failed to load field configuration")?;

    let request: RequestSnapshot = read_json(&args.request)?;
    let session: Option<Arc<dyn SessionAccessor>> = match &args.session {
        Some(path) => Some(Arc::new(read_json::<MemorySession>(path)?)),
        None => None,
    };

    let registry = build_registry(&config, request, session, args);
    let bindings = if args.fields.is_empty() {
        config.bindings()
    } else {
        args.fields.iter().cloned().collect::<FieldBindings>()
    };

    let record = registry.evaluate_record(&bindings)?;
    info!(binding_count = bindings.len(), field_count = record.len(), "record evaluated");
    Ok(record)
}

fn build_registry(
    config: &FieldsConfig,
    request: RequestSnapshot,
    session: Option<Arc<dyn SessionAccessor>>,
    args: &EvalArgs,
) -> FieldRegistry {
    let mut registry = FieldRegistry::new();
    config.apply(&mut registry);
    if let Some(session) = session {
        registry.set_session_accessor(session);
    }
    registry.set_request_accessor(Arc::new(request));
    if let Some(environment) = &args.environment {
        registry.set_environment(environment.clone());
    }
    let token = match &args.token {
        Some(token) => ProcessToken::from_token(token.clone()),
        None => ProcessToken::generate(),
    };
    registry.set_token_accessor(Arc::new(token));
    registry
}

fn read_json<T: DeserializeOwned>(path: &Path) -> Result<T> {
    let content = fs::read_to_string(path).with_context(|| format!("Failed to read {}", path.display()))?;
    serde_json::from_str(&content).with_context(|| format!("Failed to parse {}", path.display()))
}

fn parse_field_assignment(raw: &str) -> Result<(String, FieldBinding), String> {
    let (key, binding) = raw
        .split_once('=')
        .ok_or_else(|| format!("expected key=binding, got '{raw}'"))?;
    let key = key.trim();
    if key.is_empty() {
        return Err(format!("missing record key in '{raw}'"));
    }
    let binding = binding.parse::<FieldBinding>().map_err(|error| error.to_string())?;
    Ok((key.to_string(), binding))
}
