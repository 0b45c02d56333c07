//! `relay` binary: loads a specification file, registers the built-in
//! modules, and serves the declared endpoints over HTTP.

use std::path::PathBuf;
use std::sync::Arc;

use anyhow::Result;
use clap::Parser;
use relay_engine::{ModuleRegistry, StepExecutor};

/// Serve declaratively defined HTTP request pipelines.
#[derive(Debug, Parser)]
#[command(name = "relay", version, about)]
struct Cli {
    /// Path to the endpoint specification file.
    #[arg(long, default_value = "./relay.yaml")]
    spec: PathBuf,
    /// Address to listen on.
    #[arg(long, default_value = "127.0.0.1:8080")]
    listen: String,
}

#[tokio::main]
async fn main() -> Result<()> {
    init_tracing();
    let cli = Cli::parse();

    let spec = relay_host::load_spec(&cli.spec)?;
    tracing::info!(name = %spec.name, endpoints = spec.endpoints.len(), "loaded specification");

    let registry = Arc::new(ModuleRegistry::with_modules(relay_modules::builtin_modules()));
    let executor = Arc::new(StepExecutor::new(registry));
    let router = relay_host::build_router(&spec, executor)?;

    relay_host::serve(&cli.listen, router).await
}

fn init_tracing() {
    let filter = std::env::var("RUST_LOG").unwrap_or_else(|_| "info".into());
    let _ = tracing_subscriber::fmt().with_env_filter(filter).try_init();
}
