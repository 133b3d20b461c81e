//! metamorph binary — CLI entry for the evolution loop.

use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

use anyhow::{bail, Result};
use clap::Parser;
use tracing_subscriber::EnvFilter;

use metamorph::evolve::{EvolveConfig, Evolution};
use metamorph::llm::credentials::CredentialStore;
use metamorph::llm::LlmClient;

/// Evolve a single program artifact with LLM-proposed rewrites, gated by
/// checkpoints, a diff review, and a safety classification.
#[derive(Debug, Parser)]
#[command(name = "metamorph", version, about)]
struct Cli {
    /// Model to use for evolution.
    #[arg(short, long, default_value = "gemini-2.5-flash")]
    model: String,

    /// Model to use for the safety gate (defaults to the evolution model).
    #[arg(long)]
    safety_model: Option<String>,

    /// Temperature for model creativity (0.0-1.0).
    #[arg(short, long, default_value_t = 0.7)]
    temperature: f32,

    /// Checkpoint the current artifact, then restart from the seed.
    #[arg(long)]
    restart: bool,

    /// The artifact file to evolve.
    #[arg(long, default_value = "main.py")]
    artifact: PathBuf,

    /// Pristine seed artifact used by --restart.
    #[arg(long)]
    seed: Option<PathBuf>,

    /// Harness source file embedded into the generation prompt.
    #[arg(long)]
    harness_reference: Option<PathBuf>,

    /// Directory for checkpoint snapshots.
    #[arg(long, default_value = "checkpoints")]
    checkpoint_dir: PathBuf,

    /// Intermediate runner invoked to execute the artifact.
    #[arg(long, default_value = "run_main.py")]
    runner: PathBuf,

    /// Interpreter for the runner process.
    #[arg(long, default_value = "python3")]
    interpreter: String,

    /// Wall-clock limit for artifact execution, in seconds.
    #[arg(long, default_value_t = 30)]
    exec_timeout: u64,

    /// Skip executing the artifact after each cycle.
    #[arg(long)]
    no_run: bool,
}

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn")),
        )
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();

    if !(0.0..=1.0).contains(&cli.temperature) {
        bail!("temperature must be between 0.0 and 1.0");
    }

    let config = EvolveConfig {
        artifact: cli.artifact,
        checkpoint_dir: cli.checkpoint_dir,
        runner: cli.runner,
        seed: cli.seed,
        harness_reference: cli.harness_reference,
        interpreter: cli.interpreter,
        safety_model: cli.safety_model.unwrap_or_else(|| cli.model.clone()),
        model: cli.model,
        temperature: cli.temperature,
        exec_timeout: Duration::from_secs(cli.exec_timeout),
        run_after_cycle: !cli.no_run,
        ..EvolveConfig::default()
    };

    let credentials = Arc::new(CredentialStore::new());
    let client = LlmClient::new(credentials);
    let mut evolution = Evolution::new(config, client);

    if cli.restart {
        evolution.restart_from_seed()?;
    }

    evolution.run().await?;
    Ok(())
}
