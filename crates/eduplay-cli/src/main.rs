mod scenario;
mod simulate;

use std::path::PathBuf;

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};

use eduplay_core::{AttentionConfig, ModelOptions, CAPTURE_FRAME_SIZE, MODEL_LOCATION};

use crate::scenario::Scenario;

#[derive(Parser)]
#[command(
    name = "eduplay",
    version,
    about = "EduPlay - attentive lesson playback",
    long_about = "Pauses lesson video when the learner leaves the webcam frame.\nRun scripted lesson scenarios against the attention runtime."
)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Play a lesson scenario against the attention runtime
    Simulate {
        /// Path to the scenario .toml file
        #[arg()]
        scenario: PathBuf,

        /// Attention config file (default: built-in defaults)
        #[arg(short, long)]
        config: Option<PathBuf>,

        /// Directory of still images to use as the webcam
        #[arg(long)]
        frames: Option<PathBuf>,

        /// Print the report as JSON
        #[arg(long)]
        json: bool,
    },

    /// Print or write the attention config
    Config {
        /// Validate and print this config file instead of the defaults
        #[arg(short, long)]
        file: Option<PathBuf>,

        /// Write the config to this path
        #[arg(long)]
        write: Option<PathBuf>,
    },

    /// Display version and detector info
    Info,
}

fn main() -> Result<()> {
    let cli = Cli::parse();

    // Logs go to stderr so `simulate --json` keeps stdout parseable.
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info")),
        )
        .with_writer(std::io::stderr)
        .init();

    match cli.command {
        Commands::Simulate {
            scenario,
            config,
            frames,
            json,
        } => run_async(cmd_simulate(scenario, config, frames, json)),
        Commands::Config { file, write } => cmd_config(file, write),
        Commands::Info => cmd_info(),
    }
}

fn run_async<F>(future: F) -> Result<()>
where
    F: std::future::Future<Output = Result<()>>,
{
    let runtime = tokio::runtime::Builder::new_current_thread()
        .enable_all()
        .build()
        .context("failed to initialize async runtime")?;
    runtime.block_on(future)
}

fn load_config(path: Option<&PathBuf>) -> Result<AttentionConfig> {
    match path {
        Some(path) => AttentionConfig::load_from_file(path)
            .with_context(|| format!("failed to load config: {}", path.display())),
        None => Ok(AttentionConfig::default()),
    }
}

async fn cmd_simulate(
    scenario_path: PathBuf,
    config_path: Option<PathBuf>,
    frames: Option<PathBuf>,
    json: bool,
) -> Result<()> {
    let config = load_config(config_path.as_ref())?;
    let scenario = Scenario::load(&scenario_path)?;
    tracing::info!(
        "Simulating '{}' for {}ms (sampling every {}ms)",
        scenario.title(),
        scenario.duration_ms,
        config.sampling.interval_ms
    );

    let report = simulate::run(&scenario, config, frames).await?;
    if json {
        println!("{}", serde_json::to_string_pretty(&report)?);
    } else {
        report.print();
    }
    Ok(())
}

fn cmd_config(file: Option<PathBuf>, write: Option<PathBuf>) -> Result<()> {
    let config = load_config(file.as_ref())?;
    match write {
        Some(path) => {
            config
                .save_to_file(&path)
                .with_context(|| format!("failed to write config: {}", path.display()))?;
            tracing::info!("Wrote attention config to {}", path.display());
        }
        None => print!("{}", config.to_toml()?),
    }
    Ok(())
}

fn cmd_info() -> Result<()> {
    let defaults = AttentionConfig::default();
    let options = ModelOptions::fixed();
    println!("🎓 EduPlay Attention");
    println!("   Version:      {}", env!("CARGO_PKG_VERSION"));
    println!("   Model:        {}", MODEL_LOCATION);
    println!("   Mode:         {}", options.mode);
    println!("   Confidence:   >= {}", options.min_detection_confidence);
    println!("   Capture:      {}", CAPTURE_FRAME_SIZE);
    println!("   Sampling:     every {}ms", defaults.sampling.interval_ms);
    println!(
        "   Load timeout: {}",
        match defaults.model_load_timeout() {
            Some(limit) => format!("{}ms", limit.as_millis()),
            None => "none".to_string(),
        }
    );
    Ok(())
}
