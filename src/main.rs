//! microforest - Main Entry Point
//!
//! Trains a random forest and ports it to a microcontroller header.

use clap::Parser;
use microforest::cli::{cmd_experiment, cmd_port, Cli, Commands, RunArgs};

fn main() -> anyhow::Result<()> {
    // Initialize logging
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "microforest=info".into()),
        )
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();

    match cli.command {
        Some(Commands::Experiment { args, train_ratio, stratify, samples }) => {
            cmd_experiment(&args, train_ratio, stratify, &samples)?;
        }
        Some(Commands::Port { args }) => {
            cmd_port(&args)?;
        }
        None => {
            // Default: the fixed Iris experiment
            cmd_experiment(&RunArgs::default(), 0.75, false, &[])?;
        }
    }

    Ok(())
}
