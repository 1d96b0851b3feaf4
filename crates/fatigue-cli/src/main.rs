//! Fatigue Detect CLI - serve and train the fatigue face classifier.

use clap::Parser;
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

mod commands;
mod config;
mod output;

use commands::{serve::ServeArgs, train::TrainArgs, Cli, Commands};
use config::AppConfig;

fn main() -> std::process::ExitCode {
    let cli = Cli::parse();

    // RUST_LOG wins over -v; the server logs requests at info by default.
    let level = match (cli.verbose, &cli.command) {
        (0, Commands::Serve(_)) | (1, _) => "info",
        (0, _) => "warn",
        (2, _) => "debug",
        _ => "trace",
    };
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(level));

    tracing_subscriber::registry()
        .with(fmt::layer().with_writer(std::io::stderr))
        .with(filter)
        .init();

    let config = AppConfig::load();

    let result = match cli.command {
        Commands::Serve(args) => commands::serve::run(&ServeArgs::with_config(args, &config)),
        Commands::Train(args) => commands::train::run(&TrainArgs::with_config(args, &config)),
    };

    match result {
        Ok(()) => std::process::ExitCode::SUCCESS,
        Err(e) => {
            eprintln!("error: {e:#}");
            std::process::ExitCode::FAILURE
        }
    }
}
