//! Hotel cancellation pipeline - Main Entry Point

use clap::Parser;
use hotel_cancellation::cli::{cmd_info, cmd_predict, cmd_train, Cli, Commands};
use tracing::error;

fn run(cli: Cli) -> anyhow::Result<()> {
    match cli.command {
        Commands::Train { data, config, model_dir, plot_dir } => {
            cmd_train(&data, config.as_deref(), model_dir.as_deref(), plot_dir.as_deref())
        }
        Commands::Predict { data, model, output, config } => {
            cmd_predict(&data, model.as_deref(), output.as_deref(), config.as_deref())
        }
        Commands::Info { data } => cmd_info(&data),
    }
}

fn main() {
    // Initialize logging
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "hotel_cancellation=info".into()),
        )
        .init();

    let cli = Cli::parse();

    if let Err(e) = run(cli) {
        error!("Pipeline failed: {e}");
        std::process::exit(1);
    }
}
