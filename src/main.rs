use std::process::ExitCode;
use std::sync::Arc;

use clap::Parser;
use tracing::debug;

use gator::cli::{default_commands, Cli, State};
use gator::{Config, Database, Result};

#[tokio::main]
async fn main() -> ExitCode {
    let cli = Cli::parse();

    let config_path = Config::resolve_path(cli.config.as_deref());
    let config = match Config::load_or_default(&config_path) {
        Ok(config) => config,
        Err(e) => {
            eprintln!("Failed to load {}: {e}", config_path.display());
            return ExitCode::FAILURE;
        }
    };

    if let Err(e) = gator::logging::init(&config.logging) {
        eprintln!("Failed to initialize logging: {e}");
        // Fall back to console-only logging
        gator::logging::init_console_only(&config.logging.level);
    }

    match run(&cli, config, config_path).await {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            eprintln!("Error: {e}");
            ExitCode::FAILURE
        }
    }
}

async fn run(cli: &Cli, config: Config, config_path: std::path::PathBuf) -> Result<()> {
    config.validate()?;
    debug!("Using config {}", config_path.display());

    let db = Database::open(&config.database.url, config.database.max_connections).await?;
    let mut state = State::new(Arc::new(db), config, config_path);

    let result = default_commands().run(&mut state, &cli.to_command()).await;
    state.db.close().await;
    result
}
