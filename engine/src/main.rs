// Codify
// Main entry point for the codify binary

use clap::Parser;
use codify_engine::cli::{Cli, Command, ConfigAction};
use codify_engine::config::Config;
use codify_engine::handlers::{
    handle_ask, handle_chat, handle_config_path, handle_config_show, handle_doctor, handle_serve,
    handle_setup, OutputFormat,
};
use codify_engine::telemetry::{init_telemetry, init_telemetry_with_level};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Parse CLI arguments
    let cli = Cli::parse();

    let format = if cli.json {
        OutputFormat::Json
    } else {
        OutputFormat::Text
    };

    let config_path = match &cli.config {
        Some(path) => path.clone(),
        None => Config::default_config_path()?,
    };
    let config = if cli.config.is_some() {
        Config::load_from_path(&config_path)
    } else {
        Config::load_or_create_at(&config_path)
    };
    let config = match config {
        Ok(config) => config,
        Err(e) => {
            // Log the failure before bailing out
            init_telemetry();
            tracing::error!("Failed to load configuration: {}", e);
            return Err(e.into());
        }
    };

    // --log wins over the config file; RUST_LOG wins over both
    let log_level = cli.log.as_deref().unwrap_or(&config.core.log_level);
    init_telemetry_with_level(log_level);

    let version = env!("CARGO_PKG_VERSION");
    let commit = env!("GIT_COMMIT_HASH");
    let timestamp = env!("BUILD_TIMESTAMP");

    tracing::info!("Codify v{} ({} - {})", version, commit, timestamp);

    match cli.command {
        Command::Serve { bind } => handle_serve(&config, bind).await,
        Command::Ask { prompt, backend } => handle_ask(&config, &prompt, backend, format).await,
        Command::Chat { backend } => handle_chat(&config, backend).await,
        Command::Setup => {
            tracing::info!("Running setup...");
            handle_setup(&config, &config_path).await
        }
        Command::Config { action } => match action {
            ConfigAction::Show => handle_config_show(&config, format),
            ConfigAction::Path => handle_config_path(&config_path, format),
        },
        Command::Doctor => handle_doctor(&config, format).await,
    }
}
