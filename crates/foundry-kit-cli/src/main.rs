//! `foundry` - weather agent, project chat and travel-assistant web demo.

mod commands;
mod server;

use clap::{Parser, Subcommand};
use commands::weather::{BatchArgs, WeatherArgs};
use foundry_kit::observability::{self, ObservabilityConfig};
use std::process::ExitCode;

#[derive(Parser, Debug)]
#[command(name = "foundry", version, about = "Azure AI Foundry agent and chat client")]
struct Cli {
    /// Enable debug logging
    #[arg(short, long, global = true)]
    verbose: bool,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Get weather information for a city from the weather agent
    Weather(WeatherArgs),

    /// Get weather information for several cities, one after another
    Batch(BatchArgs),

    /// Show the current configuration
    Config,

    /// Check that the configured agent exists and is reachable
    Diagnose,

    /// Run one weather request for Milan as a connectivity test
    Test,

    /// Interactive chat with the project deployment
    Chat,

    /// Serve the retrieval-augmented travel assistant
    Serve {
        /// Port to listen on (default from PORT or 8000)
        #[arg(short, long)]
        port: Option<u16>,
    },
}

#[tokio::main]
async fn main() -> ExitCode {
    let cli = Cli::parse();

    if let Err(e) = observability::init(ObservabilityConfig::from_env(cli.verbose)) {
        eprintln!("Warning: could not initialize logging: {e}");
    }

    let result = match cli.command {
        Command::Weather(args) => commands::weather::run_weather_command(args).await,
        Command::Batch(args) => commands::weather::run_batch_command(args, cli.verbose).await,
        Command::Config => commands::config::run_config_command(),
        Command::Diagnose => commands::diagnose::run_diagnose_command(cli.verbose).await,
        Command::Test => commands::diagnose::run_test_command().await,
        Command::Chat => commands::chat::run_chat_command().await,
        Command::Serve { port } => server::run_server(port).await,
    };

    match result {
        Ok(code) => code,
        Err(e) => {
            eprintln!("❌ {e:#}");
            ExitCode::FAILURE
        }
    }
}
