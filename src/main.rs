use anyhow::Result;
use cartelia_mail::{config::Config, migration, server, telemetry};
use clap::{Parser, Subcommand};
use tracing::info;

#[derive(Parser)]
#[command(name = "cartelia-mail", version, about = "Cartelia transactional email service")]
struct Cli {
    #[command(subcommand)]
    command: Option<Command>,
}

#[derive(Subcommand)]
enum Command {
    /// Run the HTTP server (default)
    Serve,
    /// Create the database if needed and apply migrations
    Migrate,
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    // Load configuration
    dotenvy::dotenv().ok();
    let config = Config::from_env()?;

    let metrics_handle = telemetry::init(&config.telemetry)?;

    match cli.command.unwrap_or(Command::Serve) {
        Command::Migrate => {
            info!("Running Cartelia Mail migrations");
            migration::run_migrations(&config).await
        }
        Command::Serve => {
            info!("Starting Cartelia Mail Service");
            info!("HTTP server listening on {}", config.http_addr());
            server::run(config, metrics_handle).await
        }
    }
}
