use anyhow::Result;
use clap::{Parser, Subcommand};
use refuge_backend::api;
use refuge_backend::config::RefugeConfig;
use refuge_backend::database::Database;
use refuge_backend::telemetry;

#[derive(Parser)]
#[command(author, version, about = "Refuge social backend daemon")]
struct Args {
    #[command(subcommand)]
    command: Option<Command>,
}

#[derive(Subcommand)]
enum Command {
    /// Run the HTTP server (Axum) for REST/API access
    Serve,
}

#[tokio::main]
async fn main() -> Result<()> {
    telemetry::init_tracing();

    let args = Args::parse();

    let config = RefugeConfig::from_env()?;
    let database = Database::connect(&config.paths)?;
    database.ensure_migrations()?;
    tracing::info!(db_path = %config.paths.db_path.display(), "store ready");

    match args.command.unwrap_or(Command::Serve) {
        Command::Serve => api::serve_http(config, database).await,
    }
}
