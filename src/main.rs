use std::path::PathBuf;

use clap::Parser;
use tasktrack_server::ServerConfig;
use tasktrack_store::Database;

/// Task tracker REST service.
#[derive(Debug, Parser)]
#[command(name = "tasktrack", version, about = "Task tracker REST API")]
struct Cli {
    /// Port to listen on.
    #[arg(long, default_value_t = 4000)]
    port: u16,

    /// Path to the SQLite database file.
    #[arg(long)]
    db_path: Option<PathBuf>,
}

#[tokio::main]
async fn main() {
    let cli = Cli::parse();

    // Initialize logging
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info")),
        )
        .init();

    tracing::info!("Starting task tracker server");

    let db_path = cli.db_path.unwrap_or_else(default_db_path);
    let db = Database::open(&db_path).expect("Failed to open database");
    tracing::info!(path = %db_path.display(), "Database opened");

    let config = ServerConfig { port: cli.port };
    let handle = tasktrack_server::start(config, db)
        .await
        .expect("Failed to start server");

    tracing::info!(port = handle.port, "Task tracker ready");

    // Wait for shutdown signal
    tokio::signal::ctrl_c()
        .await
        .expect("Failed to listen for ctrl+c");

    tracing::info!("Shutting down");
}

fn default_db_path() -> PathBuf {
    dirs_home().join(".tasktrack").join("tasks.db")
}

fn dirs_home() -> PathBuf {
    std::env::var("HOME")
        .map(PathBuf::from)
        .unwrap_or_else(|_| PathBuf::from("/tmp"))
}
