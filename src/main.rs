//! Review Rota command line.

use chrono::Duration;
use clap::{Parser, Subcommand};
use review_rota::config::AppConfig;
use review_rota::db;
use review_rota::services::http_auth::{Role, TokenSigner};
use review_rota::services::http_server;
use std::path::PathBuf;
use std::process::ExitCode;
use tokio_util::sync::CancellationToken;

/// Team roster and pull request reviewer assignment service.
#[derive(Parser)]
#[command(name = "review-rota")]
#[command(version)]
struct Cli {
    /// JSON config file; REVIEW_ROTA_* variables override its values
    #[arg(short, long, global = true, env = "REVIEW_ROTA_CONFIG")]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Run the HTTP API until interrupted
    Serve,

    /// Create or upgrade the database, then exit
    Migrate,

    /// Print a signed API token
    IssueToken {
        /// Access level of the token
        #[arg(long, value_enum, default_value = "user")]
        role: Role,

        /// Hours until the token expires
        #[arg(long, default_value = "24")]
        ttl_hours: i64,
    },
}

#[tokio::main]
async fn main() -> ExitCode {
    let cli = Cli::parse();

    let config = match AppConfig::load(cli.config.as_deref()) {
        Ok(config) => config,
        Err(e) => {
            eprintln!("review-rota: {}", e);
            return ExitCode::FAILURE;
        }
    };

    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or(&config.log_level))
        .init();

    match execute(cli.command, config).await {
        Ok(()) => ExitCode::SUCCESS,
        Err(message) => {
            log::error!("{}", message);
            ExitCode::FAILURE
        }
    }
}

async fn execute(command: Commands, config: AppConfig) -> Result<(), String> {
    match command {
        Commands::Serve => {
            config.validate().map_err(|e| e.to_string())?;

            let shutdown = CancellationToken::new();
            let trigger = shutdown.clone();
            tokio::spawn(async move {
                if let Err(e) = tokio::signal::ctrl_c().await {
                    log::error!("failed to listen for Ctrl-C: {}", e);
                    return;
                }
                log::info!("shutdown requested");
                trigger.cancel();
            });

            http_server::run(&config, shutdown)
                .await
                .map_err(|e| e.to_string())
        }
        Commands::Migrate => {
            let pool = db::initialize(&config.database_path, config.max_connections)
                .await
                .map_err(|e| e.to_string())?;
            pool.close().await;
            log::info!("database ready at {}", config.database_path.display());
            Ok(())
        }
        Commands::IssueToken { role, ttl_hours } => {
            config.validate().map_err(|e| e.to_string())?;
            let ttl = Duration::try_hours(ttl_hours)
                .filter(|ttl| *ttl > Duration::zero())
                .ok_or_else(|| format!("invalid --ttl-hours {}", ttl_hours))?;

            let token = TokenSigner::new(&config.token_secret)
                .issue(role, ttl)
                .map_err(|e| e.to_string())?;
            println!("{}", token);
            Ok(())
        }
    }
}
