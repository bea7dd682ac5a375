use anyhow::Context;
use clap::{Parser, Subcommand};
use serde_json::{Map, Value};

use crate::auth::TokenService;
use crate::config::AppConfig;
use crate::database::DatabaseManager;
use crate::server::{app, AppState};

#[derive(Parser)]
#[command(name = "volunteer-hub")]
#[command(about = "Volunteer listings and join requests API")]
#[command(version)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Option<Commands>,
}

#[derive(Subcommand)]
pub enum Commands {
    #[command(about = "Run the HTTP server (default)")]
    Serve {
        #[arg(long, help = "Port to listen on (overrides PORT)")]
        port: Option<u16>,
    },

    #[command(about = "Apply database migrations and exit")]
    Migrate,

    #[command(about = "Print a signed session token for manual testing")]
    Token {
        #[arg(long, help = "Email claim")]
        email: String,
        #[arg(long = "claim", value_parser = parse_claim, help = "Extra claim as key=value")]
        claims: Vec<(String, String)>,
    },
}

fn parse_claim(raw: &str) -> Result<(String, String), String> {
    raw.split_once('=')
        .map(|(k, v)| (k.trim().to_string(), v.trim().to_string()))
        .filter(|(k, _)| !k.is_empty())
        .ok_or_else(|| format!("expected key=value, got '{}'", raw))
}

pub async fn run(cli: Cli, config: AppConfig) -> anyhow::Result<()> {
    match cli.command.unwrap_or(Commands::Serve { port: None }) {
        Commands::Serve { port } => serve(config, port).await,
        Commands::Migrate => migrate(config).await,
        Commands::Token { email, claims } => token(config, email, claims),
    }
}

async fn serve(mut config: AppConfig, port: Option<u16>) -> anyhow::Result<()> {
    if let Some(port) = port {
        config.server.port = port;
    }
    let bind_addr = config.bind_addr();

    let (state, db) = AppState::from_config(config)
        .await
        .context("Failed to initialise application state")?;

    let listener = tokio::net::TcpListener::bind(&bind_addr)
        .await
        .with_context(|| format!("failed to bind {}", bind_addr))?;
    tracing::info!("Server is running on http://{}", bind_addr);

    axum::serve(listener, app(state))
        .with_graceful_shutdown(shutdown_signal())
        .await
        .context("Server error")?;

    if let Some(db) = db {
        db.close().await;
    }
    tracing::info!("Server stopped");
    Ok(())
}

async fn migrate(config: AppConfig) -> anyhow::Result<()> {
    let db = DatabaseManager::connect(&config.database)
        .await
        .context("Failed to connect to database")?;
    db.migrate().await.context("Failed to run migrations")?;
    db.close().await;
    Ok(())
}

fn token(config: AppConfig, email: String, claims: Vec<(String, String)>) -> anyhow::Result<()> {
    let tokens = TokenService::from_config(&config).context("Invalid JWT_SECRET or JWT_EXPIRY_DAYS")?;

    let mut map: Map<String, Value> = claims
        .into_iter()
        .map(|(k, v)| (k, Value::String(v)))
        .collect();
    map.insert("email".to_string(), Value::String(email));

    println!("{}", tokens.issue(map)?);
    Ok(())
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        tracing::error!("Failed to listen for shutdown signal: {}", e);
        std::future::pending::<()>().await;
    }
    tracing::info!("Shutdown signal received");
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_claims() {
        assert_eq!(parse_claim("role=organizer").unwrap(), ("role".into(), "organizer".into()));
        assert!(parse_claim("novalue").is_err());
        assert!(parse_claim("=x").is_err());
    }

    #[test]
    fn defaults_to_serve() {
        let cli = Cli::parse_from(["volunteer-hub"]);
        assert!(cli.command.is_none());

        let cli = Cli::parse_from(["volunteer-hub", "token", "--email", "a@x.com", "--claim", "k=v"]);
        match cli.command {
            Some(Commands::Token { email, claims }) => {
                assert_eq!(email, "a@x.com");
                assert_eq!(claims, vec![("k".to_string(), "v".to_string())]);
            }
            _ => panic!("expected token command"),
        }
    }
}
