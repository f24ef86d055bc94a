//! Repomart marketplace server.
//!
//! Serves the versioned JSON API over axum. Storage is PostgreSQL (via
//! sqlx) or an in-memory store for local runs; payments go through Stripe
//! or the manual gateway used in development.
//!
//! ## Configuration
//!
//! Settings come from environment variables (a `.env` file is honoured):
//! `SERVER_HOST`, `SERVER_PORT`, `STORAGE_BACKEND`, `DATABASE_URL`,
//! `PAYMENT_PROVIDER`, `STRIPE_SECRET_KEY`, `STRIPE_WEBHOOK_SECRET`,
//! `AUTH_PASSWORD_PEPPER`, `AUTH_TOKEN_KEY`, `CORS_ALLOWED_ORIGINS`.
//! Marketplace tunables (fees, price bounds, payout policy) load from
//! `MARKETPLACE_CONFIG_PATH`, `MARKETPLACE_CONFIG_JSON` or `marketplace.toml`.

use std::{net::SocketAddr, sync::Arc};

use anyhow::{Context, anyhow};
use clap::{Args as ClapArgs, Parser, Subcommand};
use tracing::info;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use repomart_core::database::PostgresDatabase;
use repomart_server::{
    AppState, create_app,
    infra::config::{Config, MarketplaceSource},
};

/// CLI entry point
#[derive(Parser, Debug)]
#[command(name = "repomart-server")]
#[command(about = "Marketplace backend for selling and buying code repositories")]
struct Cli {
    #[command(subcommand)]
    command: Option<Command>,

    #[command(flatten)]
    serve: ServeArgs,
}

#[derive(ClapArgs, Debug, Clone)]
struct ServeArgs {
    /// Server port (overrides config)
    #[arg(short, long, env = "SERVER_PORT")]
    port: Option<u16>,

    /// Server host (overrides config)
    #[arg(long, env = "SERVER_HOST")]
    host: Option<String>,
}

#[derive(Debug, Subcommand)]
enum Command {
    #[command(subcommand)]
    Db(DbCommand),
}

#[derive(Debug, Subcommand)]
enum DbCommand {
    /// Apply database migrations and exit
    Migrate,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "info,tower_http=warn,sqlx=warn".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    let config = load_config(&cli.serve)?;

    if let Some(Command::Db(DbCommand::Migrate)) = cli.command {
        return run_db_migrate(&config).await;
    }

    run_server(config).await
}

fn load_config(args: &ServeArgs) -> anyhow::Result<Arc<Config>> {
    let mut config = Config::from_env().context("failed to load configuration")?;
    if let Some(port) = args.port {
        config.server_port = port;
    }
    if let Some(host) = args.host.clone() {
        config.server_host = host;
    }

    match &config.marketplace_source {
        MarketplaceSource::EnvPath(path) => {
            info!(path = %path.display(), "marketplace settings loaded from env path")
        }
        MarketplaceSource::EnvInline => {
            info!("marketplace settings loaded from inline environment json")
        }
        MarketplaceSource::DefaultFile(path) => {
            info!(path = %path.display(), "marketplace settings loaded from file")
        }
        MarketplaceSource::BuiltIn => info!("using built-in marketplace settings"),
    }
    info!(
        marketplace.fee_bps = config.marketplace.platform_fee_bps,
        marketplace.currency = %config.marketplace.currency,
        marketplace.payout_minimum = %config.marketplace.payout.minimum,
        marketplace.payout_cooldown_hours = config.marketplace.payout.cooldown_hours,
        "marketplace configuration in effect"
    );

    Ok(Arc::new(config))
}

async fn run_db_migrate(config: &Config) -> anyhow::Result<()> {
    let url = config
        .database_url
        .as_deref()
        .ok_or_else(|| anyhow!("DATABASE_URL must be set to run migrations"))?;
    let pg = PostgresDatabase::connect(url)
        .await
        .context("failed to connect to PostgreSQL for migration")?;
    pg.migrate().await.context("database migration failed")?;
    info!("Database migrations applied successfully");
    Ok(())
}

async fn run_server(config: Arc<Config>) -> anyhow::Result<()> {
    let state = AppState::build(Arc::clone(&config)).await?;
    let router = create_app(state);

    let addr: SocketAddr = format!("{}:{}", config.server_host, config.server_port)
        .parse()
        .with_context(|| {
            format!(
                "invalid listen address {}:{}",
                config.server_host, config.server_port
            )
        })?;

    info!("Starting Repomart server on {addr}");
    let listener = tokio::net::TcpListener::bind(addr)
        .await
        .with_context(|| format!("failed to bind {addr}"))?;
    axum::serve(listener, router)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    info!("Server stopped");
    Ok(())
}

async fn shutdown_signal() {
    if let Err(err) = tokio::signal::ctrl_c().await {
        tracing::error!(error = %err, "failed to listen for shutdown signal");
        return;
    }
    info!("shutdown signal received");
}
