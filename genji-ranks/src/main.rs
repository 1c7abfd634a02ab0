//! genji-ranks - skill tier and map submission service
//!
//! Serves the rank pipeline and map submission writes to the bot front-end and
//! streams newsfeed events to subscribers.

use std::net::SocketAddr;
use std::path::PathBuf;
use std::sync::Arc;

use anyhow::{Context, Result};
use clap::Parser;
use tokio::signal;
use tower_http::trace::TraceLayer;
use tracing::{info, warn};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use genji_common::config::{require_env, resolve_root_folder};
use genji_common::db::init_database;
use genji_common::events::EventBus;
use genji_ranks::config::{ServiceConfig, DISCORD_TOKEN_ENV};
use genji_ranks::membership::{DiscordMembership, DiscordSettings, InMemoryMembership, Membership};
use genji_ranks::ranks::RankService;
use genji_ranks::{build_router, AppState};

/// Command-line arguments for genji-ranks
#[derive(Parser, Debug)]
#[command(name = "genji-ranks")]
#[command(about = "Skill tier and map submission service for Genji Parkour")]
#[command(version)]
struct Args {
    /// Port to listen on (overrides genji.toml)
    #[arg(short, long, env = "GENJI_RANKS_PORT")]
    port: Option<u16>,

    /// Root folder holding genji.toml and the database
    #[arg(short, long)]
    root_folder: Option<PathBuf>,

    /// Keep role grants in memory instead of calling Discord
    #[arg(long)]
    dry_run: bool,
}

#[tokio::main]
async fn main() -> Result<()> {
    let args = Args::parse();

    let root_folder = resolve_root_folder(args.root_folder.as_deref());
    let config = ServiceConfig::load(&root_folder).context("Failed to load genji.toml")?;

    let level = &config.logging.level;
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env().unwrap_or_else(|_| {
                format!("genji_ranks={level},genji_common={level},tower_http=debug").into()
            }),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    info!(
        "Starting Genji Ranks (genji-ranks) v{} [{}] built {} ({})",
        env!("CARGO_PKG_VERSION"),
        env!("GIT_HASH"),
        env!("BUILD_TIMESTAMP"),
        env!("BUILD_PROFILE")
    );
    info!("Root folder: {}", root_folder.display());

    std::fs::create_dir_all(&root_folder)
        .with_context(|| format!("Failed to create {}", root_folder.display()))?;

    let db_path = config.database_path(&root_folder);
    info!("Database path: {}", db_path.display());
    let pool = init_database(&db_path)
        .await
        .context("Failed to open database")?;

    let table = config.rank_table();
    let ladders = config.ladders().context("Invalid role ladders")?;

    let membership: Arc<dyn Membership> = if args.dry_run {
        warn!("Dry run: role grants are kept in memory, Discord is never called");
        Arc::new(InMemoryMembership::new())
    } else {
        config.validate_discord()?;
        let token = require_env(DISCORD_TOKEN_ENV)?;
        Arc::new(DiscordMembership::new(DiscordSettings {
            token,
            guild_id: config.guild_id,
            api_base: config.discord.api_base.clone(),
            requests_per_second: config.discord.requests_per_second,
        })?)
    };

    let events = EventBus::new(config.event_capacity);
    let ranks = RankService::new(pool, table, ladders, membership, events.clone());
    let app = build_router(AppState::new(ranks, events)).layer(TraceLayer::new_for_http());

    let host: std::net::IpAddr = config
        .bind_address
        .parse()
        .with_context(|| format!("Invalid bind_address '{}'", config.bind_address))?;
    let addr = SocketAddr::new(host, args.port.unwrap_or(config.port));

    let listener = tokio::net::TcpListener::bind(addr)
        .await
        .context("Failed to bind to address")?;
    info!("genji-ranks listening on http://{}", addr);
    info!("Health check: http://{}/health", addr);

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await
        .context("Server error")?;

    info!("Server shutdown complete");
    Ok(())
}

/// Graceful shutdown signal handler
async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = signal::ctrl_c().await {
            warn!("Failed to listen for Ctrl+C: {}", e);
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match signal::unix::signal(signal::unix::SignalKind::terminate()) {
            Ok(mut stream) => {
                stream.recv().await;
            }
            Err(e) => {
                warn!("Failed to install SIGTERM handler: {}", e);
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {
            info!("Received Ctrl+C, shutting down");
        },
        _ = terminate => {
            info!("Received terminate signal, shutting down");
        },
    }
}
