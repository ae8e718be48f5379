use std::net::SocketAddr;
use std::sync::Arc;

use clap::Parser;
use mission_core::config::MissionConfig;
use mission_cron::{CacheCoordinator, CliSnapshotFetcher};
use mission_store::{CalendarStore, DocumentStore, SettingsStore, SqliteDocumentStore, TaskStore};
use tracing::{info, warn};

mod app;
mod guard;
mod http;
mod memory;

/// Mission Control, a local dashboard for an OpenClaw agent.
#[derive(Parser, Debug)]
#[command(name = "mission-gateway", version, about)]
struct Cli {
    /// Path to mission.toml (defaults to ~/.mission/mission.toml).
    #[arg(long, env = "MISSION_CONFIG")]
    config: Option<String>,

    /// Override the listen port from config.
    #[arg(long)]
    port: Option<u16>,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env().unwrap_or_else(|_| {
                "mission_gateway=info,mission_cron=info,tower_http=debug".into()
            }),
        )
        .init();

    let cli = Cli::parse();

    let mut config = MissionConfig::load(cli.config.as_deref()).unwrap_or_else(|e| {
        warn!("Config load failed ({}), using defaults", e);
        MissionConfig::default()
    });
    if let Some(port) = cli.port {
        config.gateway.port = port;
    }

    // single SQLite file; each subsystem gets its own connection
    let db_path = config.database.path.clone();
    ensure_parent_dir(&db_path);
    info!(path = %db_path, "opening SQLite database");

    let db = open_db(&db_path)?;
    mission_store::db::init_db(&db)?;
    info!("database migrations complete");

    let docs: Arc<dyn DocumentStore> = Arc::new(SqliteDocumentStore::new(db));
    let calendar = CalendarStore::new(open_db(&db_path)?);
    let tasks = TaskStore::new(open_db(&db_path)?);
    let settings = SettingsStore::new(Arc::clone(&docs));

    let fetcher = Arc::new(CliSnapshotFetcher::from_config(&config.cron));
    let cron = CacheCoordinator::from_config(&config.cron, docs, fetcher);

    let addr: SocketAddr = format!("{}:{}", config.gateway.bind, config.gateway.port).parse()?;
    let state = Arc::new(app::AppState::new(config, cron.clone(), calendar, tasks, settings));
    let router = app::build_router(state);

    let listener = tokio::net::TcpListener::bind(addr).await?;
    info!("Mission Control listening on http://{}", addr);

    // warm the cron cache so the first calendar view is usually served from it
    tokio::spawn(async move {
        match cron.refresh_now().await {
            Ok(true) => info!("cron cache warmed"),
            Ok(false) => {}
            Err(e) => warn!("cron warm-up failed: {e}"),
        }
    });

    axum::serve(listener, router).await?;
    Ok(())
}

fn open_db(path: &str) -> rusqlite::Result<rusqlite::Connection> {
    let conn = rusqlite::Connection::open(path)?;
    conn.execute_batch("PRAGMA journal_mode=WAL; PRAGMA busy_timeout=5000;")?;
    Ok(conn)
}

/// Ensure the parent directory for a file path exists.
fn ensure_parent_dir(path: &str) {
    if let Some(parent) = std::path::Path::new(path).parent() {
        let _ = std::fs::create_dir_all(parent);
    }
}
