use anyhow::Context;
use backend::api;
use backend::config::ServerConfig;
use backend::coordinator::Coordinator;
use backend::store::{GameStore, MemoryStore, SqliteStore};
use clap::Parser;
use std::sync::Arc;
use tokio::net::TcpListener;
use tracing::info;
use tracing_subscriber::EnvFilter;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenvy::dotenv().ok();

    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .init();

    let config = ServerConfig::parse();

    let store: Arc<dyn GameStore> = match &config.database_url {
        Some(url) => {
            info!(%url, "using SQLite store");
            Arc::new(
                SqliteStore::connect(url)
                    .await
                    .context("failed to open database")?,
            )
        }
        None => {
            info!("DATABASE_URL not set, games are kept in memory");
            Arc::new(MemoryStore::new())
        }
    };

    let coordinator = Coordinator::new(store, config.coordinator());
    let app = api::router(coordinator);

    let addr = config.bind_addr()?;
    let listener = TcpListener::bind(addr)
        .await
        .with_context(|| format!("failed to bind {addr}"))?;
    info!(%addr, depth = config.ai_depth, "chess server listening");
    axum::serve(listener, app).await?;
    Ok(())
}
