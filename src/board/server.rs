use std::path::PathBuf;
use std::sync::Arc;

use anyhow::{Context, Result};
use axum::{Json, Router, http::StatusCode, response::IntoResponse};
use tower_http::cors::CorsLayer;
use tracing::{info, warn};

use super::api::{self, AppState};
use super::db::SqliteStore;
use super::memory::MemoryStore;
use super::position::PositionAllocator;
use super::store::IssueStore;

/// Configuration for the board server.
#[derive(Debug, Clone)]
pub struct ServerConfig {
    pub host: String,
    pub port: u16,
    pub db_path: PathBuf,
    /// Keep everything in memory instead of opening `db_path`.
    pub in_memory: bool,
    pub dev_mode: bool,
    pub allocator: PositionAllocator,
    pub auto_rebalance: bool,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: "127.0.0.1".to_string(),
            port: 3141,
            db_path: PathBuf::from(".vangraph/vangraph.db"),
            in_memory: false,
            dev_mode: false,
            allocator: PositionAllocator::default(),
            auto_rebalance: true,
        }
    }
}

impl ServerConfig {
    /// Bind address. Dev mode listens on all interfaces.
    pub fn bind_addr(&self) -> String {
        let host = if self.dev_mode { "0.0.0.0" } else { self.host.as_str() };
        format!("{}:{}", host, self.port)
    }

    /// Open the store this configuration points at.
    pub fn open_store(&self) -> Result<Arc<dyn IssueStore>> {
        if self.in_memory {
            return Ok(Arc::new(MemoryStore::new(self.allocator)));
        }
        if let Some(parent) = self.db_path.parent() {
            std::fs::create_dir_all(parent).context("Failed to create database directory")?;
        }
        let store = SqliteStore::open(&self.db_path, self.allocator)
            .with_context(|| format!("Failed to open board database {}", self.db_path.display()))?;
        Ok(Arc::new(store))
    }
}

/// Build the full application router: API routes plus a JSON 404 fallback.
pub fn build_router(state: Arc<AppState>) -> Router {
    api::api_router().fallback(not_found).with_state(state)
}

async fn not_found() -> impl IntoResponse {
    (
        StatusCode::NOT_FOUND,
        Json(serde_json::json!({"error": "No such route"})),
    )
}

/// Start the board server and run until Ctrl+C.
pub async fn start_server(config: ServerConfig) -> Result<()> {
    let store = config.open_store()?;
    let state = Arc::new(AppState::new(store, config.allocator, config.auto_rebalance));

    let mut app = build_router(state);
    if config.dev_mode {
        app = app.layer(CorsLayer::permissive());
    }

    let addr = config.bind_addr();
    let listener = tokio::net::TcpListener::bind(&addr)
        .await
        .with_context(|| format!("Failed to bind to {}", addr))?;

    let local_addr = listener.local_addr()?;
    info!(
        addr = %local_addr,
        in_memory = config.in_memory,
        dev = config.dev_mode,
        "board server listening"
    );
    println!("Vangraph running at http://{}", local_addr);

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await
        .context("Server error")?;

    info!("server shut down gracefully");
    Ok(())
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        warn!(error = %e, "failed to install Ctrl+C handler");
        std::future::pending::<()>().await;
    }
    info!("shutting down");
}
