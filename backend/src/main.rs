use std::sync::Arc;

use axum::http::StatusCode;
use axum::response::IntoResponse;
use axum::routing::get;
use axum::Router;
use shared::shared_wheel_game::LedgerBook;
use tokio::net::TcpListener;
use tokio::sync::Mutex;
use tower_http::trace::TraceLayer;
use tracing::{error, info};

use crate::config::AppConfig;
use crate::games::backend_wheel_game::create_router as create_wheel_game_router;
use crate::services::host_service::HostClient;
use crate::services::wheel_service::WheelPlugin;
use crate::services::{persistence_service, scheduler_service};

mod config;
mod error;
mod games;
mod logging;
mod services;

#[derive(Clone)]
pub struct AppState {
    plugin: Arc<Mutex<WheelPlugin>>,
    host: HostClient,
    config: Arc<AppConfig>,
}

impl AppState {
    pub fn new(plugin: WheelPlugin, config: AppConfig) -> Self {
        Self {
            plugin: Arc::new(Mutex::new(plugin)),
            host: HostClient::new(config.host_callback_url.clone()),
            config: Arc::new(config),
        }
    }
}

pub async fn health_check() -> impl IntoResponse {
    (StatusCode::OK, "OK")
}

pub fn create_app(state: AppState) -> Router {
    Router::new()
        .route("/api/health_check", get(health_check))
        .nest("/api", create_wheel_game_router())
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        error!("Failed to listen for the shutdown signal: {}", e);
        std::future::pending::<()>().await;
    }
    info!("Shutting down");
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    dotenvy::from_path(".env").ok();
    logging::setup()?;

    let config = AppConfig::from_env()?;
    let ledgers = persistence_service::load_ledgers(&config.data_file).await?;
    let state = AppState::new(WheelPlugin::new(LedgerBook::load(ledgers)), config);
    if state.host.is_configured() {
        info!("Deferred actions are delivered to the host callback");
    } else {
        info!("No host callback configured, deferred actions wait in the outboxes");
    }

    scheduler_service::spawn_nightly_rebuild(state.clone());
    scheduler_service::spawn_hourly_tick(state.clone());

    let app = create_app(state.clone());
    let listener = TcpListener::bind(state.config.bind_addr).await?;
    info!("listening on {}", state.config.bind_addr);
    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    let records = state.plugin.lock().await.ledger_records();
    persistence_service::save_ledgers(&state.config.data_file, &records).await?;

    Ok(())
}
