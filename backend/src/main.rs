use std::sync::Arc;

use axum::http::{HeaderValue, Method};
use axum::http::header::HeaderName;
use axum::Router;
use tokio::net::TcpListener;
use tower_http::cors::CorsLayer;
use tracing::{error, info};

use crate::config::Config;
use crate::games::backend_wheel_game::{create_router as create_wheel_router, WheelRuntime};
use crate::services::congrats_service::CongratsService;
use crate::services::history_service::HistoryService;
use crate::services::slice_service::SliceService;
use crate::storage::{JsonFileStore, KeyValueStore};

mod config;
mod error;
mod games;
mod handlers;
mod logging;
mod services;
mod storage;

#[derive(Clone)]
pub struct AppState {
    pub slices: SliceService,
    pub history: HistoryService,
    pub congrats: CongratsService,
    pub wheel: Arc<WheelRuntime>,
}

impl AppState {
    pub fn new(config: &Config, store: Arc<dyn KeyValueStore>) -> Result<Self, Box<dyn std::error::Error>> {
        Ok(Self {
            slices: SliceService::new(store.clone()),
            history: HistoryService::new(store),
            congrats: CongratsService::new(config.congrats.clone())?,
            wheel: Arc::new(WheelRuntime::new(config.wheel.clone(), config.frame_period)?),
        })
    }
}

fn build_app(state: AppState) -> Router {
    let cors = CorsLayer::new()
        .allow_origin(vec![
            HeaderValue::from_static("http://127.0.0.1:8080"),
            HeaderValue::from_static("http://127.0.0.1:3000"),
        ])
        .allow_methods(vec![Method::GET, Method::POST, Method::PUT, Method::OPTIONS, Method::DELETE])
        .allow_headers(vec![
            HeaderName::from_static("content-type"),
            HeaderName::from_static("x-requested-with"),
        ]);

    Router::new()
        .nest("/api", handlers::create_router())
        .nest("/wheel", create_wheel_router())
        .layer(cors)
        .with_state(state)
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    dotenvy::from_path(".env").ok();
    logging::setup();

    let config = Config::from_env().map_err(|e| {
        error!("Invalid configuration: {}", e);
        e
    })?;

    let store: Arc<dyn KeyValueStore> = Arc::new(JsonFileStore::open(&config.store_path)?);
    let state = AppState::new(&config, store)?;
    if config.congrats.api_key.is_none() {
        info!("CONGRATS_API_KEY not set, winners get the built-in messages");
    }

    let app = build_app(state);

    info!("listening on {}", config.bind_addr);
    let listener = TcpListener::bind(config.bind_addr).await?;
    axum::serve(listener, app).await?;

    Ok(())
}
