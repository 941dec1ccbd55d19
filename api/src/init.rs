use std::time::Duration;

use anyhow::{Context, Result};
use axum::Router;
use axum::http::{HeaderValue, Method, header};
use sea_orm::{ConnectOptions, Database, DatabaseConnection};
use tower_http::{cors::CorsLayer, trace::TraceLayer};

use app::config::Config;
use app::state::AppState;

use crate::routers::create_router;

pub fn setup_router(state: AppState) -> Result<Router> {
    let origin = state
        .config
        .allowed_origin
        .parse::<HeaderValue>()
        .context("ALLOWED_ORIGIN is not a valid header value")?;
    let cors = CorsLayer::new()
        .allow_methods([Method::OPTIONS, Method::GET, Method::POST])
        .allow_headers([header::ACCEPT, header::AUTHORIZATION, header::CONTENT_TYPE])
        .allow_origin(origin)
        .allow_credentials(true);

    Ok(create_router(state)
        .layer(cors)
        .layer(TraceLayer::new_for_http()))
}

pub fn setup_config() -> Result<Config> {
    dotenvy::dotenv().ok();
    Config::from_env()
}

pub async fn setup_db(db_url: &str) -> Result<DatabaseConnection> {
    let mut opt = ConnectOptions::new(db_url);
    opt.max_lifetime(Duration::from_secs(60))
        .min_connections(2)
        .max_connections(50)
        .sqlx_logging(false);

    Database::connect(opt)
        .await
        .context("failed to connect to the database")
}
