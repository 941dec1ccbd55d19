use anyhow::{Context, Result};
use tokio::net::TcpListener;
use tracing::{error, info};

use api::{setup_config, setup_db, setup_router};
use app::state::AppState;
use utils::{create_dev_db, migrate};

pub async fn run() -> Result<()> {
    let config = setup_config()?;
    create_dev_db(&config.db_url);

    let conn = setup_db(&config.db_url).await?;
    migrate(&conn).await.context("migration failed")?;

    let state = AppState::with_codeforces(conn, config.clone())?;
    start_background(&state).await?;

    let router = setup_router(state.clone())?;
    let listener = TcpListener::bind(config.get_server_url())
        .await
        .with_context(|| format!("failed to bind {}", config.get_server_url()))?;
    info!("listening on http://{}", listener.local_addr()?);

    let served = axum::serve(listener, router)
        .with_graceful_shutdown(shutdown_signal())
        .await;
    shutdown(&state).await;
    served.context("server error")
}

/// Recovers room state left by a previous run and starts the background loops.
pub async fn start_background(state: &AppState) -> Result<()> {
    let abandoned = state
        .single_rooms
        .finish_all_active()
        .await
        .context("failed to close single rooms left in progress")?;
    let resumed = state
        .team_rooms
        .start_all_active()
        .await
        .context("failed to resume team rooms")?;

    state.verdicts.start();
    state.single_rooms.start_sweep();
    info!(abandoned, resumed, "background services started");
    Ok(())
}

pub async fn shutdown(state: &AppState) {
    state.single_rooms.stop_sweep();
    state.verdicts.stop();
    if let Err(e) = state.team_rooms.finish_all_active().await {
        error!("failed to finish team rooms on shutdown: {e}");
    }
    info!("background services stopped");
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        error!("failed to listen for shutdown signal: {e}");
        std::future::pending::<()>().await;
    }
    info!("shutdown signal received");
}
