use axum::{
    Router,
    extract::{Query, State, WebSocketUpgrade},
    response::IntoResponse,
    routing::get,
};
use tracing::debug;

use app::{core::live, state::AppState};
use models::queries::LiveQuery;

use crate::{error::ApiError, extractor::CurrentUser, transport};

/// Largest inbound frame accepted on the live channel.
const MAX_FRAME_BYTES: usize = 64 * 1024;

/// Upgrades to the live channel, optionally joining `room_id` right away.
#[utoipa::path(
    get,
    path = "/ws",
    tag = "live",
    params(
        ("room_id" = Option<i32>, Query, description = "Team room to join on connect"),
        ("token" = Option<String>, Query, description = "Access token when no header can be sent"),
    ),
    responses(
        (status = 101, description = "Switching to WebSocket"),
        (status = 401, description = "Missing or invalid token"),
    )
)]
pub async fn ws_get(
    State(state): State<AppState>,
    CurrentUser(user): CurrentUser,
    Query(query): Query<LiveQuery>,
    ws: WebSocketUpgrade,
) -> Result<impl IntoResponse, ApiError> {
    let room_id = query.room_id.max(0);
    debug!(user_id = user.id, room_id, "live upgrade requested");

    Ok(ws
        .max_message_size(MAX_FRAME_BYTES)
        .max_frame_size(MAX_FRAME_BYTES)
        .on_upgrade(move |socket| async move {
            let (sink, stream) = transport::split(socket);
            live::accept(&state, Box::new(sink), Box::new(stream), user.id, room_id).await;
        }))
}

pub fn create_live_router() -> Router<AppState> {
    Router::new().route("/ws", get(ws_get))
}
