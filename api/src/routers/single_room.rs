use axum::{
    Router,
    extract::{Path, State},
    response::IntoResponse,
    routing::{get, post},
};

use app::state::AppState;
use models::{params::single_room::AbandonRoomParams, schemas::single_room::SingleRoomInfo};

use crate::{
    ApiResponse,
    error::ApiError,
    extractor::{CurrentUser, Json, Valid},
};

/// Opens a room on a problem near the caller's rating, or returns the one in progress.
#[utoipa::path(
    post,
    path = "/single/rooms",
    tag = "single",
    security(("bearer_auth" = [])),
    responses(
        (status = 200, description = "Room in progress", body = ApiResponse<SingleRoomInfo>),
        (status = 401, description = "Not logged in"),
        (status = 404, description = "No problem in the rating window"),
    )
)]
pub async fn rooms_post(
    state: State<AppState>,
    CurrentUser(user): CurrentUser,
) -> Result<impl IntoResponse, ApiError> {
    let room = state.single_rooms.create_room(user.id).await?;
    Ok(Json(ApiResponse::success("Room ready", Some(room))))
}

#[utoipa::path(
    get,
    path = "/single/rooms/active",
    tag = "single",
    security(("bearer_auth" = [])),
    responses((status = 200, description = "The caller's room in progress, if any", body = ApiResponse<SingleRoomInfo>))
)]
pub async fn rooms_active_get(
    state: State<AppState>,
    CurrentUser(user): CurrentUser,
) -> Result<impl IntoResponse, ApiError> {
    let room = state.single_rooms.active_room(user.id).await?;
    Ok(Json(ApiResponse::success("Active room retrieved", room)))
}

#[utoipa::path(
    get,
    path = "/single/rooms/{id}",
    tag = "single",
    params(("id" = i32, Path, description = "Room id")),
    responses(
        (status = 200, description = "Room state", body = ApiResponse<SingleRoomInfo>),
        (status = 404, description = "Unknown room"),
    )
)]
pub async fn rooms_id_get(
    state: State<AppState>,
    Path(id): Path<i32>,
) -> Result<impl IntoResponse, ApiError> {
    let room = state.single_rooms.room_info(id).await?;
    Ok(Json(ApiResponse::success("Room retrieved", Some(room))))
}

#[utoipa::path(
    post,
    path = "/single/rooms/abandon",
    tag = "single",
    security(("bearer_auth" = [])),
    request_body = AbandonRoomParams,
    responses(
        (status = 200, description = "Room after abandoning", body = ApiResponse<SingleRoomInfo>),
        (status = 403, description = "Room belongs to someone else"),
        (status = 404, description = "No such room"),
    )
)]
pub async fn rooms_abandon_post(
    state: State<AppState>,
    CurrentUser(user): CurrentUser,
    Valid(Json(params)): Valid<Json<AbandonRoomParams>>,
) -> Result<impl IntoResponse, ApiError> {
    let room = state.single_rooms.abandon(user.id, params.room_id).await?;
    Ok(Json(ApiResponse::success("Room abandoned", Some(room))))
}

pub fn create_single_room_router() -> Router<AppState> {
    Router::new()
        .route("/rooms", post(rooms_post))
        .route("/rooms/active", get(rooms_active_get))
        .route("/rooms/abandon", post(rooms_abandon_post))
        .route("/rooms/{id}", get(rooms_id_get))
}
