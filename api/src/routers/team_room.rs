use axum::{
    Router,
    extract::{Path, Query, State},
    response::IntoResponse,
    routing::{get, post},
};

use app::state::AppState;
use models::{
    params::team_room::CreateTeamRoomParams,
    queries::TeamRoomQuery,
    schemas::{
        pagination::PaginatedData,
        team_room::{TeamModeSchema, TeamRoomInfo, TeamRoomListItem},
    },
};

use crate::{
    ApiResponse,
    error::ApiError,
    extractor::{CurrentUser, Json, Valid},
};

#[utoipa::path(
    post,
    path = "/team/rooms",
    tag = "team",
    security(("bearer_auth" = [])),
    request_body = CreateTeamRoomParams,
    responses(
        (status = 200, description = "Room created", body = ApiResponse<TeamRoomInfo>),
        (status = 400, description = "Unknown mode"),
        (status = 404, description = "Not enough problems for the mode"),
    )
)]
pub async fn rooms_post(
    state: State<AppState>,
    CurrentUser(user): CurrentUser,
    Valid(Json(params)): Valid<Json<CreateTeamRoomParams>>,
) -> Result<impl IntoResponse, ApiError> {
    let room = state.team_rooms.create_room(user.id, &params.mode).await?;
    Ok(Json(ApiResponse::success("Room created", Some(room))))
}

#[utoipa::path(
    get,
    path = "/team/rooms",
    tag = "team",
    params(TeamRoomQuery),
    responses((status = 200, description = "Rooms, newest first", body = ApiResponse<PaginatedData<TeamRoomListItem>>))
)]
pub async fn rooms_get(
    state: State<AppState>,
    Query(query): Query<TeamRoomQuery>,
) -> Result<impl IntoResponse, ApiError> {
    let rooms = state.team_rooms.list_rooms(&query).await?;
    Ok(Json(ApiResponse::success("Rooms retrieved", Some(rooms))))
}

#[utoipa::path(
    get,
    path = "/team/rooms/{id}",
    tag = "team",
    params(("id" = i32, Path, description = "Room id")),
    responses(
        (status = 200, description = "Room state", body = ApiResponse<TeamRoomInfo>),
        (status = 404, description = "Unknown room"),
    )
)]
pub async fn rooms_id_get(
    state: State<AppState>,
    Path(id): Path<i32>,
) -> Result<impl IntoResponse, ApiError> {
    let room = state.team_rooms.room_info(id).await?;
    Ok(Json(ApiResponse::success("Room retrieved", Some(room))))
}

#[utoipa::path(
    post,
    path = "/team/rooms/{id}/join",
    tag = "team",
    security(("bearer_auth" = [])),
    params(("id" = i32, Path, description = "Room id")),
    responses(
        (status = 200, description = "Room after joining", body = ApiResponse<TeamRoomInfo>),
        (status = 409, description = "Room already finished"),
    )
)]
pub async fn rooms_join_post(
    state: State<AppState>,
    CurrentUser(user): CurrentUser,
    Path(id): Path<i32>,
) -> Result<impl IntoResponse, ApiError> {
    let room = state.team_rooms.join_room(user.id, id).await?;
    Ok(Json(ApiResponse::success("Joined room", Some(room))))
}

#[utoipa::path(
    post,
    path = "/team/rooms/{id}/leave",
    tag = "team",
    security(("bearer_auth" = [])),
    params(("id" = i32, Path, description = "Room id")),
    responses((status = 200, description = "Room after leaving", body = ApiResponse<TeamRoomInfo>))
)]
pub async fn rooms_leave_post(
    state: State<AppState>,
    CurrentUser(user): CurrentUser,
    Path(id): Path<i32>,
) -> Result<impl IntoResponse, ApiError> {
    let room = state.team_rooms.leave_room(user.id, id).await?;
    Ok(Json(ApiResponse::success("Left room", Some(room))))
}

#[utoipa::path(
    get,
    path = "/team/modes",
    tag = "team",
    responses((status = 200, description = "Available modes", body = ApiResponse<Vec<TeamModeSchema>>))
)]
pub async fn modes_get(state: State<AppState>) -> impl IntoResponse {
    Json(ApiResponse::success(
        "Modes retrieved",
        Some(state.team_rooms.list_modes()),
    ))
}

pub fn create_team_room_router() -> Router<AppState> {
    Router::new()
        .route("/rooms", get(rooms_get).post(rooms_post))
        .route("/rooms/{id}", get(rooms_id_get))
        .route("/rooms/{id}/join", post(rooms_join_post))
        .route("/rooms/{id}/leave", post(rooms_leave_post))
        .route("/modes", get(modes_get))
}
