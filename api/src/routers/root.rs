use axum::{Json, Router, extract::State, response::IntoResponse, routing::get};
use sea_orm::{ConnectionTrait, Statement};
use utoipa::OpenApi;

use app::state::AppState;

use crate::{ApiResponse, error::ApiError, openapi::ApiDoc};

/// Health check with a database round trip.
#[utoipa::path(
    get,
    path = "/",
    tag = "root",
    responses((status = 200, description = "Service is up", body = ApiResponse<String>))
)]
pub async fn root_get(state: State<AppState>) -> Result<impl IntoResponse, ApiError> {
    let result = state
        .conn
        .query_one(Statement::from_string(
            state.conn.get_database_backend(),
            "SELECT 'ok'",
        ))
        .await?
        .ok_or_else(|| sea_orm::DbErr::RecordNotFound("health query returned nothing".into()))?;
    let status: String = result.try_get_by(0)?;

    Ok(Json(ApiResponse::success("Service is healthy", Some(status))))
}

async fn openapi_get() -> impl IntoResponse {
    Json(ApiDoc::openapi())
}

pub fn create_root_router() -> Router<AppState> {
    Router::new()
        .route("/", get(root_get))
        .route("/api-docs/openapi.json", get(openapi_get))
}
