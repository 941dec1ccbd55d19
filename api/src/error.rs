use app::error::AppError;
use axum::{
    Json,
    extract::rejection::{JsonRejection, PathRejection, QueryRejection},
    http::StatusCode,
    response::{IntoResponse, Response},
};
use validator::ValidationErrors;

use crate::ApiResponse;

/// Any failure of a handler. The status comes from the wrapped error when it
/// is one we know about.
#[derive(Debug)]
pub struct ApiError(anyhow::Error);

impl<E> From<E> for ApiError
where
    E: Into<anyhow::Error>,
{
    fn from(err: E) -> Self {
        Self(err.into())
    }
}

impl ApiError {
    fn status_and_message(&self) -> (StatusCode, String) {
        let err = &self.0;
        if let Some(e) = err.downcast_ref::<ValidationErrors>() {
            return (StatusCode::BAD_REQUEST, e.to_string());
        }
        if let Some(e) = err.downcast_ref::<JsonRejection>() {
            return (e.status(), e.body_text());
        }
        if let Some(e) = err.downcast_ref::<QueryRejection>() {
            return (e.status(), e.body_text());
        }
        if let Some(e) = err.downcast_ref::<PathRejection>() {
            return (e.status(), e.body_text());
        }
        if let Some(e) = err.downcast_ref::<AppError>() {
            let status = e.status_code();
            if status.is_server_error() && status != StatusCode::BAD_GATEWAY {
                tracing::error!("request failed: {e:?}");
                return (status, "internal server error".into());
            }
            return (status, e.to_string());
        }
        tracing::error!("request failed: {err:?}");
        (
            StatusCode::INTERNAL_SERVER_ERROR,
            "internal server error".into(),
        )
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let (status, message) = self.status_and_message();
        (status, Json(ApiResponse::<()>::error(&message))).into_response()
    }
}
