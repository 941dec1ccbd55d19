use app::error::AppError;
use axum::{extract::FromRequestParts, http::request::Parts};
use models::schemas::user::{AuthSchema, UserSchema};

use crate::error::ApiError;

/// The authenticated caller, or 401.
pub struct CurrentUser(pub UserSchema);

impl<S: Send + Sync> FromRequestParts<S> for CurrentUser {
    type Rejection = ApiError;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        parts
            .extensions
            .get::<AuthSchema>()
            .and_then(|auth| auth.user.clone())
            .map(CurrentUser)
            .ok_or_else(|| AppError::Unauthorized.into())
    }
}
