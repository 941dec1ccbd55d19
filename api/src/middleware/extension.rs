use app::{state::AppState, utils::verify_token};
use axum::{
    extract::{Query, Request, State},
    middleware::Next,
    response::Response,
};
use models::schemas::user::AuthSchema;
use serde::Deserialize;

#[derive(Deserialize)]
struct TokenQuery {
    token: Option<String>,
}

/// Decodes the caller from a bearer token, or from `?token=` where headers
/// cannot be set (browser WebSockets).
pub async fn extension(State(state): State<AppState>, mut req: Request, next: Next) -> Response {
    let header_token = req
        .headers()
        .get("Authorization")
        .and_then(|header| header.to_str().ok())
        .and_then(|header| header.strip_prefix("Bearer "))
        .map(str::to_owned);

    let token = header_token.or_else(|| {
        Query::<TokenQuery>::try_from_uri(req.uri())
            .ok()
            .and_then(|Query(query)| query.token)
    });

    let auth_user = token.and_then(|token| verify_token(&state.config, &token).ok());

    req.extensions_mut().insert(AuthSchema { user: auth_user });
    next.run(req).await
}
