use chrono::Utc;
use jsonwebtoken::{Header, Validation, decode, encode};
use models::schemas::user::UserSchema;
use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::{
    config::Config,
    error::{AppError, AppResult},
};

/// Lifetime of an access token, in seconds.
pub const ACCESS_TOKEN_TTL: i64 = 60 * 60 * 24;

#[derive(Debug, Serialize, Deserialize)]
struct AccessClaims {
    exp: i64,
    iat: i64,
    user: UserSchema,
}

/// Signs an access token carrying `user`.
pub fn issue_token(config: &Config, user: &UserSchema) -> AppResult<String> {
    let iat = Utc::now().timestamp();
    let claims = AccessClaims {
        exp: iat + ACCESS_TOKEN_TTL,
        iat,
        user: user.clone(),
    };
    encode(&Header::default(), &claims, &config.encoding_key)
        .map_err(|e| AppError::Internal(anyhow::anyhow!("failed to sign access token: {e}")))
}

/// The user inside a valid, unexpired token.
pub fn verify_token(config: &Config, token: &str) -> AppResult<UserSchema> {
    decode::<AccessClaims>(token, &config.decoding_key, &Validation::default())
        .map(|data| data.claims.user)
        .map_err(|e| {
            debug!("rejected access token: {e}");
            AppError::Unauthorized
        })
}
