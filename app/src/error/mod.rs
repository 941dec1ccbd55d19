use axum::http::StatusCode;
use sea_orm::DbErr;

use crate::core::{hub::TransportError, judge::JudgeError};

/// Result codes carried by live envelopes.
pub mod code {
    pub const SUCCESS: i32 = 0;
    pub const COMMON_FAIL: i32 = 1000;
    pub const PARAM_NOT_VALID: i32 = 1001;
    pub const MESSAGE_NOT_EXIST: i32 = 1002;
    pub const NOT_FOUND: i32 = 1003;
    pub const PERMISSION_DENIED: i32 = 1004;
    pub const UNAUTHORIZED: i32 = 1005;
}

#[derive(Debug, thiserror::Error)]
pub enum AppError {
    #[error("invalid parameter: {0}")]
    InvalidParam(String),
    #[error("{0} not found")]
    NotFound(String),
    #[error("permission denied")]
    PermissionDenied,
    #[error("unauthorized")]
    Unauthorized,
    #[error("{0}")]
    Conflict(String),
    #[error(transparent)]
    Database(#[from] DbErr),
    #[error(transparent)]
    Judge(#[from] JudgeError),
    #[error(transparent)]
    Transport(#[from] TransportError),
    #[error(transparent)]
    Internal(#[from] anyhow::Error),
}

pub type AppResult<T> = Result<T, AppError>;

impl AppError {
    pub fn not_found(what: impl Into<String>) -> Self {
        Self::NotFound(what.into())
    }

    pub fn invalid(reason: impl Into<String>) -> Self {
        Self::InvalidParam(reason.into())
    }

    pub fn status_code(&self) -> StatusCode {
        match self {
            Self::InvalidParam(_) => StatusCode::BAD_REQUEST,
            Self::NotFound(_) => StatusCode::NOT_FOUND,
            Self::PermissionDenied => StatusCode::FORBIDDEN,
            Self::Unauthorized => StatusCode::UNAUTHORIZED,
            Self::Conflict(_) => StatusCode::CONFLICT,
            Self::Judge(_) => StatusCode::BAD_GATEWAY,
            Self::Database(_) | Self::Transport(_) | Self::Internal(_) => {
                StatusCode::INTERNAL_SERVER_ERROR
            }
        }
    }

    pub fn live_code(&self) -> i32 {
        match self {
            Self::InvalidParam(_) => code::PARAM_NOT_VALID,
            Self::NotFound(_) => code::NOT_FOUND,
            Self::PermissionDenied => code::PERMISSION_DENIED,
            Self::Unauthorized => code::UNAUTHORIZED,
            _ => code::COMMON_FAIL,
        }
    }
}
