use serde::Deserialize;
use utoipa::IntoParams;

use crate::domains::sea_orm_active_enums::TeamRoomStatus;

pub const DEFAULT_PAGE_LIMIT: u64 = 20;

#[derive(Deserialize, Debug, IntoParams)]
#[into_params(parameter_in = Query)]
pub struct TeamRoomQuery {
    pub page: Option<u64>,
    pub limit: Option<u64>,
    pub status: Option<TeamRoomStatus>,
}

impl TeamRoomQuery {
    /// One-based page and a non-zero limit.
    pub fn bounds(&self) -> (u64, u64) {
        let page = self.page.unwrap_or(1).max(1);
        let limit = match self.limit {
            Some(limit) if limit > 0 => limit.min(100),
            _ => DEFAULT_PAGE_LIMIT,
        };
        (page, limit)
    }
}

impl Default for TeamRoomQuery {
    fn default() -> Self {
        Self {
            page: Some(1),
            limit: Some(DEFAULT_PAGE_LIMIT),
            status: None,
        }
    }
}

/// Query string of the live connection upgrade.
#[derive(Deserialize, Debug, Default)]
pub struct LiveQuery {
    #[serde(default)]
    pub room_id: i32,
    pub token: Option<String>,
}
