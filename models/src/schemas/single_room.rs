use chrono::{DateTime, FixedOffset};
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

use crate::domains::{problems, sea_orm_active_enums::SingleRoomStatus, single_player_rooms};

use super::{blob::JsonBlob, verdict::Verdict};

#[derive(Serialize, Deserialize, Clone, Debug, PartialEq, Eq, ToSchema)]
pub struct SingleSubmission {
    pub submission_id: i64,
    #[serde(default)]
    pub problem_id: String,
    #[serde(default)]
    #[schema(value_type = String)]
    pub verdict: Verdict,
    #[serde(default)]
    pub submit_time: i64,
}

/// Contents of `single_player_rooms.extra_info`.
#[derive(Serialize, Deserialize, Clone, Debug, Default, PartialEq, Eq)]
pub struct SingleRoomExtra {
    #[serde(default)]
    pub submissions: Vec<SingleSubmission>,
}

impl JsonBlob for SingleRoomExtra {}

#[derive(Serialize, Deserialize, Clone, Debug, ToSchema)]
pub struct SingleRoomInfo {
    pub id: i32,
    pub user_id: i32,
    pub problem_id: String,
    pub problem_name: String,
    pub problem_url: String,
    pub difficulty: i32,
    pub status: SingleRoomStatus,
    pub penalty: i32,
    pub performance: i32,
    pub rating_before: i32,
    pub rating_after: i32,
    pub created_at: DateTime<FixedOffset>,
    pub end_time: Option<DateTime<FixedOffset>>,
    pub submissions: Vec<SingleSubmission>,
}

impl SingleRoomInfo {
    pub fn new(room: single_player_rooms::Model, problem: Option<&problems::Model>) -> Self {
        let extra = SingleRoomExtra::parse(&room.extra_info);
        Self {
            id: room.id,
            user_id: room.user_id,
            problem_id: room.problem_id,
            problem_name: problem.map(|p| p.name.clone()).unwrap_or_default(),
            problem_url: problem.map(|p| p.url.clone()).unwrap_or_default(),
            difficulty: problem.map(|p| p.difficulty).unwrap_or_default(),
            status: room.status,
            penalty: room.penalty,
            performance: room.performance,
            rating_before: room.rating_before,
            rating_after: room.rating_after,
            created_at: room.created_at,
            end_time: room.end_time,
            submissions: extra.submissions,
        }
    }
}
