use chrono::{DateTime, FixedOffset};
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

use crate::domains::{sea_orm_active_enums::TeamRoomStatus, team_rooms};

use super::{blob::JsonBlob, verdict::Verdict};

#[derive(Serialize, Deserialize, Clone, Debug, Default, PartialEq, Eq, ToSchema)]
pub struct TeamProblem {
    pub problem_id: String,
    #[serde(default)]
    pub problem_url: String,
    #[serde(default)]
    pub difficulty: i32,
}

#[derive(Serialize, Deserialize, Clone, Debug, Default, PartialEq, Eq, ToSchema)]
pub struct TeamPlayer {
    pub user_id: i32,
    #[serde(default)]
    pub username: String,
    /// Unix seconds.
    #[serde(default)]
    pub join_at: i64,
}

#[derive(Serialize, Deserialize, Clone, Debug, PartialEq, Eq, ToSchema)]
pub struct TeamSubmission {
    pub submission_id: i64,
    pub problem_id: String,
    pub user_id: i32,
    #[serde(default)]
    #[schema(value_type = String)]
    pub verdict: Verdict,
    #[serde(default)]
    pub submit_time: i64,
}

#[derive(Serialize, Deserialize, Clone, Debug, Default, PartialEq, Eq, ToSchema)]
pub struct TeamProblemStatus {
    pub problem_id: String,
    #[serde(default)]
    pub solved: bool,
    #[serde(default)]
    pub solved_by: i32,
    /// Minutes.
    #[serde(default)]
    pub penalty: i32,
    /// Seconds since the room started.
    #[serde(default)]
    pub solved_at: i64,
}

/// Contents of `team_rooms.extra_info`.
#[derive(Serialize, Deserialize, Clone, Debug, Default, PartialEq, Eq, ToSchema)]
pub struct TeamRoomExtra {
    /// Seconds: sum of solve time plus penalty minutes over solved problems.
    #[serde(default)]
    pub score: i64,
    #[serde(default)]
    pub duration_seconds: i64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub all_solved: Option<bool>,
    #[serde(default)]
    pub solved_count: i32,
}

impl JsonBlob for TeamRoomExtra {}

/// Full typed state of a team room.
#[derive(Serialize, Deserialize, Clone, Debug, ToSchema)]
pub struct TeamRoomInfo {
    pub id: i32,
    pub creator_id: i32,
    pub mode: String,
    pub status: TeamRoomStatus,
    pub problems: Vec<TeamProblem>,
    pub players: Vec<TeamPlayer>,
    pub problem_status: Vec<TeamProblemStatus>,
    pub submissions: Vec<TeamSubmission>,
    pub extra: TeamRoomExtra,
    pub created_at: DateTime<FixedOffset>,
    pub end_time: Option<DateTime<FixedOffset>>,
}

impl From<team_rooms::Model> for TeamRoomInfo {
    fn from(room: team_rooms::Model) -> Self {
        Self {
            id: room.id,
            creator_id: room.creator_id,
            mode: room.mode,
            status: room.status,
            problems: Vec::parse(&room.problem_list),
            players: Vec::parse(&room.player_list),
            problem_status: Vec::parse(&room.problem_status),
            submissions: Vec::parse(&room.submission_records),
            extra: TeamRoomExtra::parse(&room.extra_info),
            created_at: room.created_at,
            end_time: room.end_time,
        }
    }
}

#[derive(Serialize, Deserialize, Clone, Debug, ToSchema)]
pub struct TeamRoomListItem {
    pub id: i32,
    pub creator_id: i32,
    pub mode: String,
    pub status: TeamRoomStatus,
    pub player_count: usize,
    pub problem_count: usize,
    pub created_at: DateTime<FixedOffset>,
    pub end_time: Option<DateTime<FixedOffset>>,
}

impl From<team_rooms::Model> for TeamRoomListItem {
    fn from(room: team_rooms::Model) -> Self {
        Self {
            id: room.id,
            creator_id: room.creator_id,
            mode: room.mode.clone(),
            status: room.status,
            player_count: Vec::<TeamPlayer>::parse(&room.player_list).len(),
            problem_count: Vec::<TeamProblem>::parse(&room.problem_list).len(),
            created_at: room.created_at,
            end_time: room.end_time,
        }
    }
}

#[derive(Serialize, Deserialize, Clone, Debug, ToSchema)]
pub struct TeamModeSchema {
    pub key: String,
    pub name: String,
    pub duration_seconds: i64,
    pub problem_count: usize,
}
