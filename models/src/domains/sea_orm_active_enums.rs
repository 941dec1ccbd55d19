use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, EnumIter, DeriveActiveEnum, Serialize, Deserialize, ToSchema,
)]
#[serde(rename_all = "snake_case")]
#[sea_orm(rs_type = "i32", db_type = "Integer")]
pub enum SingleRoomStatus {
    #[sea_orm(num_value = 0)]
    InProgress,
    #[sea_orm(num_value = 1)]
    Abandoned,
    #[sea_orm(num_value = 2)]
    Solved,
}

impl SingleRoomStatus {
    pub fn is_terminal(self) -> bool {
        self != Self::InProgress
    }
}

#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, EnumIter, DeriveActiveEnum, Serialize, Deserialize, ToSchema,
)]
#[serde(rename_all = "snake_case")]
#[sea_orm(rs_type = "i32", db_type = "Integer")]
pub enum TeamRoomStatus {
    #[sea_orm(num_value = 0)]
    InProgress,
    #[sea_orm(num_value = 1)]
    Finished,
}
