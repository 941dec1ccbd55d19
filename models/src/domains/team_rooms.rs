use sea_orm::entity::prelude::*;

use super::sea_orm_active_enums::TeamRoomStatus;

/// The list-shaped columns hold JSON text, see `schemas::team_room`.
#[derive(Clone, Debug, PartialEq, DeriveEntityModel, Eq)]
#[sea_orm(table_name = "team_rooms")]
pub struct Model {
    #[sea_orm(primary_key)]
    pub id: i32,
    pub creator_id: i32,
    pub mode: String,
    pub status: TeamRoomStatus,
    #[sea_orm(column_type = "Text")]
    pub problem_list: String,
    #[sea_orm(column_type = "Text")]
    pub player_list: String,
    #[sea_orm(column_type = "Text")]
    pub submission_records: String,
    #[sea_orm(column_type = "Text")]
    pub problem_status: String,
    #[sea_orm(column_type = "Text")]
    pub extra_info: String,
    pub created_at: DateTimeWithTimeZone,
    pub updated_at: DateTimeWithTimeZone,
    pub end_time: Option<DateTimeWithTimeZone>,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {
    #[sea_orm(
        belongs_to = "super::users::Entity",
        from = "Column::CreatorId",
        to = "super::users::Column::Id",
        on_update = "NoAction",
        on_delete = "Cascade"
    )]
    Users,
}

impl Related<super::users::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::Users.def()
    }
}

impl ActiveModelBehavior for ActiveModel {}
