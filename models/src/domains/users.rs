use sea_orm::entity::prelude::*;

#[derive(Clone, Debug, PartialEq, DeriveEntityModel, Eq)]
#[sea_orm(table_name = "users")]
pub struct Model {
    #[sea_orm(primary_key)]
    pub id: i32,
    /// Doubles as the judge handle unless one is resolved explicitly.
    #[sea_orm(unique)]
    pub username: String,
    #[sea_orm(unique)]
    pub email: String,
    pub passhash: String,
    pub rating: i32,
    pub created_at: DateTimeWithTimeZone,
    pub updated_at: DateTimeWithTimeZone,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {
    #[sea_orm(has_many = "super::single_player_rooms::Entity")]
    SinglePlayerRooms,
    #[sea_orm(has_many = "super::team_rooms::Entity")]
    TeamRooms,
}

impl Related<super::single_player_rooms::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::SinglePlayerRooms.def()
    }
}

impl Related<super::team_rooms::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::TeamRooms.def()
    }
}

impl ActiveModelBehavior for ActiveModel {}
