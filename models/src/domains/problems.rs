use sea_orm::entity::prelude::*;

#[derive(Clone, Debug, PartialEq, DeriveEntityModel, Eq)]
#[sea_orm(table_name = "problems")]
pub struct Model {
    /// Contest id followed by the problem index, e.g. `1850A`.
    #[sea_orm(primary_key, auto_increment = false)]
    pub id: String,
    pub name: String,
    pub url: String,
    pub difficulty: i32,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {
    #[sea_orm(has_many = "super::single_player_rooms::Entity")]
    SinglePlayerRooms,
}

impl Related<super::single_player_rooms::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::SinglePlayerRooms.def()
    }
}

impl ActiveModelBehavior for ActiveModel {}
