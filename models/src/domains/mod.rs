pub mod problems;
pub mod sea_orm_active_enums;
pub mod single_player_rooms;
pub mod team_rooms;
pub mod users;
