pub mod single_room;
pub mod team_room;
