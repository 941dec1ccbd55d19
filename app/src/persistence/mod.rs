pub mod problems;
pub mod single_rooms;
pub mod team_rooms;
pub mod users;
