pub mod blob;
pub mod pagination;
pub mod single_room;
pub mod team_room;
pub mod user;
pub mod verdict;
