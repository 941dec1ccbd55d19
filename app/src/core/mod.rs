pub mod hub;
pub mod judge;
pub mod live;
pub mod poll_queue;
pub mod single_player;
pub mod supervisor;
pub mod team;
