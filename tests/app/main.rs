mod common;
mod live;
mod single;
mod team;
