use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::error::code;

/// Message types on the live channel.
pub mod kind {
    pub const PING: &str = "ping";
    pub const PONG: &str = "pong";
    pub const ERROR: &str = "error";
    pub const TEAM_ROOM_JOIN: &str = "team_room_join";
    pub const TEAM_ROOM_LEAVE: &str = "team_room_leave";
    pub const SINGLE_ROOM_UPDATE: &str = "single_room_update";
    pub const SINGLE_ROOM_FINISH: &str = "single_room_finish";
    pub const TEAM_ROOM_UPDATE: &str = "team_room_update";
    pub const TEAM_ROOM_FINISH: &str = "team_room_finish";
    pub const TEAM_ROOM_MEMBER_UPDATE: &str = "team_room_member_update";
}

#[derive(Deserialize, Debug)]
pub struct Inbound {
    #[serde(rename = "type", default)]
    pub kind: String,
    #[serde(default)]
    pub data: Option<Value>,
}

#[derive(Serialize, Deserialize, Debug, Clone)]
pub struct Envelope<T> {
    #[serde(rename = "type")]
    pub kind: String,
    pub code: i32,
    pub message: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub data: Option<T>,
}

impl<T> Envelope<T> {
    pub fn success(kind: &str, data: T) -> Self {
        Self {
            kind: kind.to_owned(),
            code: code::SUCCESS,
            message: "success".into(),
            data: Some(data),
        }
    }
}

impl Envelope<()> {
    pub fn error(code: i32, message: impl Into<String>) -> Self {
        Self {
            kind: kind::ERROR.into(),
            code,
            message: message.into(),
            data: None,
        }
    }
}
