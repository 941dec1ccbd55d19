//! Live message handlers tying hub room bindings to team room membership.

use serde_json::Value;
use tracing::{debug, warn};

use crate::{
    core::hub::{ConnectionId, Envelope, LiveSink, LiveStream, kind},
    error::{AppError, AppResult},
    state::AppState,
};

/// Registers the room join/leave handlers and the disconnect hook.
pub fn install(state: &AppState) {
    let teams = state.team_rooms.clone();
    state.hub.on(kind::TEAM_ROOM_JOIN, move |ctx, data| {
        let teams = teams.clone();
        async move {
            if ctx.user_id <= 0 {
                return Err(AppError::Unauthorized);
            }
            let room_id = requested_room(data.as_ref(), ctx.room_id)?;
            let room = teams.join_room(ctx.user_id, room_id).await?;
            ctx.hub.bind_room(ctx.connection, room_id);

            let previous = ctx.room_id;
            if previous > 0
                && previous != room_id
                && !ctx.hub.active_room_user_ids(previous).contains(&ctx.user_id)
            {
                if let Err(e) = teams.leave_room(ctx.user_id, previous).await {
                    debug!(room_id = previous, user_id = ctx.user_id, "leaving previous room failed: {e}");
                }
            }

            ctx.hub
                .send(ctx.connection, &Envelope::success(kind::TEAM_ROOM_JOIN, room))
                .await
        }
    });

    let teams = state.team_rooms.clone();
    state.hub.on(kind::TEAM_ROOM_LEAVE, move |ctx, data| {
        let teams = teams.clone();
        async move {
            if ctx.user_id <= 0 {
                return Err(AppError::Unauthorized);
            }
            let room_id = requested_room(data.as_ref(), ctx.room_id)?;
            let room = teams.leave_room(ctx.user_id, room_id).await?;
            ctx.hub.unbind_room(ctx.connection, room_id);
            ctx.hub
                .send(ctx.connection, &Envelope::success(kind::TEAM_ROOM_LEAVE, room))
                .await
        }
    });

    let teams = state.team_rooms.clone();
    state.hub.on_leave(move |ctx| {
        let teams = teams.clone();
        async move {
            // another tab of the same user is still in the room
            if ctx.hub.active_room_user_ids(ctx.room_id).contains(&ctx.user_id) {
                return;
            }
            if let Err(e) = teams.leave_room(ctx.user_id, ctx.room_id).await {
                debug!(room_id = ctx.room_id, user_id = ctx.user_id, "implicit leave failed: {e}");
            }
        }
    });
}

/// Registers an upgraded connection, joins `room_id` when positive and
/// starts its loops.
pub async fn accept(
    state: &AppState,
    sink: Box<dyn LiveSink>,
    stream: Box<dyn LiveStream>,
    user_id: i32,
    room_id: i32,
) -> ConnectionId {
    let id = state.hub.register(sink, user_id, 0);
    state.verdicts.mark_active(user_id);

    if room_id > 0 {
        match state.team_rooms.join_room(user_id, room_id).await {
            Ok(_) => {
                state.hub.bind_room(id, room_id);
            }
            Err(e) => {
                warn!(connection = id, user_id, room_id, "auto join failed: {e}");
                let reply = Envelope::error(e.live_code(), e.to_string());
                if let Err(e) = state.hub.send(id, &reply).await {
                    debug!(connection = id, "failed to report auto join failure: {e}");
                }
            }
        }
    }

    state.hub.serve(id, stream);
    id
}

/// Room id from `{"room_id": "12"}` or `{"room_id": 12}`, falling back to
/// the connection's current room.
fn requested_room(data: Option<&Value>, current: i32) -> AppResult<i32> {
    let invalid = || AppError::invalid("room_id must be a positive integer");
    let room_id = match data.and_then(|d| d.get("room_id")) {
        None | Some(Value::Null) => current,
        Some(Value::String(raw)) if raw.trim().is_empty() => current,
        Some(Value::String(raw)) => raw.trim().parse().map_err(|_| invalid())?,
        Some(Value::Number(n)) => n
            .as_i64()
            .and_then(|n| i32::try_from(n).ok())
            .ok_or_else(invalid)?,
        Some(_) => return Err(invalid()),
    };
    if room_id <= 0 {
        return Err(AppError::invalid("room_id is required"));
    }
    Ok(room_id)
}
