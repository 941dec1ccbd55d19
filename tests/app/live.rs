use std::time::Duration;

use app::{
    core::{
        hub::{LiveSink, TransportError},
        live,
    },
    error::code,
};
use async_trait::async_trait;
use chrono::Utc;
use models::schemas::team_room::{TeamPlayer, TeamProblem, TeamRoomExtra};

use app::persistence::team_rooms::{self, NewTeamRoom};

use crate::common::{Client, IdleStream, eventually, seed_user, test_state};

async fn room_for(state: &app::state::AppState, creator_id: i32) -> i32 {
    let problems = vec![TeamProblem {
        problem_id: "1A".into(),
        ..Default::default()
    }];
    let players = vec![TeamPlayer {
        user_id: creator_id,
        username: String::new(),
        join_at: Utc::now().timestamp(),
    }];
    team_rooms::create_room(
        &state.conn,
        NewTeamRoom {
            creator_id,
            mode: "quick",
            problems: &problems,
            players: &players,
            problem_status: &[],
            extra: &TeamRoomExtra::default(),
        },
    )
    .await
    .unwrap()
    .id
}

/// Transport whose peer is gone.
struct DeadSink;

#[async_trait]
impl LiveSink for DeadSink {
    async fn send_text(&mut self, _: String) -> Result<(), TransportError> {
        Err(TransportError::Closed)
    }

    async fn send_ping(&mut self) -> Result<(), TransportError> {
        Err(TransportError::Closed)
    }

    async fn close(&mut self) -> Result<(), TransportError> {
        Ok(())
    }
}

async fn player_ids(state: &app::state::AppState, room_id: i32) -> Vec<i32> {
    let room = state.team_rooms.room_info(room_id).await.unwrap();
    room.players.iter().map(|p| p.user_id).collect()
}

#[test_log::test(tokio::test)]
async fn join_message_binds_and_disconnect_leaves() {
    let state = test_state().await;
    let a = seed_user(&state.conn, "ana", 1400).await;
    let b = seed_user(&state.conn, "ben", 1400).await;
    let room_id = room_for(&state, a.id).await;

    let mut client = Client::connect(&state, b.id, 0);
    let join = format!(r#"{{"type":"team_room_join","data":{{"room_id":"{room_id}"}}}}"#);
    state.hub.dispatch(client.id, &join).await;

    let reply = client.drain();
    let reply = reply.last().expect("join reply");
    assert_eq!(reply["type"], "team_room_join");
    assert_eq!(reply["code"], code::SUCCESS);
    assert_eq!(reply["data"]["id"], room_id);
    assert_eq!(state.hub.active_room_user_ids(room_id), vec![b.id]);
    assert_eq!(player_ids(&state, room_id).await, vec![a.id, b.id]);

    assert!(state.hub.unregister(client.id).await);
    assert_eq!(player_ids(&state, room_id).await, vec![a.id]);
}

#[test_log::test(tokio::test)]
async fn second_tab_keeps_the_player_in_the_room() {
    let state = test_state().await;
    let a = seed_user(&state.conn, "ana", 1400).await;
    let room_id = room_for(&state, a.id).await;

    let first = Client::connect(&state, a.id, room_id);
    let _second = Client::connect(&state, a.id, room_id);
    assert!(state.hub.unregister(first.id).await);
    assert_eq!(player_ids(&state, room_id).await, vec![a.id]);
}

#[test_log::test(tokio::test)]
async fn leave_message_and_bad_requests() {
    let state = test_state().await;
    let a = seed_user(&state.conn, "ana", 1400).await;
    let b = seed_user(&state.conn, "ben", 1400).await;
    let room_id = room_for(&state, a.id).await;

    let mut client = Client::connect(&state, b.id, 0);
    state
        .hub
        .dispatch(client.id, &format!(r#"{{"type":"team_room_join","data":{{"room_id":{room_id}}}}}"#))
        .await;
    state
        .hub
        .dispatch(client.id, r#"{"type":"team_room_leave"}"#)
        .await;
    let kinds = client.kinds();
    // still bound while the leave is announced, so it sees its own departure
    assert!(kinds.ends_with(&[
        "team_room_join".to_owned(),
        "team_room_member_update".to_owned(),
        "team_room_leave".to_owned(),
    ]));
    assert!(state.hub.active_room_user_ids(room_id).is_empty());
    assert_eq!(player_ids(&state, room_id).await, vec![a.id]);

    state
        .hub
        .dispatch(client.id, r#"{"type":"team_room_join","data":{"room_id":"abc"}}"#)
        .await;
    state
        .hub
        .dispatch(client.id, r#"{"type":"team_room_join","data":{"room_id":9999}}"#)
        .await;
    let errors = client.drain();
    assert_eq!(errors.len(), 2);
    assert_eq!(errors[0]["type"], "error");
    assert_eq!(errors[0]["code"], code::PARAM_NOT_VALID);
    assert_eq!(errors[1]["code"], code::NOT_FOUND);

    let mut anonymous = Client::connect(&state, 0, 0);
    state
        .hub
        .dispatch(anonymous.id, &format!(r#"{{"type":"team_room_join","data":{{"room_id":{room_id}}}}}"#))
        .await;
    assert_eq!(anonymous.drain()[0]["code"], code::UNAUTHORIZED);
}

#[test_log::test(tokio::test)]
async fn accept_joins_the_requested_room() {
    let state = test_state().await;
    let a = seed_user(&state.conn, "ana", 1400).await;
    let b = seed_user(&state.conn, "ben", 1400).await;
    let room_id = room_for(&state, a.id).await;

    let (sink, mut client) = Client::detached();
    client.id = live::accept(&state, sink, Box::new(IdleStream), b.id, room_id).await;
    assert!(state.hub.is_registered(client.id));
    assert_eq!(state.hub.active_room_user_ids(room_id), vec![b.id]);
    assert_eq!(player_ids(&state, room_id).await, vec![a.id, b.id]);
    assert!(state.team_rooms.is_running(room_id));

    let (sink, mut lost) = Client::detached();
    lost.id = live::accept(&state, sink, Box::new(IdleStream), b.id, 777).await;
    let reply = lost.drain();
    assert_eq!(reply[0]["type"], "error");
    assert_eq!(reply[0]["code"], code::NOT_FOUND);
    assert!(state.hub.is_registered(lost.id));

    // closing the joined tab drops the player even though another tab is open
    assert!(state.hub.unregister(client.id).await);
    let (state, creator) = (&state, a.id);
    eventually(|| async move { player_ids(state, room_id).await == vec![creator] }).await;
}

#[test_log::test(tokio::test)]
async fn dead_peer_in_the_room_does_not_wedge_membership() {
    let state = test_state().await;
    let a = seed_user(&state.conn, "ana", 1400).await;
    let b = seed_user(&state.conn, "ben", 1400).await;
    let c = seed_user(&state.conn, "cat", 1400).await;
    let room_id = room_for(&state, a.id).await;

    state.team_rooms.join_room(b.id, room_id).await.unwrap();
    let dead = state.hub.register(Box::new(DeadSink), b.id, room_id);

    let joined = tokio::time::timeout(Duration::from_secs(3), state.team_rooms.join_room(c.id, room_id))
        .await
        .expect("join finishes while a peer is dead")
        .unwrap();
    assert!(joined.players.iter().any(|p| p.user_id == c.id));

    // the failed send dropped the dead connection and its player
    assert!(!state.hub.is_registered(dead));
    let (state_ref, expected) = (&state, vec![a.id, c.id]);
    eventually(|| {
        let expected = expected.clone();
        async move { player_ids(state_ref, room_id).await == expected }
    })
    .await;

    let left = tokio::time::timeout(Duration::from_secs(3), state.team_rooms.leave_room(c.id, room_id))
        .await
        .expect("leave finishes")
        .unwrap();
    assert_eq!(left.players.len(), 1);
}

#[test_log::test(tokio::test)]
async fn failed_leave_keeps_the_binding() {
    let state = test_state().await;
    let b = seed_user(&state.conn, "ben", 1400).await;

    // bound to a room that storage does not know
    let mut client = Client::connect(&state, b.id, 4242);
    state
        .hub
        .dispatch(client.id, r#"{"type":"team_room_leave"}"#)
        .await;

    let reply = client.drain();
    assert_eq!(reply[0]["type"], "error");
    assert_eq!(reply[0]["code"], code::NOT_FOUND);
    assert_eq!(state.hub.active_room_user_ids(4242), vec![b.id]);
}
