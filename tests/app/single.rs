use app::{
    error::AppError,
    persistence::{single_rooms, users::get_user},
};
use chrono::{TimeDelta, Utc};
use models::domains::{sea_orm_active_enums::SingleRoomStatus, single_player_rooms};
use sea_orm::{ActiveModelTrait, DatabaseConnection, Set};

use crate::common::{Client, eventually, seed_problem, seed_user, test_state, verdict};

async fn backdate(conn: &DatabaseConnection, room_id: i32, age: TimeDelta) -> single_player_rooms::Model {
    single_player_rooms::ActiveModel {
        id: Set(room_id),
        created_at: Set((Utc::now() - age).fixed_offset()),
        ..Default::default()
    }
    .update(conn)
    .await
    .expect("backdate room")
}

async fn status_of(conn: &DatabaseConnection, room_id: i32) -> single_player_rooms::Model {
    single_rooms::get_room(conn, room_id)
        .await
        .unwrap()
        .expect("room exists")
}

#[test_log::test(tokio::test)]
async fn wrong_answer_then_accepted_settles_rating() {
    let state = test_state().await;
    let conn = &state.conn;
    let user = seed_user(conn, "alice", 1000).await;
    seed_problem(conn, "1500A", 1500).await;

    let room = single_rooms::create_room(conn, user.id, "1500A", 1000).await.unwrap();
    let room = backdate(conn, room.id, TimeDelta::minutes(8)).await;
    let room_id = room.id;
    let mut client = Client::connect(&state, user.id, 0);
    assert!(state.single_rooms.start_worker(room.clone()).await.unwrap());
    assert!(!state.single_rooms.start_worker(room.clone()).await.unwrap());

    state
        .verdicts
        .store_verdicts(user.id, vec![verdict(11, "1500A", "WRONG_ANSWER")]);
    eventually(|| async move { status_of(conn, room_id).await.penalty == 3 }).await;

    // the same submission seen twice is charged once, other problems are ignored
    state.verdicts.store_verdicts(
        user.id,
        vec![
            verdict(13, "1A", "WRONG_ANSWER"),
            verdict(12, "1500A", "OK"),
            verdict(11, "1500A", "WRONG_ANSWER"),
        ],
    );
    eventually(|| async move {
        status_of(conn, room_id).await.status == SingleRoomStatus::Solved
    })
    .await;

    let finished = state.single_rooms.room_info(room.id).await.unwrap();
    assert_eq!(finished.penalty, 3);
    assert_eq!(finished.performance, 1400);
    assert_eq!(finished.rating_after, 1200);
    assert!(finished.end_time.is_some());
    assert_eq!(finished.submissions.len(), 2);
    assert_eq!(get_user(conn, user.id).await.unwrap().unwrap().rating, 1200);

    let rooms = &state.single_rooms;
    eventually(|| async move { !rooms.is_running(room_id) }).await;
    let messages = client.drain();
    assert_eq!(messages.last().unwrap()["type"], "single_room_finish");
    let updates: Vec<_> = messages
        .iter()
        .filter(|m| m["type"] == "single_room_update")
        .collect();
    assert_eq!(updates.len(), 2);
    assert_eq!(updates[0]["data"]["last_verdict"], "WRONG_ANSWER");
    assert_eq!(updates[0]["data"]["submission"]["submission_id"], 11);
    assert_eq!(updates[1]["data"]["last_verdict"], "OK");

    // a finished room is never finalized again
    assert!(
        state
            .single_rooms
            .finalize(room.id, SingleRoomStatus::Abandoned)
            .await
            .unwrap()
            .is_none()
    );
    assert_eq!(status_of(conn, room.id).await.status, SingleRoomStatus::Solved);
}

#[test_log::test(tokio::test)]
async fn create_room_picks_a_problem_near_the_rating() {
    let state = test_state().await;
    let conn = &state.conn;
    // unrated users are treated as 800
    let user = seed_user(conn, "bob", 0).await;
    seed_problem(conn, "800B", 800).await;
    seed_problem(conn, "2000C", 2000).await;

    let room = state.single_rooms.create_room(user.id).await.unwrap();
    assert_eq!(room.problem_id, "800B");
    assert_eq!(room.rating_before, 800);
    assert_eq!(room.status, SingleRoomStatus::InProgress);
    assert!(state.single_rooms.is_running(room.id));

    let again = state.single_rooms.create_room(user.id).await.unwrap();
    assert_eq!(again.id, room.id);
    assert_eq!(state.single_rooms.running_rooms(), vec![room.id]);

    let active = state.single_rooms.active_room(user.id).await.unwrap();
    assert_eq!(active.map(|r| r.id), Some(room.id));
}

#[test_log::test(tokio::test)]
async fn create_room_without_candidates_fails() {
    let state = test_state().await;
    let user = seed_user(&state.conn, "carol", 1500).await;
    seed_problem(&state.conn, "800A", 800).await;

    let err = state.single_rooms.create_room(user.id).await.unwrap_err();
    assert!(matches!(err, AppError::NotFound(_)));
    let err = state.single_rooms.create_room(999).await.unwrap_err();
    assert!(matches!(err, AppError::NotFound(_)));
}

#[test_log::test(tokio::test)]
async fn only_the_owner_abandons() {
    let state = test_state().await;
    let conn = &state.conn;
    let owner = seed_user(conn, "dave", 1200).await;
    let other = seed_user(conn, "erin", 1200).await;
    seed_problem(conn, "1200A", 1200).await;

    let room = state.single_rooms.create_room(owner.id).await.unwrap();
    let err = state
        .single_rooms
        .abandon(other.id, Some(room.id))
        .await
        .unwrap_err();
    assert!(matches!(err, AppError::PermissionDenied));

    let abandoned = state.single_rooms.abandon(owner.id, None).await.unwrap();
    assert_eq!(abandoned.status, SingleRoomStatus::Abandoned);
    assert_eq!(abandoned.performance, 1000);
    assert_eq!(abandoned.rating_after, 1100);
    assert!(!state.single_rooms.is_running(room.id));

    let again = state
        .single_rooms
        .abandon(owner.id, Some(room.id))
        .await
        .unwrap();
    assert_eq!(again.status, SingleRoomStatus::Abandoned);
    assert_eq!(again.end_time, abandoned.end_time);

    let err = state.single_rooms.abandon(owner.id, None).await.unwrap_err();
    assert!(matches!(err, AppError::NotFound(_)));
}

#[test_log::test(tokio::test)]
async fn sweep_abandons_only_expired_rooms() {
    let state = test_state().await;
    let conn = &state.conn;
    let old = seed_user(conn, "frank", 1000).await;
    let fresh = seed_user(conn, "grace", 1000).await;
    seed_problem(conn, "1000A", 1000).await;

    let stale = single_rooms::create_room(conn, old.id, "1000A", 1000).await.unwrap();
    backdate(conn, stale.id, TimeDelta::hours(6)).await;
    let recent = single_rooms::create_room(conn, fresh.id, "1000A", 1000).await.unwrap();

    assert_eq!(state.single_rooms.sweep_expired().await.unwrap(), 1);
    assert_eq!(status_of(conn, stale.id).await.status, SingleRoomStatus::Abandoned);
    assert_eq!(status_of(conn, recent.id).await.status, SingleRoomStatus::InProgress);

    assert_eq!(state.single_rooms.finish_all_active().await.unwrap(), 1);
    assert_eq!(status_of(conn, recent.id).await.status, SingleRoomStatus::Abandoned);
}
