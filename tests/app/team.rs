use app::{
    error::AppError,
    persistence::team_rooms::{self, NewTeamRoom},
};
use chrono::{TimeDelta, Utc};
use models::{
    domains::{sea_orm_active_enums::TeamRoomStatus, team_rooms as team_room_entity, users},
    queries::TeamRoomQuery,
    schemas::team_room::{TeamPlayer, TeamProblem, TeamProblemStatus, TeamRoomExtra, TeamRoomInfo},
};
use sea_orm::{ActiveModelTrait, Set};

use app::state::AppState;

use crate::common::{Client, eventually, seed_problem, seed_user, test_state, verdict};

/// Opens a room straight in storage, `age` in the past.
async fn open_room(
    state: &AppState,
    creator: &users::Model,
    problem_ids: &[&str],
    status: Vec<TeamProblemStatus>,
    age: TimeDelta,
    duration_seconds: i64,
) -> TeamRoomInfo {
    let problems: Vec<TeamProblem> = problem_ids
        .iter()
        .map(|id| TeamProblem {
            problem_id: (*id).to_owned(),
            ..Default::default()
        })
        .collect();
    let players = vec![TeamPlayer {
        user_id: creator.id,
        username: creator.username.clone(),
        join_at: Utc::now().timestamp(),
    }];
    let extra = TeamRoomExtra {
        duration_seconds,
        ..Default::default()
    };
    let room = team_rooms::create_room(
        &state.conn,
        NewTeamRoom {
            creator_id: creator.id,
            mode: "quick",
            problems: &problems,
            players: &players,
            problem_status: &status,
            extra: &extra,
        },
    )
    .await
    .unwrap();
    team_room_entity::ActiveModel {
        id: Set(room.id),
        created_at: Set((Utc::now() - age).fixed_offset()),
        ..Default::default()
    }
    .update(&state.conn)
    .await
    .unwrap()
    .into()
}

async fn room_status(state: &AppState, room_id: i32) -> TeamRoomStatus {
    state.team_rooms.room_info(room_id).await.unwrap().status
}

#[test_log::test(tokio::test)]
async fn room_finishes_when_every_problem_is_solved() {
    let state = test_state().await;
    let a = seed_user(&state.conn, "ana", 1400).await;
    let b = seed_user(&state.conn, "ben", 1600).await;
    let room = open_room(
        &state,
        &a,
        &["1A", "1B", "1C"],
        Vec::new(),
        TimeDelta::minutes(10),
        3 * 60 * 60,
    )
    .await;
    let room_id = room.id;
    let mut watcher = Client::connect(&state, a.id, room_id);
    let _peer = Client::connect(&state, b.id, room_id);
    assert!(state.team_rooms.start_worker(room));

    state.verdicts.store_verdicts(
        a.id,
        vec![verdict(2, "1B", "WRONG_ANSWER"), verdict(1, "1A", "OK"), verdict(9, "2Z", "OK")],
    );
    let teams = &state.team_rooms;
    eventually(|| async move {
        let room = teams.room_info(room_id).await.unwrap();
        room.submissions.len() == 2
    })
    .await;

    state
        .verdicts
        .store_verdicts(b.id, vec![verdict(4, "1C", "OK"), verdict(3, "1B", "OK")]);
    eventually(|| async move {
        teams.room_info(room_id).await.unwrap().status == TeamRoomStatus::Finished
    })
    .await;

    let room = state.team_rooms.room_info(room_id).await.unwrap();
    assert_eq!(room.extra.all_solved, Some(true));
    assert_eq!(room.extra.solved_count, 3);
    assert!(room.end_time.is_some());
    assert_eq!(room.submissions.len(), 4);

    let b_status = &room.problem_status[1];
    assert_eq!(b_status.problem_id, "1B");
    assert!(b_status.solved);
    assert_eq!(b_status.solved_by, b.id);
    assert_eq!(b_status.penalty, 20);
    let solved_at: i64 = room.problem_status.iter().map(|s| s.solved_at).sum();
    assert!(solved_at >= 3 * 600);
    assert_eq!(room.extra.score, solved_at + 20 * 60);

    eventually(|| async move { !teams.is_running(room_id) }).await;
    let messages = watcher.drain();
    let last = messages.last().expect("finish broadcast");
    assert_eq!(last["type"], "team_room_finish");
    assert_eq!(last["data"]["all_solved"], true);
    assert_eq!(last["data"]["solved_count"], 3);
    let updates = messages
        .iter()
        .filter(|m| m["type"] == "team_room_update")
        .count();
    assert_eq!(updates, 4);
}

#[test_log::test(tokio::test)]
async fn room_times_out_with_partial_credit() {
    let state = test_state().await;
    let a = seed_user(&state.conn, "ana", 1400).await;
    let solved = TeamProblemStatus {
        problem_id: "1A".into(),
        solved: true,
        solved_by: a.id,
        penalty: 20,
        solved_at: 100,
    };
    let room = open_room(
        &state,
        &a,
        &["1A", "1B"],
        vec![solved],
        TimeDelta::hours(4),
        3 * 60 * 60,
    )
    .await;
    let room_id = room.id;
    let mut watcher = Client::connect(&state, a.id, room_id);
    state
        .verdicts
        .store_verdicts(a.id, vec![verdict(5, "1B", "OK")]);
    assert!(state.team_rooms.start_worker(room));

    let teams = &state.team_rooms;
    eventually(|| async move { room_status_is_finished(teams, room_id).await }).await;

    let room = state.team_rooms.room_info(room_id).await.unwrap();
    assert_eq!(room.extra.all_solved, Some(false));
    assert_eq!(room.extra.solved_count, 1);
    assert_eq!(room.extra.score, 100 + 20 * 60);
    assert!(room.submissions.is_empty());
    assert!(!room.problem_status[1].solved);

    eventually(|| async move { !teams.is_running(room_id) }).await;
    assert_eq!(watcher.kinds(), vec!["team_room_finish".to_owned()]);
}

async fn room_status_is_finished(teams: &app::core::team::TeamRoomManager, room_id: i32) -> bool {
    teams.room_info(room_id).await.unwrap().status == TeamRoomStatus::Finished
}

#[test_log::test(tokio::test)]
async fn create_room_draws_distinct_problems_for_the_mode() {
    let state = test_state().await;
    let user = seed_user(&state.conn, "cat", 1500).await;
    for difficulty in [1300, 1400, 1500, 1600, 1700] {
        seed_problem(&state.conn, &format!("{difficulty}A"), difficulty).await;
        seed_problem(&state.conn, &format!("{difficulty}B"), difficulty).await;
    }

    let room = state.team_rooms.create_room(user.id, "quick").await.unwrap();
    assert_eq!(room.status, TeamRoomStatus::InProgress);
    assert_eq!(room.problems.len(), 5);
    assert_eq!(room.problem_status.len(), 5);
    assert_eq!(room.extra.duration_seconds, 60 * 60);
    assert_eq!(room.players.len(), 1);
    assert_eq!(room.players[0].user_id, user.id);
    assert_eq!(room.players[0].username, "cat");
    assert!(state.team_rooms.is_running(room.id));

    let mut ids: Vec<&str> = room.problems.iter().map(|p| p.problem_id.as_str()).collect();
    ids.sort_unstable();
    ids.dedup();
    assert_eq!(ids.len(), 5);
    assert!(
        room.problems
            .iter()
            .all(|p| (1200..=1800).contains(&p.difficulty))
    );

    let err = state.team_rooms.create_room(user.id, "marathon").await.unwrap_err();
    assert!(matches!(err, AppError::InvalidParam(_)));
    // no easy problems seeded for the fixed div3 set
    let err = state.team_rooms.create_room(user.id, "div3").await.unwrap_err();
    assert!(matches!(err, AppError::NotFound(_)));
}

#[test_log::test(tokio::test)]
async fn players_join_and_leave() {
    let state = test_state().await;
    let a = seed_user(&state.conn, "ana", 1400).await;
    let b = seed_user(&state.conn, "ben", 1600).await;
    let room = open_room(&state, &a, &["1A"], Vec::new(), TimeDelta::zero(), 0).await;
    let mut watcher = Client::connect(&state, a.id, room.id);

    let joined = state.team_rooms.join_room(b.id, room.id).await.unwrap();
    assert_eq!(joined.players.len(), 2);
    assert!(state.team_rooms.is_running(room.id));
    let again = state.team_rooms.join_room(b.id, room.id).await.unwrap();
    assert_eq!(again.players.len(), 2);

    let messages = watcher.drain();
    assert_eq!(messages.len(), 2);
    assert_eq!(messages[0]["type"], "team_room_member_update");
    assert_eq!(messages[0]["data"]["action"], "join");
    assert_eq!(messages[0]["data"]["user_id"], b.id);

    let left = state.team_rooms.leave_room(b.id, room.id).await.unwrap();
    assert_eq!(left.players.len(), 1);
    assert_eq!(watcher.drain()[0]["data"]["action"], "leave");
    let stored = state.team_rooms.room_info(room.id).await.unwrap();
    assert_eq!(stored.players.len(), 1);

    state.team_rooms.force_finish(room.id).await.unwrap();
    assert_eq!(room_status(&state, room.id).await, TeamRoomStatus::Finished);
    let err = state.team_rooms.join_room(b.id, room.id).await.unwrap_err();
    assert!(matches!(err, AppError::Conflict(_)));
    let err = state.team_rooms.join_room(b.id, 4242).await.unwrap_err();
    assert!(matches!(err, AppError::NotFound(_)));
}

#[test_log::test(tokio::test)]
async fn shutdown_finishes_rooms_with_and_without_workers() {
    let state = test_state().await;
    let a = seed_user(&state.conn, "ana", 1400).await;
    let running = open_room(&state, &a, &["1A"], Vec::new(), TimeDelta::zero(), 0).await;
    let idle = open_room(&state, &a, &["1B"], Vec::new(), TimeDelta::zero(), 0).await;
    assert!(state.team_rooms.start_worker(running.clone()));

    assert_eq!(state.team_rooms.finish_all_active().await.unwrap(), 2);
    assert_eq!(room_status(&state, running.id).await, TeamRoomStatus::Finished);
    assert_eq!(room_status(&state, idle.id).await, TeamRoomStatus::Finished);
    let teams = &state.team_rooms;
    eventually(|| async move { teams.running_rooms().is_empty() }).await;

    // finishing twice leaves the stored result alone
    let before = state.team_rooms.room_info(idle.id).await.unwrap();
    state.team_rooms.force_finish(idle.id).await.unwrap();
    let after = state.team_rooms.room_info(idle.id).await.unwrap();
    assert_eq!(before.end_time, after.end_time);
    assert!(!state.team_rooms.start_worker(after));
}

#[test_log::test(tokio::test)]
async fn rooms_are_listed_newest_first() {
    let state = test_state().await;
    let a = seed_user(&state.conn, "ana", 1400).await;
    let mut ids = Vec::new();
    for _ in 0..3 {
        ids.push(open_room(&state, &a, &["1A"], Vec::new(), TimeDelta::zero(), 0).await.id);
    }
    state.team_rooms.finalize_in_storage(ids[0]).await.unwrap();

    let page = state
        .team_rooms
        .list_rooms(&TeamRoomQuery {
            page: Some(1),
            limit: Some(2),
            status: None,
        })
        .await
        .unwrap();
    assert_eq!(page.total, 3);
    assert_eq!(page.data.len(), 2);
    assert_eq!(page.data[0].player_count, 1);

    let active = state
        .team_rooms
        .list_rooms(&TeamRoomQuery {
            page: None,
            limit: None,
            status: Some(TeamRoomStatus::InProgress),
        })
        .await
        .unwrap();
    assert_eq!(active.total, 2);
    assert!(active.data.iter().all(|r| r.id != ids[0]));

    let empty = state
        .team_rooms
        .list_rooms(&TeamRoomQuery {
            page: Some(5),
            limit: Some(2),
            status: None,
        })
        .await
        .unwrap();
    assert!(empty.data.is_empty());
    assert_eq!(empty.total, 3);
}
