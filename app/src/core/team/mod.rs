//! Team rooms: a shared problem set, first accepted solution per problem
//! wins, finished when everything is solved or time runs out.

use std::sync::Arc;

use chrono::Utc;
use models::{
    domains::sea_orm_active_enums::TeamRoomStatus,
    queries::TeamRoomQuery,
    schemas::{
        pagination::PaginatedData,
        team_room::{
            TeamModeSchema, TeamPlayer, TeamProblem, TeamProblemStatus, TeamRoomExtra, TeamRoomInfo,
            TeamRoomListItem, TeamSubmission,
        },
        verdict::Verdict,
    },
};
use rand::seq::SliceRandom;
use sea_orm::DatabaseConnection;
use serde::Serialize;
use tokio::sync::oneshot;
use tracing::{debug, info, warn};

mod modes;
mod rules;
mod worker;

pub use modes::{MODES, TeamMode, Targets, find_mode, list_modes};
pub use rules::*;
pub use worker::TeamCommand;

use crate::{
    config::Timings,
    core::{
        hub::{ConnectionHub, Envelope, kind},
        poll_queue::VerdictPollQueue,
        single_player::effective_rating,
        supervisor::{KeyedLocks, WorkerRegistry},
    },
    error::{AppError, AppResult},
    persistence::{
        problems,
        team_rooms::{self, NewTeamRoom},
        users::get_user,
    },
};

#[derive(Serialize, Debug, Clone)]
pub struct TeamRoomUpdate {
    pub room: TeamRoomInfo,
    pub user_id: i32,
    pub problem_id: String,
    pub last_verdict: Verdict,
}

#[derive(Serialize, Debug, Clone)]
pub struct TeamRoomFinish {
    pub room: TeamRoomInfo,
    pub all_solved: bool,
    pub solved_count: i32,
}

#[derive(Serialize, Debug, Clone, Copy, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum MemberAction {
    Join,
    Leave,
}

#[derive(Serialize, Debug, Clone)]
pub struct TeamMemberUpdate {
    pub room: TeamRoomInfo,
    pub action: MemberAction,
    pub user_id: i32,
}

struct TeamInner {
    conn: DatabaseConnection,
    hub: ConnectionHub,
    verdicts: VerdictPollQueue,
    timings: Timings,
    workers: WorkerRegistry<TeamCommand>,
    // Join and leave rewrite the whole player list of a room.
    membership: KeyedLocks,
}

#[derive(Clone)]
pub struct TeamRoomManager {
    inner: Arc<TeamInner>,
}

impl TeamRoomManager {
    pub fn new(
        conn: DatabaseConnection,
        hub: ConnectionHub,
        verdicts: VerdictPollQueue,
        timings: Timings,
    ) -> Self {
        Self {
            inner: Arc::new(TeamInner {
                conn,
                hub,
                verdicts,
                timings,
                workers: WorkerRegistry::new(),
                membership: KeyedLocks::new(),
            }),
        }
    }

    pub(crate) fn conn(&self) -> &DatabaseConnection {
        &self.inner.conn
    }

    pub(crate) fn hub(&self) -> &ConnectionHub {
        &self.inner.hub
    }

    pub(crate) fn verdicts(&self) -> &VerdictPollQueue {
        &self.inner.verdicts
    }

    pub(crate) fn timings(&self) -> &Timings {
        &self.inner.timings
    }

    pub(crate) fn release(&self, room_id: i32) {
        self.inner.workers.stop(room_id);
    }

    pub fn is_running(&self, room_id: i32) -> bool {
        self.inner.workers.contains(room_id)
    }

    pub fn running_rooms(&self) -> Vec<i32> {
        self.inner.workers.ids()
    }

    pub fn list_modes(&self) -> Vec<TeamModeSchema> {
        list_modes()
    }

    pub async fn create_room(&self, user_id: i32, mode: &str) -> AppResult<TeamRoomInfo> {
        let mode = find_mode(mode).ok_or_else(|| AppError::invalid(format!("unknown mode {mode}")))?;
        let user = get_user(self.conn(), user_id)
            .await?
            .ok_or_else(|| AppError::not_found(format!("user {user_id}")))?;

        let mut chosen: Vec<models::domains::problems::Model> = Vec::new();
        let mut taken: Vec<String> = Vec::new();
        for target in mode.targets(effective_rating(user.rating)) {
            let (min, max) = ((target - DIFFICULTY_SPREAD).max(0), target + DIFFICULTY_SPREAD);
            let problem = problems::random_in_range(self.conn(), min, max, &taken)
                .await?
                .ok_or_else(|| AppError::not_found(format!("problem rated {min}..={max}")))?;
            taken.push(problem.id.clone());
            chosen.push(problem);
        }
        chosen.shuffle(&mut rand::rng());

        let problems: Vec<TeamProblem> = chosen
            .into_iter()
            .map(|p| TeamProblem {
                problem_id: p.id,
                problem_url: p.url,
                difficulty: p.difficulty,
            })
            .collect();
        let problem_status: Vec<TeamProblemStatus> = problems
            .iter()
            .map(|p| TeamProblemStatus {
                problem_id: p.problem_id.clone(),
                ..Default::default()
            })
            .collect();
        let players = vec![TeamPlayer {
            user_id,
            username: user.username,
            join_at: Utc::now().timestamp(),
        }];
        let extra = TeamRoomExtra {
            duration_seconds: mode.duration_seconds,
            ..Default::default()
        };

        let room = team_rooms::create_room(
            self.conn(),
            NewTeamRoom {
                creator_id: user_id,
                mode: mode.key,
                problems: &problems,
                players: &players,
                problem_status: &problem_status,
                extra: &extra,
            },
        )
        .await?;
        info!(room_id = room.id, user_id, mode = mode.key, "team room created");

        let info = TeamRoomInfo::from(room);
        self.start_worker(info.clone());
        self.inner.verdicts.mark_active(user_id);
        Ok(info)
    }

    /// Spawns the worker of an in-progress room unless it already has one.
    pub fn start_worker(&self, room: TeamRoomInfo) -> bool {
        if room.status != TeamRoomStatus::InProgress {
            return false;
        }
        let manager = self.clone();
        self.inner
            .workers
            .start(room.id, move |commands| worker::run(manager, room, commands))
    }

    /// Resumes every room left in progress by a previous run. Their clocks
    /// keep counting from creation.
    pub async fn start_all_active(&self) -> AppResult<usize> {
        let rooms = team_rooms::list_active(self.conn()).await?;
        let started = rooms
            .into_iter()
            .filter(|room| self.start_worker(TeamRoomInfo::from(room.clone())))
            .count();
        info!(count = started, "team room workers resumed");
        Ok(started)
    }

    pub async fn room_info(&self, room_id: i32) -> AppResult<TeamRoomInfo> {
        let room = team_rooms::get_room(self.conn(), room_id)
            .await?
            .ok_or_else(|| AppError::not_found(format!("room {room_id}")))?;
        Ok(TeamBoard::new(room.into()).room)
    }

    pub async fn list_rooms(&self, query: &TeamRoomQuery) -> AppResult<PaginatedData<TeamRoomListItem>> {
        let (page, limit) = query.bounds();
        let (rooms, total) = team_rooms::list_rooms(self.conn(), query.status, page, limit).await?;
        let items = rooms.into_iter().map(TeamRoomListItem::from).collect();
        Ok(PaginatedData::new(items, page, limit, total))
    }

    /// Adds the user to the room, or refreshes their display name.
    pub async fn join_room(&self, user_id: i32, room_id: i32) -> AppResult<TeamRoomInfo> {
        let user = get_user(self.conn(), user_id)
            .await?
            .ok_or_else(|| AppError::not_found(format!("user {user_id}")))?;

        let room = {
            let _guard = self.inner.membership.lock(room_id).await;
            let mut room = self.room_info(room_id).await?;
            if room.status != TeamRoomStatus::InProgress {
                return Err(AppError::Conflict(format!("room {room_id} is finished")));
            }

            match room.players.iter_mut().find(|p| p.user_id == user_id) {
                Some(player) => player.username = user.username,
                None => room.players.push(TeamPlayer {
                    user_id,
                    username: user.username,
                    join_at: Utc::now().timestamp(),
                }),
            }
            team_rooms::update_players(self.conn(), room_id, &room.players).await?;
            self.start_worker(room.clone());
            let _ = self
                .inner
                .workers
                .send(room_id, TeamCommand::Players(room.players.clone()));
            room
        };
        debug!(room_id, user_id, "player joined team room");

        // A failed send here runs the leave hook, which takes the room lock.
        self.inner.verdicts.mark_active(user_id);
        self.send_member_update(&room, MemberAction::Join, user_id).await;
        Ok(room)
    }

    /// Drops the user from the player list. Solved problems keep their credit.
    pub async fn leave_room(&self, user_id: i32, room_id: i32) -> AppResult<TeamRoomInfo> {
        let room = {
            let _guard = self.inner.membership.lock(room_id).await;
            let mut room = self.room_info(room_id).await?;

            let before = room.players.len();
            room.players.retain(|p| p.user_id != user_id);
            if room.players.len() != before {
                team_rooms::update_players(self.conn(), room_id, &room.players).await?;
                let _ = self
                    .inner
                    .workers
                    .send(room_id, TeamCommand::Players(room.players.clone()));
                debug!(room_id, user_id, "player left team room");
            }
            room
        };

        self.send_member_update(&room, MemberAction::Leave, user_id).await;
        Ok(room)
    }

    /// Finishes the room as timed out, through its worker when one runs.
    pub async fn force_finish(&self, room_id: i32) -> AppResult<()> {
        let (done, finished) = oneshot::channel();
        if self
            .inner
            .workers
            .send(room_id, TeamCommand::Finish(done))
            .is_ok()
        {
            let _ = finished.await;
        }
        // No-op when the worker already closed the room.
        self.finalize_in_storage(room_id).await?;
        Ok(())
    }

    pub async fn finish_all_active(&self) -> AppResult<usize> {
        let rooms = team_rooms::list_active(self.conn()).await?;
        let mut finished = 0;
        for room in rooms {
            match self.force_finish(room.id).await {
                Ok(()) => finished += 1,
                Err(e) => warn!(room_id = room.id, "failed to finish team room: {e}"),
            }
        }
        info!(count = finished, "team rooms finished");
        Ok(finished)
    }

    /// Closes a room straight from its stored state.
    pub async fn finalize_in_storage(&self, room_id: i32) -> AppResult<Option<TeamRoomInfo>> {
        let room = self.room_info(room_id).await?;
        if room.status != TeamRoomStatus::InProgress {
            return Ok(None);
        }
        let mut board = TeamBoard::new(room);
        let all_solved = board.all_solved();
        self.finalize_board(&mut board, all_solved).await
    }

    /// Writes the final score once. `None` when the room was already finished.
    pub(crate) async fn finalize_board(
        &self,
        board: &mut TeamBoard,
        all_solved: bool,
    ) -> AppResult<Option<TeamRoomInfo>> {
        let room_id = board.room.id;
        let extra = board.conclude(all_solved);
        let now = Utc::now().fixed_offset();

        let Some(finished) =
            team_rooms::finalize(self.conn(), room_id, &board.room.problem_status, &extra, now)
                .await?
        else {
            debug!(room_id, "team room finished concurrently");
            return Ok(None);
        };
        self.release(room_id);
        info!(
            room_id,
            all_solved,
            solved_count = extra.solved_count,
            score = extra.score,
            "team room finished"
        );

        let room = TeamBoard::new(finished.into()).room;
        let event = Envelope::success(
            kind::TEAM_ROOM_FINISH,
            TeamRoomFinish {
                room: room.clone(),
                all_solved,
                solved_count: extra.solved_count,
            },
        );
        self.inner.hub.send_to_room(room_id, &event).await;
        Ok(Some(room))
    }

    pub(crate) async fn send_update(&self, room: &TeamRoomInfo, submission: TeamSubmission) {
        let event = Envelope::success(
            kind::TEAM_ROOM_UPDATE,
            TeamRoomUpdate {
                room: room.clone(),
                user_id: submission.user_id,
                problem_id: submission.problem_id,
                last_verdict: submission.verdict,
            },
        );
        self.inner.hub.send_to_room(room.id, &event).await;
    }

    async fn send_member_update(&self, room: &TeamRoomInfo, action: MemberAction, user_id: i32) {
        let event = Envelope::success(
            kind::TEAM_ROOM_MEMBER_UPDATE,
            TeamMemberUpdate {
                room: room.clone(),
                action,
                user_id,
            },
        );
        self.inner.hub.send_to_room(room.id, &event).await;
    }
}
