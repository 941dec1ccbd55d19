//! Solo practice rooms: one problem, one owner, one worker per room.

use std::sync::{Arc, Mutex, PoisonError};

use chrono::{TimeDelta, Utc};
use models::{
    domains::{sea_orm_active_enums::SingleRoomStatus, single_player_rooms},
    schemas::{
        single_room::{SingleRoomInfo, SingleSubmission},
        verdict::Verdict,
    },
};
use sea_orm::DatabaseConnection;
use serde::Serialize;
use tracing::{debug, info, warn};

mod rules;
mod worker;

pub use rules::*;

use crate::{
    config::Timings,
    core::{
        hub::{ConnectionHub, Envelope, kind},
        poll_queue::VerdictPollQueue,
        supervisor::{KeyedLocks, WorkerRegistry},
    },
    error::{AppError, AppResult},
    persistence::{
        problems, single_rooms,
        single_rooms::SingleRoomOutcome,
        users::{get_user, update_rating},
    },
    scheduler::{ScheduledJob, schedule_repeating},
};

#[derive(Serialize, Debug, Clone)]
pub struct SingleRoomUpdate {
    pub room: SingleRoomInfo,
    pub last_verdict: Verdict,
    pub submission: SingleSubmission,
}

#[derive(Serialize, Debug, Clone)]
pub struct SingleRoomFinish {
    pub room: SingleRoomInfo,
}

struct SingleInner {
    conn: DatabaseConnection,
    hub: ConnectionHub,
    verdicts: VerdictPollQueue,
    timings: Timings,
    workers: WorkerRegistry<()>,
    // Per user, so nobody ends up with two active rooms.
    creating: KeyedLocks,
    sweep: Mutex<Option<ScheduledJob>>,
}

#[derive(Clone)]
pub struct SingleRoomManager {
    inner: Arc<SingleInner>,
}

impl SingleRoomManager {
    pub fn new(
        conn: DatabaseConnection,
        hub: ConnectionHub,
        verdicts: VerdictPollQueue,
        timings: Timings,
    ) -> Self {
        Self {
            inner: Arc::new(SingleInner {
                conn,
                hub,
                verdicts,
                timings,
                workers: WorkerRegistry::new(),
                creating: KeyedLocks::new(),
                sweep: Mutex::default(),
            }),
        }
    }

    pub(crate) fn conn(&self) -> &DatabaseConnection {
        &self.inner.conn
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

    /// Returns the caller's in-progress room, or opens a new one on a problem
    /// near their rating.
    pub async fn create_room(&self, user_id: i32) -> AppResult<SingleRoomInfo> {
        let _guard = self.inner.creating.lock(user_id).await;

        let user = get_user(self.conn(), user_id)
            .await?
            .ok_or_else(|| AppError::not_found(format!("user {user_id}")))?;

        if let Some(room) = single_rooms::find_active(self.conn(), user_id).await? {
            debug!(room_id = room.id, user_id, "reusing in-progress room");
            self.start_worker(room.clone()).await?;
            self.inner.verdicts.mark_active(user_id);
            return self.info_of(room).await;
        }

        let (min, max) = difficulty_window(user.rating);
        let problem = problems::random_in_range(self.conn(), min, max, &[])
            .await?
            .ok_or_else(|| AppError::not_found(format!("problem rated {min}..={max}")))?;

        let room = single_rooms::create_room(
            self.conn(),
            user_id,
            &problem.id,
            effective_rating(user.rating),
        )
        .await?;
        info!(room_id = room.id, user_id, problem_id = %problem.id, "single room created");

        self.start_worker(room.clone()).await?;
        self.inner.verdicts.mark_active(user_id);
        Ok(SingleRoomInfo::new(room, Some(&problem)))
    }

    /// Spawns the worker of an in-progress room. False when the room is
    /// finished or already has a worker.
    pub async fn start_worker(&self, room: single_player_rooms::Model) -> AppResult<bool> {
        if room.status.is_terminal() || self.is_running(room.id) {
            return Ok(false);
        }
        let problem = problems::get_problem(self.conn(), &room.problem_id)
            .await?
            .ok_or_else(|| AppError::not_found(format!("problem {}", room.problem_id)))?;

        let manager = self.clone();
        Ok(self
            .inner
            .workers
            .start(room.id, move |stop| worker::run(manager, room, problem, stop)))
    }

    async fn info_of(&self, room: single_player_rooms::Model) -> AppResult<SingleRoomInfo> {
        let problem = problems::get_problem(self.conn(), &room.problem_id).await?;
        Ok(SingleRoomInfo::new(room, problem.as_ref()))
    }

    pub async fn room_info(&self, room_id: i32) -> AppResult<SingleRoomInfo> {
        let room = single_rooms::get_room(self.conn(), room_id)
            .await?
            .ok_or_else(|| AppError::not_found(format!("room {room_id}")))?;
        self.info_of(room).await
    }

    pub async fn active_room(&self, user_id: i32) -> AppResult<Option<SingleRoomInfo>> {
        match single_rooms::find_active(self.conn(), user_id).await? {
            Some(room) => self.info_of(room).await.map(Some),
            None => Ok(None),
        }
    }

    /// Gives up a room on behalf of its owner. A finished room is returned
    /// unchanged.
    pub async fn abandon(&self, user_id: i32, room_id: Option<i32>) -> AppResult<SingleRoomInfo> {
        let room = match room_id {
            Some(room_id) => single_rooms::get_room(self.conn(), room_id)
                .await?
                .ok_or_else(|| AppError::not_found(format!("room {room_id}")))?,
            None => single_rooms::find_active(self.conn(), user_id)
                .await?
                .ok_or_else(|| AppError::not_found("active room"))?,
        };
        if room.user_id != user_id {
            return Err(AppError::PermissionDenied);
        }
        if room.status.is_terminal() {
            return self.info_of(room).await;
        }

        match self.finalize(room.id, SingleRoomStatus::Abandoned).await? {
            Some(info) => Ok(info),
            None => self.room_info(room.id).await,
        }
    }

    pub async fn finalize(
        &self,
        room_id: i32,
        status: SingleRoomStatus,
    ) -> AppResult<Option<SingleRoomInfo>> {
        self.finalize_with(room_id, status, None).await
    }

    /// Computes the result, writes it if the room is still in progress and
    /// notifies the owner. `None` when the room was already finished.
    pub(crate) async fn finalize_with(
        &self,
        room_id: i32,
        status: SingleRoomStatus,
        penalty: Option<i32>,
    ) -> AppResult<Option<SingleRoomInfo>> {
        let room = single_rooms::get_room(self.conn(), room_id)
            .await?
            .ok_or_else(|| AppError::not_found(format!("room {room_id}")))?;
        if room.status.is_terminal() {
            return Ok(None);
        }
        let problem = problems::get_problem(self.conn(), &room.problem_id).await?;
        let difficulty = problem.as_ref().map(|p| p.difficulty).unwrap_or_default();

        let now = Utc::now().fixed_offset();
        let elapsed_minutes = (now - room.created_at).num_minutes().max(0);
        let penalty = penalty.unwrap_or(room.penalty).max(room.penalty);
        let performance = performance(
            difficulty,
            elapsed_minutes,
            penalty,
            status == SingleRoomStatus::Solved,
        );
        let outcome = SingleRoomOutcome {
            status,
            penalty,
            performance,
            rating_after: rating_after(performance, room.rating_before),
            end_time: now,
        };

        let Some(finished) = single_rooms::finalize(self.conn(), room_id, outcome).await? else {
            debug!(room_id, "room finalized concurrently");
            return Ok(None);
        };
        update_rating(self.conn(), finished.user_id, finished.rating_after).await?;
        self.release(room_id);
        info!(
            room_id,
            user_id = finished.user_id,
            ?status,
            penalty,
            performance,
            rating_after = finished.rating_after,
            "single room finalized"
        );

        let user_id = finished.user_id;
        let info = SingleRoomInfo::new(finished, problem.as_ref());
        let event = Envelope::success(kind::SINGLE_ROOM_FINISH, SingleRoomFinish { room: info.clone() });
        self.inner.hub.send_to_user(user_id, &event).await;
        Ok(Some(info))
    }

    pub(crate) async fn send_update(&self, room: SingleRoomInfo, submission: SingleSubmission) {
        let user_id = room.user_id;
        let event = Envelope::success(
            kind::SINGLE_ROOM_UPDATE,
            SingleRoomUpdate {
                room,
                last_verdict: submission.verdict.clone(),
                submission,
            },
        );
        self.inner.hub.send_to_user(user_id, &event).await;
    }

    /// Abandons rooms that outlived the maximum age.
    pub async fn sweep_expired(&self) -> AppResult<usize> {
        let max_age = TimeDelta::from_std(self.inner.timings.single_room_max_age)
            .map_err(anyhow::Error::from)?;
        let cutoff = (Utc::now() - max_age).fixed_offset();
        let rooms = single_rooms::list_active_older_than(self.conn(), cutoff).await?;
        self.abandon_rooms(rooms).await
    }

    /// Abandons every in-progress room, used when recovering from a restart.
    pub async fn finish_all_active(&self) -> AppResult<usize> {
        let rooms = single_rooms::list_active(self.conn()).await?;
        self.abandon_rooms(rooms).await
    }

    async fn abandon_rooms(&self, rooms: Vec<single_player_rooms::Model>) -> AppResult<usize> {
        let mut finished = 0;
        for room in rooms {
            match self.finalize(room.id, SingleRoomStatus::Abandoned).await {
                Ok(Some(_)) => finished += 1,
                Ok(None) => {}
                Err(e) => warn!(room_id = room.id, "failed to abandon room: {e}"),
            }
        }
        if finished > 0 {
            info!(count = finished, "single rooms abandoned");
        }
        Ok(finished)
    }

    pub fn start_sweep(&self) -> bool {
        let mut sweep = self.inner.sweep.lock().unwrap_or_else(PoisonError::into_inner);
        if sweep.is_some() {
            return false;
        }
        let manager = self.clone();
        *sweep = Some(schedule_repeating(self.inner.timings.sweep_interval, move || {
            let manager = manager.clone();
            async move {
                if let Err(e) = manager.sweep_expired().await {
                    warn!("single room sweep failed: {e}");
                }
            }
        }));
        true
    }

    pub fn stop_sweep(&self) {
        let job = self.inner.sweep.lock().unwrap_or_else(PoisonError::into_inner).take();
        if let Some(job) = job {
            job.cancel();
        }
    }
}
