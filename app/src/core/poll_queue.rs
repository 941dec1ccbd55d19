use std::{
    collections::{HashSet, VecDeque},
    sync::{Arc, Mutex, MutexGuard, PoisonError},
};

use models::schemas::verdict::JudgeVerdict;
use sea_orm::DatabaseConnection;
use tracing::{debug, info, warn};

use crate::{
    cache::Cache,
    config::Timings,
    core::{
        hub::ConnectionHub,
        judge::{JudgeClient, JudgeError, MAX_CACHED_VERDICTS},
    },
    error::{AppError, AppResult},
    persistence::users::get_user,
    scheduler::{ScheduledJob, schedule_repeating},
};

/// FIFO of users waiting for a refresh; a user is queued at most once.
#[derive(Default)]
struct PendingUsers {
    order: VecDeque<i32>,
    queued: HashSet<i32>,
}

impl PendingUsers {
    fn push(&mut self, user_id: i32) -> bool {
        if !self.queued.insert(user_id) {
            return false;
        }
        self.order.push_back(user_id);
        true
    }

    fn pop(&mut self) -> Option<i32> {
        let user_id = self.order.pop_front()?;
        self.queued.remove(&user_id);
        Some(user_id)
    }
}

struct PollQueueInner {
    conn: DatabaseConnection,
    hub: ConnectionHub,
    judge: Arc<dyn JudgeClient>,
    timings: Timings,
    pending: Mutex<PendingUsers>,
    handles: Cache<i32, String>,
    verdicts: Cache<i32, Vec<JudgeVerdict>>,
    loops: Mutex<Vec<ScheduledJob>>,
}

/// Turns "who is online" into rate limited judge calls.
///
/// The scan loop queues every connected user; the request loop pops one user
/// per tick and replaces that user's cached verdicts with a fresh snapshot.
#[derive(Clone)]
pub struct VerdictPollQueue {
    inner: Arc<PollQueueInner>,
}

impl VerdictPollQueue {
    pub fn new(
        conn: DatabaseConnection,
        hub: ConnectionHub,
        judge: Arc<dyn JudgeClient>,
        timings: Timings,
    ) -> Self {
        Self {
            inner: Arc::new(PollQueueInner {
                conn,
                hub,
                judge,
                timings,
                pending: Mutex::default(),
                handles: Cache::new(),
                verdicts: Cache::new(),
                loops: Mutex::default(),
            }),
        }
    }

    fn pending(&self) -> MutexGuard<'_, PendingUsers> {
        self.inner
            .pending
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
    }

    /// Starts both loops. Returns false when they are already running.
    pub fn start(&self) -> bool {
        let mut loops = self.inner.loops.lock().unwrap_or_else(PoisonError::into_inner);
        if !loops.is_empty() {
            return false;
        }

        let queue = self.clone();
        loops.push(schedule_repeating(self.inner.timings.scan_interval, move || {
            queue.scan_once();
            async {}
        }));

        let queue = self.clone();
        loops.push(schedule_repeating(self.inner.timings.request_interval, move || {
            let queue = queue.clone();
            async move {
                queue.poll_once().await;
            }
        }));

        info!(
            scan = ?self.inner.timings.scan_interval,
            request = ?self.inner.timings.request_interval,
            "verdict poll queue started"
        );
        true
    }

    pub fn stop(&self) {
        let loops = std::mem::take(
            &mut *self.inner.loops.lock().unwrap_or_else(PoisonError::into_inner),
        );
        for job in &loops {
            job.cancel();
        }
        if !loops.is_empty() {
            info!("verdict poll queue stopped");
        }
    }

    /// Queues a refresh for `user_id`. Zero and already queued users are ignored.
    pub fn mark_active(&self, user_id: i32) -> bool {
        if user_id == 0 {
            return false;
        }
        self.pending().push(user_id)
    }

    pub fn queued(&self) -> usize {
        self.pending().order.len()
    }

    /// Copy of the last snapshot for `user_id`, most recent first.
    pub fn latest_verdicts(&self, user_id: i32) -> Vec<JudgeVerdict> {
        self.inner.verdicts.get_data(&user_id).unwrap_or_default()
    }

    /// Replaces the snapshot for `user_id`, keeping the newest entries.
    pub fn store_verdicts(&self, user_id: i32, mut verdicts: Vec<JudgeVerdict>) {
        verdicts.truncate(MAX_CACHED_VERDICTS);
        self.inner.verdicts.set_data(user_id, verdicts);
    }

    /// Overrides the judge handle used for `user_id`.
    pub fn resolve_handle(&self, user_id: i32, handle: &str) {
        let handle = handle.trim();
        if user_id == 0 || handle.is_empty() {
            return;
        }
        self.inner.handles.set_data(user_id, handle.to_owned());
    }

    async fn handle_for(&self, user_id: i32) -> AppResult<String> {
        if let Some(handle) = self.inner.handles.get_data(&user_id) {
            return Ok(handle);
        }
        let user = get_user(&self.inner.conn, user_id)
            .await?
            .ok_or_else(|| AppError::not_found(format!("user {user_id}")))?;
        if user.username.is_empty() {
            return Err(AppError::invalid(format!("user {user_id} has no judge handle")));
        }
        self.inner.handles.set_data(user_id, user.username.clone());
        Ok(user.username)
    }

    pub fn scan_once(&self) {
        for user_id in self.inner.hub.active_user_ids() {
            self.mark_active(user_id);
        }
    }

    /// Refreshes the next queued user. Returns true when a snapshot was stored.
    pub async fn poll_once(&self) -> bool {
        let next = self.pending().pop();
        let Some(user_id) = next else {
            return false;
        };

        let handle = match self.handle_for(user_id).await {
            Ok(handle) => handle,
            Err(e) => {
                warn!(user_id, "failed to resolve judge handle: {e}");
                return false;
            }
        };

        let wait = self.inner.timings.judge_timeout;
        let result = match tokio::time::timeout(wait, self.inner.judge.recent_verdicts(&handle)).await
        {
            Ok(result) => result,
            Err(_) => Err(JudgeError::Timeout(wait)),
        };

        match result {
            Ok(verdicts) => {
                debug!(user_id, %handle, count = verdicts.len(), "verdicts refreshed");
                self.store_verdicts(user_id, verdicts);
                true
            }
            Err(e) => {
                warn!(user_id, %handle, "judge poll failed: {e}");
                false
            }
        }
    }
}
