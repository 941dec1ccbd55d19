use std::sync::Arc;

use sea_orm::DatabaseConnection;

use crate::{
    config::Config,
    core::{
        hub::ConnectionHub,
        judge::{CodeforcesClient, JudgeClient},
        live,
        poll_queue::VerdictPollQueue,
        single_player::SingleRoomManager,
        team::TeamRoomManager,
    },
    error::AppResult,
};

/// Process-wide services, built once at startup and cloned into handlers.
#[derive(Clone)]
pub struct AppState {
    pub conn: DatabaseConnection,
    pub config: Config,
    pub hub: ConnectionHub,
    pub verdicts: VerdictPollQueue,
    pub single_rooms: SingleRoomManager,
    pub team_rooms: TeamRoomManager,
}

impl AppState {
    pub fn new(conn: DatabaseConnection, config: Config, judge: Arc<dyn JudgeClient>) -> Self {
        let timings = config.timings;
        let hub = ConnectionHub::new(&timings);
        let verdicts = VerdictPollQueue::new(conn.clone(), hub.clone(), judge, timings);
        let single_rooms =
            SingleRoomManager::new(conn.clone(), hub.clone(), verdicts.clone(), timings);
        let team_rooms = TeamRoomManager::new(conn.clone(), hub.clone(), verdicts.clone(), timings);

        let state = Self {
            conn,
            config,
            hub,
            verdicts,
            single_rooms,
            team_rooms,
        };
        live::install(&state);
        state
    }

    /// State backed by the judge configured in `config`.
    pub fn with_codeforces(conn: DatabaseConnection, config: Config) -> AppResult<Self> {
        let judge = CodeforcesClient::new(&config.judge_base_url, config.timings.judge_timeout)?;
        Ok(Self::new(conn, config, Arc::new(judge)))
    }
}
