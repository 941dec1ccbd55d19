use chrono::Utc;
use models::{
    domains::{problems, sea_orm_active_enums::SingleRoomStatus, single_player_rooms},
    schemas::{
        blob::JsonBlob,
        single_room::{SingleRoomExtra, SingleRoomInfo},
    },
};
use tokio::{
    sync::mpsc::UnboundedReceiver,
    time::{Instant, MissedTickBehavior, interval_at},
};
use tracing::{debug, info, warn};

use super::{
    SingleRoomManager,
    rules::{Outcome, SingleProgress},
};
use crate::persistence::single_rooms;

struct RoomState {
    room: single_player_rooms::Model,
    problem: problems::Model,
    progress: SingleProgress,
}

impl RoomState {
    fn info(&self) -> SingleRoomInfo {
        SingleRoomInfo::new(self.room.clone(), Some(&self.problem))
    }
}

/// Drives one room until it reaches a terminal status or its sender is dropped.
pub(super) async fn run(
    manager: SingleRoomManager,
    room: single_player_rooms::Model,
    problem: problems::Model,
    mut stop: UnboundedReceiver<()>,
) {
    let room_id = room.id;
    let progress = SingleProgress::new(
        room.problem_id.clone(),
        room.penalty,
        SingleRoomExtra::parse(&room.extra_info),
    );
    let mut state = RoomState {
        room,
        problem,
        progress,
    };

    let period = manager.timings().room_tick_interval;
    let mut ticker = interval_at(Instant::now() + period, period);
    ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
    info!(room_id, "single room worker started");

    loop {
        tokio::select! {
            _ = stop.recv() => {
                info!(room_id, "single room worker stopped");
                return;
            }
            _ = ticker.tick() => {}
        }
        if !tick(&manager, &mut state).await {
            break;
        }
    }
    manager.release(room_id);
    info!(room_id, "single room worker finished");
}

/// Returns false once the worker should exit.
async fn tick(manager: &SingleRoomManager, state: &mut RoomState) -> bool {
    let verdicts = manager.verdicts().latest_verdicts(state.room.user_id);
    if verdicts.is_empty() {
        return true;
    }

    let room_id = state.room.id;
    let now = Utc::now();
    for verdict in &verdicts {
        let Some(step) = state.progress.ingest(verdict, now.timestamp()) else {
            continue;
        };
        debug!(
            room_id,
            submission_id = step.submission.submission_id,
            verdict = %step.submission.verdict,
            "submission processed"
        );

        state.room.penalty = state.progress.penalty;
        state.room.extra_info = state.progress.extra().encode();
        match single_rooms::record_progress(
            manager.conn(),
            room_id,
            state.progress.penalty,
            &state.progress.extra(),
        )
        .await
        {
            Ok(true) => {}
            Ok(false) => {
                debug!(room_id, "room already finalized, worker exits");
                return false;
            }
            Err(e) => warn!(room_id, "failed to persist room progress: {e}"),
        }

        manager.send_update(state.info(), step.submission).await;

        if step.outcome == Outcome::Accepted {
            if let Err(e) = manager
                .finalize_with(room_id, SingleRoomStatus::Solved, Some(state.progress.penalty))
                .await
            {
                warn!(room_id, "failed to finalize solved room: {e}");
            }
            return false;
        }
    }
    true
}
