use chrono::Utc;
use models::schemas::team_room::{TeamPlayer, TeamRoomInfo};
use tokio::{
    sync::{mpsc::UnboundedReceiver, oneshot},
    time::{Instant, MissedTickBehavior, interval_at},
};
use tracing::{debug, info, warn};

use super::{TeamRoomManager, rules::TeamBoard};
use crate::persistence::team_rooms;

pub enum TeamCommand {
    /// Finish now as timed out; the sender is told once the room is closed.
    Finish(oneshot::Sender<()>),
    /// The persisted player list changed.
    Players(Vec<TeamPlayer>),
}

pub(super) async fn run(
    manager: TeamRoomManager,
    room: TeamRoomInfo,
    mut commands: UnboundedReceiver<TeamCommand>,
) {
    let room_id = room.id;
    let mut board = TeamBoard::new(room);

    let period = manager.timings().room_tick_interval;
    let mut ticker = interval_at(Instant::now() + period, period);
    ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
    info!(room_id, "team room worker started");

    loop {
        tokio::select! {
            command = commands.recv() => match command {
                None => {
                    info!(room_id, "team room worker stopped");
                    return;
                }
                Some(TeamCommand::Players(players)) => board.room.players = players,
                Some(TeamCommand::Finish(done)) => {
                    finish(&manager, &mut board, false).await;
                    let _ = done.send(());
                    break;
                }
            },
            _ = ticker.tick() => {
                if !tick(&manager, &mut board).await {
                    break;
                }
            }
        }
    }
    manager.release(room_id);
    info!(room_id, "team room worker finished");
}

async fn finish(manager: &TeamRoomManager, board: &mut TeamBoard, all_solved: bool) {
    if let Err(e) = manager.finalize_board(board, all_solved).await {
        warn!(room_id = board.room.id, "failed to finalize team room: {e}");
    }
}

/// Returns false once the worker should exit.
async fn tick(manager: &TeamRoomManager, board: &mut TeamBoard) -> bool {
    let room_id = board.room.id;
    let now = Utc::now();
    if board.is_timed_out(now) {
        debug!(room_id, "team room ran out of time");
        finish(manager, board, false).await;
        return false;
    }

    for user_id in manager.hub().active_room_user_ids(room_id) {
        for verdict in manager.verdicts().latest_verdicts(user_id) {
            let Some(submission) = board.ingest(user_id, &verdict, now) else {
                continue;
            };
            debug!(
                room_id,
                user_id,
                submission_id = submission.submission_id,
                verdict = %submission.verdict,
                "team submission processed"
            );

            match team_rooms::record_progress(
                manager.conn(),
                room_id,
                &board.room.submissions,
                &board.room.problem_status,
            )
            .await
            {
                Ok(true) => {}
                Ok(false) => {
                    debug!(room_id, "room already finished, worker exits");
                    return false;
                }
                Err(e) => warn!(room_id, "failed to persist team progress: {e}"),
            }

            manager.send_update(&board.room, submission).await;

            if board.all_solved() {
                finish(manager, board, true).await;
                return false;
            }
        }
    }
    true
}
