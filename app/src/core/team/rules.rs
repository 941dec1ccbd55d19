use std::collections::HashSet;

use chrono::{DateTime, Utc};
use models::schemas::{
    team_room::{TeamProblemStatus, TeamRoomExtra, TeamRoomInfo, TeamSubmission},
    verdict::JudgeVerdict,
};

/// Minutes added to a problem for every rejected attempt before it is solved.
pub const PENALTY_MINUTES: i32 = 20;
pub const DEFAULT_DURATION_SECONDS: i64 = 5 * 60 * 60;
/// Half width of the difficulty window around each target.
pub const DIFFICULTY_SPREAD: i32 = 100;

/// Seconds: solve time plus penalty minutes, over solved problems.
pub fn score(status: &[TeamProblemStatus]) -> i64 {
    status
        .iter()
        .filter(|s| s.solved)
        .map(|s| s.solved_at + i64::from(s.penalty) * 60)
        .sum()
}

/// Live state of a team room: the stored view plus the submissions
/// already applied.
#[derive(Debug, Clone)]
pub struct TeamBoard {
    pub room: TeamRoomInfo,
    processed: HashSet<i64>,
}

impl TeamBoard {
    pub fn new(mut room: TeamRoomInfo) -> Self {
        let mut status = Vec::with_capacity(room.problems.len());
        for problem in &room.problems {
            let existing = room
                .problem_status
                .iter()
                .find(|s| s.problem_id == problem.problem_id)
                .cloned();
            status.push(existing.unwrap_or_else(|| TeamProblemStatus {
                problem_id: problem.problem_id.clone(),
                ..Default::default()
            }));
        }
        room.problem_status = status;

        let processed = room.submissions.iter().map(|s| s.submission_id).collect();
        Self { room, processed }
    }

    pub fn duration_seconds(&self) -> i64 {
        match self.room.extra.duration_seconds {
            d if d > 0 => d,
            _ => DEFAULT_DURATION_SECONDS,
        }
    }

    pub fn elapsed_seconds(&self, now: DateTime<Utc>) -> i64 {
        (now - self.room.created_at.to_utc()).num_seconds().max(0)
    }

    pub fn is_timed_out(&self, now: DateTime<Utc>) -> bool {
        self.elapsed_seconds(now) >= self.duration_seconds()
    }

    /// Applies one verdict from `user_id`. Returns the logged submission, or
    /// `None` for pending verdicts, foreign problems and repeats.
    pub fn ingest(
        &mut self,
        user_id: i32,
        verdict: &JudgeVerdict,
        now: DateTime<Utc>,
    ) -> Option<TeamSubmission> {
        if verdict.verdict.is_pending() {
            return None;
        }
        let elapsed = self.elapsed_seconds(now);
        let status = self
            .room
            .problem_status
            .iter_mut()
            .find(|s| s.problem_id == verdict.problem_id)?;
        if !self.processed.insert(verdict.submission_id) {
            return None;
        }

        if !status.solved {
            if verdict.verdict.is_accepted() {
                status.solved = true;
                status.solved_by = user_id;
                status.solved_at = elapsed;
            } else {
                status.penalty += PENALTY_MINUTES;
            }
        }

        let submission = TeamSubmission {
            submission_id: verdict.submission_id,
            problem_id: verdict.problem_id.clone(),
            user_id,
            verdict: verdict.verdict.clone(),
            submit_time: now.timestamp(),
        };
        self.room.submissions.push(submission.clone());
        Some(submission)
    }

    pub fn solved_count(&self) -> i32 {
        self.room.problem_status.iter().filter(|s| s.solved).count() as i32
    }

    pub fn all_solved(&self) -> bool {
        !self.room.problem_status.is_empty() && self.room.problem_status.iter().all(|s| s.solved)
    }

    /// Fills in the final score.
    pub fn conclude(&mut self, all_solved: bool) -> TeamRoomExtra {
        let extra = &mut self.room.extra;
        extra.score = score(&self.room.problem_status);
        extra.all_solved = Some(all_solved);
        extra.solved_count = self.room.problem_status.iter().filter(|s| s.solved).count() as i32;
        extra.clone()
    }
}
