use std::collections::HashSet;

use models::schemas::{
    single_room::{SingleRoomExtra, SingleSubmission},
    verdict::{JudgeVerdict, Verdict},
};

/// Added to the room penalty for each wrong answer, limit or runtime error.
pub const PENALTY_PER_ATTEMPT: i32 = 3;
pub const DEFAULT_RATING: i32 = 800;
/// Half width of the difficulty window around the player's rating.
pub const DIFFICULTY_SPREAD: i32 = 200;

/// Minutes of time plus penalty that cost nothing.
const GRACE_MINUTES: i64 = 10;

pub fn effective_rating(stored: i32) -> i32 {
    if stored > 0 { stored } else { DEFAULT_RATING }
}

/// Inclusive difficulty window for a new room.
pub fn difficulty_window(rating: i32) -> (i32, i32) {
    let rating = effective_rating(rating);
    ((rating - DIFFICULTY_SPREAD).max(0), rating + DIFFICULTY_SPREAD)
}

pub fn performance(difficulty: i32, elapsed_minutes: i64, penalty: i32, solved: bool) -> i32 {
    let difficulty = i64::from(difficulty);
    if !solved {
        return (difficulty - 200) as i32;
    }
    let over = (elapsed_minutes + i64::from(penalty) - GRACE_MINUTES).max(0);
    (difficulty - 100).min(difficulty + 200 - 10 * over) as i32
}

pub fn rating_after(performance: i32, rating_before: i32) -> i32 {
    (performance + rating_before) / 2
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Outcome {
    Accepted,
    Rejected { penalized: bool },
}

#[derive(Debug, Clone, PartialEq)]
pub struct Step {
    pub submission: SingleSubmission,
    pub outcome: Outcome,
}

/// In-memory progress of one room, rebuilt from the stored submission log.
#[derive(Debug, Clone)]
pub struct SingleProgress {
    pub problem_id: String,
    pub penalty: i32,
    pub submissions: Vec<SingleSubmission>,
    processed: HashSet<i64>,
}

impl SingleProgress {
    pub fn new(problem_id: impl Into<String>, penalty: i32, extra: SingleRoomExtra) -> Self {
        let processed = extra.submissions.iter().map(|s| s.submission_id).collect();
        Self {
            problem_id: problem_id.into(),
            penalty,
            submissions: extra.submissions,
            processed,
        }
    }

    pub fn extra(&self) -> SingleRoomExtra {
        SingleRoomExtra {
            submissions: self.submissions.clone(),
        }
    }

    pub fn is_processed(&self, submission_id: i64) -> bool {
        self.processed.contains(&submission_id)
    }

    /// Applies one verdict. Pending verdicts, other problems and submissions
    /// seen before produce nothing.
    pub fn ingest(&mut self, verdict: &JudgeVerdict, now: i64) -> Option<Step> {
        if verdict.verdict.is_pending() || verdict.problem_id != self.problem_id {
            return None;
        }
        if !self.processed.insert(verdict.submission_id) {
            return None;
        }

        let submission = SingleSubmission {
            submission_id: verdict.submission_id,
            problem_id: verdict.problem_id.clone(),
            verdict: verdict.verdict.clone(),
            submit_time: now,
        };
        self.submissions.push(submission.clone());

        let outcome = match &verdict.verdict {
            Verdict::Ok => Outcome::Accepted,
            v if v.is_penalized() => {
                self.penalty += PENALTY_PER_ATTEMPT;
                Outcome::Rejected { penalized: true }
            }
            _ => Outcome::Rejected { penalized: false },
        };
        Some(Step {
            submission,
            outcome,
        })
    }
}
