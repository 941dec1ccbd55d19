use std::time::Duration;

use async_trait::async_trait;
use models::schemas::verdict::{JudgeVerdict, Verdict};
use serde::Deserialize;

/// Most recent submissions kept per user.
pub const MAX_CACHED_VERDICTS: usize = 30;

#[derive(Debug, thiserror::Error)]
pub enum JudgeError {
    #[error("judge request failed: {0}")]
    Transport(#[from] reqwest::Error),
    #[error("judge answered with http status {0}")]
    Status(u16),
    #[error("judge rejected the request: {0}")]
    Rejected(String),
    #[error("malformed judge payload: {0}")]
    Malformed(#[from] serde_json::Error),
    #[error("judge request timed out after {0:?}")]
    Timeout(Duration),
}

/// Source of a user's recent judge activity.
#[async_trait]
pub trait JudgeClient: Send + Sync {
    /// Recent submissions for `handle`, most recent first.
    async fn recent_verdicts(&self, handle: &str) -> Result<Vec<JudgeVerdict>, JudgeError>;
}

/// Client for the Codeforces `user.status` method.
pub struct CodeforcesClient {
    http: reqwest::Client,
    base_url: String,
}

impl CodeforcesClient {
    pub fn new(base_url: &str, timeout: Duration) -> Result<Self, JudgeError> {
        let http = reqwest::Client::builder()
            .timeout(timeout)
            .user_agent(concat!("cfarena/", env!("CARGO_PKG_VERSION")))
            .build()?;
        Ok(Self {
            http,
            base_url: base_url.trim_end_matches('/').to_owned(),
        })
    }
}

#[async_trait]
impl JudgeClient for CodeforcesClient {
    async fn recent_verdicts(&self, handle: &str) -> Result<Vec<JudgeVerdict>, JudgeError> {
        let count = MAX_CACHED_VERDICTS.to_string();
        let response = self
            .http
            .get(format!("{}/api/user.status", self.base_url))
            .query(&[("handle", handle), ("from", "1"), ("count", count.as_str())])
            .send()
            .await?;

        let status = response.status();
        let body = response.text().await?;
        match parse_user_status(&body) {
            Err(JudgeError::Malformed(_)) if !status.is_success() => {
                Err(JudgeError::Status(status.as_u16()))
            }
            result => result,
        }
    }
}

#[derive(Deserialize)]
struct UserStatusResponse {
    status: String,
    #[serde(default)]
    comment: Option<String>,
    #[serde(default)]
    result: Vec<RawSubmission>,
}

#[derive(Deserialize)]
struct RawSubmission {
    id: i64,
    #[serde(default)]
    verdict: Option<String>,
    #[serde(default)]
    problem: RawProblem,
}

#[derive(Deserialize, Default)]
struct RawProblem {
    #[serde(default, rename = "contestId")]
    contest_id: Option<i64>,
    #[serde(default)]
    index: String,
}

impl RawProblem {
    fn id(&self) -> String {
        match self.contest_id {
            Some(contest_id) if contest_id > 0 && !self.index.is_empty() => {
                format!("{contest_id}{}", self.index)
            }
            _ => String::new(),
        }
    }
}

/// Parses a `user.status` body into verdicts, keeping the judge's order.
pub fn parse_user_status(body: &str) -> Result<Vec<JudgeVerdict>, JudgeError> {
    let response: UserStatusResponse = serde_json::from_str(body)?;
    if response.status != "OK" {
        let reason = match response.comment {
            Some(comment) if !comment.is_empty() => comment,
            _ => format!("status {}", response.status),
        };
        return Err(JudgeError::Rejected(reason));
    }

    Ok(response
        .result
        .into_iter()
        .take(MAX_CACHED_VERDICTS)
        .map(|submission| JudgeVerdict {
            submission_id: submission.id,
            problem_id: submission.problem.id(),
            verdict: Verdict::from(submission.verdict.unwrap_or_default()),
        })
        .collect())
}
