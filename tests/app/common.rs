use std::{sync::Arc, time::Duration};

use app::{
    config::{Config, Timings},
    core::{
        hub::{ConnectionId, Frame, LiveSink, LiveStream, TransportError},
        judge::{JudgeClient, JudgeError},
    },
    state::AppState,
};
use async_trait::async_trait;
use chrono::Utc;
use models::{
    domains::{problems, users},
    schemas::verdict::JudgeVerdict,
};
use sea_orm::{ActiveModelTrait, DatabaseConnection, Set};
use serde_json::Value;
use tokio::sync::mpsc;
use utils::testing::setup_test_db;

/// Judge that never reports anything; tests seed the verdict cache directly.
pub struct SilentJudge;

#[async_trait]
impl JudgeClient for SilentJudge {
    async fn recent_verdicts(&self, _handle: &str) -> Result<Vec<JudgeVerdict>, JudgeError> {
        Ok(Vec::new())
    }
}

pub fn fast_timings() -> Timings {
    Timings {
        room_tick_interval: Duration::from_millis(20),
        ..Timings::default()
    }
}

pub async fn test_state() -> AppState {
    let conn = setup_test_db("sqlite::memory:")
        .await
        .expect("Set up db failed!");
    let config = Config::new("sqlite::memory:", "test-secret").with_timings(fast_timings());
    AppState::new(conn, config, Arc::new(SilentJudge))
}

pub async fn seed_user(conn: &DatabaseConnection, username: &str, rating: i32) -> users::Model {
    let now = Utc::now().fixed_offset();
    users::ActiveModel {
        username: Set(username.to_owned()),
        email: Set(format!("{username}@mail.test")),
        passhash: Set(String::new()),
        rating: Set(rating),
        created_at: Set(now),
        updated_at: Set(now),
        ..Default::default()
    }
    .insert(conn)
    .await
    .expect("insert user")
}

pub async fn seed_problem(conn: &DatabaseConnection, id: &str, difficulty: i32) -> problems::Model {
    problems::ActiveModel {
        id: Set(id.to_owned()),
        name: Set(format!("Problem {id}")),
        url: Set(format!("https://codeforces.com/problemset/problem/{id}")),
        difficulty: Set(difficulty),
    }
    .insert(conn)
    .await
    .expect("insert problem")
}

pub fn verdict(submission_id: i64, problem_id: &str, verdict: &str) -> JudgeVerdict {
    JudgeVerdict {
        submission_id,
        problem_id: problem_id.to_owned(),
        verdict: verdict.into(),
    }
}

/// Polls `check` until it holds, failing the test after two seconds.
pub async fn eventually<F, Fut>(mut check: F)
where
    F: FnMut() -> Fut,
    Fut: Future<Output = bool>,
{
    for _ in 0..200 {
        if check().await {
            return;
        }
        tokio::time::sleep(Duration::from_millis(10)).await;
    }
    panic!("condition not reached in time");
}

struct RecordingSink(mpsc::UnboundedSender<String>);

#[async_trait]
impl LiveSink for RecordingSink {
    async fn send_text(&mut self, text: String) -> Result<(), TransportError> {
        self.0.send(text).map_err(|_| TransportError::Closed)
    }

    async fn send_ping(&mut self) -> Result<(), TransportError> {
        Ok(())
    }

    async fn close(&mut self) -> Result<(), TransportError> {
        Ok(())
    }
}

/// Inbound side that never yields; the connection lives until unregistered.
pub struct IdleStream;

#[async_trait]
impl LiveStream for IdleStream {
    async fn next_frame(&mut self) -> Option<Result<Frame, TransportError>> {
        std::future::pending().await
    }
}

/// A registered connection whose outbound messages can be inspected.
pub struct Client {
    pub id: ConnectionId,
    inbox: mpsc::UnboundedReceiver<String>,
}

impl Client {
    pub fn connect(state: &AppState, user_id: i32, room_id: i32) -> Self {
        let (tx, inbox) = mpsc::unbounded_channel();
        let id = state.hub.register(Box::new(RecordingSink(tx)), user_id, room_id);
        Self { id, inbox }
    }

    /// A sink not yet registered; the caller sets `id` once the hub accepts it.
    pub fn detached() -> (Box<dyn LiveSink>, Self) {
        let (tx, inbox) = mpsc::unbounded_channel();
        (Box::new(RecordingSink(tx)), Self { id: 0, inbox })
    }

    /// Everything delivered so far.
    pub fn drain(&mut self) -> Vec<Value> {
        let mut out = Vec::new();
        while let Ok(text) = self.inbox.try_recv() {
            out.push(serde_json::from_str(&text).expect("outbound messages are json"));
        }
        out
    }

    pub fn kinds(&mut self) -> Vec<String> {
        self.drain()
            .into_iter()
            .map(|m| m["type"].as_str().unwrap_or_default().to_owned())
            .collect()
    }
}
