#[allow(dead_code)]
#[path = "../app/common.rs"]
mod common;

use api::setup_router;
use app::{state::AppState, utils::issue_token};
use axum::{
    Router,
    body::Body,
    http::{Method, Request, StatusCode, header},
};
use http_body_util::BodyExt;
use models::schemas::user::UserSchema;
use serde_json::{Value, json};
use tower::ServiceExt;

use common::{seed_problem, seed_user, test_state};

struct TestApp {
    state: AppState,
    router: Router,
}

impl TestApp {
    async fn new() -> Self {
        let state = test_state().await;
        let router = setup_router(state.clone()).expect("router");
        Self { state, router }
    }

    async fn token_for(&self, username: &str, rating: i32) -> (i32, String) {
        let user = seed_user(&self.state.conn, username, rating).await;
        let token = issue_token(&self.state.config, &UserSchema::from(user.clone())).unwrap();
        (user.id, token)
    }

    async fn call(
        &self,
        method: Method,
        uri: &str,
        token: Option<&str>,
        body: Option<Value>,
    ) -> (StatusCode, Value) {
        let mut request = Request::builder().method(method).uri(uri);
        if let Some(token) = token {
            request = request.header(header::AUTHORIZATION, format!("Bearer {token}"));
        }
        let request = match body {
            Some(body) => request
                .header(header::CONTENT_TYPE, "application/json")
                .body(Body::from(body.to_string())),
            None => request.body(Body::empty()),
        }
        .unwrap();

        let response = self.router.clone().oneshot(request).await.unwrap();
        let status = response.status();
        let bytes = response.into_body().collect().await.unwrap().to_bytes();
        let body = serde_json::from_slice(&bytes).unwrap_or(Value::Null);
        (status, body)
    }
}

#[test_log::test(tokio::test)]
async fn health_and_docs() {
    let app = TestApp::new().await;

    let (status, body) = app.call(Method::GET, "/", None, None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["success"], true);
    assert_eq!(body["data"], "ok");

    let (status, body) = app.call(Method::GET, "/api-docs/openapi.json", None, None).await;
    assert_eq!(status, StatusCode::OK);
    assert!(body["paths"]["/single/rooms"].is_object());
    assert!(body["paths"]["/team/rooms/{id}/join"].is_object());
}

#[test_log::test(tokio::test)]
async fn protected_routes_need_a_valid_token() {
    let app = TestApp::new().await;

    let (status, body) = app.call(Method::POST, "/single/rooms", None, None).await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
    assert_eq!(body["success"], false);

    let (status, _) = app
        .call(Method::POST, "/single/rooms", Some("not-a-token"), None)
        .await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);

    let (status, _) = app.call(Method::GET, "/ws", None, None).await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
}

#[test_log::test(tokio::test)]
async fn single_room_lifecycle_over_http() {
    let app = TestApp::new().await;
    seed_problem(&app.state.conn, "900A", 900).await;
    let (user_id, token) = app.token_for("alice", 900).await;

    let (status, body) = app.call(Method::GET, "/single/rooms/active", Some(&token), None).await;
    assert_eq!(status, StatusCode::OK);
    assert!(body["data"].is_null());

    let (status, body) = app.call(Method::POST, "/single/rooms", Some(&token), None).await;
    assert_eq!(status, StatusCode::OK);
    let room_id = body["data"]["id"].as_i64().unwrap();
    assert_eq!(body["data"]["user_id"], user_id);
    assert_eq!(body["data"]["problem_id"], "900A");
    assert_eq!(body["data"]["status"], "in_progress");

    let (status, body) = app
        .call(Method::GET, &format!("/single/rooms/{room_id}"), None, None)
        .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["data"]["problem_name"], "Problem 900A");

    let (status, _) = app.call(Method::GET, "/single/rooms/4242", None, None).await;
    assert_eq!(status, StatusCode::NOT_FOUND);
    let (status, _) = app.call(Method::GET, "/single/rooms/abc", None, None).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);

    let (_, intruder) = app.token_for("mallory", 900).await;
    let (status, _) = app
        .call(
            Method::POST,
            "/single/rooms/abandon",
            Some(&intruder),
            Some(json!({ "room_id": room_id })),
        )
        .await;
    assert_eq!(status, StatusCode::FORBIDDEN);

    let (status, _) = app
        .call(
            Method::POST,
            "/single/rooms/abandon",
            Some(&token),
            Some(json!({ "room_id": 0 })),
        )
        .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);

    let (status, body) = app
        .call(Method::POST, "/single/rooms/abandon", Some(&token), Some(json!({})))
        .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["data"]["status"], "abandoned");
    assert_eq!(body["data"]["performance"], 700);
}

#[test_log::test(tokio::test)]
async fn team_rooms_over_http() {
    let app = TestApp::new().await;
    for difficulty in [1000, 1100, 1200, 1300, 1400] {
        seed_problem(&app.state.conn, &format!("{difficulty}X"), difficulty).await;
        seed_problem(&app.state.conn, &format!("{difficulty}Y"), difficulty).await;
    }
    let (creator, token) = app.token_for("ana", 1200).await;
    let (joiner, other) = app.token_for("ben", 1200).await;

    let (status, body) = app.call(Method::GET, "/team/modes", None, None).await;
    assert_eq!(status, StatusCode::OK);
    let keys: Vec<&str> = body["data"]
        .as_array()
        .unwrap()
        .iter()
        .filter_map(|m| m["key"].as_str())
        .collect();
    assert_eq!(keys, ["div3", "div3-plus", "quick"]);

    let (status, _) = app
        .call(Method::POST, "/team/rooms", Some(&token), Some(json!({ "mode": "" })))
        .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    let (status, _) = app
        .call(Method::POST, "/team/rooms", Some(&token), Some(json!({ "mode": "nope" })))
        .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);

    let (status, body) = app
        .call(Method::POST, "/team/rooms", Some(&token), Some(json!({ "mode": "quick" })))
        .await;
    assert_eq!(status, StatusCode::OK);
    let room_id = body["data"]["id"].as_i64().unwrap();
    assert_eq!(body["data"]["creator_id"], creator);
    assert_eq!(body["data"]["problems"].as_array().unwrap().len(), 5);

    let join = format!("/team/rooms/{room_id}/join");
    let (status, body) = app.call(Method::POST, &join, Some(&other), None).await;
    assert_eq!(status, StatusCode::OK);
    let players: Vec<i64> = body["data"]["players"]
        .as_array()
        .unwrap()
        .iter()
        .filter_map(|p| p["user_id"].as_i64())
        .collect();
    assert_eq!(players, [i64::from(creator), i64::from(joiner)]);

    let (status, body) = app
        .call(Method::GET, "/team/rooms?page=1&limit=10&status=in_progress", None, None)
        .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["data"]["total"], 1);
    assert_eq!(body["data"]["data"][0]["player_count"], 2);

    let leave = format!("/team/rooms/{room_id}/leave");
    let (status, body) = app.call(Method::POST, &leave, Some(&other), None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["data"]["players"].as_array().unwrap().len(), 1);

    app.state.team_rooms.force_finish(room_id as i32).await.unwrap();
    let (status, _) = app.call(Method::POST, &join, Some(&other), None).await;
    assert_eq!(status, StatusCode::CONFLICT);

    let (status, body) = app
        .call(Method::GET, &format!("/team/rooms/{room_id}"), None, None)
        .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["data"]["status"], "finished");
}
