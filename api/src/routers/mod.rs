use axum::{Router, middleware::from_fn_with_state};

pub mod live;
pub mod root;
pub mod single_room;
pub mod team_room;

use app::state::AppState;
use live::create_live_router;
use root::create_root_router;
use single_room::create_single_room_router;
use team_room::create_team_room_router;

use crate::middleware::extension::extension;

pub fn create_router(state: AppState) -> Router {
    Router::new()
        .merge(create_root_router())
        .nest("/single", create_single_room_router())
        .nest("/team", create_team_room_router())
        .merge(create_live_router())
        .layer(from_fn_with_state(state.clone(), extension))
        .with_state(state)
}
