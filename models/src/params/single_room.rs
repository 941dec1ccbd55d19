use serde::Deserialize;
use utoipa::ToSchema;
use validator::Validate;

#[derive(Deserialize, Validate, Debug, Default, ToSchema)]
pub struct AbandonRoomParams {
    /// Defaults to the caller's in-progress room.
    #[validate(range(min = 1))]
    pub room_id: Option<i32>,
}
