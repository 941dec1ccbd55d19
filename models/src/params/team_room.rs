use serde::Deserialize;
use utoipa::ToSchema;
use validator::Validate;

#[derive(Deserialize, Validate, Debug, ToSchema)]
pub struct CreateTeamRoomParams {
    #[validate(length(min = 1, max = 32))]
    pub mode: String,
}
