use utoipa::OpenApi;
use utoipa::openapi::security::{HttpAuthScheme, HttpBuilder, SecurityScheme};

#[derive(OpenApi)]
#[openapi(
    info(
        title = "CF Arena API",
        version = "0.1.0",
        description = "Solo and team practice rooms on top of Codeforces verdicts",
        license(name = "MIT"),
    ),
    paths(
        crate::routers::root::root_get,
        crate::routers::single_room::rooms_post,
        crate::routers::single_room::rooms_active_get,
        crate::routers::single_room::rooms_id_get,
        crate::routers::single_room::rooms_abandon_post,
        crate::routers::team_room::rooms_post,
        crate::routers::team_room::rooms_get,
        crate::routers::team_room::rooms_id_get,
        crate::routers::team_room::rooms_join_post,
        crate::routers::team_room::rooms_leave_post,
        crate::routers::team_room::modes_get,
        crate::routers::live::ws_get,
    ),
    components(
        schemas(
            models::schemas::user::UserSchema,
            models::schemas::user::AuthSchema,
            models::schemas::single_room::SingleRoomInfo,
            models::schemas::single_room::SingleSubmission,
            models::schemas::team_room::TeamRoomInfo,
            models::schemas::team_room::TeamRoomListItem,
            models::schemas::team_room::TeamProblem,
            models::schemas::team_room::TeamPlayer,
            models::schemas::team_room::TeamSubmission,
            models::schemas::team_room::TeamProblemStatus,
            models::schemas::team_room::TeamRoomExtra,
            models::schemas::team_room::TeamModeSchema,
            models::params::single_room::AbandonRoomParams,
            models::params::team_room::CreateTeamRoomParams,
            models::domains::sea_orm_active_enums::SingleRoomStatus,
            models::domains::sea_orm_active_enums::TeamRoomStatus,
        )
    ),
    modifiers(&SecurityAddon),
    tags(
        (name = "root", description = "Health"),
        (name = "single", description = "Single-player rooms"),
        (name = "team", description = "Team rooms"),
        (name = "live", description = "Live updates over WebSocket"),
    )
)]
pub struct ApiDoc;

struct SecurityAddon;

impl utoipa::Modify for SecurityAddon {
    fn modify(&self, openapi: &mut utoipa::openapi::OpenApi) {
        if let Some(components) = openapi.components.as_mut() {
            components.add_security_scheme(
                "bearer_auth",
                SecurityScheme::Http(
                    HttpBuilder::new()
                        .scheme(HttpAuthScheme::Bearer)
                        .bearer_format("JWT")
                        .description(Some("JWT token authentication"))
                        .build(),
                ),
            );
        }
    }
}
