use chrono::{DateTime, FixedOffset, Utc};
use sea_orm::{
    ActiveModelTrait, ColumnTrait, DbConn, DbErr, EntityTrait, PaginatorTrait, QueryFilter,
    QueryOrder, Set,
};

use models::{
    domains::{sea_orm_active_enums::TeamRoomStatus, team_rooms},
    schemas::{
        blob::JsonBlob,
        team_room::{TeamPlayer, TeamProblem, TeamProblemStatus, TeamRoomExtra, TeamSubmission},
    },
};

pub struct NewTeamRoom<'a> {
    pub creator_id: i32,
    pub mode: &'a str,
    pub problems: &'a [TeamProblem],
    pub players: &'a [TeamPlayer],
    pub problem_status: &'a [TeamProblemStatus],
    pub extra: &'a TeamRoomExtra,
}

pub async fn create_room(db: &DbConn, room: NewTeamRoom<'_>) -> Result<team_rooms::Model, DbErr> {
    let now = Utc::now().fixed_offset();
    team_rooms::ActiveModel {
        creator_id: Set(room.creator_id),
        mode: Set(room.mode.to_owned()),
        status: Set(TeamRoomStatus::InProgress),
        problem_list: Set(room.problems.to_vec().encode()),
        player_list: Set(room.players.to_vec().encode()),
        submission_records: Set(Vec::<TeamSubmission>::new().encode()),
        problem_status: Set(room.problem_status.to_vec().encode()),
        extra_info: Set(room.extra.encode()),
        created_at: Set(now),
        updated_at: Set(now),
        end_time: Set(None),
        ..Default::default()
    }
    .insert(db)
    .await
}

pub async fn get_room(db: &DbConn, id: i32) -> Result<Option<team_rooms::Model>, DbErr> {
    team_rooms::Entity::find_by_id(id).one(db).await
}

pub async fn list_active(db: &DbConn) -> Result<Vec<team_rooms::Model>, DbErr> {
    team_rooms::Entity::find()
        .filter(team_rooms::Column::Status.eq(TeamRoomStatus::InProgress))
        .order_by_asc(team_rooms::Column::Id)
        .all(db)
        .await
}

/// One page of rooms, newest first, with the total matching count.
pub async fn list_rooms(
    db: &DbConn,
    status: Option<TeamRoomStatus>,
    page: u64,
    limit: u64,
) -> Result<(Vec<team_rooms::Model>, u64), DbErr> {
    let mut query = team_rooms::Entity::find();
    if let Some(status) = status {
        query = query.filter(team_rooms::Column::Status.eq(status));
    }
    let paginator = query
        .order_by_desc(team_rooms::Column::CreatedAt)
        .order_by_desc(team_rooms::Column::Id)
        .paginate(db, limit.max(1));
    let total = paginator.num_items().await?;
    let rooms = paginator.fetch_page(page.saturating_sub(1)).await?;
    Ok((rooms, total))
}

pub async fn update_players(db: &DbConn, id: i32, players: &[TeamPlayer]) -> Result<bool, DbErr> {
    let result = team_rooms::Entity::update_many()
        .set(team_rooms::ActiveModel {
            player_list: Set(players.to_vec().encode()),
            updated_at: Set(Utc::now().fixed_offset()),
            ..Default::default()
        })
        .filter(team_rooms::Column::Id.eq(id))
        .exec(db)
        .await?;
    Ok(result.rows_affected > 0)
}

/// Writes the submission log and problem table of an in-progress room.
pub async fn record_progress(
    db: &DbConn,
    id: i32,
    submissions: &[TeamSubmission],
    problem_status: &[TeamProblemStatus],
) -> Result<bool, DbErr> {
    let result = team_rooms::Entity::update_many()
        .set(team_rooms::ActiveModel {
            submission_records: Set(submissions.to_vec().encode()),
            problem_status: Set(problem_status.to_vec().encode()),
            updated_at: Set(Utc::now().fixed_offset()),
            ..Default::default()
        })
        .filter(team_rooms::Column::Id.eq(id))
        .filter(team_rooms::Column::Status.eq(TeamRoomStatus::InProgress))
        .exec(db)
        .await?;
    Ok(result.rows_affected > 0)
}

/// Marks an in-progress room finished. `None` when it was already finished.
pub async fn finalize(
    db: &DbConn,
    id: i32,
    problem_status: &[TeamProblemStatus],
    extra: &TeamRoomExtra,
    end_time: DateTime<FixedOffset>,
) -> Result<Option<team_rooms::Model>, DbErr> {
    let result = team_rooms::Entity::update_many()
        .set(team_rooms::ActiveModel {
            status: Set(TeamRoomStatus::Finished),
            problem_status: Set(problem_status.to_vec().encode()),
            extra_info: Set(extra.encode()),
            end_time: Set(Some(end_time)),
            updated_at: Set(end_time),
            ..Default::default()
        })
        .filter(team_rooms::Column::Id.eq(id))
        .filter(team_rooms::Column::Status.eq(TeamRoomStatus::InProgress))
        .exec(db)
        .await?;
    if result.rows_affected == 0 {
        return Ok(None);
    }
    get_room(db, id).await
}
