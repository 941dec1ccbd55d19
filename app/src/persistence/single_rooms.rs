use chrono::{DateTime, FixedOffset, Utc};
use sea_orm::{
    ActiveModelTrait, ColumnTrait, DbConn, DbErr, EntityTrait, QueryFilter, QueryOrder, Set,
};

use models::{
    domains::{sea_orm_active_enums::SingleRoomStatus, single_player_rooms},
    schemas::{blob::JsonBlob, single_room::SingleRoomExtra},
};

/// Terminal values written when a room is finalized.
#[derive(Debug, Clone, Copy)]
pub struct SingleRoomOutcome {
    pub status: SingleRoomStatus,
    pub penalty: i32,
    pub performance: i32,
    pub rating_after: i32,
    pub end_time: DateTime<FixedOffset>,
}

pub async fn create_room(
    db: &DbConn,
    user_id: i32,
    problem_id: &str,
    rating_before: i32,
) -> Result<single_player_rooms::Model, DbErr> {
    let now = Utc::now().fixed_offset();
    single_player_rooms::ActiveModel {
        user_id: Set(user_id),
        problem_id: Set(problem_id.to_owned()),
        status: Set(SingleRoomStatus::InProgress),
        penalty: Set(0),
        performance: Set(0),
        rating_before: Set(rating_before),
        rating_after: Set(rating_before),
        extra_info: Set(SingleRoomExtra::default().encode()),
        created_at: Set(now),
        updated_at: Set(now),
        end_time: Set(None),
        ..Default::default()
    }
    .insert(db)
    .await
}

pub async fn get_room(db: &DbConn, id: i32) -> Result<Option<single_player_rooms::Model>, DbErr> {
    single_player_rooms::Entity::find_by_id(id).one(db).await
}

/// The most recent in-progress room of `user_id`.
pub async fn find_active(
    db: &DbConn,
    user_id: i32,
) -> Result<Option<single_player_rooms::Model>, DbErr> {
    single_player_rooms::Entity::find()
        .filter(single_player_rooms::Column::UserId.eq(user_id))
        .filter(single_player_rooms::Column::Status.eq(SingleRoomStatus::InProgress))
        .order_by_desc(single_player_rooms::Column::CreatedAt)
        .order_by_desc(single_player_rooms::Column::Id)
        .one(db)
        .await
}

pub async fn list_active(db: &DbConn) -> Result<Vec<single_player_rooms::Model>, DbErr> {
    single_player_rooms::Entity::find()
        .filter(single_player_rooms::Column::Status.eq(SingleRoomStatus::InProgress))
        .order_by_asc(single_player_rooms::Column::Id)
        .all(db)
        .await
}

pub async fn list_active_older_than(
    db: &DbConn,
    cutoff: DateTime<FixedOffset>,
) -> Result<Vec<single_player_rooms::Model>, DbErr> {
    single_player_rooms::Entity::find()
        .filter(single_player_rooms::Column::Status.eq(SingleRoomStatus::InProgress))
        .filter(single_player_rooms::Column::CreatedAt.lt(cutoff))
        .order_by_asc(single_player_rooms::Column::Id)
        .all(db)
        .await
}

/// Writes penalty and submission log while the room is still in progress.
/// Returns false when the room has already been finalized.
pub async fn record_progress(
    db: &DbConn,
    id: i32,
    penalty: i32,
    extra: &SingleRoomExtra,
) -> Result<bool, DbErr> {
    let result = single_player_rooms::Entity::update_many()
        .set(single_player_rooms::ActiveModel {
            penalty: Set(penalty),
            extra_info: Set(extra.encode()),
            updated_at: Set(Utc::now().fixed_offset()),
            ..Default::default()
        })
        .filter(single_player_rooms::Column::Id.eq(id))
        .filter(single_player_rooms::Column::Status.eq(SingleRoomStatus::InProgress))
        .exec(db)
        .await?;
    Ok(result.rows_affected > 0)
}

/// Moves an in-progress room to a terminal status. `None` means another
/// caller finalized it first.
pub async fn finalize(
    db: &DbConn,
    id: i32,
    outcome: SingleRoomOutcome,
) -> Result<Option<single_player_rooms::Model>, DbErr> {
    let result = single_player_rooms::Entity::update_many()
        .set(single_player_rooms::ActiveModel {
            status: Set(outcome.status),
            penalty: Set(outcome.penalty),
            performance: Set(outcome.performance),
            rating_after: Set(outcome.rating_after),
            end_time: Set(Some(outcome.end_time)),
            updated_at: Set(outcome.end_time),
            ..Default::default()
        })
        .filter(single_player_rooms::Column::Id.eq(id))
        .filter(single_player_rooms::Column::Status.eq(SingleRoomStatus::InProgress))
        .exec(db)
        .await?;
    if result.rows_affected == 0 {
        return Ok(None);
    }
    get_room(db, id).await
}
