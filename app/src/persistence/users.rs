use chrono::Utc;
use sea_orm::{ColumnTrait, DbConn, DbErr, EntityTrait, QueryFilter, sea_query::Expr};

use models::domains::users;

pub async fn get_user(db: &DbConn, id: i32) -> Result<Option<users::Model>, DbErr> {
    users::Entity::find_by_id(id).one(db).await
}

/// Returns false when no such user exists.
pub async fn update_rating(db: &DbConn, id: i32, rating: i32) -> Result<bool, DbErr> {
    let result = users::Entity::update_many()
        .col_expr(users::Column::Rating, Expr::value(rating))
        .col_expr(
            users::Column::UpdatedAt,
            Expr::value(Utc::now().fixed_offset()),
        )
        .filter(users::Column::Id.eq(id))
        .exec(db)
        .await?;
    Ok(result.rows_affected > 0)
}
