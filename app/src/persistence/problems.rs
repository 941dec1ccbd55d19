use rand::Rng;
use sea_orm::{
    ColumnTrait, DbConn, DbErr, EntityTrait, PaginatorTrait, QueryFilter, QueryOrder, QuerySelect,
};

use models::domains::problems;

pub async fn get_problem(db: &DbConn, id: &str) -> Result<Option<problems::Model>, DbErr> {
    problems::Entity::find_by_id(id.to_owned()).one(db).await
}

/// Picks a random problem with `min <= difficulty <= max` whose id is not in
/// `exclude`.
pub async fn random_in_range(
    db: &DbConn,
    min: i32,
    max: i32,
    exclude: &[String],
) -> Result<Option<problems::Model>, DbErr> {
    let mut query = problems::Entity::find()
        .filter(problems::Column::Difficulty.between(min, max));
    if !exclude.is_empty() {
        query = query.filter(problems::Column::Id.is_not_in(exclude.iter().cloned()));
    }

    let total = query.clone().count(db).await?;
    if total == 0 {
        return Ok(None);
    }
    let offset = rand::rng().random_range(0..total);

    query
        .order_by_asc(problems::Column::Id)
        .offset(offset)
        .limit(1)
        .one(db)
        .await
}
