use migration::{DbErr, Migrator, MigratorTrait, SchemaManager, sea_orm::DatabaseConnection};

pub async fn migrate(conn: &DatabaseConnection) -> Result<(), DbErr> {
    let schema_manager = SchemaManager::new(conn);
    Migrator::up(conn, None).await?;
    for table in ["users", "problems", "single_player_rooms", "team_rooms"] {
        if !schema_manager.has_table(table).await? {
            return Err(DbErr::Migration(format!("table {table} missing after migration")));
        }
    }
    Ok(())
}
