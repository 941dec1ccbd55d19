use models::domains::{problems, single_player_rooms, team_rooms, users};
use sea_orm_migration::prelude::*;

#[derive(DeriveMigrationName)]
pub struct Migration;

fn timestamp(column: impl IntoIden) -> ColumnDef {
    ColumnDef::new(column)
        .timestamp_with_time_zone()
        .not_null()
        .default(Expr::current_timestamp())
        .to_owned()
}

fn json_text(column: impl IntoIden) -> ColumnDef {
    ColumnDef::new(column).text().not_null().default("").to_owned()
}

#[async_trait::async_trait]
impl MigrationTrait for Migration {
    async fn up(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .create_table(
                Table::create()
                    .table(users::Entity)
                    .if_not_exists()
                    .col(
                        ColumnDef::new(users::Column::Id)
                            .integer()
                            .not_null()
                            .auto_increment()
                            .primary_key(),
                    )
                    .col(
                        ColumnDef::new(users::Column::Username)
                            .string()
                            .not_null()
                            .unique_key(),
                    )
                    .col(
                        ColumnDef::new(users::Column::Email)
                            .string()
                            .not_null()
                            .unique_key(),
                    )
                    .col(ColumnDef::new(users::Column::Passhash).string().not_null())
                    .col(
                        ColumnDef::new(users::Column::Rating)
                            .integer()
                            .not_null()
                            .default(0),
                    )
                    .col(timestamp(users::Column::CreatedAt))
                    .col(timestamp(users::Column::UpdatedAt))
                    .to_owned(),
            )
            .await?;

        manager
            .create_table(
                Table::create()
                    .table(problems::Entity)
                    .if_not_exists()
                    .col(
                        ColumnDef::new(problems::Column::Id)
                            .string()
                            .not_null()
                            .primary_key(),
                    )
                    .col(ColumnDef::new(problems::Column::Name).string().not_null())
                    .col(ColumnDef::new(problems::Column::Url).string().not_null())
                    .col(
                        ColumnDef::new(problems::Column::Difficulty)
                            .integer()
                            .not_null()
                            .default(0),
                    )
                    .to_owned(),
            )
            .await?;

        manager
            .create_index(
                Index::create()
                    .name("idx-problems-difficulty")
                    .table(problems::Entity)
                    .col(problems::Column::Difficulty)
                    .if_not_exists()
                    .to_owned(),
            )
            .await?;

        manager
            .create_table(
                Table::create()
                    .table(single_player_rooms::Entity)
                    .if_not_exists()
                    .col(
                        ColumnDef::new(single_player_rooms::Column::Id)
                            .integer()
                            .not_null()
                            .auto_increment()
                            .primary_key(),
                    )
                    .col(
                        ColumnDef::new(single_player_rooms::Column::UserId)
                            .integer()
                            .not_null(),
                    )
                    .col(
                        ColumnDef::new(single_player_rooms::Column::ProblemId)
                            .string()
                            .not_null(),
                    )
                    .col(
                        ColumnDef::new(single_player_rooms::Column::Status)
                            .integer()
                            .not_null()
                            .default(0),
                    )
                    .col(
                        ColumnDef::new(single_player_rooms::Column::Penalty)
                            .integer()
                            .not_null()
                            .default(0),
                    )
                    .col(
                        ColumnDef::new(single_player_rooms::Column::Performance)
                            .integer()
                            .not_null()
                            .default(0),
                    )
                    .col(
                        ColumnDef::new(single_player_rooms::Column::RatingBefore)
                            .integer()
                            .not_null()
                            .default(0),
                    )
                    .col(
                        ColumnDef::new(single_player_rooms::Column::RatingAfter)
                            .integer()
                            .not_null()
                            .default(0),
                    )
                    .col(json_text(single_player_rooms::Column::ExtraInfo))
                    .col(timestamp(single_player_rooms::Column::CreatedAt))
                    .col(timestamp(single_player_rooms::Column::UpdatedAt))
                    .col(
                        ColumnDef::new(single_player_rooms::Column::EndTime)
                            .timestamp_with_time_zone()
                            .null(),
                    )
                    .foreign_key(
                        ForeignKey::create()
                            .name("fk-single_player_rooms-user_id")
                            .from(single_player_rooms::Entity, single_player_rooms::Column::UserId)
                            .to(users::Entity, users::Column::Id)
                            .on_delete(ForeignKeyAction::Cascade)
                            .on_update(ForeignKeyAction::NoAction),
                    )
                    .foreign_key(
                        ForeignKey::create()
                            .name("fk-single_player_rooms-problem_id")
                            .from(single_player_rooms::Entity, single_player_rooms::Column::ProblemId)
                            .to(problems::Entity, problems::Column::Id)
                            .on_delete(ForeignKeyAction::Cascade)
                            .on_update(ForeignKeyAction::NoAction),
                    )
                    .to_owned(),
            )
            .await?;

        manager
            .create_index(
                Index::create()
                    .name("idx-single_player_rooms-user_status")
                    .table(single_player_rooms::Entity)
                    .col(single_player_rooms::Column::UserId)
                    .col(single_player_rooms::Column::Status)
                    .if_not_exists()
                    .to_owned(),
            )
            .await?;

        manager
            .create_table(
                Table::create()
                    .table(team_rooms::Entity)
                    .if_not_exists()
                    .col(
                        ColumnDef::new(team_rooms::Column::Id)
                            .integer()
                            .not_null()
                            .auto_increment()
                            .primary_key(),
                    )
                    .col(
                        ColumnDef::new(team_rooms::Column::CreatorId)
                            .integer()
                            .not_null(),
                    )
                    .col(ColumnDef::new(team_rooms::Column::Mode).string().not_null())
                    .col(
                        ColumnDef::new(team_rooms::Column::Status)
                            .integer()
                            .not_null()
                            .default(0),
                    )
                    .col(json_text(team_rooms::Column::ProblemList))
                    .col(json_text(team_rooms::Column::PlayerList))
                    .col(json_text(team_rooms::Column::SubmissionRecords))
                    .col(json_text(team_rooms::Column::ProblemStatus))
                    .col(json_text(team_rooms::Column::ExtraInfo))
                    .col(timestamp(team_rooms::Column::CreatedAt))
                    .col(timestamp(team_rooms::Column::UpdatedAt))
                    .col(
                        ColumnDef::new(team_rooms::Column::EndTime)
                            .timestamp_with_time_zone()
                            .null(),
                    )
                    .foreign_key(
                        ForeignKey::create()
                            .name("fk-team_rooms-creator_id")
                            .from(team_rooms::Entity, team_rooms::Column::CreatorId)
                            .to(users::Entity, users::Column::Id)
                            .on_delete(ForeignKeyAction::Cascade)
                            .on_update(ForeignKeyAction::NoAction),
                    )
                    .to_owned(),
            )
            .await?;

        manager
            .create_index(
                Index::create()
                    .name("idx-team_rooms-status")
                    .table(team_rooms::Entity)
                    .col(team_rooms::Column::Status)
                    .if_not_exists()
                    .to_owned(),
            )
            .await?;

        Ok(())
    }

    async fn down(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .drop_table(Table::drop().table(team_rooms::Entity).to_owned())
            .await?;
        manager
            .drop_table(Table::drop().table(single_player_rooms::Entity).to_owned())
            .await?;
        manager
            .drop_table(Table::drop().table(problems::Entity).to_owned())
            .await?;
        manager
            .drop_table(Table::drop().table(users::Entity).to_owned())
            .await?;

        Ok(())
    }
}
