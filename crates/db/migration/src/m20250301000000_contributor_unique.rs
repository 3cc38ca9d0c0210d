use sea_orm_migration::prelude::*;

#[derive(DeriveMigrationName)]
pub struct Migration;

// One contributor row per (user, project); concurrent duplicate inserts fail here.
#[async_trait::async_trait]
impl MigrationTrait for Migration {
    async fn up(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .create_index(
                Index::create()
                    .if_not_exists()
                    .name("idx_contributors_user_project_unique")
                    .table(Contributors::Table)
                    .col(Contributors::UserId)
                    .col(Contributors::ProjectId)
                    .unique()
                    .to_owned(),
            )
            .await?;

        manager
            .create_index(
                Index::create()
                    .if_not_exists()
                    .name("idx_contributors_project_id")
                    .table(Contributors::Table)
                    .col(Contributors::ProjectId)
                    .to_owned(),
            )
            .await?;

        Ok(())
    }

    async fn down(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .get_connection()
            .execute_unprepared("DROP INDEX IF EXISTS idx_contributors_project_id;")
            .await?;
        manager
            .get_connection()
            .execute_unprepared("DROP INDEX IF EXISTS idx_contributors_user_project_unique;")
            .await?;
        Ok(())
    }
}

#[derive(Iden)]
enum Contributors {
    Table,
    UserId,
    ProjectId,
}
