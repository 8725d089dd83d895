use sea_orm_migration::prelude::*;

use super::m001_create_tables::Users;

#[derive(DeriveMigrationName)]
pub struct Migration;

#[async_trait::async_trait]
impl MigrationTrait for Migration {
    async fn up(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .create_table(
                Table::create()
                    .table(UserSessions::Table)
                    .if_not_exists()
                    .col(
                        ColumnDef::new(UserSessions::Id)
                            .integer()
                            .not_null()
                            .auto_increment()
                            .primary_key(),
                    )
                    .col(ColumnDef::new(UserSessions::SessionId).string().not_null().unique_key())
                    .col(ColumnDef::new(UserSessions::OauthState).string().null())
                    .col(ColumnDef::new(UserSessions::UserId).integer().null())
                    .col(ColumnDef::new(UserSessions::NaverId).string().null())
                    .col(ColumnDef::new(UserSessions::UserName).string().null())
                    .col(ColumnDef::new(UserSessions::RawProfile).text().null())
                    .col(ColumnDef::new(UserSessions::CreatedAt).timestamp_with_time_zone().not_null())
                    .col(ColumnDef::new(UserSessions::UpdatedAt).timestamp_with_time_zone().not_null())
                    .col(ColumnDef::new(UserSessions::ExpiresAt).timestamp_with_time_zone().not_null())
                    .foreign_key(
                        ForeignKey::create()
                            .name("fk_user_sessions_user_id")
                            .from(UserSessions::Table, UserSessions::UserId)
                            .to(Users::Table, Users::Id)
                            .on_delete(ForeignKeyAction::Cascade),
                    )
                    .to_owned(),
            )
            .await?;

        manager
            .create_index(
                Index::create()
                    .name("idx_user_sessions_expires_at")
                    .table(UserSessions::Table)
                    .col(UserSessions::ExpiresAt)
                    .to_owned(),
            )
            .await?;

        Ok(())
    }

    async fn down(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .drop_table(Table::drop().table(UserSessions::Table).to_owned())
            .await
    }
}

#[derive(DeriveIden)]
enum UserSessions {
    Table,
    Id,
    SessionId,
    OauthState,
    UserId,
    NaverId,
    UserName,
    RawProfile,
    CreatedAt,
    UpdatedAt,
    ExpiresAt,
}
