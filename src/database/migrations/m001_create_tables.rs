use sea_orm_migration::prelude::*;

#[derive(DeriveMigrationName)]
pub struct Migration;

#[async_trait::async_trait]
impl MigrationTrait for Migration {
    async fn up(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        // Create users table
        manager
            .create_table(
                Table::create()
                    .table(Users::Table)
                    .if_not_exists()
                    .col(
                        ColumnDef::new(Users::Id)
                            .integer()
                            .not_null()
                            .auto_increment()
                            .primary_key(),
                    )
                    .col(ColumnDef::new(Users::NaverId).string().not_null().unique_key())
                    .col(ColumnDef::new(Users::Name).string().not_null())
                    .col(ColumnDef::new(Users::ChildName).string().null())
                    .col(ColumnDef::new(Users::ChildAge).integer().null())
                    .col(ColumnDef::new(Users::ChildPers).string().null())
                    .col(ColumnDef::new(Users::ChildGender).string().null())
                    .col(ColumnDef::new(Users::CreatedAt).timestamp_with_time_zone().not_null())
                    .col(ColumnDef::new(Users::UpdatedAt).timestamp_with_time_zone().not_null())
                    .to_owned(),
            )
            .await?;

        // Create stories table
        manager
            .create_table(
                Table::create()
                    .table(Stories::Table)
                    .if_not_exists()
                    .col(
                        ColumnDef::new(Stories::Id)
                            .integer()
                            .not_null()
                            .auto_increment()
                            .primary_key(),
                    )
                    .col(ColumnDef::new(Stories::UserId).integer().not_null())
                    .col(ColumnDef::new(Stories::Title).string().not_null())
                    .col(ColumnDef::new(Stories::Content).text().not_null())
                    .col(ColumnDef::new(Stories::CreatedAt).timestamp_with_time_zone().not_null())
                    .foreign_key(
                        ForeignKey::create()
                            .name("fk_stories_user_id")
                            .from(Stories::Table, Stories::UserId)
                            .to(Users::Table, Users::Id)
                            .on_delete(ForeignKeyAction::Cascade),
                    )
                    .to_owned(),
            )
            .await?;

        // Create story_images table
        manager
            .create_table(
                Table::create()
                    .table(StoryImages::Table)
                    .if_not_exists()
                    .col(
                        ColumnDef::new(StoryImages::Id)
                            .integer()
                            .not_null()
                            .auto_increment()
                            .primary_key(),
                    )
                    .col(ColumnDef::new(StoryImages::StoryId).integer().not_null())
                    .col(ColumnDef::new(StoryImages::Idx).integer().not_null())
                    .col(ColumnDef::new(StoryImages::Prompt).text().not_null())
                    .col(ColumnDef::new(StoryImages::FilePath).string().not_null())
                    .col(
                        ColumnDef::new(StoryImages::MimeType)
                            .string()
                            .not_null()
                            .default("image/png"),
                    )
                    .foreign_key(
                        ForeignKey::create()
                            .name("fk_story_images_story_id")
                            .from(StoryImages::Table, StoryImages::StoryId)
                            .to(Stories::Table, Stories::Id)
                            .on_delete(ForeignKeyAction::Cascade),
                    )
                    .to_owned(),
            )
            .await?;

        // Create indexes for performance
        manager
            .create_index(
                Index::create()
                    .name("idx_stories_user_id")
                    .table(Stories::Table)
                    .col(Stories::UserId)
                    .to_owned(),
            )
            .await?;

        // One image per scene; concurrent generators collide here instead of duplicating rows
        manager
            .create_index(
                Index::create()
                    .name("idx_story_images_story_idx")
                    .table(StoryImages::Table)
                    .col(StoryImages::StoryId)
                    .col(StoryImages::Idx)
                    .unique()
                    .to_owned(),
            )
            .await?;

        Ok(())
    }

    async fn down(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .drop_table(Table::drop().table(StoryImages::Table).to_owned())
            .await?;
        manager
            .drop_table(Table::drop().table(Stories::Table).to_owned())
            .await?;
        manager
            .drop_table(Table::drop().table(Users::Table).to_owned())
            .await?;
        Ok(())
    }
}

#[derive(DeriveIden)]
pub(super) enum Users {
    Table,
    Id,
    NaverId,
    Name,
    ChildName,
    ChildAge,
    ChildPers,
    ChildGender,
    CreatedAt,
    UpdatedAt,
}

#[derive(DeriveIden)]
enum Stories {
    Table,
    Id,
    UserId,
    Title,
    Content,
    CreatedAt,
}

#[derive(DeriveIden)]
enum StoryImages {
    Table,
    Id,
    StoryId,
    Idx,
    Prompt,
    FilePath,
    MimeType,
}
