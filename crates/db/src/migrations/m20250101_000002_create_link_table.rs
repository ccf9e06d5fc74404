//! Create link table migration.

use sea_orm_migration::prelude::*;

#[derive(DeriveMigrationName)]
pub struct Migration;

#[async_trait::async_trait]
impl MigrationTrait for Migration {
    async fn up(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .create_table(
                Table::create()
                    .table(Link::Table)
                    .if_not_exists()
                    .col(
                        ColumnDef::new(Link::Id)
                            .integer()
                            .not_null()
                            .auto_increment()
                            .primary_key(),
                    )
                    .col(ColumnDef::new(Link::Name).string_len(30).not_null())
                    .col(ColumnDef::new(Link::Link).string_len(100).not_null())
                    .col(ColumnDef::new(Link::Additional).boolean().not_null().default(false))
                    .col(ColumnDef::new(Link::UserId).integer().not_null())
                    .foreign_key(
                        ForeignKey::create()
                            .name("fk_link_user")
                            .from(Link::Table, Link::UserId)
                            .to(User::Table, User::Id)
                            .on_delete(ForeignKeyAction::Cascade),
                    )
                    .to_owned(),
            )
            .await?;

        // Unique index: (user_id, name) - a name is used once per user across buckets
        manager
            .create_index(
                Index::create()
                    .name("idx_link_user_id_name")
                    .table(Link::Table)
                    .col(Link::UserId)
                    .col(Link::Name)
                    .unique()
                    .to_owned(),
            )
            .await?;

        Ok(())
    }

    async fn down(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .drop_table(Table::drop().table(Link::Table).to_owned())
            .await
    }
}

#[derive(Iden)]
enum Link {
    Table,
    Id,
    Name,
    Link,
    Additional,
    UserId,
}

#[derive(Iden)]
enum User {
    Table,
    Id,
}
