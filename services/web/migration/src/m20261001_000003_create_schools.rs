use sea_orm_migration::prelude::*;

#[derive(DeriveMigrationName)]
pub struct Migration;

#[async_trait::async_trait]
impl MigrationTrait for Migration {
    async fn up(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .create_table(
                Table::create()
                    .table(Schools::Table)
                    .if_not_exists()
                    .col(ColumnDef::new(Schools::Id).uuid().not_null().primary_key())
                    .col(ColumnDef::new(Schools::Name).string_len(255).not_null())
                    .col(ColumnDef::new(Schools::Address).string_len(255).not_null())
                    .col(ColumnDef::new(Schools::City).string_len(100).not_null())
                    .col(ColumnDef::new(Schools::State).string_len(100).not_null())
                    .col(ColumnDef::new(Schools::Contact).string_len(20).not_null())
                    .col(ColumnDef::new(Schools::Email).string_len(255).not_null())
                    .col(ColumnDef::new(Schools::Image).text().not_null())
                    .col(
                        ColumnDef::new(Schools::CreatedAt)
                            .timestamp_with_time_zone()
                            .not_null()
                            .default(Expr::current_timestamp()),
                    )
                    .to_owned(),
            )
            .await?;

        manager
            .create_index(
                Index::create()
                    .table(Schools::Table)
                    .col(Schools::CreatedAt)
                    .name("idx_schools_created_at")
                    .to_owned(),
            )
            .await
    }

    async fn down(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .drop_table(Table::drop().table(Schools::Table).to_owned())
            .await
    }
}

#[derive(Iden)]
enum Schools {
    Table,
    Id,
    Name,
    Address,
    City,
    State,
    Contact,
    Email,
    Image,
    CreatedAt,
}
