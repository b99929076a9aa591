use sea_orm_migration::{prelude::*, schema::*};

#[derive(DeriveMigrationName)]
pub struct Migration;

#[async_trait::async_trait]
impl MigrationTrait for Migration {
    async fn up(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .alter_table(
                Table::alter()
                    .table(Film::Table)
                    .add_column(double_null(Film::ImdbRating))
                    .to_owned(),
            )
            .await?;

        manager
            .alter_table(
                Table::alter()
                    .table(Film::Table)
                    .add_column(integer_null(Film::ReleaseYear))
                    .to_owned(),
            )
            .await?;

        manager
            .alter_table(
                Table::alter()
                    .table(Film::Table)
                    .add_column(string_null(Film::TrailerUrl))
                    .to_owned(),
            )
            .await?;

        Ok(())
    }

    async fn down(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .alter_table(
                Table::alter().table(Film::Table).drop_column(Film::TrailerUrl).to_owned(),
            )
            .await?;
        manager
            .alter_table(
                Table::alter().table(Film::Table).drop_column(Film::ReleaseYear).to_owned(),
            )
            .await?;
        manager
            .alter_table(
                Table::alter().table(Film::Table).drop_column(Film::ImdbRating).to_owned(),
            )
            .await?;
        Ok(())
    }
}

#[derive(DeriveIden)]
enum Film {
    Table,
    ImdbRating,
    ReleaseYear,
    TrailerUrl,
}
