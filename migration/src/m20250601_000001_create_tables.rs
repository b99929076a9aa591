use sea_orm_migration::{prelude::*, schema::*};

#[derive(DeriveMigrationName)]
pub struct Migration;

#[async_trait::async_trait]
impl MigrationTrait for Migration {
    async fn up(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .create_table(
                Table::create()
                    .table(Film::Table)
                    .if_not_exists()
                    .col(string(Film::Slug).primary_key())
                    .col(string(Film::Title))
                    .col(string_null(Film::Country))
                    .col(string_null(Film::Rating))
                    .col(string_null(Film::Description))
                    .col(string_null(Film::PosterUrl))
                    .col(string_null(Film::AgeLimit))
                    .col(string_null(Film::SourceUrl))
                    .col(big_integer(Film::LastSeen))
                    .col(big_integer(Film::CreatedAt))
                    .to_owned(),
            )
            .await?;

        manager
            .create_index(
                Index::create()
                    .name("idx_film_last_seen")
                    .table(Film::Table)
                    .col(Film::LastSeen)
                    .to_owned(),
            )
            .await?;

        manager
            .create_index(
                Index::create()
                    .name("idx_film_country")
                    .table(Film::Table)
                    .col(Film::Country)
                    .to_owned(),
            )
            .await?;

        manager
            .create_table(
                Table::create()
                    .table(Session::Table)
                    .if_not_exists()
                    .col(string(Session::Slug).primary_key())
                    .col(string(Session::NextDate))
                    .col(big_integer(Session::UpdatedAt))
                    .to_owned(),
            )
            .await?;

        manager
            .create_table(
                Table::create()
                    .table(Publication::Table)
                    .if_not_exists()
                    .col(pk_auto(Publication::Id))
                    .col(string(Publication::FilmSlug))
                    .col(string(Publication::EventDate))
                    .col(big_integer(Publication::PublishedAt))
                    .to_owned(),
            )
            .await?;

        // Uniqueness lives in the schema so an interrupted run can never
        // leave two rows for the same (film, date) pair.
        manager
            .create_index(
                Index::create()
                    .name("idx_publication_unique")
                    .table(Publication::Table)
                    .col(Publication::FilmSlug)
                    .col(Publication::EventDate)
                    .unique()
                    .to_owned(),
            )
            .await?;

        manager
            .create_index(
                Index::create()
                    .name("idx_publication_published_at")
                    .table(Publication::Table)
                    .col(Publication::PublishedAt)
                    .to_owned(),
            )
            .await?;

        Ok(())
    }

    async fn down(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager.drop_table(Table::drop().table(Publication::Table).to_owned()).await?;
        manager.drop_table(Table::drop().table(Session::Table).to_owned()).await?;
        manager.drop_table(Table::drop().table(Film::Table).to_owned()).await?;
        Ok(())
    }
}

#[derive(DeriveIden)]
enum Film {
    Table,
    Slug,
    Title,
    Country,
    Rating,
    Description,
    PosterUrl,
    AgeLimit,
    SourceUrl,
    LastSeen,
    CreatedAt,
}

#[derive(DeriveIden)]
enum Session {
    Table,
    Slug,
    NextDate,
    UpdatedAt,
}

#[derive(DeriveIden)]
enum Publication {
    Table,
    Id,
    FilmSlug,
    EventDate,
    PublishedAt,
}
