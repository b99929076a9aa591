use sea_orm::{
    ActiveValue::{NotSet, Set},
    ColumnTrait, DatabaseConnection, EntityTrait, PaginatorTrait, QueryFilter,
};

use crate::{
    entities::film,
    error::AppResult,
    models::{DOMESTIC_COUNTRIES, Enrichment, FilmDetails},
    store::now_sec,
};

/// Latest known metadata per film slug. Re-scraping the same slug
/// overwrites in place (last-write-wins); rows are never deleted.
#[derive(Clone)]
pub struct FilmStore {
    db: DatabaseConnection,
}

impl FilmStore {
    pub fn new(db: DatabaseConnection) -> Self {
        Self { db }
    }

    /// Insert-or-update keyed by slug. `last_seen` is refreshed on every
    /// call; `created_at` is set once on first insert and excluded from
    /// the conflict update.
    pub async fn upsert(
        &self,
        slug: &str,
        title: &str,
        details: &FilmDetails,
        source_url: Option<&str>,
    ) -> AppResult<()> {
        let now = now_sec();
        let model = film::ActiveModel {
            slug: Set(slug.to_string()),
            title: Set(title.to_string()),
            country: Set(details.country.clone()),
            rating: Set(details.rating.clone()),
            description: Set(details.description.clone()),
            poster_url: Set(details.poster_url.clone()),
            age_limit: Set(details.age_limit.clone()),
            source_url: Set(source_url.map(str::to_string)),
            imdb_rating: NotSet,
            release_year: NotSet,
            // A page without a hero video must not erase a trailer a
            // previous scrape or enrichment already found.
            trailer_url: match &details.trailer_url {
                Some(u) => Set(Some(u.clone())),
                None => NotSet,
            },
            last_seen: Set(now),
            created_at: Set(now),
        };

        let mut on_conflict = sea_orm::sea_query::OnConflict::column(film::Column::Slug);
        on_conflict.update_columns([
            film::Column::Title,
            film::Column::Country,
            film::Column::Rating,
            film::Column::Description,
            film::Column::PosterUrl,
            film::Column::AgeLimit,
            film::Column::SourceUrl,
            film::Column::LastSeen,
        ]);
        if details.trailer_url.is_some() {
            on_conflict.update_column(film::Column::TrailerUrl);
        }

        film::Entity::insert(model)
            .on_conflict(on_conflict.to_owned())
            .exec(&self.db)
            .await?;

        Ok(())
    }

    /// Write enrichment fields without touching `last_seen` or the
    /// scraped metadata. Fields the enricher did not resolve stay as
    /// they were.
    pub async fn apply_enrichment(&self, slug: &str, enrichment: &Enrichment) -> AppResult<()> {
        let model = film::ActiveModel {
            slug: Set(slug.to_string()),
            imdb_rating: match enrichment.imdb_rating {
                Some(r) => Set(Some(r)),
                None => NotSet,
            },
            release_year: match enrichment.release_year {
                Some(y) => Set(Some(y)),
                None => NotSet,
            },
            trailer_url: match &enrichment.trailer_url {
                Some(u) => Set(Some(u.clone())),
                None => NotSet,
            },
            poster_url: match &enrichment.poster_url {
                Some(u) => Set(Some(u.clone())),
                None => NotSet,
            },
            ..Default::default()
        };

        film::Entity::update(model).exec(&self.db).await?;
        Ok(())
    }

    pub async fn get(&self, slug: &str) -> AppResult<Option<film::Model>> {
        Ok(film::Entity::find_by_id(slug.to_string()).one(&self.db).await?)
    }

    pub async fn count(&self) -> AppResult<u64> {
        Ok(film::Entity::find().count(&self.db).await?)
    }

    pub async fn count_foreign(&self) -> AppResult<u64> {
        Ok(film::Entity::find()
            .filter(film::Column::Country.is_not_null())
            .filter(film::Column::Country.is_not_in(DOMESTIC_COUNTRIES.iter().copied()))
            .count(&self.db)
            .await?)
    }
}
