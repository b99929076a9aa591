use jiff::civil::Date;
use sea_orm::{
    ColumnTrait, DatabaseConnection, DbErr, EntityTrait, PaginatorTrait, QueryFilter, QueryOrder,
    Set,
};

use crate::{entities::publication, error::AppResult, store::now_sec};

/// Permanent log of emitted (film, date) pairs. The unique index on the
/// pair makes "already published" a cheap existence check and keeps the
/// log correct under interrupted runs.
#[derive(Clone)]
pub struct PublicationLedger {
    db: DatabaseConnection,
    window_seconds: i64,
}

impl PublicationLedger {
    pub fn new(db: DatabaseConnection, window_days: i64) -> Self {
        Self { db, window_seconds: window_days * 86_400 }
    }

    pub async fn has_published(&self, slug: &str, date: Date) -> AppResult<bool> {
        let count = publication::Entity::find()
            .filter(publication::Column::FilmSlug.eq(slug))
            .filter(publication::Column::EventDate.eq(date.to_string()))
            .count(&self.db)
            .await?;
        Ok(count > 0)
    }

    /// Record an emission. A retry of an already-recorded pair is a
    /// benign no-op: the conflict is swallowed, never a second row.
    pub async fn record(&self, slug: &str, date: Date) -> AppResult<()> {
        let model = publication::ActiveModel {
            id: Default::default(),
            film_slug: Set(slug.to_string()),
            event_date: Set(date.to_string()),
            published_at: Set(now_sec()),
        };

        let insert = publication::Entity::insert(model)
            .on_conflict(
                sea_orm::sea_query::OnConflict::columns([
                    publication::Column::FilmSlug,
                    publication::Column::EventDate,
                ])
                .do_nothing()
                .to_owned(),
            )
            .exec(&self.db)
            .await;

        match insert {
            Ok(_) | Err(DbErr::RecordNotInserted) => Ok(()),
            Err(e) => Err(e.into()),
        }
    }

    /// Publications from the trailing dedup window, oldest event first.
    /// This is the working set the feed is rebuilt from; older history
    /// stays in the log for auditing.
    pub async fn recent(&self) -> AppResult<Vec<publication::Model>> {
        let cutoff = now_sec() - self.window_seconds;
        Ok(publication::Entity::find()
            .filter(publication::Column::PublishedAt.gt(cutoff))
            .order_by_asc(publication::Column::EventDate)
            .order_by_asc(publication::Column::FilmSlug)
            .all(&self.db)
            .await?)
    }

    pub async fn count_recent(&self) -> AppResult<u64> {
        let cutoff = now_sec() - self.window_seconds;
        Ok(publication::Entity::find()
            .filter(publication::Column::PublishedAt.gt(cutoff))
            .count(&self.db)
            .await?)
    }
}
