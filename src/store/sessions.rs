use jiff::civil::Date;
use sea_orm::{ColumnTrait, DatabaseConnection, EntityTrait, PaginatorTrait, QueryFilter, Set};
use tracing::warn;

use crate::{entities::session, error::AppResult, store::now_sec};

/// Next known screening date per film, kept apart from the film record
/// so a moved date does not churn the metadata row. "No upcoming
/// screening" is stored as row absence, never as a placeholder.
#[derive(Clone)]
pub struct SessionStore {
    db: DatabaseConnection,
}

impl SessionStore {
    pub fn new(db: DatabaseConnection) -> Self {
        Self { db }
    }

    /// `Some(date)` inserts or replaces the row; `None` deletes it, so
    /// a vanished screening never lingers as stale data.
    pub async fn upsert(&self, slug: &str, next_date: Option<Date>) -> AppResult<()> {
        match next_date {
            Some(date) => {
                let model = session::ActiveModel {
                    slug: Set(slug.to_string()),
                    next_date: Set(date.to_string()),
                    updated_at: Set(now_sec()),
                };
                session::Entity::insert(model)
                    .on_conflict(
                        sea_orm::sea_query::OnConflict::column(session::Column::Slug)
                            .update_columns([
                                session::Column::NextDate,
                                session::Column::UpdatedAt,
                            ])
                            .to_owned(),
                    )
                    .exec(&self.db)
                    .await?;
            },
            None => {
                session::Entity::delete_many()
                    .filter(session::Column::Slug.eq(slug))
                    .exec(&self.db)
                    .await?;
            },
        }
        Ok(())
    }

    pub async fn get(&self, slug: &str) -> AppResult<Option<Date>> {
        let row = session::Entity::find_by_id(slug.to_string()).one(&self.db).await?;
        Ok(row.and_then(|r| match r.next_date.parse() {
            Ok(date) => Some(date),
            // Malformed date is the same as no upcoming screening, but
            // it points at a storage bug worth hearing about.
            Err(err) => {
                warn!(slug = %r.slug, raw = %r.next_date, error = %err, "unparseable stored session date, treating as none");
                None
            },
        }))
    }

    pub async fn count_upcoming(&self, today: Date) -> AppResult<u64> {
        Ok(session::Entity::find()
            .filter(session::Column::NextDate.gte(today.to_string()))
            .count(&self.db)
            .await?)
    }
}
