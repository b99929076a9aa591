use sea_orm::{DatabaseConnection, EntityTrait};

use crate::{entities::film, error::AppResult, store::now_sec};

/// Decision gate the pipeline consults before going to the network:
/// stored data younger than the TTL is trusted as-is for the run.
/// Read-only; it never fetches or writes.
#[derive(Clone)]
pub struct FreshnessCache {
    db: DatabaseConnection,
    ttl_seconds: i64,
}

impl FreshnessCache {
    pub fn new(db: DatabaseConnection, ttl_days: i64) -> Self {
        Self { db, ttl_seconds: ttl_days * 86_400 }
    }

    /// False for slugs that were never stored.
    pub async fn is_fresh(&self, slug: &str) -> AppResult<bool> {
        let film = film::Entity::find_by_id(slug.to_string()).one(&self.db).await?;
        Ok(film.is_some_and(|f| now_sec().saturating_sub(f.last_seen) < self.ttl_seconds))
    }
}
