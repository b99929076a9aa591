mod common;

use std::{
    collections::{HashMap, HashSet},
    sync::Mutex,
};

use jiff::civil::{Date, date};
use kinofeed::{
    entities::film,
    error::{AppError, AppResult},
    models::{CandidateFilm, Enrichment, FilmDetails},
    pipeline::{DetailFetcher, Enricher, Pipeline},
    store::{FilmStore, FreshnessCache, PublicationLedger, SessionStore},
};
use sea_orm::{ActiveModelTrait, ActiveValue::Set, DatabaseConnection, EntityTrait};

use crate::common::{now_sec, test_db};

struct ScriptedFetcher {
    responses: HashMap<String, FilmDetails>,
    failing: HashSet<String>,
    calls: Mutex<Vec<String>>,
}

impl ScriptedFetcher {
    fn new() -> Self {
        Self { responses: HashMap::new(), failing: HashSet::new(), calls: Mutex::new(Vec::new()) }
    }

    fn with(mut self, slug: &str, details: FilmDetails) -> Self {
        self.responses.insert(slug.to_string(), details);
        self
    }

    fn failing_on(mut self, slug: &str) -> Self {
        self.failing.insert(slug.to_string());
        self
    }

    fn call_count(&self) -> usize {
        self.calls.lock().unwrap().len()
    }
}

impl DetailFetcher for ScriptedFetcher {
    async fn fetch(&self, slug: &str) -> AppResult<FilmDetails> {
        self.calls.lock().unwrap().push(slug.to_string());
        if self.failing.contains(slug) {
            return Err(AppError::scrape("scripted failure"));
        }
        self.responses
            .get(slug)
            .cloned()
            .ok_or_else(|| AppError::scrape(format!("no scripted response for {slug}")))
    }
}

struct ScriptedEnricher(Enrichment);

impl Enricher for ScriptedEnricher {
    async fn enrich(&self, _title: &str) -> AppResult<Enrichment> {
        Ok(self.0.clone())
    }
}

struct Fixture {
    freshness: FreshnessCache,
    films: FilmStore,
    sessions: SessionStore,
    ledger: PublicationLedger,
}

impl Fixture {
    fn new(db: &DatabaseConnection, ttl_days: i64) -> Self {
        Self {
            freshness: FreshnessCache::new(db.clone(), ttl_days),
            films: FilmStore::new(db.clone()),
            sessions: SessionStore::new(db.clone()),
            ledger: PublicationLedger::new(db.clone(), 30),
        }
    }

    fn pipeline(&self) -> Pipeline<'_> {
        Pipeline {
            freshness: &self.freshness,
            films: &self.films,
            sessions: &self.sessions,
            ledger: &self.ledger,
            max_items: None,
        }
    }
}

fn candidate(slug: &str, title: &str) -> CandidateFilm {
    CandidateFilm {
        slug: slug.to_string(),
        title: title.to_string(),
        source_url: Some(format!("https://a/movie/{slug}/")),
    }
}

fn foreign_details(title: &str, next_date: Option<Date>) -> FilmDetails {
    FilmDetails {
        title: Some(title.to_string()),
        country: Some("США".to_string()),
        description: Some("A film.".to_string()),
        next_date,
        ..Default::default()
    }
}

async fn age_film(db: &DatabaseConnection, slug: &str, days: i64) {
    let model = film::Entity::find_by_id(slug.to_string()).one(db).await.unwrap().unwrap();
    let mut active: film::ActiveModel = model.into();
    active.last_seen = Set(now_sec() - days * 86_400);
    active.update(db).await.unwrap();
}

const NO_ENRICHER: Option<&ScriptedEnricher> = None;

#[tokio::test]
async fn new_foreign_film_is_stored_and_emitted() {
    let db = test_db().await;
    let fx = Fixture::new(&db, 15);
    let today = date(2025, 12, 1);
    let screening = date(2025, 12, 8);

    let fetcher =
        ScriptedFetcher::new().with("foo-123", foreign_details("Foo", Some(screening)));

    let (events, report) = fx
        .pipeline()
        .run(&fetcher, NO_ENRICHER, vec![candidate("foo-123", "Foo")], today)
        .await
        .unwrap();

    assert_eq!(events.len(), 1);
    assert_eq!(events[0].slug, "foo-123");
    assert_eq!(events[0].date, screening);
    assert_eq!(report.events_emitted, 1);
    assert_eq!(report.cache_misses, 1);

    let stored = fx.films.get("foo-123").await.unwrap().unwrap();
    assert_eq!(stored.title, "Foo");
    assert_eq!(stored.country.as_deref(), Some("США"));
    assert_eq!(fx.sessions.get("foo-123").await.unwrap(), Some(screening));
    assert!(fx.ledger.has_published("foo-123", screening).await.unwrap());
}

#[tokio::test]
async fn second_run_within_ttl_hits_cache_and_emits_nothing() {
    let db = test_db().await;
    let fx = Fixture::new(&db, 15);
    let today = date(2025, 12, 1);
    let screening = date(2025, 12, 8);

    let fetcher =
        ScriptedFetcher::new().with("foo-123", foreign_details("Foo", Some(screening)));

    let candidates = vec![candidate("foo-123", "Foo")];
    fx.pipeline().run(&fetcher, NO_ENRICHER, candidates.clone(), today).await.unwrap();
    assert_eq!(fetcher.call_count(), 1);

    let (events, report) =
        fx.pipeline().run(&fetcher, NO_ENRICHER, candidates, today).await.unwrap();

    assert_eq!(fetcher.call_count(), 1, "cache hit must skip the network fetch");
    assert!(events.is_empty());
    assert_eq!(report.cache_hits, 1);
    assert_eq!(report.events_suppressed, 1);
}

#[tokio::test]
async fn rerun_after_ttl_expiry_is_suppressed_by_the_ledger() {
    let db = test_db().await;
    let fx = Fixture::new(&db, 15);
    let today = date(2025, 12, 1);
    let screening = date(2025, 12, 8);

    let fetcher =
        ScriptedFetcher::new().with("foo-123", foreign_details("Foo", Some(screening)));
    let candidates = vec![candidate("foo-123", "Foo")];

    fx.pipeline().run(&fetcher, NO_ENRICHER, candidates.clone(), today).await.unwrap();
    age_film(&db, "foo-123", 20).await;

    let (events, report) =
        fx.pipeline().run(&fetcher, NO_ENRICHER, candidates, today).await.unwrap();

    assert_eq!(fetcher.call_count(), 2, "stale record must be re-fetched");
    assert!(events.is_empty());
    assert_eq!(report.events_suppressed, 1);
}

#[tokio::test]
async fn past_session_is_cleared_and_nothing_is_emitted() {
    let db = test_db().await;
    let fx = Fixture::new(&db, 15);
    let today = date(2025, 12, 1);

    // bar-456 was seen before with a now-past screening date.
    fx.films
        .upsert("bar-456", "Bar", &foreign_details("Bar", None), None)
        .await
        .unwrap();
    fx.sessions.upsert("bar-456", Some(date(2025, 11, 1))).await.unwrap();
    age_film(&db, "bar-456", 20).await;

    let fetcher = ScriptedFetcher::new().with("bar-456", foreign_details("Bar", None));

    let (events, _) = fx
        .pipeline()
        .run(&fetcher, NO_ENRICHER, vec![candidate("bar-456", "Bar")], today)
        .await
        .unwrap();

    assert!(events.is_empty());
    assert_eq!(fx.sessions.get("bar-456").await.unwrap(), None);
}

#[tokio::test]
async fn domestic_film_is_recorded_but_never_emitted() {
    let db = test_db().await;
    let fx = Fixture::new(&db, 15);
    let today = date(2025, 12, 1);

    let mut details = foreign_details("Кино", Some(date(2025, 12, 8)));
    details.country = Some("Россия".to_string());
    let fetcher = ScriptedFetcher::new().with("kino-1", details);

    let (events, report) = fx
        .pipeline()
        .run(&fetcher, NO_ENRICHER, vec![candidate("kino-1", "Кино")], today)
        .await
        .unwrap();

    assert!(events.is_empty());
    assert_eq!(report.domestic_skipped, 1);
    // Recorded anyway so the next run inside the TTL skips the fetch.
    assert!(fx.films.get("kino-1").await.unwrap().is_some());
    assert!(fx.freshness.is_fresh("kino-1").await.unwrap());
}

#[tokio::test]
async fn fetch_failure_keeps_stored_state_and_still_emits() {
    let db = test_db().await;
    let fx = Fixture::new(&db, 15);
    let today = date(2025, 12, 1);
    let screening = date(2025, 12, 8);

    fx.films.upsert("foo-123", "Foo", &foreign_details("Foo", None), None).await.unwrap();
    fx.sessions.upsert("foo-123", Some(screening)).await.unwrap();
    age_film(&db, "foo-123", 20).await;

    let fetcher = ScriptedFetcher::new().failing_on("foo-123");

    let (events, report) = fx
        .pipeline()
        .run(&fetcher, NO_ENRICHER, vec![candidate("foo-123", "Foo")], today)
        .await
        .unwrap();

    assert_eq!(report.fetch_failures, 1);
    // Degraded run still publishes what was known as of the last
    // successful observation.
    assert_eq!(events.len(), 1);
    assert_eq!(events[0].date, screening);
    assert_eq!(fx.sessions.get("foo-123").await.unwrap(), Some(screening));
}

#[tokio::test]
async fn fetch_failure_for_unknown_slug_is_deferred() {
    let db = test_db().await;
    let fx = Fixture::new(&db, 15);

    let fetcher = ScriptedFetcher::new().failing_on("ghost-1");

    let (events, report) = fx
        .pipeline()
        .run(&fetcher, NO_ENRICHER, vec![candidate("ghost-1", "Ghost")], date(2025, 12, 1))
        .await
        .unwrap();

    assert!(events.is_empty());
    assert_eq!(report.fetch_failures, 1);
    assert!(fx.films.get("ghost-1").await.unwrap().is_none());
}

#[tokio::test]
async fn max_items_cap_stops_the_run_early() {
    let db = test_db().await;
    let fx = Fixture::new(&db, 15);
    let today = date(2025, 12, 1);

    let fetcher = ScriptedFetcher::new()
        .with("a-1", foreign_details("A", Some(date(2025, 12, 8))))
        .with("b-2", foreign_details("B", Some(date(2025, 12, 9))));

    let mut pipeline = fx.pipeline();
    pipeline.max_items = Some(1);

    let (events, _) = pipeline
        .run(
            &fetcher,
            NO_ENRICHER,
            vec![candidate("a-1", "A"), candidate("b-2", "B")],
            today,
        )
        .await
        .unwrap();

    assert_eq!(fetcher.call_count(), 1);
    assert_eq!(events.len(), 1);
    assert_eq!(events[0].slug, "a-1");
    // Partial progress stays committed and valid.
    assert!(fx.films.get("a-1").await.unwrap().is_some());
    assert!(fx.films.get("b-2").await.unwrap().is_none());
}

#[tokio::test]
async fn enrichment_lands_on_foreign_films() {
    let db = test_db().await;
    let fx = Fixture::new(&db, 15);

    let fetcher =
        ScriptedFetcher::new().with("foo-123", foreign_details("Foo", Some(date(2025, 12, 8))));
    let enricher = ScriptedEnricher(Enrichment {
        imdb_rating: Some(7.8),
        release_year: Some(2024),
        trailer_url: None,
        poster_url: None,
    });

    fx.pipeline()
        .run(&fetcher, Some(&enricher), vec![candidate("foo-123", "Foo")], date(2025, 12, 1))
        .await
        .unwrap();

    let stored = fx.films.get("foo-123").await.unwrap().unwrap();
    assert_eq!(stored.imdb_rating, Some(7.8));
    assert_eq!(stored.release_year, Some(2024));
}
