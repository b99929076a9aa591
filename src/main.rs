use std::{sync::Arc, time::Duration};

use axum::{Router, routing::get};
use tower_http::{
    cors::{Any, CorsLayer},
    trace::TraceLayer,
};
use tracing::{error, info};

use kinofeed::{
    AppState,
    afisha::AfishaClient,
    config::Config,
    db,
    enrich::OmdbClient,
    error::AppResult,
    pipeline::Pipeline,
    routes,
    store::{FilmStore, FreshnessCache, PublicationLedger, SessionStore},
};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            std::env::var("RUST_LOG")
                .unwrap_or_else(|_| "info,kinofeed=debug,sqlx=warn".to_string()),
        )
        .init();

    let config = Arc::new(Config::from_env()?);

    let http = reqwest::Client::builder()
        .user_agent("kinofeed/0.1")
        .timeout(Duration::from_secs(30))
        .build()?;

    let db = db::connect_and_migrate(&config.database_url).await?;

    let freshness = FreshnessCache::new(db.clone(), config.cache_ttl_days);
    let films = FilmStore::new(db.clone());
    let sessions = SessionStore::new(db.clone());
    let ledger = PublicationLedger::new(db, config.dedup_window_days);

    let state = Arc::new(AppState {
        config: config.clone(),
        films: films.clone(),
        sessions: sessions.clone(),
        ledger: ledger.clone(),
    });

    let scraper = AfishaClient::new(
        http.clone(),
        config.base_url.clone(),
        &config.city_path,
        config.scrape_delay_ms,
    );
    let enricher = (!config.omdb_api_key.trim().is_empty())
        .then(|| OmdbClient::new(http, config.omdb_api_key.clone(), config.omdb_rps));

    let interval = Duration::from_secs(config.scrape_interval_hours * 3600);
    let run_config = config.clone();
    tokio::spawn(async move {
        loop {
            let pipeline = Pipeline {
                freshness: &freshness,
                films: &films,
                sessions: &sessions,
                ledger: &ledger,
                max_items: run_config.max_items,
            };
            if let Err(err) = run_once(&scraper, enricher.as_ref(), &pipeline).await {
                error!(error = %err, "scrape run failed");
            }
            tokio::time::sleep(interval).await;
        }
    });

    let app = Router::new()
        .route("/calendar.ics", get(routes::calendar_feed))
        .route("/healthz", get(routes::healthz))
        .route("/stats", get(routes::stats))
        .with_state(state)
        .layer(CorsLayer::new().allow_origin(Any).allow_headers(Any))
        .layer(TraceLayer::new_for_http());

    let listener = tokio::net::TcpListener::bind(config.addr).await?;
    info!(addr = %config.addr, "listening");
    axum::serve(listener, app).await?;

    Ok(())
}

async fn run_once(
    scraper: &AfishaClient,
    enricher: Option<&OmdbClient>,
    pipeline: &Pipeline<'_>,
) -> AppResult<()> {
    info!("starting scrape run");
    let candidates = scraper.fetch_listing().await?;
    let today = jiff::Zoned::now().date();
    let (events, report) = pipeline.run(scraper, enricher, candidates, today).await?;
    info!(
        emitted = events.len(),
        suppressed = report.events_suppressed,
        failures = report.fetch_failures,
        "scrape run finished"
    );
    Ok(())
}
