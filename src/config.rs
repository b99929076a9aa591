use std::net::SocketAddr;

use anyhow::Context;

#[derive(Clone, Debug)]
pub struct Config {
    pub addr: SocketAddr,
    pub database_url: String,
    pub base_url: String,
    pub city_path: String,
    pub cache_ttl_days: i64,
    pub dedup_window_days: i64,
    pub max_items: Option<usize>,
    pub scrape_delay_ms: u64,
    pub scrape_interval_hours: u64,
    pub omdb_api_key: String,
    pub omdb_rps: u32,
    pub calendar_name: String,
    pub calendar_description: String,
}

impl Config {
    pub fn from_env() -> anyhow::Result<Self> {
        dotenvy::dotenv().ok();

        let host = std::env::var("HOST").unwrap_or_else(|_| "0.0.0.0".to_string());
        let port: u16 =
            std::env::var("PORT").unwrap_or_else(|_| "8000".to_string()).parse().context("PORT")?;

        let database_url = std::env::var("DATABASE_URL")
            .unwrap_or_else(|_| "sqlite://kinofeed.db?mode=rwc".to_string());

        let base_url = std::env::var("BASE_URL")
            .unwrap_or_else(|_| "https://www.afisha.ru".to_string());
        let city_path =
            std::env::var("CITY_PATH").unwrap_or_else(|_| "/prm/schedule_cinema/".to_string());

        // Missing or unparseable numeric config falls back to the
        // documented defaults: TTL 15 days, dedup window 30 days.
        let cache_ttl_days: i64 =
            std::env::var("CACHE_TTL_DAYS").ok().and_then(|s| s.parse().ok()).unwrap_or(15);

        let dedup_window_days: i64 =
            std::env::var("DEDUP_WINDOW_DAYS").ok().and_then(|s| s.parse().ok()).unwrap_or(30);

        let max_items: Option<usize> =
            std::env::var("MAX_ITEMS").ok().and_then(|s| s.parse().ok());

        let scrape_delay_ms: u64 =
            std::env::var("SCRAPE_DELAY_MS").ok().and_then(|s| s.parse().ok()).unwrap_or(1000);

        let scrape_interval_hours: u64 =
            std::env::var("SCRAPE_INTERVAL_HOURS").ok().and_then(|s| s.parse().ok()).unwrap_or(24);

        let omdb_api_key = std::env::var("OMDB_API_KEY").unwrap_or_else(|_| "".to_string());
        let omdb_rps: u32 =
            std::env::var("OMDB_RPS").ok().and_then(|s| s.parse().ok()).unwrap_or(1);

        let calendar_name = std::env::var("CALENDAR_NAME")
            .unwrap_or_else(|_| "Foreign Films - Perm Cinemas".to_string());
        let calendar_description = std::env::var("CALENDAR_DESCRIPTION").unwrap_or_else(|_| {
            "Foreign (non-Russian) films currently showing in Perm cinemas. Updated daily."
                .to_string()
        });

        Ok(Self {
            addr: format!("{host}:{port}").parse().context("HOST/PORT")?,
            database_url,
            base_url,
            city_path,
            cache_ttl_days,
            dedup_window_days,
            max_items,
            scrape_delay_ms,
            scrape_interval_hours,
            omdb_api_key,
            omdb_rps,
            calendar_name,
            calendar_description,
        })
    }
}
