use std::{num::NonZeroU32, sync::Arc};

use governor::{
    Quota, RateLimiter,
    clock::DefaultClock,
    state::{InMemoryState, NotKeyed},
};
use serde::Deserialize;

use crate::{error::AppResult, models::Enrichment, pipeline::Enricher};

/// OMDb lookup for external-rating scores, release year and a poster
/// fallback. Best-effort: the pipeline treats its failures like any
/// other fetch failure.
pub struct OmdbClient {
    http: reqwest::Client,
    api_key: String,
    base_url: String,
    limiter: Arc<RateLimiter<NotKeyed, InMemoryState, DefaultClock>>,
}

impl OmdbClient {
    pub fn new(http: reqwest::Client, api_key: String, rps: u32) -> Self {
        let limiter =
            Arc::new(RateLimiter::direct(Quota::per_second(NonZeroU32::new(rps.max(1)).unwrap())));
        Self { http, api_key, base_url: "https://www.omdbapi.com".to_string(), limiter }
    }
}

impl Enricher for OmdbClient {
    async fn enrich(&self, title: &str) -> AppResult<Enrichment> {
        self.limiter.until_ready().await;

        let resp: OmdbResponse = self
            .http
            .get(&self.base_url)
            .query(&[("apikey", self.api_key.as_str()), ("t", title)])
            .send()
            .await?
            .error_for_status()?
            .json()
            .await?;

        if resp.response != "True" {
            return Ok(Enrichment::default());
        }

        Ok(Enrichment {
            imdb_rating: resp.imdb_rating.as_deref().and_then(parse_rating),
            release_year: resp.year.as_deref().and_then(parse_year),
            trailer_url: None,
            poster_url: resp.poster.filter(|p| p != "N/A"),
        })
    }
}

// OMDb uses "N/A" instead of omitting fields.
fn parse_rating(raw: &str) -> Option<f64> {
    raw.parse().ok()
}

// "2024" or a range like "2024–2025"; the first year is the release.
fn parse_year(raw: &str) -> Option<i32> {
    let digits: String = raw.chars().take_while(|c| c.is_ascii_digit()).collect();
    (digits.len() == 4).then(|| digits.parse().ok()).flatten()
}

#[derive(Debug, Deserialize)]
struct OmdbResponse {
    #[serde(rename = "Response")]
    response: String,
    #[serde(rename = "Year")]
    year: Option<String>,
    #[serde(rename = "imdbRating")]
    imdb_rating: Option<String>,
    #[serde(rename = "Poster")]
    poster: Option<String>,
}
