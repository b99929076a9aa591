use jiff::civil::Date;
use serde::Serialize;

use crate::entities::film;

/// Film discovered on a listing page, before the detail pages have been
/// consulted.
#[derive(Clone, Debug)]
pub struct CandidateFilm {
    pub slug: String,
    pub title: String,
    pub source_url: Option<String>,
}

/// Everything the fetch/parse collaborator can learn about one film
/// from its detail and schedule pages.
#[derive(Clone, Debug, Default)]
pub struct FilmDetails {
    pub title: Option<String>,
    pub country: Option<String>,
    pub rating: Option<String>,
    pub description: Option<String>,
    pub poster_url: Option<String>,
    pub age_limit: Option<String>,
    pub trailer_url: Option<String>,
    pub next_date: Option<Date>,
}

#[derive(Clone, Debug, Default)]
pub struct Enrichment {
    pub imdb_rating: Option<f64>,
    pub release_year: Option<i32>,
    pub trailer_url: Option<String>,
    pub poster_url: Option<String>,
}

/// A (film, date) pair that passed the dedup check, carrying the
/// human-readable fields the feed attaches to the event.
#[derive(Clone, Debug)]
pub struct CalendarEvent {
    pub slug: String,
    pub date: Date,
    pub summary: String,
    pub description: String,
    pub url: Option<String>,
    pub published_at: i64,
}

#[derive(Clone, Debug, Default, Serialize)]
pub struct RunReport {
    pub candidates: usize,
    pub cache_hits: usize,
    pub cache_misses: usize,
    pub fetch_failures: usize,
    pub domestic_skipped: usize,
    pub no_date_skipped: usize,
    pub events_emitted: usize,
    pub events_suppressed: usize,
}

/// Canonical spellings the emission filter and the stats counter both
/// match against.
pub const DOMESTIC_COUNTRIES: &[&str] = &["Россия", "СССР", "Russia", "РФ"];

/// A film counts as foreign only when its country is known and not in
/// the domestic list. Unknown country means "not emittable", not
/// "foreign by default".
pub fn is_foreign(country: Option<&str>) -> bool {
    match country {
        Some(c) => !DOMESTIC_COUNTRIES.contains(&c),
        None => false,
    }
}

/// Normalize the country spellings the listings site uses so the
/// domestic filter sees one canonical form.
pub fn normalize_country(raw: &str) -> String {
    match raw.trim().to_lowercase().as_str() {
        "россия" | "russia" | "рф" => "Россия".to_string(),
        "ссср" | "ussr" => "СССР".to_string(),
        "сша" | "usa" => "США".to_string(),
        "великобритания" | "uk" => "Великобритания".to_string(),
        _ => raw.trim().to_string(),
    }
}

pub fn display_title(film: &film::Model) -> String {
    match &film.age_limit {
        Some(age) => format!("{} ({})", film.title, age),
        None => film.title.clone(),
    }
}

/// Multi-line event description assembled from whatever metadata is
/// known for the film.
pub fn event_description(film: &film::Model) -> String {
    let mut parts = Vec::new();

    if let Some(country) = &film.country {
        parts.push(format!("Country: {country}"));
    }
    if let Some(rating) = &film.rating {
        parts.push(format!("Rating: {rating}"));
    }
    if let Some(imdb) = film.imdb_rating {
        parts.push(format!("IMDb: {imdb:.1}"));
    }
    if let Some(year) = film.release_year {
        parts.push(format!("Year: {year}"));
    }
    if let Some(desc) = &film.description {
        let truncated: String = desc.chars().take(300).collect();
        let suffix = if desc.chars().count() > 300 { "..." } else { "" };
        parts.push(format!("Plot: {truncated}{suffix}"));
    }
    if let Some(trailer) = &film.trailer_url {
        parts.push(format!("Trailer: {trailer}"));
    }
    if let Some(poster) = &film.poster_url {
        parts.push(format!("Poster: {poster}"));
    }
    if let Some(url) = &film.source_url {
        parts.push(format!("More info: {url}"));
    }

    parts.join("\n")
}
