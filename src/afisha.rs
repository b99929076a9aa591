use std::{
    collections::HashSet,
    time::{Duration, SystemTime, UNIX_EPOCH},
};

use jiff::civil::Date;
use scraper::{Html, Selector};
use tracing::{debug, warn};

use crate::{
    error::{AppError, AppResult},
    models::{CandidateFilm, FilmDetails, normalize_country},
    pipeline::DetailFetcher,
};

/// Client for the afisha.ru regional cinema listings. One listing page
/// yields candidate slugs; each slug then needs a detail page (metadata)
/// and a schedule page (next screening day).
pub struct AfishaClient {
    http: reqwest::Client,
    base_url: String,
    city: String,
    delay_ms: u64,
}

impl AfishaClient {
    pub fn new(http: reqwest::Client, base_url: String, city_path: &str, delay_ms: u64) -> Self {
        let city = city_path
            .trim_matches('/')
            .split('/')
            .next()
            .unwrap_or("prm")
            .to_string();
        Self { http, base_url: base_url.trim_end_matches('/').to_string(), city, delay_ms }
    }

    pub async fn fetch_listing(&self) -> AppResult<Vec<CandidateFilm>> {
        let url = format!("{}/{}/schedule_cinema/", self.base_url, self.city);
        debug!(url = %url, "fetching listing page");
        let html = self.get(&url).await?;
        let candidates = parse_listing(&html, &self.base_url);
        debug!(candidates = candidates.len(), "parsed listing page");
        Ok(candidates)
    }

    async fn get(&self, url: &str) -> AppResult<String> {
        let body = self.http.get(url).send().await?.error_for_status()?.text().await?;
        Ok(body)
    }

    async fn polite_pause(&self) {
        let delay = self.delay_ms + jitter_ms(300);
        tokio::time::sleep(Duration::from_millis(delay)).await;
    }
}

impl DetailFetcher for AfishaClient {
    async fn fetch(&self, slug: &str) -> AppResult<FilmDetails> {
        let detail_url = format!("{}/movie/{}/", self.base_url, slug);
        debug!(slug = %slug, url = %detail_url, "fetching detail page");
        let detail_html = self.get(&detail_url).await?;
        let mut details = parse_detail(&detail_html);

        self.polite_pause().await;

        let schedule_url =
            format!("{}/{}/schedule_cinema_product/{}/", self.base_url, self.city, slug);
        let today = jiff::Zoned::now().date();
        match self.get(&schedule_url).await {
            Ok(schedule_html) => {
                details.next_date = parse_schedule(&schedule_html, today);
            },
            // Missing schedule page means no upcoming screening, not a
            // failed film.
            Err(err) => {
                warn!(slug = %slug, error = %err, "schedule page unavailable");
                details.next_date = None;
            },
        }

        self.polite_pause().await;

        if details.title.is_none() && details.country.is_none() {
            return Err(AppError::scrape(format!("detail page for {slug} had no usable data")));
        }

        Ok(details)
    }
}

pub fn parse_listing(html: &str, base_url: &str) -> Vec<CandidateFilm> {
    let doc = Html::parse_document(html);
    let selector = Selector::parse("a[href*='/movie/']").unwrap();

    let mut seen = HashSet::new();
    let mut out = Vec::new();

    for el in doc.select(&selector) {
        let Some(href) = el.value().attr("href") else { continue };
        let Some(slug) = slug_from_href(href) else { continue };
        let title = el.text().collect::<String>().trim().to_string();
        if title.is_empty() {
            continue;
        }
        if seen.insert(slug.to_string()) {
            out.push(CandidateFilm {
                slug: slug.to_string(),
                title,
                source_url: Some(format!("{}/movie/{}/", base_url.trim_end_matches('/'), slug)),
            });
        }
    }

    out
}

fn slug_from_href(href: &str) -> Option<&str> {
    let after = &href[href.find("/movie/")? + 7..];
    let slug = after.split('/').next()?;
    (!slug.is_empty()).then_some(slug)
}

pub fn parse_detail(html: &str) -> FilmDetails {
    let doc = Html::parse_document(html);

    let title = meta_content(&doc, "meta[property='og:title']");
    let description = meta_content(&doc, "meta[property='og:description']");

    let poster_url = meta_content(&doc, "meta[property='og:image']").or_else(|| {
        let sel = Selector::parse("video[poster]").unwrap();
        doc.select(&sel).next().and_then(|el| el.value().attr("poster")).map(str::to_string)
    });

    // The hero video on the detail page is the trailer.
    let trailer_url = {
        let sel = Selector::parse("video[src]").unwrap();
        doc.select(&sel)
            .next()
            .and_then(|el| el.value().attr("src"))
            .map(str::to_string)
            .filter(|s| !s.is_empty())
    };

    // Meta block reads like "США, 2024" or "Франция, Бельгия, 2023".
    let country = {
        let sel = Selector::parse("[data-test='ITEM-META']").unwrap();
        doc.select(&sel)
            .next()
            .map(|el| el.text().collect::<String>())
            .and_then(|text| {
                let first = text.split(',').next()?.trim().to_string();
                (!first.is_empty() && !first.chars().all(|c| c.is_ascii_digit()))
                    .then_some(first)
            })
            .map(|c| normalize_country(&c))
    };

    let age_limit = {
        let sel = Selector::parse("[data-test='AGE-RESTRICTION']").unwrap();
        doc.select(&sel)
            .next()
            .map(|el| el.text().collect::<String>().trim().to_string())
            .filter(|t| !t.is_empty())
    };

    // Site rating reads like "7.8"; anything non-numeric is noise from
    // a repurposed block.
    let rating = {
        let sel = Selector::parse("[data-test='RATING']").unwrap();
        doc.select(&sel)
            .next()
            .map(|el| el.text().collect::<String>().trim().to_string())
            .filter(|t| !t.is_empty() && t.chars().next().is_some_and(|c| c.is_ascii_digit()))
    };

    FilmDetails {
        title,
        country,
        rating,
        description,
        poster_url,
        age_limit,
        trailer_url,
        next_date: None,
    }
}

fn meta_content(doc: &Html, selector: &str) -> Option<String> {
    let sel = Selector::parse(selector).unwrap();
    doc.select(&sel)
        .next()
        .and_then(|el| el.value().attr("content"))
        .map(|s| s.trim().to_string())
        .filter(|s| !s.is_empty())
}

/// Earliest enabled calendar day on the schedule page, never before
/// `today`. Labels look like "8 декабря"; a month already behind us
/// rolls over into next year.
pub fn parse_schedule(html: &str, today: Date) -> Option<Date> {
    let doc = Html::parse_document(html);
    let sel = Selector::parse("a[data-test='DAY']").unwrap();

    let mut candidates = Vec::new();

    for el in doc.select(&sel) {
        if el.value().attr("disabled").is_some() {
            continue;
        }
        let label = el
            .value()
            .attr("aria-label")
            .map(str::to_string)
            .unwrap_or_else(|| el.text().collect::<String>());
        if let Some(d) = parse_day_label(&label, today) {
            candidates.push(d);
        }
    }

    candidates.into_iter().min()
}

fn parse_day_label(label: &str, today: Date) -> Option<Date> {
    let mut words = label.split_whitespace();
    let day: i8 = words.next()?.parse().ok()?;
    let month = month_ru(&words.next()?.to_lowercase())?;

    let candidate = Date::new(today.year(), month, day).ok()?;
    if candidate >= today {
        Some(candidate)
    } else {
        // e.g. a January button seen in late December
        Date::new(today.year() + 1, month, day).ok()
    }
}

fn month_ru(name: &str) -> Option<i8> {
    Some(match name {
        "января" => 1,
        "февраля" => 2,
        "марта" => 3,
        "апреля" => 4,
        "мая" => 5,
        "июня" => 6,
        "июля" => 7,
        "августа" => 8,
        "сентября" => 9,
        "октября" => 10,
        "ноября" => 11,
        "декабря" => 12,
        _ => return None,
    })
}

fn jitter_ms(max: u64) -> u64 {
    if max == 0 {
        return 0;
    }
    let nanos =
        SystemTime::now().duration_since(UNIX_EPOCH).map(|d| d.subsec_nanos() as u64).unwrap_or(0);
    nanos % (max + 1)
}

#[cfg(test)]
mod tests {
    use jiff::civil::date;

    use super::*;

    #[test]
    fn listing_extracts_unique_slugs() {
        let html = r#"
            <html><body>
            <a href="/movie/foo-123/">Foo</a>
            <a href="https://www.afisha.ru/movie/bar-456/">Bar</a>
            <a href="/movie/foo-123/">Foo again</a>
            <a href="/movie/">broken</a>
            <a href="/theatre/baz-1/">Not a movie</a>
            </body></html>"#;
        let films = parse_listing(html, "https://www.afisha.ru");
        assert_eq!(films.len(), 2);
        assert_eq!(films[0].slug, "foo-123");
        assert_eq!(films[0].source_url.as_deref(), Some("https://www.afisha.ru/movie/foo-123/"));
        assert_eq!(films[1].slug, "bar-456");
    }

    #[test]
    fn detail_reads_meta_and_country() {
        let html = r#"
            <html><head>
            <meta property="og:title" content="Дюна: Часть вторая">
            <meta property="og:description" content="Пол Атрейдес объединяется с фременами.">
            <meta property="og:image" content="https://img.example/poster.jpg">
            </head><body>
            <div data-test="ITEM-META">США, 2024</div>
            <span data-test="AGE-RESTRICTION">12+</span>
            <span data-test="RATING">8.1</span>
            <video src="https://video.example/trailer.mp4" poster="https://img.example/still.jpg"></video>
            </body></html>"#;
        let d = parse_detail(html);
        assert_eq!(d.title.as_deref(), Some("Дюна: Часть вторая"));
        assert_eq!(d.country.as_deref(), Some("США"));
        assert_eq!(d.age_limit.as_deref(), Some("12+"));
        assert_eq!(d.rating.as_deref(), Some("8.1"));
        assert_eq!(d.poster_url.as_deref(), Some("https://img.example/poster.jpg"));
        assert_eq!(d.trailer_url.as_deref(), Some("https://video.example/trailer.mp4"));
    }

    #[test]
    fn detail_without_trailer_or_rating_leaves_them_unset() {
        let html = r#"
            <html><body>
            <div data-test="ITEM-META">Франция, 2023</div>
            <span data-test="RATING">скоро</span>
            </body></html>"#;
        let d = parse_detail(html);
        assert_eq!(d.trailer_url, None);
        assert_eq!(d.rating, None, "non-numeric rating block must be ignored");
    }

    #[test]
    fn detail_ignores_year_only_meta() {
        let html = r#"<html><body><div data-test="ITEM-META">2024</div></body></html>"#;
        let d = parse_detail(html);
        assert_eq!(d.country, None);
    }

    #[test]
    fn schedule_picks_earliest_enabled_day() {
        let html = r#"
            <html><body>
            <a data-test="DAY" aria-label="10 декабря">10</a>
            <a data-test="DAY" aria-label="8 декабря">8</a>
            <a data-test="DAY" disabled aria-label="5 декабря">5</a>
            </body></html>"#;
        let today = date(2025, 12, 6);
        assert_eq!(parse_schedule(html, today), Some(date(2025, 12, 8)));
    }

    #[test]
    fn schedule_rolls_over_year_boundary() {
        let html = r#"<html><body><a data-test="DAY" aria-label="3 января">3</a></body></html>"#;
        let today = date(2025, 12, 30);
        assert_eq!(parse_schedule(html, today), Some(date(2026, 1, 3)));
    }

    #[test]
    fn schedule_without_days_is_none() {
        let html = "<html><body><p>Сеансов нет</p></body></html>";
        assert_eq!(parse_schedule(html, date(2025, 12, 6)), None);
    }

    #[test]
    fn malformed_day_labels_are_skipped() {
        let html = r#"
            <html><body>
            <a data-test="DAY" aria-label="завтра">x</a>
            <a data-test="DAY" aria-label="32 декабря">x</a>
            </body></html>"#;
        assert_eq!(parse_schedule(html, date(2025, 12, 6)), None);
    }
}
