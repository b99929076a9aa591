use jiff::civil::Date;
use tracing::{debug, info, warn};

use crate::{
    error::AppResult,
    models::{
        CalendarEvent, CandidateFilm, Enrichment, FilmDetails, RunReport, display_title,
        event_description, is_foreign,
    },
    store::{FilmStore, FreshnessCache, PublicationLedger, SessionStore},
};

/// Fetch/parse collaborator: resolves one slug into whatever the detail
/// and schedule pages currently say about the film.
#[allow(async_fn_in_trait)]
pub trait DetailFetcher {
    async fn fetch(&self, slug: &str) -> AppResult<FilmDetails>;
}

/// Optional metadata enricher (external ratings, release year, trailer).
#[allow(async_fn_in_trait)]
pub trait Enricher {
    async fn enrich(&self, title: &str) -> AppResult<Enrichment>;
}

pub struct Pipeline<'a> {
    pub freshness: &'a FreshnessCache,
    pub films: &'a FilmStore,
    pub sessions: &'a SessionStore,
    pub ledger: &'a PublicationLedger,
    pub max_items: Option<usize>,
}

impl Pipeline<'_> {
    /// Process the candidate list sequentially and return the events
    /// that passed the dedup check, in the order they were produced.
    ///
    /// Per-slug fetch failures degrade to the stored state; storage
    /// errors abort the run. Progress committed before an early stop
    /// stays valid because every slug's upserts are independently
    /// idempotent.
    pub async fn run<F, E>(
        &self,
        fetcher: &F,
        enricher: Option<&E>,
        candidates: Vec<CandidateFilm>,
        today: Date,
    ) -> AppResult<(Vec<CalendarEvent>, RunReport)>
    where
        F: DetailFetcher,
        E: Enricher,
    {
        let mut report = RunReport { candidates: candidates.len(), ..Default::default() };
        let mut emitted = Vec::new();

        for (processed, candidate) in candidates.iter().enumerate() {
            if self.max_items.is_some_and(|cap| processed >= cap) {
                info!(cap = processed, "max-items cap reached, stopping run early");
                break;
            }

            let slug = candidate.slug.as_str();

            let (film, next_date) = if self.freshness.is_fresh(slug).await? {
                report.cache_hits += 1;
                let next = self.sessions.get(slug).await?;
                debug!(slug = %slug, next_date = ?next, "cache hit");
                (self.films.get(slug).await?, next)
            } else {
                report.cache_misses += 1;
                match fetcher.fetch(slug).await {
                    Ok(details) => {
                        let next = self.refresh(candidate, &details, enricher, today).await?;
                        (self.films.get(slug).await?, next)
                    },
                    Err(err) if err.is_fetch_failure() => {
                        report.fetch_failures += 1;
                        warn!(slug = %slug, error = %err, "fetch failed, keeping stored state");
                        // A slug never stored before is deferred to the
                        // next scheduled run; known-good data is never
                        // deleted over a transient failure.
                        let Some(film) = self.films.get(slug).await? else {
                            continue;
                        };
                        let next = self.sessions.get(slug).await?;
                        (Some(film), next)
                    },
                    Err(err) => return Err(err),
                }
            };

            let Some(film) = film else { continue };

            if !is_foreign(film.country.as_deref()) {
                report.domestic_skipped += 1;
                debug!(slug = %slug, country = ?film.country, "skipping domestic film");
                continue;
            }

            // A past-dated session is the same as no upcoming screening.
            let Some(date) = next_date.filter(|d| *d >= today) else {
                report.no_date_skipped += 1;
                continue;
            };

            if self.ledger.has_published(slug, date).await? {
                report.events_suppressed += 1;
                debug!(slug = %slug, date = %date, "already published, suppressing");
                continue;
            }

            // The ledger write comes after this slug's film/session
            // upserts in the same iteration, so a crash mid-run never
            // publishes an event for data that was not durably stored.
            self.ledger.record(slug, date).await?;

            info!(slug = %slug, date = %date, title = %film.title, "emitting event");
            emitted.push(CalendarEvent {
                slug: slug.to_string(),
                date,
                summary: display_title(&film),
                description: event_description(&film),
                url: film.source_url.clone(),
                published_at: crate::store::now_sec(),
            });
            report.events_emitted += 1;
        }

        info!(
            candidates = report.candidates,
            cache_hits = report.cache_hits,
            emitted = report.events_emitted,
            suppressed = report.events_suppressed,
            failures = report.fetch_failures,
            "run complete"
        );

        Ok((emitted, report))
    }

    /// Cache-miss path: persist the freshly fetched state and return the
    /// effective next date. Domestic films are recorded too so future
    /// runs skip the fetch, they just never reach emission.
    async fn refresh<E: Enricher>(
        &self,
        candidate: &CandidateFilm,
        details: &FilmDetails,
        enricher: Option<&E>,
        today: Date,
    ) -> AppResult<Option<Date>> {
        let slug = candidate.slug.as_str();
        let title = details.title.as_deref().unwrap_or(&candidate.title);

        self.films.upsert(slug, title, details, candidate.source_url.as_deref()).await?;

        let next = details.next_date.filter(|d| *d >= today);
        self.sessions.upsert(slug, next).await?;

        if let Some(enricher) = enricher
            && is_foreign(details.country.as_deref())
        {
            match enricher.enrich(title).await {
                Ok(mut enrichment) => {
                    // Keep the scraped poster when the site had one.
                    if details.poster_url.is_some() {
                        enrichment.poster_url = None;
                    }
                    self.films.apply_enrichment(slug, &enrichment).await?;
                },
                Err(err) if err.is_fetch_failure() => {
                    warn!(slug = %slug, error = %err, "enrichment failed, continuing");
                },
                Err(err) => return Err(err),
            }
        }

        Ok(next)
    }
}
