use std::sync::Arc;

use axum::{
    Json,
    extract::State,
    http::{HeaderValue, header},
    response::{IntoResponse, Response},
};

use crate::{
    AppState, calendar,
    error::AppResult,
    models::{CalendarEvent, display_title, event_description},
};

/// Subscribable feed: every event published inside the trailing dedup
/// window, joined with the latest film metadata.
pub async fn calendar_feed(State(state): State<Arc<AppState>>) -> AppResult<Response> {
    let publications = state.ledger.recent().await?;

    let mut events = Vec::with_capacity(publications.len());
    for publication in publications {
        let Ok(date) = publication.event_date.parse() else {
            continue;
        };
        let Some(film) = state.films.get(&publication.film_slug).await? else {
            continue;
        };
        events.push(CalendarEvent {
            slug: publication.film_slug,
            date,
            summary: display_title(&film),
            description: event_description(&film),
            url: film.source_url.clone(),
            published_at: publication.published_at,
        });
    }

    let ics =
        calendar::render(&state.config.calendar_name, &state.config.calendar_description, &events);

    let mut resp = ics.into_response();
    resp.headers_mut().insert(
        header::CONTENT_TYPE,
        HeaderValue::from_static("text/calendar; charset=utf-8"),
    );
    Ok(resp)
}

pub async fn healthz(State(state): State<Arc<AppState>>) -> AppResult<&'static str> {
    // A cheap query doubles as a storage liveness probe.
    state.films.count().await?;
    Ok("ok")
}

pub async fn stats(State(state): State<Arc<AppState>>) -> AppResult<Json<serde_json::Value>> {
    let today = jiff::Zoned::now().date();

    let total_films = state.films.count().await?;
    let foreign_films = state.films.count_foreign().await?;
    let upcoming_sessions = state.sessions.count_upcoming(today).await?;
    let recent_events = state.ledger.count_recent().await?;

    Ok(Json(serde_json::json!({
        "total_films": total_films,
        "foreign_films": foreign_films,
        "upcoming_sessions": upcoming_sessions,
        "recent_events": recent_events,
    })))
}
