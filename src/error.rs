use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
};

#[derive(Debug, thiserror::Error)]
pub enum AppError {
    /// Network, HTTP status or parse failure from the listings site.
    /// Non-fatal: the pipeline logs it and keeps the stored state.
    #[error("fetch failed: {0}")]
    Fetch(#[from] reqwest::Error),

    #[error("fetch failed: {0}")]
    Scrape(String),

    /// The persistent store cannot be opened or written. Fatal for the
    /// whole run.
    #[error("storage unavailable: {0}")]
    Storage(#[from] sea_orm::DbErr),
}

impl AppError {
    pub fn scrape(msg: impl Into<String>) -> Self {
        Self::Scrape(msg.into())
    }

    /// Per-slug failures the pipeline degrades on instead of aborting.
    pub fn is_fetch_failure(&self) -> bool {
        matches!(self, Self::Fetch(_) | Self::Scrape(_))
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        tracing::error!(error = %self, "request failed");
        (StatusCode::INTERNAL_SERVER_ERROR, self.to_string()).into_response()
    }
}

pub type AppResult<T> = Result<T, AppError>;
