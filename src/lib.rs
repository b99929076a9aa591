pub mod afisha;
pub mod calendar;
pub mod config;
pub mod db;
pub mod entities;
pub mod enrich;
pub mod error;
pub mod models;
pub mod pipeline;
pub mod routes;
pub mod store;

use std::sync::Arc;

use crate::{
    config::Config,
    store::{FilmStore, PublicationLedger, SessionStore},
};

pub struct AppState {
    pub config: Arc<Config>,
    pub films: FilmStore,
    pub sessions: SessionStore,
    pub ledger: PublicationLedger,
}
