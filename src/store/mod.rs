mod films;
mod freshness;
mod ledger;
mod sessions;

pub use films::FilmStore;
pub use freshness::FreshnessCache;
pub use ledger::PublicationLedger;
pub use sessions::SessionStore;

pub(crate) fn now_sec() -> i64 {
    jiff::Timestamp::now().as_second()
}
