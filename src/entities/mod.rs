pub mod film;
pub mod publication;
pub mod session;
