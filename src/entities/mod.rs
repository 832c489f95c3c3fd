pub mod liked_movie;
pub mod movie;
pub mod session;
pub mod user;
pub mod watchlist_movie;
