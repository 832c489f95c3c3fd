pub mod api;
pub mod auth;
pub mod catalog;
pub mod config;
pub mod db;
pub mod entities;
pub mod error;
pub mod genres;
pub mod inference;
pub mod library;
pub mod markdown;
pub mod posters;
pub mod recommend;
pub mod routes;
pub mod search;
pub mod templates;

use std::sync::Arc;

use axum::{
    Router,
    routing::{get, post},
};
use sea_orm::DatabaseConnection;
use tower_http::{
    cors::{Any, CorsLayer},
    trace::TraceLayer,
};

use crate::{config::Config, inference::InferenceClient};

pub struct AppState {
    pub config: Arc<Config>,
    pub db: DatabaseConnection,
    pub inference: InferenceClient,
}

pub fn build_router(state: Arc<AppState>) -> Router {
    let pages = Router::new()
        .route("/", get(routes::index))
        .route("/login", get(routes::login_form).post(routes::login_submit))
        .route("/signup", get(routes::signup_form).post(routes::signup_submit))
        .route("/logout", get(routes::logout).post(routes::logout))
        .route("/movies", get(routes::movies))
        .route("/movies/{id}", get(routes::movie_detail))
        .route("/movies/{id}/like", post(routes::like))
        .route("/movies/{id}/watchlist", post(routes::watchlist))
        .route("/recommendations", get(routes::recommendations))
        .route("/recommendations/chat", post(routes::chat))
        .route("/profile", get(routes::profile))
        .route("/settings", get(routes::settings));

    let api = Router::new()
        .route("/movies", get(api::list_movies))
        .route("/movies/{id}", get(api::get_movie))
        .route("/movie-posters", get(api::movie_posters))
        .route("/register", post(api::register))
        .route("/login", post(api::login))
        .route("/logout", post(api::logout))
        .route("/user/liked-movies", get(api::liked_movies))
        .route("/user/watchlist", get(api::watchlist))
        .route("/user/like-movie", post(api::like_movie))
        .route("/user/add-to-watchlist", post(api::add_to_watchlist))
        .route("/user/remove-from-watchlist", post(api::remove_from_watchlist))
        .route("/recommendations", get(api::recommendations))
        .route("/chat", post(api::chat))
        .route("/models", get(api::models));

    Router::new()
        .merge(pages)
        .nest("/api", api)
        .route("/health", get(api::health))
        .with_state(state)
        .layer(CorsLayer::new().allow_origin(Any).allow_headers(Any))
        .layer(TraceLayer::new_for_http())
}
