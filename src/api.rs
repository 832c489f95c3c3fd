//! JSON handlers. Every response carries `success`; failures go through
//! `AppError` and come out as `{ "error": ..., "success": false }`.

use std::sync::Arc;

use axum::{
    Json,
    extract::{
        Path, Query, State,
        rejection::{JsonRejection, QueryRejection},
    },
    http::StatusCode,
    response::IntoResponse,
};
use axum_extra::extract::cookie::CookieJar;
use serde::Deserialize;
use serde_json::{Value, json};

use crate::{
    AppState,
    auth::{self, MaybeUser, Registration, SESSION_COOKIE},
    catalog::{self, MovieDto, SearchType},
    error::{AppError, AppResult, UpstreamContext},
    library::{self, MovieIdRequest, Shelf},
    posters,
    recommend,
    search::{PosterFilter, PosterParams, non_blank},
};

type JsonBody<T> = Result<Json<T>, JsonRejection>;
type QueryParams<T> = Result<Query<T>, QueryRejection>;

fn body<T>(payload: JsonBody<T>) -> AppResult<T> {
    payload.map(|Json(v)| v).map_err(|rej| AppError::bad_request(rej.body_text()))
}

fn params<T>(query: QueryParams<T>) -> AppResult<T> {
    query.map(|Query(v)| v).map_err(|rej| AppError::bad_request(rej.body_text()))
}

pub async fn health() -> Json<Value> {
    Json(json!({ "status": "ok", "success": true }))
}

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MoviesParams {
    query: Option<String>,
    limit: Option<String>,
    search_type: Option<String>,
}

pub async fn list_movies(State(state): State<Arc<AppState>>, q: QueryParams<MoviesParams>) -> AppResult<Json<Value>> {
    let q = params(q)?;
    let limit = match non_blank(q.limit.as_deref()) {
        Some(raw) => raw
            .parse::<u64>()
            .map_err(|_| AppError::bad_request(format!("limit must be a positive integer, got '{raw}'")))?,
        None => catalog::DEFAULT_LIMIT,
    };

    let movies = catalog::list_movies(&state.db, q.query.as_deref(), SearchType::parse(q.search_type.as_deref()), limit)
        .await
        .upstream("Failed to fetch movies")?;
    let movies: Vec<MovieDto> = movies.into_iter().map(MovieDto::from).collect();

    Ok(Json(json!({ "movies": movies, "success": true })))
}

pub async fn get_movie(State(state): State<Arc<AppState>>, Path(id): Path<String>) -> AppResult<Json<Value>> {
    let movie = catalog::find_movie(&state.db, &id).await.upstream("Failed to fetch movie")?;
    Ok(Json(json!({ "movie": movie, "success": true })))
}

pub async fn movie_posters(
    State(state): State<Arc<AppState>>,
    q: QueryParams<PosterParams>,
) -> AppResult<Json<Value>> {
    let filter = PosterFilter::from_params(&params(q)?)?;
    let movies = posters::search(&state.db, &filter).await.upstream("Failed to fetch movies")?;
    Ok(Json(json!({ "movies": movies, "success": true })))
}

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
pub struct RegisterBody {
    name: Option<String>,
    email: String,
    password: String,
}

pub async fn register(
    State(state): State<Arc<AppState>>,
    payload: JsonBody<RegisterBody>,
) -> AppResult<impl IntoResponse> {
    let req = body(payload)?;
    let user = auth::register(
        &state.db,
        Registration { name: req.name, email: req.email, password: req.password },
        state.config.bcrypt_cost,
    )
    .await
    .upstream("Failed to register user")?;

    Ok((
        StatusCode::CREATED,
        Json(json!({
            "message": "User registered successfully",
            "user": { "id": user.id, "email": user.email, "name": user.name },
            "success": true,
        })),
    ))
}

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
pub struct LoginBody {
    email: String,
    password: String,
}

pub async fn login(
    State(state): State<Arc<AppState>>,
    jar: CookieJar,
    payload: JsonBody<LoginBody>,
) -> AppResult<impl IntoResponse> {
    let req = body(payload)?;
    let config = &state.config;
    let (user, token) = auth::login(&state.db, &req.email, &req.password, config.session_ttl_days)
        .await
        .upstream("Failed to log in")?;

    let jar = jar.add(auth::session_cookie(token, config.session_ttl_days, config.secure_cookies));
    Ok((
        jar,
        Json(json!({
            "user": { "id": user.id, "email": user.email, "name": user.name },
            "success": true,
        })),
    ))
}

pub async fn logout(State(state): State<Arc<AppState>>, jar: CookieJar) -> AppResult<impl IntoResponse> {
    if let Some(token) = jar.get(SESSION_COOKIE).map(|c| c.value().to_string()) {
        auth::logout(&state.db, &token).await?;
    }
    Ok((auth::clear_session(jar), Json(json!({ "success": true }))))
}

pub async fn liked_movies(State(state): State<Arc<AppState>>, user: MaybeUser) -> AppResult<Json<Value>> {
    let user = user.require("You must be logged in to view liked movies")?;
    let movies = library::list(&state.db, &user.id, Shelf::Liked).await.upstream("Failed to fetch liked movies")?;
    Ok(Json(json!({ "likedMovies": movies, "success": true })))
}

pub async fn watchlist(State(state): State<Arc<AppState>>, user: MaybeUser) -> AppResult<Json<Value>> {
    let user = user.require("You must be logged in to view your watchlist")?;
    let movies = library::list(&state.db, &user.id, Shelf::Watchlist).await.upstream("Failed to fetch watchlist")?;
    Ok(Json(json!({ "watchlist": movies, "success": true })))
}

pub async fn like_movie(
    State(state): State<Arc<AppState>>,
    user: MaybeUser,
    payload: JsonBody<MovieIdRequest>,
) -> AppResult<Json<Value>> {
    let user = user.require("You must be logged in to like a movie")?;
    let movie_id = body(payload)?.into_id()?;
    let movie = library::add(&state.db, &user.id, &movie_id, Shelf::Liked)
        .await
        .upstream("Failed to like movie")?;
    Ok(Json(json!({
        "message": "Movie liked successfully",
        "movie": MovieDto::from(movie),
        "success": true,
    })))
}

pub async fn add_to_watchlist(
    State(state): State<Arc<AppState>>,
    user: MaybeUser,
    payload: JsonBody<MovieIdRequest>,
) -> AppResult<Json<Value>> {
    let user = user.require("You must be logged in to add a movie to your watchlist")?;
    let movie_id = body(payload)?.into_id()?;
    let movie = library::add(&state.db, &user.id, &movie_id, Shelf::Watchlist)
        .await
        .upstream("Failed to add movie to watchlist")?;
    Ok(Json(json!({
        "message": "Movie added to watchlist successfully",
        "movie": MovieDto::from(movie),
        "success": true,
    })))
}

pub async fn remove_from_watchlist(
    State(state): State<Arc<AppState>>,
    user: MaybeUser,
    payload: JsonBody<MovieIdRequest>,
) -> AppResult<Json<Value>> {
    let user = user.require("You must be logged in to change your watchlist")?;
    let movie_id = body(payload)?.into_id()?;
    let removed = library::remove(&state.db, &user.id, &movie_id, Shelf::Watchlist)
        .await
        .upstream("Failed to remove movie from watchlist")?;
    if !removed {
        return Err(AppError::not_found("Movie is not in your watchlist"));
    }
    Ok(Json(json!({ "message": "Movie removed from watchlist", "success": true })))
}

#[derive(Debug, Default, Deserialize)]
pub struct RecommendParams {
    query: Option<String>,
}

pub async fn recommendations(
    State(state): State<Arc<AppState>>,
    q: QueryParams<RecommendParams>,
) -> AppResult<Json<Value>> {
    let q = params(q)?;
    let (recs, source) = recommend::recommend(&state.db, &state.inference, q.query.as_deref().unwrap_or_default())
        .await
        .upstream("Failed to get recommendations")?;
    Ok(Json(json!({ "recommendations": recs, "source": source, "success": true })))
}

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
pub struct ChatBody {
    message: String,
    model: Option<String>,
}

pub async fn chat(State(state): State<Arc<AppState>>, payload: JsonBody<ChatBody>) -> AppResult<Json<Value>> {
    let req = body(payload)?;
    let (response, model) = recommend::chat(&state.inference, &req.message, req.model.as_deref()).await?;
    Ok(Json(json!({ "response": response, "model": model, "success": true })))
}

pub async fn models(State(state): State<Arc<AppState>>) -> Json<Value> {
    let models = match state.inference.list_models().await {
        Ok(models) => models,
        Err(err) => {
            tracing::warn!(error = %err, "could not list models");
            Vec::new()
        },
    };
    Json(json!({ "running": !models.is_empty(), "models": models, "success": true }))
}
