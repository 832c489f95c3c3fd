use std::sync::Arc;

use axum::{
    extract::{Form, Path, Query, State},
    http::StatusCode,
    response::{Html, IntoResponse, Redirect, Response},
};
use axum_extra::extract::cookie::CookieJar;
use serde::Deserialize;

use crate::{
    AppState,
    auth::{self, MaybeUser, Registration, SESSION_COOKIE},
    catalog::{self, MovieDto, SearchType},
    error::{AppError, PageError, PageResult},
    library::{self, Shelf},
    markdown,
    recommend::{self, CHAT_FALLBACK},
    search::non_blank,
    templates::{self, Card, ChatExchange, PageContext, RecommendationsView},
};

const MOVIES_PAGE_LIMIT: u64 = 12;
const HOME_POPULAR_LIMIT: u64 = 4;

pub async fn index(State(state): State<Arc<AppState>>, MaybeUser(user): MaybeUser) -> Html<String> {
    let popular = match catalog::list_movies(&state.db, None, SearchType::All, HOME_POPULAR_LIMIT).await {
        Ok(movies) => movies.into_iter().map(MovieDto::from).collect(),
        Err(err) => {
            tracing::warn!(error = %err, "home page without top rated movies");
            Vec::new()
        },
    };
    Html(templates::home_page(&PageContext::new(user), &popular))
}

#[derive(Debug, Default, Deserialize)]
pub struct LoginQuery {
    registered: Option<String>,
}

pub async fn login_form(MaybeUser(user): MaybeUser, Query(q): Query<LoginQuery>) -> Response {
    if user.is_some() {
        return Redirect::to("/profile").into_response();
    }
    let notice = q.registered.is_some().then_some("Account created. You can log in now.");
    Html(templates::login_page(&PageContext::default(), "", None, notice)).into_response()
}

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
pub struct LoginForm {
    email: String,
    password: String,
}

pub async fn login_submit(State(state): State<Arc<AppState>>, jar: CookieJar, Form(form): Form<LoginForm>) -> Response {
    let config = &state.config;
    match auth::login(&state.db, &form.email, &form.password, config.session_ttl_days).await {
        Ok((_, token)) => {
            let jar = jar.add(auth::session_cookie(token, config.session_ttl_days, config.secure_cookies));
            (jar, Redirect::to("/profile")).into_response()
        },
        Err(err @ (AppError::BadRequest(_) | AppError::Unauthorized(_))) => {
            let body = templates::login_page(&PageContext::default(), &form.email, Some(&err.to_string()), None);
            (err.status(), Html(body)).into_response()
        },
        Err(err) => PageError::from(err).into_response(),
    }
}

pub async fn signup_form(MaybeUser(user): MaybeUser) -> Response {
    if user.is_some() {
        return Redirect::to("/profile").into_response();
    }
    Html(templates::signup_page(&PageContext::default(), "", "", None)).into_response()
}

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
pub struct SignupForm {
    name: String,
    email: String,
    password: String,
    confirm_password: String,
}

pub async fn signup_submit(State(state): State<Arc<AppState>>, Form(form): Form<SignupForm>) -> Response {
    let rerender = |status: StatusCode, message: &str| {
        let body = templates::signup_page(&PageContext::default(), &form.name, &form.email, Some(message));
        (status, Html(body)).into_response()
    };

    if form.password != form.confirm_password {
        return rerender(StatusCode::BAD_REQUEST, "Passwords do not match");
    }

    let reg = Registration {
        name: Some(form.name.clone()),
        email: form.email.clone(),
        password: form.password.clone(),
    };
    match auth::register(&state.db, reg, state.config.bcrypt_cost).await {
        Ok(_) => Redirect::to("/login?registered=1").into_response(),
        Err(err @ AppError::BadRequest(_)) => rerender(err.status(), &err.to_string()),
        Err(err) => PageError::from(err).into_response(),
    }
}

pub async fn logout(State(state): State<Arc<AppState>>, jar: CookieJar) -> PageResult<(CookieJar, Redirect)> {
    if let Some(token) = jar.get(SESSION_COOKIE).map(|c| c.value().to_string()) {
        auth::logout(&state.db, &token).await?;
    }
    Ok((auth::clear_session(jar), Redirect::to("/")))
}

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MoviesQuery {
    query: Option<String>,
    search_type: Option<String>,
}

pub async fn movies(
    State(state): State<Arc<AppState>>,
    MaybeUser(user): MaybeUser,
    Query(q): Query<MoviesQuery>,
) -> Html<String> {
    let search_type = SearchType::parse(q.search_type.as_deref());
    let query = q.query.unwrap_or_default();

    let (cards, notice) =
        match catalog::list_movies(&state.db, Some(query.as_str()), search_type, MOVIES_PAGE_LIMIT).await {
            Ok(found) if found.is_empty() => (Vec::new(), Some("No movies found in the database")),
            Ok(found) => (found.into_iter().map(|m| Card::from(&MovieDto::from(m))).collect(), None),
            Err(err) => {
                tracing::warn!(error = %err, "movie listing fell back to built-in picks");
                let cards = recommend::fallback_picks()
                    .iter()
                    .map(|r| Card { note: None, ..Card::from(r) })
                    .collect();
                (cards, Some("Failed to load movies. Please try again later."))
            },
        };

    Html(templates::movies_page(&PageContext::new(user), &query, &cards, notice))
}

pub async fn movie_detail(
    State(state): State<Arc<AppState>>,
    MaybeUser(user): MaybeUser,
    Path(id): Path<String>,
) -> PageResult<Html<String>> {
    let movie = catalog::find_movie(&state.db, &id).await?;
    let shelves = match &user {
        Some(u) => Some(library::status(&state.db, &u.id, &movie.id).await?),
        None => None,
    };
    Ok(Html(templates::movie_page(&PageContext::new(user), &movie, shelves)))
}

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
pub struct ShelfForm {
    remove: Option<String>,
    next: Option<String>,
}

pub async fn like(
    State(state): State<Arc<AppState>>,
    MaybeUser(user): MaybeUser,
    Path(id): Path<String>,
    Form(form): Form<ShelfForm>,
) -> PageResult<Redirect> {
    shelve(&state, user, &id, form, Shelf::Liked).await
}

pub async fn watchlist(
    State(state): State<Arc<AppState>>,
    MaybeUser(user): MaybeUser,
    Path(id): Path<String>,
    Form(form): Form<ShelfForm>,
) -> PageResult<Redirect> {
    shelve(&state, user, &id, form, Shelf::Watchlist).await
}

async fn shelve(
    state: &AppState,
    user: Option<auth::CurrentUser>,
    id: &str,
    form: ShelfForm,
    shelf: Shelf,
) -> PageResult<Redirect> {
    let Some(user) = user else {
        return Ok(Redirect::to("/login"));
    };

    if form.remove.is_some() {
        library::remove(&state.db, &user.id, id, shelf).await?;
    } else {
        library::add(&state.db, &user.id, id, shelf).await?;
    }

    let fallback = format!("/movies/{}", urlencoding::encode(id));
    Ok(Redirect::to(local_path(form.next.as_deref()).unwrap_or(&fallback)))
}

/// Only same-site paths are followed after a form post.
fn local_path(next: Option<&str>) -> Option<&str> {
    next.filter(|p| p.starts_with('/') && !p.starts_with("//"))
}

#[derive(Debug, Default, Deserialize)]
pub struct RecommendQuery {
    query: Option<String>,
}

pub async fn recommendations(
    State(state): State<Arc<AppState>>,
    MaybeUser(user): MaybeUser,
    Query(q): Query<RecommendQuery>,
) -> PageResult<Html<String>> {
    let mut view = model_status(&state).await;
    if let Some(query) = non_blank(q.query.as_deref()) {
        view.results = Some(recommend::recommend(&state.db, &state.inference, &query).await?);
        view.query = query;
    }
    Ok(Html(templates::recommendations_page(&PageContext::new(user), &view)))
}

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
pub struct ChatForm {
    message: String,
    model: Option<String>,
}

pub async fn chat(
    State(state): State<Arc<AppState>>,
    MaybeUser(user): MaybeUser,
    Form(form): Form<ChatForm>,
) -> Response {
    if form.message.trim().is_empty() {
        return Redirect::to("/recommendations").into_response();
    }

    let mut view = model_status(&state).await;
    let exchange = match recommend::chat(&state.inference, &form.message, form.model.as_deref()).await {
        Ok((reply, model)) => ChatExchange {
            message: form.message.trim().to_string(),
            reply_html: markdown::render(&reply),
            model,
            failed: false,
        },
        Err(err) => {
            tracing::warn!(error = ?err, "chat reply unavailable");
            ChatExchange {
                message: form.message.trim().to_string(),
                reply_html: markdown::render(CHAT_FALLBACK),
                model: form.model.filter(|m| !m.trim().is_empty()).unwrap_or_else(|| view.default_model.clone()),
                failed: true,
            }
        },
    };
    view.chat = Some(exchange);

    Html(templates::recommendations_page(&PageContext::new(user), &view)).into_response()
}

/// Models for the chat picker; an empty list means the server is down.
async fn model_status(state: &AppState) -> RecommendationsView {
    let models = match state.inference.list_models().await {
        Ok(models) => models,
        Err(err) => {
            tracing::debug!(error = %err, "model server unreachable");
            Vec::new()
        },
    };
    RecommendationsView {
        model_running: !models.is_empty(),
        models,
        default_model: state.inference.default_model().to_string(),
        ..Default::default()
    }
}

pub async fn profile(State(state): State<Arc<AppState>>, MaybeUser(user): MaybeUser) -> PageResult<Response> {
    let Some(user) = user else {
        return Ok(Redirect::to("/login").into_response());
    };

    let liked = library::list(&state.db, &user.id, Shelf::Liked).await?;
    let watchlist = library::list(&state.db, &user.id, Shelf::Watchlist).await?;
    let ctx = PageContext::new(Some(user.clone()));
    Ok(Html(templates::profile_page(&ctx, &user, &liked, &watchlist)).into_response())
}

pub async fn settings(MaybeUser(user): MaybeUser) -> Response {
    let Some(user) = user else {
        return Redirect::to("/login").into_response();
    };
    let ctx = PageContext::new(Some(user.clone()));
    Html(templates::settings_page(&ctx, &user)).into_response()
}
