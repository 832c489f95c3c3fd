#![allow(dead_code)]

use std::sync::Arc;

use axum::{
    Json, Router,
    body::Body,
    http::{HeaderMap, Method, Request, StatusCode, header},
    routing::{get as route_get, post},
};
use cinematch::{
    AppState, build_router,
    config::{Config, InferenceBackend},
    db,
    entities::movie,
    inference::InferenceClient,
};
use http_body_util::BodyExt;
use sea_orm::{ActiveModelTrait, ActiveValue::Set, ConnectionTrait, DatabaseConnection, Statement, Value};
use serde_json::json;
use tower::ServiceExt;

/// Nothing listens here, so every inference call fails fast.
pub const DEAD_INFERENCE: &str = "http://127.0.0.1:1";

pub struct TestApp {
    pub router: Router,
    pub db: DatabaseConnection,
}

pub fn test_config(ollama_host: &str) -> Config {
    Config {
        addr: "127.0.0.1:0".parse().unwrap(),
        database_url: "sqlite::memory:".to_string(),
        inference_backend: InferenceBackend::Ollama,
        ollama_host: ollama_host.to_string(),
        ollama_model: "llama3".to_string(),
        openai_base_url: String::new(),
        openai_api_key: String::new(),
        openai_model: String::new(),
        inference_timeout_secs: 5,
        session_ttl_days: 30,
        secure_cookies: false,
        bcrypt_cost: 4,
    }
}

pub async fn spawn_app(ollama_host: &str) -> TestApp {
    let config = Arc::new(test_config(ollama_host));
    let db = db::connect_and_migrate(&config.database_url).await.unwrap();
    let http = reqwest::Client::builder()
        .timeout(std::time::Duration::from_secs(config.inference_timeout_secs))
        .build()
        .unwrap();
    let inference = InferenceClient::from_config(http, &config);
    let state = Arc::new(AppState { config, db: db.clone(), inference });
    TestApp { router: build_router(state), db }
}

pub async fn app() -> TestApp {
    spawn_app(DEAD_INFERENCE).await
}

/// Minimal Ollama stand-in: `/api/generate` always answers `reply`,
/// `/api/tags` lists `models`.
pub async fn fake_ollama(reply: &str, models: &[&str]) -> String {
    let reply = reply.to_string();
    let tags = json!({ "models": models.iter().map(|m| json!({ "name": m })).collect::<Vec<_>>() });

    let router = Router::new()
        .route(
            "/api/generate",
            post(move |Json(req): Json<serde_json::Value>| {
                let reply = reply.clone();
                async move {
                    Json(json!({
                        "model": req["model"],
                        "created_at": "2024-01-01T00:00:00Z",
                        "response": reply,
                        "done": true,
                    }))
                }
            }),
        )
        .route("/api/tags", route_get(move || async move { Json(tags.clone()) }));

    let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    tokio::spawn(async move {
        axum::serve(listener, router).await.unwrap();
    });
    format!("http://{addr}")
}

pub async fn insert_poster(
    db: &DatabaseConnection,
    title: &str,
    release_date: Option<&str>,
    genres: Option<&str>,
    jpeg: Option<&[u8]>,
) -> i64 {
    db.execute(Statement::from_sql_and_values(
        db.get_database_backend(),
        "INSERT INTO movie_posters (title, release_date, overview, runtime_min, genres, poster_jpeg) \
         VALUES (?, ?, ?, ?, ?, ?)",
        [
            Value::from(title),
            Value::from(release_date.map(str::to_string)),
            Value::from(format!("Overview of {title}")),
            Value::from(100i32),
            Value::from(genres.map(str::to_string)),
            Value::from(jpeg.map(<[u8]>::to_vec)),
        ],
    ))
    .await
    .unwrap()
    .last_insert_id() as i64
}

pub async fn insert_movie(db: &DatabaseConnection, id: &str, title: &str, rating: f64, genres: &[&str]) {
    let genres: Vec<String> = genres.iter().map(|g| g.to_string()).collect();
    movie::ActiveModel {
        id: Set(id.to_string()),
        title: Set(title.to_string()),
        year: Set(2000),
        director: Set(Some("Some Director".to_string())),
        plot: Set(None),
        poster_url: Set(None),
        backdrop_url: Set(None),
        rating: Set(Some(rating)),
        runtime: Set(Some(120)),
        genres: Set(cinematch::genres::encode_names(&genres)),
        cast: Set("[]".to_string()),
        created_at: Set(0),
        updated_at: Set(0),
    }
    .insert(db)
    .await
    .unwrap();
}

pub struct TestResponse {
    pub status: StatusCode,
    pub headers: HeaderMap,
    pub body: Vec<u8>,
}

impl TestResponse {
    pub fn json(&self) -> serde_json::Value {
        serde_json::from_slice(&self.body).unwrap()
    }

    pub fn text(&self) -> String {
        String::from_utf8_lossy(&self.body).into_owned()
    }

    pub fn location(&self) -> Option<&str> {
        self.headers.get(header::LOCATION).and_then(|v| v.to_str().ok())
    }

    /// `name=value` of the session cookie, ready for a `Cookie` header.
    pub fn session_cookie(&self) -> Option<String> {
        self.headers
            .get_all(header::SET_COOKIE)
            .iter()
            .filter_map(|v| v.to_str().ok())
            .find(|v| v.starts_with("session="))
            .and_then(|v| v.split(';').next())
            .map(str::to_string)
    }
}

pub async fn send(app: &TestApp, req: Request<Body>) -> TestResponse {
    let resp = app.router.clone().oneshot(req).await.unwrap();
    let status = resp.status();
    let headers = resp.headers().clone();
    let body = resp.into_body().collect().await.unwrap().to_bytes().to_vec();
    TestResponse { status, headers, body }
}

pub async fn get(app: &TestApp, uri: &str, cookie: Option<&str>) -> TestResponse {
    let mut req = Request::builder().method(Method::GET).uri(uri);
    if let Some(cookie) = cookie {
        req = req.header(header::COOKIE, cookie);
    }
    send(app, req.body(Body::empty()).unwrap()).await
}

pub async fn post_json(app: &TestApp, uri: &str, body: serde_json::Value, cookie: Option<&str>) -> TestResponse {
    let mut req = Request::builder()
        .method(Method::POST)
        .uri(uri)
        .header(header::CONTENT_TYPE, "application/json");
    if let Some(cookie) = cookie {
        req = req.header(header::COOKIE, cookie);
    }
    send(app, req.body(Body::from(body.to_string())).unwrap()).await
}

pub async fn post_form(app: &TestApp, uri: &str, form: &str, cookie: Option<&str>) -> TestResponse {
    let mut req = Request::builder()
        .method(Method::POST)
        .uri(uri)
        .header(header::CONTENT_TYPE, "application/x-www-form-urlencoded");
    if let Some(cookie) = cookie {
        req = req.header(header::COOKIE, cookie);
    }
    send(app, req.body(Body::from(form.to_string())).unwrap()).await
}

/// Registers `email` with a fixed password and returns the session cookie.
pub async fn signed_in(app: &TestApp, email: &str) -> String {
    let resp = post_json(
        app,
        "/api/register",
        json!({ "name": "Test User", "email": email, "password": "hunter22" }),
        None,
    )
    .await;
    assert_eq!(resp.status, StatusCode::CREATED, "{}", resp.text());

    let resp = post_json(app, "/api/login", json!({ "email": email, "password": "hunter22" }), None).await;
    assert_eq!(resp.status, StatusCode::OK, "{}", resp.text());
    resp.session_cookie().expect("login sets a session cookie")
}
