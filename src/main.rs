use std::{sync::Arc, time::Duration};

use cinematch::{AppState, build_router, config::Config, db, inference::InferenceClient};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            std::env::var("RUST_LOG")
                .unwrap_or_else(|_| "info,cinematch=debug,sqlx=warn".to_string()),
        )
        .init();

    let config = Arc::new(Config::from_env()?);

    let http = reqwest::Client::builder()
        .user_agent("cinematch/0.1")
        .timeout(Duration::from_secs(config.inference_timeout_secs))
        .build()?;

    let db = db::connect_and_migrate(&config.database_url).await?;
    let inference = InferenceClient::from_config(http, &config);
    tracing::info!(backend = ?inference.backend(), model = %inference.default_model(), "inference configured");

    let state = Arc::new(AppState { config: config.clone(), db, inference });
    let app = build_router(state);

    let listener = tokio::net::TcpListener::bind(config.addr).await?;
    tracing::info!(addr = %config.addr, "listening");
    axum::serve(listener, app).await?;

    Ok(())
}
