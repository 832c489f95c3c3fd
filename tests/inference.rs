mod common;

use axum::http::StatusCode;
use cinematch::recommend::CHAT_FALLBACK;
use common::{app, fake_ollama, get, insert_poster, post_json, spawn_app};
use serde_json::json;

#[tokio::test]
async fn chat_returns_the_model_reply() {
    let host = fake_ollama("Try **Heat** (1995).", &["llama3:latest"]).await;
    let app = spawn_app(&host).await;

    let resp = post_json(&app, "/api/chat", json!({ "message": "A good heist movie?" }), None).await;
    assert_eq!(resp.status, StatusCode::OK, "{}", resp.text());
    let body = resp.json();
    assert_eq!(body["success"], true);
    assert_eq!(body["response"], "Try **Heat** (1995).");
    assert_eq!(body["model"], "llama3");

    let body = post_json(&app, "/api/chat", json!({ "message": "hi", "model": "mistral" }), None).await.json();
    assert_eq!(body["model"], "mistral");
}

#[tokio::test]
async fn chat_failure_carries_the_fallback_message() {
    let app = app().await;

    let resp = post_json(&app, "/api/chat", json!({ "message": "anything" }), None).await;
    assert_eq!(resp.status, StatusCode::INTERNAL_SERVER_ERROR);
    let body = resp.json();
    assert_eq!(body["success"], false);
    assert_eq!(body["error"], CHAT_FALLBACK);

    let resp = post_json(&app, "/api/chat", json!({ "message": "   " }), None).await;
    assert_eq!(resp.status, StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn model_status_reflects_the_server() {
    let host = fake_ollama("", &["llama3:latest", "mistral:7b"]).await;
    let body = get(&spawn_app(&host).await, "/api/models", None).await.json();
    assert_eq!(body["running"], true);
    assert_eq!(body["models"], json!(["llama3:latest", "mistral:7b"]));

    let body = get(&app().await, "/api/models", None).await.json();
    assert_eq!(body["running"], false);
    assert_eq!(body["models"], json!([]));
}

#[tokio::test]
async fn catalogue_matches_win_over_the_model() {
    let app = app().await;
    insert_poster(&app.db, "Alien", Some("1979-05-25"), Some(r#"[{"name":"Horror"}]"#), None).await;
    insert_poster(&app.db, "Aliens", Some("1986-07-18"), Some(r#"[{"name":"Action"}]"#), None).await;

    let body = get(&app, "/api/recommendations?query=alien", None).await.json();
    assert_eq!(body["success"], true);
    assert_eq!(body["source"], "catalog");
    let recs = body["recommendations"].as_array().unwrap();
    assert_eq!(recs.len(), 2);
    assert!(recs.iter().all(|r| r["reason"] == "Movie title matches \"alien\""));
}

#[tokio::test]
async fn model_recommendations_are_parsed_from_fenced_json() {
    let reply = "```json\n[{\"id\": 1, \"title\": \"Heat\", \"year\": 1995, \"poster\": \"/placeholder.svg\", \
                 \"genres\": [\"Crime\"], \"reason\": \"Tense heist drama\"}]\n```";
    let host = fake_ollama(reply, &["llama3"]).await;
    let app = spawn_app(&host).await;

    let body = get(&app, "/api/recommendations?query=slow%20burn%20heist", None).await.json();
    assert_eq!(body["source"], "model");
    let recs = body["recommendations"].as_array().unwrap();
    assert_eq!(recs.len(), 1);
    assert_eq!(recs[0]["title"], "Heat");
    assert_eq!(recs[0]["reason"], "Tense heist drama");
}

#[tokio::test]
async fn unusable_model_output_falls_back_to_built_in_picks() {
    let host = fake_ollama("I'd suggest Heat, it's great.", &["llama3"]).await;
    let body = get(&spawn_app(&host).await, "/api/recommendations?query=heist", None).await.json();
    assert_eq!(body["source"], "fallback");
    assert_eq!(body["recommendations"].as_array().unwrap().len(), 6);

    let body = get(&app().await, "/api/recommendations?query=heist", None).await.json();
    assert_eq!(body["source"], "fallback");

    let resp = get(&app().await, "/api/recommendations", None).await;
    assert_eq!(resp.status, StatusCode::BAD_REQUEST);
}
