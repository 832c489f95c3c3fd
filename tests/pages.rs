mod common;

use axum::http::StatusCode;
use cinematch::entities::watchlist_movie;
use common::{app, fake_ollama, get, insert_movie, insert_poster, post_form, signed_in, spawn_app};
use sea_orm::{ConnectionTrait, EntityTrait, PaginatorTrait};

#[tokio::test]
async fn home_and_movie_listing_render() {
    let app = app().await;
    insert_movie(&app.db, "m1", "The Godfather", 9.2, &["Crime", "Drama"]).await;
    insert_movie(&app.db, "m2", "Ronin", 7.2, &["Action"]).await;

    let resp = get(&app, "/", None).await;
    assert_eq!(resp.status, StatusCode::OK);
    assert!(resp.text().contains("How it works"));

    let html = get(&app, "/movies", None).await.text();
    assert!(html.contains("The Godfather"));
    assert!(html.contains("href=\"/movies/m1\""));

    let html = get(&app, "/movies?query=crime", None).await.text();
    assert!(html.contains("The Godfather"));
    assert!(!html.contains("Ronin"));

    let html = get(&app, "/movies?query=zzz", None).await.text();
    assert!(html.contains("No movies found in the database"));
}

#[tokio::test]
async fn detail_page_falls_back_to_the_poster_catalogue() {
    let app = app().await;
    let row = insert_poster(&app.db, "Arrival", Some("2016-11-11"), None, None).await;

    let resp = get(&app, &format!("/movies/{row}"), None).await;
    assert_eq!(resp.status, StatusCode::OK);
    let html = resp.text();
    assert!(html.contains("Arrival"));
    assert!(html.contains("(2016)"));

    let resp = get(&app, "/movies/nope", None).await;
    assert_eq!(resp.status, StatusCode::NOT_FOUND);
    assert!(resp.text().contains("Movie not found"));
}

#[tokio::test]
async fn private_pages_redirect_anonymous_visitors() {
    let app = app().await;
    for uri in ["/profile", "/settings"] {
        let resp = get(&app, uri, None).await;
        assert_eq!(resp.status, StatusCode::SEE_OTHER, "{uri}");
        assert_eq!(resp.location(), Some("/login"));
    }

    let resp = post_form(&app, "/movies/m1/watchlist", "", None).await;
    assert_eq!(resp.location(), Some("/login"));
}

#[tokio::test]
async fn signup_then_login_through_forms() {
    let app = app().await;

    let resp = post_form(&app, "/signup", "name=Ada&email=ada%40example.com&password=pw1234&confirm_password=nope", None).await;
    assert_eq!(resp.status, StatusCode::BAD_REQUEST);
    assert!(resp.text().contains("Passwords do not match"));

    let resp = post_form(&app, "/signup", "name=Ada&email=ada%40example.com&password=pw1234&confirm_password=pw1234", None).await;
    assert_eq!(resp.status, StatusCode::SEE_OTHER);
    assert_eq!(resp.location(), Some("/login?registered=1"));

    let resp = post_form(&app, "/login", "email=ada%40example.com&password=wrong", None).await;
    assert_eq!(resp.status, StatusCode::UNAUTHORIZED);
    assert!(resp.text().contains("Invalid email or password"));

    let resp = post_form(&app, "/login", "email=ada%40example.com&password=pw1234", None).await;
    assert_eq!(resp.status, StatusCode::SEE_OTHER);
    let cookie = resp.session_cookie().unwrap();

    let html = get(&app, "/profile", Some(&cookie)).await.text();
    assert!(html.contains("Ada"));
    assert!(html.contains("Your watchlist is empty."));

    let resp = get(&app, "/logout", Some(&cookie)).await;
    assert_eq!(resp.location(), Some("/"));
    assert_eq!(get(&app, "/profile", Some(&cookie)).await.location(), Some("/login"));
}

#[tokio::test]
async fn watchlist_form_links_and_unlinks() {
    let app = app().await;
    let cookie = signed_in(&app, "noor@example.com").await;
    let row = insert_poster(&app.db, "Arrival", Some("2016-11-11"), None, None).await;

    let resp = post_form(&app, &format!("/movies/{row}/watchlist"), "", Some(&cookie)).await;
    assert_eq!(resp.status, StatusCode::SEE_OTHER);
    assert_eq!(resp.location(), Some(format!("/movies/{row}").as_str()));
    assert_eq!(watchlist_movie::Entity::find().count(&app.db).await.unwrap(), 1);

    let html = get(&app, "/profile", Some(&cookie)).await.text();
    assert!(html.contains("Arrival"));

    let resp = post_form(&app, &format!("/movies/{row}/watchlist"), "remove=1&next=%2Fprofile", Some(&cookie)).await;
    assert_eq!(resp.location(), Some("/profile"));
    assert_eq!(watchlist_movie::Entity::find().count(&app.db).await.unwrap(), 0);
}

#[tokio::test]
async fn recommendations_page_shows_banner_and_chat_fallback() {
    let app = app().await;

    let html = get(&app, "/recommendations", None).await.text();
    assert!(html.contains("Ollama Not Running"));

    let resp = post_form(&app, "/recommendations/chat", "message=hello", None).await;
    assert_eq!(resp.status, StatusCode::OK);
    assert!(resp.text().contains("Make sure your Ollama model is running"));
}

#[tokio::test]
async fn chat_reply_is_rendered_as_markdown() {
    let host = fake_ollama("Watch **Heat** <script>x</script>", &["llama3"]).await;
    let app = spawn_app(&host).await;

    let html = post_form(&app, "/recommendations/chat", "message=heist%20films", None).await.text();
    assert!(html.contains("<strong>Heat</strong>"));
    assert!(!html.contains("<script>x</script>"));
    assert!(!html.contains("Ollama Not Running"));
}

#[tokio::test]
async fn movie_listing_falls_back_to_built_in_picks() {
    let app = app().await;
    for table in ["liked_movies", "watchlist_movies", "movies"] {
        app.db.execute_unprepared(&format!("DROP TABLE {table}")).await.unwrap();
    }

    let resp = get(&app, "/movies", None).await;
    assert_eq!(resp.status, StatusCode::OK);
    let html = resp.text();
    assert!(html.contains("Failed to load movies. Please try again later."));
    assert!(html.contains("Inception"));
    assert!(html.contains("The Matrix"));
}
