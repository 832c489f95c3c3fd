use maud::{DOCTYPE, Markup, PreEscaped, html};

use crate::{
    auth::CurrentUser,
    catalog::MovieDto,
    recommend::{Recommendation, RecommendationSource},
};

const TAILWIND_CDN: &str = "https://cdn.tailwindcss.com";
const APP_NAME: &str = "CineMatch";

const INPUT_CLASS: &str = "mt-2 w-full rounded-md border border-gray-300 px-3 py-2 focus:border-purple-500 focus:outline-none focus:ring-1 focus:ring-purple-500";
const BUTTON_CLASS: &str = "rounded-md bg-gradient-to-r from-purple-600 to-cyan-600 px-4 py-2 font-semibold text-white hover:from-purple-700 hover:to-cyan-700";

/// Request-scoped data every page needs. Built by the handler from the
/// session, never from globals.
#[derive(Clone, Debug, Default)]
pub struct PageContext {
    pub user: Option<CurrentUser>,
}

impl PageContext {
    pub fn new(user: Option<CurrentUser>) -> Self {
        Self { user }
    }
}

/// What a movie card needs, whichever source the movie came from.
#[derive(Clone, Debug)]
pub struct Card {
    pub href: Option<String>,
    pub title: String,
    pub year: Option<i32>,
    pub image: Option<String>,
    pub genres: Vec<String>,
    pub note: Option<String>,
}

impl From<&MovieDto> for Card {
    fn from(m: &MovieDto) -> Self {
        Self {
            href: Some(format!("/movies/{}", urlencoding::encode(&m.id))),
            title: m.title.clone(),
            year: (m.year > 0).then_some(m.year),
            image: m.image().map(str::to_string),
            genres: m.genres.clone(),
            note: m.director.clone(),
        }
    }
}

impl From<&Recommendation> for Card {
    fn from(r: &Recommendation) -> Self {
        Self {
            href: None,
            title: r.title.clone(),
            year: r.year,
            image: r.poster.clone(),
            genres: r.genres.clone(),
            note: Some(r.reason.clone()).filter(|s| !s.is_empty()),
        }
    }
}

#[derive(Clone, Debug)]
pub struct ChatExchange {
    pub message: String,
    /// Rendered markdown: raw HTML escaped, unsafe link targets replaced.
    pub reply_html: String,
    pub model: String,
    pub failed: bool,
}

#[derive(Clone, Debug, Default)]
pub struct RecommendationsView {
    pub query: String,
    pub results: Option<(Vec<Recommendation>, RecommendationSource)>,
    pub model_running: bool,
    pub models: Vec<String>,
    pub default_model: String,
    pub chat: Option<ChatExchange>,
}

pub fn home_page(ctx: &PageContext, popular: &[MovieDto]) -> String {
    let steps = [
        ("Tell us what you like", "Share your movie preferences, favorite genres, and films you've enjoyed in the past."),
        ("Get AI recommendations", "Our AI analyzes your preferences and suggests movies tailored specifically to your taste."),
        ("Build your watchlist", "Save recommendations to your watchlist and keep track of movies you want to watch."),
    ];

    page(
        ctx,
        APP_NAME,
        html! {
            section class="bg-gradient-to-br from-purple-700 to-cyan-600 text-white" {
                div class="max-w-5xl mx-auto px-6 py-20" {
                    h1 class="text-4xl font-bold" { "Find your next favorite movie" }
                    p class="mt-4 text-lg text-purple-100" { "Describe what you're in the mood for and get recommendations from our catalogue and a local AI model." }
                    form class="mt-8 flex gap-3" method="get" action="/recommendations" {
                        input class="flex-1 rounded-md px-4 py-3 text-gray-900" name="query" placeholder="e.g. mind-bending sci-fi with a twist";
                        button class="rounded-md bg-white px-5 py-3 font-semibold text-purple-700 hover:bg-purple-50" type="submit" { "Recommend" }
                    }
                }
            }

            section class="max-w-5xl mx-auto px-6 py-16" {
                h2 class="text-2xl font-bold text-gray-900" { "How it works" }
                div class="mt-8 grid gap-6 md:grid-cols-3" {
                    @for (i, (title, text)) in steps.iter().enumerate() {
                        div class="bg-white shadow rounded-lg p-6" {
                            span class="text-sm font-semibold text-purple-600" { "Step " (i + 1) }
                            h3 class="mt-2 text-lg font-semibold text-gray-900" { (title) }
                            p class="mt-2 text-gray-600" { (text) }
                        }
                    }
                }
            }

            @if !popular.is_empty() {
                section class="max-w-5xl mx-auto px-6 pb-16" {
                    div class="flex items-center justify-between" {
                        h2 class="text-2xl font-bold text-gray-900" { "Top rated" }
                        a class="text-sm text-purple-600 hover:text-purple-800" href="/movies" { "Browse all" }
                    }
                    (card_grid(popular.iter().map(Card::from)))
                }
            }
        },
    )
}

pub fn login_page(ctx: &PageContext, email: &str, error: Option<&str>, notice: Option<&str>) -> String {
    page(
        ctx,
        "Log in",
        narrow(html! {
            h1 class="text-2xl font-bold text-gray-900" { "Log in" }
            (alerts(error, notice))
            form class="mt-6 space-y-5" method="post" action="/login" {
                div {
                    label class="block text-sm font-medium text-gray-700" for="email" { "Email" }
                    input class=(INPUT_CLASS) type="email" name="email" id="email" value=(email) required;
                }
                div {
                    label class="block text-sm font-medium text-gray-700" for="password" { "Password" }
                    input class=(INPUT_CLASS) type="password" name="password" id="password" required;
                }
                button class={ "w-full " (BUTTON_CLASS) } type="submit" { "Log in" }
            }
            p class="mt-6 text-sm text-gray-600" {
                "No account yet? "
                a class="text-purple-600 hover:text-purple-800" href="/signup" { "Sign up" }
            }
        }),
    )
}

pub fn signup_page(ctx: &PageContext, name: &str, email: &str, error: Option<&str>) -> String {
    page(
        ctx,
        "Sign up",
        narrow(html! {
            h1 class="text-2xl font-bold text-gray-900" { "Create an account" }
            (alerts(error, None))
            form class="mt-6 space-y-5" method="post" action="/signup" {
                div {
                    label class="block text-sm font-medium text-gray-700" for="name" { "Name" }
                    input class=(INPUT_CLASS) name="name" id="name" value=(name);
                }
                div {
                    label class="block text-sm font-medium text-gray-700" for="email" { "Email" }
                    input class=(INPUT_CLASS) type="email" name="email" id="email" value=(email) required;
                }
                div {
                    label class="block text-sm font-medium text-gray-700" for="password" { "Password" }
                    input class=(INPUT_CLASS) type="password" name="password" id="password" required;
                }
                div {
                    label class="block text-sm font-medium text-gray-700" for="confirm_password" { "Confirm password" }
                    input class=(INPUT_CLASS) type="password" name="confirm_password" id="confirm_password" required;
                }
                button class={ "w-full " (BUTTON_CLASS) } type="submit" { "Sign up" }
            }
            p class="mt-6 text-sm text-gray-600" {
                "Already have an account? "
                a class="text-purple-600 hover:text-purple-800" href="/login" { "Log in" }
            }
        }),
    )
}

pub fn movies_page(ctx: &PageContext, query: &str, cards: &[Card], notice: Option<&str>) -> String {
    page(
        ctx,
        "Movies",
        wide(html! {
            div class="flex flex-wrap items-center justify-between gap-4" {
                h1 class="text-3xl font-bold text-gray-900" { "Movies" }
                a class=(BUTTON_CLASS) href="/recommendations" { "Find Recommendations" }
            }
            form class="mt-6 flex gap-3" method="get" action="/movies" {
                input class="flex-1 rounded-md border border-gray-300 px-3 py-2" name="query" value=(query) placeholder="Title, director or genre";
                button class=(BUTTON_CLASS) type="submit" { "Search" }
            }
            @if let Some(notice) = notice {
                p class="mt-6 rounded-md bg-amber-50 px-4 py-3 text-amber-800" { (notice) }
            }
            (card_grid(cards.iter().cloned()))
        }),
    )
}

pub fn movie_page(ctx: &PageContext, movie: &MovieDto, shelves: Option<(bool, bool)>) -> String {
    let base = format!("/movies/{}", urlencoding::encode(&movie.id));

    page(
        ctx,
        &movie.title,
        wide(html! {
            div class="grid gap-8 md:grid-cols-3" {
                div {
                    (poster(movie.image(), &movie.title))
                }
                div class="md:col-span-2" {
                    h1 class="text-3xl font-bold text-gray-900" {
                        (movie.title)
                        @if movie.year > 0 {
                            span class="ml-2 font-normal text-gray-500" { "(" (movie.year) ")" }
                        }
                    }
                    div class="mt-3 flex flex-wrap gap-2" {
                        @for genre in &movie.genres {
                            (genre_badge(genre))
                        }
                    }
                    dl class="mt-6 grid grid-cols-2 gap-4 text-sm" {
                        @if let Some(director) = &movie.director {
                            div { dt class="text-gray-500" { "Director" } dd class="font-medium" { (director) } }
                        }
                        @if let Some(rating) = movie.rating {
                            div { dt class="text-gray-500" { "Rating" } dd class="font-medium" { (format!("{rating:.1}")) } }
                        }
                        @if let Some(runtime) = movie.runtime {
                            div { dt class="text-gray-500" { "Runtime" } dd class="font-medium" { (runtime) " min" } }
                        }
                    }
                    @if let Some(plot) = &movie.plot {
                        p class="mt-6 text-gray-700 leading-relaxed" { (plot) }
                    }
                    @if !movie.cast.is_empty() {
                        p class="mt-4 text-sm text-gray-600" { span class="font-medium" { "Cast: " } (movie.cast.join(", ")) }
                    }

                    div class="mt-8 flex gap-3" {
                        @match shelves {
                            Some((liked, watchlisted)) => {
                                (shelf_button(&format!("{base}/like"), liked, "Like", "Unlike", &base))
                                (shelf_button(&format!("{base}/watchlist"), watchlisted, "Add to watchlist", "Remove from watchlist", &base))
                            },
                            None => {
                                a class="text-purple-600 hover:text-purple-800" href="/login" { "Log in to like or save this movie" }
                            },
                        }
                    }
                }
            }
        }),
    )
}

pub fn recommendations_page(ctx: &PageContext, view: &RecommendationsView) -> String {
    page(
        ctx,
        "Recommendations",
        wide(html! {
            h1 class="text-3xl font-bold text-gray-900" { "Movie Recommendations" }

            @if !view.model_running {
                div class="mt-6 rounded-md border border-red-200 bg-red-50 px-4 py-3 text-red-800" {
                    p class="font-semibold" { "Ollama Not Running" }
                    p class="mt-1 text-sm" {
                        "The chat assistant and AI recommendations need a running model server. Start Ollama and reload this page. "
                        "If you haven't installed it yet, get it from "
                        a class="underline" href="https://ollama.com" target="_blank" rel="noopener noreferrer" { "ollama.com" }
                        "."
                    }
                }
            }

            form class="mt-6 flex gap-3" method="get" action="/recommendations" {
                input class="flex-1 rounded-md border border-gray-300 px-3 py-2" name="query" value=(view.query) placeholder="Describe what you want to watch";
                button class=(BUTTON_CLASS) type="submit" { "Search" }
            }

            @if let Some((recs, source)) = &view.results {
                p class="mt-6 text-sm text-gray-500" {
                    @match source {
                        RecommendationSource::Catalog => "From our catalogue",
                        RecommendationSource::Model => "Suggested by the AI model",
                        RecommendationSource::Fallback => "Our picks while the AI model is unavailable",
                    }
                }
                (card_grid(recs.iter().map(Card::from)))
            }

            section class="mt-12 bg-white shadow rounded-lg p-6" {
                h2 class="text-xl font-semibold text-gray-900" { "Chat with the movie assistant" }
                @if let Some(chat) = &view.chat {
                    div class="mt-4 space-y-3" {
                        div class="rounded-md bg-purple-50 px-4 py-3" {
                            p class="text-xs font-semibold text-purple-700" { "You" }
                            p class="mt-1 text-gray-800" { (chat.message) }
                        }
                        div class=(if chat.failed { "rounded-md px-4 py-3 bg-red-50" } else { "rounded-md px-4 py-3 bg-gray-50" }) {
                            p class="text-xs font-semibold text-gray-600" { "Assistant · " (chat.model) }
                            div class="prose mt-1 max-w-none text-gray-800" { (PreEscaped(&chat.reply_html)) }
                        }
                    }
                }
                form class="mt-4 space-y-3" method="post" action="/recommendations/chat" {
                    textarea class=(INPUT_CLASS) name="message" rows="3" placeholder="Ask about films, directors, or what to watch next" required {}
                    div class="flex items-center gap-3" {
                        @if !view.models.is_empty() {
                            select class="rounded-md border border-gray-300 px-3 py-2 text-sm" name="model" {
                                @for model in &view.models {
                                    option value=(model) selected[*model == view.default_model] { (model) }
                                }
                            }
                        }
                        button class=(BUTTON_CLASS) type="submit" { "Send" }
                    }
                }
            }
        }),
    )
}

pub fn profile_page(ctx: &PageContext, user: &CurrentUser, liked: &[MovieDto], watchlist: &[MovieDto]) -> String {
    page(
        ctx,
        "Profile",
        wide(html! {
            h1 class="text-3xl font-bold text-gray-900" { (user.display_name()) }
            p class="mt-1 text-gray-500" { (user.email) }

            div class="mt-6 grid grid-cols-2 gap-4 md:w-1/2" {
                (stat("Liked", liked.len()))
                (stat("Watchlist", watchlist.len()))
            }

            (shelf_section("Your Watchlist", "Your watchlist is empty.", "Find Movies to Watch", "watchlist", watchlist))
            (shelf_section("Movies You Liked", "You haven't liked any movies yet.", "Discover Movies", "like", liked))
        }),
    )
}

pub fn settings_page(ctx: &PageContext, user: &CurrentUser) -> String {
    page(
        ctx,
        "Settings",
        narrow(html! {
            h1 class="text-2xl font-bold text-gray-900" { "Account Settings" }
            p class="mt-2 text-gray-600" { "Manage your account information and preferences" }
            dl class="mt-6 space-y-4 text-sm" {
                div { dt class="text-gray-500" { "Name" } dd class="font-medium" { (user.name.as_deref().unwrap_or("Not set")) } }
                div { dt class="text-gray-500" { "Email" } dd class="font-medium" { (user.email) } }
            }
            p class="mt-8 rounded-md bg-gray-50 px-4 py-3 text-sm text-gray-600" {
                "Profile editing, notification and privacy preferences are not available yet."
            }
            form class="mt-6" method="post" action="/logout" {
                button class="text-sm text-red-600 hover:text-red-800" type="submit" { "Log out" }
            }
        }),
    )
}

pub fn error_page(message: String) -> String {
    page(
        &PageContext::default(),
        "Error",
        html! {
            div class="min-h-[60vh] flex items-center justify-center" {
                div class="max-w-xl w-full px-6" {
                    div class="bg-white shadow rounded-lg p-8" {
                        h1 class="text-2xl font-bold text-gray-900" { "Error" }
                        p class="mt-4 text-gray-700" { (message) }
                        a class="mt-6 inline-block text-purple-600 hover:text-purple-800" href="/" { "Back" }
                    }
                }
            }
        },
    )
}

fn page(ctx: &PageContext, title: &str, body: Markup) -> String {
    html! {
        (DOCTYPE)
        html lang="en" {
            head {
                meta charset="utf-8";
                meta name="viewport" content="width=device-width, initial-scale=1";
                title { (title) " · " (APP_NAME) }
                script src=(TAILWIND_CDN) {}
            }
            body class="min-h-screen bg-gray-50" {
                (navbar(ctx))
                main { (body) }
            }
        }
    }
    .into_string()
}

fn navbar(ctx: &PageContext) -> Markup {
    html! {
        nav class="bg-white shadow-sm" {
            div class="max-w-5xl mx-auto flex items-center justify-between px-6 py-4" {
                a class="text-xl font-bold text-purple-700" href="/" { (APP_NAME) }
                div class="flex items-center gap-5 text-sm" {
                    a class="text-gray-700 hover:text-gray-900" href="/movies" { "Movies" }
                    a class="text-gray-700 hover:text-gray-900" href="/recommendations" { "Recommendations" }
                    @if let Some(user) = &ctx.user {
                        a class="text-gray-700 hover:text-gray-900" href="/profile" { (user.display_name()) }
                        a class="text-gray-700 hover:text-gray-900" href="/settings" { "Settings" }
                        form method="post" action="/logout" {
                            button class="text-gray-500 hover:text-gray-700" type="submit" { "Log out" }
                        }
                    } @else {
                        a class="text-gray-700 hover:text-gray-900" href="/login" { "Log in" }
                        a class=(BUTTON_CLASS) href="/signup" { "Sign up" }
                    }
                }
            }
        }
    }
}

fn narrow(inner: Markup) -> Markup {
    html! {
        div class="max-w-md mx-auto px-6 py-12" {
            div class="bg-white shadow rounded-lg p-8" { (inner) }
        }
    }
}

fn wide(inner: Markup) -> Markup {
    html! { div class="max-w-5xl mx-auto px-6 py-10" { (inner) } }
}

fn alerts(error: Option<&str>, notice: Option<&str>) -> Markup {
    html! {
        @if let Some(error) = error {
            p class="mt-4 rounded-md bg-red-50 px-4 py-3 text-sm text-red-700" { (error) }
        }
        @if let Some(notice) = notice {
            p class="mt-4 rounded-md bg-green-50 px-4 py-3 text-sm text-green-700" { (notice) }
        }
    }
}

fn card_grid(cards: impl Iterator<Item = Card>) -> Markup {
    html! {
        div class="mt-6 grid gap-6 grid-cols-2 md:grid-cols-3 lg:grid-cols-4" {
            @for card in cards {
                (movie_card(&card))
            }
        }
    }
}

fn movie_card(card: &Card) -> Markup {
    let inner = html! {
        (poster(card.image.as_deref(), &card.title))
        div class="p-4" {
            h3 class="font-semibold text-gray-900" {
                (card.title)
                @if let Some(year) = card.year {
                    span class="ml-1 font-normal text-gray-500" { "(" (year) ")" }
                }
            }
            div class="mt-2 flex flex-wrap gap-1" {
                @for genre in card.genres.iter().take(3) {
                    (genre_badge(genre))
                }
            }
            @if let Some(note) = &card.note {
                p class="mt-2 text-sm text-gray-600" { (note) }
            }
        }
    };

    html! {
        div class="bg-white shadow rounded-lg overflow-hidden" {
            @if let Some(href) = &card.href {
                a class="block hover:opacity-90" href=(href) { (inner) }
            } @else {
                (inner)
            }
        }
    }
}

fn poster(image: Option<&str>, title: &str) -> Markup {
    html! {
        @if let Some(src) = image {
            img class="w-full aspect-[2/3] object-cover" src=(src) alt=(title);
        } @else {
            div class="w-full aspect-[2/3] bg-gradient-to-br from-purple-200 to-cyan-200 flex items-center justify-center p-4 text-center font-semibold text-purple-900" {
                (title)
            }
        }
    }
}

fn genre_badge(genre: &str) -> Markup {
    html! { span class="rounded-full bg-purple-100 px-2 py-0.5 text-xs text-purple-800" { (genre) } }
}

fn shelf_button(action: &str, on: bool, add: &str, remove: &str, next: &str) -> Markup {
    html! {
        form method="post" action=(action) {
            input type="hidden" name="next" value=(next);
            @if on {
                input type="hidden" name="remove" value="1";
                button class="rounded-md border border-purple-600 px-4 py-2 font-semibold text-purple-700 hover:bg-purple-50" type="submit" { (remove) }
            } @else {
                button class=(BUTTON_CLASS) type="submit" { (add) }
            }
        }
    }
}

fn shelf_section(title: &str, empty: &str, cta: &str, shelf_path: &str, movies: &[MovieDto]) -> Markup {
    html! {
        section class="mt-10" {
            h2 class="text-2xl font-bold text-gray-900" { (title) }
            @if movies.is_empty() {
                div class="mt-4 bg-white shadow rounded-lg p-6" {
                    p class="text-gray-600" { (empty) }
                    a class="mt-3 inline-block text-purple-600 hover:text-purple-800" href="/movies" { (cta) }
                }
            } @else {
                div class="mt-4 grid gap-6 grid-cols-2 md:grid-cols-3 lg:grid-cols-4" {
                    @for movie in movies {
                        div {
                            (movie_card(&Card::from(movie)))
                            (shelf_button(
                                &format!("/movies/{}/{}", urlencoding::encode(&movie.id), shelf_path),
                                true,
                                "",
                                "Remove",
                                "/profile",
                            ))
                        }
                    }
                }
            }
        }
    }
}

fn stat(label: &str, value: usize) -> Markup {
    html! {
        div class="bg-white shadow rounded-lg p-4" {
            p class="text-sm text-gray-500" { (label) }
            p class="text-2xl font-bold text-gray-900" { (value) }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn movie() -> MovieDto {
        MovieDto {
            id: "tt0133093".into(),
            title: "The Matrix".into(),
            year: 1999,
            director: Some("Lana Wachowski, Lilly Wachowski".into()),
            plot: Some("A hacker learns <the truth>.".into()),
            poster_url: None,
            backdrop_url: None,
            rating: Some(8.7),
            runtime: Some(136),
            genres: vec!["Sci-Fi".into(), "Action".into()],
            cast: vec!["Keanu Reeves".into()],
            poster_base64: None,
        }
    }

    #[test]
    fn navbar_follows_the_session() {
        let anon = home_page(&PageContext::default(), &[]);
        assert!(anon.contains("href=\"/login\""));
        assert!(!anon.contains("href=\"/profile\""));

        let ctx = PageContext::new(Some(CurrentUser { id: "u1".into(), email: "neo@example.com".into(), name: Some("Neo".into()) }));
        let signed_in = home_page(&ctx, &[]);
        assert!(signed_in.contains("href=\"/profile\""));
        assert!(signed_in.contains("Neo"));
    }

    #[test]
    fn movie_page_escapes_text_and_offers_login() {
        let html = movie_page(&PageContext::default(), &movie(), None);
        assert!(html.contains("A hacker learns &lt;the truth&gt;."));
        assert!(html.contains("Log in to like or save this movie"));
        assert!(html.contains("8.7"));
    }

    #[test]
    fn shelf_buttons_reflect_membership() {
        let html = movie_page(&PageContext::default(), &movie(), Some((true, false)));
        assert!(html.contains("Unlike"));
        assert!(html.contains("Add to watchlist"));
        assert!(html.contains("action=\"/movies/tt0133093/like\""));
    }

    #[test]
    fn banner_only_when_model_is_down() {
        let mut view = RecommendationsView { model_running: true, ..Default::default() };
        assert!(!recommendations_page(&PageContext::default(), &view).contains("Ollama Not Running"));
        view.model_running = false;
        assert!(recommendations_page(&PageContext::default(), &view).contains("Ollama Not Running"));
    }
}
