use sea_orm::{
    ConnectionTrait, EntityTrait, QueryFilter, QueryOrder, QuerySelect,
    sea_query::{Condition, Expr, LikeExpr},
};
use serde::Serialize;

use crate::{
    entities::movie,
    error::{AppError, AppResult},
    genres::decode_names,
    posters::{self, PosterMovie},
    search::{clamp_limit, folded_contains, like_pattern, non_blank},
};

pub const DEFAULT_LIMIT: u64 = 8;

/// Which columns a free-text movie search looks at.
#[derive(Clone, Copy, Debug, Default, Eq, PartialEq)]
pub enum SearchType {
    /// Title, director, or a genre name (whole name, any case).
    #[default]
    All,
    Title,
}

impl SearchType {
    pub fn parse(raw: Option<&str>) -> Self {
        match raw.map(str::trim) {
            Some(s) if s.eq_ignore_ascii_case("title") => Self::Title,
            _ => Self::All,
        }
    }
}

/// A movie as returned to clients, whichever table it came from.
#[derive(Clone, Debug, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct MovieDto {
    pub id: String,
    pub title: String,
    pub year: i32,
    pub director: Option<String>,
    pub plot: Option<String>,
    pub poster_url: Option<String>,
    pub backdrop_url: Option<String>,
    pub rating: Option<f64>,
    pub runtime: Option<i32>,
    pub genres: Vec<String>,
    pub cast: Vec<String>,
    pub poster_base64: Option<String>,
}

impl MovieDto {
    /// Best image source for a card: embedded poster, then poster URL.
    pub fn image(&self) -> Option<&str> {
        self.poster_base64.as_deref().or(self.poster_url.as_deref())
    }
}

impl From<movie::Model> for MovieDto {
    fn from(m: movie::Model) -> Self {
        Self {
            genres: decode_names(&m.genres),
            cast: decode_names(&m.cast),
            id: m.id,
            title: m.title,
            year: m.year,
            director: m.director,
            plot: m.plot,
            poster_url: m.poster_url,
            backdrop_url: m.backdrop_url,
            rating: m.rating,
            runtime: m.runtime,
            poster_base64: None,
        }
    }
}

impl From<PosterMovie> for MovieDto {
    fn from(p: PosterMovie) -> Self {
        Self {
            id: p.id.to_string(),
            title: p.title,
            year: p.year.unwrap_or_default(),
            director: None,
            plot: p.plot,
            poster_url: None,
            backdrop_url: None,
            rating: None,
            runtime: p.runtime,
            genres: p.genres,
            cast: Vec::new(),
            poster_base64: p.poster_base64,
        }
    }
}

/// Movies ordered by rating, optionally narrowed by a free-text query.
pub async fn list_movies<C: ConnectionTrait>(
    db: &C,
    query: Option<&str>,
    search_type: SearchType,
    limit: u64,
) -> AppResult<Vec<movie::Model>> {
    let mut select = movie::Entity::find()
        .order_by_desc(movie::Column::Rating)
        .order_by_asc(movie::Column::Title);
    let q = non_blank(query);

    if let Some(q) = &q {
        // SQLite's LIKE ignores ASCII case only; other letters are widened to
        // `_` here and checked exactly below.
        let pattern = || LikeExpr::new(format!("%{}%", like_pattern(q))).escape('\\');

        let title = Expr::col(movie::Column::Title).like(pattern());
        let condition = match search_type {
            SearchType::Title => Condition::all().add(title),
            SearchType::All => Condition::any()
                .add(title)
                .add(Expr::col(movie::Column::Director).like(pattern()))
                .add(Expr::cust_with_values(
                    "EXISTS (SELECT 1 FROM json_each(CASE WHEN json_valid(movies.genres) THEN movies.genres ELSE '[]' END) \
                     WHERE json_each.value LIKE ? ESCAPE '\\')",
                    [like_pattern(q)],
                )),
        };
        select = select.filter(condition);
    }

    let limit = clamp_limit(limit);
    let movies = match q.as_deref().filter(|q| !q.is_ascii()) {
        Some(q) => select
            .all(db)
            .await?
            .into_iter()
            .filter(|m| matches_query(m, q, search_type))
            .take(limit as usize)
            .collect(),
        None => select.limit(limit).all(db).await?,
    };

    tracing::debug!(query = ?query, search_type = ?search_type, found = movies.len(), "listed movies");
    Ok(movies)
}

fn matches_query(movie: &movie::Model, q: &str, search_type: SearchType) -> bool {
    if folded_contains(&movie.title, q) {
        return true;
    }
    search_type == SearchType::All
        && (movie.director.as_deref().is_some_and(|d| folded_contains(d, q))
            || decode_names(&movie.genres).iter().any(|g| g.to_lowercase() == q.to_lowercase()))
}

/// A single movie by id. Falls back to the poster catalogue when the id is
/// a numeric poster row that has not been imported into `movies` yet.
pub async fn find_movie<C: ConnectionTrait>(db: &C, id: &str) -> AppResult<MovieDto> {
    let id = id.trim();
    if let Some(found) = movie::Entity::find_by_id(id.to_string()).one(db).await? {
        let mut dto = MovieDto::from(found);
        if let Ok(row_idx) = dto.id.parse::<i64>() {
            dto.poster_base64 = posters::images(db, &[row_idx]).await?.remove(&row_idx);
        }
        return Ok(dto);
    }

    if let Ok(row_idx) = id.parse::<i64>() {
        if let Some(poster) = posters::find(db, row_idx).await? {
            return Ok(poster.into());
        }
    }

    Err(AppError::not_found("Movie not found"))
}
