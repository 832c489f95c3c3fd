//! A user's liked movies and watchlist.
//!
//! Both shelves link a user to a row in `movies`. Linking a movie that only
//! exists in the poster catalogue first copies it into `movies`; the copy
//! and the link commit together or not at all.

use sea_orm::{
    ActiveValue::Set, ColumnTrait, ConnectionTrait, DatabaseConnection, EntityTrait, QueryFilter,
    QueryOrder, TransactionTrait, sea_query::OnConflict,
};
use serde::Deserialize;

use crate::{
    catalog::MovieDto,
    db::now_sec,
    entities::{liked_movie, movie, watchlist_movie},
    error::{AppError, AppResult},
    genres::encode_names,
    posters::{self, PosterMovie},
};

#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub enum Shelf {
    Liked,
    Watchlist,
}

impl Shelf {
    pub fn label(self) -> &'static str {
        match self {
            Shelf::Liked => "liked movies",
            Shelf::Watchlist => "watchlist",
        }
    }
}

/// Movie ids arrive as JSON strings from some clients and numbers from
/// others.
#[derive(Clone, Debug, Deserialize, PartialEq)]
#[serde(untagged)]
pub enum MovieRef {
    Text(String),
    Number(i64),
}

#[derive(Clone, Debug, Default, Deserialize)]
pub struct MovieIdRequest {
    #[serde(rename = "movieId")]
    pub movie_id: Option<MovieRef>,
}

impl MovieIdRequest {
    pub fn into_id(self) -> AppResult<String> {
        let id = match self.movie_id {
            Some(MovieRef::Text(s)) => s.trim().to_string(),
            Some(MovieRef::Number(n)) => n.to_string(),
            None => String::new(),
        };
        if id.is_empty() {
            return Err(AppError::bad_request("Movie ID is required"));
        }
        Ok(id)
    }
}

/// Links `movie_id` onto the user's shelf, creating the `movies` row from
/// the poster catalogue when needed. Linking twice is a no-op.
pub async fn add(
    db: &DatabaseConnection,
    user_id: &str,
    movie_id: &str,
    shelf: Shelf,
) -> AppResult<movie::Model> {
    let movie_id = movie_id.trim();
    if movie_id.is_empty() {
        return Err(AppError::bad_request("Movie ID is required"));
    }

    let txn = db.begin().await?;

    let existing = movie::Entity::find_by_id(movie_id.to_string()).one(&txn).await?;
    if existing.is_none() {
        let poster = match movie_id.parse::<i64>() {
            Ok(row_idx) => posters::find(&txn, row_idx).await?,
            Err(_) => None,
        };
        let Some(poster) = poster else {
            return Err(AppError::not_found("Movie not found in database"));
        };

        movie::Entity::insert(movie_from_poster(movie_id, poster))
            .on_conflict(OnConflict::column(movie::Column::Id).do_nothing().to_owned())
            .exec_without_returning(&txn)
            .await?;
        tracing::info!(movie_id, "copied poster row into movies");
    }

    let now = now_sec();
    match shelf {
        Shelf::Liked => {
            liked_movie::Entity::insert(liked_movie::ActiveModel {
                user_id: Set(user_id.to_string()),
                movie_id: Set(movie_id.to_string()),
                created_at: Set(now),
            })
            .on_conflict(
                OnConflict::columns([liked_movie::Column::UserId, liked_movie::Column::MovieId])
                    .do_nothing()
                    .to_owned(),
            )
            .exec_without_returning(&txn)
            .await?;
        },
        Shelf::Watchlist => {
            watchlist_movie::Entity::insert(watchlist_movie::ActiveModel {
                user_id: Set(user_id.to_string()),
                movie_id: Set(movie_id.to_string()),
                created_at: Set(now),
            })
            .on_conflict(
                OnConflict::columns([
                    watchlist_movie::Column::UserId,
                    watchlist_movie::Column::MovieId,
                ])
                .do_nothing()
                .to_owned(),
            )
            .exec_without_returning(&txn)
            .await?;
        },
    }

    let linked = match existing {
        Some(found) => found,
        None => movie::Entity::find_by_id(movie_id.to_string())
            .one(&txn)
            .await?
            .ok_or_else(|| AppError::not_found("Movie not found in database"))?,
    };

    txn.commit().await?;
    tracing::debug!(user_id, movie_id, shelf = shelf.label(), "linked movie");
    Ok(linked)
}

/// Unlinks a movie. Returns whether a link existed.
pub async fn remove<C: ConnectionTrait>(db: &C, user_id: &str, movie_id: &str, shelf: Shelf) -> AppResult<bool> {
    let movie_id = movie_id.trim();
    if movie_id.is_empty() {
        return Err(AppError::bad_request("Movie ID is required"));
    }

    let res = match shelf {
        Shelf::Liked => {
            liked_movie::Entity::delete_many()
                .filter(liked_movie::Column::UserId.eq(user_id))
                .filter(liked_movie::Column::MovieId.eq(movie_id))
                .exec(db)
                .await?
        },
        Shelf::Watchlist => {
            watchlist_movie::Entity::delete_many()
                .filter(watchlist_movie::Column::UserId.eq(user_id))
                .filter(watchlist_movie::Column::MovieId.eq(movie_id))
                .exec(db)
                .await?
        },
    };

    tracing::debug!(user_id, movie_id, shelf = shelf.label(), removed = res.rows_affected, "unlinked movie");
    Ok(res.rows_affected > 0)
}

/// Movies on a shelf, most recently added first, with poster images filled
/// in where the catalogue has one.
pub async fn list<C: ConnectionTrait>(db: &C, user_id: &str, shelf: Shelf) -> AppResult<Vec<MovieDto>> {
    let rows = match shelf {
        Shelf::Liked => {
            movie::Entity::find()
                .inner_join(liked_movie::Entity)
                .filter(liked_movie::Column::UserId.eq(user_id))
                .order_by_desc(liked_movie::Column::CreatedAt)
                .all(db)
                .await?
        },
        Shelf::Watchlist => {
            movie::Entity::find()
                .inner_join(watchlist_movie::Entity)
                .filter(watchlist_movie::Column::UserId.eq(user_id))
                .order_by_desc(watchlist_movie::Column::CreatedAt)
                .all(db)
                .await?
        },
    };

    let mut movies: Vec<MovieDto> = rows.into_iter().map(MovieDto::from).collect();
    let row_ids: Vec<i64> = movies.iter().filter_map(|m| m.id.parse().ok()).collect();
    let mut images = posters::images(db, &row_ids).await?;
    for m in &mut movies {
        if let Ok(row_idx) = m.id.parse::<i64>() {
            m.poster_base64 = images.remove(&row_idx);
        }
    }
    Ok(movies)
}

/// Whether each shelf holds the movie, for toggles on the detail page.
pub async fn status<C: ConnectionTrait>(db: &C, user_id: &str, movie_id: &str) -> AppResult<(bool, bool)> {
    let liked = liked_movie::Entity::find_by_id((user_id.to_string(), movie_id.to_string()))
        .one(db)
        .await?
        .is_some();
    let watchlisted = watchlist_movie::Entity::find_by_id((user_id.to_string(), movie_id.to_string()))
        .one(db)
        .await?
        .is_some();
    Ok((liked, watchlisted))
}

fn movie_from_poster(id: &str, poster: PosterMovie) -> movie::ActiveModel {
    let now = now_sec();
    movie::ActiveModel {
        id: Set(id.to_string()),
        title: Set(poster.title),
        year: Set(poster.year.unwrap_or(0)),
        director: Set(None),
        plot: Set(poster.plot),
        poster_url: Set(None),
        backdrop_url: Set(None),
        rating: Set(None),
        runtime: Set(poster.runtime),
        genres: Set(encode_names(&poster.genres)),
        cast: Set("[]".to_string()),
        created_at: Set(now),
        updated_at: Set(now),
    }
}
