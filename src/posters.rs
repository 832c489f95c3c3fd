use std::collections::HashMap;

use base64::{Engine as _, engine::general_purpose::STANDARD};
use sea_orm::{ConnectionTrait, FromQueryResult, Statement, Value};
use serde::Serialize;

use crate::{
    error::AppResult,
    genres::parse_genres,
    search::{POSTER_COLUMNS, PosterFilter},
};

#[derive(Debug, FromQueryResult)]
struct PosterRow {
    id: i64,
    id_tmdb: Option<i64>,
    title: String,
    year: Option<i32>,
    plot: Option<String>,
    poster_jpeg: Option<Vec<u8>>,
    runtime: Option<i32>,
    genres: Option<String>,
}

/// A poster-catalogue row reshaped for clients.
#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct PosterMovie {
    pub id: i64,
    pub id_tmdb: Option<i64>,
    pub title: String,
    pub year: Option<i32>,
    pub plot: Option<String>,
    pub runtime: Option<i32>,
    #[serde(rename = "posterBase64")]
    pub poster_base64: Option<String>,
    pub genres: Vec<String>,
}

impl From<PosterRow> for PosterMovie {
    fn from(row: PosterRow) -> Self {
        Self {
            id: row.id,
            id_tmdb: row.id_tmdb,
            title: row.title,
            year: row.year,
            plot: row.plot,
            runtime: row.runtime,
            poster_base64: row.poster_jpeg.as_deref().and_then(jpeg_data_uri),
            genres: parse_genres(row.genres.as_deref()),
        }
    }
}

pub fn jpeg_data_uri(bytes: &[u8]) -> Option<String> {
    (!bytes.is_empty()).then(|| format!("data:image/jpeg;base64,{}", STANDARD.encode(bytes)))
}

#[derive(Debug, FromQueryResult)]
struct CandidateRow {
    id: i64,
    title: String,
}

pub async fn search<C: ConnectionTrait>(db: &C, filter: &PosterFilter) -> AppResult<Vec<PosterMovie>> {
    let backend = db.get_database_backend();
    let rows = if filter.needs_title_check() {
        let candidates = CandidateRow::find_by_statement(filter.to_candidate_statement(backend)).all(db).await?;
        let ids: Vec<i64> = candidates
            .into_iter()
            .filter(|c| filter.title_matches(&c.title))
            .map(|c| c.id)
            .take(filter.limit as usize)
            .collect();
        by_ids(db, &ids).await?
    } else {
        PosterRow::find_by_statement(filter.to_statement(backend)).all(db).await?
    };
    tracing::debug!(
        title = ?filter.title,
        genres = ?filter.genres,
        min_year = ?filter.min_year,
        max_year = ?filter.max_year,
        rows = rows.len(),
        "poster search"
    );
    Ok(rows.into_iter().map(PosterMovie::from).collect())
}

pub async fn find<C: ConnectionTrait>(db: &C, row_idx: i64) -> AppResult<Option<PosterMovie>> {
    let stmt = Statement::from_sql_and_values(
        db.get_database_backend(),
        format!("{POSTER_COLUMNS} WHERE row_idx = ? LIMIT 1"),
        [Value::from(row_idx)],
    );
    let row = PosterRow::find_by_statement(stmt).one(db).await?;
    Ok(row.map(PosterMovie::from))
}

async fn by_ids<C: ConnectionTrait>(db: &C, ids: &[i64]) -> AppResult<Vec<PosterRow>> {
    if ids.is_empty() {
        return Ok(Vec::new());
    }

    let placeholders = vec!["?"; ids.len()].join(", ");
    let stmt = Statement::from_sql_and_values(
        db.get_database_backend(),
        format!("{POSTER_COLUMNS} WHERE row_idx IN ({placeholders})"),
        ids.iter().map(|id| Value::from(*id)),
    );
    Ok(PosterRow::find_by_statement(stmt).all(db).await?)
}

#[derive(Debug, FromQueryResult)]
struct ImageRow {
    id: i64,
    poster_jpeg: Option<Vec<u8>>,
}

/// Data URIs for the given poster rows, keyed by `row_idx`. Rows without an
/// image are left out.
pub async fn images<C: ConnectionTrait>(db: &C, ids: &[i64]) -> AppResult<HashMap<i64, String>> {
    if ids.is_empty() {
        return Ok(HashMap::new());
    }

    let placeholders = vec!["?"; ids.len()].join(", ");
    let stmt = Statement::from_sql_and_values(
        db.get_database_backend(),
        format!("SELECT row_idx AS id, poster_jpeg FROM movie_posters WHERE row_idx IN ({placeholders})"),
        ids.iter().map(|id| Value::from(*id)),
    );

    let rows = ImageRow::find_by_statement(stmt).all(db).await?;
    Ok(rows
        .into_iter()
        .filter_map(|row| row.poster_jpeg.as_deref().and_then(jpeg_data_uri).map(|uri| (row.id, uri)))
        .collect())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn jpeg_bytes_become_a_data_uri() {
        assert_eq!(jpeg_data_uri(&[0xff, 0xd8, 0xff]).as_deref(), Some("data:image/jpeg;base64,/9j/"));
        assert_eq!(jpeg_data_uri(&[]), None);
    }

    #[test]
    fn rows_are_reshaped_for_clients() {
        let row = PosterRow {
            id: 7,
            id_tmdb: Some(603),
            title: "The Matrix".to_string(),
            year: Some(1999),
            plot: None,
            poster_jpeg: None,
            runtime: Some(136),
            genres: Some(r#"[{"id":28,"name":"Action"}]"#.to_string()),
        };
        let movie = PosterMovie::from(row);
        assert_eq!(movie.genres, vec!["Action"]);
        assert_eq!(movie.poster_base64, None);

        let json = serde_json::to_value(&movie).unwrap();
        assert_eq!(json["posterBase64"], serde_json::Value::Null);
        assert_eq!(json["id_tmdb"], 603);
    }
}
