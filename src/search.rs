use sea_orm::{DbBackend, Statement, Value};
use serde::Deserialize;

use crate::error::{AppError, AppResult};

pub const DEFAULT_LIMIT: u64 = 12;
pub const MAX_LIMIT: u64 = 100;

pub(crate) const POSTER_COLUMNS: &str = "SELECT row_idx AS id, id_tmdb, title, \
     CASE WHEN release_date GLOB '[0-9][0-9][0-9][0-9]*' \
          THEN CAST(substr(release_date, 1, 4) AS INTEGER) END AS year, \
     overview AS plot, poster_jpeg, runtime_min AS runtime, genres FROM movie_posters";

// Leading four digits of `release_date` ('1999', '1999-03', '1999-03-31 ...').
const YEAR_EXPR: &str = "CASE WHEN release_date GLOB '[0-9][0-9][0-9][0-9]*' \
     THEN CAST(substr(release_date, 1, 4) AS INTEGER) END";

const CANDIDATE_COLUMNS: &str = "SELECT row_idx AS id, title FROM movie_posters";

// Normalizes the three stored genre shapes to a JSON array (or '[]') so the
// containment check never trips over malformed rows.
const GENRE_ARRAY_EXPR: &str = "CASE \
     WHEN genres IS NULL OR NOT json_valid(genres) THEN '[]' \
     WHEN json_type(genres) = 'array' THEN genres \
     WHEN json_type(genres) = 'text' THEN \
         CASE WHEN NOT json_valid(json_extract(genres, '$')) THEN '[]' \
              WHEN json_type(json_extract(genres, '$')) = 'array' THEN json_extract(genres, '$') \
              ELSE '[]' END \
     ELSE '[]' END";

/// Query string accepted by `GET /api/movie-posters`.
#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PosterParams {
    pub query: Option<String>,
    pub genres: Option<String>,
    pub min_year: Option<String>,
    pub max_year: Option<String>,
    pub limit: Option<String>,
}

/// Conjunctive filter over the poster catalogue. Absent fields impose no
/// constraint; a filter with none set selects a random sample.
#[derive(Clone, Debug, PartialEq)]
pub struct PosterFilter {
    pub title: Option<String>,
    pub genres: Vec<String>,
    pub min_year: Option<i32>,
    pub max_year: Option<i32>,
    pub limit: u64,
}

impl Default for PosterFilter {
    fn default() -> Self {
        Self { title: None, genres: Vec::new(), min_year: None, max_year: None, limit: DEFAULT_LIMIT }
    }
}

impl PosterFilter {
    pub fn title(query: &str, limit: u64) -> Self {
        Self { title: non_blank(Some(query)), limit: clamp_limit(limit), ..Self::default() }
    }

    pub fn from_params(params: &PosterParams) -> AppResult<Self> {
        let limit = match non_blank(params.limit.as_deref()) {
            Some(raw) => raw
                .parse::<u64>()
                .map_err(|_| AppError::bad_request(format!("limit must be a positive integer, got '{raw}'")))?,
            None => DEFAULT_LIMIT,
        };

        let min_year = parse_year("minYear", params.min_year.as_deref())?;
        let max_year = parse_year("maxYear", params.max_year.as_deref())?;
        if let (Some(min), Some(max)) = (min_year, max_year) {
            if min > max {
                return Err(AppError::bad_request(format!(
                    "minYear ({min}) must not be greater than maxYear ({max})"
                )));
            }
        }

        let genres = params
            .genres
            .as_deref()
            .map(|s| {
                s.split(',')
                    .map(str::trim)
                    .filter(|g| !g.is_empty())
                    .map(str::to_string)
                    .collect::<Vec<_>>()
            })
            .unwrap_or_default();

        Ok(Self {
            title: non_blank(params.query.as_deref()),
            genres,
            min_year,
            max_year,
            limit: clamp_limit(limit),
        })
    }

    pub fn is_unfiltered(&self) -> bool {
        self.title.is_none() && self.genres.is_empty() && self.min_year.is_none() && self.max_year.is_none()
    }

    /// SQLite only folds ASCII case, so a title with other letters is
    /// matched loosely in SQL and checked with [`Self::title_matches`].
    pub fn needs_title_check(&self) -> bool {
        self.title.as_deref().is_some_and(|t| !t.is_ascii())
    }

    pub fn title_matches(&self, candidate: &str) -> bool {
        self.title.as_deref().is_none_or(|t| folded_contains(candidate, t))
    }

    pub fn to_statement(&self, backend: DbBackend) -> Statement {
        let mut sql = String::from(POSTER_COLUMNS);
        let mut values: Vec<Value> = Vec::new();

        if self.is_unfiltered() {
            sql.push_str(" ORDER BY RANDOM() LIMIT ?");
            values.push((self.limit as i64).into());
            return Statement::from_sql_and_values(backend, sql, values);
        }

        self.push_conditions(&mut sql, &mut values);
        sql.push_str(" LIMIT ?");
        values.push((self.limit as i64).into());

        Statement::from_sql_and_values(backend, sql, values)
    }

    /// Ids and titles of every row passing the SQL filters, without a limit.
    pub fn to_candidate_statement(&self, backend: DbBackend) -> Statement {
        let mut sql = String::from(CANDIDATE_COLUMNS);
        let mut values: Vec<Value> = Vec::new();
        self.push_conditions(&mut sql, &mut values);
        Statement::from_sql_and_values(backend, sql, values)
    }

    fn push_conditions(&self, sql: &mut String, values: &mut Vec<Value>) {
        sql.push_str(" WHERE 1=1");

        if let Some(title) = &self.title {
            sql.push_str(" AND title LIKE ? ESCAPE '\\'");
            values.push(format!("%{}%", like_pattern(title)).into());
        }

        for genre in &self.genres {
            sql.push_str(&format!(
                " AND EXISTS (SELECT 1 FROM json_each({GENRE_ARRAY_EXPR}) AS g \
                 WHERE CASE g.type WHEN 'object' THEN json_extract(g.value, '$.name') \
                 WHEN 'text' THEN g.value END = ?)"
            ));
            values.push(genre.clone().into());
        }

        if let Some(min) = self.min_year {
            sql.push_str(&format!(" AND {YEAR_EXPR} >= ?"));
            values.push(min.into());
        }

        if let Some(max) = self.max_year {
            sql.push_str(&format!(" AND {YEAR_EXPR} <= ?"));
            values.push(max.into());
        }
    }
}

fn parse_year(name: &str, raw: Option<&str>) -> AppResult<Option<i32>> {
    non_blank(raw)
        .map(|s| {
            s.parse::<i32>()
                .map_err(|_| AppError::bad_request(format!("{name} must be a year, got '{s}'")))
        })
        .transpose()
}

pub(crate) fn non_blank(raw: Option<&str>) -> Option<String> {
    raw.map(str::trim).filter(|s| !s.is_empty()).map(str::to_string)
}

pub(crate) fn clamp_limit(limit: u64) -> u64 {
    limit.clamp(1, MAX_LIMIT)
}

pub(crate) fn escape_like(s: &str) -> String {
    let mut out = String::with_capacity(s.len());
    for c in s.chars() {
        if matches!(c, '%' | '_' | '\\') {
            out.push('\\');
        }
        out.push(c);
    }
    out
}

/// `escape_like`, with every non-ASCII character widened to `_` so that
/// SQLite's ASCII-only `LIKE` still finds differently cased letters.
pub(crate) fn like_pattern(s: &str) -> String {
    escape_like(s).chars().map(|c| if c.is_ascii() { c } else { '_' }).collect()
}

pub(crate) fn folded_contains(haystack: &str, needle: &str) -> bool {
    haystack.to_lowercase().contains(&needle.to_lowercase())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn params(query: &str, genres: &str, min: &str, max: &str, limit: &str) -> PosterParams {
        let opt = |s: &str| (!s.is_empty()).then(|| s.to_string());
        PosterParams {
            query: opt(query),
            genres: opt(genres),
            min_year: opt(min),
            max_year: opt(max),
            limit: opt(limit),
        }
    }

    #[test]
    fn no_filters_is_a_random_sample() {
        let filter = PosterFilter::from_params(&PosterParams::default()).unwrap();
        assert!(filter.is_unfiltered());
        assert_eq!(filter.limit, DEFAULT_LIMIT);

        let stmt = filter.to_statement(DbBackend::Sqlite);
        assert!(stmt.sql.contains("ORDER BY RANDOM()"));
        assert!(!stmt.sql.contains("WHERE"));
        assert_eq!(stmt.values.unwrap().0, vec![Value::from(12i64)]);
    }

    #[test]
    fn genres_are_split_trimmed_and_each_bound() {
        let filter = PosterFilter::from_params(&params("", " Drama, ,Crime ", "", "", "")).unwrap();
        assert_eq!(filter.genres, vec!["Drama", "Crime"]);

        let stmt = filter.to_statement(DbBackend::Sqlite);
        assert_eq!(stmt.sql.matches("json_each(").count(), 2);
        assert!(!stmt.sql.contains("RANDOM()"));
        let values = stmt.values.unwrap().0;
        assert_eq!(values[0], Value::from("Drama"));
        assert_eq!(values[1], Value::from("Crime"));
    }

    #[test]
    fn title_and_year_range_bind_in_order() {
        let filter = PosterFilter::from_params(&params("Matrix", "", "1990", "2005", "5")).unwrap();
        let stmt = filter.to_statement(DbBackend::Sqlite);
        let values = stmt.values.unwrap().0;
        assert_eq!(
            values,
            vec![
                Value::from("%Matrix%"),
                Value::from(1990i32),
                Value::from(2005i32),
                Value::from(5i64),
            ]
        );
        assert!(stmt.sql.contains(">= ?"));
        assert!(stmt.sql.contains("<= ?"));
    }

    #[test]
    fn like_wildcards_in_titles_are_escaped() {
        let filter = PosterFilter::title("100%_real", 3);
        let values = filter.to_statement(DbBackend::Sqlite).values.unwrap().0;
        assert_eq!(values[0], Value::from("%100\\%\\_real%"));
    }

    #[test]
    fn non_ascii_titles_match_loosely_then_exactly() {
        let filter = PosterFilter::title("AMÉLIE", 3);
        assert!(filter.needs_title_check());
        assert!(!PosterFilter::title("Amelie", 3).needs_title_check());

        let stmt = filter.to_candidate_statement(DbBackend::Sqlite);
        assert!(!stmt.sql.contains("LIMIT"));
        assert_eq!(stmt.values.unwrap().0, vec![Value::from("%AM_LIE%")]);

        assert!(filter.title_matches("Le Fabuleux Destin d'Amélie Poulain"));
        assert!(!filter.title_matches("Amalie"));
    }

    #[test]
    fn year_comes_from_leading_digits() {
        let stmt = PosterFilter::from_params(&params("", "", "1999", "", "")).unwrap().to_statement(DbBackend::Sqlite);
        assert!(stmt.sql.contains("substr(release_date, 1, 4)"));
        assert!(!stmt.sql.contains("strftime"));
    }

    #[test]
    fn blank_params_count_as_absent() {
        let filter = PosterFilter::from_params(&params("   ", " , ", " ", "", "")).unwrap();
        assert!(filter.is_unfiltered());
    }

    #[test]
    fn limit_is_clamped() {
        assert_eq!(PosterFilter::from_params(&params("", "", "", "", "0")).unwrap().limit, 1);
        assert_eq!(PosterFilter::from_params(&params("", "", "", "", "5000")).unwrap().limit, MAX_LIMIT);
    }

    #[test]
    fn bad_numbers_are_rejected() {
        for p in [
            params("", "", "", "", "ten"),
            params("", "", "nineteen", "", ""),
            params("", "", "", "20x0", ""),
            params("", "", "2010", "2000", ""),
        ] {
            let err = PosterFilter::from_params(&p).unwrap_err();
            assert!(matches!(err, AppError::BadRequest(_)), "{err:?}");
        }
    }
}
