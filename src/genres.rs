//! Genre lists as stored in the poster catalogue.
//!
//! The `genres` column has been written by several import scripts over time
//! and comes back in one of three shapes:
//!
//! 1. a JSON array of tagged objects: `[{"id":18,"name":"Drama"}]`
//! 2. a JSON string whose content is shape 1 (double encoded)
//! 3. anything else: NULL, empty, malformed, or a non-array value
//!
//! Shapes 1 and 2 yield the names in stored order. Shape 3 yields the single
//! placeholder genre so cards always have something to show.

use serde_json::Value;

/// Placeholder used when the stored list cannot be read.
pub const FALLBACK_GENRE: &str = "Drama";

/// Name used for an entry that carries no `name`.
pub const UNNAMED_GENRE: &str = "Unknown";

pub fn parse_genres(raw: Option<&str>) -> Vec<String> {
    let Some(raw) = raw.map(str::trim).filter(|s| !s.is_empty()) else {
        return fallback();
    };

    let value = match serde_json::from_str::<Value>(raw) {
        Ok(Value::String(inner)) => match serde_json::from_str::<Value>(&inner) {
            Ok(value) => value,
            Err(err) => {
                tracing::debug!(error = %err, "double-encoded genres did not parse");
                return fallback();
            },
        },
        Ok(value) => value,
        Err(err) => {
            tracing::debug!(error = %err, "genres column is not JSON");
            return fallback();
        },
    };

    genres_from_value(&value).unwrap_or_else(fallback)
}

/// Names from an already-decoded genre array. `None` when the value is not
/// an array.
pub fn genres_from_value(value: &Value) -> Option<Vec<String>> {
    let items = value.as_array()?;
    Some(
        items
            .iter()
            .map(|item| match item {
                Value::String(name) => name.clone(),
                Value::Object(obj) => obj
                    .get("name")
                    .and_then(Value::as_str)
                    .filter(|s| !s.is_empty())
                    .unwrap_or(UNNAMED_GENRE)
                    .to_string(),
                _ => UNNAMED_GENRE.to_string(),
            })
            .collect(),
    )
}

/// Encodes names the way the `movies.genres` column stores them.
pub fn encode_names(names: &[String]) -> String {
    serde_json::to_string(names).unwrap_or_else(|_| "[]".to_string())
}

/// Decodes the `movies.genres` / `movies.cast` columns, which are plain
/// string arrays. Unreadable values decode to an empty list.
pub fn decode_names(raw: &str) -> Vec<String> {
    serde_json::from_str(raw).unwrap_or_default()
}

fn fallback() -> Vec<String> {
    vec![FALLBACK_GENRE.to_string()]
}
