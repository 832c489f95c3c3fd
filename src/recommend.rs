use sea_orm::ConnectionTrait;
use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::{
    error::{AppError, AppResult, UpstreamContext},
    inference::{GenerateOptions, InferenceClient, strip_json_fences},
    posters,
    search::{PosterFilter, non_blank},
};

pub const RECOMMENDATION_COUNT: usize = 6;

pub const CHAT_SYSTEM_PROMPT: &str = "You are a movie expert. You can only talk about films, directors, \
     actors, film genres, movie recommendations, and general cinema knowledge. You must not respond to \
     questions unrelated to these topics. Try to help users as much as possible and offer personalized \
     recommendations based on the user's movie preferences. Please respond only in English.";

const RECOMMENDER_SYSTEM_PROMPT: &str = "You are a knowledgeable film expert with deep understanding of \
     cinema across all genres, eras, and countries. Provide thoughtful, personalized movie recommendations \
     based on user preferences.";

/// Shown in place of a reply when the model cannot be reached.
pub const CHAT_FALLBACK: &str =
    "Sorry, something went wrong. Make sure your Ollama model is running and try again.";

#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct Recommendation {
    pub id: String,
    pub title: String,
    pub year: Option<i32>,
    pub poster: Option<String>,
    pub genres: Vec<String>,
    pub reason: String,
}

#[derive(Clone, Copy, Debug, Eq, PartialEq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum RecommendationSource {
    /// Titles found in the poster catalogue.
    Catalog,
    Model,
    /// Built-in picks used when both of the above come up empty.
    Fallback,
}

/// Title search first; when nothing matches, ask the model; when that
/// fails, hand back the built-in picks.
pub async fn recommend<C: ConnectionTrait>(
    db: &C,
    inference: &InferenceClient,
    query: &str,
) -> AppResult<(Vec<Recommendation>, RecommendationSource)> {
    let Some(query) = non_blank(Some(query)) else {
        return Err(AppError::bad_request("Query is required"));
    };

    match posters::search(db, &PosterFilter::title(&query, RECOMMENDATION_COUNT as u64)).await {
        Ok(hits) if !hits.is_empty() => {
            let reason = format!("Movie title matches \"{query}\"");
            let recs = hits
                .into_iter()
                .map(|p| Recommendation {
                    id: p.id.to_string(),
                    title: p.title,
                    year: p.year,
                    poster: p.poster_base64,
                    genres: p.genres,
                    reason: reason.clone(),
                })
                .collect();
            return Ok((recs, RecommendationSource::Catalog));
        },
        Ok(_) => {},
        Err(err) => tracing::warn!(error = %err, "catalogue search failed, asking the model"),
    }

    match ask_model(inference, &query).await {
        Ok(recs) if !recs.is_empty() => Ok((recs, RecommendationSource::Model)),
        Ok(_) => {
            tracing::warn!(query = %query, "model returned no recommendations");
            Ok((fallback_picks(), RecommendationSource::Fallback))
        },
        Err(err) => {
            tracing::warn!(error = %err, query = %query, "model recommendations failed");
            Ok((fallback_picks(), RecommendationSource::Fallback))
        },
    }
}

async fn ask_model(inference: &InferenceClient, query: &str) -> anyhow::Result<Vec<Recommendation>> {
    let prompt = format!(
        "Based on the user's query: \"{query}\", provide {RECOMMENDATION_COUNT} movie recommendations.\n\
         Return the response as a valid JSON array of movie objects with the following structure:\n\
         [\n  {{\n    \"id\": number,\n    \"title\": string,\n    \"year\": number,\n    \
         \"poster\": string,\n    \"genres\": string[],\n    \
         \"reason\": string (brief explanation of why this movie is recommended based on the query)\n  }}\n]\n\
         Respond with the JSON array only."
    );

    let text = inference
        .generate(&prompt, GenerateOptions { system: Some(RECOMMENDER_SYSTEM_PROMPT), ..Default::default() })
        .await?;
    parse_recommendations(&text)
}

#[derive(Debug, Deserialize)]
struct ModelPick {
    #[serde(default)]
    id: Option<Value>,
    title: String,
    #[serde(default)]
    year: Option<i32>,
    #[serde(default)]
    poster: Option<String>,
    #[serde(default)]
    genres: Vec<String>,
    #[serde(default)]
    reason: String,
}

/// Parses the model's JSON array, tolerating a code fence around it.
pub fn parse_recommendations(text: &str) -> anyhow::Result<Vec<Recommendation>> {
    let picks: Vec<ModelPick> = serde_json::from_str(strip_json_fences(text))?;
    Ok(picks
        .into_iter()
        .filter(|p| !p.title.trim().is_empty())
        .take(RECOMMENDATION_COUNT)
        .enumerate()
        .map(|(i, p)| Recommendation {
            id: match p.id {
                Some(Value::String(s)) if !s.trim().is_empty() => s,
                Some(Value::Number(n)) => n.to_string(),
                _ => format!("ai-{}", i + 1),
            },
            title: p.title.trim().to_string(),
            year: p.year,
            poster: p.poster.filter(|s| s.starts_with("http") || s.starts_with("data:")),
            genres: p.genres,
            reason: p.reason,
        })
        .collect())
}

pub fn fallback_picks() -> Vec<Recommendation> {
    let pick = |id: &str, title: &str, year, genres: &[&str], reason: &str| Recommendation {
        id: id.to_string(),
        title: title.to_string(),
        year: Some(year),
        poster: None,
        genres: genres.iter().map(|g| g.to_string()).collect(),
        reason: reason.to_string(),
    };

    vec![
        pick("1", "Inception", 2010, &["Sci-Fi", "Action", "Thriller"], "Mind-bending sci-fi with complex narrative structure"),
        pick("2", "The Matrix", 1999, &["Sci-Fi", "Action"], "Revolutionary sci-fi with philosophical themes"),
        pick("3", "Interstellar", 2014, &["Sci-Fi", "Drama", "Adventure"], "Epic space journey with emotional depth"),
        pick("4", "Arrival", 2016, &["Sci-Fi", "Drama", "Mystery"], "Thoughtful first-contact story about language and time"),
        pick("5", "Blade Runner 2049", 2017, &["Sci-Fi", "Drama", "Thriller"], "Atmospheric sequel that asks what makes us human"),
        pick("6", "The Shawshank Redemption", 1994, &["Drama"], "Enduring story of hope and friendship"),
    ]
}

/// One turn with the movie assistant. Returns the reply and the model that
/// produced it.
pub async fn chat(
    inference: &InferenceClient,
    message: &str,
    model: Option<&str>,
) -> AppResult<(String, String)> {
    let Some(message) = non_blank(Some(message)) else {
        return Err(AppError::bad_request("Message is required"));
    };
    let model = model.map(str::trim).filter(|m| !m.is_empty()).unwrap_or(inference.default_model());

    let reply = inference
        .generate(&message, GenerateOptions { model: Some(model), system: Some(CHAT_SYSTEM_PROMPT), ..Default::default() })
        .await
        .upstream(CHAT_FALLBACK)?;

    Ok((reply.trim().to_string(), model.to_string()))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_fenced_model_output() {
        let text = "```json\n[{\"id\": 27205, \"title\": \"Inception\", \"year\": 2010, \
                    \"poster\": \"/placeholder.svg\", \"genres\": [\"Sci-Fi\"], \"reason\": \"Dreams\"}]\n```";
        let recs = parse_recommendations(text).unwrap();
        assert_eq!(recs.len(), 1);
        assert_eq!(recs[0].id, "27205");
        assert_eq!(recs[0].year, Some(2010));
        assert_eq!(recs[0].poster, None);
        assert_eq!(recs[0].reason, "Dreams");
    }

    #[test]
    fn missing_ids_get_positional_ones_and_output_is_capped() {
        let items: Vec<String> = (0..9).map(|i| format!("{{\"title\": \"Film {i}\"}}")).collect();
        let recs = parse_recommendations(&format!("[{}]", items.join(","))).unwrap();
        assert_eq!(recs.len(), RECOMMENDATION_COUNT);
        assert_eq!(recs[0].id, "ai-1");
        assert!(recs[0].genres.is_empty());
    }

    #[test]
    fn prose_is_not_recommendations() {
        assert!(parse_recommendations("Sure! Here are some films you might like.").is_err());
    }

    #[test]
    fn fallback_has_a_full_set() {
        let picks = fallback_picks();
        assert_eq!(picks.len(), RECOMMENDATION_COUNT);
        assert!(picks.iter().all(|p| !p.reason.is_empty()));
    }

    #[test]
    fn source_serializes_lowercase() {
        assert_eq!(serde_json::to_value(RecommendationSource::Catalog).unwrap(), "catalog");
        assert_eq!(serde_json::to_value(RecommendationSource::Fallback).unwrap(), "fallback");
    }
}
