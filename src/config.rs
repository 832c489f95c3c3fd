use std::net::SocketAddr;

use anyhow::Context;

#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub enum InferenceBackend {
    /// Locally running Ollama server.
    Ollama,
    /// Hosted OpenAI-compatible chat completions API.
    OpenAi,
}

impl std::str::FromStr for InferenceBackend {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "ollama" => Ok(Self::Ollama),
            "openai" => Ok(Self::OpenAi),
            other => anyhow::bail!("unknown inference backend '{other}' (expected ollama or openai)"),
        }
    }
}

#[derive(Clone, Debug)]
pub struct Config {
    pub addr: SocketAddr,
    pub database_url: String,
    pub inference_backend: InferenceBackend,
    pub ollama_host: String,
    pub ollama_model: String,
    pub openai_base_url: String,
    pub openai_api_key: String,
    pub openai_model: String,
    pub inference_timeout_secs: u64,
    pub session_ttl_days: i64,
    pub secure_cookies: bool,
    pub bcrypt_cost: u32,
}

impl Config {
    pub fn from_env() -> anyhow::Result<Self> {
        dotenvy::dotenv().ok();

        let host = std::env::var("HOST").unwrap_or_else(|_| "0.0.0.0".to_string());
        let port: u16 =
            std::env::var("PORT").unwrap_or_else(|_| "3000".to_string()).parse().context("PORT")?;

        let database_url = std::env::var("DATABASE_URL")
            .unwrap_or_else(|_| "sqlite://cinematch.db?mode=rwc".to_string());

        let inference_backend = std::env::var("INFERENCE_BACKEND")
            .unwrap_or_else(|_| "ollama".to_string())
            .parse()
            .context("INFERENCE_BACKEND")?;

        let ollama_host = std::env::var("OLLAMA_HOST")
            .unwrap_or_else(|_| "http://localhost:11434".to_string());
        let ollama_model = std::env::var("OLLAMA_MODEL").unwrap_or_else(|_| "llama3".to_string());

        let openai_base_url = std::env::var("OPENAI_BASE_URL")
            .unwrap_or_else(|_| "https://api.openai.com/v1".to_string());
        let openai_api_key = std::env::var("OPENAI_API_KEY").unwrap_or_default();
        let openai_model = std::env::var("OPENAI_MODEL").unwrap_or_else(|_| "gpt-4o".to_string());

        let inference_timeout_secs: u64 = std::env::var("INFERENCE_TIMEOUT_SECS")
            .ok()
            .and_then(|s| s.parse().ok())
            .unwrap_or(120);

        let session_ttl_days: i64 =
            std::env::var("SESSION_TTL_DAYS").ok().and_then(|s| s.parse().ok()).unwrap_or(30);

        let secure_cookies = std::env::var("SECURE_COOKIES")
            .map(|s| matches!(s.trim(), "1" | "true" | "yes"))
            .unwrap_or(false);

        let bcrypt_cost: u32 = std::env::var("BCRYPT_COST")
            .ok()
            .and_then(|s| s.parse().ok())
            .unwrap_or(bcrypt::DEFAULT_COST);

        if inference_backend == InferenceBackend::OpenAi && openai_api_key.trim().is_empty() {
            tracing::warn!("INFERENCE_BACKEND=openai but OPENAI_API_KEY is empty");
        }

        Ok(Self {
            addr: format!("{host}:{port}").parse().context("HOST/PORT")?,
            database_url,
            inference_backend,
            ollama_host,
            ollama_model,
            openai_base_url,
            openai_api_key,
            openai_model,
            inference_timeout_secs,
            session_ttl_days,
            secure_cookies,
            bcrypt_cost,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_backend_names_case_insensitively() {
        assert_eq!("Ollama".parse::<InferenceBackend>().unwrap(), InferenceBackend::Ollama);
        assert_eq!(" openai ".parse::<InferenceBackend>().unwrap(), InferenceBackend::OpenAi);
        assert!("claude".parse::<InferenceBackend>().is_err());
    }
}
