//! Client for the text-generation service behind chat and recommendations.
//!
//! Two wire protocols are supported: a local Ollama server (`/api/generate`,
//! `/api/tags`) and a hosted OpenAI-compatible API (`/chat/completions`,
//! `/models`). One request per call, no retries and no streaming; callers
//! decide what to show when a call fails.

use serde::{Deserialize, Serialize};

use crate::config::{Config, InferenceBackend};

pub const DEFAULT_TEMPERATURE: f32 = 0.7;

#[derive(Debug, thiserror::Error)]
pub enum InferenceError {
    #[error("inference request failed: {0}")]
    Http(#[from] reqwest::Error),

    #[error("inference API error: {status} {message}")]
    Api { status: u16, message: String },

    #[error("inference API returned no text")]
    EmptyResponse,
}

#[derive(Clone, Debug)]
pub struct GenerateOptions<'a> {
    pub model: Option<&'a str>,
    pub system: Option<&'a str>,
    pub temperature: f32,
}

impl Default for GenerateOptions<'_> {
    fn default() -> Self {
        Self { model: None, system: None, temperature: DEFAULT_TEMPERATURE }
    }
}

#[derive(Clone, Debug)]
pub struct InferenceClient {
    http: reqwest::Client,
    backend: InferenceBackend,
    base_url: String,
    api_key: String,
    default_model: String,
}

impl InferenceClient {
    pub fn ollama(http: reqwest::Client, host: impl Into<String>, default_model: impl Into<String>) -> Self {
        Self {
            http,
            backend: InferenceBackend::Ollama,
            base_url: host.into(),
            api_key: String::new(),
            default_model: default_model.into(),
        }
    }

    pub fn hosted(
        http: reqwest::Client,
        base_url: impl Into<String>,
        api_key: impl Into<String>,
        default_model: impl Into<String>,
    ) -> Self {
        Self {
            http,
            backend: InferenceBackend::OpenAi,
            base_url: base_url.into(),
            api_key: api_key.into(),
            default_model: default_model.into(),
        }
    }

    pub fn from_config(http: reqwest::Client, config: &Config) -> Self {
        match config.inference_backend {
            InferenceBackend::Ollama => {
                Self::ollama(http, config.ollama_host.clone(), config.ollama_model.clone())
            },
            InferenceBackend::OpenAi => Self::hosted(
                http,
                config.openai_base_url.clone(),
                config.openai_api_key.clone(),
                config.openai_model.clone(),
            ),
        }
    }

    pub fn backend(&self) -> InferenceBackend {
        self.backend
    }

    pub fn default_model(&self) -> &str {
        &self.default_model
    }

    pub async fn generate(&self, prompt: &str, opts: GenerateOptions<'_>) -> Result<String, InferenceError> {
        let model = opts.model.filter(|m| !m.trim().is_empty()).unwrap_or(self.default_model.as_str());
        tracing::debug!(backend = ?self.backend, model = %model, prompt_len = prompt.len(), "generate");

        let text = match self.backend {
            InferenceBackend::Ollama => self.ollama_generate(model, prompt, &opts).await?,
            InferenceBackend::OpenAi => self.hosted_generate(model, prompt, &opts).await?,
        };

        if text.trim().is_empty() {
            return Err(InferenceError::EmptyResponse);
        }
        Ok(text)
    }

    pub async fn list_models(&self) -> Result<Vec<String>, InferenceError> {
        match self.backend {
            InferenceBackend::Ollama => {
                let resp: TagsResponse = check(self.http.get(self.url("api/tags")).send().await?)
                    .await?
                    .json()
                    .await?;
                Ok(resp.models.into_iter().map(|m| m.name).collect())
            },
            InferenceBackend::OpenAi => {
                let resp: ModelsResponse = check(
                    self.http.get(self.url("models")).bearer_auth(&self.api_key).send().await?,
                )
                .await?
                .json()
                .await?;
                Ok(resp.data.into_iter().map(|m| m.id).collect())
            },
        }
    }

    async fn ollama_generate(
        &self,
        model: &str,
        prompt: &str,
        opts: &GenerateOptions<'_>,
    ) -> Result<String, InferenceError> {
        let body = OllamaGenerateRequest {
            model,
            prompt,
            system: opts.system,
            options: OllamaOptions { temperature: opts.temperature },
            stream: false,
        };

        let resp: OllamaGenerateResponse =
            check(self.http.post(self.url("api/generate")).json(&body).send().await?)
                .await?
                .json()
                .await?;
        tracing::debug!(model = %resp.model, done = resp.done, "ollama responded");
        Ok(resp.response)
    }

    async fn hosted_generate(
        &self,
        model: &str,
        prompt: &str,
        opts: &GenerateOptions<'_>,
    ) -> Result<String, InferenceError> {
        let mut messages = Vec::with_capacity(2);
        if let Some(system) = opts.system {
            messages.push(ChatMessage { role: "system", content: system });
        }
        messages.push(ChatMessage { role: "user", content: prompt });

        let body = ChatCompletionRequest { model, messages, temperature: opts.temperature };

        let resp: ChatCompletionResponse = check(
            self.http
                .post(self.url("chat/completions"))
                .bearer_auth(&self.api_key)
                .json(&body)
                .send()
                .await?,
        )
        .await?
        .json()
        .await?;

        resp.choices
            .into_iter()
            .next()
            .and_then(|c| c.message.content)
            .ok_or(InferenceError::EmptyResponse)
    }

    fn url(&self, path: &str) -> String {
        format!("{}/{}", self.base_url.trim_end_matches('/'), path)
    }
}

async fn check(resp: reqwest::Response) -> Result<reqwest::Response, InferenceError> {
    let status = resp.status();
    if status.is_success() {
        return Ok(resp);
    }
    let body = resp.text().await.unwrap_or_default();
    let message = match status.canonical_reason() {
        Some(reason) if body.trim().is_empty() => reason.to_string(),
        _ => body,
    };
    Err(InferenceError::Api { status: status.as_u16(), message })
}

/// Strips a surrounding ```json fence that models like to add around
/// structured output.
pub fn strip_json_fences(text: &str) -> &str {
    let text = text.trim();
    let Some(rest) = text.strip_prefix("```") else {
        return text;
    };
    let rest = rest.strip_prefix("json").unwrap_or(rest).trim_start();
    rest.strip_suffix("```").map(str::trim).unwrap_or(rest)
}

#[derive(Debug, Serialize)]
struct OllamaGenerateRequest<'a> {
    model: &'a str,
    prompt: &'a str,
    #[serde(skip_serializing_if = "Option::is_none")]
    system: Option<&'a str>,
    options: OllamaOptions,
    stream: bool,
}

#[derive(Debug, Serialize)]
struct OllamaOptions {
    temperature: f32,
}

#[derive(Debug, Deserialize)]
struct OllamaGenerateResponse {
    #[serde(default)]
    model: String,
    response: String,
    #[serde(default)]
    done: bool,
}

#[derive(Debug, Deserialize)]
struct TagsResponse {
    models: Vec<TagModel>,
}

#[derive(Debug, Deserialize)]
struct TagModel {
    name: String,
}

#[derive(Debug, Serialize)]
struct ChatCompletionRequest<'a> {
    model: &'a str,
    messages: Vec<ChatMessage<'a>>,
    temperature: f32,
}

#[derive(Debug, Serialize)]
struct ChatMessage<'a> {
    role: &'a str,
    content: &'a str,
}

#[derive(Debug, Deserialize)]
struct ChatCompletionResponse {
    choices: Vec<ChatChoice>,
}

#[derive(Debug, Deserialize)]
struct ChatChoice {
    message: ChatChoiceMessage,
}

#[derive(Debug, Deserialize)]
struct ChatChoiceMessage {
    content: Option<String>,
}

#[derive(Debug, Deserialize)]
struct ModelsResponse {
    data: Vec<ModelEntry>,
}

#[derive(Debug, Deserialize)]
struct ModelEntry {
    id: String,
}
