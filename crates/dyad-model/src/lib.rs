//! Dyad Model — chat-completions client for OpenRouter-compatible providers.
//!
//! Implements the [`LanguageModel`] port over the OpenAI-style
//! `/chat/completions` endpoint. The engine owes the provider no retry
//! contract, so neither does this client: one request per call.

use std::time::Duration;

use async_trait::async_trait;
use dyad_core::model::{LanguageModel, ModelError};
use reqwest::Client;
use serde::{Deserialize, Serialize};
use tracing::debug;

/// Default provider base URL.
pub const DEFAULT_BASE_URL: &str = "https://openrouter.ai/api/v1";

/// Default model identifier.
pub const DEFAULT_MODEL: &str = "openai/gpt-5-mini";

const REQUEST_TIMEOUT: Duration = Duration::from_secs(120);

/// Client for an OpenRouter-compatible chat-completions API.
#[derive(Clone)]
pub struct OpenRouterClient {
    client: Client,
    base_url: String,
    api_key: String,
    model: String,
}

impl OpenRouterClient {
    /// Creates a client for the given provider and model.
    #[must_use]
    pub fn new(base_url: &str, api_key: &str, model: &str) -> Self {
        let client = Client::builder()
            .timeout(REQUEST_TIMEOUT)
            .build()
            .unwrap_or_else(|_| Client::new());

        Self {
            client,
            base_url: base_url.trim_end_matches('/').to_owned(),
            api_key: api_key.to_owned(),
            model: model.to_owned(),
        }
    }

    /// Creates a client from `OPENROUTER_BASE_URL`, `OPENROUTER_API_KEY`
    /// and `OPENROUTER_MODEL`, falling back to defaults where unset.
    #[must_use]
    pub fn from_env() -> Self {
        let base_url =
            std::env::var("OPENROUTER_BASE_URL").unwrap_or_else(|_| DEFAULT_BASE_URL.to_owned());
        let api_key = std::env::var("OPENROUTER_API_KEY").unwrap_or_default();
        let model = std::env::var("OPENROUTER_MODEL").unwrap_or_else(|_| DEFAULT_MODEL.to_owned());
        Self::new(&base_url, &api_key, &model)
    }
}

#[derive(Debug, Serialize)]
struct ChatRequest<'a> {
    model: &'a str,
    messages: Vec<ChatMessage<'a>>,
}

#[derive(Debug, Serialize)]
struct ChatMessage<'a> {
    role: &'static str,
    content: &'a str,
}

#[derive(Debug, Deserialize)]
struct ChatResponse {
    choices: Vec<ChatChoice>,
}

#[derive(Debug, Deserialize)]
struct ChatChoice {
    message: ChatResponseMessage,
}

#[derive(Debug, Deserialize)]
struct ChatResponseMessage {
    content: String,
}

#[async_trait]
impl LanguageModel for OpenRouterClient {
    async fn complete(&self, prompt: &str) -> Result<String, ModelError> {
        let request = ChatRequest {
            model: &self.model,
            messages: vec![ChatMessage {
                role: "system",
                content: prompt,
            }],
        };

        debug!(model = %self.model, prompt_chars = prompt.len(), "model request");

        let response = self
            .client
            .post(format!("{}/chat/completions", self.base_url))
            .bearer_auth(&self.api_key)
            .json(&request)
            .send()
            .await
            .map_err(|e| ModelError::Transport(e.to_string()))?;

        if !response.status().is_success() {
            let status = response.status();
            let body = response.text().await.unwrap_or_default();
            return Err(ModelError::Transport(format!("{status}: {body}")));
        }

        let parsed: ChatResponse = response
            .json()
            .await
            .map_err(|e| ModelError::Transport(e.to_string()))?;

        parsed
            .choices
            .into_iter()
            .next()
            .map(|choice| choice.message.content)
            .ok_or_else(|| ModelError::Transport("provider returned no choices".to_owned()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_base_url_trailing_slash_is_trimmed() {
        let client = OpenRouterClient::new("https://openrouter.ai/api/v1/", "key", "m");

        assert_eq!(client.base_url, "https://openrouter.ai/api/v1");
    }

    #[test]
    fn test_chat_response_parses_first_choice() {
        let body = r#"{"choices": [{"message": {"role": "assistant", "content": "hello"}}]}"#;

        let parsed: ChatResponse = serde_json::from_str(body).unwrap();

        assert_eq!(parsed.choices[0].message.content, "hello");
    }
}
