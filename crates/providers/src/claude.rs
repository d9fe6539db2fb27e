use crate::traits::{ChatMessage, CompletionProvider, ProviderError};
use async_trait::async_trait;
use reqwest::Client;
use serde::{Deserialize, Serialize};

const API_URL: &str = "https://api.anthropic.com/v1/messages";
const ANTHROPIC_VERSION: &str = "2023-06-01";
const MAX_TOKENS: u32 = 4096;

#[derive(Debug, Serialize)]
struct MessagesRequest<'a> {
    model: &'a str,
    messages: &'a [ChatMessage],
    max_tokens: u32,
    system: &'a str,
}

#[derive(Debug, Deserialize)]
struct MessagesResponse {
    content: Vec<ContentBlock>,
    #[serde(default)]
    stop_reason: Option<String>,
}

#[derive(Debug, Deserialize)]
struct ContentBlock {
    #[serde(rename = "type")]
    kind: String,
    #[serde(default)]
    text: String,
}

/// Anthropic Messages API client.
pub struct ClaudeProvider {
    client: Client,
    api_key: String,
    model: String,
    base_url: String,
}

impl ClaudeProvider {
    pub fn new(
        api_key: impl Into<String>,
        model: impl Into<String>,
    ) -> Result<Self, ProviderError> {
        let api_key = api_key.into();
        if api_key.trim().is_empty() {
            return Err(ProviderError::MissingApiKey);
        }
        Ok(Self {
            client: Client::new(),
            api_key,
            model: model.into(),
            base_url: API_URL.to_string(),
        })
    }

    /// Point the client at a different endpoint. Used by tests.
    pub fn with_base_url(mut self, base_url: impl Into<String>) -> Self {
        self.base_url = base_url.into();
        self
    }
}

#[async_trait]
impl CompletionProvider for ClaudeProvider {
    async fn complete(
        &self,
        messages: &[ChatMessage],
        system: &str,
    ) -> Result<String, ProviderError> {
        let body = MessagesRequest {
            model: &self.model,
            messages,
            max_tokens: MAX_TOKENS,
            system,
        };

        let response = self
            .client
            .post(&self.base_url)
            .header("x-api-key", &self.api_key)
            .header("anthropic-version", ANTHROPIC_VERSION)
            .json(&body)
            .send()
            .await
            .map_err(|e| ProviderError::Http(e.to_string()))?;

        if !response.status().is_success() {
            let status = response.status();
            let text = response.text().await.unwrap_or_default();
            return Err(ProviderError::Api(format!("{}: {}", status, text)));
        }

        let parsed: MessagesResponse = response
            .json()
            .await
            .map_err(|e| ProviderError::Parse(e.to_string()))?;

        if let Some(reason) = &parsed.stop_reason {
            tracing::debug!("Completion finished with stop_reason: {}", reason);
        }

        parsed
            .content
            .iter()
            .find(|block| block.kind == "text")
            .map(|block| block.text.clone())
            .ok_or(ProviderError::EmptyResponse)
    }

    fn name(&self) -> &str {
        "Claude"
    }
}
