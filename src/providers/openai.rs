use reqwest::Client;
use serde::Deserialize;
use tracing::{debug, warn};

use crate::config::Config;
use crate::gateway::{CompletionFuture, CompletionProvider};
use crate::model::ChatRequest;
use crate::providers::http_errors::{ProviderError, status_error, transport_error};

#[derive(Debug, Deserialize)]
struct ChatCompletionResponse {
    choices: Vec<Choice>,
}

#[derive(Debug, Deserialize)]
struct Choice {
    message: ChoiceMessage,
}

#[derive(Debug, Deserialize)]
struct ChoiceMessage {
    #[serde(default)]
    content: Option<String>,
}

fn completions_url(base_url: &str) -> String {
    format!("{}/chat/completions", base_url.trim_end_matches('/'))
}

/// OpenAI-compatible chat-completions client.
#[derive(Debug, Clone)]
pub struct OpenAiClient {
    client: Client,
    api_url: String,
    api_key: String,
}

impl OpenAiClient {
    pub fn new(client: Client, cfg: &Config) -> Self {
        Self {
            client,
            api_url: completions_url(&cfg.model_base_url),
            api_key: cfg.api_key.clone(),
        }
    }

    pub async fn chat(&self, request: &ChatRequest) -> Result<String, ProviderError> {
        debug!(
            api_url = %self.api_url,
            model = %request.model,
            message_count = request.messages.len(),
            max_tokens = ?request.max_tokens,
            "sending chat completion request"
        );

        let response = self
            .client
            .post(&self.api_url)
            .bearer_auth(&self.api_key)
            .json(request)
            .send()
            .await
            .map_err(|err| {
                warn!(
                    api_url = %self.api_url,
                    model = %request.model,
                    error = %err,
                    "chat completion request failed"
                );
                transport_error(err, &self.api_url)
            })?;

        let status = response.status();
        let body = response
            .text()
            .await
            .map_err(|err| transport_error(err, &self.api_url))?;

        if !status.is_success() {
            warn!(
                api_url = %self.api_url,
                model = %request.model,
                status = %status,
                response_body_len = body.len(),
                "model API returned non-success status"
            );
            return Err(status_error(status, body));
        }

        let parsed: ChatCompletionResponse = serde_json::from_str(&body)
            .map_err(|err| ProviderError::MalformedResponse(err.to_string()))?;
        let content = parsed
            .choices
            .into_iter()
            .next()
            .ok_or(ProviderError::EmptyChoices)?
            .message
            .content
            .unwrap_or_default();
        debug!(
            model = %request.model,
            response_len = content.len(),
            "received chat completion response"
        );
        Ok(content)
    }
}

impl CompletionProvider for OpenAiClient {
    fn complete(&self, request: ChatRequest) -> CompletionFuture<'_> {
        Box::pin(async move { self.chat(&request).await })
    }
}
