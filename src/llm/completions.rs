//! Chat-completions client implementation
//!
//! Async HTTP client for OpenAI-compatible `chat/completions` endpoints
//! (Groq by default). Every call is retried on transport failures and non-2xx
//! statuses, and degrades to a fixed reply instead of erroring.

use async_trait::async_trait;
use reqwest::header::{HeaderMap, HeaderValue, AUTHORIZATION, CONTENT_TYPE};
use reqwest::Client;
use serde::{Deserialize, Serialize};
use tracing::{debug, error, info, warn};

use crate::core::config::LlmConfig;
use crate::core::{BridgeError, Message, Result, RetryPolicy};
use crate::llm::extract::extract_answer;
use crate::llm::traits::{ChatModel, TokenUsage, FALLBACK_REPLY};

/// Sampling temperature sent with every request
const TEMPERATURE: f32 = 0.7;
/// Upper bound on generated tokens
const MAX_COMPLETION_TOKENS: u32 = 4096;

/// Chat-completions API client
pub struct ChatCompletionsClient {
    client: Option<Client>,
    endpoint: String,
    model: String,
    retry: RetryPolicy,
}

/// Chat-completions request body
#[derive(Debug, Serialize)]
struct ChatRequest<'a> {
    model: &'a str,
    messages: &'a [Message],
    temperature: f32,
    max_completion_tokens: u32,
    stream: bool,
    stop: Option<Vec<String>>,
}

/// Chat-completions response body
#[derive(Debug, Deserialize)]
struct ChatResponse {
    choices: Vec<Choice>,
    #[serde(default)]
    usage: Option<Usage>,
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

#[derive(Debug, Deserialize)]
struct Usage {
    prompt_tokens: u32,
    total_tokens: u32,
}

impl From<Usage> for TokenUsage {
    fn from(usage: Usage) -> Self {
        Self {
            prompt_tokens: usage.prompt_tokens,
            total_tokens: usage.total_tokens,
        }
    }
}

impl ChatCompletionsClient {
    /// Create a client from configuration and an API key
    pub fn from_config(config: &LlmConfig, api_key: &str) -> Result<Self> {
        let mut headers = HeaderMap::new();
        headers.insert(CONTENT_TYPE, HeaderValue::from_static("application/json"));
        let bearer = HeaderValue::from_str(&format!("Bearer {}", api_key))
            .map_err(|e| BridgeError::config(format!("Invalid API key: {}", e)))?;
        headers.insert(AUTHORIZATION, bearer);

        let client = Client::builder()
            .timeout(config.timeout())
            .default_headers(headers)
            .build()?;

        Ok(Self {
            client: Some(client),
            endpoint: config.endpoint.clone(),
            model: config.model.clone(),
            retry: config.retry_policy(),
        })
    }

    /// One HTTP round-trip. Only `LlmTransient` errors are worth retrying.
    async fn request(&self, client: &Client, messages: &[Message]) -> Result<String> {
        let request = ChatRequest {
            model: &self.model,
            messages,
            temperature: TEMPERATURE,
            max_completion_tokens: MAX_COMPLETION_TOKENS,
            stream: false,
            stop: None,
        };

        let response = client
            .post(&self.endpoint)
            .json(&request)
            .send()
            .await
            .map_err(|e| BridgeError::llm_transient(e.to_string()))?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            debug!(%status, body = %body, "chat completion rejected");
            return Err(BridgeError::llm_transient(format!("HTTP status {}", status)));
        }

        let body: ChatResponse = response.json().await?;

        if let Some(usage) = body.usage.map(TokenUsage::from) {
            info!(
                prompt_tokens = usage.prompt_tokens,
                total_tokens = usage.total_tokens,
                "chat completion usage"
            );
        }

        body.choices
            .into_iter()
            .next()
            .and_then(|choice| choice.message.content)
            .ok_or_else(|| BridgeError::Other("Response contained no message content".to_string()))
    }
}

#[async_trait]
impl ChatModel for ChatCompletionsClient {
    async fn chat(&self, messages: &[Message]) -> String {
        let Some(client) = self.client.as_ref() else {
            error!("chat called after the client was released");
            return FALLBACK_REPLY.to_string();
        };

        for attempt in 1..=self.retry.max_attempts {
            match self.request(client, messages).await {
                Ok(content) => return extract_answer(&content),
                Err(BridgeError::LlmTransient(cause)) => {
                    warn!(attempt, max = self.retry.max_attempts, %cause, "chat request failed");
                    if attempt < self.retry.max_attempts {
                        tokio::time::sleep(self.retry.delay).await;
                    }
                }
                Err(e) => {
                    error!(error = %e, "unrecoverable chat failure");
                    break;
                }
            }
        }

        FALLBACK_REPLY.to_string()
    }

    async fn cleanup(&mut self) {
        if self.client.take().is_some() {
            debug!(endpoint = %self.endpoint, "released HTTP client");
        }
    }

    fn name(&self) -> &str {
        &self.model
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_request_shape() {
        let messages = vec![Message::system("be brief"), Message::user("hi")];
        let request = ChatRequest {
            model: "qwen-qwq-32b",
            messages: &messages,
            temperature: TEMPERATURE,
            max_completion_tokens: MAX_COMPLETION_TOKENS,
            stream: false,
            stop: None,
        };

        let value = serde_json::to_value(&request).unwrap();
        assert_eq!(value["messages"][1]["role"], "user");
        assert_eq!(value["max_completion_tokens"], 4096);
        assert_eq!(value["stream"], false);
        assert!(value["stop"].is_null());
    }

    #[test]
    fn test_response_without_usage() {
        let body: ChatResponse =
            serde_json::from_str(r#"{"choices":[{"message":{"content":"hello"}}]}"#).unwrap();
        assert!(body.usage.is_none());
        assert_eq!(body.choices[0].message.content.as_deref(), Some("hello"));
    }

    #[tokio::test]
    async fn test_cleanup_is_idempotent() {
        let mut client = ChatCompletionsClient::from_config(&LlmConfig::default(), "key").unwrap();
        client.cleanup().await;
        client.cleanup().await;
        assert!(client.client.is_none());
        assert_eq!(client.chat(&[Message::user("hi")]).await, FALLBACK_REPLY);
    }
}
