use std::time::{Duration, Instant};

use async_trait::async_trait;
use reqwest::Client;
use tracing::{debug, info};

use super::types::{ChatRequest, ChatResponse, ResponseFormat};
use super::{CompletionRequest, CompletionService};
use crate::config::{OpenAiConfig, RequestConfig};
use crate::error::{CompletionError, CompletionResult};

/// Client for the OpenAI chat completions API
#[derive(Clone)]
pub struct OpenAiClient {
    client: Client,
    base_url: String,
    api_key: String,
    model: String,
    temperature: f64,
    timeout_ms: u64,
}

impl OpenAiClient {
    /// Create a new completion client
    pub fn new(config: &OpenAiConfig, request_config: &RequestConfig) -> CompletionResult<Self> {
        let client = Client::builder()
            .timeout(Duration::from_millis(request_config.timeout_ms))
            .build()
            .map_err(CompletionError::Http)?;

        Ok(Self {
            client,
            base_url: config.base_url.trim_end_matches('/').to_string(),
            api_key: config.api_key.clone(),
            model: config.model.clone(),
            temperature: config.temperature,
            timeout_ms: request_config.timeout_ms,
        })
    }

    /// Get the base URL (for testing)
    pub fn base_url(&self) -> &str {
        &self.base_url
    }
}

#[async_trait]
impl CompletionService for OpenAiClient {
    async fn complete(&self, request: CompletionRequest) -> CompletionResult<String> {
        let url = format!("{}/v1/chat/completions", self.base_url);

        let chat_request = ChatRequest {
            model: self.model.clone(),
            messages: request.messages,
            temperature: request.temperature.unwrap_or(self.temperature),
            response_format: request.json_output.then(ResponseFormat::json_object),
        };

        debug!(
            model = %chat_request.model,
            messages = chat_request.messages.len(),
            json_output = chat_request.response_format.is_some(),
            "Calling chat completions"
        );

        let start = Instant::now();

        let response = self
            .client
            .post(&url)
            .header("Authorization", format!("Bearer {}", self.api_key))
            .header("Content-Type", "application/json")
            .json(&chat_request)
            .send()
            .await
            .map_err(|e| {
                if e.is_timeout() {
                    CompletionError::Timeout {
                        timeout_ms: self.timeout_ms,
                    }
                } else {
                    CompletionError::Http(e)
                }
            })?;

        let status = response.status();

        if !status.is_success() {
            let error_body = response.text().await.unwrap_or_default();
            return Err(CompletionError::Api {
                status: status.as_u16(),
                message: error_body,
            });
        }

        let chat_response: ChatResponse =
            response
                .json()
                .await
                .map_err(|e| CompletionError::MalformedResponse {
                    message: format!("Failed to parse completion response: {}", e),
                })?;

        let content = chat_response
            .choices
            .into_iter()
            .next()
            .and_then(|choice| choice.message.content)
            .ok_or_else(|| CompletionError::MalformedResponse {
                message: "Completion response contained no choices".to_string(),
            })?;

        info!(
            model = %self.model,
            latency_ms = start.elapsed().as_millis(),
            "Completion call succeeded"
        );

        Ok(content)
    }
}
