use crate::config::toml_config::GatewaySettings;
use crate::domain::ports::CompletionGateway;
use crate::utils::error::{RelayError, Result};
use crate::utils::validation::validate_required_field;
use async_trait::async_trait;
use reqwest::Client;
use serde::{Deserialize, Serialize};
use std::time::Duration;

#[derive(Debug, Serialize)]
struct ChatRequest<'a> {
    model: &'a str,
    messages: Vec<ChatMessage<'a>>,
    temperature: f32,
    max_tokens: u32,
    top_p: f32,
    stream: bool,
}

#[derive(Debug, Serialize)]
struct ChatMessage<'a> {
    role: &'a str,
    content: &'a str,
}

#[derive(Debug, Deserialize)]
struct ChatResponse {
    choices: Vec<ChatChoice>,
}

#[derive(Debug, Deserialize)]
struct ChatChoice {
    message: ChatReply,
}

#[derive(Debug, Deserialize)]
struct ChatReply {
    content: Option<String>,
}

/// OpenAI 相容的 chat completions API（預設為 Groq）
pub struct ChatCompletionGateway {
    client: Client,
    endpoint: String,
    api_key: String,
    model: String,
    temperature: f32,
    max_tokens: u32,
    system_prompt: String,
}

impl ChatCompletionGateway {
    pub fn new(settings: &GatewaySettings) -> Result<Self> {
        let api_key = validate_required_field("gateway.api_key", &settings.api_key)?.clone();

        let client = Client::builder()
            .timeout(Duration::from_secs(settings.request_timeout_seconds))
            .build()
            .map_err(|e| RelayError::ConfigError {
                message: format!("Failed to build HTTP client: {}", e),
            })?;

        Ok(Self {
            client,
            endpoint: settings.endpoint.clone(),
            api_key,
            model: settings.model.clone(),
            temperature: settings.temperature,
            max_tokens: settings.max_tokens,
            system_prompt: settings.system_prompt.clone(),
        })
    }

    pub fn model(&self) -> &str {
        &self.model
    }
}

fn gateway_failure(message: impl Into<String>) -> RelayError {
    RelayError::GatewayFailure {
        message: message.into(),
    }
}

#[async_trait]
impl CompletionGateway for ChatCompletionGateway {
    async fn complete(&self, prompt: &str) -> Result<String> {
        let request = ChatRequest {
            model: &self.model,
            messages: vec![
                ChatMessage {
                    role: "system",
                    content: &self.system_prompt,
                },
                ChatMessage {
                    role: "user",
                    content: prompt,
                },
            ],
            temperature: self.temperature,
            max_tokens: self.max_tokens,
            top_p: 1.0,
            stream: false,
        };

        tracing::debug!("POST {} (model: {})", self.endpoint, self.model);
        let response = self
            .client
            .post(&self.endpoint)
            .bearer_auth(&self.api_key)
            .json(&request)
            .send()
            .await
            .map_err(|e| gateway_failure(format!("request failed: {}", e)))?;

        let status = response.status();
        tracing::debug!("AI gateway response status: {}", status);

        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(gateway_failure(format!("HTTP {}: {}", status, body.trim())));
        }

        let body: ChatResponse = response
            .json()
            .await
            .map_err(|e| gateway_failure(format!("malformed response: {}", e)))?;

        body.choices
            .into_iter()
            .next()
            .and_then(|choice| choice.message.content)
            .ok_or_else(|| gateway_failure("response contained no message content"))
    }
}
