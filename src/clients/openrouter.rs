//! OpenRouter client.
//!
//! The one place that talks HTTP. Everything above it sees only the
//! `AiBackend` trait: a fallible, timeout-bound completion call that is never
//! assumed to succeed. OpenRouter speaks the OpenAI chat API, so the calls
//! go through `async-openai` pointed at a custom base URL; the availability
//! probe is a plain GET against `{base}/models`.

use std::time::Duration;

use async_openai::{
    config::OpenAIConfig,
    types::chat::{
        ChatCompletionRequestMessage, ChatCompletionRequestSystemMessageArgs,
        ChatCompletionRequestUserMessageArgs, CreateChatCompletionRequestArgs,
    },
    Client,
};
use async_trait::async_trait;
use tracing::{debug, warn};

use crate::config::Config;
use crate::error::BackendError;
use crate::services::prompt_builder::RequestSpec;

/// The AI backend seam. Generation, validation and feedback all go through
/// this; tests substitute their own implementation.
#[async_trait]
pub trait AiBackend: Send + Sync {
    /// Execute one completion request, bounded by `timeout`.
    async fn complete(
        &self,
        request: &RequestSpec,
        timeout: Duration,
    ) -> Result<String, BackendError>;

    /// Whether the backend is reachable and authenticated.
    async fn is_available(&self) -> bool;
}

/// OpenRouter-backed implementation of [`AiBackend`].
pub struct OpenRouterClient {
    client: Client<OpenAIConfig>,
    http: reqwest::Client,
    api_key: String,
    base_url: String,
    model_name: String,
}

impl OpenRouterClient {
    pub fn new(config: &Config) -> Self {
        let openai_config = OpenAIConfig::new()
            .with_api_key(&config.openrouter_api_key)
            .with_api_base(&config.openrouter_base_url);

        Self {
            client: Client::with_config(openai_config),
            http: reqwest::Client::new(),
            api_key: config.openrouter_api_key.clone(),
            base_url: config.openrouter_base_url.trim_end_matches('/').to_string(),
            model_name: config.model_name.clone(),
        }
    }

    async fn send(&self, request: &RequestSpec) -> Result<String, BackendError> {
        debug!(
            model = %self.model_name,
            prompt_chars = request.prompt.len(),
            "calling OpenRouter"
        );

        let mut messages = Vec::new();
        if let Some(system) = &request.system {
            let system_msg = ChatCompletionRequestSystemMessageArgs::default()
                .content(system.as_str())
                .build()
                .map_err(|e| BackendError::Request(e.to_string()))?;
            messages.push(ChatCompletionRequestMessage::System(system_msg));
        }
        let user_msg = ChatCompletionRequestUserMessageArgs::default()
            .content(request.prompt.as_str())
            .build()
            .map_err(|e| BackendError::Request(e.to_string()))?;
        messages.push(ChatCompletionRequestMessage::User(user_msg));

        let chat_request = CreateChatCompletionRequestArgs::default()
            .model(&self.model_name)
            .messages(messages)
            .temperature(request.temperature)
            .max_tokens(request.max_tokens)
            .build()
            .map_err(|e| BackendError::Request(e.to_string()))?;

        let response = self
            .client
            .chat()
            .create(chat_request)
            .await
            .map_err(|e| {
                warn!("OpenRouter call failed: {e}");
                BackendError::Request(e.to_string())
            })?;

        let content = response
            .choices
            .first()
            .and_then(|choice| choice.message.content.clone())
            .ok_or(BackendError::EmptyResponse)?;

        let content = content.trim().to_string();
        if content.is_empty() {
            return Err(BackendError::EmptyResponse);
        }
        Ok(content)
    }
}

#[async_trait]
impl AiBackend for OpenRouterClient {
    async fn complete(
        &self,
        request: &RequestSpec,
        timeout: Duration,
    ) -> Result<String, BackendError> {
        if self.api_key.is_empty() {
            return Err(BackendError::Unavailable(
                "no OpenRouter API key configured".to_string(),
            ));
        }
        match tokio::time::timeout(timeout, self.send(request)).await {
            Ok(result) => result,
            Err(_) => {
                warn!(?timeout, "OpenRouter call timed out");
                Err(BackendError::Timeout(timeout))
            }
        }
    }

    async fn is_available(&self) -> bool {
        if self.api_key.is_empty() {
            return false;
        }
        let probe = self
            .http
            .get(format!("{}/models", self.base_url))
            .bearer_auth(&self.api_key)
            .header("HTTP-Referer", "https://github.com/linda-quiz")
            .header("X-Title", "Linda Quiz")
            .timeout(Duration::from_secs(10))
            .send()
            .await;
        matches!(probe, Ok(resp) if resp.status().is_success())
    }
}
