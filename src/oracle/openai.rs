//! `OpenAI`-compatible oracle backend using the `async-openai` crate.
//!
//! Works against `OpenAI` itself or any compatible API (local inference
//! servers, proxies) via the base URL override.

use std::time::Duration;

use async_openai::config::OpenAIConfig;
use async_openai::types::{
    ChatCompletionRequestMessage, ChatCompletionRequestSystemMessage,
    ChatCompletionRequestSystemMessageContent, ChatCompletionRequestUserMessage,
    ChatCompletionRequestUserMessageContent, CreateChatCompletionRequest,
};
use async_openai::Client;
use async_trait::async_trait;
use tracing::debug;

use super::Oracle;
use crate::config::Config;
use crate::error::OracleError;

/// Default system role for all oracle calls.
const DEFAULT_SYSTEM_ROLE: &str =
    "You are a precise code analyst. Answer only from the material you are given.";

/// Chat-completion oracle for `OpenAI`-compatible APIs.
pub struct OpenAiOracle {
    client: Client<OpenAIConfig>,
    model: String,
    system_role: String,
    timeout: Duration,
}

impl OpenAiOracle {
    /// Creates an oracle from engine configuration.
    #[must_use]
    pub fn new(config: &Config) -> Self {
        let mut openai_config = OpenAIConfig::new().with_api_key(&config.oracle_api_key);
        if let Some(ref base_url) = config.oracle_base_url {
            openai_config = openai_config.with_api_base(base_url);
        }

        Self {
            client: Client::with_config(openai_config),
            model: config.oracle_model.clone(),
            system_role: DEFAULT_SYSTEM_ROLE.to_string(),
            timeout: config.oracle_timeout,
        }
    }

    /// Overrides the system role sent with every prompt.
    #[must_use]
    pub fn with_system_role(mut self, role: impl Into<String>) -> Self {
        self.system_role = role.into();
        self
    }
}

#[async_trait]
impl Oracle for OpenAiOracle {
    async fn complete(&self, prompt: &str, temperature: f32) -> Result<String, OracleError> {
        let request = CreateChatCompletionRequest {
            model: self.model.clone(),
            messages: vec![
                ChatCompletionRequestMessage::System(ChatCompletionRequestSystemMessage {
                    content: ChatCompletionRequestSystemMessageContent::Text(
                        self.system_role.clone(),
                    ),
                    name: None,
                }),
                ChatCompletionRequestMessage::User(ChatCompletionRequestUserMessage {
                    content: ChatCompletionRequestUserMessageContent::Text(prompt.to_string()),
                    name: None,
                }),
            ],
            temperature: Some(temperature),
            ..Default::default()
        };

        let response = tokio::time::timeout(self.timeout, self.client.chat().create(request))
            .await
            .map_err(|_| OracleError::Timeout {
                seconds: self.timeout.as_secs(),
            })?
            .map_err(|e| OracleError::Request(e.to_string()))?;

        let content = response
            .choices
            .first()
            .and_then(|c| c.message.content.clone())
            .ok_or_else(|| OracleError::Parse("empty completion".to_string()))?;

        debug!(
            model = %self.model,
            temperature,
            response_chars = content.len(),
            "oracle completion"
        );

        Ok(content)
    }
}
