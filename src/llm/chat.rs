//! OpenAI-compatible `/chat/completions` client (DeepSeek by default).

use serde::{Deserialize, Serialize};
use std::time::Duration;
use tracing::debug;

use super::{check_status, ChatMessage, ChatProvider, CompletionParams, LlmError};
use crate::config::ChatConfig;

pub struct OpenAiCompatibleChat {
    client: reqwest::Client,
    base_url: String,
    api_key: String,
    model: String,
}

impl OpenAiCompatibleChat {
    /// Fails with `NotConfigured` when no API key is set.
    pub fn from_config(config: &ChatConfig) -> Result<Self, LlmError> {
        let api_key = config
            .api_key
            .as_deref()
            .map(str::trim)
            .filter(|k| !k.is_empty())
            .ok_or_else(|| LlmError::NotConfigured("missing DEEPSEEK_API_KEY".to_string()))?;

        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(config.timeout_secs))
            .build()
            .map_err(|e| LlmError::NotConfigured(e.to_string()))?;

        Ok(Self {
            client,
            base_url: config.base_url.trim_end_matches('/').to_string(),
            api_key: api_key.to_string(),
            model: config.model.clone(),
        })
    }
}

#[derive(Serialize)]
struct ChatCompletionRequest<'a> {
    model: &'a str,
    messages: &'a [ChatMessage],
    temperature: f32,
    max_tokens: u32,
}

#[derive(Deserialize)]
struct ChatCompletionResponse {
    choices: Vec<ChatChoice>,
}

#[derive(Deserialize)]
struct ChatChoice {
    message: ChatChoiceMessage,
}

#[derive(Deserialize)]
struct ChatChoiceMessage {
    content: Option<String>,
}

#[async_trait::async_trait]
impl ChatProvider for OpenAiCompatibleChat {
    async fn complete(
        &self,
        messages: &[ChatMessage],
        params: &CompletionParams,
    ) -> Result<String, LlmError> {
        let url = format!("{}/chat/completions", self.base_url);
        let request = ChatCompletionRequest {
            model: &self.model,
            messages,
            temperature: params.temperature,
            max_tokens: params.max_tokens,
        };
        debug!(
            url = %url,
            model = %self.model,
            messages = messages.len(),
            "chat completion request"
        );

        let response = self
            .client
            .post(&url)
            .bearer_auth(&self.api_key)
            .json(&request)
            .send()
            .await
            .map_err(LlmError::from_send)?;
        let response = check_status(response).await?;

        let body: ChatCompletionResponse = response
            .json()
            .await
            .map_err(|e| LlmError::ParseError(e.to_string()))?;

        body.choices
            .into_iter()
            .next()
            .and_then(|c| c.message.content)
            .ok_or_else(|| LlmError::ParseError("no content in response".to_string()))
    }

    fn name(&self) -> &str {
        "openai-compatible-chat"
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn missing_key_is_not_configured() {
        let config = ChatConfig::default();
        assert!(matches!(
            OpenAiCompatibleChat::from_config(&config),
            Err(LlmError::NotConfigured(_))
        ));

        let blank = ChatConfig {
            api_key: Some("   ".into()),
            ..ChatConfig::default()
        };
        assert!(OpenAiCompatibleChat::from_config(&blank).is_err());
    }

    #[test]
    fn base_url_trailing_slash_is_trimmed() {
        let config = ChatConfig {
            api_key: Some("sk-test".into()),
            base_url: "https://api.example.com/".into(),
            ..ChatConfig::default()
        };
        let client = OpenAiCompatibleChat::from_config(&config).unwrap();
        assert_eq!(client.base_url, "https://api.example.com");
    }
}
