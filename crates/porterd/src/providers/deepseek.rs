//! DeepSeek backend - coding, debugging, technical tasks.
//!
//! The API is OpenAI-compatible, so this reuses the chat wire types.

use crate::providers::chatgpt::{ChatMessage, ChatRequest, ChatResponse};
use crate::providers::{AiProvider, QueryContext};
use async_trait::async_trait;
use porter_common::RouterError;
use std::time::Duration;
use tracing::{debug, error};

const API_BASE: &str = "https://api.deepseek.com/v1";

const DEFAULT_SYSTEM_MESSAGE: &str =
    "You are a helpful coding assistant. Provide clear, concise code with explanations.";

/// DeepSeek AI provider.
pub struct DeepSeekProvider {
    api_key: Option<String>,
    model: String,
    api_base: String,
    client: reqwest::Client,
}

impl DeepSeekProvider {
    pub fn new(api_key: Option<String>, timeout_secs: u64) -> Self {
        Self {
            api_key,
            model: "deepseek-chat".to_string(),
            api_base: API_BASE.to_string(),
            client: reqwest::Client::builder()
                .timeout(Duration::from_secs(timeout_secs))
                .build()
                .unwrap_or_default(),
        }
    }

    fn err(message: impl Into<String>) -> RouterError {
        RouterError::backend("DeepSeek", message)
    }
}

#[async_trait]
impl AiProvider for DeepSeekProvider {
    fn name(&self) -> &str {
        "deepseek"
    }

    fn is_configured(&self) -> bool {
        self.api_key.as_deref().is_some_and(|k| !k.is_empty())
    }

    async fn query(
        &self,
        prompt: &str,
        context: Option<&QueryContext>,
    ) -> Result<String, RouterError> {
        let api_key = self
            .api_key
            .as_deref()
            .filter(|k| !k.is_empty())
            .ok_or_else(|| RouterError::ProviderUnavailable("deepseek".to_string()))?;

        debug!("[DeepSeek] Query: {:.100}", prompt);

        let system_message = context
            .and_then(|c| c.response_style.as_deref())
            .unwrap_or(DEFAULT_SYSTEM_MESSAGE);

        let request = ChatRequest {
            model: self.model.clone(),
            messages: vec![
                ChatMessage {
                    role: "system".to_string(),
                    content: system_message.to_string(),
                },
                ChatMessage {
                    role: "user".to_string(),
                    content: prompt.to_string(),
                },
            ],
            // Lower temperature for more consistent code
            temperature: 0.3,
            max_tokens: 4096,
        };

        let resp = self
            .client
            .post(format!("{}/chat/completions", self.api_base))
            .bearer_auth(api_key)
            .json(&request)
            .send()
            .await
            .map_err(|e| {
                error!("DeepSeek network error: {}", e);
                Self::err(format!("network error: {e}"))
            })?;

        if !resp.status().is_success() {
            let status = resp.status();
            let text = resp.text().await.unwrap_or_default();
            error!("DeepSeek API error: {}", text);
            return Err(Self::err(format!("API error {status}")));
        }

        let data: ChatResponse = resp
            .json()
            .await
            .map_err(|e| Self::err(format!("unexpected response format: {e}")))?;

        let text = data
            .choices
            .into_iter()
            .next()
            .map(|c| c.message.content)
            .ok_or_else(|| Self::err("unexpected response format: no choices"))?;

        debug!("[DeepSeek] Response: {:.100}", text);
        Ok(text.trim().to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn configured_requires_nonempty_key() {
        assert!(!DeepSeekProvider::new(None, 30).is_configured());
        assert!(DeepSeekProvider::new(Some("ds-key".to_string()), 30).is_configured());
    }

    #[tokio::test]
    async fn query_without_key_reports_unavailable() {
        let provider = DeepSeekProvider::new(None, 30);
        let err = provider.query("fix my code", None).await.unwrap_err();
        assert!(matches!(err, RouterError::ProviderUnavailable(_)));
    }
}
