//! ChatGPT backend - logic, reasoning, decision-making.

use crate::providers::{AiProvider, QueryContext};
use async_trait::async_trait;
use porter_common::RouterError;
use serde::{Deserialize, Serialize};
use std::time::Duration;
use tracing::{debug, error};

const API_BASE: &str = "https://api.openai.com/v1";

#[derive(Serialize)]
pub(crate) struct ChatRequest {
    pub model: String,
    pub messages: Vec<ChatMessage>,
    pub temperature: f32,
    pub max_tokens: u32,
}

#[derive(Serialize, Deserialize, Clone)]
pub(crate) struct ChatMessage {
    pub role: String,
    pub content: String,
}

#[derive(Deserialize)]
pub(crate) struct ChatResponse {
    #[serde(default)]
    pub choices: Vec<Choice>,
}

#[derive(Deserialize)]
pub(crate) struct Choice {
    pub message: ChatMessage,
}

/// OpenAI ChatGPT AI provider.
pub struct ChatGptProvider {
    api_key: Option<String>,
    model: String,
    api_base: String,
    client: reqwest::Client,
}

impl ChatGptProvider {
    pub fn new(api_key: Option<String>, timeout_secs: u64) -> Self {
        Self {
            api_key,
            model: "gpt-4o-mini".to_string(),
            api_base: API_BASE.to_string(),
            client: reqwest::Client::builder()
                .timeout(Duration::from_secs(timeout_secs))
                .build()
                .unwrap_or_default(),
        }
    }

    fn err(message: impl Into<String>) -> RouterError {
        RouterError::backend("ChatGPT", message)
    }
}

#[async_trait]
impl AiProvider for ChatGptProvider {
    fn name(&self) -> &str {
        "chatgpt"
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
            .ok_or_else(|| RouterError::ProviderUnavailable("chatgpt".to_string()))?;

        debug!("[ChatGPT] Query: {:.100}", prompt);

        let mut messages = Vec::new();
        if let Some(style) = context.and_then(|c| c.response_style.as_deref()) {
            messages.push(ChatMessage {
                role: "system".to_string(),
                content: style.to_string(),
            });
        }
        if let Some(context) = context {
            for turn in &context.history {
                messages.push(ChatMessage {
                    role: turn.role.clone(),
                    content: turn.content.clone(),
                });
            }
        }
        messages.push(ChatMessage {
            role: "user".to_string(),
            content: prompt.to_string(),
        });

        let request = ChatRequest {
            model: self.model.clone(),
            messages,
            temperature: 0.7,
            max_tokens: 2048,
        };

        let resp = self
            .client
            .post(format!("{}/chat/completions", self.api_base))
            .bearer_auth(api_key)
            .json(&request)
            .send()
            .await
            .map_err(|e| {
                error!("ChatGPT network error: {}", e);
                Self::err(format!("network error: {e}"))
            })?;

        if !resp.status().is_success() {
            let status = resp.status();
            let text = resp.text().await.unwrap_or_default();
            error!("ChatGPT API error: {}", text);
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

        debug!("[ChatGPT] Response: {:.100}", text);
        Ok(text.trim().to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::providers::ChatTurn;

    #[test]
    fn configured_requires_nonempty_key() {
        assert!(!ChatGptProvider::new(None, 30).is_configured());
        assert!(ChatGptProvider::new(Some("sk-test".to_string()), 30).is_configured());
    }

    #[tokio::test]
    async fn query_without_key_reports_unavailable() {
        let provider = ChatGptProvider::new(None, 30);
        let err = provider.query("hello", None).await.unwrap_err();
        assert!(matches!(err, RouterError::ProviderUnavailable(_)));
    }

    #[test]
    fn response_parsing_extracts_first_choice() {
        let json = r#"{
            "choices": [
                {"message": {"role": "assistant", "content": "42"}}
            ]
        }"#;
        let resp: ChatResponse = serde_json::from_str(json).unwrap();
        assert_eq!(resp.choices[0].message.content, "42");
    }

    #[test]
    fn context_turns_serialize_with_role_and_content() {
        let turn = ChatTurn {
            role: "user".to_string(),
            content: "earlier question".to_string(),
        };
        let json = serde_json::to_string(&turn).unwrap();
        assert!(json.contains("\"role\":\"user\""));
        assert!(json.contains("earlier question"));
    }
}
