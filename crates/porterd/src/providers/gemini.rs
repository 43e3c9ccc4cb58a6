//! Gemini backend - research, current information, general queries.

use crate::providers::{AiProvider, QueryContext};
use async_trait::async_trait;
use porter_common::RouterError;
use serde::{Deserialize, Serialize};
use std::time::Duration;
use tracing::{debug, error};

const API_BASE: &str = "https://generativelanguage.googleapis.com/v1beta";

#[derive(Serialize)]
struct GenerateRequest {
    contents: Vec<Content>,
    #[serde(rename = "generationConfig")]
    generation_config: GenerationConfig,
}

#[derive(Serialize, Deserialize)]
struct Content {
    parts: Vec<Part>,
}

#[derive(Serialize, Deserialize)]
struct Part {
    text: String,
}

#[derive(Serialize)]
struct GenerationConfig {
    temperature: f32,
    #[serde(rename = "maxOutputTokens")]
    max_output_tokens: u32,
}

#[derive(Deserialize)]
struct GenerateResponse {
    #[serde(default)]
    candidates: Vec<Candidate>,
}

#[derive(Deserialize)]
struct Candidate {
    content: Content,
}

/// Google Gemini AI provider.
pub struct GeminiProvider {
    api_key: Option<String>,
    model: String,
    api_base: String,
    client: reqwest::Client,
}

impl GeminiProvider {
    pub fn new(api_key: Option<String>, timeout_secs: u64) -> Self {
        Self {
            api_key,
            model: "gemini-pro".to_string(),
            api_base: API_BASE.to_string(),
            client: reqwest::Client::builder()
                .timeout(Duration::from_secs(timeout_secs))
                .build()
                .unwrap_or_default(),
        }
    }

    fn err(message: impl Into<String>) -> RouterError {
        RouterError::backend("Gemini", message)
    }
}

#[async_trait]
impl AiProvider for GeminiProvider {
    fn name(&self) -> &str {
        "gemini"
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
            .ok_or_else(|| RouterError::ProviderUnavailable("gemini".to_string()))?;

        // Styles ride along as a prompt prefix; Gemini has no separate
        // system channel on this endpoint.
        let prompt = match context.and_then(|c| c.response_style.as_deref()) {
            Some(style) => format!("{style}\n\nUser query: {prompt}"),
            None => prompt.to_string(),
        };

        debug!("[Gemini] Query: {:.100}", prompt);

        let url = format!("{}/models/{}:generateContent", self.api_base, self.model);
        let request = GenerateRequest {
            contents: vec![Content {
                parts: vec![Part { text: prompt }],
            }],
            generation_config: GenerationConfig {
                temperature: 0.7,
                max_output_tokens: 2048,
            },
        };

        let resp = self
            .client
            .post(&url)
            .query(&[("key", api_key)])
            .json(&request)
            .send()
            .await
            .map_err(|e| {
                error!("Gemini network error: {}", e);
                Self::err(format!("network error: {e}"))
            })?;

        if !resp.status().is_success() {
            let status = resp.status();
            let text = resp.text().await.unwrap_or_default();
            error!("Gemini API error: {}", text);
            return Err(Self::err(format!("API error {status}")));
        }

        let data: GenerateResponse = resp
            .json()
            .await
            .map_err(|e| Self::err(format!("unexpected response format: {e}")))?;

        let text = data
            .candidates
            .into_iter()
            .next()
            .and_then(|c| c.content.parts.into_iter().next())
            .map(|p| p.text)
            .ok_or_else(|| Self::err("unexpected response format: no candidates"))?;

        debug!("[Gemini] Response: {:.100}", text);
        Ok(text.trim().to_string())
    }
}
