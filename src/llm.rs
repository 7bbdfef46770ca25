//! Client for the hosted language model.

use async_trait::async_trait;
use serde_json::{ json, Value };
use log::debug;

use crate::config::ServiceConfig;
use crate::error::{ Error, Result };

/// Fixed generation cap for query output.
pub const MAX_COMPLETION_TOKENS: u32 = 1000;

/// Seam to the hosted language model. The service depends on this trait so
/// callers and tests can substitute their own completion source.
#[async_trait]
pub trait LanguageModel: Send + Sync {
    /// Submit `prompt` as a single user turn and return the raw text of the
    /// first response choice.
    async fn complete(&self, prompt: &str) -> Result<String>;
}

/// Chat-completion client for OpenRouter-compatible endpoints.
pub struct OpenRouterClient {
    client: reqwest::Client,
    base_url: String,
    api_key: String,
    model: String,
    site_url: Option<String>,
    site_name: Option<String>,
}

impl OpenRouterClient {
    pub fn new(config: &ServiceConfig) -> Self {
        Self {
            client: reqwest::Client::new(),
            base_url: config.base_url.trim_end_matches('/').to_string(),
            api_key: config.api_key.clone(),
            model: config.model.clone(),
            site_url: config.site_url.clone(),
            site_name: config.site_name.clone(),
        }
    }
}

#[async_trait]
impl LanguageModel for OpenRouterClient {
    async fn complete(&self, prompt: &str) -> Result<String> {
        let body = json!({
            "model": self.model,
            "messages": [{ "role": "user", "content": prompt }],
            "max_tokens": MAX_COMPLETION_TOKENS,
        });

        let url = format!("{}/chat/completions", self.base_url);
        let mut request = self.client
            .post(&url)
            .header("Authorization", format!("Bearer {}", self.api_key))
            .json(&body);
        if let Some(site_url) = &self.site_url {
            request = request.header("HTTP-Referer", site_url);
        }
        if let Some(site_name) = &self.site_name {
            request = request.header("X-Title", site_name);
        }

        debug!("Submitting prompt to {} (model {})", url, self.model);
        let response = request.send().await?;
        let status = response.status();
        if !status.is_success() {
            let message = response.text().await.unwrap_or_default();
            return Err(Error::Api {
                status: status.as_u16(),
                message,
            });
        }

        let payload: Value = response.json().await?;
        let content = payload["choices"]
            .get(0)
            .and_then(|choice| choice["message"]["content"].as_str())
            .ok_or_else(|| Error::MalformedResponse("no choices in response".to_string()))?;
        Ok(content.to_string())
    }
}
