//! Chat-completions client for the analysis collaborator. The model's
//! output is opaque text; callers store it, they do not interpret it.

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};

use crate::config::{DashboardConfig, LLM_REQUEST_TIMEOUT_SECS};

#[derive(Clone)]
pub struct LlmClient {
    client: reqwest::Client,
    base_url: String,
    model: String,
    api_key: Option<String>,
}

#[derive(Debug, Serialize)]
struct ChatRequest {
    model: String,
    messages: Vec<ChatMessage>,
}

#[derive(Debug, Serialize, Deserialize)]
struct ChatMessage {
    role: String,
    content: String,
}

#[derive(Debug, Deserialize)]
struct ChatResponse {
    choices: Vec<ChatChoice>,
}

#[derive(Debug, Deserialize)]
struct ChatChoice {
    message: ChatMessage,
}

impl LlmClient {
    /// `None` when no endpoint is configured; analysis stays disabled.
    pub fn from_config(config: &DashboardConfig) -> Result<Option<Self>> {
        let Some(base_url) = &config.llm_endpoint else {
            return Ok(None);
        };
        let client = reqwest::Client::builder()
            .timeout(std::time::Duration::from_secs(LLM_REQUEST_TIMEOUT_SECS))
            .build()?;
        Ok(Some(Self {
            client,
            base_url: base_url.trim_end_matches('/').to_string(),
            model: config.llm_model.clone(),
            api_key: config.llm_api_key.clone(),
        }))
    }

    /// One system + user exchange; returns the first choice's content.
    pub async fn summarize(&self, system: &str, prompt: &str) -> Result<String> {
        let req = ChatRequest {
            model: self.model.clone(),
            messages: vec![
                ChatMessage {
                    role: "system".to_string(),
                    content: system.to_string(),
                },
                ChatMessage {
                    role: "user".to_string(),
                    content: prompt.to_string(),
                },
            ],
        };

        tracing::debug!(
            model = %self.model,
            prompt_length = prompt.len(),
            "Calling LLM endpoint"
        );

        let mut request = self
            .client
            .post(format!("{}/chat/completions", self.base_url))
            .json(&req);
        if let Some(key) = &self.api_key {
            request = request.header("Authorization", format!("Bearer {key}"));
        }

        let resp = request
            .send()
            .await
            .context("Failed to send request to LLM endpoint")?;

        if !resp.status().is_success() {
            let status = resp.status();
            let body = resp.text().await.unwrap_or_default();
            anyhow::bail!("LLM endpoint returned {}: {}", status, body);
        }

        let chat: ChatResponse = resp
            .json()
            .await
            .context("Failed to parse LLM response")?;

        chat.choices
            .into_iter()
            .next()
            .map(|c| c.message.content)
            .ok_or_else(|| anyhow::anyhow!("Empty response from LLM endpoint"))
    }
}
