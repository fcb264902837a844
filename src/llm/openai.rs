//! OpenAI-compatible streaming client
//!
//! Talks to any `/chat/completions` endpoint that speaks the OpenAI SSE
//! protocol. Deltas are forwarded through the caller's channel as they arrive.

use anyhow::Result;
use async_trait::async_trait;
use futures::StreamExt;
use reqwest::Client;
use serde::Deserialize;
use serde_json::json;
use std::time::Duration;
use tokio::sync::mpsc;

use crate::config::ConclaveConfig;

use super::{ChatMessage, ModelClient};

pub struct OpenAiClient {
    http: Client,
    base_url: String,
    api_key: String,
    timeout: Duration,
}

impl OpenAiClient {
    pub fn from_config(config: &ConclaveConfig) -> Result<Self> {
        let api_key = config
            .api_key
            .clone()
            .ok_or_else(|| anyhow::anyhow!("CONCLAVE_API_KEY (or OPENAI_API_KEY) not set"))?;

        Ok(Self {
            http: Client::new(),
            base_url: config.api_base_url.trim_end_matches('/').to_string(),
            api_key,
            timeout: Duration::from_secs(config.request_timeout_secs),
        })
    }
}

#[derive(Deserialize, Debug)]
struct StreamChunk {
    choices: Option<Vec<StreamChoice>>,
}

#[derive(Deserialize, Debug)]
struct StreamChoice {
    delta: Option<StreamDelta>,
}

#[derive(Deserialize, Debug)]
struct StreamDelta {
    content: Option<String>,
}

#[async_trait]
impl ModelClient for OpenAiClient {
    async fn chat(
        &self,
        model: &str,
        messages: &[ChatMessage],
        chunks: mpsc::Sender<String>,
    ) -> Result<String> {
        let body = json!({
            "model": model,
            "stream": true,
            "messages": messages
                .iter()
                .map(|m| json!({ "role": m.role.as_str(), "content": m.content }))
                .collect::<Vec<_>>(),
        });

        let response = self
            .http
            .post(format!("{}/chat/completions", self.base_url))
            .bearer_auth(&self.api_key)
            .json(&body)
            .timeout(self.timeout)
            .send()
            .await?;

        if !response.status().is_success() {
            let status = response.status();
            let body = response.text().await.unwrap_or_default();
            anyhow::bail!("model backend error for {}: {} - {}", model, status, body);
        }

        let mut full_text = String::new();
        let mut stream = response.bytes_stream();
        let mut buffer = String::new();

        while let Some(chunk_result) = stream.next().await {
            let chunk = chunk_result?;
            buffer.push_str(&String::from_utf8_lossy(&chunk));

            // Process complete SSE lines
            while let Some(line_end) = buffer.find('\n') {
                let line = buffer[..line_end].trim().to_string();
                buffer = buffer[line_end + 1..].to_string();

                if line.is_empty() || line == "data: [DONE]" {
                    continue;
                }

                if let Some(json_str) = line.strip_prefix("data: ") {
                    if let Ok(parsed) = serde_json::from_str::<StreamChunk>(json_str) {
                        for choice in parsed.choices.unwrap_or_default() {
                            if let Some(content) = choice.delta.and_then(|d| d.content) {
                                full_text.push_str(&content);
                                let _ = chunks.send(content).await;
                            }
                        }
                    }
                }
            }
        }

        Ok(full_text)
    }
}
