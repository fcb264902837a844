//! Shared test support: a scripted model client and app-state builder.

use anyhow::Result;
use async_trait::async_trait;
use std::sync::{Arc, Mutex};
use tokio::sync::mpsc;

use conclave::council::HistoryRing;
use conclave::llm::{ChatMessage, ModelClient};
use conclave::server::AppState;

/// Deterministic model backend. The stage is recognized from the system
/// message, the same way the real prompts distinguish stages.
pub struct ScriptedClient {
    /// Recorded model ids, in call order.
    pub calls: Mutex<Vec<String>>,
    /// When set, every call fails with this message.
    pub fail_with: Option<String>,
    /// Per-call latency, for cancellation tests.
    pub delay_ms: u64,
}

impl ScriptedClient {
    pub fn new() -> Self {
        Self { calls: Mutex::new(vec![]), fail_with: None, delay_ms: 0 }
    }

    pub fn failing(message: &str) -> Self {
        Self { fail_with: Some(message.to_string()), ..Self::new() }
    }

    pub fn slow(delay_ms: u64) -> Self {
        Self { delay_ms, ..Self::new() }
    }

    pub fn call_count(&self) -> usize {
        self.calls.lock().unwrap().len()
    }
}

#[async_trait]
impl ModelClient for ScriptedClient {
    async fn chat(
        &self,
        model: &str,
        messages: &[ChatMessage],
        chunks: mpsc::Sender<String>,
    ) -> Result<String> {
        self.calls.lock().unwrap().push(model.to_string());
        if self.delay_ms > 0 {
            tokio::time::sleep(std::time::Duration::from_millis(self.delay_ms)).await;
        }
        if let Some(message) = &self.fail_with {
            anyhow::bail!("{}", message.clone());
        }

        let system = messages.first().map(|m| m.content.as_str()).unwrap_or("");
        let stage = if system.contains("Synthesize") {
            "s3"
        } else if system.contains("Review") {
            "s2"
        } else {
            "s1"
        };

        let text = format!("{}-{}", stage, model);
        let _ = chunks.send(text.clone()).await;
        Ok(text)
    }
}

pub fn app_state(client: Arc<ScriptedClient>) -> AppState {
    AppState {
        client,
        history: Arc::new(tokio::sync::Mutex::new(HistoryRing::new(20))),
        max_models: 3,
        default_model: "gpt-5.1".to_string(),
    }
}
