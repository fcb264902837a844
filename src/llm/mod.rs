//! Model client abstraction
//!
//! A `ModelClient` is the only capability the council needs from a backend:
//! given a model id and a message list, stream partial text chunks through a
//! channel and resolve with the final text. The concrete OpenAI-compatible
//! implementation lives in `openai`.

pub mod openai;

pub use openai::OpenAiClient;

use anyhow::Result;
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use tokio::sync::mpsc;

/// Role of a single conversation message.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ChatRole {
    System,
    User,
}

impl ChatRole {
    pub fn as_str(&self) -> &'static str {
        match self {
            ChatRole::System => "system",
            ChatRole::User => "user",
        }
    }
}

/// One message in a conversation turn sent to a model.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ChatMessage {
    pub role: ChatRole,
    pub content: String,
}

impl ChatMessage {
    pub fn system(content: impl Into<String>) -> Self {
        Self { role: ChatRole::System, content: content.into() }
    }

    pub fn user(content: impl Into<String>) -> Self {
        Self { role: ChatRole::User, content: content.into() }
    }
}

/// Capability contract for one model backend.
///
/// `chat` must send zero or more partial chunks through `chunks` before
/// resolving with the final text. The final text may be empty, in which case
/// the caller falls back to the concatenation of streamed chunks. Sends are
/// best-effort: a dropped receiver must not fail the call.
#[async_trait]
pub trait ModelClient: Send + Sync {
    async fn chat(
        &self,
        model: &str,
        messages: &[ChatMessage],
        chunks: mpsc::Sender<String>,
    ) -> Result<String>;
}
