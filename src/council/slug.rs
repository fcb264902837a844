//! Artifact slug generation
//!
//! One extra model call suggests a title; it races a timeout and every failure
//! path lands on the deterministic UTC timestamp slug. Naming a persisted
//! artifact must never fail or block.

use chrono::{DateTime, Utc};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::mpsc;
use tokio::time::timeout;

use crate::llm::{ChatMessage, ModelClient};

use super::prompts::SLUG_SYSTEM_PROMPT;

pub const DEFAULT_SLUG_TIMEOUT_MS: u64 = 3000;
const MAX_SLUG_LEN: usize = 80;

/// Lowercase, collapse non-alphanumeric runs to single hyphens, strip edge
/// hyphens, truncate. Can come out empty - callers fall back upstream.
pub fn sanitize_slug(raw: &str) -> String {
    let mut slug = String::with_capacity(raw.len());
    let mut pending_hyphen = false;
    for c in raw.trim().to_lowercase().chars() {
        if c.is_ascii_alphanumeric() {
            if pending_hyphen && !slug.is_empty() {
                slug.push('-');
            }
            pending_hyphen = false;
            slug.push(c);
        } else {
            pending_hyphen = true;
        }
    }
    slug.truncate(MAX_SLUG_LEN);
    slug
}

/// Deterministic fallback: `council-YYYYMMDD-HHMMSS` in UTC.
pub fn timestamp_slug(ts: DateTime<Utc>) -> String {
    format!("council-{}", ts.format("%Y%m%d-%H%M%S"))
}

pub struct SlugOptions<'a> {
    pub model: &'a str,
    pub prompt: &'a str,
    pub context_preview: Option<&'a str>,
    pub timeout_ms: u64,
    pub now: DateTime<Utc>,
}

/// Ask the model for a slug, sanitized; any error, timeout, or
/// empty-after-sanitize result falls back to the timestamp slug.
pub async fn generate_slug(client: Arc<dyn ModelClient>, opts: SlugOptions<'_>) -> String {
    let fallback = timestamp_slug(opts.now);

    let messages = vec![
        ChatMessage::system(SLUG_SYSTEM_PROMPT),
        ChatMessage::user(format!(
            "Prompt: {}\nContext preview: {}",
            opts.prompt,
            opts.context_preview.unwrap_or("<none>")
        )),
    ];

    // The suggestion call streams too; drain its chunks into nowhere.
    let (tx, mut rx) = mpsc::channel::<String>(16);
    let drain = tokio::spawn(async move { while rx.recv().await.is_some() {} });

    let result = timeout(
        Duration::from_millis(opts.timeout_ms),
        client.chat(opts.model, &messages, tx),
    )
    .await;
    let _ = drain.await;

    match result {
        Ok(Ok(suggestion)) => {
            let sanitized = sanitize_slug(&suggestion);
            if sanitized.is_empty() {
                tracing::warn!(fallback = %fallback, "slug suggestion was empty");
                fallback
            } else {
                tracing::debug!(suggestion = %suggestion, slug = %sanitized, "slug accepted");
                sanitized
            }
        }
        Ok(Err(e)) => {
            tracing::warn!(error = %e, fallback = %fallback, "slug generation failed");
            fallback
        }
        Err(_) => {
            tracing::warn!(timeout_ms = opts.timeout_ms, fallback = %fallback, "slug generation timed out");
            fallback
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use anyhow::Result;
    use chrono::TimeZone;

    #[test]
    fn sanitize_collapses_runs_and_strips_edges() {
        assert_eq!(sanitize_slug("My Awesome Idea!!"), "my-awesome-idea");
        assert_eq!(sanitize_slug("  --Hello,  World--  "), "hello-world");
        assert_eq!(sanitize_slug("???"), "");
        assert_eq!(sanitize_slug("already-fine"), "already-fine");
    }

    #[test]
    fn sanitize_truncates_to_eighty() {
        let long = "x".repeat(200);
        assert_eq!(sanitize_slug(&long).len(), 80);
    }

    #[test]
    fn timestamp_slug_is_utc_formatted() {
        let ts = Utc.with_ymd_and_hms(2024, 1, 2, 3, 4, 5).unwrap();
        assert_eq!(timestamp_slug(ts), "council-20240102-030405");
    }

    struct FailingClient;
    #[async_trait::async_trait]
    impl ModelClient for FailingClient {
        async fn chat(
            &self,
            _model: &str,
            _messages: &[ChatMessage],
            _chunks: mpsc::Sender<String>,
        ) -> Result<String> {
            anyhow::bail!("backend down")
        }
    }

    struct WhitespaceClient;
    #[async_trait::async_trait]
    impl ModelClient for WhitespaceClient {
        async fn chat(
            &self,
            _model: &str,
            _messages: &[ChatMessage],
            _chunks: mpsc::Sender<String>,
        ) -> Result<String> {
            Ok("   \n  ".to_string())
        }
    }

    fn opts(now: DateTime<Utc>) -> SlugOptions<'static> {
        SlugOptions {
            model: "gpt-5.1",
            prompt: "prompt",
            context_preview: None,
            timeout_ms: 100,
            now,
        }
    }

    #[tokio::test]
    async fn failing_call_falls_back_to_timestamp() {
        let now = Utc.with_ymd_and_hms(2024, 1, 2, 3, 4, 5).unwrap();
        let slug = generate_slug(Arc::new(FailingClient), opts(now)).await;
        assert_eq!(slug, "council-20240102-030405");
    }

    #[tokio::test]
    async fn whitespace_suggestion_falls_back_to_timestamp() {
        let now = Utc.with_ymd_and_hms(2024, 1, 2, 3, 4, 5).unwrap();
        let slug = generate_slug(Arc::new(WhitespaceClient), opts(now)).await;
        assert_eq!(slug, "council-20240102-030405");
    }

    struct SlowClient;
    #[async_trait::async_trait]
    impl ModelClient for SlowClient {
        async fn chat(
            &self,
            _model: &str,
            _messages: &[ChatMessage],
            _chunks: mpsc::Sender<String>,
        ) -> Result<String> {
            tokio::time::sleep(Duration::from_secs(30)).await;
            Ok("too-late".to_string())
        }
    }

    #[tokio::test]
    async fn timeout_falls_back_to_timestamp() {
        let now = Utc.with_ymd_and_hms(2024, 1, 2, 3, 4, 5).unwrap();
        let mut o = opts(now);
        o.timeout_ms = 10;
        let slug = generate_slug(Arc::new(SlowClient), o).await;
        assert_eq!(slug, "council-20240102-030405");
    }
}
