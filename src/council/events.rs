//! Council event stream - tagged token multiplexing
//!
//! The pipeline runs several model calls concurrently; their token callbacks
//! are funneled through a `TokenSink` so an out-of-order interleaving stays
//! interpretable: every event carries its source stage and model. Transports
//! own write ordering - the pipeline only emits.

use async_trait::async_trait;
use serde::Serialize;
use std::fmt;
use std::io::Write;
use tokio::sync::mpsc;

/// Pipeline stage tag.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum Stage {
    S1,
    S2,
    S3,
}

impl Stage {
    pub fn as_str(&self) -> &'static str {
        match self {
            Stage::S1 => "S1",
            Stage::S2 => "S2",
            Stage::S3 => "S3",
        }
    }
}

impl fmt::Display for Stage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Ordered event stream produced by one council run.
#[derive(Debug, Clone, Serialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum CouncilEvent {
    /// A stage's calls are being dispatched.
    StageStarted { stage: Stage },
    /// A model produced a partial text chunk.
    Delta { stage: Stage, model: String, delta: String },
    /// A model's call for this stage completed successfully.
    ModelDone { stage: Stage, model: String },
    /// The chair's synthesized answer, in full.
    FinalAnswer { model: String, content: String },
    /// The run failed; no further events follow.
    Error { error: String },
    /// The run completed; terminal event.
    Done,
}

/// Sink for council events.
///
/// Implementations decide where events go: an SSE channel, log lines, or
/// nowhere. Emission is fire-and-forget - a sink must never fail the run.
#[async_trait]
pub trait TokenSink: Send + Sync {
    async fn emit(&self, event: CouncilEvent);
}

/// Discards all events. Used by tests and callers that only want the result.
pub struct NoopSink;

#[async_trait]
impl TokenSink for NoopSink {
    async fn emit(&self, _event: CouncilEvent) {}
}

/// Forwards events into an mpsc channel for SSE streaming.
///
/// Send errors are ignored - the receiver may have dropped (client
/// disconnect). Disposing of the run on disconnect belongs to the task that
/// owns it, keyed off `Sender::closed` on a retained sender clone.
pub struct ChannelSink {
    tx: mpsc::Sender<CouncilEvent>,
}

impl ChannelSink {
    pub fn new(tx: mpsc::Sender<CouncilEvent>) -> Self {
        Self { tx }
    }
}

#[async_trait]
impl TokenSink for ChannelSink {
    async fn emit(&self, event: CouncilEvent) {
        let _ = self.tx.send(event).await;
    }
}

/// Writes the token stream as `[stage:model]`-prefixed terminal output.
/// Used by the one-shot CLI path.
pub struct LogSink;

#[async_trait]
impl TokenSink for LogSink {
    async fn emit(&self, event: CouncilEvent) {
        match event {
            CouncilEvent::StageStarted { stage } => {
                tracing::info!(stage = %stage, "stage started");
            }
            CouncilEvent::Delta { stage, model, delta } => {
                if !delta.is_empty() {
                    print!("[{}:{}] {}", stage, model, delta);
                    let _ = std::io::stdout().flush();
                }
            }
            CouncilEvent::ModelDone { stage, model } => {
                println!();
                tracing::info!(stage = %stage, model = %model, "model done");
            }
            CouncilEvent::FinalAnswer { model, .. } => {
                tracing::info!(model = %model, "final answer ready");
            }
            CouncilEvent::Error { error } => {
                tracing::error!(error = %error, "council run failed");
            }
            CouncilEvent::Done => {
                tracing::info!("council run complete");
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn events_serialize_with_stage_and_model_tags() {
        let event = CouncilEvent::Delta {
            stage: Stage::S2,
            model: "gpt-5.1".to_string(),
            delta: "partial".to_string(),
        };
        let json = serde_json::to_value(&event).unwrap();
        assert_eq!(json["type"], "delta");
        assert_eq!(json["stage"], "S2");
        assert_eq!(json["model"], "gpt-5.1");
        assert_eq!(json["delta"], "partial");
    }

    #[tokio::test]
    async fn channel_sink_survives_dropped_receiver() {
        let (tx, rx) = mpsc::channel(1);
        drop(rx);
        let sink = ChannelSink::new(tx);
        // Must not panic or block.
        sink.emit(CouncilEvent::Done).await;
    }
}
