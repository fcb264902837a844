//! Council pipeline - the three-stage orchestrator
//!
//! Stage 1: every model answers the same prompt, concurrently.
//! Stage 2: every model reviews the full stage-1 map, concurrently.
//! Stage 3: the chair alone synthesizes the final answer.
//!
//! Stages are strictly sequential: stage N+1's messages are not even
//! constructed until every stage-N call has settled. One failing call aborts
//! the whole run; the transport surfaces it as a single error event.

use anyhow::Result;
use futures::future::try_join_all;
use serde_json::json;
use std::collections::BTreeMap;
use std::sync::Arc;
use thiserror::Error;
use tokio::sync::mpsc;

use crate::llm::{ChatMessage, ModelClient};

use super::events::{CouncilEvent, Stage, TokenSink};

/// Per-stage output, keyed by model id.
pub type StageMap = BTreeMap<String, String>;

/// Validated inputs for one council run.
///
/// The chair is always explicit here; callers that default it to the first
/// selected model do so at their own boundary.
#[derive(Debug, Clone)]
pub struct RunInputs {
    pub prompt: String,
    pub context_text: Option<String>,
    pub models: Vec<String>,
    pub chair: String,
}

/// Input-validation failures, surfaced before any model call is made.
#[derive(Debug, Error, PartialEq)]
pub enum CouncilError {
    #[error("Prompt is required.")]
    BlankPrompt,
    #[error("At least one model is required.")]
    NoModels,
    #[error("At most {max} council models are allowed (got {got}).")]
    TooManyModels { max: usize, got: usize },
    #[error("Chair model '{0}' is not part of the council.")]
    ChairNotMember(String),
}

impl RunInputs {
    pub fn validate(&self, max_models: usize) -> Result<(), CouncilError> {
        if self.prompt.trim().is_empty() {
            return Err(CouncilError::BlankPrompt);
        }
        if self.models.is_empty() {
            return Err(CouncilError::NoModels);
        }
        if self.models.len() > max_models {
            return Err(CouncilError::TooManyModels { max: max_models, got: self.models.len() });
        }
        if !self.models.contains(&self.chair) {
            return Err(CouncilError::ChairNotMember(self.chair.clone()));
        }
        Ok(())
    }
}

/// Result of a completed run. Immutable once returned.
#[derive(Debug, Clone)]
pub struct StageResult {
    pub stage1: StageMap,
    pub stage2: StageMap,
    pub final_answer: String,
}

/// One streamed model call: chunks are tagged and forwarded to the sink while
/// a private accumulator collects them. The final text wins when non-empty;
/// otherwise the concatenated chunks stand in for it.
async fn call_streaming(
    client: Arc<dyn ModelClient>,
    sink: Arc<dyn TokenSink>,
    stage: Stage,
    model: String,
    messages: Vec<ChatMessage>,
) -> Result<String> {
    let (tx, mut rx) = mpsc::channel::<String>(64);

    let forward = {
        let sink = sink.clone();
        let model = model.clone();
        tokio::spawn(async move {
            let mut collected = String::new();
            while let Some(chunk) = rx.recv().await {
                collected.push_str(&chunk);
                sink.emit(CouncilEvent::Delta { stage, model: model.clone(), delta: chunk })
                    .await;
            }
            collected
        })
    };

    // `chat` owns the sender; when it returns, the channel closes and the
    // forwarding task drains whatever is left.
    let final_text = client.chat(&model, &messages, tx).await;
    let collected = forward.await.unwrap_or_default();
    let final_text = final_text?;

    sink.emit(CouncilEvent::ModelDone { stage, model }).await;

    Ok(if final_text.is_empty() { collected } else { final_text })
}

/// Run one stage across all participating models concurrently.
///
/// This is a hard barrier: the map is only available once every launched call
/// has settled, and the first failure aborts the stage (in-flight siblings are
/// dropped with it).
async fn run_stage(
    client: &Arc<dyn ModelClient>,
    sink: &Arc<dyn TokenSink>,
    stage: Stage,
    models: &[String],
    messages: &[ChatMessage],
) -> Result<StageMap> {
    sink.emit(CouncilEvent::StageStarted { stage }).await;

    let calls = models.iter().map(|model| {
        let client = client.clone();
        let sink = sink.clone();
        let model = model.clone();
        let messages = messages.to_vec();
        async move {
            let text = call_streaming(client, sink, stage, model.clone(), messages).await?;
            Ok::<(String, String), anyhow::Error>((model, text))
        }
    });

    Ok(try_join_all(calls).await?.into_iter().collect())
}

/// Run the full three-stage council deliberation.
///
/// Returns a `StageResult` whose `stage1` and `stage2` keys are exactly
/// `inputs.models` and whose `final_answer` is the chair's stage-3 output.
pub async fn run_council(
    inputs: &RunInputs,
    client: Arc<dyn ModelClient>,
    sink: Arc<dyn TokenSink>,
    max_models: usize,
) -> Result<StageResult> {
    inputs.validate(max_models)?;

    // Stage 1: identical conversation to every model.
    let base_messages = vec![
        ChatMessage::system(format!(
            "You are participating in a council with: {}",
            inputs.models.join(", ")
        )),
        ChatMessage::user(match &inputs.context_text {
            Some(context) => format!("{}\nContext:\n{}", inputs.prompt, context),
            None => inputs.prompt.clone(),
        }),
    ];
    let stage1 = run_stage(&client, &sink, Stage::S1, &inputs.models, &base_messages).await?;

    // Stage 2: every model sees every stage-1 answer, its own included.
    let review_messages = vec![
        ChatMessage::system("Review answers and identify the strongest response."),
        ChatMessage::user(serde_json::to_string(&stage1)?),
    ];
    let stage2 = run_stage(&client, &sink, Stage::S2, &inputs.models, &review_messages).await?;

    // Stage 3: chair only.
    sink.emit(CouncilEvent::StageStarted { stage: Stage::S3 }).await;
    let synthesis_messages = vec![
        ChatMessage::system("Synthesize the best answer concisely."),
        ChatMessage::user(
            json!({
                "prompt": inputs.prompt,
                "context": inputs.context_text,
                "stage1": stage1,
                "stage2": stage2,
            })
            .to_string(),
        ),
    ];
    let final_answer = call_streaming(
        client.clone(),
        sink.clone(),
        Stage::S3,
        inputs.chair.clone(),
        synthesis_messages,
    )
    .await?;

    sink.emit(CouncilEvent::FinalAnswer {
        model: inputs.chair.clone(),
        content: final_answer.clone(),
    })
    .await;

    Ok(StageResult { stage1, stage2, final_answer })
}
