//! REST + SSE handlers
//!
//! The council endpoint is the stream multiplexer's web variant: the pipeline
//! emits tagged events into a channel, a spawned task owns the run, and this
//! handler alone writes to the response stream - single-writer discipline.
//! Validation failures reject with 400 before any model call is made.

use axum::{
    extract::State,
    http::StatusCode,
    response::{
        sse::{Event, KeepAlive, Sse},
        Json,
    },
};
use chrono::Utc;
use futures::stream::Stream;
use serde::{Deserialize, Serialize};
use serde_json::json;
use std::convert::Infallible;
use std::sync::Arc;
use tokio::sync::mpsc;
use uuid::Uuid;

use crate::council::{
    catalog, run_council, ChannelSink, CouncilEvent, RunInputs, RunSummary, TokenSink,
};
use crate::llm::{ChatMessage, ModelClient};

use super::AppState;

/// Error body for all 4xx/5xx responses.
#[derive(Serialize)]
pub struct ErrorResponse {
    pub error: String,
}

impl ErrorResponse {
    pub fn new(msg: impl Into<String>) -> Self {
        Self { error: msg.into() }
    }
}

type ApiError = (StatusCode, Json<ErrorResponse>);

fn bad_request(msg: impl Into<String>) -> ApiError {
    (StatusCode::BAD_REQUEST, Json(ErrorResponse::new(msg)))
}

// ============================================================================
// GET /api/models
// ============================================================================

pub async fn models_handler() -> Json<serde_json::Value> {
    let models: Vec<_> = catalog()
        .into_iter()
        .map(|m| json!({ "id": m.id, "name": m.name }))
        .collect();
    Json(json!({ "models": models }))
}

// ============================================================================
// GET /api/history
// ============================================================================

pub async fn history_handler(State(state): State<AppState>) -> Json<serde_json::Value> {
    let runs = state.history.lock().await.all();
    Json(json!({ "runs": runs }))
}

// ============================================================================
// POST /api/ask
// ============================================================================

#[derive(Debug, Deserialize)]
pub struct AskRequest {
    #[serde(default)]
    pub prompt: String,
}

/// Run one non-streaming call against the default model, collecting the
/// streamed chunks as the fallback for an empty final text.
async fn collect_chat(
    client: Arc<dyn ModelClient>,
    model: &str,
    messages: &[ChatMessage],
) -> anyhow::Result<String> {
    let (tx, mut rx) = mpsc::channel::<String>(64);
    let collect = tokio::spawn(async move {
        let mut collected = String::new();
        while let Some(chunk) = rx.recv().await {
            collected.push_str(&chunk);
        }
        collected
    });
    let final_text = client.chat(model, messages, tx).await;
    let collected = collect.await.unwrap_or_default();
    let final_text = final_text?;
    Ok(if final_text.is_empty() { collected } else { final_text })
}

pub async fn ask_handler(
    State(state): State<AppState>,
    Json(request): Json<AskRequest>,
) -> Result<Json<serde_json::Value>, ApiError> {
    if request.prompt.trim().is_empty() {
        return Err(bad_request("Prompt is required."));
    }

    let messages = vec![ChatMessage::user(request.prompt)];
    let content = collect_chat(state.client.clone(), &state.default_model, &messages)
        .await
        .map_err(|e| {
            tracing::error!(error = %e, "ask failed");
            (StatusCode::BAD_GATEWAY, Json(ErrorResponse::new(e.to_string())))
        })?;

    Ok(Json(json!({ "content": content })))
}

// ============================================================================
// POST /api/stream
// ============================================================================

#[derive(Debug, Deserialize)]
pub struct StreamRequest {
    #[serde(default)]
    pub prompt: String,
}

enum StreamFrame {
    Delta(String),
    Content(String),
    Failed(String),
}

pub async fn stream_handler(
    State(state): State<AppState>,
    Json(request): Json<StreamRequest>,
) -> Result<Sse<impl Stream<Item = Result<Event, Infallible>>>, ApiError> {
    if request.prompt.trim().is_empty() {
        return Err(bad_request("Prompt is required."));
    }

    let (tx, mut rx) = mpsc::channel::<StreamFrame>(64);
    let client = state.client.clone();
    let model = state.default_model.clone();
    let messages = vec![ChatMessage::user(request.prompt)];

    tokio::spawn(async move {
        let (chunk_tx, mut chunk_rx) = mpsc::channel::<String>(64);
        let forward = {
            let tx = tx.clone();
            tokio::spawn(async move {
                let mut collected = String::new();
                while let Some(chunk) = chunk_rx.recv().await {
                    collected.push_str(&chunk);
                    let _ = tx.send(StreamFrame::Delta(chunk)).await;
                }
                collected
            })
        };

        let result = client.chat(&model, &messages, chunk_tx).await;
        let collected = forward.await.unwrap_or_default();
        match result {
            Ok(text) => {
                let content = if text.is_empty() { collected } else { text };
                let _ = tx.send(StreamFrame::Content(content)).await;
            }
            Err(e) => {
                tracing::error!(error = %e, "stream failed");
                let _ = tx.send(StreamFrame::Failed(e.to_string())).await;
            }
        }
    });

    let stream = async_stream::stream! {
        while let Some(frame) = rx.recv().await {
            match frame {
                StreamFrame::Delta(delta) => {
                    yield Ok(Event::default().data(json!({ "delta": delta }).to_string()));
                }
                StreamFrame::Content(content) => {
                    yield Ok(Event::default().data(json!({ "content": content }).to_string()));
                    yield Ok(Event::default().event("done").data("{}"));
                    break;
                }
                StreamFrame::Failed(error) => {
                    yield Ok(Event::default().data(json!({ "error": error }).to_string()));
                    break;
                }
            }
        }
    };

    Ok(Sse::new(stream).keep_alive(KeepAlive::default()))
}

// ============================================================================
// POST /api/council
// ============================================================================

#[derive(Debug, Deserialize)]
pub struct CouncilRequest {
    #[serde(default)]
    pub prompt: String,
    #[serde(default)]
    pub models: Vec<String>,
    /// Explicit chair; defaults to the first selected model.
    pub chair: Option<String>,
    /// Optional ambient text appended to the prompt.
    pub context: Option<String>,
}

pub async fn council_handler(
    State(state): State<AppState>,
    Json(request): Json<CouncilRequest>,
) -> Result<Sse<impl Stream<Item = Result<Event, Infallible>>>, ApiError> {
    let chair = match request.chair {
        Some(chair) => chair,
        None => request.models.first().cloned().unwrap_or_default(),
    };
    let inputs = RunInputs {
        prompt: request.prompt,
        context_text: request.context.filter(|c| !c.is_empty()),
        models: request.models,
        chair,
    };
    inputs.validate(state.max_models).map_err(|e| bad_request(e.to_string()))?;

    let (tx, mut rx) = mpsc::channel::<CouncilEvent>(256);
    let disconnect = tx.clone();
    let sink = Arc::new(ChannelSink::new(tx));
    let client = state.client.clone();
    let history = state.history.clone();
    let max_models = state.max_models;

    // The run is tied to the connection: when the client drops the SSE
    // stream the receiver closes, and the pipeline future is dropped with
    // every in-flight model session. Nothing from an abandoned run reaches
    // history.
    tokio::spawn(async move {
        tokio::select! {
            result = run_council(&inputs, client, sink.clone(), max_models) => match result {
                Ok(result) => {
                    history.lock().await.append(RunSummary {
                        id: Uuid::new_v4().to_string(),
                        prompt: inputs.prompt.clone(),
                        models: inputs.models.clone(),
                        final_answer: result.final_answer.clone(),
                        ts: Utc::now(),
                    });
                    sink.emit(CouncilEvent::Done).await;
                }
                Err(e) => {
                    tracing::error!(error = %e, "council run failed");
                    sink.emit(CouncilEvent::Error { error: e.to_string() }).await;
                }
            },
            _ = disconnect.closed() => {
                tracing::info!("client disconnected, council run aborted");
            }
        }
    });

    // Translate pipeline events into wire frames. This handler is the only
    // writer on the response stream.
    let stream = async_stream::stream! {
        while let Some(event) = rx.recv().await {
            match event {
                CouncilEvent::StageStarted { .. } => continue,
                CouncilEvent::Delta { stage, model, delta } => {
                    yield Ok(Event::default()
                        .data(json!({ "stage": stage, "model": model, "delta": delta }).to_string()));
                }
                CouncilEvent::ModelDone { stage, model } => {
                    yield Ok(Event::default()
                        .data(json!({ "stage": stage, "model": model, "done": true }).to_string()));
                }
                CouncilEvent::FinalAnswer { model, content } => {
                    yield Ok(Event::default()
                        .data(json!({ "model": model, "content": content }).to_string()));
                }
                CouncilEvent::Error { error } => {
                    yield Ok(Event::default().data(json!({ "error": error }).to_string()));
                    break;
                }
                CouncilEvent::Done => {
                    yield Ok(Event::default().event("done").data("{}"));
                    break;
                }
            }
        }
    };

    Ok(Sse::new(stream).keep_alive(KeepAlive::default()))
}
