//! Model directory and resolution
//!
//! Turns desired model ids plus the set of currently available models into a
//! concrete ordered selection: desired hits first (in desired order), then the
//! best remaining models by quality. A previously saved selection is sticky -
//! it wins outright as long as every saved id is still available.

use serde::Serialize;
use std::cmp::Ordering;

/// One entry in the model directory.
#[derive(Debug, Clone, Serialize)]
pub struct ModelInfo {
    pub id: String,
    pub name: String,
    #[serde(skip_serializing)]
    pub quality: f32,
}

impl ModelInfo {
    pub fn new(id: &str, name: &str, quality: f32) -> Self {
        Self { id: id.to_string(), name: name.to_string(), quality }
    }
}

/// The model directory served by `/api/models` and used for fallback ranking.
pub fn catalog() -> Vec<ModelInfo> {
    vec![
        ModelInfo::new("gpt-5.2", "GPT-5.2", 0.95),
        ModelInfo::new("gpt-5.1", "GPT-5.1", 0.90),
        ModelInfo::new("gpt-5", "GPT-5", 0.85),
        ModelInfo::new("gpt-4.1", "GPT-4.1", 0.70),
        ModelInfo::new("claude-opus-4.5", "Claude Opus 4.5", 0.95),
        ModelInfo::new("claude-sonnet-4.5", "Claude Sonnet 4.5", 0.90),
        ModelInfo::new("claude-haiku-4.5", "Claude Haiku 4.5", 0.60),
        ModelInfo::new("gemini-3-pro", "Gemini 3 Pro", 0.92),
        ModelInfo::new("gemini-2.5-pro", "Gemini 2.5 Pro", 0.80),
    ]
}

/// Pick up to `max` models, preferring the desired ids in their given order,
/// then filling remaining slots from the other available models ranked by
/// descending quality. Available models outside `desired` are never
/// considered once enough preferred hits exist.
pub fn pick_default_models(desired: &[String], available: &[ModelInfo], max: usize) -> Vec<String> {
    let desired_hits: Vec<String> = desired
        .iter()
        .filter(|id| available.iter().any(|m| &m.id == *id))
        .cloned()
        .collect();

    if desired_hits.len() >= max {
        return desired_hits[..max].to_vec();
    }

    let mut remaining: Vec<&ModelInfo> =
        available.iter().filter(|m| !desired_hits.contains(&m.id)).collect();
    remaining.sort_by(|a, b| b.quality.partial_cmp(&a.quality).unwrap_or(Ordering::Equal));

    let mut picked = desired_hits;
    picked.extend(remaining.into_iter().map(|m| m.id.clone()));
    picked.truncate(max);
    picked
}

/// Sticky selection, else quality-ranked fallback: a saved selection wins
/// outright when every saved id is still available; otherwise fall back to
/// `pick_default_models`. No merging between the two.
pub fn resolve_initial_models(
    saved: &[String],
    desired: &[String],
    available: &[ModelInfo],
    max: usize,
) -> Vec<String> {
    if !saved.is_empty() && saved.iter().all(|id| available.iter().any(|m| &m.id == id)) {
        return saved.to_vec();
    }
    pick_default_models(desired, available, max)
}
