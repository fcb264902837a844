//! Context resolution - what ambient text accompanies the prompt
//!
//! An explicit mode plus fallback heuristics. Notably permissive: an explicit
//! `selection` mode with an empty selection does not error, it falls through
//! to the auto rules.

use clap::ValueEnum;
use serde::Deserialize;

/// Requested context behavior.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Deserialize, ValueEnum)]
#[serde(rename_all = "lowercase")]
pub enum ContextMode {
    #[default]
    Auto,
    File,
    Selection,
    None,
}

/// What actually accompanies the prompt.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ResolvedContext {
    None,
    Selection { text: String },
    File { text: String },
}

impl ResolvedContext {
    pub fn kind(&self) -> &'static str {
        match self {
            ResolvedContext::None => "none",
            ResolvedContext::Selection { .. } => "selection",
            ResolvedContext::File { .. } => "file",
        }
    }

    pub fn text(&self) -> Option<&str> {
        match self {
            ResolvedContext::None => None,
            ResolvedContext::Selection { text } | ResolvedContext::File { text } => Some(text),
        }
    }
}

/// Resolve the context for a run.
///
/// Priority order: explicit `none` overrides everything; explicit `selection`
/// requires a non-empty selection to stick; explicit `file` always wins with
/// the document; `auto` prefers a non-empty selection, then a non-empty
/// document, then nothing.
pub fn choose_context(selection: &str, document: &str, mode: ContextMode) -> ResolvedContext {
    if mode == ContextMode::None {
        return ResolvedContext::None;
    }
    if mode == ContextMode::Selection && !selection.is_empty() {
        return ResolvedContext::Selection { text: selection.to_string() };
    }
    if mode == ContextMode::File {
        return ResolvedContext::File { text: document.to_string() };
    }
    if !selection.is_empty() {
        return ResolvedContext::Selection { text: selection.to_string() };
    }
    if !document.is_empty() {
        return ResolvedContext::File { text: document.to_string() };
    }
    ResolvedContext::None
}
