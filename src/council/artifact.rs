//! Markdown artifact assembly and collision-safe writing
//!
//! One artifact per run: YAML front matter followed by the prompt, the
//! context preview, every model's stage-1 answer and stage-2 review, and the
//! chair's final answer. Filenames collide safely via numeric suffixes.

use anyhow::Result;
use chrono::{DateTime, Utc};
use std::path::{Path, PathBuf};

use super::pipeline::StageMap;

const MAX_FILENAME_ATTEMPTS: usize = 50;

/// Everything the markdown artifact needs from one completed run.
pub struct ArtifactInput<'a> {
    pub slug: &'a str,
    pub prompt: &'a str,
    pub prompt_preview: &'a str,
    pub context_preview: Option<&'a str>,
    pub context_kind: &'a str,
    pub models: &'a [String],
    pub chair: &'a str,
    pub stage1: &'a StageMap,
    pub stage2: &'a StageMap,
    pub final_answer: &'a str,
    pub timestamp: DateTime<Utc>,
    pub version: &'a str,
    pub run_id: Option<&'a str>,
}

/// Flatten to one line and truncate to at most `max` characters, the ellipsis
/// included, for front-matter previews.
pub fn preview(text: &str, max: usize) -> String {
    let one_line = text.replace(['\n', '\r'], " ");
    if one_line.chars().count() <= max {
        return one_line;
    }
    let mut out: String = one_line.chars().take(max.saturating_sub(1)).collect();
    out.push('…');
    out
}

fn quote(value: &str) -> String {
    serde_json::to_string(value).unwrap_or_else(|_| "\"\"".to_string())
}

fn render_block(text: &str) -> String {
    let body = if text.is_empty() { "<empty>" } else { text };
    format!("```\n{}\n```", body)
}

fn render_stage(title: &str, models: &[String], stage: &StageMap) -> String {
    let mut parts = vec![format!("## {}", title)];
    for model in models {
        parts.push(format!("### {}", model));
        parts.push(render_block(stage.get(model).map(String::as_str).unwrap_or("<empty>")));
    }
    parts.join("\n\n")
}

/// Render the full artifact content.
pub fn build_markdown(input: &ArtifactInput<'_>) -> String {
    let mut front_matter = vec![
        "---".to_string(),
        format!("title: {}", quote(input.slug)),
        format!("timestamp: {}", quote(&input.timestamp.to_rfc3339())),
        format!("version: {}", quote(input.version)),
        format!(
            "models: [{}]",
            input.models.iter().map(|m| quote(m)).collect::<Vec<_>>().join(",")
        ),
        format!("chairModel: {}", quote(input.chair)),
        format!("contextKind: {}", quote(input.context_kind)),
        format!("promptPreview: {}", quote(input.prompt_preview)),
        format!("contextPreview: {}", quote(input.context_preview.unwrap_or(""))),
    ];
    if let Some(run_id) = input.run_id {
        front_matter.push(format!("runId: {}", quote(run_id)));
    }
    front_matter.push("---".to_string());

    let context_section = match input.context_preview {
        Some(preview) if !preview.is_empty() => render_block(preview),
        _ => "_No context provided_".to_string(),
    };

    let sections = [
        "## Prompt".to_string(),
        render_block(input.prompt),
        "## Context Preview".to_string(),
        context_section,
        render_stage("Stage 1 Answers", input.models, input.stage1),
        render_stage("Stage 2 Reviews", input.models, input.stage2),
        format!("## Stage 3 Final (chair: {})", input.chair),
        render_block(input.final_answer),
        "## Models Used".to_string(),
        input.models.iter().map(|m| format!("- {}", m)).collect::<Vec<_>>().join("\n"),
    ];

    let mut content = front_matter.join("\n");
    content.push('\n');
    for section in sections {
        content.push('\n');
        content.push_str(&section);
    }
    content
}

/// Write `content` as `<base>.md` inside `dir`, appending `-1`, `-2`, ... on
/// collision. Fails only when all attempts are taken.
pub async fn write_markdown(dir: &Path, filename_base: &str, content: &str) -> Result<PathBuf> {
    tokio::fs::create_dir_all(dir).await?;

    for attempt in 0..MAX_FILENAME_ATTEMPTS {
        let filename = if attempt == 0 {
            format!("{}.md", filename_base)
        } else {
            format!("{}-{}.md", filename_base, attempt)
        };
        let target = dir.join(filename);
        if tokio::fs::try_exists(&target).await? {
            continue;
        }
        tokio::fs::write(&target, content).await?;
        return Ok(target);
    }

    anyhow::bail!("no available filename for markdown artifact '{}'", filename_base)
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;
    use std::collections::BTreeMap;

    fn sample_input<'a>(
        models: &'a [String],
        stage1: &'a StageMap,
        stage2: &'a StageMap,
    ) -> ArtifactInput<'a> {
        ArtifactInput {
            slug: "my-run",
            prompt: "Explain this.",
            prompt_preview: "Explain this.",
            context_preview: Some("fn main() {}"),
            context_kind: "file",
            models,
            chair: "a",
            stage1,
            stage2,
            final_answer: "the final answer",
            timestamp: Utc.with_ymd_and_hms(2024, 1, 2, 3, 4, 5).unwrap(),
            version: "0.2.0",
            run_id: Some("run-1"),
        }
    }

    #[test]
    fn markdown_carries_front_matter_and_all_sections() {
        let models = vec!["a".to_string(), "b".to_string()];
        let stage1: StageMap =
            BTreeMap::from([("a".to_string(), "ans-a".to_string()), ("b".to_string(), "ans-b".to_string())]);
        let stage2: StageMap =
            BTreeMap::from([("a".to_string(), "rev-a".to_string()), ("b".to_string(), "rev-b".to_string())]);

        let content = build_markdown(&sample_input(&models, &stage1, &stage2));

        assert!(content.starts_with("---\ntitle: \"my-run\"\n"));
        assert!(content.contains("chairModel: \"a\""));
        assert!(content.contains("contextKind: \"file\""));
        assert!(content.contains("runId: \"run-1\""));
        assert!(content.contains("## Stage 1 Answers"));
        assert!(content.contains("ans-b"));
        assert!(content.contains("## Stage 2 Reviews"));
        assert!(content.contains("rev-a"));
        assert!(content.contains("## Stage 3 Final (chair: a)"));
        assert!(content.contains("the final answer"));
        assert!(content.contains("- a\n- b"));
    }

    #[test]
    fn missing_stage_entries_render_as_empty() {
        let models = vec!["a".to_string(), "ghost".to_string()];
        let stage1: StageMap = BTreeMap::from([("a".to_string(), "ans".to_string())]);
        let stage2: StageMap = BTreeMap::new();
        let content = build_markdown(&sample_input(&models, &stage1, &stage2));
        assert!(content.contains("### ghost"));
        assert!(content.contains("<empty>"));
    }

    #[test]
    fn preview_truncates_and_flattens() {
        assert_eq!(preview("short", 10), "short");
        assert_eq!(preview("one\ntwo", 10), "one two");
        assert_eq!(preview("abcdef", 3), "ab…");
        assert_eq!(preview("exact", 5), "exact");
        // Never longer than max, ellipsis included.
        assert_eq!(preview("abcdef", 3).chars().count(), 3);
    }

    #[tokio::test]
    async fn collisions_get_numeric_suffixes() {
        let dir = tempfile::tempdir().unwrap();
        let first = write_markdown(dir.path(), "slug", "one").await.unwrap();
        let second = write_markdown(dir.path(), "slug", "two").await.unwrap();
        assert_eq!(first.file_name().unwrap(), "slug.md");
        assert_eq!(second.file_name().unwrap(), "slug-1.md");
        assert_eq!(tokio::fs::read_to_string(&second).await.unwrap(), "two");
    }

    #[tokio::test]
    async fn exhausted_attempts_error_out() {
        let dir = tempfile::tempdir().unwrap();
        tokio::fs::write(dir.path().join("full.md"), "x").await.unwrap();
        for i in 1..50 {
            tokio::fs::write(dir.path().join(format!("full-{}.md", i)), "x").await.unwrap();
        }
        let err = write_markdown(dir.path(), "full", "y").await.unwrap_err();
        assert!(err.to_string().contains("no available filename"));
    }
}
