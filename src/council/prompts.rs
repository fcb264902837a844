//! Canned prompt templates and the slug instruction

/// A selectable starting prompt for the CLI path.
#[derive(Debug, Clone, Copy)]
pub struct PromptTemplate {
    pub id: &'static str,
    pub title: &'static str,
    pub body: &'static str,
}

pub const TEMPLATES: &[PromptTemplate] = &[
    PromptTemplate {
        id: "explain",
        title: "Explain code",
        body: "Explain what this code does and its key behaviors.",
    },
    PromptTemplate {
        id: "debug",
        title: "Debug issue",
        body: "Identify bugs or risky behavior. Point to exact lines and suggest concrete fixes.",
    },
    PromptTemplate {
        id: "review",
        title: "Review code",
        body: "Review this code for correctness, safety, performance, and readability. \
               List findings with file/line and fixes.",
    },
    PromptTemplate {
        id: "summarize",
        title: "Summarize",
        body: "Summarize this code and highlight concerns a reviewer should know.",
    },
];

pub fn find_template(id: &str) -> Option<&'static PromptTemplate> {
    TEMPLATES.iter().find(|t| t.id == id)
}

/// System instruction for the one-off slug-suggestion call.
pub const SLUG_SYSTEM_PROMPT: &str =
    "Suggest a short hyphenated title (3-6 words) for this council run. \
     Reply with the title only: lowercase words separated by hyphens, no punctuation.";

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn templates_are_found_by_id() {
        assert_eq!(find_template("debug").unwrap().title, "Debug issue");
        assert!(find_template("nope").is_none());
    }
}
