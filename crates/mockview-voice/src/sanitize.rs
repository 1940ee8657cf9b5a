//! Display markup to spoken text.
//!
//! Completions come back as light markdown meant for a chat bubble. Before
//! a speech provider sees the text, emphasis markers are dropped, links
//! collapse to their label, bullet line breaks become comma-separated
//! clauses, and any remaining newline becomes a space.

use regex::Regex;
use std::sync::LazyLock;

struct Rule {
    pattern: Regex,
    replacement: &'static str,
}

static RULES: LazyLock<Vec<Rule>> = LazyLock::new(|| {
    [
        (r"\*\*([^*]+)\*\*", "$1"),
        (r"\*([^*]+)\*", "$1"),
        (r"\[(.*?)\]\(.*?\)", "$1"),
        (r"\n- ", ", "),
        (r"\n", " "),
    ]
    .into_iter()
    .map(|(pattern, replacement)| Rule {
        pattern: Regex::new(pattern).expect("speech markup pattern must compile"),
        replacement,
    })
    .collect()
});

/// Strips display markup so `text` reads naturally when spoken.
pub fn speech_text(text: &str) -> String {
    RULES.iter().fold(text.to_string(), |acc, rule| {
        rule.pattern.replace_all(&acc, rule.replacement).into_owned()
    })
}
