//! Follow-up question prompt and response parsing.

use std::sync::LazyLock;

use finsight_rag::truncate_chars;
use finsight_session::UserLevel;
use regex::Regex;

use crate::prompt::level_guide;

static QUESTION_TAG: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?s)<question>(.*?)</question>")
        .expect("unreachable error: failed to compile question tag pattern")
});

static LIST_ITEM: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^\s*(?:\d+[.)]|[-*•])\s+(.+?)\s*$")
        .expect("unreachable error: failed to compile list item pattern")
});

/// Build the prompt asking for `count` follow-up questions.
///
/// The reference text combines the question, the answer and at most
/// `max_context_chars` characters of the retrieval context.
pub fn build_followup_prompt(
    level: UserLevel,
    question: &str,
    answer: &str,
    context: Option<&str>,
    max_context_chars: usize,
    count: usize,
) -> String {
    let context = context.map(|c| truncate_chars(c, max_context_chars)).unwrap_or_default();
    let examples: String =
        (1..=count).map(|i| format!("<question>(follow-up question {i})</question>\n")).collect();

    format!(
        "You are a learning coach who sparks the user's curiosity and guides their \
financial literacy.

### Mission
Based on the user level guide and the reference text, write {count} educational \
questions the user is likely to wonder about next.

### User level guide
{guide}

### Reference text
[Original question]
{question}

[Answer]
{answer}

[Context]
{context}

### Rules
- Write questions only, never answers.
- Match the user level guide.
- Only ask about topics mentioned in the reference text.

### Output format
<questions>
{examples}</questions>",
        guide = level_guide(level),
    )
}

/// Extract up to `count` questions from a model response.
///
/// `<question>` tags are preferred; when none are present, numbered or
/// bulleted lines are used instead.
pub fn parse_follow_ups(response: &str, count: usize) -> Vec<String> {
    let tagged: Vec<String> = QUESTION_TAG
        .captures_iter(response)
        .filter_map(|caps| caps.get(1))
        .map(|m| m.as_str().trim().to_string())
        .filter(|q| !q.is_empty())
        .collect();

    let questions = if tagged.is_empty() {
        response
            .lines()
            .filter_map(|line| LIST_ITEM.captures(line))
            .filter_map(|caps| caps.get(1))
            .map(|m| m.as_str().to_string())
            .filter(|q| !q.is_empty())
            .collect()
    } else {
        tagged
    };

    questions.into_iter().take(count).collect()
}
