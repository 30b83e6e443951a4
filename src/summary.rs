//! Structured summary types and their plain-text rendering.

use serde::{Deserialize, Serialize};

/// A named topic with its supporting points.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Default)]
pub struct Topic {
    pub name: String,
    #[serde(default)]
    pub points: Vec<String>,
}

/// The parsed output of one generation call.
///
/// All list fields default to empty — they are never absent.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Default)]
#[serde(default)]
pub struct SummaryFragment {
    /// 150-200 word narrative, clamped to the configured word limit.
    pub content: String,
    pub key_points: Vec<String>,
    pub decisions: Vec<String>,
    pub action_items: Vec<String>,
    /// Quoted lines with speaker attribution stripped.
    pub quotes: Vec<String>,
    pub topics: Vec<Topic>,
}

impl SummaryFragment {
    /// True when nothing useful was recovered from the response.
    pub fn is_empty(&self) -> bool {
        self.content.is_empty()
            && self.key_points.is_empty()
            && self.decisions.is_empty()
            && self.action_items.is_empty()
            && self.quotes.is_empty()
            && self.topics.is_empty()
    }
}

/// The latest merged, user-facing summary state for a session.
///
/// Handed to callers by value so they cannot corrupt pipeline state. Every
/// update either replaces the whole summary (full regeneration) or is
/// produced by the merger from the previous one plus exactly one fragment;
/// `previous_id` is a weak back-reference for lookup only.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RunningSummary {
    pub id: u64,
    pub generated_at_ms: u64,
    pub processing_time_ms: u64,
    pub is_incremental: bool,
    pub previous_id: Option<u64>,
    #[serde(flatten)]
    pub summary: SummaryFragment,
}

impl RunningSummary {
    /// Builds the first (non-incremental) running summary of a session.
    pub fn fresh(id: u64, summary: SummaryFragment, generated_at_ms: u64) -> Self {
        Self {
            id,
            generated_at_ms,
            processing_time_ms: 0,
            is_incremental: false,
            previous_id: None,
            summary,
        }
    }

    /// Plain-text rendering: the portable, human-readable contract used by
    /// export and sharing collaborators.
    pub fn to_plain_text(&self) -> String {
        let mut out = String::new();

        if !self.summary.content.is_empty() {
            out.push_str(&self.summary.content);
            out.push('\n');
        }

        push_section(&mut out, "Key Points", &self.summary.key_points);
        push_section(&mut out, "Decisions", &self.summary.decisions);
        push_section(&mut out, "Action Items", &self.summary.action_items);

        if !self.summary.quotes.is_empty() {
            out.push_str("\nQuotes:\n");
            for quote in &self.summary.quotes {
                out.push_str(&format!("\"{}\"\n", quote));
            }
        }

        if !self.summary.topics.is_empty() {
            out.push_str("\nTopics:\n");
            for topic in &self.summary.topics {
                out.push_str(&format!("{}:\n", topic.name));
                for point in &topic.points {
                    out.push_str(&format!("  - {}\n", point));
                }
            }
        }

        out
    }
}

fn push_section(out: &mut String, title: &str, items: &[String]) {
    if items.is_empty() {
        return;
    }
    out.push_str(&format!("\n{}:\n", title));
    for item in items {
        out.push_str(&format!("- {}\n", item));
    }
}

/// Whitespace-separated word count.
pub fn word_count(text: &str) -> usize {
    text.split_whitespace().count()
}

/// Truncates `text` to at most `max_words` words, appending an ellipsis
/// marker when anything was cut. Whitespace runs collapse to single spaces.
pub fn clamp_words(text: &str, max_words: usize) -> String {
    let words: Vec<&str> = text.split_whitespace().collect();
    if words.len() <= max_words {
        return words.join(" ");
    }
    let mut clamped = words[..max_words].join(" ");
    clamped.push('…');
    clamped
}
