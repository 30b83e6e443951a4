//! Prompt composition for the generation service.
//!
//! Pure string builders with no I/O, so prompt shape is unit-testable
//! without network access. The structured output-format contract is fixed;
//! custom instructions only replace the default instruction block.

use crate::summary::{RunningSummary, SummaryFragment};

/// The output shape the model is required to produce. Kept strict so the
/// schema decode in the response parser succeeds on well-behaved models.
const FORMAT_CONTRACT: &str = r#"Respond with a single JSON object and nothing else. Use exactly these fields:
{
  "content": "a narrative summary of 150-200 words",
  "key_points": ["the most important points discussed"],
  "decisions": ["decisions that were made"],
  "action_items": ["tasks someone committed to"],
  "quotes": ["notable verbatim quotes, without speaker names"],
  "topics": [{"name": "topic name", "points": ["points under this topic"]}]
}
Every list field must be present; use an empty list when there is nothing to report."#;

const DEFAULT_INSTRUCTIONS: &str = "You summarize live meeting transcripts. Be factual and concise; \
never invent information that is not in the transcript.";

/// Builds request payloads for fresh, incremental, and consolidation calls.
#[derive(Debug, Clone, Default)]
pub struct PromptComposer {
    custom_instructions: Option<String>,
}

impl PromptComposer {
    pub fn new() -> Self {
        Self::default()
    }

    /// Replaces the default instruction block with user-supplied free text.
    pub fn with_custom_instructions(mut self, instructions: Option<String>) -> Self {
        self.custom_instructions = instructions.filter(|s| !s.trim().is_empty());
        self
    }

    /// A full structured summary of standalone transcript text.
    pub fn compose_fresh(&self, chunk_text: &str) -> String {
        format!(
            "{instructions}\n\n{contract}\n\nTranscript:\n{chunk_text}",
            instructions = self.instructions(),
            contract = FORMAT_CONTRACT,
        )
    }

    /// An updated structured summary merging new transcript text into the
    /// previous summary rather than duplicating it.
    pub fn compose_incremental(&self, new_chunk_text: &str, previous: &RunningSummary) -> String {
        let previous_json = serde_json::to_string_pretty(&previous.summary)
            .unwrap_or_else(|_| previous.summary.content.clone());
        format!(
            "{instructions}\n\nYou previously produced this summary of the earlier part of the session:\n{previous_json}\n\n\
             Update it with the new transcript below. Merge new information into the existing \
             fields instead of repeating what is already covered.\n\n{contract}\n\nNew transcript:\n{new_chunk_text}",
            instructions = self.instructions(),
            contract = FORMAT_CONTRACT,
        )
    }

    /// Consolidates several per-chunk summaries into one. Used when a cycle
    /// produced more than one fragment; the merger falls back to pure
    /// concatenation if this call fails.
    pub fn compose_consolidation(&self, fragments: &[SummaryFragment]) -> String {
        let mut rendered = String::new();
        for (i, fragment) in fragments.iter().enumerate() {
            let json = serde_json::to_string_pretty(fragment)
                .unwrap_or_else(|_| fragment.content.clone());
            rendered.push_str(&format!("Summary {}:\n{}\n\n", i + 1, json));
        }
        format!(
            "{instructions}\n\nConsolidate the following {count} partial summaries of one session \
             into a single coherent summary. De-duplicate overlapping points.\n\n{contract}\n\n{rendered}",
            instructions = self.instructions(),
            count = fragments.len(),
            contract = FORMAT_CONTRACT,
        )
    }

    fn instructions(&self) -> &str {
        self.custom_instructions
            .as_deref()
            .unwrap_or(DEFAULT_INSTRUCTIONS)
    }
}
