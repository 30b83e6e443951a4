//! Merges summary fragments into each other and into the running summary.
//!
//! List fields merge by case-insensitive, whitespace-trimmed set union that
//! preserves first-seen casing and insertion order, capped to bound growth
//! over long sessions. Merging never silently drops previously-surfaced
//! items (up to the cap).

use crate::config::MergeConfig;
use crate::summary::{RunningSummary, SummaryFragment, Topic, clamp_words};
use std::collections::HashSet;

/// Identity and timing for a newly produced running summary.
#[derive(Debug, Clone, Copy)]
pub struct SummaryStamp {
    pub id: u64,
    pub generated_at_ms: u64,
    pub processing_time_ms: u64,
}

pub struct SummaryMerger {
    config: MergeConfig,
}

impl SummaryMerger {
    pub fn new(config: MergeConfig) -> Self {
        Self { config }
    }

    /// Combines several fragments from one batch into one, without a further
    /// model consolidation pass: contents concatenate and re-clamp, lists
    /// union. This is the pure fallback path; the orchestrator prefers an
    /// extra consolidation call when the scheduler is available.
    pub fn merge_many(&self, fragments: &[SummaryFragment]) -> SummaryFragment {
        let mut merged = SummaryFragment::default();
        let mut contents: Vec<&str> = Vec::new();

        for fragment in fragments {
            if !fragment.content.is_empty() {
                contents.push(&fragment.content);
            }
            merged.key_points =
                union_capped(&merged.key_points, &fragment.key_points, self.config.max_key_points);
            merged.decisions =
                union_capped(&merged.decisions, &fragment.decisions, self.config.max_decisions);
            merged.action_items = union_capped(
                &merged.action_items,
                &fragment.action_items,
                self.config.max_action_items,
            );
            merged.quotes = union_capped(&merged.quotes, &fragment.quotes, self.config.max_quotes);
            merged.topics =
                union_topics(&merged.topics, &fragment.topics, self.config.max_topics);
        }

        merged.content = clamp_words(&contents.join(" "), self.config.max_content_words);
        merged
    }

    /// Produces the next running summary from the previous one plus exactly
    /// one new fragment.
    ///
    /// The new fragment's narrative (produced against the previous summary by
    /// the incremental prompt) replaces the old one when present; list fields
    /// union with the previous summary's entries first so nothing a user has
    /// already seen disappears.
    pub fn merge_incremental(
        &self,
        previous: &RunningSummary,
        new_fragment: SummaryFragment,
        stamp: SummaryStamp,
    ) -> RunningSummary {
        let prev = &previous.summary;
        let content = if new_fragment.content.is_empty() {
            prev.content.clone()
        } else {
            clamp_words(&new_fragment.content, self.config.max_content_words)
        };

        RunningSummary {
            id: stamp.id,
            generated_at_ms: stamp.generated_at_ms,
            processing_time_ms: stamp.processing_time_ms,
            is_incremental: true,
            previous_id: Some(previous.id),
            summary: SummaryFragment {
                content,
                key_points: union_capped(
                    &prev.key_points,
                    &new_fragment.key_points,
                    self.config.max_key_points,
                ),
                decisions: union_capped(
                    &prev.decisions,
                    &new_fragment.decisions,
                    self.config.max_decisions,
                ),
                action_items: union_capped(
                    &prev.action_items,
                    &new_fragment.action_items,
                    self.config.max_action_items,
                ),
                quotes: union_capped(&prev.quotes, &new_fragment.quotes, self.config.max_quotes),
                topics: union_topics(&prev.topics, &new_fragment.topics, self.config.max_topics),
            },
        }
    }
}

fn normalize(text: &str) -> String {
    text.trim().to_lowercase()
}

/// Set-union by case-insensitive trimmed equality, preserving first-seen
/// original casing and insertion order, truncated to `cap`.
fn union_capped(base: &[String], additions: &[String], cap: usize) -> Vec<String> {
    let mut seen = HashSet::new();
    let mut out = Vec::new();
    for item in base.iter().chain(additions.iter()) {
        let trimmed = item.trim();
        if trimmed.is_empty() {
            continue;
        }
        if seen.insert(normalize(trimmed)) {
            out.push(trimmed.to_string());
            if out.len() == cap {
                break;
            }
        }
    }
    out
}

/// Topic union: match by normalized name, union the points of matching
/// topics, cap the topic list.
fn union_topics(base: &[Topic], additions: &[Topic], cap: usize) -> Vec<Topic> {
    let mut out: Vec<Topic> = Vec::new();
    for topic in base.iter().chain(additions.iter()) {
        let name = topic.name.trim();
        if name.is_empty() {
            continue;
        }
        let key = normalize(name);
        if let Some(existing) = out.iter_mut().find(|t| normalize(&t.name) == key) {
            existing.points = union_capped(&existing.points, &topic.points, usize::MAX);
        } else if out.len() < cap {
            out.push(Topic {
                name: name.to_string(),
                points: union_capped(&[], &topic.points, usize::MAX),
            });
        }
    }
    out
}
