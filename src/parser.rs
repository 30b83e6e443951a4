//! Two-tier parser for model responses.
//!
//! Tier one strips code fences, extracts the first balanced JSON object, and
//! schema-decodes it with lenient coercion. Tier two is a heuristic line
//! scanner that recovers bullet points, decisions, action items, and quotes
//! from free text. Graceful degradation is a hard requirement: `parse` is a
//! total function that never fails, never panics, and always returns a
//! well-formed fragment with every list field present.

use crate::defaults;
use crate::summary::{SummaryFragment, Topic, clamp_words};
use serde::Deserialize;

/// Parses raw model text into a validated summary fragment.
#[derive(Debug, Clone)]
pub struct ResponseParser {
    max_content_words: usize,
}

impl Default for ResponseParser {
    fn default() -> Self {
        Self {
            max_content_words: defaults::MAX_CONTENT_WORDS,
        }
    }
}

/// Lenient mirror of the response schema. Models drift on field casing and
/// sometimes emit bare strings where objects are expected.
#[derive(Debug, Deserialize, Default)]
#[serde(default)]
struct RawFragment {
    content: Option<String>,
    #[serde(alias = "keyPoints")]
    key_points: Vec<String>,
    decisions: Vec<String>,
    #[serde(alias = "actionItems")]
    action_items: Vec<String>,
    quotes: Vec<String>,
    topics: Vec<RawTopic>,
}

#[derive(Debug, Deserialize)]
#[serde(untagged)]
enum RawTopic {
    Named {
        name: String,
        #[serde(default)]
        points: Vec<String>,
    },
    Bare(String),
}

impl ResponseParser {
    pub fn new(max_content_words: usize) -> Self {
        Self { max_content_words }
    }

    /// Always returns a fragment; a malformed response degrades to whatever
    /// the heuristic scanner can recover, never to an error.
    pub fn parse(&self, raw_text: &str) -> SummaryFragment {
        let stripped = strip_code_fences(raw_text);

        if let Some(json) = extract_json_object(&stripped)
            && let Ok(raw) = serde_json::from_str::<RawFragment>(json)
        {
            return self.coerce(raw);
        }

        self.parse_heuristic(&stripped)
    }

    /// Validate and coerce a schema-decoded fragment: clamp the narrative,
    /// strip speaker attribution from quotes, normalize topic entries, and
    /// drop empty list items.
    fn coerce(&self, raw: RawFragment) -> SummaryFragment {
        let topics = raw
            .topics
            .into_iter()
            .filter_map(|t| {
                let topic = match t {
                    RawTopic::Named { name, points } => Topic {
                        name: name.trim().to_string(),
                        points: clean_list(points),
                    },
                    RawTopic::Bare(name) => Topic {
                        name: name.trim().to_string(),
                        points: Vec::new(),
                    },
                };
                (!topic.name.is_empty()).then_some(topic)
            })
            .collect();

        SummaryFragment {
            content: clamp_words(raw.content.as_deref().unwrap_or(""), self.max_content_words),
            key_points: clean_list(raw.key_points),
            decisions: clean_list(raw.decisions),
            action_items: clean_list(raw.action_items),
            quotes: clean_list(raw.quotes)
                .into_iter()
                .map(|q| strip_attribution(&q))
                .filter(|q| !q.is_empty())
                .collect(),
            topics,
        }
    }

    /// Fallback line scanner for non-JSON responses: bullets become key
    /// points, decision/action keyword lines become decisions/action items,
    /// quoted lines become quotes. `content` stays empty — the fragment is
    /// lower quality but always usable.
    fn parse_heuristic(&self, text: &str) -> SummaryFragment {
        let mut fragment = SummaryFragment::default();

        for line in text.lines() {
            let trimmed = line.trim();
            if trimmed.is_empty() {
                continue;
            }

            let (is_bullet, body) = strip_bullet(trimmed);
            let lower = body.to_lowercase();

            if is_quoted(body) {
                let quote = strip_attribution(body.trim_matches(['"', '\u{201c}', '\u{201d}']));
                if !quote.is_empty() {
                    fragment.quotes.push(quote);
                }
            } else if lower.contains("decided") || lower.contains("decision") || lower.contains("agreed") {
                fragment.decisions.push(body.to_string());
            } else if lower.contains("action item")
                || lower.contains("todo")
                || lower.contains("follow up")
                || lower.contains("follow-up")
                || lower.starts_with("will ")
                || lower.contains(" will ")
            {
                fragment.action_items.push(body.to_string());
            } else if is_bullet {
                fragment.key_points.push(body.to_string());
            }
        }

        fragment
    }
}

fn clean_list(items: Vec<String>) -> Vec<String> {
    items
        .into_iter()
        .map(|s| s.trim().to_string())
        .filter(|s| !s.is_empty())
        .collect()
}

/// Removes Markdown code-fence wrapper lines, keeping the body.
fn strip_code_fences(text: &str) -> String {
    let trimmed = text.trim();
    if !trimmed.starts_with("```") {
        return text.to_string();
    }
    trimmed
        .lines()
        .filter(|line| !line.trim_start().starts_with("```"))
        .collect::<Vec<_>>()
        .join("\n")
}

/// The first balanced `{...}` region, string- and escape-aware.
fn extract_json_object(text: &str) -> Option<&str> {
    let start = text.find('{')?;
    let mut depth = 0usize;
    let mut in_string = false;
    let mut escaped = false;

    for (i, c) in text[start..].char_indices() {
        if in_string {
            if escaped {
                escaped = false;
            } else if c == '\\' {
                escaped = true;
            } else if c == '"' {
                in_string = false;
            }
            continue;
        }
        match c {
            '"' => in_string = true,
            '{' => depth += 1,
            '}' => {
                depth -= 1;
                if depth == 0 {
                    return Some(&text[start..start + i + c.len_utf8()]);
                }
            }
            _ => {}
        }
    }
    None
}

fn strip_bullet(line: &str) -> (bool, &str) {
    for marker in ["- ", "* ", "• ", "– "] {
        if let Some(rest) = line.strip_prefix(marker) {
            return (true, rest.trim());
        }
    }
    // Numbered bullets: "1. point", "2) point"
    let digits = line.chars().take_while(|c| c.is_ascii_digit()).count();
    if digits > 0 && digits <= 2 {
        let rest = &line[digits..];
        if let Some(rest) = rest.strip_prefix(". ").or_else(|| rest.strip_prefix(") ")) {
            return (true, rest.trim());
        }
    }
    (false, line)
}

fn is_quoted(line: &str) -> bool {
    let quoted_ascii = line.len() >= 2 && line.starts_with('"') && line.ends_with('"');
    let quoted_smart = line.starts_with('\u{201c}') && line.ends_with('\u{201d}');
    quoted_ascii || quoted_smart
}

/// Removes speaker attribution from a quote: a leading `Name:` prefix and a
/// trailing `- Name` suffix. A prefix only counts as a name when it is short
/// (at most three words) so quotes that themselves contain colons survive.
pub fn strip_attribution(quote: &str) -> String {
    let mut text = quote.trim();

    if let Some(colon) = text.find(':') {
        let prefix = &text[..colon];
        let words = prefix.split_whitespace().count();
        if (1..=3).contains(&words)
            && prefix
                .chars()
                .all(|c| c.is_alphanumeric() || c.is_whitespace() || c == '.' || c == '\'')
        {
            text = text[colon + 1..].trim_start();
        }
    }

    for dash in [" - ", " \u{2014} ", " \u{2013} "] {
        if let Some(pos) = text.rfind(dash) {
            let suffix = &text[pos + dash.len()..];
            let words = suffix.split_whitespace().count();
            if (1..=3).contains(&words)
                && suffix.chars().all(|c| {
                    c.is_alphanumeric() || c.is_whitespace() || c == '.' || c == '\''
                })
            {
                text = text[..pos].trim_end();
            }
        }
    }

    text.trim_matches(['"', '\u{201c}', '\u{201d}']).trim().to_string()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn parser() -> ResponseParser {
        ResponseParser::default()
    }

    #[test]
    fn test_parses_well_formed_json() {
        let raw = r#"{
            "content": "The team planned the release.",
            "key_points": ["Scope agreed"],
            "decisions": ["Ship v2 on Friday"],
            "action_items": ["Write release notes"],
            "quotes": ["we are ready"],
            "topics": [{"name": "Release", "points": ["Friday"]}]
        }"#;
        let fragment = parser().parse(raw);
        assert_eq!(fragment.content, "The team planned the release.");
        assert_eq!(fragment.key_points, vec!["Scope agreed"]);
        assert_eq!(fragment.decisions, vec!["Ship v2 on Friday"]);
        assert_eq!(fragment.action_items, vec!["Write release notes"]);
        assert_eq!(fragment.quotes, vec!["we are ready"]);
        assert_eq!(fragment.topics[0].name, "Release");
        assert_eq!(fragment.topics[0].points, vec!["Friday"]);
    }

    #[test]
    fn test_strips_code_fences() {
        let raw = "```json\n{\"content\": \"fenced\"}\n```";
        let fragment = parser().parse(raw);
        assert_eq!(fragment.content, "fenced");
    }

    #[test]
    fn test_extracts_json_from_surrounding_prose() {
        let raw = "Sure! Here is the summary you asked for:\n{\"content\": \"embedded\"}\nHope this helps.";
        let fragment = parser().parse(raw);
        assert_eq!(fragment.content, "embedded");
    }

    #[test]
    fn test_missing_list_fields_become_empty() {
        let fragment = parser().parse(r#"{"content": "only content"}"#);
        assert_eq!(fragment.content, "only content");
        assert!(fragment.key_points.is_empty());
        assert!(fragment.decisions.is_empty());
        assert!(fragment.action_items.is_empty());
        assert!(fragment.quotes.is_empty());
        assert!(fragment.topics.is_empty());
    }

    #[test]
    fn test_camel_case_aliases_accepted() {
        let raw = r#"{"keyPoints": ["a"], "actionItems": ["b"]}"#;
        let fragment = parser().parse(raw);
        assert_eq!(fragment.key_points, vec!["a"]);
        assert_eq!(fragment.action_items, vec!["b"]);
    }

    #[test]
    fn test_bare_string_topics_normalized() {
        let raw = r#"{"topics": ["Budget", {"name": "Hiring", "points": ["two roles"]}]}"#;
        let fragment = parser().parse(raw);
        assert_eq!(fragment.topics.len(), 2);
        assert_eq!(fragment.topics[0].name, "Budget");
        assert!(fragment.topics[0].points.is_empty());
        assert_eq!(fragment.topics[1].name, "Hiring");
    }

    #[test]
    fn test_content_clamped_with_ellipsis() {
        let long_content = "word ".repeat(300);
        let raw = format!(r#"{{"content": "{}"}}"#, long_content.trim());
        let fragment = parser().parse(&raw);
        assert_eq!(
            fragment.content.split_whitespace().count(),
            defaults::MAX_CONTENT_WORDS
        );
        assert!(fragment.content.ends_with('…'));
    }

    #[test]
    fn test_quote_attribution_stripped() {
        let raw = r#"{"quotes": ["Alice: we should ship it", "it works on my machine - Bob"]}"#;
        let fragment = parser().parse(raw);
        assert_eq!(
            fragment.quotes,
            vec!["we should ship it", "it works on my machine"]
        );
    }

    #[test]
    fn test_quote_with_inner_colon_survives() {
        let stripped = strip_attribution("the ratio is roughly 3:1 in our favor");
        assert_eq!(stripped, "the ratio is roughly 3:1 in our favor");
    }

    #[test]
    fn test_strip_attribution_both_ends() {
        assert_eq!(
            strip_attribution("Dr. Smith: the results look good - Dr. Smith"),
            "the results look good"
        );
    }

    #[test]
    fn test_heuristic_fallback_on_non_json() {
        let raw = "Summary of the call:\n\
                   - launch timeline reviewed\n\
                   * budget approved for Q3\n\
                   The team decided to postpone the demo.\n\
                   Sam will prepare the slides.\n\
                   \"ship early, ship often\"\n";
        let fragment = parser().parse(raw);
        assert_eq!(
            fragment.key_points,
            vec!["launch timeline reviewed", "budget approved for Q3"]
        );
        assert_eq!(fragment.decisions, vec!["The team decided to postpone the demo."]);
        assert_eq!(fragment.action_items, vec!["Sam will prepare the slides."]);
        assert_eq!(fragment.quotes, vec!["ship early, ship often"]);
        assert!(fragment.content.is_empty());
    }

    #[test]
    fn test_heuristic_numbered_bullets() {
        let fragment = parser().parse("1. first point\n2) second point\n");
        assert_eq!(fragment.key_points, vec!["first point", "second point"]);
    }

    #[test]
    fn test_never_fails_on_garbage() {
        let inputs = [
            "",
            "   \n\t  ",
            "not json at all",
            "{\"content\": \"truncated",
            "{{{{",
            "}}}}",
            "```",
            "{\"topics\": [42]}",
            "{\"key_points\": \"not a list\"}",
            "\u{FFFD}\u{0000} binary-ish garbage {",
        ];
        for input in inputs {
            let fragment = parser().parse(input);
            // Well-formed: all list fields present (vectors exist by type),
            // nothing panicked, content is a valid string.
            assert!(fragment.content.split_whitespace().count() <= defaults::MAX_CONTENT_WORDS);
        }
    }

    #[test]
    fn test_invalid_json_falls_back_to_heuristic() {
        // Truncated JSON, but salvageable bullet lines around it
        let raw = "{\"content\": \"oops\n- recovered point\n";
        let fragment = parser().parse(raw);
        assert_eq!(fragment.key_points, vec!["recovered point"]);
    }

    #[test]
    fn test_extract_json_object_ignores_braces_in_strings() {
        let text = r#"noise {"content": "has a } brace inside"} trailing"#;
        let json = extract_json_object(text).unwrap();
        assert_eq!(json, r#"{"content": "has a } brace inside"}"#);
        assert!(serde_json::from_str::<RawFragment>(json).is_ok());
    }

    #[test]
    fn test_extract_json_object_nested() {
        let text = r#"{"topics": [{"name": "a", "points": []}]}"#;
        assert_eq!(extract_json_object(text), Some(text));
    }

    #[test]
    fn test_empty_list_items_dropped() {
        let raw = r#"{"key_points": ["", "  ", "real point"]}"#;
        let fragment = parser().parse(raw);
        assert_eq!(fragment.key_points, vec!["real point"]);
    }
}
