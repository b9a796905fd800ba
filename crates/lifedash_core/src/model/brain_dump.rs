//! Brain-dump capture items.

use once_cell::sync::Lazy;
use regex::Regex;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

static FRAGMENT_SEPARATOR_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"[,\r\n]+").expect("valid fragment separator regex"));

pub type BrainDumpId = Uuid;

/// Triage bucket for one captured thought.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum BrainDumpPriority {
    /// Captured but not yet triaged.
    #[default]
    Unsorted,
    High,
    Low,
}

impl BrainDumpPriority {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Unsorted => "unsorted",
            Self::High => "high",
            Self::Low => "low",
        }
    }

    pub fn parse(value: &str) -> Option<Self> {
        match value.trim().to_ascii_lowercase().as_str() {
            "unsorted" => Some(Self::Unsorted),
            "high" => Some(Self::High),
            "low" => Some(Self::Low),
            _ => None,
        }
    }
}

/// One entry of the `simpleBrainDumpItems` collection.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BrainDumpItem {
    pub id: BrainDumpId,
    pub text: String,
    #[serde(default)]
    pub priority: BrainDumpPriority,
    #[serde(default)]
    pub completed: bool,
    /// Unix epoch milliseconds.
    pub created_at: i64,
    /// Set when the thought was spun out of a project's todo list.
    #[serde(default)]
    pub from_project: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub project_name: Option<String>,
}

impl BrainDumpItem {
    pub fn new(text: impl Into<String>, created_at: i64) -> Self {
        Self {
            id: Uuid::new_v4(),
            text: text.into(),
            priority: BrainDumpPriority::Unsorted,
            completed: false,
            created_at,
            from_project: false,
            project_name: None,
        }
    }
}

/// Splits free-text capture into trimmed, non-empty fragments.
///
/// Commas and line breaks both separate thoughts.
pub fn split_fragments(input: &str) -> Vec<String> {
    FRAGMENT_SEPARATOR_RE
        .split(input)
        .map(str::trim)
        .filter(|fragment| !fragment.is_empty())
        .map(str::to_string)
        .collect()
}

#[cfg(test)]
mod tests {
    use super::{split_fragments, BrainDumpItem, BrainDumpPriority};

    #[test]
    fn split_fragments_handles_commas_newlines_and_blanks() {
        let fragments = split_fragments("call mom, pay rent\n\n  buy milk ,,\r\nwalk dog");
        assert_eq!(fragments, vec!["call mom", "pay rent", "buy milk", "walk dog"]);
    }

    #[test]
    fn split_fragments_of_whitespace_is_empty() {
        assert!(split_fragments("  ,\n ").is_empty());
    }

    #[test]
    fn priority_parse_is_case_insensitive() {
        assert_eq!(BrainDumpPriority::parse(" HIGH "), Some(BrainDumpPriority::High));
        assert_eq!(BrainDumpPriority::parse("medium"), None);
    }

    #[test]
    fn decodes_minimal_stored_item_with_defaults() {
        let item: BrainDumpItem = serde_json::from_value(serde_json::json!({
            "id": "6f0c2f9e-2d6f-4c1a-9a53-0a4f7b7c1e11",
            "text": "Email",
            "createdAt": 10
        }))
        .unwrap();
        assert_eq!(item.priority, BrainDumpPriority::Unsorted);
        assert!(!item.completed);
        assert!(!item.from_project);
        assert!(item.project_name.is_none());
    }

    #[test]
    fn project_marker_is_always_written() {
        let value = serde_json::to_value(BrainDumpItem::new("Email", 1)).unwrap();
        assert_eq!(value["fromProject"], serde_json::json!(false));
        assert!(value.get("projectName").is_none());
    }
}
