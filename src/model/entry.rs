use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Maximum length of a title derived from entry content.
const DERIVED_TITLE_MAX: usize = 60;

/// Kind of captured item
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum EntryType {
    Idea,
    Project,
    Feature,
    Todo,
    Question,
    Reference,
    Note,
}

impl EntryType {
    /// All recognized type names, in display order.
    pub const ALL: [EntryType; 7] = [
        EntryType::Idea,
        EntryType::Project,
        EntryType::Feature,
        EntryType::Todo,
        EntryType::Question,
        EntryType::Reference,
        EntryType::Note,
    ];

    pub fn as_str(self) -> &'static str {
        match self {
            EntryType::Idea => "idea",
            EntryType::Project => "project",
            EntryType::Feature => "feature",
            EntryType::Todo => "todo",
            EntryType::Question => "question",
            EntryType::Reference => "reference",
            EntryType::Note => "note",
        }
    }

    /// Parse a type name. Returns `None` for anything outside the vocabulary.
    pub fn parse(s: &str) -> Option<EntryType> {
        match s {
            "idea" => Some(EntryType::Idea),
            "project" => Some(EntryType::Project),
            "feature" => Some(EntryType::Feature),
            "todo" => Some(EntryType::Todo),
            "question" => Some(EntryType::Question),
            "reference" => Some(EntryType::Reference),
            "note" => Some(EntryType::Note),
            _ => None,
        }
    }
}

/// Lifecycle state of an entry
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum EntryStatus {
    Raw,
    Active,
    Wip,
    Someday,
    Done,
    Archived,
}

impl EntryStatus {
    pub fn as_str(self) -> &'static str {
        match self {
            EntryStatus::Raw => "raw",
            EntryStatus::Active => "active",
            EntryStatus::Wip => "wip",
            EntryStatus::Someday => "someday",
            EntryStatus::Done => "done",
            EntryStatus::Archived => "archived",
        }
    }

    /// Parse a status name. Returns `None` for anything outside the vocabulary.
    pub fn parse(s: &str) -> Option<EntryStatus> {
        match s {
            "raw" => Some(EntryStatus::Raw),
            "active" => Some(EntryStatus::Active),
            "wip" => Some(EntryStatus::Wip),
            "someday" => Some(EntryStatus::Someday),
            "done" => Some(EntryStatus::Done),
            "archived" => Some(EntryStatus::Archived),
            _ => None,
        }
    }
}

/// A single captured entry with all its metadata
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Entry {
    /// Opaque unique identifier, assigned at creation, never changes
    pub id: String,
    /// Free-text body, required
    pub content: String,
    /// Optional short label; display falls back to the first content line
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub title: Option<String>,
    #[serde(rename = "type")]
    pub entry_type: EntryType,
    pub status: EntryStatus,
    /// 1 = highest; absent means unprioritized (sorts after 1–3)
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub priority: Option<u8>,
    /// Insertion-ordered, duplicate-free; matching is case-sensitive
    #[serde(default)]
    pub tags: Vec<String>,
    /// Parent entry id (may be a stored prefix, see store parent resolution)
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub parent: Option<String>,
    /// Non-hierarchical links to other entry ids
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub related: Vec<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub due: Option<DateTime<Utc>>,
    /// Set when status becomes wip, cleared when leaving wip
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub started_at: Option<DateTime<Utc>>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
    /// Free-text provenance (which entry point captured this)
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub source: Option<String>,
}

impl Entry {
    /// The label to show for this entry: the explicit title if set, otherwise
    /// the first line of content, trimmed. Derived labels never exceed 60
    /// characters; the ellipsis marking a truncation counts toward the cap.
    pub fn display_title(&self) -> String {
        if let Some(title) = &self.title {
            return title.clone();
        }
        let first_line = self.content.lines().next().unwrap_or("").trim();
        if first_line.chars().count() <= DERIVED_TITLE_MAX {
            return first_line.to_string();
        }
        let mut out: String = first_line.chars().take(DERIVED_TITLE_MAX - 1).collect();
        out.push('…');
        out
    }

    /// Add a tag, preserving insertion order and skipping duplicates.
    pub fn add_tag(&mut self, tag: String) {
        if !self.tags.contains(&tag) {
            self.tags.push(tag);
        }
    }
}

/// Fields accepted when creating a new entry. Unrecognized `entry_type`
/// values fall back to "idea"; out-of-range priorities are dropped.
#[derive(Debug, Clone, Default)]
pub struct NewEntry {
    pub content: String,
    pub title: Option<String>,
    pub entry_type: Option<String>,
    pub tags: Vec<String>,
    pub parent: Option<String>,
    pub related: Vec<String>,
    /// Free-form date expression, resolved through the date resolver
    pub due: Option<String>,
    pub priority: Option<i64>,
    pub source: Option<String>,
}

impl NewEntry {
    pub fn new(content: impl Into<String>) -> Self {
        NewEntry {
            content: content.into(),
            ..Default::default()
        }
    }
}

/// Partial update for an existing entry.
///
/// The doubled `Option` on `priority`, `parent`, `due`, and `started_at`
/// distinguishes "leave unchanged" (`None`) from "clear the field"
/// (`Some(None)`) from "set a value" (`Some(Some(..))`).
#[derive(Debug, Clone, Default)]
pub struct EntryPatch {
    pub content: Option<String>,
    pub title: Option<String>,
    /// Validated against the type vocabulary; invalid values are rejected
    pub entry_type: Option<String>,
    /// Validated against the status vocabulary; "archived" is rejected here
    /// (only the archive operation may set it)
    pub status: Option<String>,
    pub priority: Option<Option<u8>>,
    /// Replaces the whole tag set (deduplicated, order preserved)
    pub tags: Option<Vec<String>>,
    pub parent: Option<Option<String>>,
    pub related: Option<Vec<String>>,
    /// Free-form date expression, or `Some(None)` to clear
    pub due: Option<Option<String>>,
    pub started_at: Option<Option<DateTime<Utc>>>,
    pub source: Option<String>,
}

/// A deleted entry snapshot held in the deletion log
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DeletionRecord {
    #[serde(flatten)]
    pub entry: Entry,
    pub deleted_at: DateTime<Utc>,
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;

    fn entry_with_content(content: &str) -> Entry {
        let now = Utc::now();
        Entry {
            id: "abc123".into(),
            content: content.into(),
            title: None,
            entry_type: EntryType::Idea,
            status: EntryStatus::Raw,
            priority: None,
            tags: Vec::new(),
            parent: None,
            related: Vec::new(),
            due: None,
            started_at: None,
            created_at: now,
            updated_at: now,
            source: None,
        }
    }

    #[test]
    fn type_parse_round_trip() {
        for t in EntryType::ALL {
            assert_eq!(EntryType::parse(t.as_str()), Some(t));
        }
        assert_eq!(EntryType::parse("bogus"), None);
    }

    #[test]
    fn status_parse_rejects_unknown() {
        assert_eq!(EntryStatus::parse("wip"), Some(EntryStatus::Wip));
        assert_eq!(EntryStatus::parse("WIP"), None);
        assert_eq!(EntryStatus::parse(""), None);
    }

    #[test]
    fn display_title_prefers_explicit_title() {
        let mut e = entry_with_content("first line\nsecond line");
        e.title = Some("Label".into());
        assert_eq!(e.display_title(), "Label");
    }

    #[test]
    fn display_title_derives_from_first_line() {
        let e = entry_with_content("  first line  \nsecond line");
        assert_eq!(e.display_title(), "first line");
    }

    #[test]
    fn display_title_caps_at_sixty_chars() {
        let e = entry_with_content(&"x".repeat(80));
        let title = e.display_title();
        assert_eq!(title.chars().count(), 60);
        assert!(title.ends_with('…'));
        assert_eq!(title, format!("{}…", "x".repeat(59)));
    }

    #[test]
    fn display_title_at_exactly_sixty_chars_is_untouched() {
        let exact = "y".repeat(60);
        let e = entry_with_content(&exact);
        assert_eq!(e.display_title(), exact);
    }

    #[test]
    fn add_tag_skips_duplicates() {
        let mut e = entry_with_content("c");
        e.add_tag("rust".into());
        e.add_tag("cli".into());
        e.add_tag("rust".into());
        assert_eq!(e.tags, vec!["rust", "cli"]);
    }

    #[test]
    fn entry_serde_uses_camel_case() {
        let e = entry_with_content("c");
        let json = serde_json::to_string(&e).unwrap();
        assert!(json.contains("\"createdAt\""));
        assert!(json.contains("\"type\":\"idea\""));
        assert!(!json.contains("\"title\""));
    }

    #[test]
    fn entry_serde_tolerates_missing_optional_fields() {
        let json = r#"{
            "id": "a", "content": "c", "type": "todo", "status": "raw",
            "createdAt": "2025-01-01T00:00:00Z",
            "updatedAt": "2025-01-01T00:00:00Z"
        }"#;
        let e: Entry = serde_json::from_str(json).unwrap();
        assert_eq!(e.entry_type, EntryType::Todo);
        assert!(e.tags.is_empty());
        assert!(e.related.is_empty());
    }
}
