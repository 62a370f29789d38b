use std::fs;
use std::io;
use std::path::PathBuf;

use crate::io::atomic::atomic_write;
use crate::parse::sections::{Section, parse_heading, parse_sections};

/// Content-line cap (trailing blank lines are not counted).
pub const MAX_CONTENT_LINES: usize = 500;

/// Heading level used when a target section has to be created.
const DEFAULT_NEW_SECTION_LEVEL: usize = 2;

/// Seed written on first access.
const TEMPLATE: &str = "\
# Preferences

Free-form context the capture tool keeps alongside your entries. Edit by
hand or through the preferences operations; section names matter, the
content is yours.

## About Me

## Tag Meanings

## Workflows
";

/// Error type for preferences document operations
#[derive(Debug, thiserror::Error)]
pub enum PrefsError {
    #[error("document contains a null byte")]
    NullByte,
    #[error("document has {0} content lines (limit {MAX_CONTENT_LINES})")]
    LineLimit(usize),
    #[error("io error: {0}")]
    Io(#[from] io::Error),
}

impl PrefsError {
    /// Stable machine-readable code.
    pub fn code(&self) -> &'static str {
        match self {
            PrefsError::NullByte => "null_byte",
            PrefsError::LineLimit(_) => "line_limit",
            PrefsError::Io(_) => "io",
        }
    }
}

/// Outcome of the idempotent `set_entry`
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SetEntryOutcome {
    pub added: bool,
    pub existed: bool,
}

/// What `remove_from_section` should match. Exactly one matching mode, by
/// construction.
#[derive(Debug, Clone)]
pub enum RemoveSpec {
    /// Whole-line match on trimmed text
    Exact(String),
    /// Case-insensitive substring match
    Substring(String),
}

/// Lines removed by `remove_from_section` (empty on a no-op)
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RemoveOutcome {
    pub removed: Vec<String>,
}

/// The structured preferences document: named, level-tagged sections holding
/// free-form line entries, with idempotent mutation primitives.
pub struct PrefsFile {
    path: PathBuf,
}

impl PrefsFile {
    pub fn new(data_dir: impl Into<PathBuf>) -> Self {
        PrefsFile {
            path: data_dir.into().join("preferences.md"),
        }
    }

    /// Current content; seeds and persists the template on first access.
    pub fn load(&self) -> io::Result<String> {
        match fs::read_to_string(&self.path) {
            Ok(content) => Ok(content),
            Err(e) if e.kind() == io::ErrorKind::NotFound => {
                atomic_write(&self.path, TEMPLATE.as_bytes())?;
                Ok(TEMPLATE.to_string())
            }
            Err(e) => Err(e),
        }
    }

    /// Reject null bytes and documents over the content-line cap.
    pub fn validate(content: &str) -> Result<(), PrefsError> {
        if content.contains('\0') {
            return Err(PrefsError::NullByte);
        }
        let lines: Vec<&str> = content.lines().collect();
        let count = lines
            .iter()
            .rposition(|l| !l.trim().is_empty())
            .map_or(0, |i| i + 1);
        if count > MAX_CONTENT_LINES {
            return Err(PrefsError::LineLimit(count));
        }
        Ok(())
    }

    /// Validate, then atomically persist.
    pub fn save(&self, content: &str) -> Result<(), PrefsError> {
        Self::validate(content)?;
        atomic_write(&self.path, content.as_bytes())?;
        Ok(())
    }

    /// Resolve a section argument: accepts a bare name or a
    /// heading-with-hashes form, and maps case-insensitive aliases to
    /// canonical section names. Returns the name and, when the argument
    /// carried hashes, the requested heading level.
    pub fn resolve_section(name: &str) -> (String, Option<usize>) {
        let (level, bare) = match parse_heading(name.trim()) {
            Some((level, bare)) => (Some(level), bare),
            None => (None, name.trim()),
        };
        let canonical = match bare.to_lowercase().as_str() {
            "tag" | "tags" | "tag meanings" => "Tag Meanings".to_string(),
            "about" | "me" | "about me" => "About Me".to_string(),
            "workflow" | "workflows" => "Workflows".to_string(),
            _ => bare.to_string(),
        };
        (canonical, level)
    }

    /// Insert `text` as a new block at the end of the section's boundary
    /// (immediately before the next same-or-shallower heading), creating the
    /// section at document end if it does not exist.
    pub fn append_to_section(&self, section: &str, text: &str) -> Result<(), PrefsError> {
        let (name, level) = Self::resolve_section(section);
        let mut doc = parse_sections(&self.load()?);

        match doc.find(&name) {
            Some(idx) => {
                let target = doc.span_end(idx) - 1;
                let is_last = target == doc.sections.len() - 1;
                let lines = &mut doc.sections[target].lines;
                while lines.last().is_some_and(|l| l.trim().is_empty()) {
                    lines.pop();
                }
                // the preceding line is now non-blank (content or the
                // heading itself), so separate the new block
                lines.push(String::new());
                lines.extend(text.lines().map(String::from));
                if !is_last {
                    lines.push(String::new());
                }
            }
            None => {
                if let Some(last) = doc.sections.last_mut() {
                    if !last.lines.last().is_some_and(|l| l.trim().is_empty()) {
                        last.lines.push(String::new());
                    }
                } else if !doc.preamble.is_empty()
                    && !doc.preamble.last().is_some_and(|l| l.trim().is_empty())
                {
                    doc.preamble.push(String::new());
                }
                let mut lines = vec![String::new()];
                lines.extend(text.lines().map(String::from));
                doc.sections.push(Section {
                    level: level.unwrap_or(DEFAULT_NEW_SECTION_LEVEL),
                    name,
                    lines,
                });
            }
        }

        self.save(&doc.render())
    }

    /// Idempotently add a line entry to a section: identical normalized text
    /// already present reports `existed` and changes nothing.
    pub fn set_entry(&self, section: &str, entry: &str) -> Result<SetEntryOutcome, PrefsError> {
        let (name, _) = Self::resolve_section(section);
        let doc = parse_sections(&self.load()?);
        let normalized = entry.trim();

        if let Some(idx) = doc.find(&name)
            && doc
                .span_lines(idx)
                .filter(|l| is_content_line(l))
                .any(|l| l.trim() == normalized)
        {
            return Ok(SetEntryOutcome {
                added: false,
                existed: true,
            });
        }

        self.append_to_section(section, normalized)?;
        Ok(SetEntryOutcome {
            added: true,
            existed: false,
        })
    }

    /// Non-blank, non-heading, non-comment lines within the section's
    /// boundary, trimmed. An unknown section yields an empty list.
    pub fn entries_in_section(&self, section: &str) -> io::Result<Vec<String>> {
        let (name, _) = Self::resolve_section(section);
        let doc = parse_sections(&self.load()?);
        Ok(match doc.find(&name) {
            Some(idx) => doc
                .span_lines(idx)
                .filter(|l| is_content_line(l))
                .map(|l| l.trim().to_string())
                .collect(),
            None => Vec::new(),
        })
    }

    /// Remove matching content lines within the section's boundary. A no-op
    /// (unknown section or nothing matched) reports zero removals.
    pub fn remove_from_section(
        &self,
        section: &str,
        spec: &RemoveSpec,
    ) -> Result<RemoveOutcome, PrefsError> {
        let (name, _) = Self::resolve_section(section);
        let mut doc = parse_sections(&self.load()?);
        let Some(idx) = doc.find(&name) else {
            return Ok(RemoveOutcome::default());
        };

        let mut removed = Vec::new();
        let end = doc.span_end(idx);
        for sec in &mut doc.sections[idx..end] {
            sec.lines.retain(|line| {
                if is_content_line(line) && spec.matches(line) {
                    removed.push(line.trim().to_string());
                    false
                } else {
                    true
                }
            });
        }

        if !removed.is_empty() {
            self.save(&doc.render())?;
        }
        Ok(RemoveOutcome { removed })
    }
}

impl RemoveSpec {
    fn matches(&self, line: &str) -> bool {
        match self {
            RemoveSpec::Exact(entry) => line.trim() == entry.trim(),
            RemoveSpec::Substring(needle) => {
                line.to_lowercase().contains(&needle.to_lowercase())
            }
        }
    }
}

/// Free-form entry lines: not blank, not an HTML comment. Heading lines
/// never appear here because the parser lifts them out of section content.
fn is_content_line(line: &str) -> bool {
    let trimmed = line.trim();
    !trimmed.is_empty() && !trimmed.starts_with("<!--")
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    fn prefs() -> (TempDir, PrefsFile) {
        let dir = TempDir::new().unwrap();
        let prefs = PrefsFile::new(dir.path());
        (dir, prefs)
    }

    #[test]
    fn load_seeds_template_once() {
        let (dir, prefs) = prefs();
        let content = prefs.load().unwrap();
        assert!(content.contains("## Tag Meanings"));
        // persisted, so a direct read sees the same seed
        let on_disk = fs::read_to_string(dir.path().join("preferences.md")).unwrap();
        assert_eq!(on_disk, content);
    }

    #[test]
    fn validate_rejects_null_bytes_and_line_overflow() {
        assert_eq!(
            PrefsFile::validate("a\0b").unwrap_err().code(),
            "null_byte"
        );
        let five_hundred = "line\n".repeat(MAX_CONTENT_LINES);
        assert!(PrefsFile::validate(&five_hundred).is_ok());
        let too_many = "line\n".repeat(MAX_CONTENT_LINES + 1);
        assert_eq!(
            PrefsFile::validate(&too_many).unwrap_err().code(),
            "line_limit"
        );
    }

    #[test]
    fn trailing_blank_lines_do_not_count_toward_the_cap() {
        let content = format!("{}{}", "line\n".repeat(MAX_CONTENT_LINES), "\n\n\n");
        assert!(PrefsFile::validate(&content).is_ok());
    }

    #[test]
    fn save_rejects_invalid_content_without_writing() {
        let (_dir, prefs) = prefs();
        let seed = prefs.load().unwrap();
        assert!(prefs.save("bad\0content").is_err());
        assert_eq!(prefs.load().unwrap(), seed);
    }

    #[test]
    fn aliases_resolve_case_insensitively() {
        assert_eq!(
            PrefsFile::resolve_section("TAGS"),
            ("Tag Meanings".to_string(), None)
        );
        assert_eq!(
            PrefsFile::resolve_section("me"),
            ("About Me".to_string(), None)
        );
        assert_eq!(
            PrefsFile::resolve_section("### Projects"),
            ("Projects".to_string(), Some(3))
        );
        assert_eq!(
            PrefsFile::resolve_section("Reading List"),
            ("Reading List".to_string(), None)
        );
    }

    #[test]
    fn append_lands_inside_the_section() {
        let (_dir, prefs) = prefs();
        prefs.append_to_section("tags", "#deep: needs focus").unwrap();
        let content = prefs.load().unwrap();
        let doc = parse_sections(&content);
        let idx = doc.find("Tag Meanings").unwrap();
        let lines: Vec<&str> = doc.span_lines(idx).collect();
        assert!(lines.contains(&"#deep: needs focus"));
        // Workflows section untouched
        let wf = doc.find("Workflows").unwrap();
        assert!(doc.span_lines(wf).all(|l| l.trim().is_empty()));
    }

    #[test]
    fn append_creates_missing_section_at_end() {
        let (_dir, prefs) = prefs();
        prefs.append_to_section("Reading List", "some paper").unwrap();
        let content = prefs.load().unwrap();
        let doc = parse_sections(&content);
        let idx = doc.find("Reading List").unwrap();
        assert_eq!(idx, doc.sections.len() - 1);
        assert_eq!(doc.sections[idx].level, 2);
        assert!(doc.span_lines(idx).any(|l| l == "some paper"));
    }

    #[test]
    fn set_entry_is_idempotent() {
        let (_dir, prefs) = prefs();
        let first = prefs.set_entry("tags", "#ml: machine learning").unwrap();
        assert_eq!(
            first,
            SetEntryOutcome {
                added: true,
                existed: false
            }
        );
        // same normalized text, different surrounding whitespace
        let second = prefs.set_entry("tags", "  #ml: machine learning  ").unwrap();
        assert_eq!(
            second,
            SetEntryOutcome {
                added: false,
                existed: true
            }
        );
        let entries = prefs.entries_in_section("tags").unwrap();
        assert_eq!(entries, vec!["#ml: machine learning"]);
    }

    #[test]
    fn entries_skip_blanks_and_comments() {
        let (_dir, prefs) = prefs();
        prefs
            .append_to_section("about", "<!-- machine note -->\nI work nights")
            .unwrap();
        let entries = prefs.entries_in_section("about").unwrap();
        assert_eq!(entries, vec!["I work nights"]);
    }

    #[test]
    fn remove_exact_and_substring() {
        let (_dir, prefs) = prefs();
        prefs.set_entry("tags", "#ml: machine learning").unwrap();
        prefs.set_entry("tags", "#cli: terminal tools").unwrap();

        let outcome = prefs
            .remove_from_section("tags", &RemoveSpec::Exact("#ml: machine learning".into()))
            .unwrap();
        assert_eq!(outcome.removed, vec!["#ml: machine learning"]);

        let outcome = prefs
            .remove_from_section("tags", &RemoveSpec::Substring("TERMINAL".into()))
            .unwrap();
        assert_eq!(outcome.removed, vec!["#cli: terminal tools"]);
        assert!(prefs.entries_in_section("tags").unwrap().is_empty());
    }

    #[test]
    fn remove_with_no_match_reports_zero() {
        let (_dir, prefs) = prefs();
        let outcome = prefs
            .remove_from_section("tags", &RemoveSpec::Substring("ghost".into()))
            .unwrap();
        assert!(outcome.removed.is_empty());
        let outcome = prefs
            .remove_from_section("No Such Section", &RemoveSpec::Exact("x".into()))
            .unwrap();
        assert!(outcome.removed.is_empty());
    }

    #[test]
    fn append_respects_nested_section_boundaries() {
        let (_dir, prefs) = prefs();
        prefs
            .save(
                "# Top\n\n## Inner\n\ninner line\n\n# Next\n\nnext line\n",
            )
            .unwrap();
        prefs.append_to_section("Top", "appended").unwrap();
        let doc = parse_sections(&prefs.load().unwrap());
        // appended before "# Next", i.e. inside Top's boundary (after Inner)
        let top = doc.find("Top").unwrap();
        assert!(doc.span_lines(top).any(|l| l == "appended"));
        let next = doc.find("Next").unwrap();
        assert!(doc.span_lines(next).all(|l| l != "appended"));
    }
}
