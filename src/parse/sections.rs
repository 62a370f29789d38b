/// A heading-delimited section: the heading's nesting level and name, plus
/// the content lines up to the next heading of any level.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Section {
    /// Number of leading `#` characters (1–6)
    pub level: usize,
    pub name: String,
    pub lines: Vec<String>,
}

/// The preferences document parsed into an ordered section list.
///
/// A section's *boundary* for editing purposes extends past deeper
/// subsections, up to the next heading of equal-or-shallower level; see
/// [`SectionDoc::span_end`].
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SectionDoc {
    /// Lines before the first heading
    pub preamble: Vec<String>,
    pub sections: Vec<Section>,
}

/// Parse a heading line: 1–6 `#` characters followed by whitespace and a
/// non-empty name.
pub fn parse_heading(line: &str) -> Option<(usize, &str)> {
    let level = line.chars().take_while(|&c| c == '#').count();
    if level == 0 || level > 6 {
        return None;
    }
    let rest = &line[level..];
    if !rest.starts_with([' ', '\t']) {
        return None;
    }
    let name = rest.trim();
    if name.is_empty() { None } else { Some((level, name)) }
}

/// Parse document text into sections.
pub fn parse_sections(text: &str) -> SectionDoc {
    let mut doc = SectionDoc::default();
    for line in text.lines() {
        if let Some((level, name)) = parse_heading(line) {
            doc.sections.push(Section {
                level,
                name: name.to_string(),
                lines: Vec::new(),
            });
        } else {
            match doc.sections.last_mut() {
                Some(section) => section.lines.push(line.to_string()),
                None => doc.preamble.push(line.to_string()),
            }
        }
    }
    doc
}

impl SectionDoc {
    /// Serialize back to text (always newline-terminated when non-empty).
    pub fn render(&self) -> String {
        let mut out = String::new();
        for line in &self.preamble {
            out.push_str(line);
            out.push('\n');
        }
        for section in &self.sections {
            out.push_str(&"#".repeat(section.level));
            out.push(' ');
            out.push_str(&section.name);
            out.push('\n');
            for line in &section.lines {
                out.push_str(line);
                out.push('\n');
            }
        }
        out
    }

    /// Index of the section with this name (case-insensitive).
    pub fn find(&self, name: &str) -> Option<usize> {
        let wanted = name.to_lowercase();
        self.sections
            .iter()
            .position(|s| s.name.to_lowercase() == wanted)
    }

    /// Exclusive end of the section's boundary in the section list: the
    /// first following section at equal-or-shallower level (deeper
    /// subsections belong to the boundary).
    pub fn span_end(&self, idx: usize) -> usize {
        let level = self.sections[idx].level;
        self.sections
            .iter()
            .enumerate()
            .skip(idx + 1)
            .find(|(_, s)| s.level <= level)
            .map(|(i, _)| i)
            .unwrap_or(self.sections.len())
    }

    /// All content lines within the section's boundary, in order
    /// (subsection heading lines are not content and are excluded).
    pub fn span_lines(&self, idx: usize) -> impl Iterator<Item = &str> {
        self.sections[idx..self.span_end(idx)]
            .iter()
            .flat_map(|s| s.lines.iter().map(String::as_str))
    }
}
