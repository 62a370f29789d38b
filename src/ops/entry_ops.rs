use std::io;
use std::path::{Path, PathBuf};

use chrono::{DateTime, Local, Utc};
use indexmap::IndexMap;
use uuid::Uuid;

use crate::dates::resolve_date;
use crate::io::store_io::{read_entries, write_entries};
use crate::model::entry::{Entry, EntryPatch, EntryStatus, EntryType, NewEntry};

/// Error type for store mutations
#[derive(Debug, thiserror::Error)]
pub enum StoreError {
    #[error("invalid type: {0}")]
    InvalidType(String),
    #[error("invalid status: {0}")]
    InvalidStatus(String),
    #[error("invalid due date: {0}")]
    InvalidDueDate(String),
    #[error("invalid duration: {0}")]
    InvalidDuration(String),
    #[error("io error: {0}")]
    Io(#[from] io::Error),
}

impl StoreError {
    /// Stable machine-readable code, so callers can branch without
    /// string-matching messages.
    pub fn code(&self) -> &'static str {
        match self {
            StoreError::InvalidType(_) => "invalid_type",
            StoreError::InvalidStatus(_) => "invalid_status",
            StoreError::InvalidDueDate(_) => "invalid_due_date",
            StoreError::InvalidDuration(_) => "invalid_duration",
            StoreError::Io(_) => "io",
        }
    }
}

/// Outcome of resolving an id-or-prefix against one collection.
///
/// The public `get`/`update` paths collapse `NotFound` and `Ambiguous` to
/// "no match" (the historical policy); callers that need to tell them apart
/// can use [`lookup`] directly.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Lookup {
    /// Index of the single matching entry
    Found(usize),
    NotFound,
    /// Ids of all entries sharing the prefix
    Ambiguous(Vec<String>),
}

impl Lookup {
    pub fn index(&self) -> Option<usize> {
        match self {
            Lookup::Found(i) => Some(*i),
            _ => None,
        }
    }
}

/// Resolve `key` against a collection: exact-id match first, then unique
/// prefix.
pub fn lookup(entries: &[Entry], key: &str) -> Lookup {
    if let Some(i) = entries.iter().position(|e| e.id == key) {
        return Lookup::Found(i);
    }
    let matches: Vec<usize> = entries
        .iter()
        .enumerate()
        .filter(|(_, e)| e.id.starts_with(key))
        .map(|(i, _)| i)
        .collect();
    match matches.as_slice() {
        [] => Lookup::NotFound,
        [i] => Lookup::Found(*i),
        many => Lookup::Ambiguous(many.iter().map(|&i| entries[i].id.clone()).collect()),
    }
}

/// Whether a stored parent pointer refers to the entry identified by `key`.
/// Stored parents may be bare prefixes (see `add`), so the match runs in
/// both directions.
pub(crate) fn parent_matches(parent: &str, key: &str) -> bool {
    parent.starts_with(key) || key.starts_with(parent)
}

/// Options for importing an external entry set
#[derive(Debug, Clone, Copy, Default)]
pub struct ImportOptions {
    /// Overwrite entries whose id already exists
    pub merge: bool,
    /// Leave colliding entries untouched (also the behavior when neither
    /// flag is set)
    pub skip_existing: bool,
}

/// Result of an import operation
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ImportReport {
    pub added: usize,
    pub updated: usize,
}

/// Aggregate counts across primary + archive
#[derive(Debug, Clone, Default)]
pub struct StoreStats {
    pub total: usize,
    pub by_status: IndexMap<&'static str, usize>,
    pub by_type: IndexMap<&'static str, usize>,
    /// Entries with priority 1
    pub priority_one: usize,
    /// Priority-1 entries still in raw or active status
    pub priority_one_actionable: usize,
    /// Created in the trailing 7 days
    pub created_last_week: usize,
    /// Updated since local midnight
    pub updated_today: usize,
}

/// Durable CRUD for entries. Every operation loads its backing file fully,
/// mutates in memory, and writes back atomically. There is no cross-process
/// locking: concurrent writers are last-write-wins.
pub struct EntryStore {
    data_dir: PathBuf,
}

impl EntryStore {
    /// Open a store rooted at an explicit data directory (created if absent).
    pub fn new(data_dir: impl Into<PathBuf>) -> io::Result<Self> {
        let data_dir = data_dir.into();
        std::fs::create_dir_all(&data_dir)?;
        Ok(EntryStore { data_dir })
    }

    pub fn data_dir(&self) -> &Path {
        &self.data_dir
    }

    fn entries_path(&self) -> PathBuf {
        self.data_dir.join("entries.json")
    }

    fn archive_path(&self) -> PathBuf {
        self.data_dir.join("archive.json")
    }

    pub(crate) fn load_primary(&self) -> Vec<Entry> {
        read_entries(&self.entries_path())
    }

    pub(crate) fn load_archive(&self) -> Vec<Entry> {
        read_entries(&self.archive_path())
    }

    pub(crate) fn save_primary(&self, entries: &[Entry]) -> io::Result<()> {
        write_entries(&self.entries_path(), entries)
    }

    pub(crate) fn save_archive(&self, entries: &[Entry]) -> io::Result<()> {
        write_entries(&self.archive_path(), entries)
    }

    // -----------------------------------------------------------------------
    // Create
    // -----------------------------------------------------------------------

    /// Validate, normalize, and store a new entry with status `raw`.
    pub fn add(&self, fields: NewEntry) -> Result<Entry, StoreError> {
        let mut primary = self.load_primary();
        let now = Utc::now();

        // Unrecognized type names fall back to idea
        let entry_type = fields
            .entry_type
            .as_deref()
            .and_then(EntryType::parse)
            .unwrap_or(EntryType::Idea);

        // Out-of-range priorities are dropped, not rejected
        let priority = fields
            .priority
            .filter(|p| (1..=3).contains(p))
            .map(|p| p as u8);

        let due = match fields.due.as_deref().map(str::trim) {
            Some(expr) if !expr.is_empty() => Some(resolve_due(expr)?),
            _ => None,
        };

        let parent = fields.parent.map(|p| resolve_parent(&primary, p));

        let mut tags = Vec::new();
        for tag in fields.tags {
            if !tags.contains(&tag) {
                tags.push(tag);
            }
        }

        let entry = Entry {
            id: Uuid::new_v4().simple().to_string(),
            content: fields.content,
            title: fields.title,
            entry_type,
            status: EntryStatus::Raw,
            priority,
            tags,
            parent,
            related: fields.related,
            due,
            started_at: None,
            created_at: now,
            updated_at: now,
            source: fields.source,
        };

        primary.push(entry.clone());
        self.save_primary(&primary)?;
        Ok(entry)
    }

    // -----------------------------------------------------------------------
    // Read
    // -----------------------------------------------------------------------

    /// Find an entry by exact id or unique prefix, checking the primary
    /// collection first, then the archive. Ambiguous prefixes yield `None`.
    pub fn get(&self, key: &str) -> Option<Entry> {
        let primary = self.load_primary();
        if let Lookup::Found(i) = lookup(&primary, key) {
            return Some(primary[i].clone());
        }
        let archive = self.load_archive();
        lookup(&archive, key).index().map(|i| archive[i].clone())
    }

    /// Per-key `get`, skipping misses. Callers detect count mismatches.
    pub fn get_many(&self, keys: &[String]) -> Vec<Entry> {
        keys.iter().filter_map(|k| self.get(k)).collect()
    }

    /// All primary entries whose parent pointer refers to the given id.
    pub fn get_children(&self, key: &str) -> Vec<Entry> {
        self.load_primary()
            .into_iter()
            .filter(|e| e.parent.as_deref().is_some_and(|p| parent_matches(p, key)))
            .collect()
    }

    // -----------------------------------------------------------------------
    // Update
    // -----------------------------------------------------------------------

    /// Apply a patch to the entry matching `key` (primary first, then
    /// archive). Returns `Ok(None)` when no unique match exists. Enum fields
    /// are validated before anything is touched.
    pub fn update(&self, key: &str, patch: EntryPatch) -> Result<Option<Entry>, StoreError> {
        let entry_type = match &patch.entry_type {
            Some(t) => {
                Some(EntryType::parse(t).ok_or_else(|| StoreError::InvalidType(t.clone()))?)
            }
            None => None,
        };
        let status = match &patch.status {
            Some(s) => {
                let parsed =
                    EntryStatus::parse(s).ok_or_else(|| StoreError::InvalidStatus(s.clone()))?;
                // archived is reached only through the archive operation
                if parsed == EntryStatus::Archived {
                    return Err(StoreError::InvalidStatus(s.clone()));
                }
                Some(parsed)
            }
            None => None,
        };
        let due = match &patch.due {
            Some(Some(expr)) => Some(Some(resolve_due(expr)?)),
            Some(None) => Some(None),
            None => None,
        };

        let mut primary = self.load_primary();
        if let Lookup::Found(i) = lookup(&primary, key) {
            let parent = patch
                .parent
                .clone()
                .map(|p| p.map(|raw| resolve_parent(&primary, raw)));
            apply_patch(&mut primary[i], &patch, entry_type, status, due, parent);
            let updated = primary[i].clone();
            self.save_primary(&primary)?;
            return Ok(Some(updated));
        }

        let mut archive = self.load_archive();
        if let Lookup::Found(i) = lookup(&archive, key) {
            let parent = patch
                .parent
                .clone()
                .map(|p| p.map(|raw| resolve_parent(&primary, raw)));
            apply_patch(&mut archive[i], &patch, entry_type, status, due, parent);
            let updated = archive[i].clone();
            self.save_archive(&archive)?;
            return Ok(Some(updated));
        }

        Ok(None)
    }

    // -----------------------------------------------------------------------
    // Archive / delete / restore / import
    // -----------------------------------------------------------------------

    /// Move every entry whose id matches (exact or prefix) any requested key
    /// out of the primary collection into the archive, with status
    /// bookkeeping. Returns the moved entries.
    pub fn archive(&self, keys: &[String]) -> Result<Vec<Entry>, StoreError> {
        let primary = self.load_primary();
        let mut archive = self.load_archive();
        let now = Utc::now();

        let (mut moved, kept): (Vec<Entry>, Vec<Entry>) =
            primary.into_iter().partition(|e| id_matches_any(e, keys));
        if moved.is_empty() {
            return Ok(moved);
        }
        for entry in &mut moved {
            entry.status = EntryStatus::Archived;
            entry.updated_at = now;
        }
        archive.extend(moved.iter().cloned());

        self.save_primary(&kept)?;
        self.save_archive(&archive)?;
        Ok(moved)
    }

    /// Permanently remove matching entries from both collections. The store
    /// performs no audit; callers log snapshots first via the deletion log.
    pub fn delete(&self, keys: &[String]) -> Result<Vec<Entry>, StoreError> {
        let mut removed = Vec::new();

        let primary = self.load_primary();
        let (hit, kept): (Vec<Entry>, Vec<Entry>) =
            primary.into_iter().partition(|e| id_matches_any(e, keys));
        if !hit.is_empty() {
            self.save_primary(&kept)?;
            removed.extend(hit);
        }

        let archive = self.load_archive();
        let (hit, kept): (Vec<Entry>, Vec<Entry>) =
            archive.into_iter().partition(|e| id_matches_any(e, keys));
        if !hit.is_empty() {
            self.save_archive(&kept)?;
            removed.extend(hit);
        }

        Ok(removed)
    }

    /// Re-insert full entry snapshots into the primary collection. A
    /// snapshot that was archived comes back as `raw`.
    pub fn restore(&self, snapshots: &[Entry]) -> Result<usize, StoreError> {
        if snapshots.is_empty() {
            return Ok(0);
        }
        let mut primary = self.load_primary();
        for snapshot in snapshots {
            let mut entry = snapshot.clone();
            if entry.status == EntryStatus::Archived {
                entry.status = EntryStatus::Raw;
            }
            primary.push(entry);
        }
        self.save_primary(&primary)?;
        Ok(snapshots.len())
    }

    /// Import an external entry set into the primary collection.
    pub fn import(
        &self,
        incoming: Vec<Entry>,
        options: ImportOptions,
    ) -> Result<ImportReport, StoreError> {
        let mut primary = self.load_primary();
        let mut report = ImportReport::default();

        for entry in incoming {
            match primary.iter().position(|e| e.id == entry.id) {
                Some(i) if options.merge && !options.skip_existing => {
                    primary[i] = entry;
                    report.updated += 1;
                }
                Some(_) => {} // collision left untouched
                None => {
                    primary.push(entry);
                    report.added += 1;
                }
            }
        }

        if report.added > 0 || report.updated > 0 {
            self.save_primary(&primary)?;
        }
        Ok(report)
    }

    // -----------------------------------------------------------------------
    // Stats
    // -----------------------------------------------------------------------

    /// Aggregate counts across primary + archive.
    pub fn stats(&self) -> StoreStats {
        let mut all = self.load_primary();
        all.extend(self.load_archive());

        let now = Utc::now();
        let week_ago = now - chrono::Duration::days(7);
        let midnight = local_midnight();

        let mut stats = StoreStats {
            total: all.len(),
            ..Default::default()
        };
        for entry in &all {
            *stats.by_status.entry(entry.status.as_str()).or_insert(0) += 1;
            *stats.by_type.entry(entry.entry_type.as_str()).or_insert(0) += 1;
            if entry.priority == Some(1) {
                stats.priority_one += 1;
                if matches!(entry.status, EntryStatus::Raw | EntryStatus::Active) {
                    stats.priority_one_actionable += 1;
                }
            }
            if entry.created_at >= week_ago {
                stats.created_last_week += 1;
            }
            if entry.updated_at >= midnight {
                stats.updated_today += 1;
            }
        }
        stats
    }
}

/// Resolve a due-date expression or fail with `InvalidDueDate`.
fn resolve_due(expr: &str) -> Result<DateTime<Utc>, StoreError> {
    resolve_date(expr, Local::now())
        .map(|t| t.with_timezone(&Utc))
        .ok_or_else(|| StoreError::InvalidDueDate(expr.to_string()))
}

/// Resolve a parent reference by exact id or unique prefix. Zero or multiple
/// matches fall back to storing the raw input string.
fn resolve_parent(primary: &[Entry], raw: String) -> String {
    match lookup(primary, &raw) {
        Lookup::Found(i) => primary[i].id.clone(),
        _ => raw,
    }
}

fn id_matches_any(entry: &Entry, keys: &[String]) -> bool {
    keys.iter().any(|k| entry.id.starts_with(k.as_str()))
}

/// Local midnight as a UTC instant
fn local_midnight() -> DateTime<Utc> {
    use chrono::TimeZone;
    let today = Local::now().date_naive();
    Local
        .from_local_datetime(&today.and_hms_opt(0, 0, 0).expect("valid midnight"))
        .earliest()
        .map(|t| t.with_timezone(&Utc))
        .unwrap_or_else(Utc::now)
}

fn apply_patch(
    entry: &mut Entry,
    patch: &EntryPatch,
    entry_type: Option<EntryType>,
    status: Option<EntryStatus>,
    due: Option<Option<DateTime<Utc>>>,
    parent: Option<Option<String>>,
) {
    let now = Utc::now();

    if let Some(content) = &patch.content {
        entry.content = content.clone();
    }
    if let Some(title) = &patch.title {
        entry.title = Some(title.clone());
    }
    if let Some(t) = entry_type {
        entry.entry_type = t;
    }
    if let Some(new_status) = status
        && new_status != entry.status
    {
        let was_wip = entry.status == EntryStatus::Wip;
        entry.status = new_status;
        // started_at tracks time spent in wip
        if new_status == EntryStatus::Wip {
            entry.started_at = Some(now);
        } else if was_wip {
            entry.started_at = None;
        }
    }
    if let Some(priority) = patch.priority {
        // explicit null clears; out-of-range values are dropped like on add
        entry.priority = priority.filter(|p| (1..=3).contains(p));
    }
    if let Some(tags) = &patch.tags {
        let mut deduped = Vec::new();
        for tag in tags {
            if !deduped.contains(tag) {
                deduped.push(tag.clone());
            }
        }
        entry.tags = deduped;
    }
    if let Some(parent) = parent {
        entry.parent = parent;
    }
    if let Some(related) = &patch.related {
        entry.related = related.clone();
    }
    if let Some(due) = due {
        entry.due = due;
    }
    if let Some(started_at) = patch.started_at {
        entry.started_at = started_at;
    }
    if let Some(source) = &patch.source {
        entry.source = Some(source.clone());
    }

    entry.updated_at = now;
}
