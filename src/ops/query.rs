use chrono::{DateTime, Local, Utc};

use crate::dates::{parse_duration, resolve_date};
use crate::model::entry::{Entry, EntryStatus, EntryType};
use crate::ops::entry_ops::{EntryStore, StoreError, parent_matches};

/// Sort order for query results
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum SortKey {
    /// Newest first
    #[default]
    Created,
    /// Most recently touched first
    Updated,
    /// 1 before 2 before 3; unprioritized last
    Priority,
    /// Soonest first; entries without a due date last
    Due,
}

impl SortKey {
    pub fn parse(s: &str) -> Option<SortKey> {
        match s {
            "created" => Some(SortKey::Created),
            "updated" => Some(SortKey::Updated),
            "priority" => Some(SortKey::Priority),
            "due" => Some(SortKey::Due),
            _ => None,
        }
    }
}

/// Parse a comma-separated status list ("raw,active") into the typed set.
pub fn parse_status_list(s: &str) -> Result<Vec<EntryStatus>, StoreError> {
    s.split(',')
        .map(str::trim)
        .filter(|t| !t.is_empty())
        .map(|t| EntryStatus::parse(t).ok_or_else(|| StoreError::InvalidStatus(t.to_string())))
        .collect()
}

/// A filter-sort-limit request over one collection. All predicates are
/// optional and combine with logical AND.
#[derive(Debug, Clone, Default)]
pub struct Query {
    pub entry_type: Option<EntryType>,
    pub not_type: Option<EntryType>,
    /// Acceptable statuses; empty means any. Including `archived` redirects
    /// the query to the archive collection.
    pub statuses: Vec<EntryStatus>,
    /// Entry must carry every listed tag
    pub tags: Vec<String>,
    /// Entry must carry at least one listed tag
    pub any_tags: Vec<String>,
    /// Entry must carry none of the listed tags
    pub not_tags: Vec<String>,
    pub priority: Option<u8>,
    /// Entry's parent refers to this id (prefix rules)
    pub parent: Option<String>,
    /// Entry has no parent
    pub orphans: bool,
    /// Created at/after now − duration ("7d", "12h", "2w", "1m")
    pub since: Option<String>,
    /// Created strictly before now − duration
    pub before: Option<String>,
    /// Created within an inclusive absolute range
    pub between: Option<(DateTime<Utc>, DateTime<Utc>)>,
    /// Has a due date at/before this resolved date expression
    pub due_before: Option<String>,
    /// Has a due date at/after this resolved date expression
    pub due_after: Option<String>,
    /// Due strictly before now and not done/archived
    pub overdue: bool,
    pub has_due: Option<bool>,
    /// Without this, done entries are filtered out unless the status filter
    /// itself asks for done
    pub include_done: bool,
    pub sort: SortKey,
    pub reverse: bool,
    pub limit: Option<usize>,
}

/// Query output: the (possibly truncated) page plus the pre-limit total.
#[derive(Debug, Clone)]
pub struct QueryResult {
    pub entries: Vec<Entry>,
    /// Count after filtering, before the limit was applied
    pub total: usize,
}

impl Query {
    /// Whether this query reads the archive collection instead of primary.
    pub fn targets_archive(&self) -> bool {
        self.statuses.contains(&EntryStatus::Archived)
    }

    /// Filter, sort, optionally reverse, capture the total, then truncate.
    pub fn run(&self, entries: Vec<Entry>, now: DateTime<Utc>) -> Result<QueryResult, StoreError> {
        let since = self.resolve_cutoff(&self.since, now)?;
        let before = self.resolve_cutoff(&self.before, now)?;
        let due_before = self.resolve_expr(&self.due_before, now)?;
        let due_after = self.resolve_expr(&self.due_after, now)?;

        let exclude_done = !self.include_done && !self.statuses.contains(&EntryStatus::Done);

        let mut matched: Vec<Entry> = entries
            .into_iter()
            .filter(|e| {
                if exclude_done && e.status == EntryStatus::Done {
                    return false;
                }
                if let Some(t) = self.entry_type
                    && e.entry_type != t
                {
                    return false;
                }
                if let Some(t) = self.not_type
                    && e.entry_type == t
                {
                    return false;
                }
                if !self.statuses.is_empty() && !self.statuses.contains(&e.status) {
                    return false;
                }
                if !self.tags.iter().all(|t| e.tags.contains(t)) {
                    return false;
                }
                if !self.any_tags.is_empty() && !self.any_tags.iter().any(|t| e.tags.contains(t)) {
                    return false;
                }
                if self.not_tags.iter().any(|t| e.tags.contains(t)) {
                    return false;
                }
                if let Some(p) = self.priority
                    && e.priority != Some(p)
                {
                    return false;
                }
                if let Some(key) = &self.parent
                    && !e.parent.as_deref().is_some_and(|p| parent_matches(p, key))
                {
                    return false;
                }
                if self.orphans && e.parent.is_some() {
                    return false;
                }
                if let Some(cutoff) = since
                    && e.created_at < cutoff
                {
                    return false;
                }
                if let Some(cutoff) = before
                    && e.created_at >= cutoff
                {
                    return false;
                }
                if let Some((start, end)) = self.between
                    && (e.created_at < start || e.created_at > end)
                {
                    return false;
                }
                if let Some(limit) = due_before
                    && !e.due.is_some_and(|d| d <= limit)
                {
                    return false;
                }
                if let Some(limit) = due_after
                    && !e.due.is_some_and(|d| d >= limit)
                {
                    return false;
                }
                if self.overdue {
                    let past_due = e.due.is_some_and(|d| d < now);
                    let closed =
                        matches!(e.status, EntryStatus::Done | EntryStatus::Archived);
                    if !past_due || closed {
                        return false;
                    }
                }
                if let Some(wanted) = self.has_due
                    && e.due.is_some() != wanted
                {
                    return false;
                }
                true
            })
            .collect();

        match self.sort {
            SortKey::Created => matched.sort_by(|a, b| b.created_at.cmp(&a.created_at)),
            SortKey::Updated => matched.sort_by(|a, b| b.updated_at.cmp(&a.updated_at)),
            SortKey::Priority => matched.sort_by_key(|e| e.priority.unwrap_or(99)),
            SortKey::Due => matched.sort_by_key(|e| e.due.unwrap_or(DateTime::<Utc>::MAX_UTC)),
        }
        if self.reverse {
            matched.reverse();
        }

        let total = matched.len();
        if let Some(limit) = self.limit {
            matched.truncate(limit);
        }

        Ok(QueryResult {
            entries: matched,
            total,
        })
    }

    /// `now − duration` for a relative token like "7d"
    fn resolve_cutoff(
        &self,
        token: &Option<String>,
        now: DateTime<Utc>,
    ) -> Result<Option<DateTime<Utc>>, StoreError> {
        match token {
            Some(t) => {
                let cutoff = parse_duration(t)
                    .and_then(|d| now.checked_sub_signed(d))
                    .ok_or_else(|| StoreError::InvalidDuration(t.clone()))?;
                Ok(Some(cutoff))
            }
            None => Ok(None),
        }
    }

    /// Resolve a free-form date expression relative to `now`
    fn resolve_expr(
        &self,
        expr: &Option<String>,
        now: DateTime<Utc>,
    ) -> Result<Option<DateTime<Utc>>, StoreError> {
        match expr {
            Some(e) => resolve_date(e, now.with_timezone(&Local))
                .map(|t| Some(t.with_timezone(&Utc)))
                .ok_or_else(|| StoreError::InvalidDueDate(e.clone())),
            None => Ok(None),
        }
    }
}

impl EntryStore {
    /// Run a query against the collection it targets (primary, or the
    /// archive when the status filter asks for archived entries).
    pub fn query(&self, query: &Query) -> Result<QueryResult, StoreError> {
        let entries = if query.targets_archive() {
            self.load_archive()
        } else {
            self.load_primary()
        };
        query.run(entries, Utc::now())
    }
}
