use std::io;
use std::path::PathBuf;

use chrono::Utc;

use crate::io::store_io::{read_deletion_log, write_deletion_log};
use crate::model::entry::{DeletionRecord, Entry};

/// Oldest records beyond this cap are silently dropped.
pub const DELETION_LOG_CAP: usize = 1000;

/// Append-only audit trail of deleted entries, enabling restore. A blind
/// snapshot store: it never validates or interprets entry contents.
pub struct DeletionLog {
    path: PathBuf,
}

impl DeletionLog {
    pub fn new(data_dir: impl Into<PathBuf>) -> Self {
        DeletionLog {
            path: data_dir.into().join("deleted.json"),
        }
    }

    /// Prepend a `deleted_at`-stamped snapshot of each entry (most recent
    /// first), then truncate to the cap.
    pub fn log_deletions(&self, entries: &[Entry]) -> io::Result<()> {
        if entries.is_empty() {
            return Ok(());
        }
        let deleted_at = Utc::now();
        let mut log: Vec<DeletionRecord> = entries
            .iter()
            .map(|e| DeletionRecord {
                entry: e.clone(),
                deleted_at,
            })
            .collect();
        log.extend(read_deletion_log(&self.path));
        log.truncate(DELETION_LOG_CAP);
        write_deletion_log(&self.path, &log)
    }

    /// The full log, most recent first. Missing or corrupt files read as
    /// empty.
    pub fn get_log(&self) -> Vec<DeletionRecord> {
        read_deletion_log(&self.path)
    }

    /// Drop records whose entry id equals or extends any given key, so a
    /// restored deletion cannot be restored twice. Returns how many records
    /// were dropped.
    pub fn remove_from_log(&self, keys: &[String]) -> io::Result<usize> {
        let log = read_deletion_log(&self.path);
        let before = log.len();
        let kept: Vec<DeletionRecord> = log
            .into_iter()
            .filter(|r| !keys.iter().any(|k| r.entry.id.starts_with(k.as_str())))
            .collect();
        let dropped = before - kept.len();
        if dropped > 0 {
            write_deletion_log(&self.path, &kept)?;
        }
        Ok(dropped)
    }

    pub fn clear(&self) -> io::Result<()> {
        write_deletion_log(&self.path, &[])
    }
}
