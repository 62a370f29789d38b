use std::fs;
use std::io;
use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::io::atomic::atomic_write;
use crate::model::entry::{DeletionRecord, Entry};

/// Current on-disk document version
pub const STORE_VERSION: u32 = 1;

/// On-disk shape of the primary and archive documents:
/// `{ "version": 1, "entries": [...] }`
#[derive(Debug, Serialize, Deserialize)]
struct EntriesDocument {
    version: u32,
    entries: Vec<Entry>,
}

/// Read an entries document. Missing or unparsable files yield an empty
/// collection: read paths prefer availability over failure visibility.
pub fn read_entries(path: &Path) -> Vec<Entry> {
    let Ok(content) = fs::read_to_string(path) else {
        return Vec::new();
    };
    match serde_json::from_str::<EntriesDocument>(&content) {
        Ok(doc) => doc.entries,
        Err(e) => {
            eprintln!("warning: ignoring unreadable store {}: {}", path.display(), e);
            Vec::new()
        }
    }
}

/// Atomically persist an entries document.
pub fn write_entries(path: &Path, entries: &[Entry]) -> io::Result<()> {
    let doc = EntriesDocument {
        version: STORE_VERSION,
        entries: entries.to_vec(),
    };
    let content = serde_json::to_string_pretty(&doc)?;
    atomic_write(path, content.as_bytes())
}

/// Read the deletion log: a bare list of records, most recent first.
/// Missing or unparsable files yield an empty log.
pub fn read_deletion_log(path: &Path) -> Vec<DeletionRecord> {
    let Ok(content) = fs::read_to_string(path) else {
        return Vec::new();
    };
    serde_json::from_str(&content).unwrap_or_default()
}

/// Atomically persist the deletion log.
pub fn write_deletion_log(path: &Path, records: &[DeletionRecord]) -> io::Result<()> {
    let content = serde_json::to_string_pretty(records)?;
    atomic_write(path, content.as_bytes())
}
