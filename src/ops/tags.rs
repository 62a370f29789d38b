use chrono::Utc;
use indexmap::IndexMap;

use crate::model::entry::Entry;
use crate::ops::entry_ops::{EntryStore, StoreError};

impl EntryStore {
    /// Tag usage counts across primary + archive, most used first. Ties keep
    /// first-seen order.
    pub fn all_tags(&self) -> Vec<(String, usize)> {
        let mut counts: IndexMap<String, usize> = IndexMap::new();
        for entry in self.load_primary().iter().chain(self.load_archive().iter()) {
            for tag in &entry.tags {
                *counts.entry(tag.clone()).or_insert(0) += 1;
            }
        }
        let mut tags: Vec<(String, usize)> = counts.into_iter().collect();
        tags.sort_by(|a, b| b.1.cmp(&a.1));
        tags
    }

    /// Replace every exact occurrence of `old` with `new` in both
    /// collections, bumping `updated_at` on each touched entry. Returns how
    /// many entries changed.
    pub fn rename_tag(&self, old: &str, new: &str) -> Result<usize, StoreError> {
        let mut touched = 0;

        let mut primary = self.load_primary();
        if rename_in(&mut primary, old, new, &mut touched) {
            self.save_primary(&primary)?;
        }

        let mut archive = self.load_archive();
        if rename_in(&mut archive, old, new, &mut touched) {
            self.save_archive(&archive)?;
        }

        Ok(touched)
    }
}

fn rename_in(entries: &mut [Entry], old: &str, new: &str, touched: &mut usize) -> bool {
    let mut changed = false;
    for entry in entries {
        if !entry.tags.iter().any(|t| t == old) {
            continue;
        }
        let mut renamed = Vec::with_capacity(entry.tags.len());
        for tag in &entry.tags {
            let tag = if tag == old { new.to_string() } else { tag.clone() };
            // renaming onto an existing tag must not introduce a duplicate
            if !renamed.contains(&tag) {
                renamed.push(tag);
            }
        }
        entry.tags = renamed;
        entry.updated_at = Utc::now();
        *touched += 1;
        changed = true;
    }
    changed
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::entry::NewEntry;
    use tempfile::TempDir;

    fn store() -> (TempDir, EntryStore) {
        let dir = TempDir::new().unwrap();
        let store = EntryStore::new(dir.path()).unwrap();
        (dir, store)
    }

    fn add_tagged(store: &EntryStore, content: &str, tags: &[&str]) -> Entry {
        store
            .add(NewEntry {
                content: content.into(),
                tags: tags.iter().map(|t| t.to_string()).collect(),
                ..Default::default()
            })
            .unwrap()
    }

    #[test]
    fn all_tags_counts_and_sorts_descending() {
        let (_dir, store) = store();
        add_tagged(&store, "a", &["rust", "cli"]);
        add_tagged(&store, "b", &["rust"]);
        let archived = add_tagged(&store, "c", &["rust", "paper"]);
        store.archive(&[archived.id]).unwrap();

        let tags = store.all_tags();
        assert_eq!(tags[0], ("rust".to_string(), 3));
        assert_eq!(tags.len(), 3);
        // ties keep first-seen order
        assert_eq!(tags[1].0, "cli");
        assert_eq!(tags[2].0, "paper");
    }

    #[test]
    fn rename_is_global_and_bumps_timestamps() {
        let (_dir, store) = store();
        let a = add_tagged(&store, "a", &["old", "keep"]);
        let b = add_tagged(&store, "b", &["old"]);
        let c = add_tagged(&store, "c", &["old"]);
        store.archive(&[c.id.clone()]).unwrap();
        add_tagged(&store, "d", &["unrelated"]);

        let touched = store.rename_tag("old", "new").unwrap();
        assert_eq!(touched, 3);

        let a2 = store.get(&a.id).unwrap();
        assert_eq!(a2.tags, vec!["new", "keep"]);
        assert!(a2.updated_at > a.updated_at);
        assert!(store.get(&b.id).unwrap().updated_at > b.updated_at);
        assert_eq!(store.get(&c.id).unwrap().tags, vec!["new"]);
    }

    #[test]
    fn rename_onto_existing_tag_deduplicates() {
        let (_dir, store) = store();
        let a = add_tagged(&store, "a", &["old", "new"]);
        store.rename_tag("old", "new").unwrap();
        assert_eq!(store.get(&a.id).unwrap().tags, vec!["new"]);
    }

    #[test]
    fn rename_missing_tag_touches_nothing() {
        let (_dir, store) = store();
        let a = add_tagged(&store, "a", &["keep"]);
        assert_eq!(store.rename_tag("ghost", "new").unwrap(), 0);
        assert_eq!(store.get(&a.id).unwrap().updated_at, a.updated_at);
    }
}
