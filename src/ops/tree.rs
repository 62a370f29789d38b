use crate::model::entry::Entry;
use crate::ops::entry_ops::{EntryStore, Lookup, lookup, parent_matches};

/// Default recursion cap for hierarchy construction. Parent pointers are not
/// checked for cycles, so the cap also bounds traversal of malformed data.
pub const DEFAULT_MAX_DEPTH: usize = 10;

/// An entry plus its resolved children
#[derive(Debug, Clone)]
pub struct TreeNode {
    pub entry: Entry,
    /// Empty past the depth cap, regardless of actual descendants
    pub children: Vec<TreeNode>,
}

/// Build a forest from parent pointers.
///
/// Explicit `roots` are resolved by exact id or unique prefix; keys with no
/// unique match are silently dropped. With no explicit roots, every entry
/// without a parent becomes a root.
pub fn build_forest(entries: &[Entry], roots: &[String], max_depth: usize) -> Vec<TreeNode> {
    let root_entries: Vec<&Entry> = if roots.is_empty() {
        entries.iter().filter(|e| e.parent.is_none()).collect()
    } else {
        roots
            .iter()
            .filter_map(|key| match lookup(entries, key) {
                Lookup::Found(i) => Some(&entries[i]),
                _ => None,
            })
            .collect()
    };

    root_entries
        .into_iter()
        .map(|e| build_node(entries, e, 0, max_depth))
        .collect()
}

fn build_node(entries: &[Entry], entry: &Entry, depth: usize, max_depth: usize) -> TreeNode {
    let children = if depth >= max_depth {
        Vec::new()
    } else {
        entries
            .iter()
            .filter(|c| {
                c.id != entry.id
                    && c.parent
                        .as_deref()
                        .is_some_and(|p| parent_matches(p, &entry.id))
            })
            .map(|c| build_node(entries, c, depth + 1, max_depth))
            .collect()
    };
    TreeNode {
        entry: entry.clone(),
        children,
    }
}

impl EntryStore {
    /// Build a hierarchy view over the primary collection.
    pub fn tree(&self, roots: &[String], max_depth: usize) -> Vec<TreeNode> {
        build_forest(&self.load_primary(), roots, max_depth)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::entry::{EntryStatus, EntryType};
    use chrono::Utc;

    fn entry(id: &str, parent: Option<&str>) -> Entry {
        let now = Utc::now();
        Entry {
            id: id.into(),
            content: id.into(),
            title: None,
            entry_type: EntryType::Idea,
            status: EntryStatus::Raw,
            priority: None,
            tags: Vec::new(),
            parent: parent.map(Into::into),
            related: Vec::new(),
            due: None,
            started_at: None,
            created_at: now,
            updated_at: now,
            source: None,
        }
    }

    fn pool() -> Vec<Entry> {
        vec![
            entry("root-a", None),
            entry("root-b", None),
            entry("child-1", Some("root-a")),
            entry("grandchild", Some("child-1")),
        ]
    }

    #[test]
    fn parentless_entries_become_roots_by_default() {
        let forest = build_forest(&pool(), &[], DEFAULT_MAX_DEPTH);
        assert_eq!(forest.len(), 2);
        let a = &forest[0];
        assert_eq!(a.entry.id, "root-a");
        assert_eq!(a.children.len(), 1);
        assert_eq!(a.children[0].children[0].entry.id, "grandchild");
        assert!(forest[1].children.is_empty());
    }

    #[test]
    fn explicit_roots_resolve_by_prefix_and_drop_misses() {
        let forest = build_forest(
            &pool(),
            &["child".into(), "no-such".into()],
            DEFAULT_MAX_DEPTH,
        );
        assert_eq!(forest.len(), 1);
        assert_eq!(forest[0].entry.id, "child-1");
        assert_eq!(forest[0].children.len(), 1);
    }

    #[test]
    fn ambiguous_root_prefix_is_dropped() {
        let forest = build_forest(&pool(), &["root".into()], DEFAULT_MAX_DEPTH);
        assert!(forest.is_empty());
    }

    #[test]
    fn depth_cap_truncates_with_empty_children() {
        let forest = build_forest(&pool(), &["root-a".into()], 1);
        assert_eq!(forest[0].children.len(), 1);
        // grandchild exists but the cap hides it
        assert!(forest[0].children[0].children.is_empty());
    }

    #[test]
    fn depth_cap_bounds_a_parent_cycle() {
        let mut cyclic = vec![entry("a1", Some("b1")), entry("b1", Some("a1"))];
        cyclic.push(entry("c1", None));
        // would recurse forever without the cap
        let forest = build_forest(&cyclic, &["a1".into()], 4);
        assert_eq!(forest.len(), 1);
    }
}
