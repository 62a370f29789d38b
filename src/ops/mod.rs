pub mod deletion_log;
pub mod entry_ops;
pub mod prefs_ops;
pub mod query;
pub mod tags;
pub mod tree;

pub use deletion_log::{DELETION_LOG_CAP, DeletionLog};
pub use entry_ops::{EntryStore, ImportOptions, ImportReport, Lookup, StoreError, StoreStats};
pub use prefs_ops::{PrefsError, PrefsFile, RemoveOutcome, RemoveSpec, SetEntryOutcome};
pub use query::{Query, QueryResult, SortKey};
pub use tree::{TreeNode, build_forest};
