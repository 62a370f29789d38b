use std::fs;
use std::io;
use std::path::Path;

use crate::io::atomic::atomic_write;
use crate::model::config::{AppConfig, RawConfig};

const CONFIG_FILE: &str = "config.json";

/// Load the config document from the data directory.
///
/// A missing file yields defaults with no warnings. A corrupt file or
/// invalid enumerated values yield defaults for the affected fields plus a
/// warning string per substitution; the load itself never fails.
pub fn load_config(data_dir: &Path) -> (AppConfig, Vec<String>) {
    let path = data_dir.join(CONFIG_FILE);
    let Ok(content) = fs::read_to_string(&path) else {
        return (AppConfig::default(), Vec::new());
    };
    match serde_json::from_str::<RawConfig>(&content) {
        Ok(raw) => raw.validate(),
        Err(e) => (
            AppConfig::default(),
            vec![format!("could not parse {}: {}", CONFIG_FILE, e)],
        ),
    }
}

/// Atomically persist the config document.
pub fn save_config(data_dir: &Path, config: &AppConfig) -> io::Result<()> {
    let content = serde_json::to_string_pretty(config)?;
    atomic_write(&data_dir.join(CONFIG_FILE), content.as_bytes())
}
