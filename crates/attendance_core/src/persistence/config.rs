//! Application configuration document (`config.json`).
//!
//! # Invariants
//! - Every field has a default, so partial documents load.
//! - Unknown keys survive a load/save cycle.
//! - Import never overwrites the local `created_date` / `last_backup`.

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

pub const DEFAULT_APP_NAME: &str = "Attendance Tracker";
pub const DEFAULT_AUTO_SAVE_INTERVAL_SECS: u64 = 300;
pub const DEFAULT_BACKUP_COUNT: usize = 5;

/// Config keys that keep their local value when a document is imported.
pub const IMPORT_PRESERVED_KEYS: &[&str] = &["created_date", "last_backup"];

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct AppConfig {
    pub app_name: String,
    pub version: String,
    pub auto_save: bool,
    /// Seconds between auto-save ticks.
    pub auto_save_interval: u64,
    pub backup_enabled: bool,
    /// Number of bundles kept by rotation.
    pub backup_count: usize,
    pub last_backup: Option<String>,
    pub created_date: String,
    pub last_modified: Option<String>,
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            app_name: DEFAULT_APP_NAME.to_string(),
            version: crate::core_version().to_string(),
            auto_save: true,
            auto_save_interval: DEFAULT_AUTO_SAVE_INTERVAL_SECS,
            backup_enabled: true,
            backup_count: DEFAULT_BACKUP_COUNT,
            last_backup: None,
            created_date: crate::model::now_timestamp(),
            last_modified: None,
            extra: Map::new(),
        }
    }
}

impl AppConfig {
    /// Returns a copy with `imported` merged in key by key.
    ///
    /// Keys listed in `IMPORT_PRESERVED_KEYS` keep their local value. The
    /// merged object is re-validated, so a wrongly typed imported value
    /// fails the whole merge and leaves `self` untouched.
    pub fn merged_with(&self, imported: &Map<String, Value>) -> Result<Self, serde_json::Error> {
        let mut merged = match serde_json::to_value(self)? {
            Value::Object(map) => map,
            _ => Map::new(),
        };
        for (key, value) in imported {
            if IMPORT_PRESERVED_KEYS.contains(&key.as_str()) {
                continue;
            }
            merged.insert(key.clone(), value.clone());
        }
        serde_json::from_value(Value::Object(merged))
    }
}
