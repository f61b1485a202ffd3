//! Document paths, atomic JSON writes and file metadata.
//!
//! # Invariants
//! - Writes land in a sibling temp file first, then rename over the target.
//! - A missing document reads as `None`, never as an error.

use crate::persistence::{PersistenceError, PersistenceResult};
use chrono::{DateTime, Local};
use serde::Serialize;
use std::fs::{self, File};
use std::io::Write;
use std::path::{Path, PathBuf};
use uuid::Uuid;

pub const STUDENTS_FILE: &str = "students.json";
pub const ATTENDANCE_FILE: &str = "attendance.json";
pub const CONFIG_FILE: &str = "config.json";
pub const BACKUPS_DIR: &str = "backups";

/// The three persisted documents.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum DocumentKind {
    Config,
    Students,
    Attendance,
}

impl DocumentKind {
    /// Save order: config, roster, attendance.
    pub const ALL: [DocumentKind; 3] = [Self::Config, Self::Students, Self::Attendance];

    pub fn as_str(self) -> &'static str {
        match self {
            Self::Config => "config",
            Self::Students => "students",
            Self::Attendance => "attendance",
        }
    }

    pub fn file_name(self) -> &'static str {
        match self {
            Self::Config => CONFIG_FILE,
            Self::Students => STUDENTS_FILE,
            Self::Attendance => ATTENDANCE_FILE,
        }
    }
}

/// Fixed layout of one data directory.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DataPaths {
    root: PathBuf,
}

impl DataPaths {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    pub fn document(&self, kind: DocumentKind) -> PathBuf {
        self.root.join(kind.file_name())
    }

    pub fn backups_dir(&self) -> PathBuf {
        self.root.join(BACKUPS_DIR)
    }

    /// Creates the data and backup directories when missing.
    pub fn ensure_dirs(&self) -> PersistenceResult<()> {
        let backups = self.backups_dir();
        fs::create_dir_all(&backups).map_err(|err| PersistenceError::io(&backups, err))
    }
}

/// Serializes `value` as 2-space indented UTF-8 JSON and writes it atomically.
pub fn write_json_atomic<T: Serialize + ?Sized>(path: &Path, value: &T) -> PersistenceResult<()> {
    let bytes = serde_json::to_vec_pretty(value).map_err(|err| PersistenceError::json(path, err))?;
    write_bytes_atomic(path, &bytes)
}

/// Writes `bytes` to a unique sibling temp file, syncs it, then renames it over `path`.
pub fn write_bytes_atomic(path: &Path, bytes: &[u8]) -> PersistenceResult<()> {
    let parent = match path.parent() {
        Some(parent) if !parent.as_os_str().is_empty() => parent.to_path_buf(),
        _ => PathBuf::from("."),
    };
    fs::create_dir_all(&parent).map_err(|err| PersistenceError::io(&parent, err))?;

    let file_name = path
        .file_name()
        .map(|name| name.to_string_lossy().into_owned())
        .unwrap_or_else(|| "document".to_string());
    let tmp_path = parent.join(format!(".{file_name}.{}.tmp", Uuid::new_v4().simple()));

    let result = write_and_sync(&tmp_path, bytes)
        .and_then(|()| fs::rename(&tmp_path, path).map_err(|err| PersistenceError::io(path, err)));
    if result.is_err() {
        let _ = fs::remove_file(&tmp_path);
    }
    result
}

fn write_and_sync(path: &Path, bytes: &[u8]) -> PersistenceResult<()> {
    let mut file = File::create(path).map_err(|err| PersistenceError::io(path, err))?;
    file.write_all(bytes)
        .and_then(|()| file.sync_all())
        .map_err(|err| PersistenceError::io(path, err))
}

/// Reads a JSON document; `Ok(None)` when the file does not exist.
pub fn read_json_value(path: &Path) -> PersistenceResult<Option<serde_json::Value>> {
    let bytes = match fs::read(path) {
        Ok(bytes) => bytes,
        Err(err) if err.kind() == std::io::ErrorKind::NotFound => return Ok(None),
        Err(err) => return Err(PersistenceError::io(path, err)),
    };
    serde_json::from_slice(&bytes)
        .map(Some)
        .map_err(|err| PersistenceError::json(path, err))
}

/// Reads a JSON document whose top level must be an object.
pub fn read_json_object(
    path: &Path,
) -> PersistenceResult<Option<serde_json::Map<String, serde_json::Value>>> {
    match read_json_value(path)? {
        None => Ok(None),
        Some(serde_json::Value::Object(map)) => Ok(Some(map)),
        Some(_) => Err(PersistenceError::InvalidDocument {
            path: path.to_path_buf(),
            message: "top-level value must be an object".to_string(),
        }),
    }
}

/// Display-only metadata for one document.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct FileInfo {
    pub exists: bool,
    pub size: u64,
    pub modified: Option<String>,
    pub path: PathBuf,
}

impl FileInfo {
    pub fn probe(path: &Path) -> Self {
        match fs::metadata(path) {
            Ok(metadata) => Self {
                exists: true,
                size: metadata.len(),
                modified: metadata
                    .modified()
                    .ok()
                    .map(|time| DateTime::<Local>::from(time).to_rfc3339()),
                path: path.to_path_buf(),
            },
            Err(_) => Self {
                exists: false,
                size: 0,
                modified: None,
                path: path.to_path_buf(),
            },
        }
    }
}

/// `FileInfo` for all three documents.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct DataFileInfo {
    pub students: FileInfo,
    pub attendance: FileInfo,
    pub config: FileInfo,
}

impl DataFileInfo {
    pub fn probe(paths: &DataPaths) -> Self {
        Self {
            students: FileInfo::probe(&paths.document(DocumentKind::Students)),
            attendance: FileInfo::probe(&paths.document(DocumentKind::Attendance)),
            config: FileInfo::probe(&paths.document(DocumentKind::Config)),
        }
    }
}
