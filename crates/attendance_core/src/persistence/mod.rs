//! JSON persistence, backup bundles and auto-save.
//!
//! # Responsibility
//! - Load/save the roster, attendance and config documents in a data directory.
//! - Maintain rotating backup bundles and export/import a combined document.
//! - Drive periodic auto-save from the caller's event loop.
//!
//! # Invariants
//! - Live documents are only ever replaced via temp-file + rename.
//! - A failed save leaves the previous on-disk document and in-memory state intact.
//! - Multi-file operations (backup, restore, import) are not all-or-nothing.

pub mod autosave;
pub mod backup;
pub mod config;
pub mod documents;
pub mod manager;

use std::error::Error;
use std::fmt::{Display, Formatter};
use std::path::PathBuf;

pub use documents::DocumentKind;

pub type PersistenceResult<T> = Result<T, PersistenceError>;

/// One document that failed during a multi-document operation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DocumentFailure {
    pub kind: DocumentKind,
    pub message: String,
}

impl Display for DocumentFailure {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}: {}", self.kind.as_str(), self.message)
    }
}

/// Persistence and backup failures.
#[derive(Debug)]
pub enum PersistenceError {
    Io {
        path: PathBuf,
        source: std::io::Error,
    },
    Json {
        path: PathBuf,
        source: serde_json::Error,
    },
    /// Well-formed JSON with the wrong shape.
    InvalidDocument { path: PathBuf, message: String },
    InvalidBackupName(String),
    BackupNotFound(String),
    /// Documents existed on disk but none of them could be loaded.
    NothingLoaded(Vec<DocumentFailure>),
    /// At least one document failed to save; the others were still attempted.
    SaveIncomplete(Vec<DocumentFailure>),
}

impl PersistenceError {
    pub(crate) fn io(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        Self::Io {
            path: path.into(),
            source,
        }
    }

    pub(crate) fn json(path: impl Into<PathBuf>, source: serde_json::Error) -> Self {
        Self::Json {
            path: path.into(),
            source,
        }
    }
}

impl Display for PersistenceError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Io { path, source } => write!(f, "i/o error on `{}`: {source}", path.display()),
            Self::Json { path, source } => {
                write!(f, "invalid JSON in `{}`: {source}", path.display())
            }
            Self::InvalidDocument { path, message } => {
                write!(f, "invalid document `{}`: {message}", path.display())
            }
            Self::InvalidBackupName(name) => write!(f, "invalid backup name: `{name}`"),
            Self::BackupNotFound(name) => write!(f, "backup not found: {name}"),
            Self::NothingLoaded(failures) => {
                write!(f, "no document could be loaded")?;
                for failure in failures {
                    write!(f, "; {failure}")?;
                }
                Ok(())
            }
            Self::SaveIncomplete(failures) => {
                write!(f, "save incomplete")?;
                for failure in failures {
                    write!(f, "; {failure}")?;
                }
                Ok(())
            }
        }
    }
}

impl Error for PersistenceError {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        match self {
            Self::Io { source, .. } => Some(source),
            Self::Json { source, .. } => Some(source),
            _ => None,
        }
    }
}
