//! In-memory stores for roster and attendance state.
//!
//! # Responsibility
//! - Own the canonical maps (students by id, sessions by date).
//! - Be the sole mutator of that state and announce every mutation.
//!
//! # Invariants
//! - External callers hold identifiers only, never mutable references.
//! - Failed operations leave state untouched and publish nothing.
//! - Bulk loads skip malformed entries individually and report them.

pub mod attendance_store;
pub mod roster_store;

use crate::model::student::StudentValidationError;
use std::error::Error;
use std::fmt::{Display, Formatter};

pub type StoreResult<T> = Result<T, StoreError>;

/// Caller-correctable store failures.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum StoreError {
    Validation(StudentValidationError),
    DuplicateStudent(String),
    StudentNotFound(String),
    SessionNotFound(String),
    RecordNotFound { student_id: String, date: String },
}

impl Display for StoreError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Validation(err) => write!(f, "{err}"),
            Self::DuplicateStudent(id) => write!(f, "student already exists: {id}"),
            Self::StudentNotFound(id) => write!(f, "student not found: {id}"),
            Self::SessionNotFound(date) => write!(f, "attendance session not found: {date}"),
            Self::RecordNotFound { student_id, date } => {
                write!(f, "attendance record not found: {student_id} on {date}")
            }
        }
    }
}

impl Error for StoreError {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        match self {
            Self::Validation(err) => Some(err),
            _ => None,
        }
    }
}

impl From<StudentValidationError> for StoreError {
    fn from(value: StudentValidationError) -> Self {
        Self::Validation(value)
    }
}

/// One entry dropped during a bulk load.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SkippedEntry {
    /// Document key of the entry (student id or session date).
    pub key: String,
    pub reason: String,
}

/// Outcome of a best-effort bulk load.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct LoadReport {
    pub loaded: usize,
    pub skipped: Vec<SkippedEntry>,
}

impl LoadReport {
    pub fn is_clean(&self) -> bool {
        self.skipped.is_empty()
    }

    pub(crate) fn skip(&mut self, key: impl Into<String>, reason: impl Into<String>) {
        self.skipped.push(SkippedEntry {
            key: key.into(),
            reason: reason.into(),
        });
    }
}
