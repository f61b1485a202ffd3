//! Student roster model.
//!
//! # Responsibility
//! - Define the canonical roster entry joined against attendance by id.
//! - Validate caller input before it reaches the roster store.
//!
//! # Invariants
//! - `id` is caller-assigned, never blank, and never changes.
//! - `first_name` and `last_name` are never blank.
//! - New ids have at least 2 characters and a new non-empty `email` contains
//!   `@`. Loaded entries are not re-checked against these two rules.
//! - `created` / `modified` are set by the store, not by callers.

use serde::{Deserialize, Serialize};
use std::error::Error;
use std::fmt::{Display, Formatter};

/// Minimum accepted length of a trimmed student id.
pub const MIN_STUDENT_ID_CHARS: usize = 2;

/// Stable roster key shared with attendance records.
pub type StudentId = String;

/// One roster entry as persisted in `students.json`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Student {
    #[serde(rename = "student_id")]
    pub id: StudentId,
    pub first_name: String,
    pub last_name: String,
    #[serde(default)]
    pub email: String,
    #[serde(default)]
    pub phone: String,
    #[serde(default)]
    pub group: String,
    /// ISO-8601 timestamp of creation.
    #[serde(rename = "created_date", default = "crate::model::now_timestamp")]
    pub created: String,
    /// ISO-8601 timestamp of the last update.
    #[serde(rename = "modified_date", default = "crate::model::now_timestamp")]
    pub modified: String,
}

impl Student {
    /// Display name used by statistics and reports.
    pub fn full_name(&self) -> String {
        format!("{} {}", self.first_name, self.last_name)
    }

    /// Checks the structural rules a loaded entry must meet.
    ///
    /// Only blank ids and names are rejected. Id length and email shape are
    /// creation-time rules; entries written before they applied still load.
    pub fn validate(&self) -> Result<(), StudentValidationError> {
        if self.id.trim().is_empty() {
            return Err(StudentValidationError::BlankId);
        }
        if self.first_name.trim().is_empty() {
            return Err(StudentValidationError::BlankFirstName);
        }
        if self.last_name.trim().is_empty() {
            return Err(StudentValidationError::BlankLastName);
        }
        Ok(())
    }
}

/// Caller input for creating a roster entry.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct NewStudent {
    pub id: String,
    pub first_name: String,
    pub last_name: String,
    pub email: String,
    pub phone: String,
    pub group: String,
}

impl NewStudent {
    /// Creates a draft with the required fields only.
    pub fn new(
        id: impl Into<String>,
        first_name: impl Into<String>,
        last_name: impl Into<String>,
    ) -> Self {
        Self {
            id: id.into(),
            first_name: first_name.into(),
            last_name: last_name.into(),
            ..Self::default()
        }
    }

    pub fn with_email(mut self, email: impl Into<String>) -> Self {
        self.email = email.into();
        self
    }

    pub fn with_phone(mut self, phone: impl Into<String>) -> Self {
        self.phone = phone.into();
        self
    }

    pub fn with_group(mut self, group: impl Into<String>) -> Self {
        self.group = group.into();
        self
    }

    /// Returns every validation problem, in field order.
    ///
    /// An empty vector means the draft is acceptable.
    pub fn validate(&self) -> Vec<StudentValidationError> {
        validate_fields(&self.id, &self.first_name, &self.last_name, &self.email)
    }
}

/// Partial update; `None` leaves the field untouched.
///
/// The id is deliberately absent: it is immutable after creation.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct StudentUpdate {
    pub first_name: Option<String>,
    pub last_name: Option<String>,
    pub email: Option<String>,
    pub phone: Option<String>,
    pub group: Option<String>,
}

impl StudentUpdate {
    /// Validates only the fields this update would change.
    pub fn validate(&self) -> Result<(), StudentValidationError> {
        if let Some(first_name) = &self.first_name {
            if first_name.trim().is_empty() {
                return Err(StudentValidationError::BlankFirstName);
            }
        }
        if let Some(last_name) = &self.last_name {
            if last_name.trim().is_empty() {
                return Err(StudentValidationError::BlankLastName);
            }
        }
        if let Some(email) = &self.email {
            if !is_valid_email(email) {
                return Err(StudentValidationError::InvalidEmail(email.trim().to_string()));
            }
        }
        Ok(())
    }
}

/// Field-level student validation failures.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum StudentValidationError {
    BlankId,
    IdTooShort(String),
    BlankFirstName,
    BlankLastName,
    InvalidEmail(String),
}

impl Display for StudentValidationError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::BlankId => write!(f, "student id is required"),
            Self::IdTooShort(value) => write!(
                f,
                "student id `{value}` must contain at least {MIN_STUDENT_ID_CHARS} characters"
            ),
            Self::BlankFirstName => write!(f, "first name is required"),
            Self::BlankLastName => write!(f, "last name is required"),
            Self::InvalidEmail(value) => write!(f, "email address is invalid: `{value}`"),
        }
    }
}

impl Error for StudentValidationError {}

fn validate_fields(
    id: &str,
    first_name: &str,
    last_name: &str,
    email: &str,
) -> Vec<StudentValidationError> {
    let mut errors = Vec::new();

    let id = id.trim();
    if id.is_empty() {
        errors.push(StudentValidationError::BlankId);
    } else if id.chars().count() < MIN_STUDENT_ID_CHARS {
        errors.push(StudentValidationError::IdTooShort(id.to_string()));
    }
    if first_name.trim().is_empty() {
        errors.push(StudentValidationError::BlankFirstName);
    }
    if last_name.trim().is_empty() {
        errors.push(StudentValidationError::BlankLastName);
    }
    if !is_valid_email(email) {
        errors.push(StudentValidationError::InvalidEmail(email.trim().to_string()));
    }

    errors
}

fn is_valid_email(email: &str) -> bool {
    let email = email.trim();
    email.is_empty() || email.contains('@')
}
