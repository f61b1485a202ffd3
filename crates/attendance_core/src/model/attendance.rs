//! Attendance session and record model.
//!
//! # Responsibility
//! - Define the closed presence status set and its on-disk labels.
//! - Define per-date sessions holding one record per student.
//!
//! # Invariants
//! - A session holds at most one record per student id (map keyed by id).
//! - A session label is first-write-wins once non-empty.
//! - Dates are ISO-8601 `YYYY-MM-DD`; lexicographic order is date order.

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

use super::student::StudentId;

/// Presence status for one student in one session.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum AttendanceStatus {
    #[serde(alias = "Présent")]
    Present,
    Absent,
    #[serde(alias = "En retard")]
    Late,
}

impl AttendanceStatus {
    /// All variants in cycling order.
    pub const ALL: [AttendanceStatus; 3] = [Self::Present, Self::Absent, Self::Late];

    /// Label written to `attendance.json`.
    pub fn label(self) -> &'static str {
        match self {
            Self::Present => "Present",
            Self::Absent => "Absent",
            Self::Late => "Late",
        }
    }

    /// Next status for quick-marking: Present -> Absent -> Late -> Present.
    pub fn next(self) -> Self {
        match self {
            Self::Present => Self::Absent,
            Self::Absent => Self::Late,
            Self::Late => Self::Present,
        }
    }

    /// Whether the student was in the room (on time or not).
    pub fn is_attending(self) -> bool {
        match self {
            Self::Present | Self::Late => true,
            Self::Absent => false,
        }
    }
}

/// One student's status for one date.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AttendanceRecord {
    pub student_id: StudentId,
    pub date: String,
    pub status: AttendanceStatus,
    /// Course/group name the mark was taken under.
    #[serde(default, alias = "td_name")]
    pub label: String,
    #[serde(default, alias = "notes")]
    pub note: String,
    /// Wall-clock `HH:MM:SS` of the mark.
    #[serde(default = "crate::model::now_time")]
    pub time_marked: String,
    #[serde(rename = "created_timestamp", default = "crate::model::now_timestamp")]
    pub created: String,
}

/// Caller input for `AttendanceStore::mark_attendance`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MarkRequest {
    pub student_id: StudentId,
    pub date: String,
    pub status: AttendanceStatus,
    pub label: String,
    pub note: String,
    /// `None` stamps the current wall-clock time.
    pub time_marked: Option<String>,
}

impl MarkRequest {
    pub fn new(
        student_id: impl Into<String>,
        date: impl Into<String>,
        status: AttendanceStatus,
    ) -> Self {
        Self {
            student_id: student_id.into(),
            date: date.into(),
            status,
            label: String::new(),
            note: String::new(),
            time_marked: None,
        }
    }

    pub fn with_label(mut self, label: impl Into<String>) -> Self {
        self.label = label.into();
        self
    }

    pub fn with_note(mut self, note: impl Into<String>) -> Self {
        self.note = note.into();
        self
    }

    pub fn with_time(mut self, time_marked: impl Into<String>) -> Self {
        self.time_marked = Some(time_marked.into());
        self
    }

    pub(crate) fn into_record(self) -> AttendanceRecord {
        AttendanceRecord {
            student_id: self.student_id,
            date: self.date,
            status: self.status,
            label: self.label,
            note: self.note,
            time_marked: self.time_marked.unwrap_or_else(super::now_time),
            created: super::now_timestamp(),
        }
    }
}

/// All records for one calendar date.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AttendanceSession {
    pub date: String,
    #[serde(default, alias = "td_name")]
    pub label: String,
    #[serde(default)]
    pub description: String,
    #[serde(rename = "created_timestamp", default = "crate::model::now_timestamp")]
    pub created: String,
    #[serde(default)]
    pub records: BTreeMap<StudentId, AttendanceRecord>,
}

impl AttendanceSession {
    pub fn new(
        date: impl Into<String>,
        label: impl Into<String>,
        description: impl Into<String>,
    ) -> Self {
        Self {
            date: date.into(),
            label: label.into(),
            description: description.into(),
            created: super::now_timestamp(),
            records: BTreeMap::new(),
        }
    }

    pub fn record(&self, student_id: &str) -> Option<&AttendanceRecord> {
        self.records.get(student_id)
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    /// Inserts or replaces the record for its student.
    ///
    /// Adopts the record label when the session has none yet.
    pub(crate) fn upsert(&mut self, record: AttendanceRecord) {
        if self.label.trim().is_empty() && !record.label.trim().is_empty() {
            self.label = record.label.clone();
        }
        self.records.insert(record.student_id.clone(), record);
    }

    /// Counts of (present, absent, late) within this session.
    pub fn status_counts(&self) -> StatusCounts {
        StatusCounts::from_statuses(self.records.values().map(|record| record.status))
    }
}

/// Per-status tally shared by store summaries and statistics.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct StatusCounts {
    pub present: usize,
    pub absent: usize,
    pub late: usize,
}

impl StatusCounts {
    pub fn from_statuses(statuses: impl IntoIterator<Item = AttendanceStatus>) -> Self {
        let mut counts = Self::default();
        for status in statuses {
            counts.add(status);
        }
        counts
    }

    pub fn add(&mut self, status: AttendanceStatus) {
        match status {
            AttendanceStatus::Present => self.present += 1,
            AttendanceStatus::Absent => self.absent += 1,
            AttendanceStatus::Late => self.late += 1,
        }
    }

    pub fn total(&self) -> usize {
        self.present + self.absent + self.late
    }
}
