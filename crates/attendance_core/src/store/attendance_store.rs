//! Attendance store: sessions keyed by date, records keyed by student id.
//!
//! # Responsibility
//! - Upsert, query and delete attendance records.
//! - Provide count-only summaries; rates belong to the statistics engine.
//! - Publish an `AttendanceEvent` for every successful mutation.
//!
//! # Invariants
//! - At most one session per date and one record per (date, student).
//! - Student ids are not checked against the roster; orphan records are legal.
//! - Date ordering is lexicographic over ISO-8601 keys.

use crate::events::{AttendanceEvent, EventBus, EventSubscriber, SubscriptionId};
use crate::model::attendance::{
    AttendanceRecord, AttendanceSession, AttendanceStatus, MarkRequest, StatusCounts,
};
use crate::store::roster_store::RosterStore;
use crate::store::{LoadReport, StoreError, StoreResult};
use log::{debug, info, warn};
use serde::Serialize;
use std::collections::{BTreeMap, BTreeSet};

/// Per-student counts returned by `summary_for_student`.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct StudentSummary {
    pub total: usize,
    pub present: usize,
    pub absent: usize,
    pub late: usize,
}

/// Store-wide counts returned by `overall_counts`.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct OverallCounts {
    pub total_sessions: usize,
    pub total_records: usize,
    pub status_counts: StatusCounts,
}

/// Owned session state plus its notification bus.
#[derive(Debug, Default)]
pub struct AttendanceStore {
    sessions: BTreeMap<String, AttendanceSession>,
    events: EventBus<AttendanceEvent>,
}

impl AttendanceStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Registers an attendance subscriber.
    pub fn subscribe(
        &mut self,
        subscriber: impl EventSubscriber<AttendanceEvent> + Send + 'static,
    ) -> SubscriptionId {
        self.events.subscribe(subscriber)
    }

    pub fn unsubscribe(&mut self, id: SubscriptionId) -> bool {
        self.events.unsubscribe(id)
    }

    /// Returns the session for `date`, creating it when absent.
    ///
    /// An existing session is returned unchanged and nothing is published.
    pub fn create_session(&mut self, date: &str, label: &str, description: &str) -> &AttendanceSession {
        if !self.sessions.contains_key(date) {
            self.sessions.insert(
                date.to_string(),
                AttendanceSession::new(date, label, description),
            );
            debug!("event=session_create module=store status=ok date={date}");
            self.events
                .publish(&AttendanceEvent::SessionCreated(date.to_string()));
        }
        &self.sessions[date]
    }

    /// Upserts the record for (date, student), creating the session first.
    ///
    /// A second mark for the same pair replaces the first one.
    pub fn mark_attendance(&mut self, request: MarkRequest) -> &AttendanceRecord {
        let date = request.date.clone();
        let student_id = request.student_id.clone();
        if !self.sessions.contains_key(&date) {
            self.create_session(&date, &request.label, "");
        }

        let record = request.into_record();
        if let Some(session) = self.sessions.get_mut(&date) {
            session.upsert(record);
        }
        debug!(
            "event=attendance_mark module=store status=ok date={date} student_id={student_id}"
        );
        self.events
            .publish(&AttendanceEvent::AttendanceMarked(date.clone()));

        &self.sessions[&date].records[&student_id]
    }

    /// Marks every id in `student_ids` with the same status and label.
    ///
    /// Returns the number of records written.
    pub fn mark_many<'a, I>(
        &mut self,
        student_ids: I,
        date: &str,
        status: AttendanceStatus,
        label: &str,
    ) -> usize
    where
        I: IntoIterator<Item = &'a str>,
    {
        let mut marked = 0;
        for student_id in student_ids {
            self.mark_attendance(MarkRequest::new(student_id, date, status).with_label(label));
            marked += 1;
        }
        marked
    }

    /// Replaces the note on an existing record.
    pub fn set_note(&mut self, student_id: &str, date: &str, note: &str) -> StoreResult<()> {
        let record = self
            .sessions
            .get_mut(date)
            .and_then(|session| session.records.get_mut(student_id))
            .ok_or_else(|| StoreError::RecordNotFound {
                student_id: student_id.to_string(),
                date: date.to_string(),
            })?;
        record.note = note.to_string();
        self.events
            .publish(&AttendanceEvent::AttendanceMarked(date.to_string()));
        Ok(())
    }

    pub fn get_session(&self, date: &str) -> Option<&AttendanceSession> {
        self.sessions.get(date)
    }

    /// All sessions, ascending by date.
    pub fn get_all_sessions(&self) -> Vec<&AttendanceSession> {
        self.sessions.values().collect()
    }

    pub fn session_count(&self) -> usize {
        self.sessions.len()
    }

    pub fn get_record(&self, student_id: &str, date: &str) -> Option<&AttendanceRecord> {
        self.sessions
            .get(date)
            .and_then(|session| session.record(student_id))
    }

    /// Every record for one student, ascending by date.
    pub fn get_records_for_student(&self, student_id: &str) -> Vec<&AttendanceRecord> {
        let mut records: Vec<&AttendanceRecord> = self
            .sessions
            .values()
            .filter_map(|session| session.record(student_id))
            .collect();
        records.sort_by(|a, b| a.date.cmp(&b.date));
        records
    }

    /// Records of one session; empty when the date is unknown.
    pub fn get_records_for_date(&self, date: &str) -> Vec<&AttendanceRecord> {
        self.sessions
            .get(date)
            .map(|session| session.records.values().collect())
            .unwrap_or_default()
    }

    /// Sessions with `start <= date <= end`, ascending.
    pub fn get_sessions_in_range(&self, start: &str, end: &str) -> Vec<&AttendanceSession> {
        if start > end {
            return Vec::new();
        }
        self.sessions
            .range::<str, _>((
                std::ops::Bound::Included(start),
                std::ops::Bound::Included(end),
            ))
            .map(|(_, session)| session)
            .collect()
    }

    /// Removes a whole session.
    pub fn delete_session(&mut self, date: &str) -> StoreResult<AttendanceSession> {
        let removed = self
            .sessions
            .remove(date)
            .ok_or_else(|| StoreError::SessionNotFound(date.to_string()))?;
        debug!("event=session_delete module=store status=ok date={date}");
        self.events
            .publish(&AttendanceEvent::SessionDeleted(date.to_string()));
        Ok(removed)
    }

    /// Removes one student's record from one session.
    ///
    /// The session itself stays even when it becomes empty.
    pub fn delete_record(&mut self, student_id: &str, date: &str) -> StoreResult<AttendanceRecord> {
        let removed = self
            .sessions
            .get_mut(date)
            .and_then(|session| session.records.remove(student_id))
            .ok_or_else(|| StoreError::RecordNotFound {
                student_id: student_id.to_string(),
                date: date.to_string(),
            })?;
        debug!(
            "event=record_delete module=store status=ok date={date} student_id={student_id}"
        );
        self.events
            .publish(&AttendanceEvent::AttendanceDeleted(date.to_string()));
        Ok(removed)
    }

    /// Status counts for one student across all sessions.
    pub fn summary_for_student(&self, student_id: &str) -> StudentSummary {
        let counts = StatusCounts::from_statuses(
            self.sessions
                .values()
                .filter_map(|session| session.record(student_id))
                .map(|record| record.status),
        );
        StudentSummary {
            total: counts.total(),
            present: counts.present,
            absent: counts.absent,
            late: counts.late,
        }
    }

    pub fn overall_counts(&self) -> OverallCounts {
        let status_counts = StatusCounts::from_statuses(
            self.sessions
                .values()
                .flat_map(|session| session.records.values())
                .map(|record| record.status),
        );
        OverallCounts {
            total_sessions: self.sessions.len(),
            total_records: status_counts.total(),
            status_counts,
        }
    }

    /// Distinct trimmed non-empty session labels, sorted.
    pub fn distinct_session_labels(&self) -> Vec<String> {
        self.sessions
            .values()
            .map(|session| session.label.trim())
            .filter(|label| !label.is_empty())
            .map(str::to_string)
            .collect::<BTreeSet<_>>()
            .into_iter()
            .collect()
    }

    /// Earliest and latest session dates, or `None` when empty.
    pub fn date_range(&self) -> Option<(&str, &str)> {
        let first = self.sessions.keys().next()?;
        let last = self.sessions.keys().next_back()?;
        Some((first.as_str(), last.as_str()))
    }

    /// Student ids with records but no roster entry, sorted.
    pub fn orphan_student_ids(&self, roster: &RosterStore) -> Vec<String> {
        self.sessions
            .values()
            .flat_map(|session| session.records.keys())
            .filter(|student_id| !roster.contains(student_id))
            .cloned()
            .collect::<BTreeSet<_>>()
            .into_iter()
            .collect()
    }

    /// Replaces every session from raw document entries.
    ///
    /// Existing state is cleared first. Each malformed session is skipped and
    /// reported; `load` is published once at the end regardless.
    pub fn replace_all<I>(&mut self, entries: I) -> LoadReport
    where
        I: IntoIterator<Item = (String, serde_json::Value)>,
    {
        self.sessions.clear();
        let mut report = LoadReport::default();

        for (key, value) in entries {
            match parse_session_entry(&key, value) {
                Ok(session) => {
                    self.sessions.insert(key, session);
                    report.loaded += 1;
                }
                Err(reason) => {
                    warn!(
                        "event=attendance_load_entry module=store status=skipped key={key} reason={reason}"
                    );
                    report.skip(key, reason);
                }
            }
        }

        info!(
            "event=attendance_load module=store status=ok loaded={} skipped={}",
            report.loaded,
            report.skipped.len()
        );
        self.events.publish(&AttendanceEvent::Loaded);
        report
    }

    /// Drops every session and publishes `load`.
    pub fn clear(&mut self) {
        self.sessions.clear();
        self.events.publish(&AttendanceEvent::Loaded);
    }

    /// Serializable snapshot keyed by date.
    pub fn to_document(&self) -> &BTreeMap<String, AttendanceSession> {
        &self.sessions
    }
}

fn parse_session_entry(key: &str, value: serde_json::Value) -> Result<AttendanceSession, String> {
    let session: AttendanceSession =
        serde_json::from_value(value).map_err(|err| err.to_string())?;
    if session.date != key {
        return Err(format!("entry key does not match date `{}`", session.date));
    }
    if let Some((record_key, record)) = session
        .records
        .iter()
        .find(|(record_key, record)| record.student_id != **record_key || record.date != key)
    {
        return Err(format!(
            "record `{record_key}` does not match its session (student_id `{}`, date `{}`)",
            record.student_id, record.date
        ));
    }
    Ok(session)
}
