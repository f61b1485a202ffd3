//! Roster store: students keyed by id.
//!
//! # Responsibility
//! - Provide validated CRUD and search over roster entries.
//! - Publish `RosterEvent`s for every successful mutation.
//!
//! # Invariants
//! - Ids are unique and immutable; `update` never renames.
//! - `created`/`modified` timestamps are stamped here, not by callers.
//! - Iteration order is ascending by id.

use crate::events::{EventBus, EventSubscriber, RosterEvent, SubscriptionId};
use crate::model::now_timestamp;
use crate::model::student::{NewStudent, Student, StudentUpdate, StudentValidationError};
use crate::store::{LoadReport, StoreError, StoreResult};
use log::{debug, info, warn};
use std::collections::{BTreeMap, BTreeSet};

/// Owned roster state plus its notification bus.
#[derive(Debug, Default)]
pub struct RosterStore {
    students: BTreeMap<String, Student>,
    events: EventBus<RosterEvent>,
}

impl RosterStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Registers a roster subscriber.
    pub fn subscribe(
        &mut self,
        subscriber: impl EventSubscriber<RosterEvent> + Send + 'static,
    ) -> SubscriptionId {
        self.events.subscribe(subscriber)
    }

    pub fn unsubscribe(&mut self, id: SubscriptionId) -> bool {
        self.events.unsubscribe(id)
    }

    /// Validates a draft without mutating anything.
    pub fn validate_new(&self, draft: &NewStudent) -> Vec<StudentValidationError> {
        draft.validate()
    }

    /// Adds one student.
    ///
    /// # Errors
    /// - `Validation` when a required field is blank or the email is malformed.
    /// - `DuplicateStudent` when the trimmed id already exists.
    pub fn add(&mut self, draft: NewStudent) -> StoreResult<&Student> {
        if let Some(err) = draft.validate().into_iter().next() {
            return Err(err.into());
        }

        let id = draft.id.trim().to_string();
        if self.students.contains_key(&id) {
            return Err(StoreError::DuplicateStudent(id));
        }

        let now = now_timestamp();
        let student = Student {
            id: id.clone(),
            first_name: draft.first_name.trim().to_string(),
            last_name: draft.last_name.trim().to_string(),
            email: draft.email.trim().to_string(),
            phone: draft.phone.trim().to_string(),
            group: draft.group.trim().to_string(),
            created: now.clone(),
            modified: now,
        };
        self.students.insert(id.clone(), student);
        debug!("event=student_add module=store status=ok student_id={id}");
        self.events.publish(&RosterEvent::Added(id.clone()));

        Ok(&self.students[&id])
    }

    /// Applies a partial update and refreshes `modified`.
    pub fn update(&mut self, id: &str, update: StudentUpdate) -> StoreResult<&Student> {
        if !self.students.contains_key(id) {
            return Err(StoreError::StudentNotFound(id.to_string()));
        }
        update.validate()?;

        let Some(student) = self.students.get_mut(id) else {
            return Err(StoreError::StudentNotFound(id.to_string()));
        };
        if let Some(value) = update.first_name {
            student.first_name = value.trim().to_string();
        }
        if let Some(value) = update.last_name {
            student.last_name = value.trim().to_string();
        }
        if let Some(value) = update.email {
            student.email = value.trim().to_string();
        }
        if let Some(value) = update.phone {
            student.phone = value.trim().to_string();
        }
        if let Some(value) = update.group {
            student.group = value.trim().to_string();
        }
        student.modified = now_timestamp();

        debug!("event=student_update module=store status=ok student_id={id}");
        self.events.publish(&RosterEvent::Updated(id.to_string()));
        Ok(&self.students[id])
    }

    /// Removes one student. Attendance records for the id are left alone.
    pub fn delete(&mut self, id: &str) -> StoreResult<Student> {
        let removed = self
            .students
            .remove(id)
            .ok_or_else(|| StoreError::StudentNotFound(id.to_string()))?;
        debug!("event=student_delete module=store status=ok student_id={id}");
        self.events.publish(&RosterEvent::Deleted(id.to_string()));
        Ok(removed)
    }

    pub fn get(&self, id: &str) -> Option<&Student> {
        self.students.get(id)
    }

    pub fn contains(&self, id: &str) -> bool {
        self.students.contains_key(id)
    }

    /// All students, ascending by id.
    pub fn all(&self) -> Vec<&Student> {
        self.students.values().collect()
    }

    pub fn count(&self) -> usize {
        self.students.len()
    }

    pub fn is_empty(&self) -> bool {
        self.students.is_empty()
    }

    /// Case-insensitive substring match over id, names, email and group.
    ///
    /// A blank query returns the full roster.
    pub fn search(&self, query: &str) -> Vec<&Student> {
        let needle = query.trim().to_lowercase();
        if needle.is_empty() {
            return self.all();
        }

        self.students
            .values()
            .filter(|student| {
                [
                    student.id.as_str(),
                    student.first_name.as_str(),
                    student.last_name.as_str(),
                    student.email.as_str(),
                    student.group.as_str(),
                ]
                .iter()
                .any(|field| field.to_lowercase().contains(&needle))
            })
            .collect()
    }

    /// Distinct non-empty groups, trimmed and sorted.
    pub fn groups(&self) -> Vec<String> {
        self.students
            .values()
            .map(|student| student.group.trim())
            .filter(|group| !group.is_empty())
            .map(str::to_string)
            .collect::<BTreeSet<_>>()
            .into_iter()
            .collect()
    }

    /// Students whose group equals `group`, ignoring case.
    pub fn students_in_group(&self, group: &str) -> Vec<&Student> {
        let wanted = group.trim().to_lowercase();
        self.students
            .values()
            .filter(|student| student.group.trim().to_lowercase() == wanted)
            .collect()
    }

    /// Replaces the whole roster from raw document entries.
    ///
    /// Each malformed entry is skipped and reported; `load` is published
    /// once at the end regardless.
    pub fn replace_all<I>(&mut self, entries: I) -> LoadReport
    where
        I: IntoIterator<Item = (String, serde_json::Value)>,
    {
        self.students.clear();
        let mut report = LoadReport::default();

        for (key, value) in entries {
            match parse_student_entry(&key, value) {
                Ok(student) => {
                    self.students.insert(key, student);
                    report.loaded += 1;
                }
                Err(reason) => {
                    warn!(
                        "event=roster_load_entry module=store status=skipped key={key} reason={reason}"
                    );
                    report.skip(key, reason);
                }
            }
        }

        info!(
            "event=roster_load module=store status=ok loaded={} skipped={}",
            report.loaded,
            report.skipped.len()
        );
        self.events.publish(&RosterEvent::Loaded);
        report
    }

    /// Drops every student and publishes `load`.
    pub fn clear(&mut self) {
        self.students.clear();
        self.events.publish(&RosterEvent::Loaded);
    }

    /// Serializable snapshot keyed by id.
    pub fn to_document(&self) -> &BTreeMap<String, Student> {
        &self.students
    }
}

fn parse_student_entry(key: &str, value: serde_json::Value) -> Result<Student, String> {
    let student: Student = serde_json::from_value(value).map_err(|err| err.to_string())?;
    if student.id != key {
        return Err(format!(
            "entry key does not match student_id `{}`",
            student.id
        ));
    }
    student.validate().map_err(|err| err.to_string())?;
    Ok(student)
}
