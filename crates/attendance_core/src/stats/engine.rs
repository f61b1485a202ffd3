//! Statistics engine over roster + attendance snapshots.
//!
//! # Invariants
//! - Stateless: every call recomputes from the borrowed stores.
//! - Only roster students get stats; orphan records are ignored here.
//! - Sorts are stable, so ties keep roster order.

use crate::model::attendance::{AttendanceStatus, StatusCounts};
use crate::store::attendance_store::AttendanceStore;
use crate::store::roster_store::RosterStore;
use serde::Serialize;
use std::collections::BTreeMap;

/// Attendance-rate threshold (percent) below which a student needs attention.
pub const NEEDS_ATTENTION_THRESHOLD: f64 = 70.0;

/// Derived per-student counts and rates. Never persisted.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct StudentStats {
    pub student_id: String,
    pub student_name: String,
    pub total_sessions: usize,
    pub present_count: usize,
    pub absent_count: usize,
    pub late_count: usize,
    /// (present + late) / total * 100; 0 when total is 0.
    pub attendance_rate: f64,
    /// present / total * 100; 0 when total is 0.
    pub punctuality_rate: f64,
}

impl StudentStats {
    fn from_counts(student_id: &str, student_name: String, counts: StatusCounts) -> Self {
        let total = counts.total();
        let (attendance_rate, punctuality_rate) = if total == 0 {
            (0.0, 0.0)
        } else {
            let total = total as f64;
            (
                (counts.present + counts.late) as f64 / total * 100.0,
                counts.present as f64 / total * 100.0,
            )
        };
        Self {
            student_id: student_id.to_string(),
            student_name,
            total_sessions: total,
            present_count: counts.present,
            absent_count: counts.absent,
            late_count: counts.late,
            attendance_rate,
            punctuality_rate,
        }
    }

    /// Copy with both rates rounded to 2 decimals, for reporting.
    pub fn rounded(&self) -> Self {
        Self {
            attendance_rate: round2(self.attendance_rate),
            punctuality_rate: round2(self.punctuality_rate),
            ..self.clone()
        }
    }
}

/// Roster-wide aggregate.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct OverallStats {
    pub total_students: usize,
    pub total_sessions: usize,
    /// Unweighted mean of per-student attendance rates, 2 decimals.
    pub average_attendance_rate: f64,
    /// Unweighted mean of per-student punctuality rates, 2 decimals.
    pub average_punctuality_rate: f64,
    pub best_student: Option<StudentStats>,
    /// Students below `NEEDS_ATTENTION_THRESHOLD`, worst first.
    pub needs_attention: Vec<StudentStats>,
}

/// One session in a trend window.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct TrendPoint {
    pub date: String,
    /// Percentage of records that are Present or Late; 0 for empty sessions.
    pub attendance_rate: f64,
    pub record_count: usize,
}

/// Per-date tallies for calendar views.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct DayCounts {
    pub present: usize,
    pub absent: usize,
    pub late: usize,
    pub total: usize,
}

/// Borrowing view over both stores.
#[derive(Debug, Clone, Copy)]
pub struct StatisticsEngine<'a> {
    roster: &'a RosterStore,
    attendance: &'a AttendanceStore,
}

impl<'a> StatisticsEngine<'a> {
    pub fn new(roster: &'a RosterStore, attendance: &'a AttendanceStore) -> Self {
        Self { roster, attendance }
    }

    /// Stats for one roster student; `None` when the id is not on the roster.
    pub fn student_stats(&self, student_id: &str) -> Option<StudentStats> {
        let student = self.roster.get(student_id)?;
        let counts = StatusCounts::from_statuses(
            self.attendance
                .get_records_for_student(student_id)
                .into_iter()
                .map(|record| record.status),
        );
        Some(StudentStats::from_counts(
            student_id,
            student.full_name(),
            counts,
        ))
    }

    /// One entry per roster student, in roster order.
    pub fn all_student_stats(&self) -> Vec<StudentStats> {
        self.roster
            .all()
            .into_iter()
            .filter_map(|student| self.student_stats(&student.id))
            .collect()
    }

    pub fn overall_stats(&self) -> OverallStats {
        let all = self.all_student_stats();
        if all.is_empty() {
            return OverallStats::default();
        }

        let count = all.len() as f64;
        let average_attendance_rate =
            all.iter().map(|stats| stats.attendance_rate).sum::<f64>() / count;
        let average_punctuality_rate =
            all.iter().map(|stats| stats.punctuality_rate).sum::<f64>() / count;

        let mut best: Option<&StudentStats> = None;
        for stats in &all {
            if best.map_or(true, |current| stats.attendance_rate > current.attendance_rate) {
                best = Some(stats);
            }
        }
        let best_student = best.cloned();

        let mut needs_attention: Vec<StudentStats> = all
            .iter()
            .filter(|stats| stats.attendance_rate < NEEDS_ATTENTION_THRESHOLD)
            .cloned()
            .collect();
        needs_attention.sort_by(|a, b| a.attendance_rate.total_cmp(&b.attendance_rate));

        OverallStats {
            total_students: all.len(),
            total_sessions: self.attendance.session_count(),
            average_attendance_rate: round2(average_attendance_rate),
            average_punctuality_rate: round2(average_punctuality_rate),
            best_student,
            needs_attention,
        }
    }

    /// All students, highest attendance rate first.
    pub fn rank_by_attendance(&self) -> Vec<StudentStats> {
        let mut all = self.all_student_stats();
        all.sort_by(|a, b| b.attendance_rate.total_cmp(&a.attendance_rate));
        all
    }

    /// All students, highest punctuality rate first.
    pub fn rank_by_punctuality(&self) -> Vec<StudentStats> {
        let mut all = self.all_student_stats();
        all.sort_by(|a, b| b.punctuality_rate.total_cmp(&a.punctuality_rate));
        all
    }

    /// The last `window` sessions by date, oldest first.
    ///
    /// The window counts sessions, not calendar days.
    pub fn trends(&self, window: usize) -> Vec<TrendPoint> {
        let sessions = self.attendance.get_all_sessions();
        let skip = sessions.len().saturating_sub(window);

        sessions
            .into_iter()
            .skip(skip)
            .map(|session| {
                let record_count = session.len();
                let attending = session
                    .records
                    .values()
                    .filter(|record| record.status.is_attending())
                    .count();
                let attendance_rate = if record_count == 0 {
                    0.0
                } else {
                    attending as f64 / record_count as f64 * 100.0
                };
                TrendPoint {
                    date: session.date.clone(),
                    attendance_rate,
                    record_count,
                }
            })
            .collect()
    }

    /// Per-date counts over one student's records, or all records when `None`.
    pub fn calendar(&self, student_id: Option<&str>) -> BTreeMap<String, DayCounts> {
        let records = match student_id {
            Some(id) => self.attendance.get_records_for_student(id),
            None => self
                .attendance
                .get_all_sessions()
                .into_iter()
                .flat_map(|session| session.records.values())
                .collect(),
        };

        let mut calendar: BTreeMap<String, DayCounts> = BTreeMap::new();
        for record in records {
            let day = calendar.entry(record.date.clone()).or_default();
            day.total += 1;
            match record.status {
                AttendanceStatus::Present => day.present += 1,
                AttendanceStatus::Absent => day.absent += 1,
                AttendanceStatus::Late => day.late += 1,
            }
        }
        calendar
    }
}

pub(crate) fn round2(value: f64) -> f64 {
    (value * 100.0).round() / 100.0
}
