//! Attendance domain model.
//!
//! # Responsibility
//! - Define roster, session and record structures shared by stores,
//!   statistics and persistence.
//! - Keep the on-disk JSON shape in one place via serde attributes.
//!
//! # Invariants
//! - Student id is the only join key between roster and attendance.
//! - Status is a closed three-variant set; no other values are representable.

pub mod attendance;
pub mod student;

use chrono::Local;

/// Local wall-clock timestamp in ISO-8601 with offset.
pub(crate) fn now_timestamp() -> String {
    Local::now().to_rfc3339()
}

/// Local wall-clock time as `HH:MM:SS`.
pub(crate) fn now_time() -> String {
    Local::now().format("%H:%M:%S").to_string()
}
