//! Core domain logic for the attendance tracker.
//! Roster, attendance, statistics and persistence live here; callers only
//! drive this crate and render its results.

pub mod events;
pub mod logging;
pub mod model;
pub mod persistence;
pub mod stats;
pub mod store;

pub use events::{AttendanceEvent, EventBus, EventSubscriber, RosterEvent, SubscriptionId};
pub use logging::{default_log_level, init_logging, logging_status, LoggingError};
pub use model::attendance::{
    AttendanceRecord, AttendanceSession, AttendanceStatus, MarkRequest, StatusCounts,
};
pub use model::student::{NewStudent, Student, StudentUpdate, StudentValidationError};
pub use persistence::backup::{BackupInfo, BackupKind};
pub use persistence::config::AppConfig;
pub use persistence::manager::{
    ConfigLoad, DocumentLoad, ImportSummary, LoadSummary, PersistenceManager,
};
pub use persistence::{DocumentKind, PersistenceError, PersistenceResult};
pub use stats::engine::{OverallStats, StatisticsEngine, StudentStats, TrendPoint};
pub use stats::report::{export_report, StatisticsReport};
pub use store::attendance_store::AttendanceStore;
pub use store::roster_store::RosterStore;
pub use store::{LoadReport, SkippedEntry, StoreError, StoreResult};

/// Liveness probe printed by the CLI banner to show the core library is linked.
pub fn ping() -> &'static str {
    "pong"
}

/// Version reported in the CLI banner and stamped into `AppConfig::version`.
pub fn core_version() -> &'static str {
    env!("CARGO_PKG_VERSION")
}

#[cfg(test)]
mod tests {
    use super::{core_version, ping, AppConfig};

    #[test]
    fn liveness_probe_answers() {
        assert_eq!(ping(), "pong");
    }

    #[test]
    fn version_matches_default_config() {
        assert!(!core_version().is_empty());
        assert_eq!(AppConfig::default().version, core_version());
    }
}
