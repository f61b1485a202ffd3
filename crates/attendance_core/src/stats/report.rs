//! Exportable statistics report document.

use crate::persistence::documents::write_json_atomic;
use crate::persistence::PersistenceResult;
use crate::stats::engine::{OverallStats, StatisticsEngine, StudentStats, TrendPoint};
use chrono::Local;
use log::info;
use serde::Serialize;
use std::path::Path;

/// Default number of sessions in the report trend window.
pub const DEFAULT_TREND_WINDOW: usize = 30;

/// Snapshot of every statistic, rates rounded to 2 decimals.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct StatisticsReport {
    pub generated_date: String,
    pub overall_statistics: OverallStats,
    pub student_statistics: Vec<StudentStats>,
    pub ranking_by_attendance: Vec<StudentStats>,
    pub trends: Vec<TrendPoint>,
}

impl StatisticsReport {
    pub fn build(engine: &StatisticsEngine<'_>, trend_window: usize) -> Self {
        let mut overall_statistics = engine.overall_stats();
        overall_statistics.best_student = overall_statistics
            .best_student
            .as_ref()
            .map(StudentStats::rounded);
        overall_statistics.needs_attention = overall_statistics
            .needs_attention
            .iter()
            .map(StudentStats::rounded)
            .collect();

        Self {
            generated_date: Local::now().to_rfc3339(),
            overall_statistics,
            student_statistics: engine
                .all_student_stats()
                .iter()
                .map(StudentStats::rounded)
                .collect(),
            ranking_by_attendance: engine
                .rank_by_attendance()
                .iter()
                .map(StudentStats::rounded)
                .collect(),
            trends: engine.trends(trend_window),
        }
    }
}

/// Writes a full statistics report as pretty JSON to `path`.
pub fn export_report(engine: &StatisticsEngine<'_>, path: &Path) -> PersistenceResult<()> {
    let report = StatisticsReport::build(engine, DEFAULT_TREND_WINDOW);
    write_json_atomic(path, &report)?;
    info!(
        "event=stats_report_export module=stats status=ok students={} path={}",
        report.student_statistics.len(),
        path.display()
    );
    Ok(())
}
