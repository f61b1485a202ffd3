//! CLI smoke entry point.
//!
//! # Responsibility
//! - Verify `attendance_core` linkage with a deterministic probe.
//! - Optionally load a data directory and print a one-screen summary.

use attendance_core::{default_log_level, init_logging, PersistenceManager};
use log::{error, info};
use std::path::PathBuf;
use std::process::ExitCode;

fn main() -> ExitCode {
    println!("attendance_core ping={}", attendance_core::ping());
    println!("attendance_core version={}", attendance_core::core_version());

    let Some(data_dir) = std::env::args_os().nth(1).map(PathBuf::from) else {
        return ExitCode::SUCCESS;
    };
    let data_dir = match std::env::current_dir() {
        Ok(cwd) => cwd.join(data_dir),
        Err(err) => {
            eprintln!("cannot resolve data directory: {err}");
            return ExitCode::FAILURE;
        }
    };

    if let Err(err) = init_logging(default_log_level(), data_dir.join("logs")) {
        eprintln!("logging disabled: {err}");
    }

    let mut manager = PersistenceManager::new(&data_dir);
    if let Err(err) = manager.load_all() {
        error!("event=cli_load module=cli status=error error={err}");
        eprintln!("load failed: {err}");
        return ExitCode::FAILURE;
    }
    info!(
        "event=cli_load module=cli status=ok dir={}",
        data_dir.display()
    );

    let overall = manager.statistics().overall_stats();
    println!("students={}", manager.roster().count());
    println!("sessions={}", manager.attendance().session_count());
    println!("average_attendance_rate={:.2}", overall.average_attendance_rate);
    println!("average_punctuality_rate={:.2}", overall.average_punctuality_rate);
    println!("needs_attention={}", overall.needs_attention.len());
    ExitCode::SUCCESS
}
