//! Persistence manager: owns both stores, the config and the data directory.
//!
//! # Responsibility
//! - Load and save the three documents with per-document best effort.
//! - Create, list and restore backup bundles; export and import the combined document.
//! - Run auto-save ticks handed out by the schedule.
//!
//! # Invariants
//! - A document that fails to load leaves its store untouched.
//! - A failed save never discards in-memory state.
//! - Safety bundles are taken before any restore or import touches live files.

use crate::model::attendance::AttendanceSession;
use crate::model::student::Student;
use crate::persistence::autosave::{AutoSaveSchedule, MIN_INTERVAL};
use crate::persistence::backup::{
    auto_backup_name, is_well_formed_name, list_bundles, prune_bundles, read_bundle_documents,
    validate_user_backup_name, write_bundle, BackupInfo, BackupKind, BEFORE_IMPORT_BACKUP,
    BEFORE_RESTORE_BACKUP,
};
use crate::persistence::config::AppConfig;
use crate::persistence::documents::{
    read_json_object, write_bytes_atomic, write_json_atomic, DataFileInfo, DataPaths,
};
use crate::persistence::{DocumentFailure, DocumentKind, PersistenceError, PersistenceResult};
use crate::stats::engine::StatisticsEngine;
use crate::store::attendance_store::AttendanceStore;
use crate::store::roster_store::RosterStore;
use crate::store::LoadReport;
use chrono::Local;
use log::{error, info, warn};
use serde::Serialize;
use serde_json::{Map, Value};
use std::collections::BTreeMap;
use std::path::Path;
use std::time::{Duration, Instant};

/// Outcome of loading the roster or attendance document.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DocumentLoad {
    Loaded(LoadReport),
    /// No file yet; the store was left as it was.
    Missing,
    /// Unreadable or malformed document; the store was left as it was.
    Failed(String),
}

impl DocumentLoad {
    pub fn is_loaded(&self) -> bool {
        matches!(self, Self::Loaded(_))
    }
}

/// Outcome of loading the config document.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ConfigLoad {
    Loaded,
    /// No file yet; defaults were written out.
    Defaulted,
    /// Malformed file replaced with defaults; carries the parse failure.
    Recovered(String),
    /// Defaults are in effect but could not be written; carries the write failure.
    Unsaved(String),
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LoadSummary {
    pub config: ConfigLoad,
    pub students: DocumentLoad,
    pub attendance: DocumentLoad,
}

/// What an import replaced.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ImportSummary {
    pub students: Option<LoadReport>,
    pub attendance: Option<LoadReport>,
    pub config_merged: bool,
}

#[derive(Serialize)]
struct AppInfo<'a> {
    name: &'a str,
    version: &'a str,
}

#[derive(Serialize)]
struct ExportDocument<'a> {
    export_date: String,
    app_info: AppInfo<'a>,
    students: &'a BTreeMap<String, Student>,
    attendance: &'a BTreeMap<String, AttendanceSession>,
    config: &'a AppConfig,
}

#[derive(Debug)]
pub struct PersistenceManager {
    paths: DataPaths,
    config: AppConfig,
    roster: RosterStore,
    attendance: AttendanceStore,
    auto_save: AutoSaveSchedule,
}

impl PersistenceManager {
    /// Creates a manager over `data_dir` with empty stores and default config.
    ///
    /// Nothing is read or written until `load_all` or a save is called.
    pub fn new(data_dir: impl AsRef<Path>) -> Self {
        Self {
            paths: DataPaths::new(data_dir.as_ref()),
            config: AppConfig::default(),
            roster: RosterStore::new(),
            attendance: AttendanceStore::new(),
            auto_save: AutoSaveSchedule::new(),
        }
    }

    pub fn paths(&self) -> &DataPaths {
        &self.paths
    }

    pub fn config(&self) -> &AppConfig {
        &self.config
    }

    pub fn config_mut(&mut self) -> &mut AppConfig {
        &mut self.config
    }

    pub fn roster(&self) -> &RosterStore {
        &self.roster
    }

    pub fn roster_mut(&mut self) -> &mut RosterStore {
        &mut self.roster
    }

    pub fn attendance(&self) -> &AttendanceStore {
        &self.attendance
    }

    pub fn attendance_mut(&mut self) -> &mut AttendanceStore {
        &mut self.attendance
    }

    pub fn statistics(&self) -> StatisticsEngine<'_> {
        StatisticsEngine::new(&self.roster, &self.attendance)
    }

    /// Loads `config.json`, writing defaults when it is absent or malformed.
    ///
    /// Never fails: a default config that cannot be written stays in memory
    /// and is reported as `Unsaved`.
    pub fn load_config(&mut self) -> ConfigLoad {
        let path = self.paths.document(DocumentKind::Config);
        let outcome = match read_json_object(&path) {
            Ok(Some(map)) => match serde_json::from_value::<AppConfig>(Value::Object(map)) {
                Ok(config) => {
                    self.config = config;
                    ConfigLoad::Loaded
                }
                Err(err) => ConfigLoad::Recovered(err.to_string()),
            },
            Ok(None) => ConfigLoad::Defaulted,
            Err(err) => ConfigLoad::Recovered(err.to_string()),
        };

        match &outcome {
            ConfigLoad::Loaded => {
                info!("event=config_load module=persistence status=ok");
            }
            ConfigLoad::Defaulted => {
                info!("event=config_load module=persistence status=defaulted");
            }
            ConfigLoad::Recovered(reason) | ConfigLoad::Unsaved(reason) => {
                warn!("event=config_load module=persistence status=recovered error={reason}");
            }
        }
        if outcome == ConfigLoad::Loaded {
            return outcome;
        }

        self.config = AppConfig::default();
        match self.save_config() {
            Ok(()) => outcome,
            Err(err) => {
                error!("event=config_save module=persistence status=error error={err}");
                ConfigLoad::Unsaved(err.to_string())
            }
        }
    }

    pub fn load_students(&mut self) -> DocumentLoad {
        let path = self.paths.document(DocumentKind::Students);
        match read_json_object(&path) {
            Ok(Some(map)) => DocumentLoad::Loaded(self.roster.replace_all(map)),
            Ok(None) => {
                info!("event=students_load module=persistence status=missing");
                DocumentLoad::Missing
            }
            Err(err) => {
                error!("event=students_load module=persistence status=error error={err}");
                DocumentLoad::Failed(err.to_string())
            }
        }
    }

    pub fn load_attendance(&mut self) -> DocumentLoad {
        let path = self.paths.document(DocumentKind::Attendance);
        match read_json_object(&path) {
            Ok(Some(map)) => DocumentLoad::Loaded(self.attendance.replace_all(map)),
            Ok(None) => {
                info!("event=attendance_load module=persistence status=missing");
                DocumentLoad::Missing
            }
            Err(err) => {
                error!("event=attendance_load module=persistence status=error error={err}");
                DocumentLoad::Failed(err.to_string())
            }
        }
    }

    /// Loads config, roster and attendance in that order.
    ///
    /// # Errors
    /// - `NothingLoaded` when roster/attendance documents existed but none
    ///   of them loaded. A cold start with no files is not an error.
    /// - Data directory creation failures.
    ///
    /// A config that cannot be written back does not stop the other loads.
    pub fn load_all(&mut self) -> PersistenceResult<LoadSummary> {
        info!(
            "event=load_all module=persistence status=start dir={}",
            self.paths.root().display()
        );
        self.paths.ensure_dirs()?;
        let config = self.load_config();
        let students = self.load_students();
        let attendance = self.load_attendance();

        let mut failures = Vec::new();
        if let DocumentLoad::Failed(message) = &students {
            failures.push(DocumentFailure {
                kind: DocumentKind::Students,
                message: message.clone(),
            });
        }
        if let DocumentLoad::Failed(message) = &attendance {
            failures.push(DocumentFailure {
                kind: DocumentKind::Attendance,
                message: message.clone(),
            });
        }
        let any_loaded =
            students.is_loaded() || attendance.is_loaded() || config == ConfigLoad::Loaded;
        if !failures.is_empty() && !any_loaded {
            error!(
                "event=load_all module=persistence status=error failed={}",
                failures.len()
            );
            return Err(PersistenceError::NothingLoaded(failures));
        }

        self.sync_auto_save(Instant::now());
        info!(
            "event=load_all module=persistence status=ok students={} sessions={} failed={}",
            self.roster.count(),
            self.attendance.session_count(),
            failures.len()
        );
        Ok(LoadSummary {
            config,
            students,
            attendance,
        })
    }

    /// Writes `config.json`, refreshing `last_modified` first.
    pub fn save_config(&mut self) -> PersistenceResult<()> {
        self.config.last_modified = Some(crate::model::now_timestamp());
        let path = self.paths.document(DocumentKind::Config);
        write_json_atomic(&path, &self.config)
    }

    pub fn save_students(&self) -> PersistenceResult<()> {
        let path = self.paths.document(DocumentKind::Students);
        write_json_atomic(&path, self.roster.to_document())
    }

    pub fn save_attendance(&self) -> PersistenceResult<()> {
        let path = self.paths.document(DocumentKind::Attendance);
        write_json_atomic(&path, self.attendance.to_document())
    }

    /// Saves config, roster and attendance in that order.
    ///
    /// Every document is attempted even after a failure.
    pub fn save_all(&mut self) -> PersistenceResult<()> {
        let mut failures = Vec::new();
        for kind in DocumentKind::ALL {
            let result = match kind {
                DocumentKind::Config => self.save_config(),
                DocumentKind::Students => self.save_students(),
                DocumentKind::Attendance => self.save_attendance(),
            };
            if let Err(err) = result {
                error!(
                    "event=save module=persistence status=error document={} error={err}",
                    kind.as_str()
                );
                failures.push(DocumentFailure {
                    kind,
                    message: err.to_string(),
                });
            }
        }

        if failures.is_empty() {
            info!("event=save_all module=persistence status=ok");
            Ok(())
        } else {
            Err(PersistenceError::SaveIncomplete(failures))
        }
    }

    /// Saves current state and copies it into a bundle.
    ///
    /// `None` generates a `backup_<timestamp>` name. An explicit name that
    /// already exists is overwritten.
    ///
    /// # Errors
    /// - `InvalidBackupName` for unsafe or reserved names.
    /// - `SaveIncomplete` when the preliminary save fails; no bundle is written.
    pub fn create_backup(&mut self, name: Option<&str>) -> PersistenceResult<BackupInfo> {
        let (name, kind) = match name {
            Some(name) => {
                validate_user_backup_name(name)?;
                (name.to_string(), BackupKind::Manual)
            }
            None => (
                auto_backup_name(&self.paths.backups_dir(), Local::now()),
                BackupKind::Automatic,
            ),
        };
        self.take_bundle(&name, kind)
    }

    fn take_bundle(&mut self, name: &str, kind: BackupKind) -> PersistenceResult<BackupInfo> {
        info!("event=backup_create module=backup status=start name={name} kind={kind:?}");
        self.paths.ensure_dirs()?;
        self.save_all()?;
        let info = write_bundle(&self.paths, name, kind)?;

        self.config.last_backup = Some(info.created_at.to_rfc3339());
        self.save_config()?;

        if self.config.backup_enabled {
            let removed = prune_bundles(&self.paths.backups_dir(), self.config.backup_count)?;
            if !removed.is_empty() {
                info!(
                    "event=backup_rotate module=backup status=ok removed={} keep={}",
                    removed.len(),
                    self.config.backup_count
                );
            }
        }
        Ok(info)
    }

    /// Bundles newest first.
    pub fn list_backups(&self) -> PersistenceResult<Vec<BackupInfo>> {
        list_bundles(&self.paths.backups_dir())
    }

    /// Replaces live documents with bundle `name` and reloads both stores.
    ///
    /// The bundle is read into memory before the `before_restore` safety
    /// bundle is taken, so restoring that safety bundle itself is allowed.
    ///
    /// # Errors
    /// - `BackupNotFound` when no such bundle exists.
    /// - Any failure while taking the safety bundle aborts before live files change.
    pub fn restore_backup(&mut self, name: &str) -> PersistenceResult<LoadSummary> {
        let bundle_dir = self.paths.backups_dir().join(name);
        if !is_well_formed_name(name) || !bundle_dir.is_dir() {
            warn!("event=backup_restore module=backup status=error reason=not_found name={name}");
            return Err(PersistenceError::BackupNotFound(name.to_string()));
        }

        info!("event=backup_restore module=backup status=start name={name}");
        let documents = read_bundle_documents(&bundle_dir)?;
        self.take_bundle(BEFORE_RESTORE_BACKUP, BackupKind::BeforeRestore)?;

        for (kind, bytes) in &documents {
            write_bytes_atomic(&self.paths.document(*kind), bytes)?;
        }
        let summary = self.load_all()?;
        info!(
            "event=backup_restore module=backup status=ok name={name} documents={}",
            documents.len()
        );
        Ok(summary)
    }

    /// Saves current state, then writes the combined export document to `path`.
    pub fn export(&mut self, path: &Path) -> PersistenceResult<()> {
        self.save_all()?;
        let document = ExportDocument {
            export_date: crate::model::now_timestamp(),
            app_info: AppInfo {
                name: &self.config.app_name,
                version: &self.config.version,
            },
            students: self.roster.to_document(),
            attendance: self.attendance.to_document(),
            config: &self.config,
        };
        write_json_atomic(path, &document)?;
        info!(
            "event=export module=persistence status=ok path={} students={} sessions={}",
            path.display(),
            self.roster.count(),
            self.attendance.session_count()
        );
        Ok(())
    }

    /// Imports a combined document after taking the `before_import` bundle.
    ///
    /// Roster and attendance are replaced when their sections are present;
    /// config is merged key by key, keeping local `created_date` and
    /// `last_backup`. Section shapes are checked before anything is replaced.
    pub fn import(&mut self, path: &Path) -> PersistenceResult<ImportSummary> {
        info!(
            "event=import module=persistence status=start path={}",
            path.display()
        );
        self.take_bundle(BEFORE_IMPORT_BACKUP, BackupKind::BeforeImport)?;

        let mut document = read_json_object(path)?.ok_or_else(|| PersistenceError::Io {
            path: path.to_path_buf(),
            source: std::io::Error::from(std::io::ErrorKind::NotFound),
        })?;
        let students = take_section(&mut document, "students", path)?;
        let attendance = take_section(&mut document, "attendance", path)?;
        let config = take_section(&mut document, "config", path)?;

        let merged_config = match &config {
            Some(imported) => Some(self.config.merged_with(imported).map_err(|err| {
                PersistenceError::InvalidDocument {
                    path: path.to_path_buf(),
                    message: format!("config: {err}"),
                }
            })?),
            None => None,
        };

        let students = students.map(|section| self.roster.replace_all(section));
        let attendance = attendance.map(|section| self.attendance.replace_all(section));
        let config_merged = merged_config.is_some();
        if let Some(merged) = merged_config {
            self.config = merged;
            self.sync_auto_save(Instant::now());
        }

        self.save_all()?;
        info!(
            "event=import module=persistence status=ok students={} sessions={} config_merged={config_merged}",
            self.roster.count(),
            self.attendance.session_count()
        );
        Ok(ImportSummary {
            students,
            attendance,
            config_merged,
        })
    }

    pub fn file_info(&self) -> DataFileInfo {
        DataFileInfo::probe(&self.paths)
    }

    /// Clears both stores in memory; files on disk are left alone.
    pub fn reset(&mut self) {
        self.roster.clear();
        self.attendance.clear();
        info!("event=reset module=persistence status=ok");
    }

    /// Arms auto-save from config; does nothing when auto-save is disabled.
    pub fn start_auto_save(&mut self, now: Instant) -> bool {
        if !self.config.auto_save {
            self.auto_save.cancel();
            info!("event=autosave_start module=autosave status=skipped reason=disabled");
            return false;
        }
        let interval = Duration::from_secs(self.config.auto_save_interval);
        self.auto_save.arm(now, interval);
        info!(
            "event=autosave_start module=autosave status=ok interval_secs={}",
            self.auto_save.interval().as_secs()
        );
        true
    }

    /// Cancels auto-save. Safe to call repeatedly.
    pub fn stop_auto_save(&mut self) {
        if self.auto_save.cancel() {
            info!("event=autosave_stop module=autosave status=ok");
        }
    }

    /// Updates the auto-save settings in config and re-arms or cancels the schedule.
    pub fn set_auto_save(&mut self, enabled: bool, interval_secs: u64, now: Instant) -> bool {
        self.config.auto_save = enabled;
        self.config.auto_save_interval = interval_secs;
        self.start_auto_save(now)
    }

    /// Runs `save_all` when a tick is due at `now`.
    ///
    /// Returns `None` when nothing was due. The next tick is armed relative to
    /// the instant the save finished. Config edits made through `config_mut`
    /// take effect here: disabling cancels, a new interval re-arms from `now`.
    pub fn poll_auto_save(&mut self, now: Instant) -> Option<PersistenceResult<()>> {
        self.sync_auto_save(now);
        let tick = self.auto_save.take_due(now)?;
        let result = self.save_all();
        match &result {
            Ok(()) => info!("event=autosave_tick module=autosave status=ok"),
            Err(err) => error!("event=autosave_tick module=autosave status=error error={err}"),
        }
        let finished = now.max(Instant::now());
        self.auto_save.complete(tick, finished);
        Some(result)
    }

    pub fn next_auto_save_due(&self) -> Option<Instant> {
        self.auto_save.next_due()
    }

    /// Brings an armed schedule in line with the current config.
    ///
    /// A schedule that was never started stays idle.
    fn sync_auto_save(&mut self, now: Instant) {
        if !self.auto_save.is_armed() {
            return;
        }
        if !self.config.auto_save {
            self.stop_auto_save();
            return;
        }
        let configured = Duration::from_secs(self.config.auto_save_interval).max(MIN_INTERVAL);
        if configured != self.auto_save.interval() {
            self.auto_save.arm(now, configured);
            info!(
                "event=autosave_rearm module=autosave status=ok interval_secs={}",
                configured.as_secs()
            );
        }
    }
}

fn take_section(
    document: &mut Map<String, Value>,
    key: &str,
    path: &Path,
) -> PersistenceResult<Option<Map<String, Value>>> {
    match document.remove(key) {
        None | Some(Value::Null) => Ok(None),
        Some(Value::Object(map)) => Ok(Some(map)),
        Some(_) => Err(PersistenceError::InvalidDocument {
            path: path.to_path_buf(),
            message: format!("`{key}` must be an object"),
        }),
    }
}
