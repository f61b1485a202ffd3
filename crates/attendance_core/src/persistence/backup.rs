//! Backup bundle naming, creation, listing and rotation.
//!
//! # Responsibility
//! - Copy the three live documents into a named bundle directory.
//! - List bundles newest-first and prune beyond the retention count.
//!
//! # Invariants
//! - Safety bundles use reserved names and count toward rotation like any other.
//! - Auto-generated names never collide with an existing bundle.
//! - Bundles are never mutated in place; re-using a name replaces the bundle.

use crate::persistence::documents::{read_json_value, write_json_atomic, DataPaths, DocumentKind};
use crate::persistence::{PersistenceError, PersistenceResult};
use chrono::{DateTime, Local, SecondsFormat};
use log::{info, warn};
use once_cell::sync::Lazy;
use regex::Regex;
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};

/// Prefix of automatically named bundles.
pub const AUTO_BACKUP_PREFIX: &str = "backup_";
/// Reserved bundle taken right before a restore.
pub const BEFORE_RESTORE_BACKUP: &str = "before_restore";
/// Reserved bundle taken right before an import.
pub const BEFORE_IMPORT_BACKUP: &str = "before_import";
/// Manifest file written inside every bundle.
pub const BUNDLE_MANIFEST: &str = "bundle.json";

static BACKUP_NAME_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^[A-Za-z0-9][A-Za-z0-9._-]*$").expect("valid backup name regex"));

/// How a bundle came to exist.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum BackupKind {
    Automatic,
    Manual,
    BeforeRestore,
    BeforeImport,
}

impl BackupKind {
    /// Best guess for bundles written without a manifest.
    fn infer(name: &str) -> Self {
        match name {
            BEFORE_RESTORE_BACKUP => Self::BeforeRestore,
            BEFORE_IMPORT_BACKUP => Self::BeforeImport,
            _ if name.starts_with(AUTO_BACKUP_PREFIX) => Self::Automatic,
            _ => Self::Manual,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
struct BundleManifest {
    name: String,
    kind: BackupKind,
    created_at: String,
    app_version: String,
}

/// One bundle on disk.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BackupInfo {
    pub name: String,
    pub path: PathBuf,
    pub created_at: DateTime<Local>,
    pub kind: BackupKind,
}

/// Checks a caller-supplied bundle name.
///
/// Names must be a single path component made of `[A-Za-z0-9._-]`, must not
/// start with a dot, and must not take one of the reserved safety names.
pub fn validate_user_backup_name(name: &str) -> PersistenceResult<()> {
    if !is_well_formed_name(name) || is_reserved_name(name) {
        return Err(PersistenceError::InvalidBackupName(name.to_string()));
    }
    Ok(())
}

pub(crate) fn is_well_formed_name(name: &str) -> bool {
    BACKUP_NAME_RE.is_match(name)
}

pub fn is_reserved_name(name: &str) -> bool {
    matches!(name, BEFORE_RESTORE_BACKUP | BEFORE_IMPORT_BACKUP)
}

/// Generates `backup_YYYYMMDD_HHMMSS_mmm`, suffixed with a counter on collision.
pub fn auto_backup_name(backups_dir: &Path, now: DateTime<Local>) -> String {
    let base = format!("{AUTO_BACKUP_PREFIX}{}", now.format("%Y%m%d_%H%M%S_%3f"));
    if !backups_dir.join(&base).exists() {
        return base;
    }
    let mut counter = 1u32;
    loop {
        let candidate = format!("{base}_{counter}");
        if !backups_dir.join(&candidate).exists() {
            return candidate;
        }
        counter += 1;
    }
}

/// Copies the live documents of `paths` into bundle `name`.
///
/// An existing bundle with the same name is removed first. Documents that do
/// not exist yet are simply absent from the bundle.
pub fn write_bundle(
    paths: &DataPaths,
    name: &str,
    kind: BackupKind,
) -> PersistenceResult<BackupInfo> {
    let bundle_dir = paths.backups_dir().join(name);
    if bundle_dir.exists() {
        fs::remove_dir_all(&bundle_dir).map_err(|err| PersistenceError::io(&bundle_dir, err))?;
    }
    fs::create_dir_all(&bundle_dir).map_err(|err| PersistenceError::io(&bundle_dir, err))?;

    for document in DocumentKind::ALL {
        let source = paths.document(document);
        if !source.is_file() {
            continue;
        }
        let target = bundle_dir.join(document.file_name());
        fs::copy(&source, &target).map_err(|err| PersistenceError::io(&target, err))?;
    }

    let created_at = Local::now();
    let manifest = BundleManifest {
        name: name.to_string(),
        kind,
        created_at: created_at.to_rfc3339_opts(SecondsFormat::Nanos, false),
        app_version: env!("CARGO_PKG_VERSION").to_string(),
    };
    write_json_atomic(&bundle_dir.join(BUNDLE_MANIFEST), &manifest)?;

    info!(
        "event=backup_write module=backup status=ok name={name} kind={kind:?} path={}",
        bundle_dir.display()
    );
    Ok(BackupInfo {
        name: name.to_string(),
        path: bundle_dir,
        created_at,
        kind,
    })
}

/// Lists every bundle under the backups directory, newest first.
///
/// A directory counts as a bundle when it carries a manifest, has the
/// automatic prefix, or uses a reserved safety name.
pub fn list_bundles(backups_dir: &Path) -> PersistenceResult<Vec<BackupInfo>> {
    let entries = match fs::read_dir(backups_dir) {
        Ok(entries) => entries,
        Err(err) if err.kind() == std::io::ErrorKind::NotFound => return Ok(Vec::new()),
        Err(err) => return Err(PersistenceError::io(backups_dir, err)),
    };

    let mut bundles = Vec::new();
    for entry in entries {
        let entry = entry.map_err(|err| PersistenceError::io(backups_dir, err))?;
        let path = entry.path();
        if !path.is_dir() {
            continue;
        }
        let Some(name) = path.file_name().and_then(|name| name.to_str()) else {
            continue;
        };
        let name = name.to_string();

        let manifest = read_manifest(&path);
        if manifest.is_none()
            && !name.starts_with(AUTO_BACKUP_PREFIX)
            && !is_reserved_name(&name)
        {
            continue;
        }

        let (created_at, kind) = match manifest {
            Some((created_at, kind)) => (created_at, kind),
            None => (directory_time(&path), BackupKind::infer(&name)),
        };
        bundles.push(BackupInfo {
            name,
            path,
            created_at,
            kind,
        });
    }

    bundles.sort_by(|a, b| {
        b.created_at
            .cmp(&a.created_at)
            .then_with(|| b.name.cmp(&a.name))
    });
    Ok(bundles)
}

/// Deletes every bundle beyond the `keep` newest. Returns the removed names.
pub fn prune_bundles(backups_dir: &Path, keep: usize) -> PersistenceResult<Vec<String>> {
    let bundles = list_bundles(backups_dir)?;
    let mut removed = Vec::new();
    for bundle in bundles.into_iter().skip(keep) {
        fs::remove_dir_all(&bundle.path).map_err(|err| PersistenceError::io(&bundle.path, err))?;
        info!(
            "event=backup_prune module=backup status=ok name={}",
            bundle.name
        );
        removed.push(bundle.name);
    }
    Ok(removed)
}

/// Reads the documents contained in a bundle into memory.
pub fn read_bundle_documents(bundle_dir: &Path) -> PersistenceResult<Vec<(DocumentKind, Vec<u8>)>> {
    let mut documents = Vec::new();
    for kind in DocumentKind::ALL {
        let path = bundle_dir.join(kind.file_name());
        match fs::read(&path) {
            Ok(bytes) => documents.push((kind, bytes)),
            Err(err) if err.kind() == std::io::ErrorKind::NotFound => {}
            Err(err) => return Err(PersistenceError::io(&path, err)),
        }
    }
    Ok(documents)
}

fn read_manifest(bundle_dir: &Path) -> Option<(DateTime<Local>, BackupKind)> {
    let path = bundle_dir.join(BUNDLE_MANIFEST);
    let value = match read_json_value(&path) {
        Ok(Some(value)) => value,
        Ok(None) => return None,
        Err(err) => {
            warn!(
                "event=backup_manifest module=backup status=error path={} error={err}",
                path.display()
            );
            return None;
        }
    };
    let manifest: BundleManifest = serde_json::from_value(value).ok()?;
    let created_at = DateTime::parse_from_rfc3339(&manifest.created_at)
        .ok()?
        .with_timezone(&Local);
    Some((created_at, manifest.kind))
}

fn directory_time(path: &Path) -> DateTime<Local> {
    fs::metadata(path)
        .and_then(|metadata| metadata.created().or_else(|_| metadata.modified()))
        .map(DateTime::<Local>::from)
        .unwrap_or_else(|_| DateTime::<Local>::from(std::time::UNIX_EPOCH))
}
