//! Local snapshot files awaiting delivery.
//!
//! One file per session-start minute, named `dd_MM_yy_HH_mm_SessionLog.json`.
//! The writer and the startup sweep both rely on the `_SessionLog.json`
//! suffix; the leading stamp identifies the session that wrote the file.

use std::{
    fs,
    path::{Path, PathBuf},
};

use chrono::{DateTime, Utc};
use directories::ProjectDirs;
use sessionlog_types::{
    config::{AppInfo, OpsConfig},
    Result, SessionLogError,
};
use tracing::{debug, info};

pub const SESSION_LOG_SUFFIX: &str = "_SessionLog.json";
const STAMP_FORMAT: &str = "%d_%m_%y_%H_%M";

/// Minute-resolution token derived from the session start.
pub fn session_stamp(started_at: DateTime<Utc>) -> String {
    started_at.format(STAMP_FORMAT).to_string()
}

pub fn session_file_name(started_at: DateTime<Utc>) -> String {
    format!("{}{}", session_stamp(started_at), SESSION_LOG_SUFFIX)
}

/// `ops.storage_dir` when configured, otherwise the platform data directory
/// for the application.
pub fn resolve_storage_dir(ops: &OpsConfig, app: &AppInfo) -> PathBuf {
    ops.storage_dir
        .as_deref()
        .filter(|dir| !dir.is_empty())
        .map(PathBuf::from)
        .or_else(|| {
            ProjectDirs::from("com", "sessionlog", &app.name).map(|p| p.data_dir().to_path_buf())
        })
        .unwrap_or_else(|| PathBuf::from("sessionlog-data"))
}

#[derive(Debug, Clone)]
pub struct LocalStore {
    dir: PathBuf,
}

impl LocalStore {
    pub fn open(dir: impl Into<PathBuf>) -> Result<Self> {
        let dir = dir.into();
        fs::create_dir_all(&dir).map_err(|err| {
            SessionLogError::Io(format!("failed to create storage dir {:?}: {err}", dir))
        })?;
        info!("Session log directory ready at {:?}", dir);
        Ok(Self { dir })
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    pub fn path_for(&self, file_name: &str) -> PathBuf {
        self.dir.join(file_name)
    }

    /// Writes through a temporary sibling and renames it into place so a
    /// crash never leaves a truncated snapshot behind.
    pub fn write(&self, file_name: &str, json: &str) -> Result<PathBuf> {
        let path = self.path_for(file_name);
        let staging = self.path_for(&format!(".{file_name}.tmp"));
        fs::write(&staging, json)
            .and_then(|_| fs::rename(&staging, &path))
            .map_err(|err| {
                let _ = fs::remove_file(&staging);
                SessionLogError::Io(format!("failed to write {:?}: {err}", path))
            })?;
        debug!("Session log written to {:?}", path);
        Ok(path)
    }

    pub fn read(&self, path: &Path) -> Result<String> {
        fs::read_to_string(path)
            .map_err(|err| SessionLogError::Io(format!("failed to read {:?}: {err}", path)))
    }

    /// Returns `false` when the file was already gone.
    pub fn remove(&self, path: &Path) -> Result<bool> {
        match fs::remove_file(path) {
            Ok(()) => Ok(true),
            Err(err) if err.kind() == std::io::ErrorKind::NotFound => Ok(false),
            Err(err) => Err(SessionLogError::Io(format!(
                "failed to delete {:?}: {err}",
                path
            ))),
        }
    }

    /// Snapshot files left by earlier sessions, sorted by name. Files stamped
    /// with `exclude_stamp` belong to the running session and are skipped.
    pub fn list_unsent(&self, exclude_stamp: &str) -> Result<Vec<PathBuf>> {
        let entries = fs::read_dir(&self.dir).map_err(|err| {
            SessionLogError::Io(format!("failed to scan {:?}: {err}", self.dir))
        })?;

        let mut found: Vec<PathBuf> = entries
            .filter_map(|entry| entry.ok())
            .map(|entry| entry.path())
            .filter(|path| path.is_file())
            .filter(|path| {
                path.file_name()
                    .and_then(|name| name.to_str())
                    .map(|name| {
                        name.ends_with(SESSION_LOG_SUFFIX)
                            && (exclude_stamp.is_empty() || !name.starts_with(exclude_stamp))
                    })
                    .unwrap_or(false)
            })
            .collect();
        found.sort();
        Ok(found)
    }
}
