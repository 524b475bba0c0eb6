//! Append-only, file-backed sync cursor persistence
//!
//! Every run writes one new meta record named
//! `<institution>_<account>_<YYYYMMDDTHHMMSSZ>_meta.json`. Records are never
//! rewritten; the cursor to resume from is read from the most recently named
//! one.
//!
//! ```text
//! transactions/
//!   ins_1_0000_20260214T090000Z.csv
//!   ins_1_0000_20260214T090000Z_meta.json
//!   ins_1_0000_20260215T090000Z.csv
//!   ins_1_0000_20260215T090000Z_meta.json   <- latest
//! ```

use chrono::{DateTime, Utc};
use log::{debug, info};
use std::fs;
use std::io::{self, Write};
use std::path::{Path, PathBuf};
use std::time::SystemTime;

use super::meta::MetaRecord;
use crate::models::{AccountRef, Cursor};
use crate::naming::{is_filename_timestamp, timestamp_for_filename};
use crate::sync::SyncResult;

/// Fixed suffix of every meta record file name
pub const META_SUFFIX: &str = "_meta.json";

/// Local precondition failures around persisted sync state.
///
/// Unlike upstream problems these abort the affected account's run.
#[derive(Debug, thiserror::Error)]
pub enum StoreError {
    #[error("meta record {} belongs to account {found}, not {expected}", .path.display())]
    AccountMismatch {
        expected: String,
        found: String,
        path: PathBuf,
    },
    #[error("invalid cursor in {}: {reason}", .path.display())]
    InvalidCursorFormat { path: PathBuf, reason: String },
    #[error("failed to {action} {}: {source}", .path.display())]
    PersistenceIo {
        action: &'static str,
        path: PathBuf,
        #[source]
        source: io::Error,
    },
    #[error("malformed meta record {}: {source}", .path.display())]
    Malformed {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },
}

impl StoreError {
    fn io(action: &'static str, path: &Path, source: io::Error) -> Self {
        Self::PersistenceIo {
            action,
            path: path.to_path_buf(),
            source,
        }
    }
}

/// Storage for per-account sync cursors
pub trait CursorStore: Send + Sync {
    /// Cursor of the most recent run, or None before the first run
    fn load_latest(&self, account: &AccountRef) -> Result<Option<Cursor>, StoreError>;

    /// Persist the outcome of a run as a new record; returns where it was written
    fn save(
        &self,
        account: &AccountRef,
        run_at: DateTime<Utc>,
        result: &SyncResult,
    ) -> Result<PathBuf, StoreError>;
}

/// A meta record file that belongs to the requested account's namespace
#[derive(Debug, Clone, PartialEq, Eq)]
struct Candidate {
    path: PathBuf,
    stamp: String,
    modified: Option<SystemTime>,
}

/// Newest first: by embedded timestamp, ties broken by modification time
fn sort_newest_first(candidates: &mut [Candidate]) {
    candidates.sort_by(|a, b| {
        b.stamp
            .cmp(&a.stamp)
            .then_with(|| b.modified.cmp(&a.modified))
    });
}

/// [`CursorStore`] keeping one JSON file per run in a directory
pub struct FileCursorStore {
    root: PathBuf,
}

impl FileCursorStore {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Path of the record for a run of `account` at `run_at`
    pub fn record_path(&self, account: &AccountRef, run_at: DateTime<Utc>) -> PathBuf {
        self.root.join(format!(
            "{}_{}{}",
            account.file_prefix(),
            timestamp_for_filename(run_at),
            META_SUFFIX
        ))
    }

    fn candidates(&self, account: &AccountRef) -> Result<Vec<Candidate>, StoreError> {
        let entries = match fs::read_dir(&self.root) {
            Ok(entries) => entries,
            Err(e) if e.kind() == io::ErrorKind::NotFound => return Ok(Vec::new()),
            Err(e) => return Err(StoreError::io("read directory", &self.root, e)),
        };

        let prefix = format!("{}_", account.file_prefix());
        let mut candidates = Vec::new();
        for entry in entries {
            let entry = entry.map_err(|e| StoreError::io("read directory", &self.root, e))?;
            let file_name = entry.file_name();
            let Some(name) = file_name.to_str() else {
                continue;
            };
            let Some(stamp) = name
                .strip_prefix(&prefix)
                .and_then(|rest| rest.strip_suffix(META_SUFFIX))
            else {
                continue;
            };
            // Longer account labels sharing our prefix leave extra text before the stamp
            if !is_filename_timestamp(stamp) {
                continue;
            }
            candidates.push(Candidate {
                stamp: stamp.to_string(),
                modified: entry.metadata().and_then(|m| m.modified()).ok(),
                path: entry.path(),
            });
        }

        sort_newest_first(&mut candidates);
        Ok(candidates)
    }

    fn read_record(path: &Path) -> Result<MetaRecord, StoreError> {
        let content = fs::read_to_string(path).map_err(|e| StoreError::io("read", path, e))?;
        serde_json::from_str(&content).map_err(|source| StoreError::Malformed {
            path: path.to_path_buf(),
            source,
        })
    }

    /// Write `bytes` to `path` without ever replacing an existing file.
    ///
    /// The content is staged in a hidden temp file and hard-linked into
    /// place, so readers only ever see complete records.
    fn write_new(&self, path: &Path, bytes: &[u8]) -> Result<(), StoreError> {
        let file_name = path
            .file_name()
            .and_then(|n| n.to_str())
            .unwrap_or("record");
        let temp_path = self.root.join(format!(".{}.tmp", file_name));

        let staged = (|| -> io::Result<()> {
            let mut file = fs::File::create(&temp_path)?;
            file.write_all(bytes)?;
            file.sync_all()
        })();
        if let Err(e) = staged {
            let _ = fs::remove_file(&temp_path);
            return Err(StoreError::io("write", &temp_path, e));
        }

        let linked = fs::hard_link(&temp_path, path);
        let _ = fs::remove_file(&temp_path);
        linked.map_err(|e| StoreError::io("create", path, e))
    }
}

impl CursorStore for FileCursorStore {
    fn load_latest(&self, account: &AccountRef) -> Result<Option<Cursor>, StoreError> {
        let Some(latest) = self.candidates(account)?.into_iter().next() else {
            debug!("No saved sync state for {}", account.file_prefix());
            return Ok(None);
        };

        let record = Self::read_record(&latest.path)?;
        if record.account_id != account.account_id {
            return Err(StoreError::AccountMismatch {
                expected: account.account_id.clone(),
                found: record.account_id,
                path: latest.path,
            });
        }

        let raw = match record.cursor {
            Some(raw) if !raw.is_empty() => raw,
            // A run that failed before confirming any page has nothing to resume from
            _ if record.error.is_some() => {
                info!(
                    "Latest run of {} failed before its first page ({}), resuming from full history",
                    account.account_id,
                    latest.path.display()
                );
                return Ok(None);
            }
            _ => {
                return Err(StoreError::InvalidCursorFormat {
                    path: latest.path,
                    reason: "cursor is empty or missing".into(),
                });
            }
        };
        let cursor = Cursor::parse(raw).map_err(|e| StoreError::InvalidCursorFormat {
            path: latest.path.clone(),
            reason: e.to_string(),
        })?;

        debug!("Resuming {} from {}", account.file_prefix(), latest.path.display());
        Ok(Some(cursor))
    }

    fn save(
        &self,
        account: &AccountRef,
        run_at: DateTime<Utc>,
        result: &SyncResult,
    ) -> Result<PathBuf, StoreError> {
        fs::create_dir_all(&self.root)
            .map_err(|e| StoreError::io("create directory", &self.root, e))?;

        let path = self.record_path(account, run_at);
        let record = MetaRecord::from_result(account, result);
        let bytes = serde_json::to_vec_pretty(&record).map_err(|source| StoreError::Malformed {
            path: path.clone(),
            source,
        })?;

        self.write_new(&path, &bytes)?;
        info!(
            "Saved sync state for account {} to {}",
            account.account_id,
            path.display()
        );
        Ok(path)
    }
}
