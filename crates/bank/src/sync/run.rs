//! One complete export run for a single account
//!
//! Resolves the starting cursor, drives the engine, writes the CSV files
//! and finally appends the meta record. The record is written last so a
//! saved cursor always has its transactions on disk.

use anyhow::{Context, Result};
use chrono::{DateTime, Utc};
use log::info;
use std::path::{Path, PathBuf};

use super::assembler::SyncSummary;
use super::engine::SyncEngine;
use crate::export::{TransactionFiles, write_transaction_files};
use crate::models::{AccessContext, AccountRef, Cursor};
use crate::naming::timestamp_for_filename;
use crate::storage::CursorStore;

/// Where a run begins reading the change-feed
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum StartingPoint {
    /// From the start of history
    FullHistory,
    /// From a cursor supplied by the operator
    Explicit(Cursor),
    /// From the cursor of the account's latest meta record
    Resume,
}

/// What a run wrote and what it found
#[derive(Debug, Clone)]
pub struct AccountSyncReport {
    pub files: TransactionFiles,
    pub meta_path: PathBuf,
    pub summary: SyncSummary,
}

/// Sync one account and persist its output under `out_dir`.
///
/// Upstream faults don't fail the run: they end up in the meta record and
/// in `summary.error_code`. Errors are returned only for local problems,
/// e.g. a [`StoreError`](crate::storage::StoreError) while resuming or a
/// file that could not be written; in that case nothing is recorded.
pub fn sync_account(
    engine: &SyncEngine<'_>,
    store: &dyn CursorStore,
    ctx: &AccessContext,
    account: &AccountRef,
    start: StartingPoint,
    out_dir: &Path,
    run_at: DateTime<Utc>,
) -> Result<AccountSyncReport> {
    let starting_cursor = match start {
        StartingPoint::FullHistory => None,
        StartingPoint::Explicit(cursor) => Some(cursor),
        StartingPoint::Resume => {
            let cursor = store.load_latest(account)?;
            if cursor.is_none() {
                info!(
                    "No previous sync for account {}, starting from full history",
                    account.account_id
                );
            }
            cursor
        }
    };

    let result = engine.sync(ctx, starting_cursor, Some(&account.account_id));

    let stamp = timestamp_for_filename(run_at);
    let files = write_transaction_files(out_dir, account, &stamp, &result)
        .with_context(|| format!("Failed to export account {}", account.account_id))?;
    let meta_path = store.save(account, run_at, &result)?;

    Ok(AccountSyncReport {
        files,
        meta_path,
        summary: result.summary(),
    })
}
