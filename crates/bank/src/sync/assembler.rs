//! Turns accumulated feed pages into the externally visible sync result

use super::error::SyncError;
use super::feed::Page;
use crate::models::{Cursor, RemovedTransaction, Transaction};

/// Outcome of one sync run
///
/// `modified` and `removed` amend or retract records delivered by earlier
/// runs, so they are never folded into `transactions`.
#[derive(Debug, Clone, PartialEq)]
pub struct SyncResult {
    /// Newly added transactions, oldest first
    pub transactions: Vec<Transaction>,
    pub modified: Vec<Transaction>,
    pub removed: Vec<RemovedTransaction>,
    /// Last cursor the feed confirmed, also on failure
    pub cursor: Cursor,
    pub error: Option<SyncError>,
}

impl SyncResult {
    pub fn is_ok(&self) -> bool {
        self.error.is_none()
    }

    pub fn summary(&self) -> SyncSummary {
        SyncSummary {
            transaction_count: self.transactions.len(),
            modified_count: self.modified.len(),
            removed_count: self.removed.len(),
            error_code: self.error.as_ref().map(|e| e.error_code().to_string()),
        }
    }
}

/// Counts a caller needs to decide whether to warn the operator
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SyncSummary {
    pub transaction_count: usize,
    pub modified_count: usize,
    pub removed_count: usize,
    pub error_code: Option<String>,
}

impl SyncSummary {
    /// Whether the run carried amendments or retractions of earlier records
    pub fn has_amendments(&self) -> bool {
        self.modified_count > 0 || self.removed_count > 0
    }
}

/// Collects confirmed pages until the run ends
#[derive(Debug, Default)]
pub struct ResultAssembler {
    added: Vec<Transaction>,
    modified: Vec<Transaction>,
    removed: Vec<RemovedTransaction>,
    cursor: Cursor,
    pages: usize,
}

impl ResultAssembler {
    pub fn new(starting_cursor: Cursor) -> Self {
        Self {
            cursor: starting_cursor,
            ..Default::default()
        }
    }

    /// Cursor of the last confirmed page (or the starting cursor)
    pub fn cursor(&self) -> &Cursor {
        &self.cursor
    }

    pub fn pages(&self) -> usize {
        self.pages
    }

    /// Record a page whose `next_cursor` has been validated
    pub fn confirm(&mut self, page: Page, next_cursor: Cursor) {
        self.added.extend(page.added);
        self.modified.extend(page.modified);
        self.removed.extend(page.removed);
        self.cursor = next_cursor;
        self.pages += 1;
    }

    /// Produce the final result. Added records are sorted by date; the sort
    /// is stable so same-day records keep feed order.
    pub fn finish(self, error: Option<SyncError>) -> SyncResult {
        let mut transactions = self.added;
        transactions.sort_by_key(|t| t.date);
        SyncResult {
            transactions,
            modified: self.modified,
            removed: self.removed,
            cursor: self.cursor,
            error,
        }
    }
}
