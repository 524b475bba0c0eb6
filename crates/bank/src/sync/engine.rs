//! Cursor-driven transaction sync engine
//!
//! Walks the change-feed page by page from a starting cursor. The run always
//! ends with a [`SyncResult`]: upstream problems are reported in
//! `SyncResult::error` together with everything confirmed so far, and the
//! returned cursor never moves past the last confirmed page. Re-running from
//! that cursor neither skips nor re-downloads data.

use log::{debug, info, warn};
use std::time::Duration;

use super::assembler::{ResultAssembler, SyncResult};
use super::error::SyncError;
use super::feed::{Page, PageRequest, Sleeper, TransactionFeed};
use crate::models::{AccessContext, Cursor};

/// Tunables for a sync run
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SyncOptions {
    /// Timeout budget for each page fetch
    pub timeout: Duration,
    /// Wait between attempts while the feed returns an empty next_cursor
    pub empty_cursor_backoff: Duration,
    /// Retries allowed after the first empty next_cursor
    pub max_empty_retries: u32,
    /// Forwarded to the feed on every request
    pub days_requested: Option<u32>,
}

impl Default for SyncOptions {
    fn default() -> Self {
        Self {
            timeout: Duration::from_secs(30),
            empty_cursor_backoff: Duration::from_secs(2),
            max_empty_retries: 2,
            days_requested: None,
        }
    }
}

/// States of one sync run. `Done` and `Failed` are terminal.
#[derive(Debug, Clone, PartialEq)]
enum SyncPhase {
    /// About to request the page after the current cursor
    Fetching { empty_retries: u32 },
    /// The feed answered with an empty next_cursor; wait, then ask again
    EmptyRetry { empty_retries: u32 },
    Done,
    Failed(SyncError),
}

/// Drives a [`TransactionFeed`] to the end of its change-feed
pub struct SyncEngine<'a> {
    feed: &'a dyn TransactionFeed,
    sleeper: &'a dyn Sleeper,
    options: SyncOptions,
}

impl<'a> SyncEngine<'a> {
    pub fn new(feed: &'a dyn TransactionFeed, sleeper: &'a dyn Sleeper, options: SyncOptions) -> Self {
        Self {
            feed,
            sleeper,
            options,
        }
    }

    pub fn options(&self) -> &SyncOptions {
        &self.options
    }

    /// Sync from `starting_cursor` (full history when None) to the end of the feed
    ///
    /// # Arguments
    /// * `ctx` - Credentials for the item being synced
    /// * `starting_cursor` - Cursor persisted by a previous run, if any
    /// * `account_filter` - Restrict the feed to a single account
    pub fn sync(
        &self,
        ctx: &AccessContext,
        starting_cursor: Option<Cursor>,
        account_filter: Option<&str>,
    ) -> SyncResult {
        let start = starting_cursor.unwrap_or_default();
        info!(
            "Starting transactions sync for item {} (account={}, from {})",
            ctx.item_id,
            account_filter.unwrap_or("*"),
            if start.is_start() { "start of history" } else { "saved cursor" }
        );

        let mut assembler = ResultAssembler::new(start);
        let mut phase = SyncPhase::Fetching { empty_retries: 0 };

        loop {
            phase = match phase {
                SyncPhase::Fetching { empty_retries } => {
                    self.fetch_next(ctx, account_filter, &mut assembler, empty_retries)
                }
                SyncPhase::EmptyRetry { empty_retries } => {
                    self.sleeper.sleep(self.options.empty_cursor_backoff);
                    SyncPhase::Fetching { empty_retries }
                }
                SyncPhase::Done => {
                    let result = assembler.finish(None);
                    info!(
                        "Transactions sync complete: {} added, {} modified, {} removed",
                        result.transactions.len(),
                        result.modified.len(),
                        result.removed.len()
                    );
                    return result;
                }
                SyncPhase::Failed(error) => {
                    warn!(
                        "Transactions sync stopped after {} page(s): {}",
                        assembler.pages(),
                        error
                    );
                    return assembler.finish(Some(error));
                }
            };
        }
    }

    /// Perform one fetch and decide the next phase
    fn fetch_next(
        &self,
        ctx: &AccessContext,
        account_filter: Option<&str>,
        assembler: &mut ResultAssembler,
        empty_retries: u32,
    ) -> SyncPhase {
        let request = PageRequest {
            cursor: assembler.cursor(),
            account_id: account_filter,
            timeout: self.options.timeout,
            days_requested: self.options.days_requested,
        };

        let page = match self.feed.fetch_page(ctx, &request) {
            Ok(page) => page,
            Err(fault) => return SyncPhase::Failed(fault.into()),
        };

        if page.next_cursor.is_empty() {
            return self.on_empty_cursor(empty_retries);
        }

        self.on_page(page, assembler)
    }

    fn on_empty_cursor(&self, empty_retries: u32) -> SyncPhase {
        if empty_retries >= self.options.max_empty_retries {
            return SyncPhase::Failed(SyncError::EmptyCursorExhausted {
                attempts: empty_retries + 1,
            });
        }
        warn!(
            "Feed returned an empty next_cursor; retrying in {:?} ({}/{})",
            self.options.empty_cursor_backoff,
            empty_retries + 1,
            self.options.max_empty_retries
        );
        SyncPhase::EmptyRetry {
            empty_retries: empty_retries + 1,
        }
    }

    fn on_page(&self, mut page: Page, assembler: &mut ResultAssembler) -> SyncPhase {
        let next_cursor = match Cursor::parse(std::mem::take(&mut page.next_cursor)) {
            Ok(cursor) => cursor,
            Err(e) => return SyncPhase::Failed(SyncError::InvalidNextCursor(e)),
        };
        let has_more = page.has_more;

        debug!(
            "Page {}: {} added, {} modified, {} removed, has_more={}",
            assembler.pages() + 1,
            page.added.len(),
            page.modified.len(),
            page.removed.len(),
            has_more
        );
        assembler.confirm(page, next_cursor);

        if has_more {
            SyncPhase::Fetching { empty_retries: 0 }
        } else {
            SyncPhase::Done
        }
    }
}
