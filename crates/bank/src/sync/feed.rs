//! Seams between the sync engine and the outside world

use serde::Deserialize;
use std::time::Duration;

use super::error::UpstreamFault;
use crate::models::{AccessContext, Cursor, RemovedTransaction, Transaction};

/// One response of the transactions change-feed
#[derive(Debug, Clone, Default, Deserialize)]
pub struct Page {
    #[serde(default)]
    pub added: Vec<Transaction>,
    #[serde(default)]
    pub modified: Vec<Transaction>,
    #[serde(default)]
    pub removed: Vec<RemovedTransaction>,
    /// Empty while the upstream has nothing ready yet
    #[serde(default)]
    pub next_cursor: String,
    #[serde(default)]
    pub has_more: bool,
}

/// Parameters of a single page fetch
#[derive(Debug, Clone, Copy)]
pub struct PageRequest<'a> {
    pub cursor: &'a Cursor,
    /// Restrict the feed to one account of a multi-account item
    pub account_id: Option<&'a str>,
    /// Upper bound on how long this call may block
    pub timeout: Duration,
    pub days_requested: Option<u32>,
}

/// The upstream transactions change-feed
pub trait TransactionFeed {
    /// Fetch the page that follows `request.cursor`.
    ///
    /// Must return within `request.timeout`; a stalled call is reported as a
    /// fault rather than blocking the caller.
    fn fetch_page(&self, ctx: &AccessContext, request: &PageRequest<'_>)
        -> Result<Page, UpstreamFault>;
}

/// Suspends the engine between empty-cursor retries
pub trait Sleeper {
    fn sleep(&self, duration: Duration);
}

/// Sleeper backed by the OS thread sleep
#[derive(Debug, Default, Clone, Copy)]
pub struct ThreadSleeper;

impl Sleeper for ThreadSleeper {
    fn sleep(&self, duration: Duration) {
        std::thread::sleep(duration);
    }
}
