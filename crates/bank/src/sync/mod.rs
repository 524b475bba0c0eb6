//! Sync engine for the transactions change-feed
//!
//! Provides resumable, bounded sync runs that can be safely retried.

mod assembler;
mod engine;
mod error;
mod feed;
mod run;

pub use assembler::{ResultAssembler, SyncResult, SyncSummary};
pub use engine::{SyncEngine, SyncOptions};
pub use error::{
    EMPTY_NEXT_CURSOR, ErrorDetail, INVALID_NEXT_CURSOR, SyncError, TIMEOUT, TRANSPORT_ERROR,
    UpstreamFault,
};
pub use feed::{Page, PageRequest, Sleeper, ThreadSleeper, TransactionFeed};
pub use run::{AccountSyncReport, StartingPoint, sync_account};
