//! Bank crate - Business logic for exporting linked bank data
//!
//! This crate provides:
//! - Domain models (AccountRef, Cursor, Transaction)
//! - Plaid API client
//! - Resumable transactions sync engine with a bounded empty-cursor retry
//! - Append-only cursor store and local secrets store
//! - Account discovery and selection
//! - CSV export of transactions, balances and holdings
//!
//! This crate has no terminal or UI dependencies; the `yapcli` binary is a
//! thin layer on top of it.

pub mod config;
pub mod discovery;
pub mod export;
pub mod models;
pub mod naming;
pub mod plaid;
pub mod storage;
pub mod sync;

pub use config::{PlaidEnvironment, PlaidSettings};
pub use discovery::{
    HOLDINGS_ACCOUNT_TYPES, InstitutionLookup, LinkedInstitution, TRANSACTION_ACCOUNT_TYPES,
    discover_accounts, discover_institutions, resolve_target_accounts, unique_account_refs,
};
pub use export::{CsvTable, TransactionFiles};
pub use models::{AccessContext, AccountRef, Cursor, DiscoveredAccount, Institution, Transaction};
pub use plaid::PlaidClient;
pub use storage::{CursorStore, FileCursorStore, MetaRecord, SecretsStore, StoreError};
pub use sync::{
    // Engine
    SyncEngine, SyncOptions, SyncResult, SyncSummary, SyncError, UpstreamFault,
    // Seams
    Sleeper, ThreadSleeper, TransactionFeed,
    // Per-account runs
    AccountSyncReport, StartingPoint, sync_account,
};
