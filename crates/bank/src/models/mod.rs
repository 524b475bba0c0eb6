//! Domain models for linked accounts and their transactions

mod account;
mod cursor;
mod transaction;

pub use account::{AccessContext, AccountRef, DiscoveredAccount, Institution};
pub use cursor::{Cursor, InvalidCursor, MAX_CURSOR_LEN};
pub use transaction::{RemovedTransaction, Transaction, TransactionId};
