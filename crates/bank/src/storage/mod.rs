//! Local persistence: sync cursors and saved credentials
//!
//! Sync state is append-only JSON on disk, so concurrent runs for different
//! accounts never contend for a file and no locking is needed.

mod cursor_store;
mod meta;
mod secrets;

pub use cursor_store::{CursorStore, FileCursorStore, META_SUFFIX, StoreError};
pub use meta::{MetaError, MetaRecord};
pub use secrets::{SECRETS_DIR_ENV_VAR, SecretsStore, default_secrets_dir};
