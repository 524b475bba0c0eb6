//! Linked institutions, their accounts, and the credentials used to reach them

use serde::{Deserialize, Serialize};

use crate::naming::safe_filename_component;

/// Credentials for one linked institution (a Plaid "item")
///
/// Passed explicitly into every upstream call, so independent accounts can
/// be synced side by side without any shared client state.
#[derive(Clone, PartialEq, Eq)]
pub struct AccessContext {
    pub access_token: String,
    pub item_id: String,
}

impl AccessContext {
    pub fn new(access_token: impl Into<String>, item_id: impl Into<String>) -> Self {
        Self {
            access_token: access_token.into(),
            item_id: item_id.into(),
        }
    }
}

// Keep the token out of logs and panic messages
impl std::fmt::Debug for AccessContext {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AccessContext")
            .field("access_token", &"<redacted>")
            .field("item_id", &self.item_id)
            .finish()
    }
}

/// Identifies the account whose sync state is being read or written
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct AccountRef {
    pub institution_id: String,
    pub account_id: String,
    /// Last digits of the account number; preferred over the id in file names
    pub mask: Option<String>,
}

impl AccountRef {
    pub fn new(institution_id: impl Into<String>, account_id: impl Into<String>) -> Self {
        Self {
            institution_id: institution_id.into(),
            account_id: account_id.into(),
            mask: None,
        }
    }

    pub fn with_mask(mut self, mask: impl Into<String>) -> Self {
        self.mask = Some(mask.into());
        self
    }

    /// File name prefix shared by every export of this account:
    /// `<institution>_<mask or account id>`, sanitized.
    pub fn file_prefix(&self) -> String {
        let label = self.mask.as_deref().unwrap_or(&self.account_id);
        format!(
            "{}_{}",
            safe_filename_component(&self.institution_id),
            safe_filename_component(label)
        )
    }
}

/// An institution found in the secrets directory
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Institution {
    pub institution_id: String,
    /// Resolved best-effort; None when the lookup failed
    pub bank_name: Option<String>,
}

/// An account belonging to a linked institution
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DiscoveredAccount {
    pub institution_id: String,
    pub bank_name: Option<String>,
    pub account_id: String,
    pub account_type: Option<String>,
    pub name: Option<String>,
    pub subtype: Option<String>,
    pub mask: Option<String>,
}

impl DiscoveredAccount {
    /// Human-readable one-line description
    pub fn title(&self) -> String {
        let bank = self.bank_name.as_deref().unwrap_or(&self.institution_id);
        let name = self.name.as_deref().unwrap_or("(unnamed)");
        let subtype = self.subtype.as_deref().unwrap_or("unknown");
        let mask = self
            .mask
            .as_deref()
            .map(|m| format!("••••{}", m))
            .unwrap_or_default();
        format!("{} - {} ({}) {}", bank, name, subtype, mask)
            .trim_end()
            .to_string()
    }

    pub fn account_ref(&self) -> AccountRef {
        AccountRef {
            institution_id: self.institution_id.clone(),
            account_id: self.account_id.clone(),
            mask: self.mask.clone(),
        }
    }
}
