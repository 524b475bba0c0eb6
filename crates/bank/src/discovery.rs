//! Finding linked institutions and selecting the accounts a command acts on

use anyhow::{Context, Result, bail};
use log::{debug, warn};
use std::collections::HashSet;

use crate::models::{AccessContext, AccountRef, DiscoveredAccount, Institution};
use crate::plaid::{PlaidClient, api::Account};
use crate::storage::SecretsStore;
use crate::sync::UpstreamFault;

/// Account types that hold transactions worth exporting
pub const TRANSACTION_ACCOUNT_TYPES: &[&str] = &["depository", "credit", "loan"];

/// Account types that can report holdings
pub const HOLDINGS_ACCOUNT_TYPES: &[&str] = &["depository", "investment"];

/// Upstream lookups needed to describe a linked institution
pub trait InstitutionLookup {
    /// Display name of the bank behind an item, if known
    fn institution_name(&self, ctx: &AccessContext) -> Result<Option<String>, UpstreamFault>;

    /// Accounts of an item
    fn accounts(&self, ctx: &AccessContext) -> Result<Vec<Account>, UpstreamFault>;
}

impl InstitutionLookup for PlaidClient {
    fn institution_name(&self, ctx: &AccessContext) -> Result<Option<String>, UpstreamFault> {
        self.get_institution_name(ctx)
    }

    fn accounts(&self, ctx: &AccessContext) -> Result<Vec<Account>, UpstreamFault> {
        Ok(self.get_accounts(ctx)?.accounts)
    }
}

/// An institution together with the credentials that reach it
#[derive(Debug, Clone)]
pub struct LinkedInstitution {
    pub institution: Institution,
    pub ctx: AccessContext,
}

/// Every institution with saved credentials, sorted by identifier
///
/// The bank name is looked up best-effort; a failed lookup leaves it empty.
pub fn discover_institutions(
    secrets: &SecretsStore,
    lookup: &dyn InstitutionLookup,
) -> Result<Vec<LinkedInstitution>> {
    let mut linked = Vec::new();
    for institution_id in secrets.institution_ids()? {
        let ctx = secrets.load_credentials(&institution_id)?;
        let bank_name = match lookup.institution_name(&ctx) {
            Ok(name) => name,
            Err(e) => {
                warn!("Could not resolve bank name for {}: {}", institution_id, e);
                None
            }
        };
        debug!("Found institution {} ({:?})", institution_id, bank_name);
        linked.push(LinkedInstitution {
            institution: Institution {
                institution_id,
                bank_name,
            },
            ctx,
        });
    }
    Ok(linked)
}

/// Fetch the accounts of every linked institution
pub fn discover_accounts(
    institutions: &[LinkedInstitution],
    lookup: &dyn InstitutionLookup,
) -> Result<Vec<DiscoveredAccount>> {
    let mut discovered = Vec::new();
    for linked in institutions {
        let institution = &linked.institution;
        let accounts = lookup.accounts(&linked.ctx).with_context(|| {
            format!("Failed to list accounts for {}", institution.institution_id)
        })?;
        discovered.extend(accounts.into_iter().map(|account| DiscoveredAccount {
            institution_id: institution.institution_id.clone(),
            bank_name: institution.bank_name.clone(),
            account_id: account.account_id,
            account_type: account.account_type,
            name: account.name,
            subtype: account.subtype,
            mask: account.mask,
        }));
    }
    Ok(discovered)
}

/// Select the accounts named by `ids`.
///
/// Each id is either an institution id (all of its accounts) or an account
/// id. No ids selects every account. Unknown ids are an error. With
/// `allowed_types`, accounts of any other type are dropped. Order follows
/// `accounts`, without duplicates.
pub fn resolve_target_accounts(
    ids: &[String],
    accounts: &[DiscoveredAccount],
    allowed_types: Option<&[&str]>,
) -> Result<Vec<DiscoveredAccount>> {
    let selected: Vec<&DiscoveredAccount> = if ids.is_empty() {
        accounts.iter().collect()
    } else {
        for id in ids {
            let known = accounts
                .iter()
                .any(|a| &a.institution_id == id || &a.account_id == id);
            if !known {
                bail!("Unknown institution or account id: {}", id);
            }
        }
        let wanted: HashSet<&str> = ids.iter().map(String::as_str).collect();
        accounts
            .iter()
            .filter(|a| {
                wanted.contains(a.institution_id.as_str()) || wanted.contains(a.account_id.as_str())
            })
            .collect()
    };

    let Some(allowed_types) = allowed_types else {
        return Ok(selected.into_iter().cloned().collect());
    };

    let mut targets = Vec::new();
    for account in selected {
        let type_ok = account
            .account_type
            .as_deref()
            .is_some_and(|t| allowed_types.contains(&t));
        if type_ok {
            targets.push(account.clone());
        } else {
            debug!(
                "Skipping {} (type {:?} not in {:?})",
                account.title(),
                account.account_type,
                allowed_types
            );
        }
    }
    Ok(targets)
}

/// File namespaces for `targets`.
///
/// An account is named by its mask unless another account of the same
/// institution in `accounts` shares that mask; those fall back to their
/// account id. The check runs over every known account, so a namespace
/// doesn't depend on which accounts a command happened to select.
pub fn unique_account_refs(
    targets: &[DiscoveredAccount],
    accounts: &[DiscoveredAccount],
) -> Vec<AccountRef> {
    targets
        .iter()
        .map(|target| {
            let reference = target.account_ref();
            let shared = accounts.iter().any(|other| {
                other.account_id != target.account_id
                    && other.institution_id == target.institution_id
                    && other.account_ref().file_prefix() == reference.file_prefix()
            });
            if shared {
                debug!(
                    "Mask of {} is shared within {}, naming files by account id",
                    target.account_id, target.institution_id
                );
                AccountRef::new(&target.institution_id, &target.account_id)
            } else {
                reference
            }
        })
        .collect()
}
