//! Sub-command implementations

mod balances;
mod holdings;
mod investment_transactions;
mod list;
mod transactions;

use anyhow::{Context, Result, bail};
use bank::{
    AccessContext, DiscoveredAccount, LinkedInstitution, PlaidClient, PlaidSettings, SecretsStore,
    discover_accounts, discover_institutions,
};
use clap::{Args, Subcommand};
use std::path::{Path, PathBuf};
use std::process::ExitCode;

pub use balances::BalancesArgs;
pub use holdings::HoldingsArgs;
pub use investment_transactions::InvestmentTransactionsArgs;
pub use list::ListArgs;
pub use transactions::TransactionsArgs;

#[derive(Debug, Clone, Subcommand)]
pub enum Command {
    /// List linked institutions and their accounts
    List(ListArgs),
    /// Export current balances
    Balances(BalancesArgs),
    /// Export investment holdings
    Holdings(HoldingsArgs),
    /// Export transactions through the sync change-feed
    Transactions(TransactionsArgs),
    /// Export investment transactions for a date range
    #[command(name = "investment_transactions", alias = "investment-transactions")]
    InvestmentTransactions(InvestmentTransactionsArgs),
}

impl Command {
    /// Name used as the log file prefix
    pub fn name(&self) -> &'static str {
        match self {
            Self::List(_) => "list",
            Self::Balances(_) => "balances",
            Self::Holdings(_) => "holdings",
            Self::Transactions(_) => "transactions",
            Self::InvestmentTransactions(_) => "investment_transactions",
        }
    }

    pub fn run(self) -> Result<ExitCode> {
        match self {
            Self::List(args) => list::run(args),
            Self::Balances(args) => balances::run(args),
            Self::Holdings(args) => holdings::run(args),
            Self::Transactions(args) => transactions::run(args),
            Self::InvestmentTransactions(args) => investment_transactions::run(args),
        }
    }
}

/// Account selection shared by the export commands
#[derive(Debug, Clone, Args)]
pub struct SelectionArgs {
    /// Institution ids or account ids (default: every linked account)
    pub ids: Vec<String>,

    /// Directory holding <institution>_access_token and <institution>_item_id files
    #[arg(long)]
    pub secrets_dir: Option<PathBuf>,

    /// Directory for exported files (default: <data dir>/exports)
    #[arg(long)]
    pub out_dir: Option<PathBuf>,
}

impl SelectionArgs {
    /// Resolve and create the output directory
    pub fn out_dir(&self) -> Result<PathBuf> {
        self.out_dir_or("exports")
    }

    /// Like [`Self::out_dir`], defaulting to `<data dir>/<default_subdir>`
    pub fn out_dir_or(&self, default_subdir: &str) -> Result<PathBuf> {
        let dir = match &self.out_dir {
            Some(dir) => dir.clone(),
            None => config::data_path(default_subdir).context("Could not determine data directory")?,
        };
        config::ensure_dir(&dir)?;
        Ok(dir)
    }
}

/// Plaid client plus every institution found in the secrets directory
pub struct Session {
    pub client: PlaidClient,
    pub institutions: Vec<LinkedInstitution>,
}

impl Session {
    pub fn open(secrets_dir: Option<&Path>) -> Result<Self> {
        let settings = PlaidSettings::from_env()?;
        let secrets = match secrets_dir {
            Some(dir) => SecretsStore::new(dir),
            None => SecretsStore::from_env()?,
        };
        let client = PlaidClient::new(settings);
        let institutions = discover_institutions(&secrets, &client)?;
        if institutions.is_empty() {
            bail!(
                "No linked institutions found in {}",
                secrets.dir().display()
            );
        }
        Ok(Self {
            client,
            institutions,
        })
    }

    pub fn accounts(&self) -> Result<Vec<DiscoveredAccount>> {
        discover_accounts(&self.institutions, &self.client)
    }

    pub fn context(&self, institution_id: &str) -> Option<&AccessContext> {
        self.institutions
            .iter()
            .find(|linked| linked.institution.institution_id == institution_id)
            .map(|linked| &linked.ctx)
    }
}

/// Account ids of `targets` grouped by institution, in first-seen order
pub fn group_by_institution(targets: &[DiscoveredAccount]) -> Vec<(String, Vec<String>)> {
    let mut groups: Vec<(String, Vec<String>)> = Vec::new();
    for account in targets {
        match groups
            .iter_mut()
            .find(|(institution_id, _)| *institution_id == account.institution_id)
        {
            Some((_, ids)) => ids.push(account.account_id.clone()),
            None => groups.push((
                account.institution_id.clone(),
                vec![account.account_id.clone()],
            )),
        }
    }
    groups
}
