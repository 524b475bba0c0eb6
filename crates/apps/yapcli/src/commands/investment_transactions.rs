use anyhow::{Context, Result, bail};
use bank::export::{account_report_path, investment_transactions_table};
use bank::naming::timestamp_for_filename;
use bank::plaid::api::InvestmentTransactionsResponse;
use bank::{
    AccountRef, DiscoveredAccount, HOLDINGS_ACCOUNT_TYPES, resolve_target_accounts,
    unique_account_refs,
};
use chrono::{Days, Local, NaiveDate, Utc};
use clap::Args;
use log::{error, info, warn};
use std::path::{Path, PathBuf};
use std::process::ExitCode;

use super::{SelectionArgs, Session, group_by_institution};

/// Days covered when no start date is given
const DEFAULT_WINDOW_DAYS: u64 = 30;

#[derive(Debug, Clone, Args)]
pub struct InvestmentTransactionsArgs {
    #[command(flatten)]
    pub selection: SelectionArgs,

    /// First day to include, YYYY-MM-DD (default: 30 days before the end date)
    #[arg(long, alias = "start_date")]
    pub start_date: Option<NaiveDate>,

    /// Last day to include, YYYY-MM-DD (default: today)
    #[arg(long, alias = "end_date")]
    pub end_date: Option<NaiveDate>,
}

/// Fill in the date range defaults and check its order
fn date_range(
    start: Option<NaiveDate>,
    end: Option<NaiveDate>,
    today: NaiveDate,
) -> Result<(NaiveDate, NaiveDate)> {
    let end = end.unwrap_or(today);
    let start = match start {
        Some(start) => start,
        None => end
            .checked_sub_days(Days::new(DEFAULT_WINDOW_DAYS))
            .context("End date is too early")?,
    };
    if start > end {
        bail!("--start-date cannot be after --end-date ({} > {})", start, end);
    }
    Ok((start, end))
}

pub fn run(args: InvestmentTransactionsArgs) -> Result<ExitCode> {
    let (start, end) = date_range(args.start_date, args.end_date, Local::now().date_naive())?;

    let selection = args.selection;
    let session = Session::open(selection.secrets_dir.as_deref())?;
    let accounts = session.accounts()?;
    let targets = resolve_target_accounts(&selection.ids, &accounts, Some(HOLDINGS_ACCOUNT_TYPES))?;
    if targets.is_empty() {
        println!("No depository or investment accounts selected");
        return Ok(ExitCode::SUCCESS);
    }

    let out_dir = selection.out_dir_or("investment_transactions")?;
    let stamp = timestamp_for_filename(Utc::now());
    let refs = unique_account_refs(&targets, &accounts);
    let mut failed = 0;

    for (institution_id, _) in group_by_institution(&targets) {
        let Some(ctx) = session.context(&institution_id) else {
            warn!("No credentials loaded for {}, skipping", institution_id);
            failed += 1;
            continue;
        };
        let response = match session.client.get_investment_transactions(ctx, start, end) {
            Ok(response) => response,
            Err(e) => {
                error!("Investment transactions lookup failed for {}: {}", institution_id, e);
                eprintln!(
                    "Warning: {}: investment transactions unavailable ({})",
                    institution_id,
                    e.error_code()
                );
                failed += 1;
                continue;
            }
        };

        let members = targets
            .iter()
            .zip(&refs)
            .filter(|(account, _)| account.institution_id == institution_id);
        for (account, account_ref) in members {
            let path = export_account(&out_dir, account, account_ref, &response, &stamp)?;
            println!("{}", path.display());
        }
    }

    Ok(if failed > 0 {
        ExitCode::FAILURE
    } else {
        ExitCode::SUCCESS
    })
}

/// Write one account's rows of an institution-wide response
fn export_account(
    out_dir: &Path,
    account: &DiscoveredAccount,
    account_ref: &AccountRef,
    response: &InvestmentTransactionsResponse,
    stamp: &str,
) -> Result<PathBuf> {
    let table = investment_transactions_table(account, response);
    let path = account_report_path(out_dir, account_ref, stamp);
    table.write_file(&path)?;
    info!(
        "Wrote {} investment transactions for {} to {}",
        table.len(),
        account.account_id,
        path.display()
    );
    Ok(path)
}
