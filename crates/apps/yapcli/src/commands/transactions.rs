use anyhow::{Context, Result, bail};
use bank::{
    AccountSyncReport, Cursor, DiscoveredAccount, FileCursorStore, StartingPoint, SyncEngine,
    TRANSACTION_ACCOUNT_TYPES, ThreadSleeper, resolve_target_accounts, sync_account,
    unique_account_refs,
};
use chrono::Utc;
use clap::Args;
use log::{error, warn};
use std::process::ExitCode;

use super::{SelectionArgs, Session};

#[derive(Debug, Clone, Args)]
pub struct TransactionsArgs {
    #[command(flatten)]
    pub selection: SelectionArgs,

    /// Start from this sync cursor (requires exactly one account)
    #[arg(long, conflicts_with = "resume")]
    pub cursor: Option<String>,

    /// Continue each account from its latest saved cursor
    #[arg(long)]
    pub resume: bool,
}

impl TransactionsArgs {
    fn starting_point(&self) -> Result<StartingPoint> {
        if let Some(raw) = &self.cursor {
            let cursor = Cursor::parse(raw.as_str()).context("Invalid --cursor")?;
            return Ok(StartingPoint::Explicit(cursor));
        }
        Ok(if self.resume {
            StartingPoint::Resume
        } else {
            StartingPoint::FullHistory
        })
    }
}

/// An explicit cursor belongs to one account's feed
fn check_cursor_scope(start: &StartingPoint, targets: &[DiscoveredAccount]) -> Result<()> {
    if matches!(start, StartingPoint::Explicit(_)) && targets.len() != 1 {
        bail!(
            "--cursor needs exactly one account, but {} were selected",
            targets.len()
        );
    }
    Ok(())
}

pub fn run(args: TransactionsArgs) -> Result<ExitCode> {
    // Validate before any network traffic
    let start = args.starting_point()?;

    let selection = &args.selection;
    let session = Session::open(selection.secrets_dir.as_deref())?;
    let accounts = session.accounts()?;
    let targets = resolve_target_accounts(&selection.ids, &accounts, Some(TRANSACTION_ACCOUNT_TYPES))?;
    check_cursor_scope(&start, &targets)?;
    if targets.is_empty() {
        println!("No matching accounts");
        return Ok(ExitCode::SUCCESS);
    }

    let out_dir = selection.out_dir()?;
    let store = FileCursorStore::new(&out_dir);
    let sleeper = ThreadSleeper;
    let engine = SyncEngine::new(&session.client, &sleeper, session.client.settings().sync.clone());
    let run_at = Utc::now();
    let mut aborted = 0;

    for (account, account_ref) in targets.iter().zip(unique_account_refs(&targets, &accounts)) {
        let Some(ctx) = session.context(&account.institution_id) else {
            aborted += 1;
            warn!(
                "No credentials loaded for {}, skipping {}",
                account.institution_id, account.account_id
            );
            eprintln!("  Error: no credentials for {}", account.institution_id);
            continue;
        };
        println!("{}", account.title());
        match sync_account(
            &engine,
            &store,
            ctx,
            &account_ref,
            start.clone(),
            &out_dir,
            run_at,
        ) {
            Ok(report) => {
                for line in report_lines(&report) {
                    println!("{}", line);
                }
            }
            Err(e) => {
                aborted += 1;
                error!("Sync aborted for account {}: {:#}", account.account_id, e);
                eprintln!("  Error: {:#}", e);
            }
        }
    }

    if aborted > 0 {
        eprintln!("{} of {} account(s) aborted", aborted, targets.len());
        return Ok(ExitCode::FAILURE);
    }
    Ok(ExitCode::SUCCESS)
}

/// Lines printed for one account's run
fn report_lines(report: &AccountSyncReport) -> Vec<String> {
    let summary = &report.summary;
    let mut lines = vec![format!(
        "  transactions: {} ({})",
        report.files.transactions.display(),
        summary.transaction_count
    )];
    if let Some(path) = &report.files.modified {
        lines.push(format!("  modified: {}", path.display()));
    }
    if let Some(path) = &report.files.removed {
        lines.push(format!("  removed: {}", path.display()));
    }
    lines.push(format!("  meta: {}", report.meta_path.display()));

    if let Some(code) = &summary.error_code {
        lines.push(format!(
            "  Warning: sync incomplete ({}); rerun with --resume to continue",
            code
        ));
    }
    if summary.has_amendments() {
        lines.push(format!(
            "  Warning: {} modified and {} removed transaction(s) amend earlier exports",
            summary.modified_count, summary.removed_count
        ));
    }
    lines
}
