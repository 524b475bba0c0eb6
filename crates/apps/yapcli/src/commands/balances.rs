use anyhow::Result;
use bank::export::{balances_table, report_path};
use bank::naming::timestamp_for_filename;
use bank::resolve_target_accounts;
use chrono::Utc;
use clap::Args;
use log::{error, info, warn};
use std::process::ExitCode;

use super::{SelectionArgs, Session, group_by_institution};

#[derive(Debug, Clone, Args)]
pub struct BalancesArgs {
    #[command(flatten)]
    pub selection: SelectionArgs,
}

pub fn run(args: BalancesArgs) -> Result<ExitCode> {
    let selection = args.selection;
    let session = Session::open(selection.secrets_dir.as_deref())?;
    let targets = resolve_target_accounts(&selection.ids, &session.accounts()?, None)?;
    if targets.is_empty() {
        println!("No matching accounts");
        return Ok(ExitCode::SUCCESS);
    }

    let out_dir = selection.out_dir()?;
    let stamp = timestamp_for_filename(Utc::now());
    let mut failed = 0;

    for (institution_id, account_ids) in group_by_institution(&targets) {
        let Some(ctx) = session.context(&institution_id) else {
            warn!("No credentials loaded for {}, skipping", institution_id);
            failed += 1;
            continue;
        };
        let response = match session.client.get_balances(ctx) {
            Ok(response) => response,
            Err(e) => {
                error!("Balance lookup failed for {}: {}", institution_id, e);
                eprintln!("Warning: {}: balances unavailable ({})", institution_id, e.error_code());
                failed += 1;
                continue;
            }
        };

        let table = balances_table(&institution_id, &response.accounts, &account_ids)?;
        let path = report_path(&out_dir, &institution_id, "balances", &stamp);
        table.write_file(&path)?;
        info!("Wrote {} balances to {}", table.len(), path.display());
        println!("{}: {}", institution_id, path.display());
    }

    Ok(if failed > 0 {
        ExitCode::FAILURE
    } else {
        ExitCode::SUCCESS
    })
}
