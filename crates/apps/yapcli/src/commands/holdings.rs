use anyhow::Result;
use bank::export::{holdings_table, report_path};
use bank::naming::timestamp_for_filename;
use bank::{HOLDINGS_ACCOUNT_TYPES, resolve_target_accounts};
use chrono::Utc;
use clap::Args;
use log::{error, info, warn};
use std::process::ExitCode;

use super::{SelectionArgs, Session, group_by_institution};

#[derive(Debug, Clone, Args)]
pub struct HoldingsArgs {
    #[command(flatten)]
    pub selection: SelectionArgs,
}

pub fn run(args: HoldingsArgs) -> Result<ExitCode> {
    let selection = args.selection;
    let session = Session::open(selection.secrets_dir.as_deref())?;
    let targets = resolve_target_accounts(
        &selection.ids,
        &session.accounts()?,
        Some(HOLDINGS_ACCOUNT_TYPES),
    )?;
    if targets.is_empty() {
        println!("No depository or investment accounts selected");
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
        let response = match session.client.get_holdings(ctx) {
            Ok(response) => response,
            Err(e) => {
                // Items without the investments product answer with an error here
                error!("Holdings lookup failed for {}: {}", institution_id, e);
                eprintln!("Warning: {}: holdings unavailable ({})", institution_id, e.error_code());
                failed += 1;
                continue;
            }
        };

        let table = holdings_table(&institution_id, &response, &account_ids)?;
        if table.is_empty() {
            println!("{}: no holdings", institution_id);
            continue;
        }
        let path = report_path(&out_dir, &institution_id, "holdings", &stamp);
        table.write_file(&path)?;
        info!("Wrote {} holdings to {}", table.len(), path.display());
        println!("{}: {}", institution_id, path.display());
    }

    Ok(if failed > 0 {
        ExitCode::FAILURE
    } else {
        ExitCode::SUCCESS
    })
}
