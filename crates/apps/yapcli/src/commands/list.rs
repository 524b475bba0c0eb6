use anyhow::Result;
use bank::{DiscoveredAccount, Institution};
use clap::Args;
use std::fmt::Write;
use std::path::PathBuf;
use std::process::ExitCode;

use super::Session;

#[derive(Debug, Clone, Args)]
pub struct ListArgs {
    /// Directory holding <institution>_access_token and <institution>_item_id files
    #[arg(long)]
    pub secrets_dir: Option<PathBuf>,
}

pub fn run(args: ListArgs) -> Result<ExitCode> {
    let session = Session::open(args.secrets_dir.as_deref())?;
    let accounts = session.accounts()?;
    let institutions: Vec<Institution> = session
        .institutions
        .iter()
        .map(|linked| linked.institution.clone())
        .collect();
    print!("{}", format_listing(&institutions, &accounts));
    Ok(ExitCode::SUCCESS)
}

fn format_listing(institutions: &[Institution], accounts: &[DiscoveredAccount]) -> String {
    let mut out = String::new();
    for institution in institutions {
        match &institution.bank_name {
            Some(name) => {
                let _ = writeln!(out, "{} ({})", institution.institution_id, name);
            }
            None => {
                let _ = writeln!(out, "{}", institution.institution_id);
            }
        }
        let owned = accounts
            .iter()
            .filter(|a| a.institution_id == institution.institution_id);
        for account in owned {
            let _ = writeln!(
                out,
                "  {}  {}  [{}]",
                account.account_id,
                account.title(),
                account.account_type.as_deref().unwrap_or("unknown")
            );
        }
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_format_listing() {
        let institutions = vec![
            Institution {
                institution_id: "ins_1".into(),
                bank_name: Some("First Platypus Bank".into()),
            },
            Institution {
                institution_id: "ins_2".into(),
                bank_name: None,
            },
        ];
        let accounts = vec![DiscoveredAccount {
            institution_id: "ins_1".into(),
            bank_name: Some("First Platypus Bank".into()),
            account_id: "acct-1".into(),
            account_type: Some("depository".into()),
            name: Some("Plaid Checking".into()),
            subtype: Some("checking".into()),
            mask: Some("0000".into()),
        }];

        assert_eq!(
            format_listing(&institutions, &accounts),
            "ins_1 (First Platypus Bank)\n\
             \x20 acct-1  First Platypus Bank - Plaid Checking (checking) ••••0000  [depository]\n\
             ins_2\n"
        );
    }
}
