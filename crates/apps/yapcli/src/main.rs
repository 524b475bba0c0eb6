//! yapcli - Export transactions, balances and holdings from Plaid-linked accounts
//!
//! This is the main entry point for the yapcli command line tool.

use clap::Parser;
use log::{error, info};
use std::process::ExitCode;

mod commands;
mod logging;

use commands::Command;

#[derive(Debug, Parser)]
#[command(
    name = "yapcli",
    version,
    about = "Export data from Plaid-linked bank accounts",
    disable_version_flag = true
)]
struct Cli {
    /// Print version
    #[arg(short = 'v', long, action = clap::ArgAction::Version)]
    version: Option<bool>,

    /// Log to stderr instead of a log file
    #[arg(long, global = true)]
    verbose: bool,

    #[command(subcommand)]
    command: Command,
}

fn main() -> ExitCode {
    let cli = Cli::parse();

    // Load .env files before anything reads the environment
    let env_files = match config::load_env_files() {
        Ok(files) => files,
        Err(e) => {
            eprintln!("Warning: failed to load .env files: {:#}", e);
            Vec::new()
        }
    };

    match logging::init(cli.command.name(), cli.verbose) {
        Ok(Some(path)) => info!("Logging to {}", path.display()),
        Ok(None) => {}
        Err(e) => eprintln!("Warning: logging disabled: {:#}", e),
    }
    for file in &env_files {
        info!("Loaded environment from {}", file.display());
    }

    // Bootstrap config directory
    if let Err(e) = config::init() {
        error!("Failed to initialize config directory: {}", e);
    }

    match cli.command.run() {
        Ok(code) => code,
        Err(e) => {
            error!("{:#}", e);
            eprintln!("Error: {:#}", e);
            ExitCode::FAILURE
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::CommandFactory;

    #[test]
    fn test_cli_definition() {
        Cli::command().debug_assert();
    }

    #[test]
    fn test_transactions_args() {
        let cli = Cli::try_parse_from([
            "yapcli",
            "transactions",
            "ins_1",
            "acct-9",
            "--resume",
            "--out-dir",
            "/tmp/out",
            "--verbose",
        ])
        .unwrap();

        assert!(cli.verbose);
        let Command::Transactions(args) = cli.command else {
            panic!("expected transactions");
        };
        assert_eq!(args.selection.ids, vec!["ins_1", "acct-9"]);
        assert!(args.resume);
        assert_eq!(args.cursor, None);
        assert_eq!(
            args.selection.out_dir.as_deref(),
            Some(std::path::Path::new("/tmp/out"))
        );
    }

    #[test]
    fn test_cursor_conflicts_with_resume() {
        let result = Cli::try_parse_from([
            "yapcli",
            "transactions",
            "acct-1",
            "--cursor",
            "abc",
            "--resume",
        ]);
        assert!(result.is_err());
    }

    #[test]
    fn test_short_version_flag() {
        let err = Cli::try_parse_from(["yapcli", "-v"]).unwrap_err();
        assert_eq!(err.kind(), clap::error::ErrorKind::DisplayVersion);
    }

    #[test]
    fn test_investment_transactions_args() {
        let cli = Cli::try_parse_from([
            "yapcli",
            "investment_transactions",
            "acct-1",
            "--start_date",
            "2026-01-01",
            "--end-date",
            "2026-01-31",
        ])
        .unwrap();

        assert_eq!(cli.command.name(), "investment_transactions");
        let Command::InvestmentTransactions(args) = cli.command else {
            panic!("expected investment_transactions");
        };
        assert_eq!(args.selection.ids, vec!["acct-1"]);
        assert_eq!(
            args.start_date,
            chrono::NaiveDate::from_ymd_opt(2026, 1, 1)
        );
        assert_eq!(args.end_date, chrono::NaiveDate::from_ymd_opt(2026, 1, 31));
    }

    #[test]
    fn test_command_names() {
        let cli = Cli::try_parse_from(["yapcli", "list"]).unwrap();
        assert_eq!(cli.command.name(), "list");
        let cli = Cli::try_parse_from(["yapcli", "holdings", "--secrets-dir", "/s"]).unwrap();
        assert_eq!(cli.command.name(), "holdings");
    }
}
