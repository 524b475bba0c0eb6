//! CSV reports for transactions, balances and holdings

use anyhow::{Context, Result};
use log::info;
use serde::Serialize;
use serde_json::{Map, Value};
use std::collections::HashMap;
use std::path::{Path, PathBuf};

use super::table::CsvTable;
use crate::models::{AccountRef, DiscoveredAccount};
use crate::naming::safe_filename_component;
use crate::plaid::api::{Account, HoldingsResponse, InvestmentTransactionsResponse};
use crate::sync::SyncResult;

/// Columns placed first in every report
pub const IDENTITY_COLUMNS: &[&str] = &["institution_id", "account_id"];

/// Files written for one account's transactions
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TransactionFiles {
    pub transactions: PathBuf,
    /// Present only when the run delivered modifications
    pub modified: Option<PathBuf>,
    /// Present only when the run delivered removals
    pub removed: Option<PathBuf>,
}

/// Convert a serializable record into a JSON object tagged with its institution
fn tagged_record<T: Serialize>(institution_id: &str, record: &T) -> Result<Map<String, Value>> {
    let mut object = match serde_json::to_value(record)? {
        Value::Object(object) => object,
        other => {
            let mut object = Map::new();
            object.insert("value".into(), other);
            object
        }
    };
    object.insert("institution_id".into(), Value::String(institution_id.to_string()));
    Ok(object)
}

fn table_of<T: Serialize>(institution_id: &str, records: &[T]) -> Result<CsvTable> {
    let mut table = CsvTable::new(IDENTITY_COLUMNS);
    for record in records {
        table.push(&tagged_record(institution_id, record)?);
    }
    Ok(table)
}

/// Write the transactions of a sync run.
///
/// `<out>/<prefix>_<stamp>.csv` is always written; the `_modified` and
/// `_removed` companions only when those lists are non-empty.
pub fn write_transaction_files(
    out_dir: &Path,
    account: &AccountRef,
    stamp: &str,
    result: &SyncResult,
) -> Result<TransactionFiles> {
    std::fs::create_dir_all(out_dir)
        .with_context(|| format!("Failed to create output dir: {}", out_dir.display()))?;
    let base = format!("{}_{}", account.file_prefix(), stamp);
    let institution_id = &account.institution_id;

    let transactions = out_dir.join(format!("{}.csv", base));
    table_of(institution_id, &result.transactions)?.write_file(&transactions)?;
    info!(
        "Wrote {} transactions to {}",
        result.transactions.len(),
        transactions.display()
    );

    let modified = if result.modified.is_empty() {
        None
    } else {
        let path = out_dir.join(format!("{}_modified.csv", base));
        table_of(institution_id, &result.modified)?.write_file(&path)?;
        Some(path)
    };

    let removed = if result.removed.is_empty() {
        None
    } else {
        let path = out_dir.join(format!("{}_removed.csv", base));
        table_of(institution_id, &result.removed)?.write_file(&path)?;
        Some(path)
    };

    Ok(TransactionFiles {
        transactions,
        modified,
        removed,
    })
}

/// Balance rows for the selected accounts of one institution
pub fn balances_table(
    institution_id: &str,
    accounts: &[Account],
    selected: &[String],
) -> Result<CsvTable> {
    let chosen: Vec<&Account> = accounts
        .iter()
        .filter(|a| selected.contains(&a.account_id))
        .collect();
    table_of(institution_id, &chosen)
}

/// Holding rows for the selected accounts of one institution.
///
/// Each row carries its security under `security.*` and the owning
/// account's descriptive fields under `account.*`.
pub fn holdings_table(
    institution_id: &str,
    response: &HoldingsResponse,
    selected: &[String],
) -> Result<CsvTable> {
    let securities = index_securities(&response.securities);
    let accounts: HashMap<&str, &Account> = response
        .accounts
        .iter()
        .map(|a| (a.account_id.as_str(), a))
        .collect();

    let mut table = CsvTable::new(IDENTITY_COLUMNS);
    for holding in &response.holdings {
        let Some(account_id) = holding.get("account_id").and_then(Value::as_str) else {
            continue;
        };
        if !selected.iter().any(|s| s == account_id) {
            continue;
        }

        let mut row = holding.clone();
        row.insert("institution_id".into(), Value::String(institution_id.to_string()));
        if let Some(account) = accounts.get(account_id) {
            row.insert(
                "account".into(),
                serde_json::json!({
                    "name": account.name,
                    "mask": account.mask,
                    "type": account.account_type,
                    "subtype": account.subtype,
                }),
            );
        }
        attach_security(&mut row, &securities);
        table.push(&row);
    }
    Ok(table)
}

fn index_securities(securities: &[Map<String, Value>]) -> HashMap<&str, &Map<String, Value>> {
    securities
        .iter()
        .filter_map(|s| Some((s.get("security_id")?.as_str()?, s)))
        .collect()
}

/// Nest the row's security, if known, under `security`
fn attach_security(row: &mut Map<String, Value>, securities: &HashMap<&str, &Map<String, Value>>) {
    let security = row
        .get("security_id")
        .and_then(Value::as_str)
        .and_then(|id| securities.get(id));
    if let Some(security) = security {
        row.insert("security".into(), Value::Object((*security).clone()));
    }
}

/// Investment transaction rows of one account.
///
/// Rows of other accounts in the response are dropped. Every row gets the
/// account's descriptive fields as `account_*` columns plus `bank_name`.
pub fn investment_transactions_table(
    account: &DiscoveredAccount,
    response: &InvestmentTransactionsResponse,
) -> CsvTable {
    let securities = index_securities(&response.securities);
    let text = |value: &Option<String>| value.clone().map_or(Value::Null, Value::String);

    let mut table = CsvTable::new(IDENTITY_COLUMNS);
    for transaction in &response.investment_transactions {
        let owner = transaction.get("account_id").and_then(Value::as_str);
        if owner != Some(account.account_id.as_str()) {
            continue;
        }
        let mut row = transaction.clone();
        row.insert("institution_id".into(), Value::String(account.institution_id.clone()));
        attach_security(&mut row, &securities);
        row.insert("account_type".into(), text(&account.account_type));
        row.insert("account_name".into(), text(&account.name));
        row.insert("account_subtype".into(), text(&account.subtype));
        row.insert("account_mask".into(), text(&account.mask));
        row.insert("bank_name".into(), text(&account.bank_name));
        table.push(&row);
    }
    table
}

/// Path of a per-account report: `<out>/<prefix>_<stamp>.csv`
pub fn account_report_path(out_dir: &Path, account: &AccountRef, stamp: &str) -> PathBuf {
    out_dir.join(format!("{}_{}.csv", account.file_prefix(), stamp))
}

/// Path of a per-institution report: `<out>/<institution>_<kind>_<stamp>.csv`
pub fn report_path(out_dir: &Path, institution_id: &str, kind: &str, stamp: &str) -> PathBuf {
    out_dir.join(format!(
        "{}_{}_{}.csv",
        safe_filename_component(institution_id),
        kind,
        stamp
    ))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{Cursor, RemovedTransaction, Transaction};
    use chrono::NaiveDate;
    use serde_json::json;
    use tempfile::TempDir;

    fn date(day: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(2024, 3, day).unwrap()
    }

    fn result(modified: Vec<Transaction>, removed: Vec<RemovedTransaction>) -> SyncResult {
        SyncResult {
            transactions: vec![
                Transaction::new("t1", "acct-1", date(1), 12.5).with_name("Coffee"),
                Transaction::new("t2", "acct-1", date(2), -100.0),
            ],
            modified,
            removed,
            cursor: Cursor::parse("abc").unwrap(),
            error: None,
        }
    }

    fn accounts() -> Vec<Account> {
        serde_json::from_value(json!([
            {"account_id": "a1", "name": "Checking", "mask": "1111", "type": "depository",
             "subtype": "checking", "balances": {"available": 10.0, "current": 12.0}},
            {"account_id": "a2", "name": "Brokerage", "mask": "2222", "type": "investment",
             "subtype": "brokerage", "balances": {"available": null, "current": 500.0}}
        ]))
        .unwrap()
    }

    #[test]
    fn test_transaction_files_without_amendments() {
        let tmp = TempDir::new().unwrap();
        let account = AccountRef::new("ins_1", "acct-1").with_mask("0000");

        let files =
            write_transaction_files(tmp.path(), &account, "20240301T120000Z", &result(vec![], vec![]))
                .unwrap();

        assert_eq!(files.transactions, tmp.path().join("ins_1_0000_20240301T120000Z.csv"));
        assert_eq!(files.modified, None);
        assert_eq!(files.removed, None);

        let content = std::fs::read_to_string(&files.transactions).unwrap();
        let mut lines = content.lines();
        assert_eq!(
            lines.next(),
            Some("institution_id,account_id,transaction_id,date,amount,name")
        );
        assert_eq!(lines.next(), Some("ins_1,acct-1,t1,2024-03-01,12.5,Coffee"));
        assert_eq!(lines.next(), Some("ins_1,acct-1,t2,2024-03-02,-100.0,"));
    }

    #[test]
    fn test_transaction_files_with_amendments() {
        let tmp = TempDir::new().unwrap();
        let account = AccountRef::new("ins_1", "acct-1");

        let files = write_transaction_files(
            tmp.path(),
            &account,
            "20240301T120000Z",
            &result(
                vec![Transaction::new("t0", "acct-1", date(1), 3.0)],
                vec![RemovedTransaction::new("t9")],
            ),
        )
        .unwrap();

        let modified = files.modified.unwrap();
        let removed = files.removed.unwrap();
        assert!(modified.ends_with("ins_1_acct-1_20240301T120000Z_modified.csv"));
        assert!(removed.ends_with("ins_1_acct-1_20240301T120000Z_removed.csv"));
        let removed_csv = std::fs::read_to_string(removed).unwrap();
        assert!(removed_csv.lines().nth(1).unwrap().contains("t9"));
    }

    #[test]
    fn test_balances_table_selects_accounts() {
        let table = balances_table("ins_1", &accounts(), &["a2".to_string()]).unwrap();
        assert_eq!(table.len(), 1);
        assert!(table.columns().iter().any(|c| c == "balances.current"));
        assert_eq!(&table.columns()[..2], ["institution_id", "account_id"]);
    }

    #[test]
    fn test_holdings_table_joins_security_and_account() {
        let response: HoldingsResponse = serde_json::from_value(json!({
            "accounts": accounts(),
            "holdings": [
                {"account_id": "a2", "security_id": "s1", "quantity": 3.0},
                {"account_id": "a1", "security_id": "s1", "quantity": 1.0}
            ],
            "securities": [{"security_id": "s1", "ticker_symbol": "VTI", "name": "Total Market"}],
            "request_id": "r"
        }))
        .unwrap();

        let table = holdings_table("ins_1", &response, &["a2".to_string()]).unwrap();
        assert_eq!(table.len(), 1);

        let mut out = Vec::new();
        table.write_to(&mut out).unwrap();
        let csv = String::from_utf8(out).unwrap();
        let header = csv.lines().next().unwrap();
        assert!(header.contains("security.ticker_symbol"));
        assert!(header.contains("account.name"));
        assert!(csv.contains("VTI"));
        assert!(csv.contains("Brokerage"));
    }

    #[test]
    fn test_investment_transactions_table_keeps_one_account() {
        let response: InvestmentTransactionsResponse = serde_json::from_value(json!({
            "investment_transactions": [
                {"investment_transaction_id": "i1", "account_id": "a2", "security_id": "s1",
                 "amount": 12.34, "date": "2026-02-15"},
                {"investment_transaction_id": "i2", "account_id": "other", "amount": 1.0}
            ],
            "securities": [{"security_id": "s1", "ticker_symbol": "VTI"}],
            "total_investment_transactions": 2,
            "request_id": "r"
        }))
        .unwrap();
        let account = DiscoveredAccount {
            institution_id: "ins_1".into(),
            bank_name: Some("Test Bank".into()),
            account_id: "a2".into(),
            account_type: Some("investment".into()),
            name: Some("Brokerage".into()),
            subtype: Some("brokerage".into()),
            mask: Some("9999".into()),
        };

        let table = investment_transactions_table(&account, &response);
        assert_eq!(table.len(), 1);

        let mut out = Vec::new();
        table.write_to(&mut out).unwrap();
        let csv = String::from_utf8(out).unwrap();
        let mut lines = csv.lines();
        let header = lines.next().unwrap();
        assert!(header.starts_with("institution_id,account_id,investment_transaction_id"));
        assert!(header.ends_with("account_type,account_name,account_subtype,account_mask,bank_name"));
        let row = lines.next().unwrap();
        assert!(row.starts_with("ins_1,a2,i1,"));
        assert!(row.contains("VTI"));
        assert!(row.ends_with("investment,Brokerage,brokerage,9999,Test Bank"));
    }

    #[test]
    fn test_account_report_path() {
        let account = AccountRef::new("ins_1", "acct-1").with_mask("9999");
        let path = account_report_path(Path::new("/out"), &account, "20260215T000000Z");
        assert_eq!(path, Path::new("/out/ins_1_9999_20260215T000000Z.csv"));
    }

    #[test]
    fn test_report_path() {
        let path = report_path(Path::new("/out"), "ins 1", "balances", "20240301T120000Z");
        assert_eq!(path, Path::new("/out/ins_1_balances_20240301T120000Z.csv"));
    }
}
