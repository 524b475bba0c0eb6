//! CSV export of sync results, balances, holdings and investment transactions

mod reports;
mod table;

pub use reports::{
    IDENTITY_COLUMNS, TransactionFiles, account_report_path, balances_table, holdings_table,
    investment_transactions_table, report_path, write_transaction_files,
};
pub use table::{CsvTable, flatten_record};
