//! Transaction records as delivered by the transactions change-feed

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

/// Unique identifier for a transaction
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct TransactionId(pub String);

impl TransactionId {
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl From<String> for TransactionId {
    fn from(s: String) -> Self {
        Self(s)
    }
}

impl From<&str> for TransactionId {
    fn from(s: &str) -> Self {
        Self(s.to_string())
    }
}

/// A transaction that was added or modified upstream
///
/// Only the fields the sync engine relies on are typed; every other field
/// the API sends is kept in `extra` so exports stay lossless.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Transaction {
    pub transaction_id: TransactionId,
    pub account_id: String,
    /// Posting date, used for ordering
    pub date: NaiveDate,
    #[serde(default)]
    pub amount: f64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

impl Transaction {
    pub fn new(
        transaction_id: impl Into<TransactionId>,
        account_id: impl Into<String>,
        date: NaiveDate,
        amount: f64,
    ) -> Self {
        Self {
            transaction_id: transaction_id.into(),
            account_id: account_id.into(),
            date,
            amount,
            name: None,
            extra: Map::new(),
        }
    }

    pub fn with_name(mut self, name: impl Into<String>) -> Self {
        self.name = Some(name.into());
        self
    }
}

/// A retraction of a previously delivered transaction
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RemovedTransaction {
    pub transaction_id: TransactionId,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub account_id: Option<String>,
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

impl RemovedTransaction {
    pub fn new(transaction_id: impl Into<TransactionId>) -> Self {
        Self {
            transaction_id: transaction_id.into(),
            account_id: None,
            extra: Map::new(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_deserialize_keeps_unknown_fields() {
        let json = r#"{
            "transaction_id": "txn-1",
            "account_id": "acc-1",
            "date": "2026-02-15",
            "amount": 12.34,
            "name": "Coffee",
            "iso_currency_code": "USD",
            "location": {"city": "Austin"}
        }"#;

        let txn: Transaction = serde_json::from_str(json).unwrap();
        assert_eq!(txn.transaction_id.as_str(), "txn-1");
        assert_eq!(txn.date, NaiveDate::from_ymd_opt(2026, 2, 15).unwrap());
        assert_eq!(txn.name.as_deref(), Some("Coffee"));
        assert_eq!(txn.extra["iso_currency_code"], "USD");
        assert_eq!(txn.extra["location"]["city"], "Austin");
    }

    #[test]
    fn test_removed_needs_only_an_id() {
        let removed: RemovedTransaction =
            serde_json::from_str(r#"{"transaction_id": "txn-9"}"#).unwrap();
        assert_eq!(removed.transaction_id.as_str(), "txn-9");
        assert!(removed.account_id.is_none());
    }
}
