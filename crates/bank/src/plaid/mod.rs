//! Plaid API integration
//!
//! This module provides:
//! - A blocking Plaid API client
//! - Request/response types for the endpoints yapcli uses

mod client;

pub use client::PlaidClient;

/// Plaid API request and response types
pub mod api {
    use chrono::NaiveDate;
    use serde::{Deserialize, Serialize};
    use serde_json::{Map, Value};

    use crate::sync::UpstreamFault;

    /// Error body returned with every non-2xx Plaid response
    #[derive(Debug, Deserialize)]
    pub struct PlaidErrorBody {
        pub error_code: String,
        pub error_type: Option<String>,
        pub error_message: Option<String>,
        pub display_message: Option<String>,
        pub request_id: Option<String>,
    }

    impl PlaidErrorBody {
        /// Convert into a fault, preferring the user-facing message
        pub fn into_fault(self, status: u16) -> UpstreamFault {
            UpstreamFault::new(
                Some(status),
                self.error_code,
                self.error_type,
                self.display_message.or(self.error_message),
            )
        }
    }

    /// An account of an item, as returned by /accounts/get and /accounts/balance/get
    #[derive(Debug, Clone, Serialize, Deserialize)]
    pub struct Account {
        pub account_id: String,
        pub name: Option<String>,
        pub official_name: Option<String>,
        pub mask: Option<String>,
        #[serde(rename = "type")]
        pub account_type: Option<String>,
        pub subtype: Option<String>,
        /// Balances and any fields not modelled above
        #[serde(flatten)]
        pub extra: Map<String, Value>,
    }

    #[derive(Debug, Clone, Deserialize)]
    pub struct AccountsResponse {
        pub accounts: Vec<Account>,
        pub request_id: Option<String>,
    }

    #[derive(Debug, Clone, Deserialize)]
    pub struct HoldingsResponse {
        #[serde(default)]
        pub accounts: Vec<Account>,
        #[serde(default)]
        pub holdings: Vec<Map<String, Value>>,
        #[serde(default)]
        pub securities: Vec<Map<String, Value>>,
        pub request_id: Option<String>,
    }

    #[derive(Debug, Clone, Deserialize)]
    pub struct Item {
        pub item_id: String,
        pub institution_id: Option<String>,
        #[serde(default)]
        pub consented_products: Vec<String>,
    }

    #[derive(Debug, Clone, Deserialize)]
    pub struct ItemResponse {
        pub item: Item,
    }

    #[derive(Debug, Clone, Deserialize)]
    pub struct InstitutionInfo {
        pub institution_id: String,
        pub name: String,
    }

    #[derive(Debug, Clone, Deserialize)]
    pub struct InstitutionResponse {
        pub institution: InstitutionInfo,
    }

    /// Paging block of /investments/transactions/get
    #[derive(Debug, Clone, Serialize)]
    pub struct InvestmentTransactionsOptions {
        pub count: usize,
        pub offset: usize,
    }

    /// Body of /investments/transactions/get
    #[derive(Debug, Clone, Serialize)]
    pub struct InvestmentTransactionsRequest<'a> {
        pub client_id: &'a str,
        pub secret: &'a str,
        pub access_token: &'a str,
        pub start_date: NaiveDate,
        pub end_date: NaiveDate,
        pub options: InvestmentTransactionsOptions,
    }

    #[derive(Debug, Clone, Default, Deserialize)]
    pub struct InvestmentTransactionsResponse {
        #[serde(default)]
        pub accounts: Vec<Account>,
        #[serde(default)]
        pub investment_transactions: Vec<Map<String, Value>>,
        #[serde(default)]
        pub securities: Vec<Map<String, Value>>,
        /// Size of the whole date range, across every page
        #[serde(default)]
        pub total_investment_transactions: usize,
        pub request_id: Option<String>,
    }

    impl InvestmentTransactionsResponse {
        /// Whether more pages remain beyond what has been collected
        pub fn is_partial(&self) -> bool {
            self.investment_transactions.len() < self.total_investment_transactions
        }

        /// Append a later page, keeping each security once
        pub fn absorb(&mut self, page: InvestmentTransactionsResponse) {
            self.investment_transactions
                .extend(page.investment_transactions);
            for security in page.securities {
                let id = security.get("security_id");
                if !self.securities.iter().any(|s| s.get("security_id") == id) {
                    self.securities.push(security);
                }
            }
        }
    }

    /// Options block of /transactions/sync
    #[derive(Debug, Clone, Default, Serialize)]
    pub struct SyncRequestOptions<'a> {
        #[serde(skip_serializing_if = "Option::is_none")]
        pub account_id: Option<&'a str>,
        #[serde(skip_serializing_if = "Option::is_none")]
        pub days_requested: Option<u32>,
    }

    /// Body of /transactions/sync
    #[derive(Debug, Clone, Serialize)]
    pub struct SyncRequest<'a> {
        pub client_id: &'a str,
        pub secret: &'a str,
        pub access_token: &'a str,
        /// Omitted on the first request to receive full history
        #[serde(skip_serializing_if = "Option::is_none")]
        pub cursor: Option<&'a str>,
        pub count: u32,
        #[serde(skip_serializing_if = "SyncRequestOptions::is_empty")]
        pub options: SyncRequestOptions<'a>,
    }

    impl SyncRequestOptions<'_> {
        pub fn is_empty(&self) -> bool {
            self.account_id.is_none() && self.days_requested.is_none()
        }
    }
}

#[cfg(test)]
mod tests {
    use super::api::*;

    #[test]
    fn test_error_body_to_fault() {
        let body: PlaidErrorBody = serde_json::from_str(
            r#"{
                "error_type": "ITEM_ERROR",
                "error_code": "ITEM_LOGIN_REQUIRED",
                "error_message": "the login details of this item have changed",
                "display_message": null,
                "request_id": "abc"
            }"#,
        )
        .unwrap();

        let fault = body.into_fault(400);
        assert_eq!(fault.error_code(), "ITEM_LOGIN_REQUIRED");
        assert_eq!(fault.0.status_code, Some(400));
        assert_eq!(
            fault.0.display_message.as_deref(),
            Some("the login details of this item have changed")
        );
    }

    #[test]
    fn test_sync_request_body() {
        let first = SyncRequest {
            client_id: "client",
            secret: "secret",
            access_token: "access",
            cursor: None,
            count: 500,
            options: SyncRequestOptions::default(),
        };
        let json = serde_json::to_value(&first).unwrap();
        assert!(json.get("cursor").is_none());
        assert!(json.get("options").is_none());

        let filtered = SyncRequest {
            cursor: Some("abc="),
            options: SyncRequestOptions {
                account_id: Some("acc"),
                days_requested: Some(15),
            },
            ..first
        };
        let json = serde_json::to_value(&filtered).unwrap();
        assert_eq!(json["cursor"], "abc=");
        assert_eq!(json["options"]["account_id"], "acc");
        assert_eq!(json["options"]["days_requested"], 15);
    }

    #[test]
    fn test_account_keeps_balances() {
        let account: Account = serde_json::from_str(
            r#"{
                "account_id": "acct-1",
                "name": "Checking",
                "mask": "0000",
                "type": "depository",
                "subtype": "checking",
                "balances": {"available": 100.0, "current": 110.0}
            }"#,
        )
        .unwrap();
        assert_eq!(account.account_type.as_deref(), Some("depository"));
        assert_eq!(account.extra["balances"]["current"], 110.0);
    }

    #[test]
    fn test_investment_transactions_request_body() {
        let request = InvestmentTransactionsRequest {
            client_id: "client",
            secret: "secret",
            access_token: "access",
            start_date: chrono::NaiveDate::from_ymd_opt(2026, 1, 1).unwrap(),
            end_date: chrono::NaiveDate::from_ymd_opt(2026, 1, 31).unwrap(),
            options: InvestmentTransactionsOptions {
                count: 500,
                offset: 0,
            },
        };
        let json = serde_json::to_value(&request).unwrap();
        assert_eq!(json["start_date"], "2026-01-01");
        assert_eq!(json["end_date"], "2026-01-31");
        assert_eq!(json["options"]["count"], 500);
    }

    #[test]
    fn test_investment_transaction_pages_merge() {
        let page = |ids: &[&str], securities: &[&str]| -> InvestmentTransactionsResponse {
            serde_json::from_value(serde_json::json!({
                "investment_transactions": ids
                    .iter()
                    .map(|id| serde_json::json!({"investment_transaction_id": id}))
                    .collect::<Vec<_>>(),
                "securities": securities
                    .iter()
                    .map(|id| serde_json::json!({"security_id": id}))
                    .collect::<Vec<_>>(),
                "total_investment_transactions": 3,
                "request_id": "r"
            }))
            .unwrap()
        };

        let mut merged = page(&["i1", "i2"], &["s1"]);
        assert!(merged.is_partial());
        merged.absorb(page(&["i3"], &["s1", "s2"]));

        assert!(!merged.is_partial());
        assert_eq!(merged.investment_transactions.len(), 3);
        assert_eq!(merged.securities.len(), 2);
    }
}
