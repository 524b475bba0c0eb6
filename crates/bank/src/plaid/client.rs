//! Plaid API HTTP client
//!
//! Uses synchronous HTTP (ureq) to be executor-agnostic. Every request
//! carries its own timeout, so a stalled connection surfaces as a fault
//! instead of blocking the caller.

use chrono::NaiveDate;
use log::debug;
use serde::Serialize;
use serde::de::DeserializeOwned;
use serde_json::json;
use std::time::Duration;

use super::api::{
    AccountsResponse, HoldingsResponse, InstitutionResponse, InvestmentTransactionsOptions,
    InvestmentTransactionsRequest, InvestmentTransactionsResponse, ItemResponse, PlaidErrorBody,
    SyncRequest, SyncRequestOptions,
};
use crate::config::PlaidSettings;
use crate::models::AccessContext;
use crate::sync::{Page, PageRequest, TransactionFeed, UpstreamFault};

/// Plaid API client
///
/// Holds only app-level credentials; item credentials are passed in per call.
pub struct PlaidClient {
    settings: PlaidSettings,
    agent: ureq::Agent,
}

impl PlaidClient {
    /// API version pinned for every request
    const API_VERSION: &'static str = "2020-09-14";

    /// Maximum page size accepted by /transactions/sync
    const SYNC_PAGE_SIZE: u32 = 500;

    /// Maximum page size accepted by /investments/transactions/get
    const INVESTMENT_PAGE_SIZE: usize = 500;

    /// Create a new Plaid client
    pub fn new(settings: PlaidSettings) -> Self {
        // Non-2xx responses carry a JSON error body we want to read
        let config = ureq::Agent::config_builder()
            .http_status_as_error(false)
            .build();
        Self {
            settings,
            agent: ureq::Agent::new_with_config(config),
        }
    }

    pub fn settings(&self) -> &PlaidSettings {
        &self.settings
    }

    fn default_timeout(&self) -> Duration {
        self.settings.sync.timeout
    }

    /// POST a JSON body and decode the JSON response
    fn post<B: Serialize, T: DeserializeOwned>(
        &self,
        path: &str,
        body: &B,
        timeout: Duration,
    ) -> Result<T, UpstreamFault> {
        let url = format!("{}{}", self.settings.environment.base_url(), path);
        debug!("POST {} (timeout {:?})", url, timeout);

        let result = self
            .agent
            .post(&url)
            .config()
            .timeout_global(Some(timeout))
            .build()
            .header("Plaid-Version", Self::API_VERSION)
            .send_json(body);

        let mut response = match result {
            Ok(response) => response,
            Err(ureq::Error::Timeout(kind)) => {
                return Err(UpstreamFault::timeout(format!(
                    "{} timed out after {:?} ({})",
                    path, timeout, kind
                )));
            }
            Err(e) => {
                return Err(UpstreamFault::transport(format!("{} failed: {}", path, e)));
            }
        };

        let status = response.status();
        if status.is_success() {
            return response.body_mut().read_json::<T>().map_err(|e| {
                UpstreamFault::transport(format!("Failed to parse {} response: {}", path, e))
            });
        }

        match response.body_mut().read_json::<PlaidErrorBody>() {
            Ok(body) => Err(body.into_fault(status.as_u16())),
            Err(e) => Err(UpstreamFault::new(
                Some(status.as_u16()),
                "HTTP_ERROR",
                None,
                Some(format!("{} returned {} with an unreadable body: {}", path, status, e)),
            )),
        }
    }

    /// Body fields shared by every item-scoped endpoint
    fn item_body(&self, ctx: &AccessContext) -> serde_json::Value {
        json!({
            "client_id": self.settings.client_id,
            "secret": self.settings.secret,
            "access_token": ctx.access_token,
        })
    }

    /// List the accounts of an item (/accounts/get)
    pub fn get_accounts(&self, ctx: &AccessContext) -> Result<AccountsResponse, UpstreamFault> {
        self.post("/accounts/get", &self.item_body(ctx), self.default_timeout())
    }

    /// Fetch real-time balances (/accounts/balance/get)
    pub fn get_balances(&self, ctx: &AccessContext) -> Result<AccountsResponse, UpstreamFault> {
        self.post(
            "/accounts/balance/get",
            &self.item_body(ctx),
            self.default_timeout(),
        )
    }

    /// Fetch investment holdings (/investments/holdings/get)
    pub fn get_holdings(&self, ctx: &AccessContext) -> Result<HoldingsResponse, UpstreamFault> {
        self.post(
            "/investments/holdings/get",
            &self.item_body(ctx),
            self.default_timeout(),
        )
    }

    /// Fetch investment transactions dated `start..=end`, following every page
    /// (/investments/transactions/get)
    pub fn get_investment_transactions(
        &self,
        ctx: &AccessContext,
        start: NaiveDate,
        end: NaiveDate,
    ) -> Result<InvestmentTransactionsResponse, UpstreamFault> {
        let mut request = InvestmentTransactionsRequest {
            client_id: &self.settings.client_id,
            secret: &self.settings.secret,
            access_token: &ctx.access_token,
            start_date: start,
            end_date: end,
            options: InvestmentTransactionsOptions {
                count: Self::INVESTMENT_PAGE_SIZE,
                offset: 0,
            },
        };
        let path = "/investments/transactions/get";

        let mut collected: InvestmentTransactionsResponse =
            self.post(path, &request, self.default_timeout())?;
        while collected.is_partial() {
            request.options.offset = collected.investment_transactions.len();
            let page: InvestmentTransactionsResponse =
                self.post(path, &request, self.default_timeout())?;
            if page.investment_transactions.is_empty() {
                break;
            }
            collected.absorb(page);
        }
        debug!(
            "Fetched {} investment transactions ({} to {})",
            collected.investment_transactions.len(),
            start,
            end
        );
        Ok(collected)
    }

    /// Fetch item metadata (/item/get)
    pub fn get_item(&self, ctx: &AccessContext) -> Result<ItemResponse, UpstreamFault> {
        self.post("/item/get", &self.item_body(ctx), self.default_timeout())
    }

    /// Resolve the display name of the institution behind an item
    pub fn get_institution_name(&self, ctx: &AccessContext) -> Result<Option<String>, UpstreamFault> {
        let item = self.get_item(ctx)?.item;
        let Some(institution_id) = item.institution_id else {
            return Ok(None);
        };

        let body = json!({
            "client_id": self.settings.client_id,
            "secret": self.settings.secret,
            "institution_id": institution_id,
            "country_codes": self.settings.country_codes,
        });
        let response: InstitutionResponse =
            self.post("/institutions/get_by_id", &body, self.default_timeout())?;
        Ok(Some(response.institution.name))
    }
}

impl TransactionFeed for PlaidClient {
    fn fetch_page(
        &self,
        ctx: &AccessContext,
        request: &PageRequest<'_>,
    ) -> Result<Page, UpstreamFault> {
        let body = SyncRequest {
            client_id: &self.settings.client_id,
            secret: &self.settings.secret,
            access_token: &ctx.access_token,
            cursor: (!request.cursor.is_start()).then(|| request.cursor.as_str()),
            count: Self::SYNC_PAGE_SIZE,
            options: SyncRequestOptions {
                account_id: request.account_id,
                days_requested: request.days_requested,
            },
        };
        self.post("/transactions/sync", &body, request.timeout)
    }
}
