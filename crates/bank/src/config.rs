//! Runtime settings for the Plaid API and the sync engine
//!
//! Settings come from environment variables, which may themselves be
//! populated from `.env` files via [`config::load_env_files`].

use anyhow::{Context, Result, bail};
use std::collections::HashMap;
use std::time::Duration;

use crate::sync::SyncOptions;

/// Plaid deployment to talk to
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PlaidEnvironment {
    Sandbox,
    Production,
}

impl PlaidEnvironment {
    pub fn parse(value: &str) -> Result<Self> {
        match value.trim().to_ascii_lowercase().as_str() {
            "" | "sandbox" => Ok(Self::Sandbox),
            "production" => Ok(Self::Production),
            other => bail!("Unsupported PLAID_ENV '{}' (expected sandbox or production)", other),
        }
    }

    pub fn base_url(&self) -> &'static str {
        match self {
            Self::Sandbox => "https://sandbox.plaid.com",
            Self::Production => "https://production.plaid.com",
        }
    }
}

/// Plaid credentials and sync tunables
#[derive(Debug, Clone)]
pub struct PlaidSettings {
    pub client_id: String,
    pub secret: String,
    pub environment: PlaidEnvironment,
    pub country_codes: Vec<String>,
    pub sync: SyncOptions,
}

impl PlaidSettings {
    /// Load settings from the process environment
    pub fn from_env() -> Result<Self> {
        Self::from_vars(&std::env::vars().collect())
    }

    /// Load settings from an explicit variable map
    ///
    /// Required: `PLAID_CLIENT_ID`, `PLAID_SECRET`.
    /// Optional: `PLAID_ENV`, `PLAID_COUNTRY_CODES`, `YAPCLI_DAYS_REQUESTED`,
    /// `YAPCLI_TIMEOUT_SECS`, `YAPCLI_EMPTY_CURSOR_BACKOFF_SECS`,
    /// `YAPCLI_EMPTY_CURSOR_MAX_RETRIES`.
    pub fn from_vars(vars: &HashMap<String, String>) -> Result<Self> {
        let get = |key: &str| vars.get(key).map(|v| v.trim()).filter(|v| !v.is_empty());

        let client_id = get("PLAID_CLIENT_ID")
            .context("PLAID_CLIENT_ID environment variable not set")?
            .to_string();
        let secret = get("PLAID_SECRET")
            .context("PLAID_SECRET environment variable not set")?
            .to_string();
        let environment = PlaidEnvironment::parse(get("PLAID_ENV").unwrap_or("sandbox"))?;
        let country_codes = get("PLAID_COUNTRY_CODES")
            .unwrap_or("US")
            .split(',')
            .map(|c| c.trim().to_ascii_uppercase())
            .filter(|c| !c.is_empty())
            .collect();

        let defaults = SyncOptions::default();
        let days_requested = match get("YAPCLI_DAYS_REQUESTED") {
            Some(raw) => match parse_number::<u32>("YAPCLI_DAYS_REQUESTED", raw)? {
                0 => bail!("YAPCLI_DAYS_REQUESTED must be a positive integer"),
                days => Some(days),
            },
            None => None,
        };
        let timeout = match get("YAPCLI_TIMEOUT_SECS") {
            Some(raw) => Duration::from_secs(parse_number("YAPCLI_TIMEOUT_SECS", raw)?),
            None => defaults.timeout,
        };
        let empty_cursor_backoff = match get("YAPCLI_EMPTY_CURSOR_BACKOFF_SECS") {
            Some(raw) => Duration::from_secs(parse_number("YAPCLI_EMPTY_CURSOR_BACKOFF_SECS", raw)?),
            None => defaults.empty_cursor_backoff,
        };
        let max_empty_retries = match get("YAPCLI_EMPTY_CURSOR_MAX_RETRIES") {
            Some(raw) => parse_number("YAPCLI_EMPTY_CURSOR_MAX_RETRIES", raw)?,
            None => defaults.max_empty_retries,
        };

        Ok(Self {
            client_id,
            secret,
            environment,
            country_codes,
            sync: SyncOptions {
                timeout,
                empty_cursor_backoff,
                max_empty_retries,
                days_requested,
            },
        })
    }
}

fn parse_number<T: std::str::FromStr>(key: &str, raw: &str) -> Result<T> {
    raw.parse()
        .ok()
        .with_context(|| format!("{} must be a non-negative integer, got '{}'", key, raw))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn vars(pairs: &[(&str, &str)]) -> HashMap<String, String> {
        pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect()
    }

    #[test]
    fn test_defaults() {
        let settings =
            PlaidSettings::from_vars(&vars(&[("PLAID_CLIENT_ID", "client"), ("PLAID_SECRET", "secret")]))
                .unwrap();

        assert_eq!(settings.environment, PlaidEnvironment::Sandbox);
        assert_eq!(settings.country_codes, vec!["US"]);
        assert_eq!(settings.sync, SyncOptions::default());
    }

    #[test]
    fn test_overrides() {
        let settings = PlaidSettings::from_vars(&vars(&[
            ("PLAID_CLIENT_ID", "client"),
            ("PLAID_SECRET", "secret"),
            ("PLAID_ENV", "production"),
            ("PLAID_COUNTRY_CODES", "us, ca"),
            ("YAPCLI_DAYS_REQUESTED", "90"),
            ("YAPCLI_TIMEOUT_SECS", "10"),
            ("YAPCLI_EMPTY_CURSOR_BACKOFF_SECS", "5"),
            ("YAPCLI_EMPTY_CURSOR_MAX_RETRIES", "4"),
        ]))
        .unwrap();

        assert_eq!(settings.environment, PlaidEnvironment::Production);
        assert_eq!(settings.environment.base_url(), "https://production.plaid.com");
        assert_eq!(settings.country_codes, vec!["US", "CA"]);
        assert_eq!(settings.sync.days_requested, Some(90));
        assert_eq!(settings.sync.timeout, Duration::from_secs(10));
        assert_eq!(settings.sync.empty_cursor_backoff, Duration::from_secs(5));
        assert_eq!(settings.sync.max_empty_retries, 4);
    }

    #[test]
    fn test_missing_credentials() {
        let err = PlaidSettings::from_vars(&vars(&[("PLAID_SECRET", "secret")])).unwrap_err();
        assert!(err.to_string().contains("PLAID_CLIENT_ID"));
    }

    #[test]
    fn test_invalid_values() {
        let base = [("PLAID_CLIENT_ID", "client"), ("PLAID_SECRET", "secret")];

        let mut bad_env = base.to_vec();
        bad_env.push(("PLAID_ENV", "development"));
        assert!(PlaidSettings::from_vars(&vars(&bad_env)).is_err());

        let mut zero_days = base.to_vec();
        zero_days.push(("YAPCLI_DAYS_REQUESTED", "0"));
        assert!(PlaidSettings::from_vars(&vars(&zero_days)).is_err());

        let mut bad_timeout = base.to_vec();
        bad_timeout.push(("YAPCLI_TIMEOUT_SECS", "soon"));
        assert!(PlaidSettings::from_vars(&vars(&bad_timeout)).is_err());
    }
}
