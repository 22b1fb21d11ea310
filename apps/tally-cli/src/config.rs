//! # Configuration
//!
//! Application configuration loaded at startup.
//!
//! ## Configuration Sources (Priority Order)
//! 1. Command-line flags (`tally --db ...`)
//! 2. Environment variables (`TALLY_*`)
//! 3. Defaults (this file)
//!
//! Read-only after startup.

use std::path::PathBuf;

use directories::ProjectDirs;
use serde::Serialize;
use tally_core::validation::validate_tax_rate_bps;
use tally_core::{Money, Pricing, StoreInfo, TaxMode, TaxRate};
use tracing::warn;

/// Application configuration.
#[derive(Debug, Clone, Serialize)]
pub struct AppConfig {
    /// SQLite catalog file.
    pub db_path: PathBuf,

    /// Directory holding `sales_<date>.json` / `.csv`.
    pub reports_dir: PathBuf,

    pub store_name: String,
    pub store_address: String,
    pub store_contact: String,

    /// Store-wide tax rate.
    pub tax_rate: TaxRate,
    pub tax_mode: TaxMode,

    /// Default cashier name stamped on sales.
    pub cashier: Option<String>,

    /// Currency symbol (for display)
    pub currency_symbol: String,
}

impl Default for AppConfig {
    /// ## Default Values
    /// - Data: platform data dir (`~/.local/share/tally-pos` on Linux)
    /// - Tax: 12% exclusive
    /// - Currency: `$`
    fn default() -> Self {
        let data_dir = ProjectDirs::from("com", "tally", "pos")
            .map(|dirs| dirs.data_dir().to_path_buf())
            .unwrap_or_else(|| PathBuf::from("."));

        AppConfig {
            db_path: data_dir.join("tally.db"),
            reports_dir: data_dir.join("reports"),
            store_name: "Tally Clothing".to_string(),
            store_address: "Jl. Merdeka No. 1".to_string(),
            store_contact: "0812-0000-0000".to_string(),
            tax_rate: TaxRate::from_bps(1200),
            tax_mode: TaxMode::Exclusive,
            cashier: None,
            currency_symbol: "$".to_string(),
        }
    }
}

impl AppConfig {
    /// Defaults overridden by `TALLY_*` environment variables.
    ///
    /// ## Environment Variables
    /// - `TALLY_DB_PATH`, `TALLY_REPORTS_DIR`
    /// - `TALLY_STORE_NAME`, `TALLY_STORE_ADDRESS`, `TALLY_STORE_CONTACT`
    /// - `TALLY_TAX_RATE`: percent, e.g. `"12"` or `"8.25"`
    /// - `TALLY_TAX_INCLUSIVE`: `true`/`1`/`yes`
    /// - `TALLY_CASHIER`, `TALLY_CURRENCY_SYMBOL`
    pub fn from_env() -> Self {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Same as [`from_env`](Self::from_env) with an injectable variable source.
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Self {
        let mut config = AppConfig::default();

        if let Some(path) = lookup("TALLY_DB_PATH") {
            config.db_path = PathBuf::from(path);
        }
        if let Some(dir) = lookup("TALLY_REPORTS_DIR") {
            config.reports_dir = PathBuf::from(dir);
        }
        if let Some(name) = lookup("TALLY_STORE_NAME") {
            config.store_name = name;
        }
        if let Some(address) = lookup("TALLY_STORE_ADDRESS") {
            config.store_address = address;
        }
        if let Some(contact) = lookup("TALLY_STORE_CONTACT") {
            config.store_contact = contact;
        }

        if let Some(raw) = lookup("TALLY_TAX_RATE") {
            match raw.trim().parse::<f64>() {
                Ok(percent) if percent >= 0.0 => {
                    let rate = TaxRate::from_percentage(percent);
                    match validate_tax_rate_bps(rate.bps()) {
                        Ok(()) => config.tax_rate = rate,
                        Err(err) => warn!(value = %raw, error = %err, "Ignoring TALLY_TAX_RATE"),
                    }
                }
                _ => warn!(value = %raw, "Ignoring unparseable TALLY_TAX_RATE"),
            }
        }

        if let Some(raw) = lookup("TALLY_TAX_INCLUSIVE") {
            config.tax_mode = if parse_flag(&raw) {
                TaxMode::Inclusive
            } else {
                TaxMode::Exclusive
            };
        }

        config.cashier = lookup("TALLY_CASHIER").filter(|c| !c.trim().is_empty());

        if let Some(symbol) = lookup("TALLY_CURRENCY_SYMBOL") {
            config.currency_symbol = symbol;
        }

        config
    }

    /// Store metadata for new daily reports.
    pub fn store_info(&self) -> StoreInfo {
        StoreInfo {
            name: self.store_name.clone(),
            address: self.store_address.clone(),
            contact: self.store_contact.clone(),
            tax_rate: self.tax_rate,
            tax_mode: self.tax_mode,
        }
    }

    pub fn pricing(&self) -> Pricing {
        Pricing {
            tax_rate: self.tax_rate,
            tax_mode: self.tax_mode,
        }
    }

    /// Formats an amount with the configured currency symbol.
    ///
    /// ## Example
    /// ```rust
    /// use tally_core::Money;
    ///
    /// let config = tally_cli::config::AppConfig::default();
    /// assert_eq!(config.format_currency(Money::from_minor(1234)), "$12.34");
    /// ```
    pub fn format_currency(&self, amount: Money) -> String {
        amount.with_symbol(&self.currency_symbol).to_string()
    }
}

fn parse_flag(raw: &str) -> bool {
    matches!(
        raw.trim().to_ascii_lowercase().as_str(),
        "1" | "true" | "yes" | "on"
    )
}
