//! # Report Aggregator
//!
//! Folds completed receipts into the day's report file.
//!
//! ## record_sale Flow
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                                                                         │
//! │  Receipt + SaleMetadata                                                 │
//! │       │                                                                 │
//! │       ▼                                                                 │
//! │  lock ──► load sales_<date>.json (or new shell with store metadata)    │
//! │       │                                                                 │
//! │       ▼                                                                 │
//! │  transaction_id = sales.len() + 1                                       │
//! │  invoice        = metadata.invoice_number or INV/<YYYYMMDD>/<NNN>       │
//! │       │                                                                 │
//! │       ▼                                                                 │
//! │  push SaleRecord, summary += sale                                       │
//! │       │                                                                 │
//! │       ▼                                                                 │
//! │  write sales_<date>.json.tmp ──► rename over sales_<date>.json          │
//! │       │                                                                 │
//! │       ▼                                                                 │
//! │  regenerate sales_<date>.csv  (failure logged, sale still recorded)     │
//! │                                                                         │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! The lock serializes writers within one process only.

use std::collections::BTreeMap;
use std::fs;
use std::path::{Path, PathBuf};
use std::sync::{Mutex, MutexGuard};

use chrono::{Local, NaiveDate, NaiveDateTime};
use serde::{Deserialize, Serialize};
use tally_core::{Money, PaymentMethod, ProductId, Receipt, StoreInfo};
use tracing::{debug, info, warn};

use crate::document::{ReportDocument, SaleItem, SaleRecord, StockChange, StoreMetadata};
use crate::error::{ReportError, ReportResult};
use crate::export;
use crate::text::TextReport;

/// Operator-entered details that accompany a sale. Trusted as entered.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct SaleMetadata {
    pub cashier: Option<String>,
    pub payment_method: Option<PaymentMethod>,
    pub amount_paid: Option<Money>,
    /// Derived from `amount_paid` when left empty.
    pub change: Option<Money>,
    /// Overrides the generated invoice number when non-blank.
    pub invoice_number: Option<String>,
}

/// Where a sale ended up.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct RecordedSale {
    pub invoice_number: String,
    pub transaction_id: u32,
    pub report_path: PathBuf,
    /// `None` when the CSV view could not be regenerated.
    pub csv_path: Option<PathBuf>,
}

/// Owns a reports directory and the day files inside it.
#[derive(Debug)]
pub struct ReportAggregator {
    dir: PathBuf,
    store: StoreInfo,
    currency_symbol: String,
    write_lock: Mutex<()>,
}

impl ReportAggregator {
    /// Opens (creating if needed) a reports directory.
    pub fn open(dir: impl Into<PathBuf>, store: StoreInfo) -> ReportResult<Self> {
        let dir = dir.into();
        fs::create_dir_all(&dir)?;
        debug!(dir = %dir.display(), "Report directory ready");

        Ok(ReportAggregator {
            dir,
            store,
            currency_symbol: "$".to_string(),
            write_lock: Mutex::new(()),
        })
    }

    /// Symbol used by the printable text view. Defaults to `$`.
    pub fn with_currency_symbol(mut self, symbol: impl Into<String>) -> Self {
        self.currency_symbol = symbol.into();
        self
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    pub fn report_path(&self, date: NaiveDate) -> PathBuf {
        self.dir.join(format!("sales_{}.json", date.format("%Y-%m-%d")))
    }

    pub fn csv_path(&self, date: NaiveDate) -> PathBuf {
        self.dir.join(format!("sales_{}.csv", date.format("%Y-%m-%d")))
    }

    fn lock(&self) -> MutexGuard<'_, ()> {
        // The guarded data is (), so a poisoned lock carries no broken state.
        self.write_lock
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    // =========================================================================
    // Recording
    // =========================================================================

    /// Records a sale in today's report (local time).
    pub fn record_sale(
        &self,
        receipt: &Receipt,
        metadata: &SaleMetadata,
    ) -> ReportResult<RecordedSale> {
        self.record_sale_at(receipt, metadata, Local::now().naive_local())
    }

    /// Records a sale as if it happened at `now`.
    pub fn record_sale_at(
        &self,
        receipt: &Receipt,
        metadata: &SaleMetadata,
        now: NaiveDateTime,
    ) -> ReportResult<RecordedSale> {
        let _guard = self.lock();

        let date = now.date();
        let mut doc = match self.load(date) {
            Ok(doc) => doc,
            Err(ReportError::NotFound(_)) => {
                info!(%date, "Starting new daily report");
                ReportDocument::new(date, StoreMetadata::from(&self.store))
            }
            Err(err) => return Err(err),
        };

        let transaction_id = doc.next_transaction_id();
        let invoice_number = metadata
            .invoice_number
            .as_deref()
            .map(str::trim)
            .filter(|s| !s.is_empty())
            .map(str::to_string)
            .unwrap_or_else(|| invoice_number(date, transaction_id));

        let total = receipt.totals.total;
        let change = metadata
            .change
            .or_else(|| metadata.amount_paid.map(|paid| paid.saturating_sub(total)));

        doc.push(SaleRecord {
            timestamp: now.format("%H:%M:%S").to_string(),
            transaction_id,
            invoice_number: invoice_number.clone(),
            receipt_id: receipt.receipt_id.clone(),
            cashier: metadata.cashier.clone(),
            payment_method: metadata.payment_method,
            amount_paid: metadata.amount_paid,
            change,
            items: receipt.lines.iter().map(SaleItem::from).collect(),
            subtotal: receipt.totals.subtotal,
            tax: receipt.totals.tax,
            total,
        });

        let report_path = self.report_path(date);
        write_atomic(&report_path, &serde_json::to_vec_pretty(&doc)?)?;

        let csv_path = match self.write_csv(&doc) {
            Ok(path) => Some(path),
            Err(err) => {
                warn!(error = %err, %date, "CSV export failed; sale is recorded");
                None
            }
        };

        info!(
            %date,
            transaction_id,
            invoice = %invoice_number,
            total = total.minor(),
            "Sale recorded"
        );

        Ok(RecordedSale {
            invoice_number,
            transaction_id,
            report_path,
            csv_path,
        })
    }

    // =========================================================================
    // Queries
    // =========================================================================

    /// The full report for `date`.
    pub fn get_report(&self, date: NaiveDate) -> ReportResult<ReportDocument> {
        self.load(date)
    }

    /// Per-product units sold and revenue; empty when no report exists.
    pub fn stock_changes(&self, date: NaiveDate) -> ReportResult<BTreeMap<ProductId, StockChange>> {
        match self.load(date) {
            Ok(doc) => Ok(doc.stock_changes()),
            Err(ReportError::NotFound(_)) => Ok(BTreeMap::new()),
            Err(err) => Err(err),
        }
    }

    /// The printable text view of `date`.
    pub fn render_text(&self, date: NaiveDate) -> ReportResult<String> {
        let doc = self.load(date)?;
        Ok(TextReport::new(&doc, &self.currency_symbol).to_string())
    }

    /// Regenerates `sales_<date>.csv` and returns its path.
    pub fn export_csv(&self, date: NaiveDate) -> ReportResult<PathBuf> {
        let _guard = self.lock();
        let doc = self.load(date)?;
        self.write_csv(&doc)
    }

    /// Dates that have a report file, ascending.
    pub fn list_report_dates(&self) -> ReportResult<Vec<NaiveDate>> {
        let mut dates = Vec::new();

        for entry in fs::read_dir(&self.dir)? {
            let name = entry?.file_name();
            let Some(name) = name.to_str() else { continue };
            let Some(stem) = name
                .strip_prefix("sales_")
                .and_then(|rest| rest.strip_suffix(".json"))
            else {
                continue;
            };
            if let Ok(date) = NaiveDate::parse_from_str(stem, "%Y-%m-%d") {
                dates.push(date);
            }
        }

        dates.sort();
        Ok(dates)
    }

    // =========================================================================
    // File Helpers
    // =========================================================================

    fn load(&self, date: NaiveDate) -> ReportResult<ReportDocument> {
        let path = self.report_path(date);
        let bytes = match fs::read(&path) {
            Ok(bytes) => bytes,
            Err(err) if err.kind() == std::io::ErrorKind::NotFound => {
                return Err(ReportError::NotFound(date))
            }
            Err(err) => return Err(err.into()),
        };
        Ok(serde_json::from_slice(&bytes)?)
    }

    fn write_csv(&self, doc: &ReportDocument) -> ReportResult<PathBuf> {
        let path = self.csv_path(doc.date);
        let tmp = tmp_path(&path);
        export::write_csv_file(doc, &tmp)?;
        fs::rename(&tmp, &path)?;
        debug!(path = %path.display(), "CSV export written");
        Ok(path)
    }
}

/// `INV/<YYYYMMDD>/<seq padded to 3>`
pub fn invoice_number(date: NaiveDate, transaction_id: u32) -> String {
    format!("INV/{}/{:03}", date.format("%Y%m%d"), transaction_id)
}

fn tmp_path(path: &Path) -> PathBuf {
    let mut name = path.file_name().map(|n| n.to_os_string()).unwrap_or_default();
    name.push(".tmp");
    path.with_file_name(name)
}

/// Writes to a sibling temp file, then renames it over `path`.
fn write_atomic(path: &Path, bytes: &[u8]) -> ReportResult<()> {
    let tmp = tmp_path(path);
    fs::write(&tmp, bytes)?;
    fs::rename(&tmp, path)?;
    Ok(())
}

// =============================================================================
// Unit Tests
// =============================================================================
