//! # Report Document
//!
//! The persisted shape of one business day.
//!
//! ```text
//! ReportDocument
//! ├── date            "2024-05-01"
//! ├── store           captured when the day's file is created
//! ├── sales[]         append-only SaleRecords, transaction_id = 1, 2, 3, ...
//! │   └── items[]     denormalized lines (no catalog lookups needed later)
//! └── summary         running totals, always == recomputed_summary()
//! ```
//!
//! Money fields serialize as integer minor units. `store.tax_rate` is a
//! fraction (`0.12`).

use std::collections::BTreeMap;

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use tally_core::{Money, PaymentMethod, ProductId, ReceiptLine, StoreInfo};

/// Store details stamped onto a report when the day's file is created.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StoreMetadata {
    pub name: String,
    pub address: String,
    pub contact: String,
    /// Fraction, e.g. `0.12`.
    pub tax_rate: f64,
    pub tax_inclusive: bool,
}

impl From<&StoreInfo> for StoreMetadata {
    fn from(store: &StoreInfo) -> Self {
        StoreMetadata {
            name: store.name.clone(),
            address: store.address.clone(),
            contact: store.contact.clone(),
            tax_rate: store.tax_rate.fraction(),
            tax_inclusive: store.tax_mode.is_inclusive(),
        }
    }
}

/// One sold line, copied out of the receipt.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SaleItem {
    pub product_id: ProductId,
    pub product_name: String,
    pub code: Option<String>,
    pub color: Option<String>,
    pub size: Option<String>,
    pub quantity: i64,
    pub unit_price: Money,
    #[serde(default)]
    pub discount_percent: u8,
    pub line_total: Money,
}

impl From<&ReceiptLine> for SaleItem {
    fn from(line: &ReceiptLine) -> Self {
        SaleItem {
            product_id: line.product_id,
            product_name: line.name.clone(),
            code: line.code.clone(),
            color: line.color.clone(),
            size: line.size.clone(),
            quantity: line.quantity,
            unit_price: line.unit_price,
            discount_percent: line.discount_percent,
            line_total: line.line_total,
        }
    }
}

/// One completed transaction. Never modified after it is appended.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SaleRecord {
    /// Local time of day, `HH:MM:SS`.
    pub timestamp: String,
    /// 1-based position within the day.
    pub transaction_id: u32,
    pub invoice_number: String,
    pub receipt_id: String,
    pub cashier: Option<String>,
    pub payment_method: Option<PaymentMethod>,
    pub amount_paid: Option<Money>,
    pub change: Option<Money>,
    pub items: Vec<SaleItem>,
    pub subtotal: Money,
    pub tax: Money,
    pub total: Money,
}

impl SaleRecord {
    pub fn units(&self) -> i64 {
        self.items.iter().map(|i| i.quantity).sum()
    }
}

/// Running totals for the day.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct ReportSummary {
    /// Σ subtotal
    pub total_sales: Money,
    pub total_tax: Money,
    /// Σ total
    pub total_revenue: Money,
    pub total_units_sold: i64,
    pub transaction_count: u32,
}

impl ReportSummary {
    /// Folds one more sale into the totals.
    pub fn add(&mut self, sale: &SaleRecord) {
        self.total_sales += sale.subtotal;
        self.total_tax += sale.tax;
        self.total_revenue += sale.total;
        self.total_units_sold += sale.units();
        self.transaction_count += 1;
    }
}

/// Units sold and revenue for one product on one day.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StockChange {
    pub product_name: String,
    pub quantity_sold: i64,
    pub revenue: Money,
}

/// A full day's report.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ReportDocument {
    pub date: NaiveDate,
    pub store: StoreMetadata,
    pub sales: Vec<SaleRecord>,
    pub summary: ReportSummary,
}

impl ReportDocument {
    /// An empty shell for a day with no sales yet.
    pub fn new(date: NaiveDate, store: StoreMetadata) -> Self {
        ReportDocument {
            date,
            store,
            sales: Vec::new(),
            summary: ReportSummary::default(),
        }
    }

    pub fn next_transaction_id(&self) -> u32 {
        self.sales.len() as u32 + 1
    }

    /// Appends a sale and updates the summary in O(1).
    pub fn push(&mut self, sale: SaleRecord) {
        self.summary.add(&sale);
        self.sales.push(sale);
    }

    /// Summary rebuilt from scratch; equals `summary` for any intact file.
    pub fn recomputed_summary(&self) -> ReportSummary {
        let mut summary = ReportSummary::default();
        for sale in &self.sales {
            summary.add(sale);
        }
        summary
    }

    /// Per-product units sold and revenue, from the line items.
    pub fn stock_changes(&self) -> BTreeMap<ProductId, StockChange> {
        let mut changes: BTreeMap<ProductId, StockChange> = BTreeMap::new();

        for item in self.sales.iter().flat_map(|s| &s.items) {
            let entry = changes.entry(item.product_id).or_insert_with(|| StockChange {
                product_name: item.product_name.clone(),
                quantity_sold: 0,
                revenue: Money::zero(),
            });
            entry.quantity_sold += item.quantity;
            entry.revenue += item.line_total;
        }

        changes
    }
}
