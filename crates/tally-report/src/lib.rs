//! # tally-report: Daily Report Aggregator
//!
//! Persists every completed sale into a per-day JSON report and derives the
//! CSV export, printable text and per-product stock changes from it.
//!
//! ## Architecture Position
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                                                                         │
//! │  CartEngine::checkout() ──► Receipt                                     │
//! │                                │                                        │
//! │                                ▼                                        │
//! │  ┌─────────────────────────────────────────────────────────────────┐   │
//! │  │                 tally-report (THIS CRATE)                       │   │
//! │  │                                                                 │   │
//! │  │   ReportAggregator ──► ReportDocument ──► sales_<date>.json     │   │
//! │  │          │                    │                                 │   │
//! │  │          │                    ├──► export::write_csv  (.csv)    │   │
//! │  │          │                    └──► TextReport         (print)   │   │
//! │  │          └──► stock_changes / list_report_dates                 │   │
//! │  └─────────────────────────────────────────────────────────────────┘   │
//! │                                                                         │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Usage
//!
//! ```rust,ignore
//! let reports = ReportAggregator::open("./reports", store_info)?;
//! let recorded = reports.record_sale(&receipt, &SaleMetadata::default())?;
//! println!("{}", reports.render_text(today)?);
//! ```

pub mod aggregator;
pub mod document;
pub mod error;
pub mod export;
pub mod text;

pub use aggregator::{invoice_number, RecordedSale, ReportAggregator, SaleMetadata};
pub use document::{
    ReportDocument, ReportSummary, SaleItem, SaleRecord, StockChange, StoreMetadata,
};
pub use error::{ReportError, ReportResult};
pub use export::CSV_HEADER;
pub use text::TextReport;
