//! # Register
//!
//! One till: a cart engine plus the report aggregator that receives every
//! completed sale.
//!
//! ## Sale Completion
//! ```text
//! complete_sale(metadata)
//!      │
//!      ├── engine.checkout()        stock committed, cart cleared
//!      │        │ Err ──► returned, nothing recorded
//!      │        ▼
//!      └── reports.record_sale()    sales_<date>.json / .csv, on the
//!               │                   blocking pool
//!               │ Err ──► logged; the sale still stands
//!               ▼
//!         SaleOutcome { receipt, report }
//! ```

use std::sync::Arc;

use chrono::{Local, NaiveDateTime};
use tally_core::{CartEngine, CatalogStore, Receipt};
use tally_report::{RecordedSale, ReportAggregator, ReportError, SaleMetadata};
use tracing::{info, warn};

use crate::error::AppResult;

/// Result of a completed sale.
///
/// Stock is already committed when this exists. `report` only tells whether
/// the daily report caught up.
#[derive(Debug)]
pub struct SaleOutcome {
    pub receipt: Receipt,
    pub metadata: SaleMetadata,
    pub report: Result<RecordedSale, ReportError>,
}

impl SaleOutcome {
    pub fn recorded(&self) -> Option<&RecordedSale> {
        self.report.as_ref().ok()
    }

    /// Operator-facing warning when the report write failed.
    pub fn warning(&self) -> Option<String> {
        self.report
            .as_ref()
            .err()
            .map(|err| format!("Sale completed but the daily report was not updated: {err}"))
    }
}

/// A cashier session wired to a reports directory.
pub struct Register<S> {
    engine: CartEngine<S>,
    reports: Arc<ReportAggregator>,
    default_cashier: Option<String>,
}

impl<S: CatalogStore> Register<S> {
    pub fn new(engine: CartEngine<S>, reports: ReportAggregator) -> Self {
        Register {
            engine,
            reports: Arc::new(reports),
            default_cashier: None,
        }
    }

    /// Cashier stamped on sales whose metadata leaves it empty.
    pub fn with_cashier(mut self, cashier: Option<String>) -> Self {
        self.default_cashier = cashier;
        self
    }

    pub fn engine(&self) -> &CartEngine<S> {
        &self.engine
    }

    pub fn engine_mut(&mut self) -> &mut CartEngine<S> {
        &mut self.engine
    }

    pub fn reports(&self) -> &ReportAggregator {
        &self.reports
    }

    /// Checks out the cart and records the sale in today's report.
    pub async fn complete_sale(&mut self, metadata: SaleMetadata) -> AppResult<SaleOutcome> {
        self.complete_sale_at(metadata, Local::now().naive_local())
            .await
    }

    /// Same as [`complete_sale`](Self::complete_sale) with an explicit local time.
    pub async fn complete_sale_at(
        &mut self,
        mut metadata: SaleMetadata,
        now: NaiveDateTime,
    ) -> AppResult<SaleOutcome> {
        let receipt = self.engine.checkout().await?;

        if metadata.cashier.is_none() {
            metadata.cashier = self.default_cashier.clone();
        }

        let report = self.record(&receipt, &metadata, now).await;
        match &report {
            Ok(recorded) => info!(
                invoice = %recorded.invoice_number,
                receipt_id = %receipt.receipt_id,
                "Sale recorded"
            ),
            Err(err) => warn!(
                receipt_id = %receipt.receipt_id,
                error = %err,
                "Sale completed but report write failed"
            ),
        }

        Ok(SaleOutcome {
            receipt,
            metadata,
            report,
        })
    }

    /// Runs the synchronous file write without stalling the async runtime.
    async fn record(
        &self,
        receipt: &Receipt,
        metadata: &SaleMetadata,
        now: NaiveDateTime,
    ) -> Result<RecordedSale, ReportError> {
        let reports = Arc::clone(&self.reports);
        let receipt = receipt.clone();
        let metadata = metadata.clone();

        tokio::task::spawn_blocking(move || reports.record_sale_at(&receipt, &metadata, now))
            .await
            .unwrap_or_else(|err| Err(ReportError::Io(std::io::Error::other(err))))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::NaiveDate;
    use tally_core::{
        CoreError, Money, NewProduct, PaymentMethod, Pricing, ProductId, StoreInfo, TaxMode,
        TaxRate,
    };
    use tally_db::{Database, DbConfig};

    fn store_info() -> StoreInfo {
        StoreInfo {
            name: "Toko Baju".into(),
            address: "Jl. Merdeka 1".into(),
            contact: "0812-000".into(),
            tax_rate: TaxRate::from_bps(1200),
            tax_mode: TaxMode::Exclusive,
        }
    }

    fn noon() -> NaiveDateTime {
        NaiveDate::from_ymd_opt(2024, 5, 1)
            .unwrap()
            .and_hms_opt(12, 0, 0)
            .unwrap()
    }

    async fn register(dir: &std::path::Path) -> (Database, Register<Database>) {
        let db = Database::new(DbConfig::in_memory()).await.unwrap();
        db.products()
            .insert(&NewProduct {
                code: Some("KP-BLK-M".into()),
                name: "Kaos Polos".into(),
                price: Money::from_minor(10_000),
                stock: 5,
                ..NewProduct::default()
            })
            .await
            .unwrap();

        let engine = CartEngine::load(db.clone(), Pricing::exclusive(TaxRate::from_bps(1200)))
            .await
            .unwrap();
        let reports = ReportAggregator::open(dir, store_info()).unwrap();
        (db, Register::new(engine, reports).with_cashier(Some("Sari".into())))
    }

    #[tokio::test]
    async fn test_sale_lands_in_report() {
        let tmp = tempfile::tempdir().unwrap();
        let (db, mut register) = register(tmp.path()).await;

        for _ in 0..3 {
            register.engine_mut().scan("KP-BLK-M").unwrap();
        }
        let outcome = register
            .complete_sale_at(
                SaleMetadata {
                    payment_method: Some(PaymentMethod::Cash),
                    amount_paid: Some(Money::from_minor(40_000)),
                    ..SaleMetadata::default()
                },
                noon(),
            )
            .await
            .unwrap();

        assert_eq!(outcome.receipt.totals.total.minor(), 33_600);
        assert_eq!(outcome.metadata.cashier.as_deref(), Some("Sari"));
        assert!(outcome.warning().is_none());
        let recorded = outcome.recorded().unwrap();
        assert_eq!(recorded.invoice_number, "INV/20240501/001");

        let doc = register.reports().get_report(noon().date()).unwrap();
        assert_eq!(doc.summary.transaction_count, 1);
        assert_eq!(doc.summary.total_revenue.minor(), 33_600);
        assert_eq!(doc.sales[0].change, Some(Money::from_minor(6_400)));

        let product = db.products().get_by_id(ProductId::new(1)).await.unwrap().unwrap();
        assert_eq!(product.stock, 2);
    }

    #[tokio::test]
    async fn test_two_sales_same_day() {
        let tmp = tempfile::tempdir().unwrap();
        let (_db, mut register) = register(tmp.path()).await;

        register.engine_mut().scan("KP-BLK-M").unwrap();
        let first = register
            .complete_sale_at(SaleMetadata::default(), noon())
            .await
            .unwrap();

        register.engine_mut().scan("1").unwrap();
        register.engine_mut().scan("1").unwrap();
        let second = register
            .complete_sale_at(SaleMetadata::default(), noon())
            .await
            .unwrap();

        assert_eq!(second.recorded().unwrap().transaction_id, 2);
        assert_eq!(second.recorded().unwrap().invoice_number, "INV/20240501/002");

        let doc = register.reports().get_report(noon().date()).unwrap();
        assert_eq!(doc.summary.transaction_count, 2);
        assert_eq!(doc.summary.total_units_sold, 3);
        assert_eq!(
            doc.summary.total_revenue,
            first.receipt.totals.total + second.receipt.totals.total
        );
        assert_eq!(doc.summary, doc.recomputed_summary());
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 2)]
    async fn test_sale_on_multi_thread_runtime() {
        let tmp = tempfile::tempdir().unwrap();
        let (_db, mut register) = register(tmp.path()).await;

        register.engine_mut().scan("KP-BLK-M").unwrap();
        let outcome = register
            .complete_sale_at(SaleMetadata::default(), noon())
            .await
            .unwrap();

        let recorded = outcome.recorded().unwrap();
        assert!(recorded.report_path.exists());
        let doc = register.reports().get_report(noon().date()).unwrap();
        assert_eq!(doc.sales[0].receipt_id, outcome.receipt.receipt_id);
    }

    #[tokio::test]
    async fn test_rejected_checkout_records_nothing() {
        let tmp = tempfile::tempdir().unwrap();
        let (_db, mut register) = register(tmp.path()).await;

        let err = register
            .complete_sale_at(SaleMetadata::default(), noon())
            .await
            .unwrap_err();
        assert!(matches!(err, crate::error::AppError::Core(CoreError::EmptyCart)));
        assert!(register.reports().list_report_dates().unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_report_failure_keeps_sale() {
        let tmp = tempfile::tempdir().unwrap();
        let reports_dir = tmp.path().join("reports");
        let (db, mut register) = register(&reports_dir).await;
        std::fs::remove_dir_all(&reports_dir).unwrap();

        register.engine_mut().scan("KP-BLK-M").unwrap();
        let outcome = register
            .complete_sale_at(SaleMetadata::default(), noon())
            .await
            .unwrap();

        assert!(outcome.recorded().is_none());
        assert!(outcome.warning().is_some());
        assert!(register.engine().cart().is_empty());

        let product = db.products().get_by_id(ProductId::new(1)).await.unwrap().unwrap();
        assert_eq!(product.stock, 4);
    }
}
