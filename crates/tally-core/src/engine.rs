//! # Cart Engine
//!
//! Drives one cashier session: a catalog snapshot, a [`Cart`], and the
//! checkout hand-off to a [`CatalogStore`].
//!
//! ## Session Lifecycle
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                                                                         │
//! │   load(store) ──► list_products() ──► BTreeMap<ProductId, Snapshot>     │
//! │                                                                         │
//! │   scan / set_quantity / set_unit_price / apply_discount / remove        │
//! │        (synchronous, snapshot-only, no store traffic)                   │
//! │                                                                         │
//! │   checkout()                                                            │
//! │     ├── cart empty?            ──► EmptyCart (store untouched)          │
//! │     ├── decrease_stock_many()  ──► store re-checks live stock           │
//! │     │     └── failure          ──► error, cart untouched                │
//! │     └── success                ──► Receipt, cart cleared,               │
//! │                                    snapshot stock reduced               │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! Snapshots are never refreshed behind the operator's back. The store is
//! the authority at checkout; the snapshot only bounds what can be scanned.

use std::collections::BTreeMap;

use serde::Serialize;
use tracing::{debug, info, warn};

use crate::cart::{Cart, CartTotals, Pricing, Receipt};
use crate::catalog::{CatalogStore, StockDecrement};
use crate::error::{CoreError, CoreResult};
use crate::money::Money;
use crate::types::{ProductId, ProductSnapshot};

/// Result of a successful scan.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ScanOutcome {
    pub product: ProductSnapshot,
    /// Quantity of the line after the scan.
    pub quantity: i64,
}

/// One cashier session over a catalog store.
pub struct CartEngine<S> {
    store: S,
    catalog: BTreeMap<ProductId, ProductSnapshot>,
    cart: Cart,
    pricing: Pricing,
}

impl<S: CatalogStore> CartEngine<S> {
    /// Loads the catalog once and starts an empty cart.
    pub async fn load(store: S, pricing: Pricing) -> CoreResult<Self> {
        let catalog = fetch_snapshots(&store).await?;
        info!(products = catalog.len(), "Cart engine loaded catalog snapshot");

        Ok(CartEngine {
            store,
            catalog,
            cart: Cart::new(),
            pricing,
        })
    }

    /// Replaces the catalog snapshot with the store's current state.
    ///
    /// Lines already in the cart keep the snapshot they were scanned with.
    pub async fn reload_catalog(&mut self) -> CoreResult<()> {
        self.catalog = fetch_snapshots(&self.store).await?;
        debug!(products = self.catalog.len(), "Catalog snapshot reloaded");
        Ok(())
    }

    pub fn store(&self) -> &S {
        &self.store
    }

    pub fn pricing(&self) -> Pricing {
        self.pricing
    }

    pub fn cart(&self) -> &Cart {
        &self.cart
    }

    /// Snapshot products in id order.
    pub fn products(&self) -> impl Iterator<Item = &ProductSnapshot> {
        self.catalog.values()
    }

    /// Resolves a scanned identifier: product id first, then code.
    pub fn lookup(&self, identifier: &str) -> Option<&ProductSnapshot> {
        let identifier = identifier.trim();

        identifier
            .parse::<i64>()
            .ok()
            .and_then(|id| self.catalog.get(&ProductId::new(id)))
            .or_else(|| self.catalog.values().find(|p| p.has_code(identifier)))
    }

    // =========================================================================
    // Cart Editing
    // =========================================================================

    /// Adds one unit of the identified product.
    pub fn scan(&mut self, identifier: &str) -> CoreResult<ScanOutcome> {
        let product = self
            .lookup(identifier)
            .cloned()
            .ok_or_else(|| CoreError::ProductNotFound(identifier.trim().to_string()))?;

        let quantity = self.cart.add_one(&product)?;
        debug!(product_id = %product.id, quantity, "Scanned product");

        Ok(ScanOutcome { product, quantity })
    }

    pub fn set_quantity(&mut self, product_id: ProductId, quantity: i64) -> CoreResult<()> {
        self.cart.set_quantity(product_id, quantity)?;
        debug!(%product_id, quantity, "Line quantity set");
        Ok(())
    }

    pub fn set_unit_price(&mut self, product_id: ProductId, price: Money) -> CoreResult<()> {
        self.cart.set_unit_price(product_id, price)?;
        debug!(%product_id, price = price.minor(), "Line price overridden");
        Ok(())
    }

    pub fn apply_discount(&mut self, product_id: ProductId, percent: u8) -> CoreResult<()> {
        self.cart.apply_discount(product_id, percent)?;
        debug!(%product_id, percent, "Line discount applied");
        Ok(())
    }

    /// Drops a line. Removing an absent line is a no-op.
    pub fn remove(&mut self, product_id: ProductId) -> bool {
        self.cart.remove(product_id)
    }

    pub fn clear(&mut self) {
        self.cart.clear();
    }

    pub fn totals(&self) -> CartTotals {
        self.cart.totals(&self.pricing)
    }

    // =========================================================================
    // Checkout
    // =========================================================================

    /// Commits the cart against the store and returns the receipt.
    ///
    /// ## Errors
    /// - `EmptyCart` without touching the store
    /// - Whatever the store reports for the first failing line. The cart is
    ///   left exactly as it was so the operator can fix it and retry.
    pub async fn checkout(&mut self) -> CoreResult<Receipt> {
        if self.cart.is_empty() {
            return Err(CoreError::EmptyCart);
        }

        let lines: Vec<StockDecrement> = self
            .cart
            .lines()
            .iter()
            .map(|line| StockDecrement::new(line.product_id(), line.quantity))
            .collect();

        if let Err(err) = self.store.decrease_stock_many(&lines).await {
            warn!(error = %err, lines = lines.len(), "Checkout rejected by store");
            return Err(err);
        }

        let receipt = Receipt::from_cart(&self.cart, self.pricing);

        for line in &lines {
            if let Some(snapshot) = self.catalog.get_mut(&line.product_id) {
                snapshot.stock -= line.quantity;
            }
        }
        self.cart.clear();

        info!(
            receipt_id = %receipt.receipt_id,
            total = receipt.totals.total.minor(),
            units = receipt.totals.unit_count,
            "Checkout complete"
        );

        Ok(receipt)
    }
}

async fn fetch_snapshots<S: CatalogStore>(
    store: &S,
) -> CoreResult<BTreeMap<ProductId, ProductSnapshot>> {
    let products = store.list_products().await?;
    Ok(products.iter().map(|p| (p.id, p.snapshot())).collect())
}

// =============================================================================
// Unit Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::ErrorKind;
    use crate::types::{Product, StockAction, TaxRate};
    use chrono::Utc;
    use std::future::Future;
    use std::sync::{Arc, Mutex};

    /// In-memory store without transactions, so checkout uses the
    /// trait's line-by-line default.
    #[derive(Default)]
    struct FakeCatalog {
        products: Mutex<BTreeMap<ProductId, Product>>,
        ledger: Mutex<Vec<(ProductId, StockAction, i64)>>,
        decrement_calls: Mutex<usize>,
    }

    impl FakeCatalog {
        fn with(products: &[(i64, &str, i64, i64)]) -> Arc<Self> {
            let fake = FakeCatalog::default();
            {
                let mut map = fake.products.lock().unwrap();
                for &(id, code, price, stock) in products {
                    map.insert(
                        ProductId::new(id),
                        Product {
                            id: ProductId::new(id),
                            code: Some(code.to_string()),
                            name: format!("Item {}", id),
                            color: None,
                            size: None,
                            price: Money::from_minor(price),
                            discount_percent: 0,
                            stock,
                            created_at: Utc::now(),
                            updated_at: Utc::now(),
                        },
                    );
                }
            }
            Arc::new(fake)
        }

        fn stock(&self, id: i64) -> i64 {
            self.products.lock().unwrap()[&ProductId::new(id)].stock
        }

        fn set_stock(&self, id: i64, stock: i64) {
            self.products
                .lock()
                .unwrap()
                .get_mut(&ProductId::new(id))
                .unwrap()
                .stock = stock;
        }

        fn ledger(&self) -> Vec<(ProductId, StockAction, i64)> {
            self.ledger.lock().unwrap().clone()
        }

        fn calls(&self) -> usize {
            *self.decrement_calls.lock().unwrap()
        }

        fn apply(&self, id: ProductId, quantity: i64, action: StockAction) -> CoreResult<Product> {
            if quantity <= 0 {
                return Err(CoreError::InvalidQuantity { quantity });
            }
            let mut products = self.products.lock().unwrap();
            let product = products
                .get_mut(&id)
                .ok_or_else(|| CoreError::ProductNotFound(id.to_string()))?;

            let delta = action.signed(quantity);
            if product.stock + delta < 0 {
                return Err(CoreError::InsufficientStock {
                    product: product.name.clone(),
                    available: product.stock,
                    requested: quantity,
                });
            }
            product.stock += delta;
            self.ledger.lock().unwrap().push((id, action, delta));
            Ok(product.clone())
        }
    }

    impl CatalogStore for FakeCatalog {
        fn list_products(&self) -> impl Future<Output = CoreResult<Vec<Product>>> + Send + '_ {
            async move { Ok(self.products.lock().unwrap().values().cloned().collect()) }
        }

        fn get_product(
            &self,
            id: ProductId,
        ) -> impl Future<Output = CoreResult<Option<Product>>> + Send + '_ {
            async move { Ok(self.products.lock().unwrap().get(&id).cloned()) }
        }

        fn decrease_stock(
            &self,
            id: ProductId,
            quantity: i64,
        ) -> impl Future<Output = CoreResult<Product>> + Send + '_ {
            async move {
                *self.decrement_calls.lock().unwrap() += 1;
                self.apply(id, quantity, StockAction::Sale)
            }
        }

        fn increase_stock(
            &self,
            id: ProductId,
            quantity: i64,
        ) -> impl Future<Output = CoreResult<Product>> + Send + '_ {
            async move { self.apply(id, quantity, StockAction::Restock) }
        }
    }

    fn pricing() -> Pricing {
        Pricing::exclusive(TaxRate::from_bps(1200))
    }

    async fn engine(store: &Arc<FakeCatalog>) -> CartEngine<Arc<FakeCatalog>> {
        CartEngine::load(Arc::clone(store), pricing()).await.unwrap()
    }

    #[tokio::test]
    async fn test_scan_by_id_then_code() {
        let store = FakeCatalog::with(&[(1, "KP-BLK-M", 10_000, 5), (2, "TOPI-01", 2_500, 3)]);
        let mut engine = engine(&store).await;

        let outcome = engine.scan("1").unwrap();
        assert_eq!(outcome.product.id, ProductId::new(1));
        assert_eq!(outcome.quantity, 1);

        let outcome = engine.scan("kp-blk-m").unwrap();
        assert_eq!(outcome.quantity, 2);

        let outcome = engine.scan("TOPI-01").unwrap();
        assert_eq!(outcome.product.id, ProductId::new(2));
        assert_eq!(engine.cart().lines().len(), 2);
    }

    #[tokio::test]
    async fn test_scan_unknown_leaves_cart_unchanged() {
        let store = FakeCatalog::with(&[(1, "A", 100, 5)]);
        let mut engine = engine(&store).await;
        engine.scan("1").unwrap();
        let before = engine.cart().clone();

        let err = engine.scan("999").unwrap_err();
        assert_eq!(err.kind(), ErrorKind::NotFound);
        assert_eq!(engine.cart(), &before);
        assert!(store.ledger().is_empty());
    }

    #[tokio::test]
    async fn test_repeated_scan_bounded_by_snapshot() {
        let store = FakeCatalog::with(&[(1, "A", 100, 3)]);
        let mut engine = engine(&store).await;

        for _ in 0..3 {
            engine.scan("1").unwrap();
        }
        let before = engine.cart().clone();
        let err = engine.scan("1").unwrap_err();
        assert_eq!(err.kind(), ErrorKind::InsufficientStock);
        assert_eq!(engine.cart(), &before);
    }

    #[tokio::test]
    async fn test_snapshot_is_not_live() {
        let store = FakeCatalog::with(&[(1, "A", 100, 0)]);
        let mut engine = engine(&store).await;
        store.set_stock(1, 10);

        let err = engine.scan("1").unwrap_err();
        assert_eq!(err.kind(), ErrorKind::OutOfStock);

        engine.reload_catalog().await.unwrap();
        assert_eq!(engine.scan("1").unwrap().quantity, 1);
    }

    #[tokio::test]
    async fn test_empty_checkout_does_not_touch_store() {
        let store = FakeCatalog::with(&[(1, "A", 100, 3)]);
        let mut engine = engine(&store).await;

        let err = engine.checkout().await.unwrap_err();
        assert_eq!(err.kind(), ErrorKind::EmptyCart);
        assert_eq!(store.calls(), 0);
    }

    #[tokio::test]
    async fn test_checkout_scenario() {
        let store = FakeCatalog::with(&[(1, "A", 10_000, 5)]);
        let mut engine = engine(&store).await;
        for _ in 0..3 {
            engine.scan("1").unwrap();
        }

        let totals = engine.totals();
        assert_eq!(totals.subtotal.minor(), 30_000);
        assert_eq!(totals.tax.minor(), 3_600);
        assert_eq!(totals.total.minor(), 33_600);

        let receipt = engine.checkout().await.unwrap();
        assert_eq!(receipt.totals.total.minor(), 33_600);
        assert_eq!(receipt.lines.len(), 1);
        assert_eq!(store.stock(1), 2);
        assert_eq!(
            store.ledger(),
            vec![(ProductId::new(1), StockAction::Sale, -3)]
        );
        assert!(engine.cart().is_empty());

        // Session snapshot follows the sale.
        engine.scan("1").unwrap();
        engine.scan("1").unwrap();
        assert_eq!(
            engine.scan("1").unwrap_err().kind(),
            ErrorKind::InsufficientStock
        );
    }

    #[tokio::test]
    async fn test_checkout_revalidates_live_stock() {
        let store = FakeCatalog::with(&[(1, "A", 100, 5)]);
        let mut engine = engine(&store).await;
        engine.scan("1").unwrap();
        engine.set_quantity(ProductId::new(1), 4).unwrap();
        store.set_stock(1, 2);

        let err = engine.checkout().await.unwrap_err();
        assert_eq!(err.kind(), ErrorKind::InsufficientStock);
        assert_eq!(engine.cart().line(ProductId::new(1)).unwrap().quantity, 4);
        assert_eq!(store.stock(1), 2);
    }

    #[tokio::test]
    async fn test_default_checkout_reports_partial_progress() {
        let store = FakeCatalog::with(&[(1, "A", 100, 5), (2, "B", 100, 5)]);
        let mut engine = engine(&store).await;
        engine.scan("1").unwrap();
        engine.scan("2").unwrap();
        engine.set_quantity(ProductId::new(2), 3).unwrap();
        store.set_stock(2, 1);

        let err = engine.checkout().await.unwrap_err();
        match &err {
            CoreError::PartialCheckout {
                failed, applied, ..
            } => {
                assert_eq!(*failed, ProductId::new(2));
                assert_eq!(applied, &vec![StockDecrement::new(ProductId::new(1), 1)]);
            }
            other => panic!("expected partial checkout, got {:?}", other),
        }
        assert_eq!(err.kind(), ErrorKind::InsufficientStock);
        assert_eq!(store.stock(1), 4);
        assert_eq!(engine.cart().lines().len(), 2);
    }

    #[tokio::test]
    async fn test_line_edits_are_validated() {
        let store = FakeCatalog::with(&[(1, "A", 100, 5)]);
        let mut engine = engine(&store).await;
        let id = ProductId::new(1);

        assert_eq!(
            engine.set_quantity(id, 2).unwrap_err().kind(),
            ErrorKind::NotInCart
        );
        engine.scan("A").unwrap();
        assert_eq!(
            engine.apply_discount(id, 101).unwrap_err().kind(),
            ErrorKind::InvalidDiscount
        );
        assert_eq!(
            engine
                .set_unit_price(id, Money::from_minor(-5))
                .unwrap_err()
                .kind(),
            ErrorKind::InvalidPrice
        );

        engine.set_unit_price(id, Money::from_minor(80)).unwrap();
        engine.apply_discount(id, 50).unwrap();
        assert_eq!(engine.totals().subtotal.minor(), 40);

        assert!(engine.remove(id));
        assert!(!engine.remove(id));
        engine.clear();
        assert!(engine.cart().is_empty());
    }
}
