//! # CatalogStore for SQLite
//!
//! Plugs [`Database`] into the cart engine. Checkout goes through
//! [`ProductRepository::decrease_stock_many`], so a mid-cart failure rolls
//! back every line instead of falling back to the port's line-by-line
//! default.
//!
//! [`ProductRepository::decrease_stock_many`]: crate::ProductRepository::decrease_stock_many

use std::future::Future;

use tally_core::{CatalogStore, CoreError, CoreResult, Product, ProductId, StockDecrement};

use crate::pool::Database;

impl CatalogStore for Database {
    fn list_products(&self) -> impl Future<Output = CoreResult<Vec<Product>>> + Send + '_ {
        async move { self.products().list().await.map_err(CoreError::from) }
    }

    fn get_product(
        &self,
        id: ProductId,
    ) -> impl Future<Output = CoreResult<Option<Product>>> + Send + '_ {
        async move { self.products().get_by_id(id).await.map_err(CoreError::from) }
    }

    fn decrease_stock(
        &self,
        id: ProductId,
        quantity: i64,
    ) -> impl Future<Output = CoreResult<Product>> + Send + '_ {
        async move {
            self.products()
                .decrease_stock(id, quantity)
                .await
                .map_err(CoreError::from)
        }
    }

    fn increase_stock(
        &self,
        id: ProductId,
        quantity: i64,
    ) -> impl Future<Output = CoreResult<Product>> + Send + '_ {
        async move {
            self.products()
                .increase_stock(id, quantity)
                .await
                .map_err(CoreError::from)
        }
    }

    fn decrease_stock_many<'a>(
        &'a self,
        lines: &'a [StockDecrement],
    ) -> impl Future<Output = CoreResult<()>> + Send + 'a {
        async move {
            self.products()
                .decrease_stock_many(lines)
                .await
                .map_err(CoreError::from)
        }
    }
}

// =============================================================================
// Unit Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use crate::{Database, DbConfig};
    use tally_core::{
        CartEngine, CoreError, ErrorKind, Money, NewProduct, Pricing, ProductId, StockAction,
        TaxRate,
    };

    async fn seeded() -> Database {
        let db = Database::new(DbConfig::in_memory()).await.unwrap();
        for (code, price, stock) in [("KP-BLK-M", 10_000, 5), ("TOPI-01", 2_500, 1)] {
            db.products()
                .insert(&NewProduct {
                    code: Some(code.to_string()),
                    name: code.to_string(),
                    price: Money::from_minor(price),
                    stock,
                    ..NewProduct::default()
                })
                .await
                .unwrap();
        }
        db
    }

    fn pricing() -> Pricing {
        Pricing::exclusive(TaxRate::from_bps(1200))
    }

    #[tokio::test]
    async fn test_checkout_scenario_against_sqlite() {
        let db = seeded().await;
        let mut engine = CartEngine::load(db.clone(), pricing()).await.unwrap();

        for _ in 0..3 {
            engine.scan("1").unwrap();
        }
        let receipt = engine.checkout().await.unwrap();
        assert_eq!(receipt.totals.subtotal.minor(), 30_000);
        assert_eq!(receipt.totals.tax.minor(), 3_600);
        assert_eq!(receipt.totals.total.minor(), 33_600);

        let product = db.products().get_by_id(ProductId::new(1)).await.unwrap().unwrap();
        assert_eq!(product.stock, 2);

        let sales: Vec<_> = db
            .ledger()
            .entries(Some(ProductId::new(1)))
            .await
            .unwrap()
            .into_iter()
            .filter(|e| e.action == StockAction::Sale)
            .collect();
        assert_eq!(sales.len(), 1);
        assert_eq!(sales[0].quantity, -3);
        assert!(engine.cart().is_empty());
    }

    #[tokio::test]
    async fn test_mid_cart_failure_rolls_back_everything() {
        let db = seeded().await;
        let mut engine = CartEngine::load(db.clone(), pricing()).await.unwrap();
        engine.scan("KP-BLK-M").unwrap();
        engine.scan("TOPI-01").unwrap();

        // Someone else sells the last hat after our snapshot was taken
        db.products()
            .decrease_stock(ProductId::new(2), 1)
            .await
            .unwrap();

        let err = engine.checkout().await.unwrap_err();
        assert!(matches!(err, CoreError::InsufficientStock { .. }));
        assert_eq!(err.kind(), ErrorKind::InsufficientStock);

        let shirt = db.products().get_by_id(ProductId::new(1)).await.unwrap().unwrap();
        assert_eq!(shirt.stock, 5);
        assert_eq!(engine.cart().lines().len(), 2);
        assert!(db.ledger().reconcile().await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_unknown_product_through_port() {
        use tally_core::CatalogStore;

        let db = seeded().await;
        let err = db.decrease_stock(ProductId::new(42), 1).await.unwrap_err();
        assert_eq!(err.kind(), ErrorKind::NotFound);
        assert!(db.get_product(ProductId::new(42)).await.unwrap().is_none());
    }
}
