//! # Catalog Store Port
//!
//! The boundary between the cart engine and whatever persists products and
//! the stock ledger. `tally-db` implements it on SQLite; engine tests use an
//! in-memory fake.
//!
//! ```text
//! CartEngine ──► CatalogStore ──► SQLite (tally-db)
//!                     │
//!                     └─────────► FakeCatalog (tests)
//! ```
//!
//! Every mutation appends exactly one ledger row per product touched, in the
//! same unit of work as the stock change it records.

use std::future::Future;
use std::sync::Arc;

use serde::{Deserialize, Serialize};
use ts_rs::TS;

use crate::error::{CoreError, CoreResult};
use crate::types::{Product, ProductId};

/// One line of a checkout: take `quantity` units of `product_id`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, TS)]
#[ts(export)]
pub struct StockDecrement {
    pub product_id: ProductId,
    pub quantity: i64,
}

impl StockDecrement {
    pub const fn new(product_id: ProductId, quantity: i64) -> Self {
        StockDecrement {
            product_id,
            quantity,
        }
    }
}

/// Read access to the catalog plus atomic stock mutation.
pub trait CatalogStore: Send + Sync {
    /// All products, ordered by id.
    fn list_products(&self) -> impl Future<Output = CoreResult<Vec<Product>>> + Send + '_;

    /// A single product, or `None` if the id is unknown.
    fn get_product(
        &self,
        id: ProductId,
    ) -> impl Future<Output = CoreResult<Option<Product>>> + Send + '_;

    /// Removes `quantity` units and records a `sale` ledger entry.
    ///
    /// ## Errors
    /// - `InvalidQuantity` if `quantity <= 0`
    /// - `ProductNotFound` if the id is unknown
    /// - `InsufficientStock` if `quantity` exceeds the current stock
    fn decrease_stock(
        &self,
        id: ProductId,
        quantity: i64,
    ) -> impl Future<Output = CoreResult<Product>> + Send + '_;

    /// Adds `quantity` units and records a `restock` ledger entry.
    fn increase_stock(
        &self,
        id: ProductId,
        quantity: i64,
    ) -> impl Future<Output = CoreResult<Product>> + Send + '_;

    /// Applies a whole checkout, in order.
    ///
    /// This default has no transaction to lean on: it stops at the first
    /// failing line and leaves the earlier lines decremented, reporting them
    /// in [`CoreError::PartialCheckout`]. Stores that can span products in a
    /// single transaction override it to be all-or-nothing.
    fn decrease_stock_many<'a>(
        &'a self,
        lines: &'a [StockDecrement],
    ) -> impl Future<Output = CoreResult<()>> + Send + 'a {
        async move {
            let mut applied = Vec::with_capacity(lines.len());

            for line in lines {
                if let Err(source) = self.decrease_stock(line.product_id, line.quantity).await {
                    if applied.is_empty() {
                        return Err(source);
                    }
                    return Err(CoreError::PartialCheckout {
                        failed: line.product_id,
                        applied,
                        source: Box::new(source),
                    });
                }
                applied.push(*line);
            }

            Ok(())
        }
    }
}

impl<T: CatalogStore> CatalogStore for Arc<T> {
    fn list_products(&self) -> impl Future<Output = CoreResult<Vec<Product>>> + Send + '_ {
        (**self).list_products()
    }

    fn get_product(
        &self,
        id: ProductId,
    ) -> impl Future<Output = CoreResult<Option<Product>>> + Send + '_ {
        (**self).get_product(id)
    }

    fn decrease_stock(
        &self,
        id: ProductId,
        quantity: i64,
    ) -> impl Future<Output = CoreResult<Product>> + Send + '_ {
        (**self).decrease_stock(id, quantity)
    }

    fn increase_stock(
        &self,
        id: ProductId,
        quantity: i64,
    ) -> impl Future<Output = CoreResult<Product>> + Send + '_ {
        (**self).increase_stock(id, quantity)
    }

    fn decrease_stock_many<'a>(
        &'a self,
        lines: &'a [StockDecrement],
    ) -> impl Future<Output = CoreResult<()>> + Send + 'a {
        (**self).decrease_stock_many(lines)
    }
}
