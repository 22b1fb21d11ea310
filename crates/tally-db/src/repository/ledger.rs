//! # Stock Ledger Repository
//!
//! The append-only `stock_log` table. Rows are only ever written by
//! [`append`], inside the same transaction as the stock change they record.
//!
//! ```text
//! products.stock  ==  Σ stock_log.quantity   (per product)
//!
//! reconcile() lists every product where that does not hold.
//! ```

use chrono::{DateTime, Utc};
use serde::Serialize;
use sqlx::{FromRow, SqliteConnection, SqlitePool};
use tracing::{debug, warn};

use crate::error::DbResult;
use tally_core::{LedgerEntry, ProductId, StockAction};

#[derive(Debug, FromRow)]
struct LedgerRow {
    id: i64,
    product_id: ProductId,
    action: StockAction,
    quantity: i64,
    created_at: DateTime<Utc>,
}

impl From<LedgerRow> for LedgerEntry {
    fn from(row: LedgerRow) -> Self {
        LedgerEntry {
            id: row.id,
            product_id: row.product_id,
            action: row.action,
            quantity: row.quantity,
            created_at: row.created_at,
        }
    }
}

/// A product whose cached stock disagrees with its ledger.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, FromRow)]
pub struct StockDrift {
    pub product_id: ProductId,
    pub name: String,
    pub stock: i64,
    pub ledger_total: i64,
}

/// Appends one ledger row. `quantity` is the positive amount moved; the
/// stored value carries the action's sign.
pub(crate) async fn append(
    conn: &mut SqliteConnection,
    product_id: ProductId,
    action: StockAction,
    quantity: i64,
    now: DateTime<Utc>,
) -> DbResult<()> {
    sqlx::query(
        "INSERT INTO stock_log (product_id, action, quantity, created_at) \
         VALUES (?1, ?2, ?3, ?4)",
    )
    .bind(product_id)
    .bind(action)
    .bind(action.signed(quantity))
    .bind(now)
    .execute(&mut *conn)
    .await?;

    debug!(%product_id, %action, quantity, "Ledger entry appended");
    Ok(())
}

/// Read access to the stock ledger.
#[derive(Debug, Clone)]
pub struct LedgerRepository {
    pool: SqlitePool,
}

impl LedgerRepository {
    pub fn new(pool: SqlitePool) -> Self {
        LedgerRepository { pool }
    }

    /// Ledger rows in write order, optionally for one product.
    pub async fn entries(&self, product: Option<ProductId>) -> DbResult<Vec<LedgerEntry>> {
        let rows = sqlx::query_as::<_, LedgerRow>(
            "SELECT id, product_id, action, quantity, created_at FROM stock_log \
             WHERE ?1 IS NULL OR product_id = ?1 \
             ORDER BY id",
        )
        .bind(product)
        .fetch_all(&self.pool)
        .await?;

        Ok(rows.into_iter().map(LedgerEntry::from).collect())
    }

    /// Σ signed quantities for one product.
    pub async fn balance(&self, product: ProductId) -> DbResult<i64> {
        let total: i64 =
            sqlx::query_scalar("SELECT COALESCE(SUM(quantity), 0) FROM stock_log WHERE product_id = ?1")
                .bind(product)
                .fetch_one(&self.pool)
                .await?;

        Ok(total)
    }

    /// Products whose stock differs from their ledger sum.
    pub async fn reconcile(&self) -> DbResult<Vec<StockDrift>> {
        let drift = sqlx::query_as::<_, StockDrift>(
            "SELECT p.id AS product_id, p.name, p.stock, \
                    COALESCE(SUM(l.quantity), 0) AS ledger_total \
             FROM products p \
             LEFT JOIN stock_log l ON l.product_id = p.id \
             GROUP BY p.id, p.name, p.stock \
             HAVING p.stock <> COALESCE(SUM(l.quantity), 0) \
             ORDER BY p.id",
        )
        .fetch_all(&self.pool)
        .await?;

        for row in &drift {
            warn!(
                product_id = %row.product_id,
                stock = row.stock,
                ledger_total = row.ledger_total,
                "Stock does not match ledger"
            );
        }

        Ok(drift)
    }
}

#[cfg(test)]
mod tests {
    use crate::{Database, DbConfig};
    use tally_core::{Money, NewProduct, StockAction};

    #[tokio::test]
    async fn test_mixed_traffic_reconciles() {
        let db = Database::new(DbConfig::in_memory()).await.unwrap();
        let product = db
            .products()
            .insert(&NewProduct {
                name: "Celana Chino".to_string(),
                price: Money::from_minor(25_000),
                stock: 10,
                ..NewProduct::default()
            })
            .await
            .unwrap();

        db.products().decrease_stock(product.id, 4).await.unwrap();
        db.products().increase_stock(product.id, 2).await.unwrap();
        db.products().decrease_stock(product.id, 1).await.unwrap();

        let entries = db.ledger().entries(None).await.unwrap();
        let actions: Vec<StockAction> = entries.iter().map(|e| e.action).collect();
        assert_eq!(
            actions,
            vec![
                StockAction::Restock,
                StockAction::Sale,
                StockAction::Restock,
                StockAction::Sale
            ]
        );
        assert_eq!(db.ledger().balance(product.id).await.unwrap(), 7);
        assert!(db.ledger().reconcile().await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_reconcile_reports_drift() {
        let db = Database::new(DbConfig::in_memory()).await.unwrap();
        let product = db
            .products()
            .insert(&NewProduct {
                name: "Jaket".to_string(),
                stock: 3,
                ..NewProduct::default()
            })
            .await
            .unwrap();

        // Simulate an out-of-band edit that bypassed the ledger
        sqlx::query("UPDATE products SET stock = 9 WHERE id = ?1")
            .bind(product.id)
            .execute(db.pool())
            .await
            .unwrap();

        let drift = db.ledger().reconcile().await.unwrap();
        assert_eq!(drift.len(), 1);
        assert_eq!(drift[0].stock, 9);
        assert_eq!(drift[0].ledger_total, 3);
    }
}
