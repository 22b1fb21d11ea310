//! # Product Repository
//!
//! Catalog reads, the admin insert, and atomic stock mutation.
//!
//! ## Stock Update Strategy
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────┐
//! │                                                                     │
//! │  ❌ WRONG: read, compare in Rust, write back                        │
//! │     SELECT stock ...; if stock >= q { UPDATE ... SET stock = 2 }    │
//! │                                                                     │
//! │  ✅ CORRECT: conditional delta update                               │
//! │     UPDATE products SET stock = stock - q                           │
//! │      WHERE id = ? AND stock >= q                                    │
//! │                                                                     │
//! │  rows_affected = 0  →  look the row up once to tell NotFound from   │
//! │                        InsufficientStock                            │
//! │  rows_affected = 1  →  INSERT stock_log (sale, -q)                  │
//! │                                                                     │
//! │  Both statements share one transaction.                             │
//! └─────────────────────────────────────────────────────────────────────┘
//! ```

use chrono::{DateTime, Utc};
use sqlx::{FromRow, SqliteConnection, SqlitePool};
use tracing::{debug, info};

use crate::error::{DbError, DbResult};
use crate::repository::ledger;
use tally_core::validation::{
    validate_code, validate_discount, validate_price, validate_product_name, validate_quantity,
    validate_search_query,
};
use tally_core::{CoreError, Money, NewProduct, Product, ProductId, StockAction, StockDecrement};

const SELECT_PRODUCT: &str = "SELECT id, code, name, color, size, price, discount_percent, \
     stock, created_at, updated_at FROM products";

/// Raw `products` row.
#[derive(Debug, FromRow)]
struct ProductRow {
    id: ProductId,
    code: Option<String>,
    name: String,
    color: Option<String>,
    size: Option<String>,
    price: i64,
    discount_percent: i64,
    stock: i64,
    created_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
}

impl From<ProductRow> for Product {
    fn from(row: ProductRow) -> Self {
        Product {
            id: row.id,
            code: row.code,
            name: row.name,
            color: row.color,
            size: row.size,
            price: Money::from_minor(row.price),
            // CHECK constraint keeps this in 0..=100
            discount_percent: row.discount_percent.clamp(0, 100) as u8,
            stock: row.stock,
            created_at: row.created_at,
            updated_at: row.updated_at,
        }
    }
}

/// Code assigned to products inserted without one.
pub fn generated_code(id: ProductId) -> String {
    format!("P-{:05}", id.get())
}

/// Repository for product database operations.
///
/// ## Usage
/// ```rust,ignore
/// let repo = ProductRepository::new(pool);
///
/// let product = repo.get_by_code("KP-BLK-M").await?;
/// repo.decrease_stock(product.id, 2).await?;
/// ```
#[derive(Debug, Clone)]
pub struct ProductRepository {
    pool: SqlitePool,
}

impl ProductRepository {
    pub fn new(pool: SqlitePool) -> Self {
        ProductRepository { pool }
    }

    // =========================================================================
    // Reads
    // =========================================================================

    /// All products ordered by id.
    pub async fn list(&self) -> DbResult<Vec<Product>> {
        let sql = format!("{SELECT_PRODUCT} ORDER BY id");
        let rows = sqlx::query_as::<_, ProductRow>(&sql)
            .fetch_all(&self.pool)
            .await?;

        Ok(rows.into_iter().map(Product::from).collect())
    }

    pub async fn get_by_id(&self, id: ProductId) -> DbResult<Option<Product>> {
        let sql = format!("{SELECT_PRODUCT} WHERE id = ?1");
        let row = sqlx::query_as::<_, ProductRow>(&sql)
            .bind(id)
            .fetch_optional(&self.pool)
            .await?;

        Ok(row.map(Product::from))
    }

    /// Exact code match, ignoring ASCII case.
    pub async fn get_by_code(&self, code: &str) -> DbResult<Option<Product>> {
        let sql = format!("{SELECT_PRODUCT} WHERE code = ?1 COLLATE NOCASE");
        let row = sqlx::query_as::<_, ProductRow>(&sql)
            .bind(code.trim())
            .fetch_optional(&self.pool)
            .await?;

        Ok(row.map(Product::from))
    }

    /// Filters the catalog the way the stock screen does.
    ///
    /// Matches an id prefix, or a substring of the code or name. An empty
    /// query lists everything.
    pub async fn search(&self, query: &str) -> DbResult<Vec<Product>> {
        let query = validate_search_query(query)?;

        if query.is_empty() {
            return self.list().await;
        }

        debug!(query = %query, "Searching products");

        let sql = format!(
            "{SELECT_PRODUCT} \
             WHERE CAST(id AS TEXT) LIKE ?1 || '%' \
                OR code LIKE '%' || ?1 || '%' \
                OR name LIKE '%' || ?1 || '%' \
             ORDER BY id"
        );
        let rows = sqlx::query_as::<_, ProductRow>(&sql)
            .bind(&query)
            .fetch_all(&self.pool)
            .await?;

        debug!(count = rows.len(), "Search returned products");
        Ok(rows.into_iter().map(Product::from).collect())
    }

    pub async fn count(&self) -> DbResult<i64> {
        let count: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM products")
            .fetch_one(&self.pool)
            .await?;

        Ok(count)
    }

    async fn require(&self, id: ProductId) -> DbResult<Product> {
        self.get_by_id(id)
            .await?
            .ok_or_else(|| DbError::not_found("Product", id))
    }

    // =========================================================================
    // Admin Insert
    // =========================================================================

    /// Inserts a product and logs its opening stock.
    ///
    /// ## Flow
    /// ```text
    /// validate fields
    ///   └── BEGIN
    ///         ├── INSERT products (code may be NULL)
    ///         ├── code blank?  UPDATE code = 'P-' || id padded to 5
    ///         ├── stock > 0?   INSERT stock_log (restock, +stock)
    ///         └── COMMIT
    /// ```
    pub async fn insert(&self, new: &NewProduct) -> DbResult<Product> {
        validate_product_name(&new.name)?;
        validate_price(new.price)?;
        validate_discount(new.discount_percent)?;
        if new.stock < 0 {
            return Err(CoreError::InvalidQuantity {
                quantity: new.stock,
            }
            .into());
        }

        let code = new
            .code
            .as_deref()
            .map(str::trim)
            .filter(|c| !c.is_empty())
            .map(str::to_string);
        if let Some(code) = &code {
            validate_code(code)?;
        }

        let now = Utc::now();
        let mut tx = self.pool.begin().await?;

        let inserted = sqlx::query(
            "INSERT INTO products \
                 (code, name, color, size, price, discount_percent, stock, created_at, updated_at) \
             VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?8)",
        )
        .bind(code.as_deref())
        .bind(new.name.trim())
        .bind(blank_to_none(&new.color))
        .bind(blank_to_none(&new.size))
        .bind(new.price.minor())
        .bind(new.discount_percent as i64)
        .bind(new.stock)
        .bind(now)
        .execute(&mut *tx)
        .await
        .map_err(|e| match DbError::from(e) {
            DbError::UniqueViolation { .. } => {
                DbError::duplicate("code", code.clone().unwrap_or_default())
            }
            other => other,
        })?;

        let id = ProductId::new(inserted.last_insert_rowid());

        if code.is_none() {
            sqlx::query("UPDATE products SET code = ?2 WHERE id = ?1")
                .bind(id)
                .bind(generated_code(id))
                .execute(&mut *tx)
                .await?;
        }

        if new.stock > 0 {
            ledger::append(&mut tx, id, StockAction::Restock, new.stock, now).await?;
        }

        tx.commit().await?;

        info!(product_id = %id, name = %new.name.trim(), stock = new.stock, "Product added");
        self.require(id).await
    }

    // =========================================================================
    // Stock Mutation
    // =========================================================================

    /// Adds stock and appends a `restock` ledger row.
    pub async fn increase_stock(&self, id: ProductId, quantity: i64) -> DbResult<Product> {
        validate_quantity(quantity)?;

        let now = Utc::now();
        let mut tx = self.pool.begin().await?;

        let result =
            sqlx::query("UPDATE products SET stock = stock + ?2, updated_at = ?3 WHERE id = ?1")
                .bind(id)
                .bind(quantity)
                .bind(now)
                .execute(&mut *tx)
                .await?;

        if result.rows_affected() == 0 {
            return Err(DbError::not_found("Product", id));
        }

        ledger::append(&mut tx, id, StockAction::Restock, quantity, now).await?;
        tx.commit().await?;

        info!(product_id = %id, quantity, "Stock increased");
        self.require(id).await
    }

    /// Removes stock and appends a `sale` ledger row.
    pub async fn decrease_stock(&self, id: ProductId, quantity: i64) -> DbResult<Product> {
        let now = Utc::now();
        let mut tx = self.pool.begin().await?;

        apply_decrement(&mut tx, id, quantity, now).await?;
        tx.commit().await?;

        info!(product_id = %id, quantity, "Stock decreased");
        self.require(id).await
    }

    /// Applies a whole checkout in one transaction.
    ///
    /// The first failing line aborts the transaction; dropping it rolls back
    /// every decrement and ledger row already written for this checkout.
    pub async fn decrease_stock_many(&self, lines: &[StockDecrement]) -> DbResult<()> {
        let now = Utc::now();
        let mut tx = self.pool.begin().await?;

        for line in lines {
            apply_decrement(&mut tx, line.product_id, line.quantity, now).await?;
        }

        tx.commit().await?;

        info!(lines = lines.len(), "Checkout stock committed");
        Ok(())
    }
}

/// Conditional decrement plus its ledger row, on an open transaction.
async fn apply_decrement(
    conn: &mut SqliteConnection,
    id: ProductId,
    quantity: i64,
    now: DateTime<Utc>,
) -> DbResult<()> {
    validate_quantity(quantity)?;

    let result = sqlx::query(
        "UPDATE products SET stock = stock - ?2, updated_at = ?3 \
         WHERE id = ?1 AND stock >= ?2",
    )
    .bind(id)
    .bind(quantity)
    .bind(now)
    .execute(&mut *conn)
    .await?;

    if result.rows_affected() == 0 {
        let current: Option<(String, i64)> =
            sqlx::query_as("SELECT name, stock FROM products WHERE id = ?1")
                .bind(id)
                .fetch_optional(&mut *conn)
                .await?;

        return Err(match current {
            None => DbError::not_found("Product", id),
            Some((name, stock)) => CoreError::InsufficientStock {
                product: name,
                available: stock,
                requested: quantity,
            }
            .into(),
        });
    }

    ledger::append(conn, id, StockAction::Sale, quantity, now).await
}

fn blank_to_none(value: &Option<String>) -> Option<String> {
    value
        .as_deref()
        .map(str::trim)
        .filter(|v| !v.is_empty())
        .map(str::to_string)
}

// =============================================================================
// Unit Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use crate::{Database, DbConfig, DbError};
    use tally_core::{ErrorKind, Money, NewProduct, ProductId, StockAction, StockDecrement};

    async fn db() -> Database {
        Database::new(DbConfig::in_memory()).await.unwrap()
    }

    fn shirt(code: Option<&str>, stock: i64) -> NewProduct {
        NewProduct {
            code: code.map(str::to_string),
            name: "Kaos Polos".to_string(),
            color: Some("Black".to_string()),
            size: Some("M".to_string()),
            price: Money::from_minor(10_000),
            discount_percent: 0,
            stock,
        }
    }

    #[tokio::test]
    async fn test_insert_generates_code_and_logs_opening_stock() {
        let db = db().await;

        let product = db.products().insert(&shirt(None, 5)).await.unwrap();
        assert_eq!(product.code.as_deref(), Some("P-00001"));
        assert_eq!(product.stock, 5);
        assert_eq!(product.price.minor(), 10_000);

        let entries = db.ledger().entries(Some(product.id)).await.unwrap();
        assert_eq!(entries.len(), 1);
        assert_eq!(entries[0].action, StockAction::Restock);
        assert_eq!(entries[0].quantity, 5);
    }

    #[tokio::test]
    async fn test_insert_rejects_duplicate_code_and_bad_fields() {
        let db = db().await;
        db.products().insert(&shirt(Some("KP-01"), 1)).await.unwrap();

        let err = db.products().insert(&shirt(Some("KP-01"), 1)).await.unwrap_err();
        assert!(matches!(err, DbError::UniqueViolation { .. }));

        let mut bad = shirt(None, 1);
        bad.price = Money::from_minor(-1);
        let err = db.products().insert(&bad).await.unwrap_err();
        assert_eq!(err.kind(), ErrorKind::InvalidPrice);

        let mut bad = shirt(None, 1);
        bad.name = "  ".to_string();
        assert!(db.products().insert(&bad).await.is_err());
        assert_eq!(db.products().count().await.unwrap(), 1);
    }

    #[tokio::test]
    async fn test_lookup_by_code_and_search() {
        let db = db().await;
        db.products().insert(&shirt(Some("KP-BLK-M"), 1)).await.unwrap();
        let mut hat = shirt(Some("TOPI-01"), 1);
        hat.name = "Topi Baseball".to_string();
        db.products().insert(&hat).await.unwrap();

        let found = db.products().get_by_code("kp-blk-m").await.unwrap();
        assert_eq!(found.unwrap().name, "Kaos Polos");

        let hits = db.products().search("topi").await.unwrap();
        assert_eq!(hits.len(), 1);
        assert_eq!(hits[0].code.as_deref(), Some("TOPI-01"));

        assert_eq!(db.products().search("").await.unwrap().len(), 2);
        assert_eq!(db.products().search("2").await.unwrap().len(), 1);
    }

    #[tokio::test]
    async fn test_decrease_stock_rules() {
        let db = db().await;
        let product = db.products().insert(&shirt(None, 5)).await.unwrap();
        let repo = db.products();

        let updated = repo.decrease_stock(product.id, 3).await.unwrap();
        assert_eq!(updated.stock, 2);

        let err = repo.decrease_stock(product.id, 3).await.unwrap_err();
        assert_eq!(err.kind(), ErrorKind::InsufficientStock);

        let err = repo.decrease_stock(product.id, 0).await.unwrap_err();
        assert_eq!(err.kind(), ErrorKind::InvalidQuantity);

        let err = repo.decrease_stock(ProductId::new(99), 1).await.unwrap_err();
        assert_eq!(err.kind(), ErrorKind::NotFound);

        let entries = db.ledger().entries(Some(product.id)).await.unwrap();
        let signed: Vec<i64> = entries.iter().map(|e| e.quantity).collect();
        assert_eq!(signed, vec![5, -3]);
    }

    #[tokio::test]
    async fn test_increase_stock() {
        let db = db().await;
        let product = db.products().insert(&shirt(None, 0)).await.unwrap();
        assert!(db.ledger().entries(Some(product.id)).await.unwrap().is_empty());

        let updated = db.products().increase_stock(product.id, 4).await.unwrap();
        assert_eq!(updated.stock, 4);

        let err = db
            .products()
            .increase_stock(ProductId::new(99), 1)
            .await
            .unwrap_err();
        assert_eq!(err.kind(), ErrorKind::NotFound);

        let err = db.products().increase_stock(product.id, -2).await.unwrap_err();
        assert_eq!(err.kind(), ErrorKind::InvalidQuantity);
    }

    #[tokio::test]
    async fn test_decrease_many_is_all_or_nothing() {
        let db = db().await;
        let a = db.products().insert(&shirt(Some("A"), 5)).await.unwrap();
        let b = db.products().insert(&shirt(Some("B"), 1)).await.unwrap();

        let lines = [StockDecrement::new(a.id, 2), StockDecrement::new(b.id, 3)];
        let err = db.products().decrease_stock_many(&lines).await.unwrap_err();
        assert_eq!(err.kind(), ErrorKind::InsufficientStock);

        let a_now = db.products().get_by_id(a.id).await.unwrap().unwrap();
        assert_eq!(a_now.stock, 5);
        assert_eq!(db.ledger().entries(Some(a.id)).await.unwrap().len(), 1);

        let lines = [StockDecrement::new(a.id, 2), StockDecrement::new(b.id, 1)];
        db.products().decrease_stock_many(&lines).await.unwrap();
        assert_eq!(db.ledger().balance(a.id).await.unwrap(), 3);
        assert_eq!(db.ledger().balance(b.id).await.unwrap(), 0);
    }
    #[tokio::test(flavor = "multi_thread", worker_threads = 4)]
    async fn test_concurrent_decrements_never_oversell() {
        let tmp = tempfile::tempdir().unwrap();
        let db = Database::new(DbConfig::new(tmp.path().join("race.db")).max_connections(8))
            .await
            .unwrap();
        let product = db.products().insert(&shirt(None, 5)).await.unwrap();

        let tasks: Vec<_> = (0..20)
            .map(|_| {
                let db = db.clone();
                tokio::spawn(async move { db.products().decrease_stock(product.id, 1).await })
            })
            .collect();

        let mut sold = 0;
        for task in tasks {
            match task.await.unwrap() {
                Ok(_) => sold += 1,
                Err(err) => assert_eq!(err.kind(), ErrorKind::InsufficientStock),
            }
        }

        assert_eq!(sold, 5);
        let now = db.products().get_by_id(product.id).await.unwrap().unwrap();
        assert_eq!(now.stock, 0);
        assert_eq!(db.ledger().balance(product.id).await.unwrap(), 0);
        assert!(db.ledger().reconcile().await.unwrap().is_empty());
    }
}
