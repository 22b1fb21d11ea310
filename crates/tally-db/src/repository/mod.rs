//! # Repository Module
//!
//! Database repository implementations for Tally POS.
//!
//! ## Repository Pattern
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                                                                         │
//! │  CatalogStore for Database  /  tally-cli admin commands                │
//! │       │                                                                 │
//! │       │  db.products().decrease_stock(id, 3)                           │
//! │       ▼                                                                 │
//! │  ProductRepository                  LedgerRepository                   │
//! │  ├── list / get_by_id / get_by_code ├── entries(product?)              │
//! │  ├── search(query)                  ├── balance(product)               │
//! │  ├── insert(new)                    └── reconcile()                    │
//! │  ├── increase_stock / decrease_stock                                   │
//! │  └── decrease_stock_many (one tx)                                      │
//! │       │                                                                 │
//! │       │  UPDATE products + INSERT stock_log, same transaction          │
//! │       ▼                                                                 │
//! │  SQLite Database                                                       │
//! │                                                                         │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```

pub mod ledger;
pub mod product;
