//! # tally-core: Pure Business Logic for Tally POS
//!
//! Cart pricing, stock rules and the checkout flow, with zero I/O. Storage
//! is reached only through the [`catalog::CatalogStore`] port.
//!
//! ## Architecture Position
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                        Tally POS Architecture                           │
//! │                                                                         │
//! │  ┌─────────────────────────────────────────────────────────────────┐   │
//! │  │                    tally-cli (Register)                         │   │
//! │  │    scan ──► edit lines ──► checkout ──► record_sale             │   │
//! │  └─────────────────────────────┬───────────────────────────────────┘   │
//! │                                │                                        │
//! │  ┌─────────────────────────────▼───────────────────────────────────┐   │
//! │  │               ★ tally-core (THIS CRATE) ★                       │   │
//! │  │                                                                 │   │
//! │  │   ┌─────────┐ ┌─────────┐ ┌─────────┐ ┌─────────┐ ┌─────────┐  │   │
//! │  │   │  types  │ │  money  │ │  cart   │ │ catalog │ │ engine  │  │   │
//! │  │   │ Product │ │  Money  │ │  Cart   │ │  port   │ │ session │  │   │
//! │  │   │ Ledger  │ │ rounding│ │ Receipt │ │ (trait) │ │checkout │  │   │
//! │  │   └─────────┘ └─────────┘ └─────────┘ └─────────┘ └─────────┘  │   │
//! │  │                                                                 │   │
//! │  │   NO I/O • NO DATABASE • NO FILES                               │   │
//! │  └─────────────────────────────┬───────────────────────────────────┘   │
//! │                                │ CatalogStore                           │
//! │  ┌─────────────────────────────▼───────────────────────────────────┐   │
//! │  │                 tally-db (SQLite catalog + ledger)              │   │
//! │  └─────────────────────────────────────────────────────────────────┘   │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Modules
//!
//! - [`types`] - Domain types (Product, ProductSnapshot, LedgerEntry, ...)
//! - [`money`] - Integer money with half-up rounding
//! - [`cart`] - Cart lines, totals and receipts
//! - [`catalog`] - The `CatalogStore` port
//! - [`engine`] - `CartEngine`, one cashier session
//! - [`error`] - Domain error types
//! - [`validation`] - Business rule validation
//!
//! ## Example Usage
//!
//! ```rust
//! use tally_core::money::Money;
//! use tally_core::types::TaxRate;
//!
//! let subtotal = Money::from_minor(10_000).times(3);
//! let tax = subtotal.exclusive_tax(TaxRate::from_bps(1200));
//!
//! assert_eq!(subtotal.minor(), 30_000);
//! assert_eq!(tax.minor(), 3_600);
//! ```

// =============================================================================
// Module Declarations
// =============================================================================

pub mod cart;
pub mod catalog;
pub mod engine;
pub mod error;
pub mod money;
pub mod types;
pub mod validation;

// =============================================================================
// Re-exports for Convenience
// =============================================================================

pub use cart::{Cart, CartLine, CartTotals, Pricing, Receipt, ReceiptLine, MAX_CART_AMOUNT};
pub use catalog::{CatalogStore, StockDecrement};
pub use engine::{CartEngine, ScanOutcome};
pub use error::{CoreError, CoreResult, ErrorKind, ValidationError};
pub use money::{Money, MoneyDisplay};
pub use types::*;
