//! # Domain Types
//!
//! Core domain types used throughout Tally POS.
//!
//! ## Type Hierarchy
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                         Domain Types                                    │
//! │                                                                         │
//! │  ┌─────────────────┐  snapshot()  ┌──────────────────┐                 │
//! │  │    Product      │ ───────────► │ ProductSnapshot  │  (frozen copy,  │
//! │  │  (live row)     │              │  held by cart)   │   never live)   │
//! │  │  id: ProductId  │              └──────────────────┘                 │
//! │  │  price: Money   │                                                    │
//! │  │  stock: i64     │ ◄── Σ signed quantities of ──┐                    │
//! │  └─────────────────┘                               │                    │
//! │                                          ┌─────────┴───────┐            │
//! │                                          │  LedgerEntry    │            │
//! │                                          │  action: Stock- │            │
//! │                                          │   Action        │            │
//! │                                          │  quantity: ±n   │            │
//! │                                          └─────────────────┘            │
//! │                                                                         │
//! │  ┌─────────────────┐   ┌─────────────────┐   ┌─────────────────┐       │
//! │  │    TaxRate      │   │    TaxMode      │   │ PaymentMethod   │       │
//! │  │  bps (u32)      │   │  Exclusive      │   │  Cash, Card,    │       │
//! │  │  1200 = 12%     │   │  Inclusive      │   │  Transfer, ...  │       │
//! │  └─────────────────┘   └─────────────────┘   └─────────────────┘       │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```

use std::fmt;
use std::str::FromStr;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use ts_rs::TS;

use crate::error::ValidationError;
use crate::money::Money;

// =============================================================================
// Product Id
// =============================================================================

/// Store-assigned product identifier.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize, TS)]
#[cfg_attr(feature = "sqlx", derive(sqlx::Type))]
#[cfg_attr(feature = "sqlx", sqlx(transparent))]
#[ts(export)]
pub struct ProductId(i64);

impl ProductId {
    #[inline]
    pub const fn new(id: i64) -> Self {
        ProductId(id)
    }

    #[inline]
    pub const fn get(&self) -> i64 {
        self.0
    }
}

impl fmt::Display for ProductId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        fmt::Display::fmt(&self.0, f)
    }
}

impl FromStr for ProductId {
    type Err = ValidationError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        s.trim()
            .parse::<i64>()
            .map(ProductId)
            .map_err(|_| ValidationError::InvalidFormat {
                field: "product_id".to_string(),
                reason: format!("'{}' is not a number", s.trim()),
            })
    }
}

// =============================================================================
// Tax Rate
// =============================================================================

/// Tax rate represented in basis points (bps).
///
/// ## Why Basis Points?
/// 1 basis point = 0.01% = 1/10000, so 1200 bps = 12% with no float math.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, TS)]
#[ts(export)]
pub struct TaxRate(u32);

impl TaxRate {
    /// Creates a tax rate from basis points.
    #[inline]
    pub const fn from_bps(bps: u32) -> Self {
        TaxRate(bps)
    }

    /// Creates a tax rate from a percentage (`12.0` → 1200 bps).
    pub fn from_percentage(pct: f64) -> Self {
        TaxRate((pct * 100.0).round().max(0.0) as u32)
    }

    /// Creates a tax rate from a fraction (`0.12` → 1200 bps).
    pub fn from_fraction(fraction: f64) -> Self {
        TaxRate((fraction * 10_000.0).round().max(0.0) as u32)
    }

    #[inline]
    pub const fn bps(&self) -> u32 {
        self.0
    }

    /// Returns the rate as a percentage (for display only).
    #[inline]
    pub fn percentage(&self) -> f64 {
        self.0 as f64 / 100.0
    }

    /// Returns the rate as a fraction, the form persisted in report files.
    #[inline]
    pub fn fraction(&self) -> f64 {
        self.0 as f64 / 10_000.0
    }

    #[inline]
    pub const fn zero() -> Self {
        TaxRate(0)
    }
}

impl Default for TaxRate {
    fn default() -> Self {
        TaxRate::zero()
    }
}

/// Whether shelf prices already include tax.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize, TS)]
#[ts(export)]
#[serde(rename_all = "snake_case")]
pub enum TaxMode {
    /// Price + tax shown separately.
    #[default]
    Exclusive,
    /// Price includes tax.
    Inclusive,
}

impl TaxMode {
    #[inline]
    pub const fn is_inclusive(&self) -> bool {
        matches!(self, TaxMode::Inclusive)
    }
}

// =============================================================================
// Product
// =============================================================================

/// A live catalog row, as currently stored.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, TS)]
#[ts(export)]
pub struct Product {
    pub id: ProductId,

    /// Business code printed on the tag (may be system-generated).
    pub code: Option<String>,

    pub name: String,
    pub color: Option<String>,
    pub size: Option<String>,

    /// Shelf price in minor units.
    pub price: Money,

    /// Catalog discount percent (0-100). Informational; the cart applies
    /// only its own per-line discount.
    pub discount_percent: u8,

    /// Units on hand. Always equals the product's ledger sum.
    pub stock: i64,

    #[ts(as = "String")]
    pub created_at: DateTime<Utc>,

    #[ts(as = "String")]
    pub updated_at: DateTime<Utc>,
}

impl Product {
    /// Freezes the current state of this product for use in a cart session.
    pub fn snapshot(&self) -> ProductSnapshot {
        ProductSnapshot {
            id: self.id,
            code: self.code.clone(),
            name: self.name.clone(),
            color: self.color.clone(),
            size: self.size.clone(),
            price: self.price,
            discount_percent: self.discount_percent,
            stock: self.stock,
            captured_at: Utc::now(),
        }
    }

    /// True when `identifier` is this product's code (case-insensitive).
    pub fn has_code(&self, identifier: &str) -> bool {
        self.code
            .as_deref()
            .is_some_and(|code| code.eq_ignore_ascii_case(identifier.trim()))
    }
}

/// A point-in-time copy of a [`Product`].
///
/// The cart engine builds these once per session. They are deliberately a
/// separate type: a snapshot's `stock` is what the catalog said at
/// `captured_at`, not what the store holds now. Checkout re-validates
/// against the store.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, TS)]
#[ts(export)]
pub struct ProductSnapshot {
    pub id: ProductId,
    pub code: Option<String>,
    pub name: String,
    pub color: Option<String>,
    pub size: Option<String>,
    pub price: Money,
    pub discount_percent: u8,
    pub stock: i64,
    #[ts(as = "String")]
    pub captured_at: DateTime<Utc>,
}

impl ProductSnapshot {
    pub fn has_code(&self, identifier: &str) -> bool {
        self.code
            .as_deref()
            .is_some_and(|code| code.eq_ignore_ascii_case(identifier.trim()))
    }
}

/// Fields for inserting a product through the admin flow.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct NewProduct {
    /// Leave empty to let the store generate one.
    pub code: Option<String>,
    pub name: String,
    pub color: Option<String>,
    pub size: Option<String>,
    pub price: Money,
    pub discount_percent: u8,
    /// Opening stock, recorded as a restock ledger entry.
    pub stock: i64,
}

// =============================================================================
// Stock Ledger
// =============================================================================

/// Why a product's stock changed.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, TS)]
#[cfg_attr(feature = "sqlx", derive(sqlx::Type))]
#[cfg_attr(feature = "sqlx", sqlx(rename_all = "lowercase"))]
#[ts(export)]
#[serde(rename_all = "snake_case")]
pub enum StockAction {
    Restock,
    Sale,
}

impl StockAction {
    /// Applies this action's sign to a positive quantity.
    #[inline]
    pub const fn signed(&self, quantity: i64) -> i64 {
        match self {
            StockAction::Restock => quantity,
            StockAction::Sale => -quantity,
        }
    }

    pub const fn as_str(&self) -> &'static str {
        match self {
            StockAction::Restock => "restock",
            StockAction::Sale => "sale",
        }
    }
}

impl fmt::Display for StockAction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.pad(self.as_str())
    }
}

/// One immutable row of the stock ledger.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, TS)]
#[ts(export)]
pub struct LedgerEntry {
    pub id: i64,
    pub product_id: ProductId,
    pub action: StockAction,
    /// Signed: positive for restock, negative for sale.
    pub quantity: i64,
    #[ts(as = "String")]
    pub created_at: DateTime<Utc>,
}

// =============================================================================
// Payment Method
// =============================================================================

/// How the customer paid. Recorded as entered; nothing is verified.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, TS)]
#[ts(export)]
#[serde(rename_all = "snake_case")]
pub enum PaymentMethod {
    Cash,
    Card,
    Transfer,
    EWallet,
}

impl PaymentMethod {
    pub const fn as_str(&self) -> &'static str {
        match self {
            PaymentMethod::Cash => "cash",
            PaymentMethod::Card => "card",
            PaymentMethod::Transfer => "transfer",
            PaymentMethod::EWallet => "e_wallet",
        }
    }
}

impl fmt::Display for PaymentMethod {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for PaymentMethod {
    type Err = ValidationError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "cash" | "tunai" => Ok(PaymentMethod::Cash),
            "card" | "credit" | "debit" => Ok(PaymentMethod::Card),
            "transfer" | "bank" => Ok(PaymentMethod::Transfer),
            "e_wallet" | "ewallet" | "qris" => Ok(PaymentMethod::EWallet),
            other => Err(ValidationError::InvalidFormat {
                field: "payment_method".to_string(),
                reason: format!("unknown method '{}'", other),
            }),
        }
    }
}

// =============================================================================
// Store Info
// =============================================================================

/// Store metadata stamped onto each daily report when it is created.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StoreInfo {
    pub name: String,
    pub address: String,
    pub contact: String,
    pub tax_rate: TaxRate,
    pub tax_mode: TaxMode,
}

// =============================================================================
// Unit Tests
// =============================================================================
