//! # Error Types
//!
//! Domain-specific error types for tally-core.
//!
//! ## Error Hierarchy
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                         Error Types                                     │
//! │                                                                         │
//! │  tally-core errors (this file)                                         │
//! │  ├── CoreError        - Cart / checkout / stock rule violations        │
//! │  └── ValidationError  - Input validation failures                      │
//! │                                                                         │
//! │  tally-db errors      - DbError  (converted into CoreError at the port)│
//! │  tally-report errors  - ReportError                                    │
//! │  tally-cli errors     - AppError (what the operator sees)              │
//! │                                                                         │
//! │  Flow: ValidationError → CoreError ← DbError      ReportError          │
//! │                              └──────────► AppError ◄───┘               │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! Every variant maps onto exactly one [`ErrorKind`], so callers can match
//! exhaustively on the kind without parsing messages.

use serde::Serialize;
use thiserror::Error;

use crate::catalog::StockDecrement;
use crate::types::ProductId;

// =============================================================================
// Error Kind
// =============================================================================

/// Coarse classification of every failure the transactional core can report.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ErrorKind {
    NotFound,
    InvalidQuantity,
    InvalidPrice,
    InvalidDiscount,
    OutOfStock,
    InsufficientStock,
    EmptyCart,
    NotInCart,
    PersistenceFailure,
    Validation,
}

// =============================================================================
// Core Error
// =============================================================================

/// Core business logic errors.
///
/// These errors represent business rule violations or domain logic failures.
/// They should be caught and translated to operator-friendly messages.
#[derive(Debug, Error)]
pub enum CoreError {
    /// No product matches the scanned identifier or id.
    #[error("Product not found: {0}")]
    ProductNotFound(String),

    /// The product exists but has no stock at all.
    #[error("Product '{product}' is out of stock")]
    OutOfStock { product: String },

    /// Insufficient stock to complete the operation.
    ///
    /// ## When This Occurs
    /// ```text
    /// scan(P) ×3 with snapshot stock = 2
    ///      │
    ///      ▼
    /// InsufficientStock { product: "Kaos Polos", available: 2, requested: 3 }
    ///      │
    ///      ▼
    /// Operator sees: "Only 2 units available"
    /// ```
    /// Also raised by the store at checkout when real stock dropped below
    /// the snapshot since the line was scanned.
    #[error("Insufficient stock for {product}: available {available}, requested {requested}")]
    InsufficientStock {
        product: String,
        available: i64,
        requested: i64,
    },

    /// Quantity must be strictly positive.
    #[error("Invalid quantity {quantity}: must be positive")]
    InvalidQuantity { quantity: i64 },

    /// Unit price must not be negative.
    #[error("Invalid price {price}: cannot be negative")]
    InvalidPrice { price: i64 },

    /// Discount percent must lie in 0..=100.
    #[error("Invalid discount {percent}%: must be between 0 and 100")]
    InvalidDiscount { percent: u8 },

    /// Checkout attempted with no lines.
    #[error("Cart is empty")]
    EmptyCart,

    /// The product has no line in the cart.
    #[error("Product {0} is not in the cart")]
    NotInCart(ProductId),

    /// A non-transactional store failed part-way through a checkout.
    ///
    /// `applied` lists the decrements that were already committed and were
    /// NOT rolled back. Transactional stores never produce this variant.
    #[error("Checkout stopped at product {failed}: {source}")]
    PartialCheckout {
        failed: ProductId,
        applied: Vec<StockDecrement>,
        #[source]
        source: Box<CoreError>,
    },

    /// The backing store could not read or write.
    #[error("Storage failure: {0}")]
    Store(String),

    /// Validation error (wraps ValidationError).
    #[error("Validation error: {0}")]
    Validation(#[from] ValidationError),
}

impl CoreError {
    /// Returns the classification of this error.
    ///
    /// A partial checkout reports the kind of the line that failed.
    pub fn kind(&self) -> ErrorKind {
        match self {
            CoreError::ProductNotFound(_) => ErrorKind::NotFound,
            CoreError::OutOfStock { .. } => ErrorKind::OutOfStock,
            CoreError::InsufficientStock { .. } => ErrorKind::InsufficientStock,
            CoreError::InvalidQuantity { .. } => ErrorKind::InvalidQuantity,
            CoreError::InvalidPrice { .. } => ErrorKind::InvalidPrice,
            CoreError::InvalidDiscount { .. } => ErrorKind::InvalidDiscount,
            CoreError::EmptyCart => ErrorKind::EmptyCart,
            CoreError::NotInCart(_) => ErrorKind::NotInCart,
            CoreError::PartialCheckout { source, .. } => source.kind(),
            CoreError::Store(_) => ErrorKind::PersistenceFailure,
            CoreError::Validation(_) => ErrorKind::Validation,
        }
    }
}

// =============================================================================
// Validation Error
// =============================================================================

/// Input validation errors.
///
/// These errors occur when operator input doesn't meet requirements.
/// Used for early validation before business logic runs.
#[derive(Debug, Error)]
pub enum ValidationError {
    /// A required field is missing or empty.
    #[error("{field} is required")]
    Required { field: String },

    /// Field value is too long.
    #[error("{field} must be at most {max} characters")]
    TooLong { field: String, max: usize },

    /// Numeric value is out of range.
    #[error("{field} must be between {min} and {max}")]
    OutOfRange { field: String, min: i64, max: i64 },

    /// Invalid format (e.g., invalid code characters).
    #[error("{field} has invalid format: {reason}")]
    InvalidFormat { field: String, reason: String },
}

// =============================================================================
// Result Type Alias
// =============================================================================

/// Convenience type alias for Results with CoreError.
pub type CoreResult<T> = Result<T, CoreError>;

// =============================================================================
// Unit Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_messages() {
        let err = CoreError::InsufficientStock {
            product: "Kaos Polos".to_string(),
            available: 3,
            requested: 5,
        };
        assert_eq!(
            err.to_string(),
            "Insufficient stock for Kaos Polos: available 3, requested 5"
        );
        assert_eq!(CoreError::EmptyCart.to_string(), "Cart is empty");
    }

    #[test]
    fn test_kind_mapping() {
        assert_eq!(CoreError::EmptyCart.kind(), ErrorKind::EmptyCart);
        assert_eq!(
            CoreError::NotInCart(ProductId::new(4)).kind(),
            ErrorKind::NotInCart
        );
        assert_eq!(
            CoreError::Store("disk full".into()).kind(),
            ErrorKind::PersistenceFailure
        );
    }

    #[test]
    fn test_partial_checkout_reports_inner_kind() {
        let err = CoreError::PartialCheckout {
            failed: ProductId::new(2),
            applied: vec![StockDecrement::new(ProductId::new(1), 1)],
            source: Box::new(CoreError::InsufficientStock {
                product: "Topi".into(),
                available: 0,
                requested: 1,
            }),
        };
        assert_eq!(err.kind(), ErrorKind::InsufficientStock);
    }

    #[test]
    fn test_validation_converts_to_core_error() {
        let validation_err = ValidationError::Required {
            field: "name".to_string(),
        };
        let core_err: CoreError = validation_err.into();
        assert!(matches!(core_err, CoreError::Validation(_)));
        assert_eq!(core_err.kind(), ErrorKind::Validation);
    }
}
