//! # Validation Module
//!
//! Input validation for cart edits, stock movements and catalog inserts.
//!
//! ## Validation Layers
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │  Layer 1: CLI / UI            type parsing (clap, serde)                │
//! │           │                                                             │
//! │           ▼                                                             │
//! │  Layer 2: THIS MODULE         business rules (qty > 0, 0..=100 %)       │
//! │           │                                                             │
//! │           ▼                                                             │
//! │  Layer 3: SQLite              CHECK (stock >= 0), NOT NULL, FK          │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! Quantity, price and discount checks return [`CoreError`] directly, since
//! each has its own error kind. Free-text checks return [`ValidationError`].

use crate::error::{CoreError, CoreResult, ValidationError};
use crate::money::Money;

/// Result type for free-text validation.
pub type ValidationResult<T> = Result<T, ValidationError>;

/// Longest accepted product code.
pub const MAX_CODE_LEN: usize = 32;

/// Longest accepted product name.
pub const MAX_NAME_LEN: usize = 200;

/// Highest accepted unit price, in minor units.
pub const MAX_PRICE_MINOR: i64 = 1_000_000_000_000;

// =============================================================================
// Numeric Validators
// =============================================================================

/// Stock movements and cart quantities must be strictly positive.
///
/// ```rust
/// use tally_core::validation::validate_quantity;
///
/// assert!(validate_quantity(1).is_ok());
/// assert!(validate_quantity(0).is_err());
/// ```
pub fn validate_quantity(quantity: i64) -> CoreResult<()> {
    if quantity <= 0 {
        return Err(CoreError::InvalidQuantity { quantity });
    }
    Ok(())
}

/// Prices may be zero (free items) but never negative or above
/// [`MAX_PRICE_MINOR`].
pub fn validate_price(price: Money) -> CoreResult<()> {
    if price.is_negative() || price.minor() > MAX_PRICE_MINOR {
        return Err(CoreError::InvalidPrice {
            price: price.minor(),
        });
    }
    Ok(())
}

/// Discounts are whole percents in 0..=100.
pub fn validate_discount(percent: u8) -> CoreResult<()> {
    if percent > 100 {
        return Err(CoreError::InvalidDiscount { percent });
    }
    Ok(())
}

/// Tax rates are capped at 100% (10000 bps).
pub fn validate_tax_rate_bps(bps: u32) -> ValidationResult<()> {
    if bps > 10_000 {
        return Err(ValidationError::OutOfRange {
            field: "tax_rate".to_string(),
            min: 0,
            max: 10_000,
        });
    }
    Ok(())
}

// =============================================================================
// String Validators
// =============================================================================

/// Validates an optional product code.
///
/// ## Rules
/// - Blank means "generate one"
/// - At most 32 characters
/// - Letters, digits, `-`, `_`, `/` and `.` only
pub fn validate_code(code: &str) -> ValidationResult<()> {
    let code = code.trim();

    if code.len() > MAX_CODE_LEN {
        return Err(ValidationError::TooLong {
            field: "code".to_string(),
            max: MAX_CODE_LEN,
        });
    }

    if !code
        .chars()
        .all(|c| c.is_alphanumeric() || matches!(c, '-' | '_' | '/' | '.'))
    {
        return Err(ValidationError::InvalidFormat {
            field: "code".to_string(),
            reason: "must contain only letters, numbers, '-', '_', '/' and '.'".to_string(),
        });
    }

    Ok(())
}

/// Validates a product name.
pub fn validate_product_name(name: &str) -> ValidationResult<()> {
    let name = name.trim();

    if name.is_empty() {
        return Err(ValidationError::Required {
            field: "name".to_string(),
        });
    }

    if name.len() > MAX_NAME_LEN {
        return Err(ValidationError::TooLong {
            field: "name".to_string(),
            max: MAX_NAME_LEN,
        });
    }

    Ok(())
}

/// Validates a search query, returning it trimmed.
pub fn validate_search_query(query: &str) -> ValidationResult<String> {
    let query = query.trim();

    if query.len() > 100 {
        return Err(ValidationError::TooLong {
            field: "query".to_string(),
            max: 100,
        });
    }

    Ok(query.to_string())
}

// =============================================================================
// Unit Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::ErrorKind;

    #[test]
    fn test_validate_quantity() {
        assert!(validate_quantity(1).is_ok());
        assert!(validate_quantity(9_999).is_ok());
        assert_eq!(
            validate_quantity(0).unwrap_err().kind(),
            ErrorKind::InvalidQuantity
        );
        assert_eq!(
            validate_quantity(-3).unwrap_err().kind(),
            ErrorKind::InvalidQuantity
        );
    }

    #[test]
    fn test_validate_price() {
        assert!(validate_price(Money::zero()).is_ok());
        assert!(validate_price(Money::from_minor(1099)).is_ok());
        assert_eq!(
            validate_price(Money::from_minor(-1)).unwrap_err().kind(),
            ErrorKind::InvalidPrice
        );
        assert!(validate_price(Money::from_minor(MAX_PRICE_MINOR)).is_ok());
        assert_eq!(
            validate_price(Money::from_minor(MAX_PRICE_MINOR + 1))
                .unwrap_err()
                .kind(),
            ErrorKind::InvalidPrice
        );
    }

    #[test]
    fn test_validate_discount() {
        assert!(validate_discount(0).is_ok());
        assert!(validate_discount(100).is_ok());
        assert_eq!(
            validate_discount(101).unwrap_err().kind(),
            ErrorKind::InvalidDiscount
        );
    }

    #[test]
    fn test_validate_code() {
        assert!(validate_code("KP-BLK-M").is_ok());
        assert!(validate_code("").is_ok());
        assert!(validate_code("has space").is_err());
        assert!(validate_code(&"A".repeat(40)).is_err());
    }

    #[test]
    fn test_validate_product_name() {
        assert!(validate_product_name("Kaos Polos").is_ok());
        assert!(validate_product_name("   ").is_err());
        assert!(validate_product_name(&"A".repeat(300)).is_err());
    }

    #[test]
    fn test_validate_tax_rate_bps() {
        assert!(validate_tax_rate_bps(1200).is_ok());
        assert!(validate_tax_rate_bps(10_001).is_err());
    }
}
