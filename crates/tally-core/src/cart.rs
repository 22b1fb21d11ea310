//! # Cart
//!
//! The working set of lines for one in-progress customer transaction, plus
//! the pricing rules that turn those lines into totals and a receipt.
//!
//! ## Cart Operations Flow
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │  Operator Action        Cart Method          State Change               │
//! │  ───────────────        ───────────          ────────────               │
//! │  Scan product ────────► add_one() ─────────► push line / qty + 1        │
//! │  Type quantity ───────► set_quantity() ────► qty = n   (n ≤ 0: remove)  │
//! │  Override price ──────► set_unit_price() ──► unit_price = p             │
//! │  Give discount ───────► apply_discount() ──► discount_percent = d       │
//! │  Remove line ─────────► remove() ──────────► line dropped               │
//! │  Cancel sale ─────────► clear() ───────────► lines.clear()              │
//! │                                                                         │
//! │  Every failing call leaves the cart exactly as it was.                 │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Pricing
//! `line_total = quantity × unit_price − round(quantity × unit_price × d%)`.
//! The ad-hoc discount reduces the chargeable amount; with no discounts the
//! subtotal is exactly `Σ quantity × unit_price`.
//!
//! `Σ quantity × unit_price` never exceeds [`MAX_CART_AMOUNT`]. An edit that
//! would cross it is rejected, so totals and tax cannot overflow.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use ts_rs::TS;
use uuid::Uuid;

use crate::error::{CoreError, CoreResult};
use crate::money::Money;
use crate::types::{ProductId, ProductSnapshot, TaxMode, TaxRate};
use crate::validation::{validate_discount, validate_price};

/// Upper bound on a cart's gross amount, in minor units.
///
/// Leaves room for tax up to 100% on top without leaving the i64 range.
pub const MAX_CART_AMOUNT: Money = Money::from_minor(1_000_000_000_000_000);

// =============================================================================
// Pricing
// =============================================================================

/// Store-wide tax settings applied to every cart.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize, TS)]
#[ts(export)]
pub struct Pricing {
    pub tax_rate: TaxRate,
    pub tax_mode: TaxMode,
}

impl Pricing {
    pub const fn exclusive(tax_rate: TaxRate) -> Self {
        Pricing {
            tax_rate,
            tax_mode: TaxMode::Exclusive,
        }
    }

    pub const fn inclusive(tax_rate: TaxRate) -> Self {
        Pricing {
            tax_rate,
            tax_mode: TaxMode::Inclusive,
        }
    }
}

// =============================================================================
// Cart Line
// =============================================================================

/// One product in the cart.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, TS)]
#[ts(export)]
pub struct CartLine {
    /// Frozen product data; `product.stock` bounds `quantity`.
    pub product: ProductSnapshot,
    pub quantity: i64,
    /// Price actually charged per unit. Starts at the shelf price.
    pub unit_price: Money,
    /// Ad-hoc discount for this line, 0-100.
    pub discount_percent: u8,
}

impl CartLine {
    fn new(product: ProductSnapshot) -> Self {
        CartLine {
            unit_price: product.price,
            product,
            quantity: 1,
            discount_percent: 0,
        }
    }

    #[inline]
    pub fn product_id(&self) -> ProductId {
        self.product.id
    }

    /// `quantity × unit_price`, before discount.
    pub fn gross(&self) -> Money {
        self.unit_price.times(self.quantity)
    }

    pub fn discount(&self) -> Money {
        self.gross().percent_of(self.discount_percent)
    }

    /// Chargeable amount for this line.
    pub fn line_total(&self) -> Money {
        self.gross() - self.discount()
    }

    fn ensure_within_stock(&self, requested: i64) -> CoreResult<()> {
        if requested > self.product.stock {
            return Err(CoreError::InsufficientStock {
                product: self.product.name.clone(),
                available: self.product.stock,
                requested,
            });
        }
        Ok(())
    }
}

// =============================================================================
// Totals
// =============================================================================

/// Totals derived from the current lines. Pure; recomputed on demand.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize, TS)]
#[ts(export)]
pub struct CartTotals {
    /// Sum of discounted line totals.
    pub subtotal: Money,
    /// Sum of line discounts (already deducted from `subtotal`).
    pub discount: Money,
    pub tax: Money,
    pub total: Money,
    /// Distinct lines.
    pub item_count: usize,
    /// Sum of quantities.
    pub unit_count: i64,
}

// =============================================================================
// Cart
// =============================================================================

/// The shopping cart.
///
/// ## Invariants
/// - Lines are unique by product id and kept in insertion order
/// - Every quantity is in `1..=product.stock` of the line's snapshot
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Cart {
    lines: Vec<CartLine>,
}

impl Cart {
    pub fn new() -> Self {
        Cart { lines: Vec::new() }
    }

    pub fn lines(&self) -> &[CartLine] {
        &self.lines
    }

    pub fn line(&self, product_id: ProductId) -> Option<&CartLine> {
        self.lines.iter().find(|l| l.product_id() == product_id)
    }

    fn line_mut(&mut self, product_id: ProductId) -> CoreResult<&mut CartLine> {
        self.lines
            .iter_mut()
            .find(|l| l.product_id() == product_id)
            .ok_or(CoreError::NotInCart(product_id))
    }

    pub fn is_empty(&self) -> bool {
        self.lines.is_empty()
    }

    /// Adds one unit of `product`, creating the line on first scan.
    ///
    /// ## Returns
    /// The line's new quantity.
    pub fn add_one(&mut self, product: &ProductSnapshot) -> CoreResult<i64> {
        if product.stock <= 0 {
            return Err(CoreError::OutOfStock {
                product: product.name.clone(),
            });
        }

        if let Some(line) = self.line(product.id) {
            let next = line.quantity + 1;
            self.edit_line(
                product.id,
                |line| {
                    line.ensure_within_stock(next)?;
                    line.quantity = next;
                    Ok(())
                },
                CoreError::InvalidQuantity { quantity: next },
            )?;
            return Ok(next);
        }

        self.lines.push(CartLine::new(product.clone()));
        if self.gross_amount().is_none() {
            self.lines.pop();
            return Err(CoreError::InvalidPrice {
                price: product.price.minor(),
            });
        }
        Ok(1)
    }

    /// Sets a line's quantity exactly; zero or less removes the line.
    pub fn set_quantity(&mut self, product_id: ProductId, quantity: i64) -> CoreResult<()> {
        if quantity <= 0 {
            return match self.remove(product_id) {
                true => Ok(()),
                false => Err(CoreError::NotInCart(product_id)),
            };
        }

        self.edit_line(
            product_id,
            |line| {
                line.ensure_within_stock(quantity)?;
                line.quantity = quantity;
                Ok(())
            },
            CoreError::InvalidQuantity { quantity },
        )
    }

    pub fn set_unit_price(&mut self, product_id: ProductId, price: Money) -> CoreResult<()> {
        self.edit_line(
            product_id,
            |line| {
                validate_price(price)?;
                line.unit_price = price;
                Ok(())
            },
            CoreError::InvalidPrice {
                price: price.minor(),
            },
        )
    }

    pub fn apply_discount(&mut self, product_id: ProductId, percent: u8) -> CoreResult<()> {
        let line = self.line_mut(product_id)?;
        validate_discount(percent)?;
        line.discount_percent = percent;
        Ok(())
    }

    /// Applies `edit` to one line, undoing it if the cart's gross amount
    /// would pass [`MAX_CART_AMOUNT`]. `edit` must leave the line untouched
    /// when it fails.
    fn edit_line(
        &mut self,
        product_id: ProductId,
        edit: impl FnOnce(&mut CartLine) -> CoreResult<()>,
        too_large: CoreError,
    ) -> CoreResult<()> {
        let line = self.line_mut(product_id)?;
        let previous = line.clone();
        edit(line)?;

        if self.gross_amount().is_none() {
            *self.line_mut(product_id)? = previous;
            return Err(too_large);
        }
        Ok(())
    }

    /// `Σ quantity × unit_price`, or `None` above [`MAX_CART_AMOUNT`].
    fn gross_amount(&self) -> Option<Money> {
        self.lines
            .iter()
            .try_fold(Money::zero(), |acc, line| {
                acc.checked_add(line.unit_price.checked_times(line.quantity)?)
            })
            .filter(|amount| *amount <= MAX_CART_AMOUNT)
    }

    /// Removes a line. Returns whether a line was present.
    pub fn remove(&mut self, product_id: ProductId) -> bool {
        let before = self.lines.len();
        self.lines.retain(|l| l.product_id() != product_id);
        self.lines.len() != before
    }

    pub fn clear(&mut self) {
        self.lines.clear();
    }

    /// Computes totals for the current lines.
    ///
    /// ## Formula
    /// ```text
    /// subtotal = Σ line_total
    /// Exclusive: tax = round(subtotal × rate)          total = subtotal + tax
    /// Inclusive: tax = subtotal − round(subtotal / (1 + rate))  total = subtotal
    /// ```
    pub fn totals(&self, pricing: &Pricing) -> CartTotals {
        let subtotal: Money = self.lines.iter().map(CartLine::line_total).sum();
        let discount: Money = self.lines.iter().map(CartLine::discount).sum();

        let (tax, total) = match pricing.tax_mode {
            TaxMode::Exclusive => {
                let tax = subtotal.exclusive_tax(pricing.tax_rate);
                (tax, subtotal + tax)
            }
            TaxMode::Inclusive => (subtotal.inclusive_tax(pricing.tax_rate), subtotal),
        };

        CartTotals {
            subtotal,
            discount,
            tax,
            total,
            item_count: self.lines.len(),
            unit_count: self.lines.iter().map(|l| l.quantity).sum(),
        }
    }
}

// =============================================================================
// Receipt
// =============================================================================

/// One line of a receipt, copied by value from the cart.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, TS)]
#[ts(export)]
pub struct ReceiptLine {
    pub product_id: ProductId,
    pub name: String,
    pub code: Option<String>,
    pub color: Option<String>,
    pub size: Option<String>,
    pub quantity: i64,
    pub unit_price: Money,
    pub discount_percent: u8,
    pub line_total: Money,
}

impl From<&CartLine> for ReceiptLine {
    fn from(line: &CartLine) -> Self {
        ReceiptLine {
            product_id: line.product.id,
            name: line.product.name.clone(),
            code: line.product.code.clone(),
            color: line.product.color.clone(),
            size: line.product.size.clone(),
            quantity: line.quantity,
            unit_price: line.unit_price,
            discount_percent: line.discount_percent,
            line_total: line.line_total(),
        }
    }
}

/// Immutable summary of a completed cart, handed to the report aggregator.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, TS)]
#[ts(export)]
pub struct Receipt {
    /// Globally unique id (UUID v4). Invoice numbers are for humans.
    pub receipt_id: String,
    #[ts(as = "String")]
    pub completed_at: DateTime<Utc>,
    pub lines: Vec<ReceiptLine>,
    pub totals: CartTotals,
    pub pricing: Pricing,
}

impl Receipt {
    /// Freezes the cart into a receipt.
    pub fn from_cart(cart: &Cart, pricing: Pricing) -> Self {
        Receipt {
            receipt_id: Uuid::new_v4().to_string(),
            completed_at: Utc::now(),
            lines: cart.lines().iter().map(ReceiptLine::from).collect(),
            totals: cart.totals(&pricing),
            pricing,
        }
    }
}

// =============================================================================
// Unit Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::ErrorKind;

    fn snapshot(id: i64, price: i64, stock: i64) -> ProductSnapshot {
        ProductSnapshot {
            id: ProductId::new(id),
            code: Some(format!("P-{:05}", id)),
            name: format!("Product {}", id),
            color: None,
            size: None,
            price: Money::from_minor(price),
            discount_percent: 0,
            stock,
            captured_at: Utc::now(),
        }
    }

    fn pricing() -> Pricing {
        Pricing::exclusive(TaxRate::from_bps(1200))
    }

    #[test]
    fn test_add_one_creates_then_increments() {
        let mut cart = Cart::new();
        let p = snapshot(1, 10_000, 5);

        assert_eq!(cart.add_one(&p).unwrap(), 1);
        assert_eq!(cart.add_one(&p).unwrap(), 2);
        assert_eq!(cart.lines().len(), 1);
        assert_eq!(cart.line(p.id).unwrap().unit_price.minor(), 10_000);
    }

    #[test]
    fn test_add_one_never_exceeds_snapshot_stock() {
        let mut cart = Cart::new();
        let p = snapshot(1, 500, 2);

        cart.add_one(&p).unwrap();
        cart.add_one(&p).unwrap();
        let before = cart.clone();

        let err = cart.add_one(&p).unwrap_err();
        assert_eq!(err.kind(), ErrorKind::InsufficientStock);
        assert_eq!(cart, before);
    }

    #[test]
    fn test_add_one_out_of_stock() {
        let mut cart = Cart::new();
        let err = cart.add_one(&snapshot(1, 500, 0)).unwrap_err();
        assert_eq!(err.kind(), ErrorKind::OutOfStock);
        assert!(cart.is_empty());
    }

    #[test]
    fn test_set_quantity_rules() {
        let mut cart = Cart::new();
        let p = snapshot(1, 500, 4);
        cart.add_one(&p).unwrap();

        cart.set_quantity(p.id, 4).unwrap();
        assert_eq!(cart.line(p.id).unwrap().quantity, 4);

        let err = cart.set_quantity(p.id, 5).unwrap_err();
        assert_eq!(err.kind(), ErrorKind::InsufficientStock);
        assert_eq!(cart.line(p.id).unwrap().quantity, 4);

        let err = cart.set_quantity(ProductId::new(99), 1).unwrap_err();
        assert_eq!(err.kind(), ErrorKind::NotInCart);

        cart.set_quantity(p.id, 0).unwrap();
        assert!(cart.is_empty());
    }

    #[test]
    fn test_set_unit_price_and_discount_validation() {
        let mut cart = Cart::new();
        let p = snapshot(1, 500, 4);
        cart.add_one(&p).unwrap();

        let err = cart.set_unit_price(p.id, Money::from_minor(-1)).unwrap_err();
        assert_eq!(err.kind(), ErrorKind::InvalidPrice);
        cart.set_unit_price(p.id, Money::zero()).unwrap();

        let err = cart.apply_discount(p.id, 120).unwrap_err();
        assert_eq!(err.kind(), ErrorKind::InvalidDiscount);
        assert_eq!(cart.line(p.id).unwrap().discount_percent, 0);
    }

    #[test]
    fn test_totals_without_discount() {
        let mut cart = Cart::new();
        let p = snapshot(1, 10_000, 5);
        for _ in 0..3 {
            cart.add_one(&p).unwrap();
        }

        let totals = cart.totals(&pricing());
        assert_eq!(totals.subtotal.minor(), 30_000);
        assert_eq!(totals.tax.minor(), 3_600);
        assert_eq!(totals.total.minor(), 33_600);
        assert_eq!(totals.item_count, 1);
        assert_eq!(totals.unit_count, 3);
        assert_eq!(totals, cart.totals(&pricing()));
    }

    #[test]
    fn test_discount_reduces_chargeable_amount() {
        let mut cart = Cart::new();
        let shirt = snapshot(1, 10_000, 5);
        let hat = snapshot(2, 2_500, 5);
        cart.add_one(&shirt).unwrap();
        cart.add_one(&shirt).unwrap();
        cart.add_one(&hat).unwrap();
        cart.apply_discount(shirt.id, 10).unwrap();

        let totals = cart.totals(&pricing());
        assert_eq!(totals.discount.minor(), 2_000);
        assert_eq!(totals.subtotal.minor(), 18_000 + 2_500);
        assert_eq!(totals.tax.minor(), 2_460);
        assert_eq!(totals.total.minor(), 22_960);
    }

    #[test]
    fn test_inclusive_totals() {
        let mut cart = Cart::new();
        let p = snapshot(1, 11_200, 1);
        cart.add_one(&p).unwrap();

        let totals = cart.totals(&Pricing::inclusive(TaxRate::from_bps(1200)));
        assert_eq!(totals.subtotal.minor(), 11_200);
        assert_eq!(totals.tax.minor(), 1_200);
        assert_eq!(totals.total.minor(), 11_200);
    }

    #[test]
    fn test_receipt_copies_lines_in_order() {
        let mut cart = Cart::new();
        let a = snapshot(3, 100, 5);
        let b = snapshot(1, 200, 5);
        cart.add_one(&a).unwrap();
        cart.add_one(&b).unwrap();
        cart.add_one(&b).unwrap();

        let receipt = Receipt::from_cart(&cart, pricing());
        let ids: Vec<_> = receipt.lines.iter().map(|l| l.product_id.get()).collect();
        assert_eq!(ids, vec![3, 1]);
        assert_eq!(receipt.lines[1].line_total.minor(), 400);
        assert_eq!(receipt.totals.unit_count, 3);
        assert!(!receipt.receipt_id.is_empty());
    }

    #[test]
    fn test_oversized_price_is_rejected() {
        let mut cart = Cart::new();
        let p = snapshot(1, 10_000, 5);
        cart.add_one(&p).unwrap();
        cart.add_one(&p).unwrap();
        let before = cart.clone();

        let err = cart
            .set_unit_price(p.id, Money::from_minor(i64::MAX / 2 + 1))
            .unwrap_err();
        assert_eq!(err.kind(), ErrorKind::InvalidPrice);
        assert_eq!(cart, before);
        assert_eq!(cart.totals(&pricing()).subtotal.minor(), 20_000);
    }

    #[test]
    fn test_cart_amount_stays_bounded() {
        let mut cart = Cart::new();
        let p = snapshot(1, 1_000_000_000_000, i64::MAX);
        cart.add_one(&p).unwrap();

        cart.set_quantity(p.id, 1_000).unwrap();
        let err = cart.set_quantity(p.id, 1_001).unwrap_err();
        assert_eq!(err.kind(), ErrorKind::InvalidQuantity);
        assert_eq!(cart.line(p.id).unwrap().quantity, 1_000);

        let err = cart.add_one(&p).unwrap_err();
        assert_eq!(err.kind(), ErrorKind::InvalidQuantity);
        assert_eq!(cart.line(p.id).unwrap().quantity, 1_000);

        let err = cart.add_one(&snapshot(2, 1, 5)).unwrap_err();
        assert_eq!(err.kind(), ErrorKind::InvalidPrice);
        assert_eq!(cart.lines().len(), 1);

        let totals = cart.totals(&Pricing::exclusive(TaxRate::from_bps(10_000)));
        assert_eq!(totals.subtotal, MAX_CART_AMOUNT);
        assert_eq!(totals.total.minor(), 2 * MAX_CART_AMOUNT.minor());
    }

    #[test]
    fn test_remove_and_clear() {
        let mut cart = Cart::new();
        let p = snapshot(1, 100, 5);
        cart.add_one(&p).unwrap();

        assert!(cart.remove(p.id));
        assert!(!cart.remove(p.id));
        cart.clear();
        assert!(cart.is_empty());
    }
}
