//! # Printable Report
//!
//! Fixed-width text rendering of a day's report for the back office.
//!
//! ```rust,ignore
//! print!("{}", TextReport::new(&doc, "Rp "));
//! ```

use std::fmt;

use tally_core::Money;

use crate::document::{ReportDocument, SaleRecord, StoreMetadata};

const WIDTH: usize = 60;

/// A day's report laid out for printing, amounts in `currency_symbol`.
#[derive(Debug, Clone, Copy)]
pub struct TextReport<'a> {
    doc: &'a ReportDocument,
    currency_symbol: &'a str,
}

impl<'a> TextReport<'a> {
    pub fn new(doc: &'a ReportDocument, currency_symbol: &'a str) -> Self {
        TextReport {
            doc,
            currency_symbol,
        }
    }

    fn money(&self, amount: Money) -> tally_core::MoneyDisplay<'a> {
        amount.with_symbol(self.currency_symbol)
    }

    fn fmt_store(&self, f: &mut fmt::Formatter<'_>, store: &StoreMetadata) -> fmt::Result {
        let percent = (store.tax_rate * 10_000.0).round() / 100.0;
        let included = if store.tax_inclusive { " (Included)" } else { "" };

        writeln!(f, "{}", store.name)?;
        writeln!(f, "{}", store.address)?;
        writeln!(f, "Tel: {}", store.contact)?;
        writeln!(f, "Tax: {}%{}", percent, included)?;
        writeln!(f)
    }

    fn fmt_sale(&self, f: &mut fmt::Formatter<'_>, sale: &SaleRecord) -> fmt::Result {
        let dash = |v: Option<&str>| v.unwrap_or("-").to_string();

        writeln!(f)?;
        writeln!(f, "Transaction #{} - {}", sale.transaction_id, sale.timestamp)?;
        writeln!(f, "Invoice: {}", sale.invoice_number)?;
        writeln!(
            f,
            "Cashier: {}    Payment: {}",
            dash(sale.cashier.as_deref()),
            sale.payment_method
                .map(|m| m.to_string())
                .unwrap_or_else(|| "-".to_string())
        )?;
        writeln!(f, "{}", "-".repeat(WIDTH))?;

        for item in &sale.items {
            writeln!(f, "  {} ({})", item.product_name, dash(item.code.as_deref()))?;
            writeln!(
                f,
                "    Color: {}, Size: {}",
                item.color.as_deref().unwrap_or(""),
                item.size.as_deref().unwrap_or("")
            )?;
            if item.discount_percent > 0 {
                writeln!(f, "    Discount: {}%", item.discount_percent)?;
            }
            writeln!(
                f,
                "    Qty: {} @ {} = {}",
                item.quantity,
                self.money(item.unit_price),
                self.money(item.line_total)
            )?;
        }

        writeln!(f, "  Subtotal: {}", self.money(sale.subtotal))?;
        writeln!(f, "  Tax:      {}", self.money(sale.tax))?;
        writeln!(f, "  Total:    {}", self.money(sale.total))?;
        writeln!(
            f,
            "  Paid:     {}    Change: {}",
            self.money(sale.amount_paid.unwrap_or(Money::zero())),
            self.money(sale.change.unwrap_or(Money::zero()))
        )
    }
}

impl fmt::Display for TextReport<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let doc = self.doc;
        let rule = "=".repeat(WIDTH);

        writeln!(f, "{rule}")?;
        writeln!(f, "DAILY SALES REPORT")?;
        writeln!(f, "Date: {}", doc.date.format("%Y-%m-%d"))?;
        writeln!(f, "{rule}")?;
        writeln!(f)?;

        self.fmt_store(f, &doc.store)?;

        writeln!(f, "TRANSACTION DETAILS:")?;
        for sale in &doc.sales {
            self.fmt_sale(f, sale)?;
        }

        let summary = &doc.summary;
        writeln!(f)?;
        writeln!(f, "{rule}")?;
        writeln!(f, "DAILY SUMMARY")?;
        writeln!(f, "{rule}")?;
        writeln!(f, "Total Transactions: {}", summary.transaction_count)?;
        writeln!(f, "Total Units Sold:   {}", summary.total_units_sold)?;
        writeln!(f, "Total Sales:        {}", self.money(summary.total_sales))?;
        writeln!(f, "Total Tax:          {}", self.money(summary.total_tax))?;
        writeln!(f, "Total Revenue:      {}", self.money(summary.total_revenue))?;
        writeln!(f, "{rule}")
    }
}
