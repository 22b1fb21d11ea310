//! # CSV Export
//!
//! Flattens a day's report into one row per sold line, repeating the
//! transaction fields on every row.

use std::io;
use std::path::Path;

use serde::Serialize;
use tally_core::{Money, PaymentMethod, ProductId};

use crate::document::ReportDocument;
use crate::error::ReportResult;

/// Column order of the export. Field order of [`CsvRow`] must match.
pub const CSV_HEADER: [&str; 18] = [
    "invoice_number",
    "timestamp",
    "transaction_id",
    "cashier",
    "payment_method",
    "product_id",
    "product_name",
    "code",
    "color",
    "size",
    "quantity",
    "unit_price",
    "line_total",
    "subtotal",
    "tax",
    "total",
    "amount_paid",
    "change",
];

#[derive(Debug, Serialize)]
struct CsvRow<'a> {
    invoice_number: &'a str,
    timestamp: &'a str,
    transaction_id: u32,
    cashier: Option<&'a str>,
    payment_method: Option<PaymentMethod>,
    product_id: ProductId,
    product_name: &'a str,
    code: Option<&'a str>,
    color: Option<&'a str>,
    size: Option<&'a str>,
    quantity: i64,
    unit_price: Money,
    line_total: Money,
    subtotal: Money,
    tax: Money,
    total: Money,
    amount_paid: Option<Money>,
    change: Option<Money>,
}

/// Writes the CSV view of `doc` to any writer.
pub fn write_csv<W: io::Write>(doc: &ReportDocument, out: W) -> ReportResult<()> {
    let mut writer = csv::WriterBuilder::new()
        .has_headers(false)
        .from_writer(out);
    writer.write_record(CSV_HEADER)?;

    for sale in &doc.sales {
        for item in &sale.items {
            writer.serialize(CsvRow {
                invoice_number: &sale.invoice_number,
                timestamp: &sale.timestamp,
                transaction_id: sale.transaction_id,
                cashier: sale.cashier.as_deref(),
                payment_method: sale.payment_method,
                product_id: item.product_id,
                product_name: &item.product_name,
                code: item.code.as_deref(),
                color: item.color.as_deref(),
                size: item.size.as_deref(),
                quantity: item.quantity,
                unit_price: item.unit_price,
                line_total: item.line_total,
                subtotal: sale.subtotal,
                tax: sale.tax,
                total: sale.total,
                amount_paid: sale.amount_paid,
                change: sale.change,
            })?;
        }
    }

    writer.flush()?;
    Ok(())
}

/// Writes the CSV view of `doc` to `path`.
pub fn write_csv_file(doc: &ReportDocument, path: &Path) -> ReportResult<()> {
    let file = std::fs::File::create(path)?;
    write_csv(doc, io::BufWriter::new(file))
}
