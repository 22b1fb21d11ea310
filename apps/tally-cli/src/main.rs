//! `tally`: register and back-office commands for a Tally POS shop.
//!
//! # Usage
//!
//! ```text
//! tally stock kaos
//! tally add-product --name "Kaos Polos" --color Black --size M --price 100.00 --stock 5
//! tally sell KP-BLK-M:3 --payment cash --paid 400.00
//! tally report text --date 2024-05-01
//! ```

use std::path::PathBuf;
use std::process::ExitCode;

use chrono::{Local, NaiveDate};
use clap::{Parser, Subcommand};
use serde::Serialize;
use tally_cli::{init_tracing, AppConfig, AppError, AppResult, ErrorReport, Register};
use tally_core::{CartEngine, CoreError, Money, NewProduct, PaymentMethod, Product, ProductId};
use tally_db::{Database, DbConfig};
use tally_report::{ReportAggregator, SaleMetadata};
use tracing::{debug, error, warn};

// ─── CLI args ─────────────────────────────────────────────────────────────────

#[derive(Parser, Debug)]
#[command(name = "tally", about = "Point of sale and stock ledger for a small shop")]
struct Args {
    /// SQLite catalog file.
    #[arg(long, env = "TALLY_DB_PATH", value_name = "FILE")]
    db: Option<PathBuf>,

    /// Directory for daily sales reports.
    #[arg(long, env = "TALLY_REPORTS_DIR", value_name = "DIR")]
    reports: Option<PathBuf>,

    /// Print machine-readable JSON instead of tables.
    #[arg(long, global = true)]
    json: bool,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// List products, optionally filtered by id, code or name.
    Stock { query: Option<String> },

    /// Add a product. Opening stock is written to the ledger.
    AddProduct {
        #[arg(long)]
        name: String,
        /// Leave out to generate one.
        #[arg(long)]
        code: Option<String>,
        #[arg(long)]
        color: Option<String>,
        #[arg(long)]
        size: Option<String>,
        #[arg(long, value_parser = parse_money)]
        price: Money,
        #[arg(long, default_value_t = 0)]
        discount: u8,
        #[arg(long, default_value_t = 0)]
        stock: i64,
    },

    /// Add units to a product.
    Restock { product: String, quantity: i64 },

    /// Show stock ledger entries.
    Ledger {
        #[arg(long)]
        product: Option<String>,
    },

    /// List products whose stock disagrees with the ledger.
    Reconcile,

    /// Ring up a sale: each item is `ID_OR_CODE[:QTY]`.
    Sell {
        #[arg(required = true)]
        items: Vec<String>,
        /// Line discount, `ID_OR_CODE=PERCENT`. Repeatable.
        #[arg(long = "discount", value_parser = parse_pair::<u8>)]
        discounts: Vec<(String, u8)>,
        /// Unit price override, `ID_OR_CODE=AMOUNT`. Repeatable.
        #[arg(long = "price", value_parser = parse_price_pair)]
        prices: Vec<(String, Money)>,
        #[arg(long)]
        payment: Option<PaymentMethod>,
        #[arg(long, value_parser = parse_money)]
        paid: Option<Money>,
        #[arg(long, env = "TALLY_CASHIER")]
        cashier: Option<String>,
        /// Overrides the generated invoice number.
        #[arg(long)]
        invoice: Option<String>,
    },

    /// Daily sales reports.
    Report {
        #[command(subcommand)]
        action: ReportCommand,
    },
}

#[derive(Subcommand, Debug)]
enum ReportCommand {
    /// Summary of one day (today by default).
    Show {
        #[arg(long)]
        date: Option<NaiveDate>,
    },
    /// Printable report.
    Text {
        #[arg(long)]
        date: Option<NaiveDate>,
    },
    /// Regenerate the CSV export.
    Csv {
        #[arg(long)]
        date: Option<NaiveDate>,
    },
    /// Units sold and revenue per product.
    Changes {
        #[arg(long)]
        date: Option<NaiveDate>,
    },
    /// Dates that have a report.
    List,
}

// ─── Entry point ──────────────────────────────────────────────────────────────

#[tokio::main]
async fn main() -> ExitCode {
    init_tracing();
    let args = Args::parse();
    let json = args.json;

    match run(args).await {
        Ok(()) => ExitCode::SUCCESS,
        Err(err) => {
            error!(kind = ?err.kind(), "{err}");
            if json {
                match serde_json::to_string(&ErrorReport::from(&err)) {
                    Ok(line) => eprintln!("{line}"),
                    Err(_) => eprintln!("error: {err}"),
                }
            } else {
                eprintln!("error: {err}");
            }
            ExitCode::FAILURE
        }
    }
}

struct Context {
    config: AppConfig,
    db: Database,
    json: bool,
}

impl Context {
    fn reports(&self) -> AppResult<ReportAggregator> {
        Ok(
            ReportAggregator::open(&self.config.reports_dir, self.config.store_info())?
                .with_currency_symbol(&self.config.currency_symbol),
        )
    }

    fn money(&self, amount: Money) -> String {
        self.config.format_currency(amount)
    }

    /// Prints `value` as JSON in `--json` mode, otherwise runs `human`.
    fn emit<T: Serialize>(&self, value: &T, human: impl FnOnce()) -> AppResult<()> {
        if self.json {
            println!("{}", serde_json::to_string_pretty(value)?);
        } else {
            human();
        }
        Ok(())
    }
}

async fn run(args: Args) -> AppResult<()> {
    // CLI flags override environment, which overrides defaults.
    let mut config = AppConfig::from_env();
    if let Some(db) = args.db {
        config.db_path = db;
    }
    if let Some(reports) = args.reports {
        config.reports_dir = reports;
    }
    debug!(db = %config.db_path.display(), reports = %config.reports_dir.display(), "Configuration loaded");

    if let Some(parent) = config.db_path.parent() {
        if !parent.as_os_str().is_empty() {
            std::fs::create_dir_all(parent)?;
        }
    }
    let db = Database::new(DbConfig::new(&config.db_path)).await?;

    let ctx = Context {
        config,
        db,
        json: args.json,
    };

    let result = dispatch(&ctx, args.command).await;
    ctx.db.close().await;
    result
}

async fn dispatch(ctx: &Context, command: Command) -> AppResult<()> {
    match command {
        Command::Stock { query } => stock(ctx, query.as_deref()).await,
        Command::AddProduct {
            name,
            code,
            color,
            size,
            price,
            discount,
            stock,
        } => {
            let product = ctx
                .db
                .products()
                .insert(&NewProduct {
                    code,
                    name,
                    color,
                    size,
                    price,
                    discount_percent: discount,
                    stock,
                })
                .await?;
            ctx.emit(&product, || {
                println!(
                    "Added #{} {} ({}) at {}, stock {}",
                    product.id,
                    product.name,
                    product.code.as_deref().unwrap_or("-"),
                    ctx.money(product.price),
                    product.stock
                )
            })
        }
        Command::Restock { product, quantity } => {
            let id = resolve_product(&ctx.db, &product).await?.id;
            let product = ctx.db.products().increase_stock(id, quantity).await?;
            ctx.emit(&product, || {
                println!("{} now has {} in stock", product.name, product.stock)
            })
        }
        Command::Ledger { product } => {
            let id = match product {
                Some(ident) => Some(resolve_product(&ctx.db, &ident).await?.id),
                None => None,
            };
            let entries = ctx.db.ledger().entries(id).await?;
            ctx.emit(&entries, || {
                println!("{:>6}  {:>7}  {:<8}  {:>6}  {}", "ENTRY", "PRODUCT", "ACTION", "QTY", "AT");
                for entry in &entries {
                    println!(
                        "{:>6}  {:>7}  {:<8}  {:>+6}  {}",
                        entry.id,
                        entry.product_id,
                        entry.action,
                        entry.quantity,
                        entry.created_at.format("%Y-%m-%d %H:%M:%S")
                    );
                }
            })
        }
        Command::Reconcile => {
            let drift = ctx.db.ledger().reconcile().await?;
            ctx.emit(&drift, || {
                if drift.is_empty() {
                    println!("Stock matches the ledger for every product");
                }
                for row in &drift {
                    println!(
                        "#{} {}: stock {} but ledger says {}",
                        row.product_id, row.name, row.stock, row.ledger_total
                    );
                }
            })
        }
        Command::Sell {
            items,
            discounts,
            prices,
            payment,
            paid,
            cashier,
            invoice,
        } => {
            let metadata = SaleMetadata {
                cashier,
                payment_method: payment,
                amount_paid: paid,
                change: None,
                invoice_number: invoice,
            };
            sell(ctx, &items, &discounts, &prices, metadata).await
        }
        Command::Report { action } => report(ctx, action),
    }
}

// ─── Catalog ──────────────────────────────────────────────────────────────────

async fn stock(ctx: &Context, query: Option<&str>) -> AppResult<()> {
    let products = match query {
        Some(q) => ctx.db.products().search(q).await?,
        None => ctx.db.products().list().await?,
    };

    ctx.emit(&products, || {
        println!(
            "{:>5}  {:<12}  {:<28}  {:<10}  {:<5}  {:>12}  {:>5}",
            "ID", "CODE", "NAME", "COLOR", "SIZE", "PRICE", "STOCK"
        );
        for p in &products {
            println!(
                "{:>5}  {:<12}  {:<28}  {:<10}  {:<5}  {:>12}  {:>5}",
                p.id,
                p.code.as_deref().unwrap_or("-"),
                p.name,
                p.color.as_deref().unwrap_or(""),
                p.size.as_deref().unwrap_or(""),
                ctx.money(p.price),
                p.stock
            );
        }
    })
}

/// Finds a product by numeric id, then by code.
async fn resolve_product(db: &Database, identifier: &str) -> AppResult<Product> {
    let by_id = match identifier.trim().parse::<ProductId>() {
        Ok(id) => db.products().get_by_id(id).await?,
        Err(_) => None,
    };
    let found = match by_id {
        Some(product) => Some(product),
        None => db.products().get_by_code(identifier).await?,
    };
    found.ok_or_else(|| CoreError::ProductNotFound(identifier.to_string()).into())
}

// ─── Sale ─────────────────────────────────────────────────────────────────────

#[derive(Serialize)]
struct SaleView<'a> {
    receipt: &'a tally_core::Receipt,
    invoice_number: Option<&'a str>,
    change: Option<Money>,
    warning: Option<String>,
}

async fn sell(
    ctx: &Context,
    items: &[String],
    discounts: &[(String, u8)],
    prices: &[(String, Money)],
    metadata: SaleMetadata,
) -> AppResult<()> {
    let engine = CartEngine::load(ctx.db.clone(), ctx.config.pricing()).await?;
    let mut register =
        Register::new(engine, ctx.reports()?).with_cashier(ctx.config.cashier.clone());

    for item in items {
        let (identifier, quantity) = parse_item(item).map_err(AppError::usage)?;
        let scanned = register.engine_mut().scan(identifier)?;
        if quantity > 1 {
            register
                .engine_mut()
                .set_quantity(scanned.product.id, scanned.quantity + quantity - 1)?;
        }
    }

    for (identifier, percent) in discounts {
        let id = cart_product(&register, identifier)?;
        register.engine_mut().apply_discount(id, *percent)?;
    }
    for (identifier, price) in prices {
        let id = cart_product(&register, identifier)?;
        register.engine_mut().set_unit_price(id, *price)?;
    }

    let outcome = register.complete_sale(metadata).await?;
    let recorded = outcome.recorded();
    let change = outcome.metadata.amount_paid.map(|paid| paid.saturating_sub(outcome.receipt.totals.total));
    let warning = outcome.warning();

    if let Some(message) = &warning {
        warn!("{message}");
    }

    ctx.emit(
        &SaleView {
            receipt: &outcome.receipt,
            invoice_number: recorded.map(|r| r.invoice_number.as_str()),
            change,
            warning: warning.clone(),
        },
        || {
            let receipt = &outcome.receipt;
            if let Some(recorded) = recorded {
                println!("Invoice {}", recorded.invoice_number);
            }
            for line in &receipt.lines {
                let discount = if line.discount_percent > 0 {
                    format!(" -{}%", line.discount_percent)
                } else {
                    String::new()
                };
                println!(
                    "  {:<28} {:>3} x {:>12}{:<5} {:>12}",
                    line.name,
                    line.quantity,
                    ctx.money(line.unit_price),
                    discount,
                    ctx.money(line.line_total)
                );
            }
            let totals = &receipt.totals;
            println!("  Subtotal {:>12}", ctx.money(totals.subtotal));
            println!("  Tax      {:>12}", ctx.money(totals.tax));
            println!("  Total    {:>12}", ctx.money(totals.total));
            if let Some(change) = change {
                println!("  Change   {:>12}", ctx.money(change));
            }
            if let Some(message) = &warning {
                eprintln!("warning: {message}");
            }
        },
    )
}

fn cart_product(register: &Register<Database>, identifier: &str) -> AppResult<ProductId> {
    let id = register
        .engine()
        .lookup(identifier)
        .map(|p| p.id)
        .ok_or_else(|| CoreError::ProductNotFound(identifier.to_string()))?;
    match register.engine().cart().line(id) {
        Some(_) => Ok(id),
        None => Err(CoreError::NotInCart(id).into()),
    }
}

// ─── Reports ──────────────────────────────────────────────────────────────────

fn report(ctx: &Context, action: ReportCommand) -> AppResult<()> {
    let reports = ctx.reports()?;
    let today = || Local::now().date_naive();

    match action {
        ReportCommand::Show { date } => {
            let doc = reports.get_report(date.unwrap_or_else(today))?;
            ctx.emit(&doc, || {
                let s = &doc.summary;
                println!("{} ({})", doc.date, doc.store.name);
                println!("  Transactions {:>6}", s.transaction_count);
                println!("  Units sold   {:>6}", s.total_units_sold);
                println!("  Sales        {:>12}", ctx.money(s.total_sales));
                println!("  Tax          {:>12}", ctx.money(s.total_tax));
                println!("  Revenue      {:>12}", ctx.money(s.total_revenue));
            })
        }
        ReportCommand::Text { date } => {
            print!("{}", reports.render_text(date.unwrap_or_else(today))?);
            Ok(())
        }
        ReportCommand::Csv { date } => {
            let path = reports.export_csv(date.unwrap_or_else(today))?;
            ctx.emit(&path, || println!("{}", path.display()))
        }
        ReportCommand::Changes { date } => {
            let changes = reports.stock_changes(date.unwrap_or_else(today))?;
            ctx.emit(&changes, || {
                for (id, change) in &changes {
                    println!(
                        "{:>5}  {:<28}  {:>5}  {:>12}",
                        id,
                        change.product_name,
                        change.quantity_sold,
                        ctx.money(change.revenue)
                    );
                }
            })
        }
        ReportCommand::List => {
            let dates = reports.list_report_dates()?;
            ctx.emit(&dates, || {
                for date in &dates {
                    println!("{date}");
                }
            })
        }
    }
}

// ─── Argument parsing ─────────────────────────────────────────────────────────

/// `"100"`, `"100.5"` or `"100.50"` into minor units.
fn parse_money(raw: &str) -> Result<Money, String> {
    let raw = raw.trim();
    let (whole, frac) = raw.split_once('.').unwrap_or((raw, ""));

    let digits = |s: &str| s.chars().all(|c| c.is_ascii_digit());
    if (whole.is_empty() && frac.is_empty()) || !digits(whole) || !digits(frac) || frac.len() > 2
    {
        return Err(format!("'{raw}' is not an amount like 125.00"));
    }

    let whole: i64 = if whole.is_empty() {
        0
    } else {
        whole.parse().map_err(|_| format!("'{raw}' is too large"))?
    };
    let cents: i64 = match frac.len() {
        0 => 0,
        1 => frac.parse::<i64>().map_err(|e| e.to_string())? * 10,
        _ => frac.parse().map_err(|e: std::num::ParseIntError| e.to_string())?,
    };

    whole
        .checked_mul(100)
        .and_then(|m| m.checked_add(cents))
        .map(Money::from_minor)
        .ok_or_else(|| format!("'{raw}' is too large"))
}

/// `KEY=VALUE`
fn parse_pair<T>(raw: &str) -> Result<(String, T), String>
where
    T: std::str::FromStr,
    T::Err: std::fmt::Display,
{
    let (key, value) = raw
        .split_once('=')
        .ok_or_else(|| format!("expected ID_OR_CODE=VALUE, got '{raw}'"))?;
    let value = value.trim().parse::<T>().map_err(|e| e.to_string())?;
    Ok((key.trim().to_string(), value))
}

fn parse_price_pair(raw: &str) -> Result<(String, Money), String> {
    let (key, value) = raw
        .split_once('=')
        .ok_or_else(|| format!("expected ID_OR_CODE=AMOUNT, got '{raw}'"))?;
    Ok((key.trim().to_string(), parse_money(value)?))
}

/// `ID_OR_CODE[:QTY]`
fn parse_item(raw: &str) -> Result<(&str, i64), String> {
    match raw.rsplit_once(':') {
        Some((identifier, qty)) => {
            let quantity = qty
                .trim()
                .parse::<i64>()
                .map_err(|_| format!("bad quantity in '{raw}'"))?;
            if quantity <= 0 {
                return Err(format!("quantity must be positive in '{raw}'"));
            }
            Ok((identifier.trim(), quantity))
        }
        None => Ok((raw.trim(), 1)),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_money() {
        assert_eq!(parse_money("100").unwrap().minor(), 10_000);
        assert_eq!(parse_money("100.5").unwrap().minor(), 10_050);
        assert_eq!(parse_money("0.07").unwrap().minor(), 7);
        assert_eq!(parse_money(".5").unwrap().minor(), 50);
        assert!(parse_money("-1").is_err());
        assert!(parse_money("1.234").is_err());
        assert!(parse_money("abc").is_err());
        assert!(parse_money("").is_err());
    }

    #[test]
    fn test_parse_item() {
        assert_eq!(parse_item("KP-BLK-M").unwrap(), ("KP-BLK-M", 1));
        assert_eq!(parse_item("KP-BLK-M:3").unwrap(), ("KP-BLK-M", 3));
        assert_eq!(parse_item("7:2").unwrap(), ("7", 2));
        assert!(parse_item("KP:0").is_err());
        assert!(parse_item("KP:x").is_err());
    }

    #[test]
    fn test_parse_pairs() {
        assert_eq!(parse_pair::<u8>("KP-BLK-M=10").unwrap(), ("KP-BLK-M".to_string(), 10));
        assert!(parse_pair::<u8>("KP-BLK-M").is_err());
        assert!(parse_pair::<u8>("KP=300").is_err());

        let (key, price) = parse_price_pair("3=80.00").unwrap();
        assert_eq!(key, "3");
        assert_eq!(price.minor(), 8_000);
    }

    #[test]
    fn test_cli_parses_sell() {
        let args = Args::try_parse_from([
            "tally", "sell", "KP-BLK-M:3", "TOPI-01", "--discount", "KP-BLK-M=10", "--payment",
            "qris", "--paid", "400",
        ])
        .unwrap();

        match args.command {
            Command::Sell {
                items,
                discounts,
                payment,
                paid,
                ..
            } => {
                assert_eq!(items, vec!["KP-BLK-M:3", "TOPI-01"]);
                assert_eq!(discounts, vec![("KP-BLK-M".to_string(), 10)]);
                assert_eq!(payment, Some(PaymentMethod::EWallet));
                assert_eq!(paid.map(|m| m.minor()), Some(40_000));
            }
            other => panic!("unexpected command {other:?}"),
        }
    }
}
