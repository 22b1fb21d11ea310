//! # Seed Data Generator
//!
//! Populates the database with a demo clothing catalog.
//!
//! ## Usage
//! ```bash
//! # Default catalog into ./tally_dev.db
//! cargo run -p tally-db --bin seed
//!
//! # Specify database path
//! cargo run -p tally-db --bin seed -- --db ./data/tally.db
//! ```
//!
//! Every garment is generated in each color and size, with an opening
//! stock that is logged as a restock entry like any other insert.

use std::path::PathBuf;

use clap::Parser;
use tally_core::{Money, NewProduct};
use tally_db::{Database, DbConfig};

/// (code prefix, name, base price in minor units)
const GARMENTS: &[(&str, &str, i64)] = &[
    ("KP", "Kaos Polos", 10_000),
    ("KM", "Kemeja Flanel", 18_500),
    ("CC", "Celana Chino", 25_000),
    ("JK", "Jaket Denim", 42_000),
    ("HD", "Hoodie", 35_000),
    ("TP", "Topi Baseball", 7_500),
];

const COLORS: &[(&str, &str)] = &[("BLK", "Black"), ("WHT", "White"), ("NVY", "Navy")];

/// (size, price addon)
const SIZES: &[(&str, i64)] = &[("S", 0), ("M", 0), ("L", 1_000), ("XL", 2_000)];

/// Tally POS Seed Data Generator
#[derive(Debug, Parser)]
#[command(name = "seed", about = "Loads a demo clothing catalog")]
struct Args {
    /// Database file path
    #[arg(short, long, env = "TALLY_DB_PATH", default_value = "./tally_dev.db")]
    db: PathBuf,
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let args = Args::parse();

    println!("Tally POS Seed Data Generator");
    println!("=============================");
    println!("Database: {}", args.db.display());
    println!();

    let db = Database::new(DbConfig::new(&args.db)).await?;
    println!("✓ Connected to database, migrations applied");

    let existing = db.products().count().await?;
    if existing > 0 {
        println!("⚠ Database already has {} products", existing);
        println!("  Skipping seed to avoid duplicates.");
        return Ok(());
    }

    let mut generated = 0usize;
    for (g, (prefix, name, base_price)) in GARMENTS.iter().enumerate() {
        for (c, (color_code, color)) in COLORS.iter().enumerate() {
            for (s, (size, addon)) in SIZES.iter().enumerate() {
                let product = NewProduct {
                    code: Some(format!("{}-{}-{}", prefix, color_code, size)),
                    name: name.to_string(),
                    color: Some(color.to_string()),
                    size: Some(size.to_string()),
                    price: Money::from_minor(base_price + addon),
                    discount_percent: 0,
                    stock: ((g * 7 + c * 5 + s * 3) % 12) as i64,
                };

                if let Err(e) = db.products().insert(&product).await {
                    eprintln!("Failed to insert {:?}: {}", product.code, e);
                    continue;
                }
                generated += 1;
            }
        }
    }

    println!("✓ Generated {} products", generated);

    let drift = db.ledger().reconcile().await?;
    println!("✓ Ledger reconciled ({} mismatches)", drift.len());

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_args_db_flag() {
        let args = Args::try_parse_from(["seed", "-d", "./data/tally.db"]).unwrap();
        assert_eq!(args.db, PathBuf::from("./data/tally.db"));

        let args = Args::try_parse_from(["seed", "--db", "shop.db"]).unwrap();
        assert_eq!(args.db, PathBuf::from("shop.db"));

        assert!(Args::try_parse_from(["seed", "--bogus"]).is_err());
    }
}
