//! Report price schedule

use std::path::Path;

use anyhow::{bail, Result};
use clap::Parser;
use serde::Serialize;

use polirate_core::{PlatformConfig, PriceSchedule};

#[derive(Parser, Debug)]
pub struct PriceArgs {
    /// Price of this purchase number (1 = first report for a politician)
    #[arg(long, short = 'n', conflicts_with = "table")]
    pub number: Option<i64>,

    /// Print the first N purchase numbers
    #[arg(long, default_value_t = 12)]
    pub table: i64,

    /// Output JSON instead of text
    #[arg(long)]
    pub json: bool,
}

#[derive(Debug, Serialize, PartialEq, Eq)]
struct PriceRow {
    purchase_number: i64,
    price: i64,
}

fn rows(schedule: &PriceSchedule, args: &PriceArgs) -> Result<Vec<PriceRow>> {
    let range = match args.number {
        Some(n) if n < 1 => bail!("purchase number starts at 1, got {}", n),
        Some(n) => n..=n,
        None if args.table < 1 => bail!("--table must be at least 1"),
        None => 1..=args.table,
    };

    Ok(range
        .map(|n| PriceRow {
            purchase_number: n,
            price: schedule.price(n),
        })
        .collect())
}

/// 2000000 -> "2,000,000"
fn group_thousands(value: i64) -> String {
    let digits = value.unsigned_abs().to_string();
    let mut out = String::with_capacity(digits.len() + digits.len() / 3 + 1);
    if value < 0 {
        out.push('-');
    }
    for (i, ch) in digits.chars().enumerate() {
        if i > 0 && (digits.len() - i) % 3 == 0 {
            out.push(',');
        }
        out.push(ch);
    }
    out
}

pub fn run_price(config_path: Option<&Path>, args: PriceArgs) -> Result<()> {
    let config = PlatformConfig::load(config_path)?;
    let rows = rows(&config.reports, &args)?;

    if args.json {
        println!("{}", serde_json::to_string_pretty(&rows)?);
        return Ok(());
    }

    for row in rows {
        println!(
            "#{:<3} {:>12} KRW",
            row.purchase_number,
            group_thousands(row.price)
        );
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn args(number: Option<i64>, table: i64) -> PriceArgs {
        PriceArgs {
            number,
            table,
            json: false,
        }
    }

    #[test]
    fn table_hits_floor() {
        let rows = rows(&PriceSchedule::default(), &args(None, 12)).unwrap();
        assert_eq!(rows.len(), 12);
        assert_eq!(rows[0].price, 2_000_000);
        assert_eq!(rows[1].price, 1_900_000);
        assert_eq!(rows[10].price, 1_000_000);
        assert_eq!(rows[11].price, 1_000_000);
    }

    #[test]
    fn single_number() {
        let rows = rows(&PriceSchedule::default(), &args(Some(4), 12)).unwrap();
        assert_eq!(
            rows,
            vec![PriceRow {
                purchase_number: 4,
                price: 1_700_000
            }]
        );
        assert!(super::rows(&PriceSchedule::default(), &args(Some(0), 12)).is_err());
    }

    #[test]
    fn thousands() {
        assert_eq!(group_thousands(2_000_000), "2,000,000");
        assert_eq!(group_thousands(999), "999");
        assert_eq!(group_thousands(1_000), "1,000");
    }
}
