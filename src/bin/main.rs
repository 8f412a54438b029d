// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2025 Daniel Negri
//
// This program is free software: you can redistribute it and/or modify
// it under the terms of the GNU Affero General Public License as published by
// the Free Software Foundation, either version 3 of the License, or
// (at your option) any later version.
//
// This program is distributed in the hope that it will be useful,
// but WITHOUT ANY WARRANTY; without even the implied warranty of
// MERCHANTABILITY or FITNESS FOR A PARTICULAR PURPOSE. See the
// GNU Affero General Public License for more details.
//
// You should have received a copy of the GNU Affero General Public License
// along with this program. If not, see <https://www.gnu.org/licenses/>.

use clap::Parser;
use crossbeam::channel;
use csv::{ReaderBuilder, Trim, Writer};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use std::error::Error;
use std::fs::File;
use std::io::{BufReader, Read, Write};
use std::path::PathBuf;
use std::process;
use till_demo_rs::denomination::from_minor_units;
use till_demo_rs::{Denomination, Till, TillConfig, TillError, logging, settle, settle_atomic};
use tracing::{info, warn};

/// Till Demo - Settle a batch of sales against one shared till
///
/// Reads sales from a CSV file and writes the change for each to stdout.
#[derive(Parser, Debug)]
#[command(name = "till-demo-rs")]
#[command(about = "Settles point-of-sale payments against a shared till", long_about = None)]
struct Args {
    /// Path to CSV file with sales
    ///
    /// Expected format: owed,inserted
    /// Example: 1000,2000 500
    #[arg(value_name = "FILE")]
    input: PathBuf,

    /// TOML file with the initial till stock (default: ten of each denomination)
    #[arg(short, long, value_name = "FILE")]
    config: Option<PathBuf>,

    /// Number of threads settling concurrently
    #[arg(short, long, default_value_t = 1)]
    workers: usize,

    /// Deposit and withdraw under a single till lock
    #[arg(long)]
    atomic: bool,

    /// Debug-level logging
    #[arg(short, long)]
    verbose: bool,
}

fn main() {
    let args = Args::parse();
    logging::init(args.verbose);

    let config = match &args.config {
        Some(path) => match TillConfig::from_path(path) {
            Ok(config) => config,
            Err(e) => {
                eprintln!("Error loading config '{}': {}", path.display(), e);
                process::exit(1);
            }
        },
        None => TillConfig::default(),
    };

    let till = match config.build_till() {
        Ok(till) => till,
        Err(e) => {
            eprintln!("Error building till: {}", e);
            process::exit(1);
        }
    };

    let file = match File::open(&args.input) {
        Ok(f) => f,
        Err(e) => {
            eprintln!("Error opening file '{}': {}", args.input.display(), e);
            process::exit(1);
        }
    };

    let sales = match read_sales(BufReader::new(file)) {
        Ok(sales) => sales,
        Err(e) => {
            eprintln!("Error reading sales: {}", e);
            process::exit(1);
        }
    };

    let outcomes = match settle_all(&till, sales, args.workers, args.atomic) {
        Ok(outcomes) => outcomes,
        Err(e) => {
            eprintln!("Error settling sales: {}", e);
            process::exit(1);
        }
    };

    if let Err(e) = write_outcomes(&outcomes, std::io::stdout()) {
        eprintln!("Error writing output: {}", e);
        process::exit(1);
    }

    for (denomination, count) in till.inventory().iter().rev() {
        info!(denomination = %denomination, count, "till stock");
    }
    info!(total = %Decimal::new(till.total_value(), 2), "till total");
}

/// Raw CSV record matching the input format.
///
/// Fields: `owed, inserted`
#[derive(Debug, Deserialize)]
struct SaleRecord {
    owed: i64,
    #[serde(default)]
    inserted: String,
}

/// One sale to settle. `inserted` is still raw minor units.
#[derive(Debug, Clone, PartialEq, Eq)]
struct Sale {
    row: usize,
    owed: i64,
    inserted: Vec<u32>,
}

#[derive(Debug)]
struct Outcome {
    row: usize,
    result: Result<Vec<Denomination>, TillError>,
}

#[derive(Debug, Serialize)]
struct OutcomeRecord<'a> {
    row: usize,
    status: &'a str,
    change: String,
}

/// Reads sales from CSV.
///
/// Rows that do not parse are skipped with a warning.
///
/// # CSV Format
///
/// ```csv
/// owed,inserted
/// 1000,2000
/// 750,500 200 50
/// 0,
/// ```
fn read_sales<R: Read>(reader: R) -> Result<Vec<Sale>, csv::Error> {
    let mut rdr = ReaderBuilder::new()
        .trim(Trim::All)
        .flexible(true)
        .has_headers(true)
        .from_reader(reader);

    let mut sales = Vec::new();
    for (i, result) in rdr.deserialize::<SaleRecord>().enumerate() {
        let row = i + 1;
        let record = match result {
            Ok(record) => record,
            Err(e) => {
                warn!(row, error = %e, "skipping malformed row");
                continue;
            }
        };

        let inserted = record
            .inserted
            .split_whitespace()
            .map(str::parse::<u32>)
            .collect::<Result<Vec<_>, _>>();
        match inserted {
            Ok(inserted) => sales.push(Sale {
                row,
                owed: record.owed,
                inserted,
            }),
            Err(e) => warn!(row, error = %e, "skipping row with unreadable denominations"),
        }
    }

    Ok(sales)
}

fn settle_one(till: &Till, sale: &Sale, atomic: bool) -> Result<Vec<Denomination>, TillError> {
    let inserted = from_minor_units(&sale.inserted)?;
    if atomic {
        settle_atomic(till, sale.owed, &inserted)
    } else {
        settle(till, sale.owed, &inserted)
    }
}

/// Settles every sale on `workers` threads sharing `till`.
///
/// Outcomes come back in row order.
fn settle_all(
    till: &Till,
    sales: Vec<Sale>,
    workers: usize,
    atomic: bool,
) -> Result<Vec<Outcome>, Box<dyn Error>> {
    let (job_tx, job_rx) = channel::unbounded::<Sale>();
    let (out_tx, out_rx) = channel::unbounded::<Outcome>();

    for sale in sales {
        job_tx.send(sale)?;
    }
    drop(job_tx);

    crossbeam::scope(|scope| {
        for _ in 0..workers.max(1) {
            let jobs = job_rx.clone();
            let out = out_tx.clone();
            scope.spawn(move |_| {
                for sale in jobs.iter() {
                    let result = settle_one(till, &sale, atomic);
                    // Receiver outlives the scope.
                    let _ = out.send(Outcome {
                        row: sale.row,
                        result,
                    });
                }
            });
        }
    })
    .map_err(|_| "settlement worker panicked")?;
    drop(out_tx);

    let mut outcomes: Vec<Outcome> = out_rx.iter().collect();
    outcomes.sort_by_key(|o| o.row);
    Ok(outcomes)
}

/// Writes one CSV row per outcome.
///
/// # CSV Format
///
/// ```csv
/// row,status,change
/// 1,ok,1000
/// 2,insufficient_funds,
/// ```
fn write_outcomes<W: Write>(outcomes: &[Outcome], writer: W) -> Result<(), csv::Error> {
    let mut wtr = Writer::from_writer(writer);

    for outcome in outcomes {
        let (status, change) = match &outcome.result {
            Ok(change) => ("ok", join_units(change)),
            Err(e) => (e.code(), String::new()),
        };
        wtr.serialize(OutcomeRecord {
            row: outcome.row,
            status,
            change,
        })?;
    }

    wtr.flush()?;
    Ok(())
}

fn join_units(units: &[Denomination]) -> String {
    units
        .iter()
        .map(|d| d.value().to_string())
        .collect::<Vec<_>>()
        .join(" ")
}
