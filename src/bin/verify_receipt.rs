//! Receipt verifier
//!
//! Usage: `verify-receipt <receipt>`
//!
//! Prints the event the receipt was issued for and exits 0, or prints
//! `Receipt not valid` and exits 1. Usage and load errors exit 2.

use std::process::ExitCode;

use anyhow::Context;
use chrono::Utc;
use tracing::{error, info};
use tracing_subscriber::{EnvFilter, FmtSubscriber};

use survey_receipts::{
    receipt::{verify_receipt, Freshness},
    store::load_verification_table,
    IssuerConfig, Receipt,
};

const USAGE: &str = "usage: verify-receipt <receipt>";

/// Library logs at warn, this binary's own events (freshness) at info.
const DEFAULT_FILTER: &str = "warn,verify_receipt=info";

fn main() -> ExitCode {
    // Results go to stdout, logs to stderr
    let subscriber = FmtSubscriber::builder()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(DEFAULT_FILTER)))
        .with_writer(std::io::stderr)
        .finish();
    if tracing::subscriber::set_global_default(subscriber).is_err() {
        eprintln!("Failed to set tracing subscriber");
    }

    let args: Vec<String> = std::env::args().skip(1).collect();
    let [receipt_text] = args.as_slice() else {
        eprintln!("Receipt must be the only positional argument");
        eprintln!("{}", USAGE);
        return ExitCode::from(2);
    };

    match run(receipt_text) {
        Ok(true) => ExitCode::SUCCESS,
        Ok(false) => ExitCode::from(1),
        Err(e) => {
            error!("{:#}", e);
            ExitCode::from(2)
        }
    }
}

fn run(receipt_text: &str) -> anyhow::Result<bool> {
    let config = IssuerConfig::from_env();
    let path = config.verification_table_path();
    let table = load_verification_table(&path)
        .with_context(|| format!("loading verification table {}", path.display()))?;

    // A malformed receipt cannot match anything
    let Ok(receipt) = Receipt::parse(receipt_text) else {
        println!("Receipt not valid");
        return Ok(false);
    };

    match verify_receipt(&receipt, &table) {
        Some(value) => {
            info!(freshness = ?Freshness::classify(&value, Utc::now()), "Receipt verified");
            println!("{}", value);
            Ok(true)
        }
        None => {
            println!("Receipt not valid");
            Ok(false)
        }
    }
}
