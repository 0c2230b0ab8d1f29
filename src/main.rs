//! Receipt table generator
//!
//! Builds the private receipt table and the public verification table for a
//! planning horizon, splits both into daily subtables and writes everything
//! to the table directory. Configured through `RECEIPT_*` environment
//! variables (see `IssuerConfig::from_env`).

use std::process::ExitCode;

use anyhow::{bail, Context};
use chrono::Utc;
use tracing::{error, info};
use tracing_subscriber::{EnvFilter, FmtSubscriber};

use survey_receipts::{
    receipt::{build_hour_receipt_table_with, build_verification_table, build_zipcode_receipt_table_with},
    store::handoff::{covered_days, daily_subtables, write_issuance},
    EntropyMixer, IssuerConfig, ReceiptKind, VERSION,
};

fn main() -> ExitCode {
    // Initialize logging
    let subscriber = FmtSubscriber::builder()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .with_writer(std::io::stderr)
        .finish();
    if tracing::subscriber::set_global_default(subscriber).is_err() {
        eprintln!("Failed to set tracing subscriber");
    }

    match run() {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            error!("{:#}", e);
            ExitCode::from(2)
        }
    }
}

fn run() -> anyhow::Result<()> {
    info!("Survey Receipts table generator v{}", VERSION);

    let config = IssuerConfig::from_env();
    let start = config.start.unwrap_or_else(Utc::now);
    info!(
        kind = ?config.kind,
        num_days = config.num_days,
        salt_size = config.salt_size,
        receipt_len = config.receipt_len,
        start = %start,
        "Generating tables"
    );

    let mut mixer = EntropyMixer::from_seed_file(&config.seed_path)
        .with_context(|| format!("initializing entropy mixer from {}", config.seed_path.display()))?;

    let generator = config.generator().context("configuring receipt generator")?;

    let receipts = match config.kind {
        ReceiptKind::Hour => build_hour_receipt_table_with(&generator, &mut mixer, config.num_days, start)?,
        ReceiptKind::Zipcode => {
            if config.zipcodes.is_empty() {
                bail!("RECEIPT_ZIPCODES must list at least one zipcode for zipcode receipts");
            }
            build_zipcode_receipt_table_with(
                &generator,
                &mut mixer,
                config.num_days,
                &config.zipcodes,
                start.date_naive(),
            )?
        }
    };

    let verification = build_verification_table(&receipts, &mut mixer, config.salt_size)
        .context("building verification table")?;

    let daily = match covered_days(&receipts) {
        Some((first_day, days)) => daily_subtables(&receipts, &verification, first_day, days)?,
        None => Vec::new(),
    };

    let manifest = write_issuance(&config.table_dir, &receipts, &verification, &daily)
        .with_context(|| format!("writing tables to {}", config.table_dir.display()))?;

    for path in manifest.paths(&config.table_dir) {
        println!("{}", path.display());
    }

    info!(
        receipts = receipts.len(),
        daily_tables = daily.len(),
        "Done"
    );
    Ok(())
}
