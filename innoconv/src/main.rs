//! MyISAM to InnoDB dump converter.
//!
//! Reads a schema dump, infers foreign keys from column names, and writes
//! a copy in which every parsed table uses the target engine and declares
//! the inferred keys.

mod output;

use std::path::PathBuf;

use clap::{Args, Parser};
use innoconv_core::{Converter, ConverterConfig, Result, init_logging};
use tracing::{error, info, warn};

use crate::output::{ensure_distinct, output_path_for, read_dump, save_dump, save_report};

#[derive(Parser)]
#[command(name = "innoconv")]
#[command(about = "Convert MyISAM dumps to InnoDB with inferred foreign keys")]
#[command(version)]
#[command(long_about = "
innoconv - MyISAM to InnoDB dump converter

Reads a SQL dump, switches every table to the target engine, and adds
foreign keys inferred from column names such as `driver_id` or `raceId`.

Constraints whose referenced table is declared earlier are added inside
CREATE TABLE. Forward references and reference cycles are added by
ALTER TABLE statements at the end of the dump.

Data rows are copied unchanged and never inspected.

EXAMPLES:
  innoconv f1db.sql
  innoconv --output converted.sql --report report.json f1db.sql
  innoconv --dry-run -v f1db.sql
")]
struct Cli {
    #[command(flatten)]
    global: GlobalArgs,

    /// Dump file to convert
    #[arg(value_name = "INPUT")]
    input: PathBuf,

    /// Output file path
    #[arg(
        short,
        long,
        help = "Output file path (default: <stem>_<engine>.<ext> next to the input)"
    )]
    output: Option<PathBuf>,

    /// Storage engine to convert tables to
    #[arg(
        long,
        env = "INNOCONV_TARGET_ENGINE",
        default_value = innoconv_core::config::DEFAULT_TARGET_ENGINE,
        help = "Storage engine written into every converted table"
    )]
    target_engine: String,

    /// Constraint name prefix
    #[arg(
        long,
        default_value = innoconv_core::config::DEFAULT_CONSTRAINT_PREFIX,
        help = "Prefix of generated constraint names (<prefix>_<table>_<column>)"
    )]
    constraint_prefix: String,

    /// Allow foreign keys from a table to itself
    #[arg(long, help = "Infer foreign keys that reference the column's own table")]
    allow_self_references: bool,

    /// Consider primary key columns as foreign key sources
    #[arg(
        long,
        help = "Also infer foreign keys for a table's own single-column primary key"
    )]
    keep_primary_key_columns: bool,

    /// Remove zero-date defaults
    #[arg(
        long,
        help = "Drop DEFAULT '0000-00-00' clauses that strict InnoDB rejects"
    )]
    strip_zero_dates: bool,

    /// Write a JSON report
    #[arg(long, value_name = "PATH", help = "Write the conversion report as JSON")]
    report: Option<PathBuf>,

    /// Analyse without writing the converted dump
    #[arg(long, help = "Print the summary without writing the converted dump")]
    dry_run: bool,
}

#[derive(Args)]
struct GlobalArgs {
    /// Increase verbosity
    #[arg(
        short,
        long,
        action = clap::ArgAction::Count,
        help = "Increase verbosity (-v, -vv, -vvv)"
    )]
    verbose: u8,

    /// Suppress output
    #[arg(short, long, help = "Suppress all output except errors")]
    quiet: bool,
}

impl Cli {
    fn converter_config(&self) -> ConverterConfig {
        ConverterConfig::new()
            .with_target_engine(&self.target_engine)
            .with_constraint_prefix(&self.constraint_prefix)
            .with_self_references(self.allow_self_references)
            .with_skip_primary_key_columns(!self.keep_primary_key_columns)
            .with_strip_zero_date_defaults(self.strip_zero_dates)
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    init_logging(cli.global.verbose, cli.global.quiet)?;

    convert_file(&cli).await.map_err(|e| {
        error!("Conversion failed: {}", e);
        e
    })
}

/// Converts the input dump and writes the requested outputs.
async fn convert_file(cli: &Cli) -> Result<()> {
    let converter = Converter::new(cli.converter_config());
    let output_path = cli
        .output
        .clone()
        .unwrap_or_else(|| output_path_for(&cli.input, &converter.config().target_engine));
    if !cli.dry_run {
        ensure_distinct(&cli.input, &output_path)?;
    }

    info!("Converting {}", cli.input.display());
    let dump = read_dump(&cli.input).await?;
    let conversion = converter.convert(&dump)?;

    for skipped in &conversion.report.skipped_statements {
        warn!(
            "Line {}: CREATE TABLE passed through unmodified ({})",
            skipped.line, skipped.reason
        );
    }

    if cli.dry_run {
        info!("Dry run, not writing {}", output_path.display());
    } else {
        save_dump(&conversion.output, &output_path).await?;
        info!("Wrote {}", output_path.display());
    }

    if let Some(report_path) = &cli.report {
        save_report(&conversion.report, report_path).await?;
        info!("Wrote report to {}", report_path.display());
    }

    if !cli.global.quiet {
        print!("{}", conversion.report);
        if !cli.dry_run {
            println!("Output: {}", output_path.display());
        }
    }

    Ok(())
}
