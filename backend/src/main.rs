//! Carsales CLI - clean, summarize and store vehicle sales data
//!
//! # Main Commands
//!
//! ```bash
//! carsales                          # Full pipeline with the default paths
//! carsales run --report run.json    # Same, and save the run report
//! ```
//!
//! # Debug Commands (for development)
//!
//! ```bash
//! carsales parse input.csv          # Just parse CSV to JSON
//! carsales validate input.csv       # Check required columns, count dropped rows
//! carsales aggregate input.csv      # Print per make/model averages as CSV
//! ```
//!
//! Paths come from `--config`, then `CARSALES_*` variables (also read from
//! `.env`), then flags.

use std::fs;
use std::io::{self, Write};
use std::path::{Path, PathBuf};

use carsales::config::PipelineConfig;
use carsales::error::ConfigError;
use carsales::logs;
use carsales::parser::format_delimiter;
use carsales::sink::{write_csv, write_csv_to};
use carsales::{aggregate, extract_path, prepare, run, validate_with, NullPolicy, PipelineError, REQUIRED_COLUMNS};
use clap::{Args, Parser, Subcommand};

#[derive(Parser)]
#[command(name = "carsales")]
#[command(about = "Clean vehicle sales data and summarize it per make and model", long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Option<Commands>,

    #[command(flatten)]
    settings: Settings,
}

#[derive(Subcommand)]
enum Commands {
    /// Run the full pipeline (default)
    Run,

    /// Parse a CSV file and output JSON
    Parse {
        /// Input CSV file
        #[arg(value_name = "INPUT")]
        file: PathBuf,

        /// Output file (default: stdout)
        #[arg(short, long)]
        output: Option<PathBuf>,
    },

    /// Check a CSV file against the required columns
    Validate {
        /// Input CSV file
        #[arg(value_name = "INPUT")]
        file: PathBuf,
    },

    /// Clean a CSV file and output the per make/model averages
    Aggregate {
        /// Input CSV file
        #[arg(value_name = "INPUT")]
        file: PathBuf,

        /// Output CSV file (default: stdout)
        #[arg(short, long)]
        output: Option<PathBuf>,
    },
}

/// Overrides layered over the config file.
#[derive(Args, Debug)]
struct Settings {
    /// JSON config file
    #[arg(short, long, global = true, env = "CARSALES_CONFIG")]
    config: Option<PathBuf>,

    /// Raw sales CSV
    #[arg(long = "input", global = true, env = "CARSALES_INPUT")]
    input_path: Option<PathBuf>,

    /// Converted rows CSV
    #[arg(long, global = true, env = "CARSALES_OUTPUT_CSV")]
    output_csv: Option<PathBuf>,

    /// Aggregated rows CSV
    #[arg(long, global = true, env = "CARSALES_OUTPUT_AGGREGATE")]
    output_aggregate: Option<PathBuf>,

    /// SQLite database file
    #[arg(long, global = true, env = "CARSALES_DB")]
    db: Option<PathBuf>,

    /// CSV delimiter (auto-detect if not specified)
    #[arg(short, long, global = true)]
    delimiter: Option<char>,

    /// Only drop rows with a missing value in a required column
    #[arg(long, global = true)]
    required_only: bool,

    /// Save the run report as JSON
    #[arg(long, global = true)]
    report: Option<PathBuf>,
}

impl Settings {
    fn resolve(&self) -> Result<PipelineConfig, ConfigError> {
        let mut config = PipelineConfig::load(self.config.as_deref())?;

        if let Some(path) = &self.input_path {
            config.input_path = path.clone();
        }
        if let Some(path) = &self.output_csv {
            config.output_csv_path = path.clone();
        }
        if let Some(path) = &self.output_aggregate {
            config.output_aggregate_path = path.clone();
        }
        if let Some(path) = &self.db {
            config.db_path = path.clone();
        }
        if self.delimiter.is_some() {
            config.delimiter = self.delimiter;
        }
        if self.required_only {
            config.null_policy = NullPolicy::RequiredColumns;
        }

        Ok(config)
    }
}

type CliResult = Result<(), Box<dyn std::error::Error>>;

fn main() {
    // Load .env file (if present)
    dotenvy::dotenv().ok();
    logs::init("info");

    let cli = Cli::parse();

    let result = run_command(cli);

    if let Err(e) = result {
        eprintln!("❌ Error: {}", e);
        std::process::exit(1);
    }
}

fn run_command(cli: Cli) -> CliResult {
    let config = cli.settings.resolve()?;

    match cli.command.unwrap_or(Commands::Run) {
        Commands::Run => cmd_run(&config, cli.settings.report.as_deref()),
        Commands::Parse { file, output } => cmd_parse(&file, &config, output.as_deref()),
        Commands::Validate { file } => cmd_validate(&file, &config),
        Commands::Aggregate { file, output } => cmd_aggregate(&file, &config, output.as_deref()),
    }
}

fn cmd_run(config: &PipelineConfig, report_path: Option<&Path>) -> CliResult {
    let report = run(config)?;

    for w in &report.written {
        eprintln!("   💾 {} ({} rows) → {}", w.dataset, w.rows, w.destination);
    }

    if let Some(path) = report_path {
        let json = serde_json::to_string_pretty(&report)?;
        fs::write(path, json)?;
        eprintln!("   📝 Report saved to: {}", path.display());
    }

    Ok(())
}

fn cmd_parse(input: &Path, config: &PipelineConfig, output: Option<&Path>) -> CliResult {
    eprintln!("📄 Parsing CSV: {}", input.display());

    let extracted = extract_path(input, config.delimiter).map_err(PipelineError::from)?;

    eprintln!("   Encoding: {}", extracted.encoding);
    eprintln!(
        "   Delimiter: '{}'{}",
        format_delimiter(extracted.delimiter),
        if config.delimiter.is_none() { " (auto-detected)" } else { "" }
    );
    eprintln!("   Columns: {}", extracted.table.columns().join(", "));
    eprintln!("✅ Parsed {} records", extracted.table.len());

    let json = serde_json::to_string_pretty(&extracted.table.to_json_records())?;
    write_output(&json, output)
}

fn cmd_validate(input: &Path, config: &PipelineConfig) -> CliResult {
    eprintln!("✔️  Validating: {}", input.display());

    let extracted = extract_path(input, config.delimiter).map_err(PipelineError::from)?;
    let rows = extracted.table.len();
    let filtered =
        validate_with(extracted.table, &REQUIRED_COLUMNS, config.null_policy).map_err(PipelineError::from)?;

    eprintln!(
        "\n📊 Results: {} of {} rows kept, {} dropped for missing values",
        filtered.table.len(),
        rows,
        filtered.dropped
    );

    Ok(())
}

fn cmd_aggregate(input: &Path, config: &PipelineConfig, output: Option<&Path>) -> CliResult {
    eprintln!("📦 Aggregating: {}", input.display());

    let extracted = extract_path(input, config.delimiter).map_err(PipelineError::from)?;
    let prepared = prepare(extracted.table, config)?;
    let summary = aggregate(&prepared.converted).map_err(PipelineError::from)?;

    eprintln!(
        "   {} rows → {} make/model groups",
        prepared.converted.len(),
        summary.len()
    );

    match output {
        Some(path) => {
            write_csv(&summary, path)?;
            eprintln!("💾 Output written to: {}", path.display());
        }
        None => {
            let mut out = write_csv_to(&summary, io::stdout().lock(), Path::new("<stdout>"))?;
            out.flush()?;
        }
    }

    Ok(())
}

fn write_output(content: &str, path: Option<&Path>) -> CliResult {
    match path {
        Some(p) => {
            fs::write(p, content)?;
            eprintln!("💾 Output written to: {}", p.display());
        }
        None => {
            println!("{}", content);
        }
    }
    Ok(())
}
