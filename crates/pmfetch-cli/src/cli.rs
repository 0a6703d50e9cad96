//! CLI argument definitions for pmfetch.
//!
//! # Commands
//!
//! | Command | Description |
//! |---------|-------------|
//! | `fetch` | Acquire live PM data with synthetic fallback |
//! | `generate` | Write a full-year synthetic dataset |
//! | `stations` | Print the reference station table |
//! | `locations` | List the monitoring locations an endpoint knows |
//!
//! # Global Options
//!
//! | Option | Default | Description |
//! |--------|---------|-------------|
//! | `--verbose` | `false` | Debug-level logs on stderr |
//! | `--pretty` | `false` | Pretty-print the JSON report |
//!
//! # Examples
//!
//! ```bash
//! pmfetch fetch --parameter pm25 --city Delhi --output-dir data
//! pmfetch generate --year 2023 --seed 7 --pretty
//! pmfetch stations
//! pmfetch locations --city Delhi
//! ```

use std::path::PathBuf;

use clap::{Args, Parser, Subcommand, ValueEnum};
use pmfetch_core::Parameter;

#[derive(Debug, Parser)]
#[command(
    name = "pmfetch",
    author,
    version,
    about = "Resilient PM2.5/PM10 acquisition with synthetic fallback",
    long_about = "pmfetch pulls particulate-matter measurements from the OpenAQ API, \
falling back across API versions and, when no endpoint delivers, to a deterministic \
synthetic dataset built from a reference station table.\n\
\n\
Logs go to stderr; the JSON report goes to stdout."
)]
pub struct Cli {
    /// Emit debug-level logs (overridden by RUST_LOG).
    #[arg(long, short, global = true, default_value_t = false)]
    pub verbose: bool,

    /// Pretty-print JSON output with indentation.
    #[arg(long, global = true, default_value_t = false)]
    pub pretty: bool,

    #[command(subcommand)]
    pub command: Command,
}

#[derive(Debug, Subcommand)]
pub enum Command {
    /// Fetch measurements for one or more parameters.
    ///
    /// # Examples
    ///
    ///   pmfetch fetch
    ///   pmfetch fetch --parameter pm10 --city Mumbai --max-records 5000
    ///   pmfetch fetch --offline --seed 7 --output-dir data
    Fetch(FetchArgs),

    /// Generate a full calendar year of synthetic measurements.
    Generate(GenerateArgs),

    /// Print the reference station table.
    Stations,

    /// List live monitoring locations; ids feed `fetch --location-id`.
    Locations(LocationsArgs),
}

/// Pollutant selector.
#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum ParameterArg {
    Pm25,
    Pm10,
}

impl From<ParameterArg> for Parameter {
    fn from(value: ParameterArg) -> Self {
        match value {
            ParameterArg::Pm25 => Self::Pm25,
            ParameterArg::Pm10 => Self::Pm10,
        }
    }
}

#[derive(Debug, Args)]
pub struct FetchArgs {
    /// Parameter(s) to fetch; defaults to both.
    #[arg(long = "parameter", value_enum)]
    pub parameters: Vec<ParameterArg>,

    /// ISO 3166-1 alpha-2 country code.
    #[arg(long, default_value = "IN")]
    pub country: String,

    /// Restrict to one city.
    #[arg(long)]
    pub city: Option<String>,

    /// Restrict to one location/station id.
    #[arg(long)]
    pub location_id: Option<String>,

    /// Records requested per page.
    #[arg(long, default_value_t = 1_000)]
    pub page_size: usize,

    /// Upper bound on records per parameter.
    #[arg(long, default_value_t = 100_000)]
    pub max_records: usize,

    /// Skip the network and go straight to synthetic data.
    #[arg(long, default_value_t = false)]
    pub offline: bool,

    /// Seed for the synthetic generator.
    #[arg(long)]
    pub seed: Option<u64>,

    /// Directory for the CSV table; nothing is written when omitted.
    #[arg(long)]
    pub output_dir: Option<PathBuf>,

    /// File name prefix for CSV output.
    #[arg(long, default_value = "pm_data")]
    pub prefix: String,

    /// Fail with exit code 3 when any parameter fell back to synthetic data.
    #[arg(long, default_value_t = false)]
    pub require_live: bool,
}

#[derive(Debug, Args)]
pub struct GenerateArgs {
    /// Calendar year to generate.
    #[arg(long)]
    pub year: Option<i32>,

    /// Seed for the generator.
    #[arg(long)]
    pub seed: Option<u64>,

    /// Directory for the CSV files.
    #[arg(long, default_value = "data")]
    pub output_dir: PathBuf,

    /// File name prefix for CSV output.
    #[arg(long, default_value = "india_pm_synthetic")]
    pub prefix: String,
}

#[derive(Debug, Args)]
pub struct LocationsArgs {
    /// ISO 3166-1 alpha-2 country code.
    #[arg(long, default_value = "IN")]
    pub country: String,

    /// Restrict to one city where the endpoint supports it.
    #[arg(long)]
    pub city: Option<String>,

    /// Locations requested per page.
    #[arg(long, default_value_t = 1_000)]
    pub page_size: usize,

    /// Upper bound on listed locations.
    #[arg(long, default_value_t = 10_000)]
    pub max_records: usize,
}
