//! Command line arguments.

use clap::{Args, Parser, Subcommand};
use defichart_common::Granularity;
use std::path::PathBuf;

/// Turns chart data files into axis-ready datasets.
#[derive(Parser, Debug)]
#[command(name = "defichart", author, version, about, long_about = None)]
pub struct Cli {
    /// Configuration file path (YAML, TOML or JSON)
    #[arg(short, long, global = true, env = "DEFICHART_CONFIG")]
    pub config: Option<PathBuf>,

    /// Log level filter, overriding the configuration
    #[arg(short, long, global = true)]
    pub log_level: Option<String>,

    /// Subcommand to run
    #[command(subcommand)]
    pub command: Command,
}

/// Available subcommands.
#[derive(Subcommand, Debug)]
pub enum Command {
    /// Build a chart dataset from an input document
    Build(BuildArgs),
    /// Build a day-over-day inflows dataset for one series
    Inflows(InflowsArgs),
    /// Fold categorical `(name, value)` data into top slices plus "Others"
    Slices(SlicesArgs),
    /// Check a configuration file and print the effective configuration
    ValidateConfig {
        /// Configuration file to check
        path: PathBuf,
    },
    /// Write the default configuration to a file
    InitConfig {
        /// Destination; the format follows the extension
        path: PathBuf,
        /// Overwrite an existing file
        #[arg(long)]
        force: bool,
    },
}

/// Inputs and per-run overrides shared by dataset-producing subcommands.
#[derive(Args, Debug, Clone, Default)]
pub struct SourceArgs {
    /// Chart input document (JSON)
    #[arg(short, long)]
    pub input: PathBuf,

    /// Price history of the denomination (JSON object or `[ms, price]` pairs)
    #[arg(long)]
    pub prices: Option<PathBuf>,

    /// Ticker to re-price values into
    #[arg(long)]
    pub denomination: Option<String>,

    /// Write the result here instead of stdout
    #[arg(short, long)]
    pub output: Option<PathBuf>,

    /// Pretty-print the JSON output
    #[arg(long)]
    pub pretty: bool,
}

/// `build` arguments.
#[derive(Args, Debug, Clone, Default)]
pub struct BuildArgs {
    /// Input, prices and output
    #[command(flatten)]
    pub source: SourceArgs,

    /// Bucket granularity: daily, weekly, monthly, quarterly or cumulative
    #[arg(short, long)]
    pub group_by: Option<Granularity>,

    /// Named entities kept before the rest fold into "Others"
    #[arg(long)]
    pub cap: Option<usize>,

    /// Rescale each row to percentages of its total
    #[arg(long)]
    pub percent: bool,

    /// Sum every series inside a bucket
    #[arg(long)]
    pub force_group: bool,
}

/// `inflows` arguments.
#[derive(Args, Debug, Clone, Default)]
pub struct InflowsArgs {
    /// Input, prices and output
    #[command(flatten)]
    pub source: SourceArgs,

    /// Series to derive inflows from
    #[arg(short, long, default_value = "TVL")]
    pub series: String,
}

/// `slices` arguments.
#[derive(Args, Debug, Clone, Default)]
pub struct SlicesArgs {
    /// `{name: value}` object or `[{name, value}]` array (JSON)
    #[arg(short, long)]
    pub input: PathBuf,

    /// Slices kept before the rest fold into "Others"
    #[arg(long)]
    pub limit: Option<usize>,

    /// Write the result here instead of stdout
    #[arg(short, long)]
    pub output: Option<PathBuf>,

    /// Pretty-print the JSON output
    #[arg(long)]
    pub pretty: bool,
}
