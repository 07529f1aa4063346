//! # DefiChart CLI
//!
//! Command line front-end for the chart pipeline: reads chart data, price
//! history and configuration files and prints the resulting datasets as JSON.

#![warn(missing_docs)]
#![warn(clippy::all)]

pub mod args;
pub mod commands;
#[allow(missing_docs)]
pub mod error;

pub use args::{BuildArgs, Cli, Command, InflowsArgs, SlicesArgs, SourceArgs};
pub use error::{CliError, Result};
