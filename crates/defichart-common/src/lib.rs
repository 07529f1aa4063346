//! # DefiChart Common
//!
//! Shared types, utilities, and common functionality for the chart pipeline.
//!
//! This crate provides the error type, logging bootstrap, granularity and
//! attribution enums, and date helpers used across all other crates in the
//! workspace.

#![warn(missing_docs)]
#![warn(clippy::all)]
#![allow(clippy::module_name_repetitions)]

#[allow(missing_docs)]
pub mod error;
pub mod logging;
pub mod types;
pub mod utils;

#[cfg(any(test, feature = "testing"))]
pub mod test_utils;

pub use error::{ChartError, Result};
pub use logging::{init_default_logging, init_dev_logging, init_logging, LogFormat, LoggingConfig};
pub use types::*;
pub use utils::*;
