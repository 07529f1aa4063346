//! # DefiChart Config
//!
//! Type-safe configuration management for the chart pipeline.
//!
//! This crate provides configuration loading, validation, and caching
//! with atomic file writes and lock-free reads of the active configuration.

#![warn(missing_docs)]
#![warn(clippy::all)]
#![allow(clippy::module_name_repetitions)]

pub mod cache;
pub mod defaults;
pub mod loader;
pub mod schema;
pub mod validator;

pub use cache::*;
pub use defaults::*;
pub use loader::*;
pub use schema::*;
pub use validator::*;
