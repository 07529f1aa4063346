//! Error type of the command line front-end.

use defichart_common::ChartError;
use std::path::PathBuf;
use thiserror::Error;

/// Failures surfaced to the user by a subcommand.
#[derive(Error, Debug)]
pub enum CliError {
    /// Configuration, parsing or validation failure from the pipeline crates.
    #[error(transparent)]
    Chart(#[from] ChartError),

    /// A file could not be read or written.
    #[error("{action} {}: {source}", path.display())]
    Io {
        action: &'static str,
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// A JSON document could not be decoded or encoded.
    #[error("invalid JSON in {}: {source}", path.display())]
    Json {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },

    /// An output could not be encoded.
    #[error("could not encode output: {0}")]
    Encode(#[from] serde_json::Error),
}

impl CliError {
    /// Wraps an I/O error with the file it concerns.
    pub fn io(action: &'static str, path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        Self::Io {
            action,
            path: path.into(),
            source,
        }
    }

    /// Process exit code for the error.
    pub fn exit_code(&self) -> i32 {
        match self {
            Self::Chart(ChartError::Config { .. } | ChartError::Validation { .. }) => 78,
            Self::Io { .. } => 74,
            Self::Chart(_) | Self::Json { .. } | Self::Encode(_) => 65,
        }
    }
}

/// Result alias for CLI operations.
pub type Result<T> = std::result::Result<T, CliError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_messages_name_the_file() {
        let err = CliError::io(
            "could not read",
            "/tmp/chart.json",
            std::io::Error::new(std::io::ErrorKind::NotFound, "missing"),
        );
        assert_eq!(err.to_string(), "could not read /tmp/chart.json: missing");
        assert_eq!(err.exit_code(), 74);
    }

    #[test]
    fn test_exit_codes() {
        assert_eq!(CliError::from(ChartError::validation("bad")).exit_code(), 78);
        assert_eq!(CliError::from(ChartError::parse("bad", "x")).exit_code(), 65);
    }
}
