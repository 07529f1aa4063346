//! Runtime validation of loaded configuration.

use crate::schema::Config;
use defichart_common::{ChartError, Result};

/// Configuration validator.
pub struct ConfigValidator;

impl ConfigValidator {
    /// Validates a configuration, reporting the first offending field.
    pub fn validate(config: &Config) -> Result<()> {
        let pipeline = &config.pipeline;

        if pipeline.cap_count == 0 {
            return Err(ChartError::validation_field(
                "cap count must be at least 1",
                "pipeline.cap_count",
            ));
        }

        if pipeline.value_symbol.trim().is_empty() {
            return Err(ChartError::validation_field(
                "value symbol cannot be empty",
                "pipeline.value_symbol",
            ));
        }

        if let Some(denomination) = &pipeline.denomination {
            if denomination.trim().is_empty() {
                return Err(ChartError::validation_field(
                    "denomination must be a ticker or omitted",
                    "pipeline.denomination",
                ));
            }
        }

        if config.palette.colors.is_empty() {
            return Err(ChartError::validation_field(
                "palette needs at least one color",
                "palette.colors",
            ));
        }

        for color in config
            .palette
            .colors
            .iter()
            .chain(std::iter::once(&config.palette.others_color))
        {
            if !is_hex_color(color) {
                return Err(ChartError::validation_field(
                    format!("invalid hex color {color:?}"),
                    "palette",
                ));
            }
        }

        let classification = &config.classification;
        if let Some(name) = classification
            .cumulative_excluded
            .iter()
            .find(|name| !classification.sum_series.contains(name))
        {
            return Err(ChartError::validation_field(
                format!("{name:?} is excluded from accumulation but is not a sum-style series"),
                "classification.cumulative_excluded",
            ));
        }

        if config.cache.max_capacity == 0 {
            return Err(ChartError::validation_field(
                "cache capacity must be at least 1",
                "cache.max_capacity",
            ));
        }

        Ok(())
    }
}

/// `#rgb` or `#rrggbb`.
fn is_hex_color(value: &str) -> bool {
    match value.strip_prefix('#') {
        Some(hex) => (hex.len() == 3 || hex.len() == 6) && hex.chars().all(|c| c.is_ascii_hexdigit()),
        None => false,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config_is_valid() {
        assert!(ConfigValidator::validate(&Config::default()).is_ok());
    }

    #[test]
    fn test_zero_cap_rejected() {
        let mut config = Config::default();
        config.pipeline.cap_count = 0;
        let err = ConfigValidator::validate(&config).unwrap_err();
        assert_eq!(err.field(), Some("pipeline.cap_count"));
    }

    #[test]
    fn test_bad_color_rejected() {
        let mut config = Config::default();
        config.palette.colors.push("blue".to_string());
        let err = ConfigValidator::validate(&config).unwrap_err();
        assert_eq!(err.field(), Some("palette"));

        let mut config = Config::default();
        config.palette.others_color = "#12345".to_string();
        assert!(ConfigValidator::validate(&config).is_err());
    }

    #[test]
    fn test_excluded_must_be_sum_style() {
        let mut config = Config::default();
        config.classification.cumulative_excluded.push("TVL".to_string());
        let err = ConfigValidator::validate(&config).unwrap_err();
        assert_eq!(err.field(), Some("classification.cumulative_excluded"));
    }

    #[test]
    fn test_hex_color() {
        assert!(is_hex_color("#AAAAAA"));
        assert!(is_hex_color("#abc"));
        assert!(!is_hex_color("AAAAAA"));
        assert!(!is_hex_color("#GGGGGG"));
    }
}
