//! Configuration loading and persistence with atomic file operations.

use crate::schema::Config;
use defichart_common::{ChartError, Result};
use std::io::Write;
use std::path::{Path, PathBuf};
use tracing::{debug, info, instrument};

/// On-disk configuration format, chosen by file extension.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConfigFormat {
    /// `.yaml` / `.yml`
    Yaml,
    /// `.toml`
    Toml,
    /// `.json`
    Json,
}

impl ConfigFormat {
    /// Detects the format from a path's extension.
    pub fn from_path(path: &Path) -> Result<Self> {
        let ext = path
            .extension()
            .and_then(|e| e.to_str())
            .map(str::to_ascii_lowercase);

        match ext.as_deref() {
            Some("yaml" | "yml") => Ok(Self::Yaml),
            Some("toml") => Ok(Self::Toml),
            Some("json") => Ok(Self::Json),
            _ => Err(ChartError::config(format!(
                "unsupported config file extension: {}",
                path.display()
            ))),
        }
    }

    /// Parses a configuration document.
    pub fn parse(self, contents: &str) -> Result<Config> {
        match self {
            Self::Yaml => serde_yaml::from_str(contents)
                .map_err(|e| ChartError::config_with_source("invalid YAML configuration", e)),
            Self::Toml => toml::from_str(contents)
                .map_err(|e| ChartError::config_with_source("invalid TOML configuration", e)),
            Self::Json => Ok(serde_json::from_str(contents)?),
        }
    }

    /// Renders a configuration document.
    pub fn render(self, config: &Config) -> Result<String> {
        match self {
            Self::Yaml => serde_yaml::to_string(config)
                .map_err(|e| ChartError::config_with_source("could not encode YAML", e)),
            Self::Toml => toml::to_string_pretty(config)
                .map_err(|e| ChartError::config_with_source("could not encode TOML", e)),
            Self::Json => Ok(serde_json::to_string_pretty(config)?),
        }
    }
}

/// Configuration loader with atomic file operations.
pub struct ConfigLoader {
    path: PathBuf,
}

impl ConfigLoader {
    /// Creates a new configuration loader.
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    /// Path this loader reads and writes.
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Loads and validates configuration from file.
    #[instrument(skip(self), fields(path = %self.path.display()))]
    pub async fn load(&self) -> Result<Config> {
        let format = ConfigFormat::from_path(&self.path)?;
        let contents = tokio::fs::read_to_string(&self.path).await.map_err(|e| {
            ChartError::config_with_source(
                format!("could not read {}", self.path.display()),
                e,
            )
        })?;

        let config = format.parse(&contents)?;
        config.validate()?;

        info!("Loaded configuration");
        Ok(config)
    }

    /// Loads configuration if the file exists, otherwise returns defaults.
    pub async fn load_or_default(&self) -> Result<Config> {
        if tokio::fs::try_exists(&self.path).await? {
            self.load().await
        } else {
            debug!(path = %self.path.display(), "No configuration file, using defaults");
            Ok(Config::default())
        }
    }

    /// Saves configuration to file atomically.
    #[instrument(skip(self, config), fields(path = %self.path.display()))]
    pub async fn save(&self, config: &Config) -> Result<()> {
        config.validate()?;
        let format = ConfigFormat::from_path(&self.path)?;
        let rendered = format.render(config)?;
        let path = self.path.clone();

        tokio::task::spawn_blocking(move || write_atomically(&path, rendered.as_bytes()))
            .await
            .map_err(|e| ChartError::with_source("config writer task failed", e))??;

        debug!("Saved configuration");
        Ok(())
    }
}

/// Writes to a temporary file in the target directory and renames it into place.
fn write_atomically(path: &Path, contents: &[u8]) -> Result<()> {
    let dir = match path.parent() {
        Some(parent) if !parent.as_os_str().is_empty() => parent.to_path_buf(),
        _ => PathBuf::from("."),
    };

    let mut file = tempfile::NamedTempFile::new_in(&dir)?;
    file.write_all(contents)?;
    file.as_file().sync_all()?;
    file.persist(path).map_err(|e| ChartError::Io(e.error))?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_format_from_path() {
        assert_eq!(
            ConfigFormat::from_path(Path::new("chart.yml")).unwrap(),
            ConfigFormat::Yaml
        );
        assert_eq!(
            ConfigFormat::from_path(Path::new("chart.TOML")).unwrap(),
            ConfigFormat::Toml
        );
        assert!(ConfigFormat::from_path(Path::new("chart.ini")).is_err());
    }

    #[test]
    fn test_partial_yaml_uses_defaults() {
        let config = ConfigFormat::Yaml
            .parse("pipeline:\n  group_by: weekly\n  cap_count: 5\n")
            .unwrap();
        assert_eq!(config.pipeline.group_by, defichart_common::Granularity::Weekly);
        assert_eq!(config.pipeline.cap_count, 5);
        assert_eq!(config.pipeline.value_symbol, "$");
        assert_eq!(config.palette.others_color, "#AAAAAA");
    }

    #[test]
    fn test_toml_parse() {
        let config = ConfigFormat::Toml
            .parse("[pipeline]\ndenomination = \"ETH\"\nattribution = \"split-even\"\n")
            .unwrap();
        assert_eq!(config.pipeline.denomination.as_deref(), Some("ETH"));
        assert_eq!(
            config.pipeline.attribution,
            defichart_common::AttributionStrategy::SplitEven
        );
    }

    #[tokio::test]
    async fn test_missing_file_falls_back_to_defaults() {
        let dir = tempfile::tempdir().unwrap();
        let loader = ConfigLoader::new(dir.path().join("absent.yaml"));
        let config = loader.load_or_default().await.unwrap();
        assert_eq!(config, Config::default());
    }
}
