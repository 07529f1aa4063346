//! Subcommand implementations.

use defichart_common::ChartError;
use defichart_config::{Config, ConfigLoader};
use defichart_pipeline::{
    top_slices, ChartInput, ChartOutput, ChartPipeline, ChartRequest, PriceHistory, Slice,
};
use serde::Serialize;
use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use tracing::{debug, info, instrument};

use crate::args::{BuildArgs, InflowsArgs, SlicesArgs, SourceArgs};
use crate::error::{CliError, Result};

/// Loads the configuration at `path`, or the defaults without one.
pub async fn load_config(path: Option<&Path>) -> Result<Config> {
    match path {
        Some(path) => Ok(ConfigLoader::new(path).load().await?),
        None => {
            debug!("No configuration file given, using defaults");
            Ok(Config::default())
        }
    }
}

async fn read_text(path: &Path) -> Result<String> {
    tokio::fs::read_to_string(path)
        .await
        .map_err(|e| CliError::io("could not read", path, e))
}

async fn read_json<T: serde::de::DeserializeOwned>(path: &Path) -> Result<T> {
    let text = read_text(path).await?;
    serde_json::from_str(&text).map_err(|source| CliError::Json {
        path: path.to_path_buf(),
        source,
    })
}

/// Reads an input document and its optional price history into a request
/// carrying `config`'s pipeline settings.
#[instrument(skip(config))]
pub async fn load_request(source: &SourceArgs, config: &Config) -> Result<ChartRequest> {
    let value: serde_json::Value = read_json(&source.input).await?;
    let input = ChartInput::from_value(value)?;

    let mut request = ChartRequest::new(input).with_settings(config.pipeline.clone());
    if let Some(denomination) = &source.denomination {
        request.settings.denomination = Some(denomination.clone());
    }
    if let Some(prices) = &source.prices {
        let history: PriceHistory = read_json(prices).await?;
        debug!(prices = history.len(), "Loaded price history");
        request = request.with_price_history(history);
    }

    Ok(request)
}

/// `build`: runs the full pipeline.
pub async fn build(args: &BuildArgs, mut config: Config) -> Result<ChartOutput> {
    if let Some(group_by) = args.group_by {
        config.pipeline.group_by = group_by;
    }
    if let Some(cap) = args.cap {
        config.pipeline.cap_count = cap;
    }
    if args.percent {
        config.pipeline.expand_to_100_percent = true;
    }
    if args.force_group {
        config.pipeline.force_group = true;
    }
    config.validate()?;

    let request = load_request(&args.source, &config).await?;
    let output = ChartPipeline::new(&config).build(&request);
    info!(
        rows = output.dataset.source.len(),
        dimensions = output.dataset.dimensions.len(),
        "Chart built"
    );
    Ok(output)
}

/// `inflows`: day-over-day changes of one series.
pub async fn inflows(args: &InflowsArgs, config: Config) -> Result<ChartOutput> {
    let request = load_request(&args.source, &config).await?;
    Ok(ChartPipeline::new(&config).build_inflows(&request, &args.series))
}

#[derive(serde::Deserialize)]
#[serde(untagged)]
enum SliceInput {
    List(Vec<Slice>),
    Map(BTreeMap<String, f64>),
}

/// `slices`: top categorical slices with the tail folded into "Others".
pub async fn slices(args: &SlicesArgs) -> Result<Vec<Slice>> {
    if args.limit == Some(0) {
        return Err(ChartError::validation_field("limit must be at least 1", "limit").into());
    }
    let slices = match read_json::<SliceInput>(&args.input).await? {
        SliceInput::List(list) => list,
        SliceInput::Map(map) => map.into_iter().map(|(name, value)| Slice::new(name, value)).collect(),
    };
    Ok(top_slices(slices, args.limit))
}

/// `validate-config`: loads and validates a configuration file.
pub async fn validate_config(path: &Path) -> Result<Config> {
    let config = ConfigLoader::new(path).load().await?;
    info!(path = %path.display(), "Configuration is valid");
    Ok(config)
}

/// `init-config`: writes the default configuration.
pub async fn init_config(path: &Path, force: bool) -> Result<PathBuf> {
    let exists = tokio::fs::try_exists(path)
        .await
        .map_err(|e| CliError::io("could not inspect", path, e))?;
    if exists && !force {
        return Err(ChartError::config(format!(
            "{} already exists, pass --force to overwrite",
            path.display()
        ))
        .into());
    }

    ConfigLoader::new(path).save(&Config::default()).await?;
    Ok(path.to_path_buf())
}

/// Writes `value` as JSON to `output`, or to stdout.
pub async fn write_output(value: &impl Serialize, output: Option<&Path>, pretty: bool) -> Result<()> {
    let mut text = if pretty {
        serde_json::to_string_pretty(value)?
    } else {
        serde_json::to_string(value)?
    };
    text.push('\n');

    match output {
        Some(path) => tokio::fs::write(path, text)
            .await
            .map_err(|e| CliError::io("could not write", path, e)),
        None => {
            print!("{text}");
            Ok(())
        }
    }
}
