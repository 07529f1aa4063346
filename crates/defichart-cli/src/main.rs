//! DefiChart - Main Entry Point

use anyhow::Result;
use clap::Parser;
use defichart_cli::{commands, Cli, CliError, Command};
use defichart_common::init_logging;
use tracing::error;

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    let config = match commands::load_config(cli.config.as_deref()).await {
        Ok(config) => config,
        Err(e) => exit_with(&e),
    };

    let mut logging = config.logging.to_logging_config();
    if let Some(level) = &cli.log_level {
        logging.level = level.clone();
    }
    init_logging(logging).map_err(|e| anyhow::anyhow!("failed to initialise logging: {e}"))?;

    let outcome = match &cli.command {
        Command::Build(args) => match commands::build(args, config).await {
            Ok(output) => {
                commands::write_output(&output, args.source.output.as_deref(), args.source.pretty).await
            }
            Err(e) => Err(e),
        },
        Command::Inflows(args) => match commands::inflows(args, config).await {
            Ok(output) => {
                commands::write_output(&output, args.source.output.as_deref(), args.source.pretty).await
            }
            Err(e) => Err(e),
        },
        Command::Slices(args) => match commands::slices(args).await {
            Ok(slices) => commands::write_output(&slices, args.output.as_deref(), args.pretty).await,
            Err(e) => Err(e),
        },
        Command::ValidateConfig { path } => match commands::validate_config(path).await {
            Ok(config) => commands::write_output(&config, None, true).await,
            Err(e) => Err(e),
        },
        Command::InitConfig { path, force } => commands::init_config(path, *force)
            .await
            .map(|path| eprintln!("Wrote default configuration to {}", path.display())),
    };

    if let Err(e) = outcome {
        exit_with(&e);
    }

    Ok(())
}

fn exit_with(e: &CliError) -> ! {
    error!("{e}");
    eprintln!("error: {e}");
    std::process::exit(e.exit_code());
}
