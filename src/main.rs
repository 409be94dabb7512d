mod backlog;
mod cache;
mod commands;
mod config;
mod logging;

use clap::Parser;
use color_eyre::{Report, Result, Section};
use std::path::PathBuf;

use backlog::cached_client::CachedBacklogClient;
use cache::CacheError;
use commands::Command;

#[derive(Parser, Debug)]
#[command(name = "blg")]
#[command(about = "A command-line client for Backlog with a local cache")]
#[command(version)]
struct Args {
  /// Path to config file (default: ./blg.yaml, then $XDG_CONFIG_HOME/blg/config.yaml)
  #[arg(short, long, global = true)]
  config: Option<PathBuf>,

  /// Backlog space to use
  #[arg(short, long, global = true)]
  space: Option<String>,

  /// Ignore cache freshness and fetch everything again
  #[arg(short, long, global = true)]
  refresh: bool,

  /// Log cache and HTTP activity
  #[arg(short, long, global = true)]
  debug: bool,

  #[command(subcommand)]
  command: Command,
}

#[tokio::main]
async fn main() -> Result<()> {
  color_eyre::install()?;

  let args = Args::parse();

  let config = config::Config::load(args.config.as_deref())?;

  // Override space if specified on command line
  let config = if let Some(space) = args.space {
    config::Config {
      space: Some(space),
      ..config
    }
  } else {
    config
  };

  let _guard = logging::init(args.debug, config.log_file.as_deref())?;

  let result = match args.command {
    // Cache maintenance works without credentials
    Command::Cache(command) => commands::run_cache(command, &config),
    command => {
      let client = CachedBacklogClient::new(&config, args.refresh)?;
      commands::run(command, &client, &config).await
    }
  };

  result.map_err(suggest_cache_clear)
}

/// Point at `cache clear` when a cached file could not be parsed.
fn suggest_cache_clear(report: Report) -> Report {
  let corrupt = matches!(
    report.downcast_ref::<CacheError>(),
    Some(CacheError::MalformedRecord { .. })
  );
  if corrupt {
    report.suggestion("Run `blg cache clear` to drop the cached data and fetch it again")
  } else {
    report
  }
}
