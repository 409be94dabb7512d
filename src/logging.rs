//! Tracing subscriber setup.

use std::path::Path;

use color_eyre::{eyre::eyre, Result};
use tracing_appender::non_blocking::WorkerGuard;
use tracing_subscriber::{fmt, layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

/// Install the global subscriber.
///
/// `RUST_LOG` takes precedence; otherwise only warnings are shown unless
/// `debug` is set. Logs go to stderr so command output stays clean, or to
/// `log_file` when one is configured. Keep the guard alive until exit.
pub fn init(debug: bool, log_file: Option<&Path>) -> Result<WorkerGuard> {
  let default_filter = if debug { "blg=debug,info" } else { "warn" };
  let env_filter =
    EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_filter));

  let (writer, guard) = match log_file {
    Some(path) => {
      let file = std::fs::OpenOptions::new()
        .create(true)
        .append(true)
        .open(path)
        .map_err(|e| eyre!("Failed to open log file {}: {}", path.display(), e))?;
      tracing_appender::non_blocking(file)
    }
    None => tracing_appender::non_blocking(std::io::stderr()),
  };

  tracing_subscriber::registry()
    .with(env_filter)
    .with(
      fmt::layer()
        .with_writer(writer)
        .with_ansi(log_file.is_none())
        .with_target(false),
    )
    .try_init()
    .map_err(|e| eyre!("Failed to init subscriber: {}", e))?;

  Ok(guard)
}
