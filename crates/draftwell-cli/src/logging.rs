//! Tracing setup
//!
//! The level comes from DRAFTWELL_LOG, falling back to the configured
//! `log_level`. Logs go to stderr unless `log_file` is set.

use std::fs::OpenOptions;
use std::sync::Mutex;

use draftwell_core::Config;
use tracing::debug;
use tracing_subscriber::EnvFilter;

/// Environment variable that overrides the configured log level
const LOG_ENV: &str = "DRAFTWELL_LOG";

/// Initialize logging (ignores a subscriber that is already installed)
pub fn init(config: &Config) {
    let level = std::env::var(LOG_ENV).unwrap_or_else(|_| config.log_level.clone());
    let filter = || EnvFilter::new(filter_directives(&level));

    if let Some(path) = &config.log_file {
        match OpenOptions::new().create(true).append(true).open(path) {
            Ok(file) => {
                let _ = tracing_subscriber::fmt()
                    .with_env_filter(filter())
                    .with_target(false)
                    .with_ansi(false)
                    .with_writer(Mutex::new(file))
                    .try_init();
                debug!("Logging to {:?}", path);
                return;
            }
            Err(e) => {
                eprintln!("Warning: Could not open log file {:?}: {}", path, e);
            }
        }
    }

    let _ = tracing_subscriber::fmt()
        .with_env_filter(filter())
        .with_target(false)
        .with_writer(std::io::stderr)
        .try_init();
}

fn filter_directives(level: &str) -> String {
    let level = level.trim();
    let level = if level.is_empty() { "warn" } else { level };
    format!("draftwell_core={},draftwell_cli={}", level, level)
}
