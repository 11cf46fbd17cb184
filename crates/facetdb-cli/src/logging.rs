// Logging for the facetdb binary, powered by tracing-subscriber.
//
// Library crates log through the `log` facade; `tracing_log::LogTracer`
// forwards those records into the subscriber installed here. The console
// layer writes to stderr so `facetdb export` output on stdout stays clean.

use std::collections::HashMap;
use std::fs::{self, OpenOptions};
use std::path::Path;

use facetdb_configs::LoggingSettings;
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;
use tracing_subscriber::{EnvFilter, Layer};

/// Log format type
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LogFormat {
    /// Compact text format: timestamp LEVEL target - message
    Compact,
    /// JSON Lines format for structured logging
    Json,
}

impl LogFormat {
    pub fn parse(s: &str) -> Self {
        match s.to_lowercase().as_str() {
            "json" | "jsonl" => LogFormat::Json,
            _ => LogFormat::Compact,
        }
    }
}

/// Build the `EnvFilter` from the base level, noisy-crate overrides and the
/// per-target levels from config.
pub fn build_env_filter(level: &str, target_levels: &HashMap<String, String>) -> anyhow::Result<EnvFilter> {
    let mut directives = vec![level.to_string()];

    let noisy: &[(&str, &str)] = &[("rocksdb", "warn"), ("tracing", "warn")];
    for (target, lvl) in noisy {
        directives.push(format!("{}={}", target, lvl));
    }

    // Sorted so the filter string is stable
    let mut targets: Vec<_> = target_levels.iter().collect();
    targets.sort();
    for (target, lvl) in targets {
        directives.push(format!("{}={}", target, lvl));
    }

    let filter_str = directives.join(",");
    EnvFilter::try_new(&filter_str)
        .map_err(|e| anyhow::anyhow!("Invalid tracing filter '{}': {}", filter_str, e))
}

/// Initialize logging from the `[logging]` section.
///
/// Sets up `tracing-subscriber` with:
///  - a stderr console layer (when `log_to_console` is true)
///  - a file layer, compact text or JSON lines (when `file_path` is set)
///  - the `tracing_log::LogTracer` bridge for `log::*` calls
pub fn init_logging(settings: &LoggingSettings) -> anyhow::Result<()> {
    let log_format = LogFormat::parse(&settings.format);

    // Bridge `log` crate → tracing
    tracing_log::LogTracer::init().ok(); // ok() in case already initialized

    let console_layer = if settings.log_to_console {
        Some(
            tracing_subscriber::fmt::layer()
                .with_writer(std::io::stderr)
                .with_target(true)
                .with_filter(build_env_filter(&settings.level, &settings.targets)?),
        )
    } else {
        None
    };

    let file_layer = match settings.file_path.as_deref() {
        Some(file_path) => {
            if let Some(parent) = Path::new(file_path).parent() {
                fs::create_dir_all(parent)?;
            }
            let log_file = OpenOptions::new().create(true).append(true).open(file_path)?;

            let layer = if log_format == LogFormat::Json {
                tracing_subscriber::fmt::layer()
                    .json()
                    .with_writer(log_file)
                    .with_target(true)
                    .with_filter(build_env_filter(&settings.level, &settings.targets)?)
                    .boxed()
            } else {
                tracing_subscriber::fmt::layer()
                    .with_ansi(false)
                    .with_writer(log_file)
                    .with_target(true)
                    .with_filter(build_env_filter(&settings.level, &settings.targets)?)
                    .boxed()
            };
            Some(layer)
        }
        None => None,
    };

    tracing_subscriber::registry()
        .with(console_layer)
        .with(file_layer)
        .init();

    tracing::trace!(
        "Logging initialized: level={}, console={}, file={:?}",
        settings.level,
        settings.log_to_console,
        settings.file_path
    );

    Ok(())
}
