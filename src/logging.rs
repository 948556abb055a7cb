use crate::config::AppConfig;
use tracing_appender::non_blocking::WorkerGuard;
use tracing_subscriber::{EnvFilter, fmt, prelude::*};

/// Configured level for this crate; dependencies stay at `warn`
///
/// A directive list in `log_level` (anything containing `=` or `,`) is used as is.
fn default_filter(config: &AppConfig) -> EnvFilter {
    let level = config.log_level.trim();
    if level.contains('=') || level.contains(',') {
        EnvFilter::new(level)
    } else {
        EnvFilter::new(directive(level))
    }
}

fn directive(level: &str) -> String {
    format!("warn,{}={level}", env!("CARGO_CRATE_NAME"))
}

/// Install the global subscriber; keep the guard alive until shutdown
pub fn init_logging(config: &AppConfig) -> WorkerGuard {
    let file_appender = match config.rotation.as_str() {
        "hourly" => tracing_appender::rolling::hourly(&config.log_dir, &config.log_file),
        "daily" => tracing_appender::rolling::daily(&config.log_dir, &config.log_file),
        _ => tracing_appender::rolling::never(&config.log_dir, &config.log_file),
    };

    let (non_blocking, guard) = tracing_appender::non_blocking(file_appender);

    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| default_filter(config));

    let registry = tracing_subscriber::registry().with(filter);

    if config.use_json {
        let file_layer = fmt::layer()
            .json()
            .with_target(true)
            .with_writer(non_blocking)
            .with_ansi(false);
        registry.with(file_layer).init();
    } else {
        let file_layer = fmt::layer()
            .with_target(false)
            .with_writer(non_blocking)
            .with_ansi(false);
        let stdout_layer = fmt::layer().with_target(false).with_ansi(true);
        registry.with(file_layer).with(stdout_layer).init();
    }

    guard
}
