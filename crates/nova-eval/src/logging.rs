use tracing_subscriber::prelude::*;

use crate::config::LoggingConfig;

/// Install the global subscriber for evaluator logs.
///
/// Safe to call more than once; only the first call installs a subscriber and
/// later calls return `false`.
pub fn init(config: &LoggingConfig) -> bool {
    let filter = config.env_filter();
    let registry = tracing_subscriber::registry().with(filter);
    let installed = if config.json {
        registry
            .with(
                tracing_subscriber::fmt::layer()
                    .json()
                    .with_writer(std::io::stderr),
            )
            .try_init()
    } else {
        registry
            .with(
                tracing_subscriber::fmt::layer()
                    .with_writer(std::io::stderr)
                    .with_ansi(false),
            )
            .try_init()
    };
    installed.is_ok()
}
