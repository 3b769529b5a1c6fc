use std::fs::OpenOptions;
use std::path::Path;

use tracing_subscriber::{EnvFilter, fmt, prelude::*};

/// Install the global subscriber.
///
/// Logs go to stderr so stdout stays parseable, or to `log_file` when given.
/// `RUST_LOG` wins over the `--debug` defaults.
pub fn init_logger(json_mode: bool, debug: bool, log_file: Option<&Path>) {
    let default_filter = if debug {
        "ros_z_param=debug,ros_z_param_console=debug,zenoh=info"
    } else {
        "ros_z_param=warn,ros_z_param_console=info,zenoh=warn"
    };
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_filter));

    let file = log_file.and_then(|path| {
        OpenOptions::new()
            .create(true)
            .append(true)
            .open(path)
            .map_err(|e| eprintln!("Cannot open log file {}: {e}", path.display()))
            .ok()
    });

    match (json_mode, file) {
        (true, Some(file)) => tracing_subscriber::registry()
            .with(filter)
            .with(
                fmt::layer()
                    .json()
                    .with_target(false)
                    .with_current_span(false)
                    .with_writer(file)
                    .with_ansi(false),
            )
            .init(),
        (true, None) => tracing_subscriber::registry()
            .with(filter)
            .with(
                fmt::layer()
                    .json()
                    .with_target(false)
                    .with_current_span(false)
                    .with_writer(std::io::stderr),
            )
            .init(),
        (false, Some(file)) => tracing_subscriber::registry()
            .with(filter)
            .with(fmt::layer().compact().with_writer(file).with_ansi(false))
            .init(),
        (false, None) => tracing_subscriber::registry()
            .with(filter)
            .with(fmt::layer().compact().with_writer(std::io::stderr))
            .init(),
    }
}
