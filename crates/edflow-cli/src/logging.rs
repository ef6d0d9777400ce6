use std::io;

use tracing_subscriber::{EnvFilter, fmt, layer::SubscriberExt as _, util::SubscriberInitExt as _};

/// Installs the stderr subscriber.
///
/// The filter comes from `EDFLOW_LOG`, then `RUST_LOG`, then the number of
/// `-v` flags. Stdout stays free for reports.
pub(crate) fn init(verbose: u8) {
    let filter = EnvFilter::try_from_env("EDFLOW_LOG")
        .or_else(|_| EnvFilter::try_from_default_env())
        .unwrap_or_else(|_| EnvFilter::new(default_directives(verbose)));

    tracing_subscriber::registry()
        .with(filter)
        .with(
            fmt::layer()
                .with_writer(io::stderr)
                .with_target(false)
                .without_time(),
        )
        .init();
}

fn default_directives(verbose: u8) -> String {
    let level = match verbose {
        0 => "info",
        1 => "debug",
        _ => "trace",
    };
    format!("warn,edflow={level},edflow_analysis={level},edflow_stats={level}")
}
