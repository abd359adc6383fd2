// 📝 Logging setup
//
// `RUST_LOG` wins when set; otherwise the level passed in is used. Output goes
// to stderr so stdout stays free for the run summary.

use tracing_subscriber::{fmt, prelude::*, EnvFilter};

/// Install the global subscriber. Calling it twice is harmless.
pub fn init_logging(default_level: &str) {
    let env_filter = EnvFilter::try_from_default_env()
        .or_else(|_| EnvFilter::try_new(default_level))
        .unwrap_or_else(|_| EnvFilter::new("info"));

    let console_layer = fmt::layer().with_writer(std::io::stderr).with_target(false);

    // Already initialised (tests, repeated calls): keep the first subscriber
    let _ = tracing_subscriber::registry()
        .with(env_filter)
        .with(console_layer)
        .try_init();
}
