//! Tracing subscriber setup.

use std::sync::Once;
use tracing_subscriber::{fmt, layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

static INIT: Once = Once::new();

/// Install the global subscriber. Later calls are no-ops.
///
/// `RUST_LOG` wins when set; otherwise the level is `info`, or `debug` when
/// `verbose` is on. Logs go to stderr so reports on stdout stay clean.
pub fn init(verbose: bool) {
    INIT.call_once(|| {
        let default_level = if verbose { "debug" } else { "info" };
        let env_filter =
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_level));

        tracing_subscriber::registry()
            .with(env_filter)
            .with(fmt::layer().with_writer(std::io::stderr).with_target(false))
            .init();
    });
}

/// Route logs through the test harness's captured output.
pub fn init_test() {
    let _ = fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("inbox_sort=debug")),
        )
        .with_test_writer()
        .try_init();
}
