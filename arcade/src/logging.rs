use tracing_subscriber::{EnvFilter, fmt};

/// Install the global `fmt` subscriber.
///
/// `RUST_LOG` wins when set; otherwise `default_directive` applies. Calling
/// this twice is harmless: the second subscriber is simply not installed.
///
/// ```
/// arcade::init_logging("info");
/// arcade::init_logging("debug");
/// ```
pub fn init_logging(default_directive: &str) {
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(default_directive));
    let _ = fmt().with_env_filter(filter).with_target(false).try_init();
}
