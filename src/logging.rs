//! Logging setup
//!
//! The library only emits `tracing` events. Binaries call `init` once; logs go
//! to stderr so report output on stdout stays machine-readable.

use tracing_subscriber::{fmt, EnvFilter};

/// Initialize the global subscriber.
///
/// `RUST_LOG` wins when set (e.g. `RUST_LOG=adx_pulse=debug`); otherwise
/// `default_level` is used. Calling it twice is a no-op.
pub fn init(default_level: &str) {
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(default_level));

    let _ = fmt()
        .with_env_filter(filter)
        .with_target(true)
        .with_line_number(true)
        .with_writer(std::io::stderr)
        .try_init();
}

/// Initialize logging for tests with the test writer
pub fn init_test() {
    let _ = fmt()
        .with_env_filter(EnvFilter::new("debug"))
        .with_test_writer()
        .try_init();
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_init_is_idempotent() {
        init_test();
        init_test();
        init("warn");
        tracing::debug!("logging initialized");
    }
}
