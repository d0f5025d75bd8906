//! Test logging bootstrap and assertion macros.
//!
//! Every suite initializes logging through [`init_test_logging`] so failures
//! carry the structured trace that led to them. The macros log the checked
//! value on success as well, which makes a green run greppable when a later
//! red run needs a baseline.

use std::sync::Once;

static INIT: Once = Once::new();

/// Installs a `tracing-subscriber` fmt subscriber once per process.
///
/// Respects `RUST_LOG`; defaults to `debug` for this crate. Safe to call
/// from every test.
pub fn init_test_logging() {
    INIT.call_once(|| {
        let filter = tracing_subscriber::EnvFilter::try_from_default_env()
            .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("sutlab=debug"));
        let _ = tracing_subscriber::fmt()
            .with_env_filter(filter)
            .with_test_writer()
            .try_init();
    });
}

/// Marks the start of a test phase in the log stream.
#[macro_export]
macro_rules! test_phase {
    ($name:expr) => {
        tracing::info!(phase = $name, "test phase start");
    };
}

/// Marks a test as completed in the log stream.
#[macro_export]
macro_rules! test_complete {
    ($name:expr) => {
        tracing::info!(phase = $name, "test complete");
    };
}

/// Asserts a condition, logging the labeled expected/actual values on both
/// outcomes before panicking on failure.
#[macro_export]
macro_rules! assert_with_log {
    ($cond:expr, $label:expr, $expected:expr, $actual:expr) => {
        if $cond {
            tracing::debug!(
                check = $label,
                expected = ?$expected,
                actual = ?$actual,
                "check passed"
            );
        } else {
            tracing::error!(
                check = $label,
                expected = ?$expected,
                actual = ?$actual,
                "check failed"
            );
            panic!(
                "check '{}' failed: expected {:?}, got {:?}",
                $label, $expected, $actual
            );
        }
    };
}
