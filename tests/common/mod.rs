//! Shared helpers for the integration suites.

/// Installs the test subscriber once per process.
pub fn init_test_logging() {
    sutlab::test_logging::init_test_logging();
}
