//! Tracing/logging setup shared by the binary and the test harnesses.

/// Initialize process-wide tracing with JSON output.
///
/// This is safe to call multiple times; subsequent calls become no-ops.
pub fn init() {
    tracing::init(tracing::LogFormat::from_env());
}

/// Compact, human-readable output captured by the test harness.
pub fn init_for_tests() {
    tracing::init_test();
}

/// Tracing configuration (filters, formats).
pub mod tracing;
