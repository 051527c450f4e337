//! Tracing/logging setup shared by every storefront binary.

/// Tracing configuration (filters, output format).
pub mod tracing;

pub use tracing::LogSettings;

/// Initialize process-wide logging with defaults (`RUST_LOG`, JSON).
///
/// This is safe to call multiple times; subsequent calls become no-ops.
pub fn init() {
    tracing::init();
}

/// Initialize process-wide logging from explicit settings.
pub fn init_with(settings: &LogSettings) {
    tracing::init_with(settings);
}
