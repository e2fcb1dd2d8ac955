//! `tracing` subscriber setup for binaries, tests and benches embedding the pipeline.

use tracing_subscriber::EnvFilter;

/// Install a formatting subscriber filtered by `AI_HOOKS_LOG` (falls back to
/// `RUST_LOG`, then `info`).
///
/// Returns false if a global subscriber was already set.
pub fn init_tracing() -> bool {
    tracing_subscriber::fmt()
        .with_env_filter(env_filter())
        .try_init()
        .is_ok()
}

/// Like [`init_tracing`], but writes through the test harness capture.
pub fn init_test_tracing() -> bool {
    tracing_subscriber::fmt()
        .with_env_filter(env_filter())
        .with_test_writer()
        .try_init()
        .is_ok()
}

fn env_filter() -> EnvFilter {
    EnvFilter::try_from_env("AI_HOOKS_LOG")
        .or_else(|_| EnvFilter::try_from_default_env())
        .unwrap_or_else(|_| EnvFilter::new("info"))
}
