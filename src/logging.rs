//! Tracing subscriber setup.
//!
//! Levels used by the crates:
//! - ERROR: a mechanism invariant broke and the process is about to abort
//! - WARN: failed acceptor identity registration, out-of-order per-message tokens
//! - INFO: module load, acceptor identity registered
//! - DEBUG: one event per negotiation round and per decoded error
//! - TRACE: token sizes and loopback ticket details

use tracing_subscriber::EnvFilter;

/// Installs a subscriber filtered by `RUST_LOG`, defaulting to `warn`.
///
/// The host may load the module into a process that already has a
/// subscriber; that one is kept.
pub fn init() {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn"));

    let _ = tracing_subscriber::fmt().with_env_filter(filter).with_writer(std::io::stderr).try_init();
}

/// Like [`init`], but writes through the test harness and defaults to `debug`.
pub fn init_for_tests() {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("debug"));

    let _ = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_test_writer()
        .try_init();
}
