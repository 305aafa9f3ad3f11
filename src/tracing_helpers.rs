//! Logging macros that forward to `tracing` when the `tracing` feature is enabled.
//!
//! Without the feature they expand to nothing, so the rebalancing loops carry no logging cost.
//!
//! ```bash
//! RUST_LOG=cordyceps_avl=trace cargo run --features tracing --bin illu-tree
//! ```

#![allow(unused_macros, unused_imports)]

#[cfg(feature = "tracing")]
macro_rules! trace_log {
    ($($arg:tt)*) => {
        tracing::trace!($($arg)*)
    };
}

#[cfg(not(feature = "tracing"))]
macro_rules! trace_log {
    ($($arg:tt)*) => {};
}

#[cfg(feature = "tracing")]
macro_rules! debug_log {
    ($($arg:tt)*) => {
        tracing::debug!($($arg)*)
    };
}

#[cfg(not(feature = "tracing"))]
macro_rules! debug_log {
    ($($arg:tt)*) => {};
}

pub(crate) use debug_log;
pub(crate) use trace_log;

/// Installs a `tracing-subscriber` formatter filtered by `RUST_LOG`.
///
/// Used by the binaries; does nothing when the `tracing` feature is off.
pub fn init_logging() {
    #[cfg(feature = "tracing")]
    {
        use tracing_subscriber::EnvFilter;

        let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn"));
        // A subscriber may already be installed by an embedding program.
        let _ = tracing_subscriber::fmt()
            .with_env_filter(filter)
            .with_target(true)
            .try_init();
    }
}
