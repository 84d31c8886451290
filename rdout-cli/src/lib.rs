//! RDoUT CLI Library
//!
//! Shared functionality for RDoUT command-line tools.

pub mod config;
pub mod stats;

pub use config::{ArqSection, Config, FaultSection, ReceiverSection, SenderSection};
pub use stats::{compact_send_summary, display_receiver_stats, display_send_report, format_bytes};

/// Initialize logging for a binary
///
/// `RUST_LOG` wins over `default_level` when it is set.
pub fn init_logging(default_level: &str) {
    let filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new(default_level));
    tracing_subscriber::fmt().with_env_filter(filter).init();
}
