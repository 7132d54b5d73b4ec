//! RDT CLI Library
//!
//! Shared functionality for the RDT command-line tools.

pub mod config;
pub mod stats;

pub use config::{ClientSection, Config, ConfigError, ServerSection, WindowMode};
pub use stats::{display_receive_report, display_send_report, format_bandwidth, format_bytes};

use tracing_subscriber::EnvFilter;

/// Install the tracing subscriber
///
/// `RUST_LOG` takes precedence; otherwise `verbose` selects debug over info.
pub fn init_logging(verbose: bool) {
    let default_level = if verbose { "debug" } else { "info" };
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_level));

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();
}
