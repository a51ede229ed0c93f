//! Logging setup

use tracing_subscriber::EnvFilter;

use crate::config::Verbosity;
use crate::error::{CliError, CliResult};

/// Install the global fmt subscriber on stderr.
///
/// `RUST_LOG` wins over the level derived from the -v / -q flags.
pub fn init_tracing(verbosity: Verbosity) -> CliResult<()> {
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(verbosity.filter_directive()));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .with_target(false)
        .try_init()
        .map_err(|e| CliError::config(format!("cannot install logger: {e}")))
}
