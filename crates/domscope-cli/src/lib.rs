//! Domscope CLI library
//!
//! Offline inspection of markup files with the Domscope engine.
//!
//! ## Usage
//!
//! ```bash
//! domscope inspect page.html                     # Tree with command targets
//! domscope find page.html --id grid -m ends-with # First match
//! domscope find page.html -t a --all -f json     # Every match as JSON
//! domscope config --defaults                     # Built-in engine settings
//! ```

#![warn(missing_docs)]
#![allow(clippy::module_name_repetitions)]
#![allow(clippy::format_push_string)]
#![allow(clippy::missing_errors_doc)]

mod commands;
mod config;
mod error;
pub mod handlers;
mod logging;
mod output;

pub use commands::{Cli, Commands, ConfigArgs, FindArgs, FormatArg, InspectArgs, MethodArg};
pub use config::{CliConfig, Verbosity};
pub use error::{CliError, CliResult};
pub use logging::init_tracing;
pub use output::{collect_rows, render_text, NodeRow};
