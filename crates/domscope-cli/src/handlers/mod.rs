//! Command handlers

pub mod config;
pub mod find;
pub mod inspect;

pub use config::execute_config;
pub use find::{execute_find, params_from_args};
pub use inspect::execute_inspect;

use std::path::Path;

use domscope::Page;

use crate::config::CliConfig;
use crate::error::CliResult;

/// Read a markup file
pub(crate) fn read_markup(path: &Path) -> CliResult<String> {
    Ok(std::fs::read_to_string(path)?)
}

/// Load a markup file as a static page using the configured engine settings
pub(crate) fn load_page(path: &Path, config: &CliConfig) -> CliResult<Page> {
    Ok(Page::from_markup(&read_markup(path)?)?.with_config(config.engine))
}
