//! CLI configuration

use serde::{Deserialize, Serialize};
use std::path::Path;

use domscope::EngineConfig;

use crate::error::CliResult;

/// CLI verbosity level
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum Verbosity {
    /// Quiet - errors only
    Quiet,
    /// Normal - warnings and errors
    #[default]
    Normal,
    /// Verbose - info
    Verbose,
    /// Debug - debug events
    Debug,
    /// Trace - every event
    Trace,
}

impl Verbosity {
    /// Map -q / -v flags to a level
    #[must_use]
    pub const fn from_flags(quiet: bool, verbose: u8) -> Self {
        if quiet {
            return Self::Quiet;
        }
        match verbose {
            0 => Self::Normal,
            1 => Self::Verbose,
            2 => Self::Debug,
            _ => Self::Trace,
        }
    }

    /// Check if quiet mode
    #[must_use]
    pub const fn is_quiet(self) -> bool {
        matches!(self, Self::Quiet)
    }

    /// Default tracing filter directive for this level
    #[must_use]
    pub const fn filter_directive(self) -> &'static str {
        match self {
            Self::Quiet => "error",
            Self::Normal => "warn",
            Self::Verbose => "info",
            Self::Debug => "debug",
            Self::Trace => "trace",
        }
    }
}

/// CLI configuration
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CliConfig {
    /// Verbosity level
    pub verbosity: Verbosity,
    /// Engine settings
    pub engine: EngineConfig,
}

impl CliConfig {
    /// Create a new default configuration
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Set verbosity
    #[must_use]
    pub const fn with_verbosity(mut self, verbosity: Verbosity) -> Self {
        self.verbosity = verbosity;
        self
    }

    /// Set the engine configuration
    #[must_use]
    pub const fn with_engine(mut self, engine: EngineConfig) -> Self {
        self.engine = engine;
        self
    }

    /// Load engine settings from `path` when given, defaults otherwise
    pub fn load_engine(mut self, path: Option<&Path>) -> CliResult<Self> {
        if let Some(path) = path {
            self.engine = EngineConfig::from_yaml_file(path)?;
        }
        Ok(self)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    #[test]
    fn test_verbosity_from_flags() {
        assert_eq!(Verbosity::from_flags(true, 3), Verbosity::Quiet);
        assert_eq!(Verbosity::from_flags(false, 0), Verbosity::Normal);
        assert_eq!(Verbosity::from_flags(false, 2), Verbosity::Debug);
        assert_eq!(Verbosity::from_flags(false, 9), Verbosity::Trace);
        assert_eq!(Verbosity::Verbose.filter_directive(), "info");
    }

    #[test]
    fn test_load_engine_from_file() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        writeln!(file, "find_timeout_ms: 99").unwrap();
        let config = CliConfig::new().load_engine(Some(file.path())).unwrap();
        assert_eq!(config.engine.find_timeout_ms, 99);

        let defaults = CliConfig::new().load_engine(None).unwrap();
        assert_eq!(defaults.engine, EngineConfig::default());
    }
}
