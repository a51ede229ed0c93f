//! Config command handler

use domscope::EngineConfig;

use crate::commands::ConfigArgs;
use crate::config::CliConfig;
use crate::error::CliResult;

/// Execute the config command, returning the configuration as YAML
pub fn execute_config(config: &CliConfig, args: &ConfigArgs) -> CliResult<String> {
    let engine = if args.defaults {
        EngineConfig::default()
    } else {
        config.engine
    };
    Ok(serde_yaml_ng::to_string(&engine)?)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_effective_and_default() {
        let config = CliConfig::new().with_engine(EngineConfig::new().with_find_timeout(7));
        let effective = execute_config(&config, &ConfigArgs { defaults: false }).unwrap();
        assert!(effective.contains("find_timeout_ms: 7"));

        let defaults = execute_config(&config, &ConfigArgs { defaults: true }).unwrap();
        assert!(defaults.contains("find_timeout_ms: 5000"));
        assert!(defaults.contains("navigate_settle_ms: 500"));
    }
}
