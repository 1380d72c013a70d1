/// `load_config` module: reads the environment config YAML named by
/// `--env-config-file` into [`EnvConfig`].
///
/// Both failure modes (unreadable file, invalid YAML) name the offending
/// path so the CLI can report them in a single line.
use anyhow::{Context, Result};
use deployctl_core::config::EnvConfig;
use std::fs;
use std::path::Path;
use tracing::{error, info};

pub fn load_env_config<P: AsRef<Path>>(path: P) -> Result<EnvConfig> {
    let path_ref = path.as_ref();
    info!(config_path = ?path_ref, "Loading environment config from file");

    let content = fs::read_to_string(path_ref)
        .map_err(|e| {
            error!(error = ?e, config_path = ?path_ref, "Failed to read config file");
            e
        })
        .with_context(|| {
            format!(
                "Environment config file {} could not be opened",
                path_ref.display()
            )
        })?;

    let config = EnvConfig::from_yaml_str(&content)
        .map_err(|e| {
            error!(error = ?e, config_path = ?path_ref, "Failed to parse config YAML");
            e
        })
        .with_context(|| {
            format!(
                "Environment config file {} could not be parsed as YAML",
                path_ref.display()
            )
        })?;

    config.trace_loaded();
    Ok(config)
}
