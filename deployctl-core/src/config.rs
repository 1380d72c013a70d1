use std::collections::BTreeMap;

use serde::Deserialize;
use tracing::{debug, info};

/// Environment-specific configuration read from the YAML file passed via
/// `--env-config-file`. Keys other than the ones below are ignored.
#[derive(Debug, Default, Clone, Deserialize)]
pub struct EnvConfig {
    /// Bucket the frontend is mirrored into. Buckets are named by hostname.
    #[serde(rename = "S3_BUCKET_NAME", default)]
    pub s3_bucket_name: Option<String>,
    /// Variables exported to `npm run build`.
    #[serde(rename = "APP_CONFIG", default)]
    pub app_config: BTreeMap<String, serde_yaml::Value>,
}

impl EnvConfig {
    /// Parses the YAML text of a config file. An empty document is an empty config.
    pub fn from_yaml_str(content: &str) -> Result<Self, serde_yaml::Error> {
        if content.trim().is_empty() {
            return Ok(Self::default());
        }
        serde_yaml::from_str(content)
    }

    /// The configured bucket name, treating an empty string as absent.
    pub fn bucket_name(&self) -> Option<&str> {
        self.s3_bucket_name
            .as_deref()
            .map(str::trim)
            .filter(|name| !name.is_empty())
    }

    /// `APP_CONFIG` flattened to environment variable pairs.
    pub fn app_env(&self) -> BTreeMap<String, String> {
        self.app_config
            .iter()
            .map(|(key, value)| (key.clone(), scalar_to_string(value)))
            .collect()
    }

    pub fn trace_loaded(&self) {
        info!(
            bucket = self.bucket_name().unwrap_or("<unset>"),
            app_config_count = self.app_config.len(),
            "Loaded environment config"
        );
        debug!(?self, "Environment config loaded (full debug)");
    }
}

fn scalar_to_string(value: &serde_yaml::Value) -> String {
    match value {
        serde_yaml::Value::Null => String::new(),
        serde_yaml::Value::Bool(b) => b.to_string(),
        serde_yaml::Value::Number(n) => n.to_string(),
        serde_yaml::Value::String(s) => s.clone(),
        other => serde_yaml::to_string(other)
            .map(|s| s.trim_end().to_string())
            .unwrap_or_default(),
    }
}
