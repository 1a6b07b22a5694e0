use std::env;

use serde::{Deserialize, Serialize};

use self::backend::BackendConfig;
use self::pipeline::PipelineConfig;

pub mod backend;
pub mod pipeline;

pub use pipeline::RetryConfig;

fn default_log_filter() -> String {
    "info".to_string()
}

#[derive(Debug, Serialize, Deserialize, Clone, PartialEq)]
#[serde(default)]
pub struct Config {
    pub pipeline: PipelineConfig,
    pub backend: BackendConfig,
    /// `tracing_subscriber::EnvFilter` directive
    #[serde(default = "default_log_filter")]
    pub log_filter: String,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            pipeline: PipelineConfig::default(),
            backend: BackendConfig::default(),
            log_filter: default_log_filter(),
        }
    }
}

impl Config {
    /// Defaults with environment overrides applied
    pub fn new() -> Self {
        let mut config = Self::default();
        config.apply_env();
        config
    }

    pub fn apply_env(&mut self) {
        if let Some(debounce_ms) = env::var("TANGO_DEBOUNCE_MS")
            .ok()
            .and_then(|v| v.parse().ok())
        {
            self.pipeline.debounce_ms = debounce_ms;
        }

        if let Ok(filter) = env::var("TANGO_LOG") {
            self.log_filter = filter;
        }

        self.backend.apply_env();
    }
}

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ConfigError {
    #[error("{0} must be greater than zero")]
    Zero(&'static str),

    #[error("{field} = {value} is out of range, expected {expected}")]
    OutOfRange {
        field: &'static str,
        value: u64,
        expected: &'static str,
    },
}

#[cfg(test)]
mod tests {
    use serial_test::serial;

    use super::*;

    #[test]
    #[serial]
    fn env_overrides_defaults() {
        unsafe {
            env::set_var("TANGO_DEBOUNCE_MS", "75");
            env::set_var("TANGO_BACKEND_URL", "http://backend:9000");
        }

        let config = Config::new();

        unsafe {
            env::remove_var("TANGO_DEBOUNCE_MS");
            env::remove_var("TANGO_BACKEND_URL");
        }

        assert_eq!(config.pipeline.debounce_ms, 75);
        assert!(config.backend.enabled);
        assert_eq!(config.backend.base_url, "http://backend:9000");
    }

    #[test]
    #[serial]
    fn unparsable_env_is_ignored() {
        unsafe {
            env::set_var("TANGO_DEBOUNCE_MS", "soon");
        }

        let config = Config::new();

        unsafe {
            env::remove_var("TANGO_DEBOUNCE_MS");
        }

        assert_eq!(config.pipeline.debounce_ms, 400);
    }

    #[test]
    fn partial_json_profile() {
        let config: Config =
            serde_json::from_str(r#"{ "pipeline": { "auto_search_images": true } }"#).unwrap();

        assert!(config.pipeline.auto_search_images);
        assert_eq!(config.log_filter, "info");
        assert!(!config.backend.enabled);
    }
}
