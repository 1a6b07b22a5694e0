use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::ConfigError;

/// Upper bound on the debounce window; anything longer is a misconfiguration
pub const MAX_DEBOUNCE_MS: u64 = 60_000;

/// Upper bound on either concurrency limit
pub const MAX_CONCURRENCY: usize = 1024;

fn default_debounce_ms() -> u64 {
    400
}

fn default_max_terms() -> usize {
    200
}

fn default_auto_search_images() -> bool {
    false
}

fn default_max_concurrent_classifications() -> usize {
    8
}

fn default_max_concurrent_searches() -> usize {
    4
}

/// Term pipeline tuning
#[derive(Debug, Serialize, Deserialize, Clone, PartialEq)]
#[serde(default)]
pub struct PipelineConfig {
    /// Quiet period before debounced input is processed
    #[serde(default = "default_debounce_ms")]
    pub debounce_ms: u64,
    /// Records beyond this limit are reported as failed without enrichment
    #[serde(default = "default_max_terms")]
    pub max_terms: usize,
    /// Start an image search as soon as a term reaches `ready`
    #[serde(default = "default_auto_search_images")]
    pub auto_search_images: bool,
    #[serde(default = "default_max_concurrent_classifications")]
    pub max_concurrent_classifications: usize,
    #[serde(default = "default_max_concurrent_searches")]
    pub max_concurrent_searches: usize,
    #[serde(default)]
    pub retry: RetryConfig,
}

impl Default for PipelineConfig {
    fn default() -> Self {
        Self {
            debounce_ms: default_debounce_ms(),
            max_terms: default_max_terms(),
            auto_search_images: default_auto_search_images(),
            max_concurrent_classifications: default_max_concurrent_classifications(),
            max_concurrent_searches: default_max_concurrent_searches(),
            retry: RetryConfig::default(),
        }
    }
}

impl PipelineConfig {
    pub fn debounce(&self) -> Duration {
        Duration::from_millis(self.debounce_ms)
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.debounce_ms > MAX_DEBOUNCE_MS {
            return Err(ConfigError::OutOfRange {
                field: "debounce_ms",
                value: self.debounce_ms,
                expected: "at most 60000",
            });
        }
        if self.max_terms == 0 {
            return Err(ConfigError::Zero("max_terms"));
        }
        if self.max_concurrent_classifications == 0 {
            return Err(ConfigError::Zero("max_concurrent_classifications"));
        }
        if self.max_concurrent_searches == 0 {
            return Err(ConfigError::Zero("max_concurrent_searches"));
        }
        for (field, value) in [
            ("max_concurrent_classifications", self.max_concurrent_classifications),
            ("max_concurrent_searches", self.max_concurrent_searches),
        ] {
            if value > MAX_CONCURRENCY {
                return Err(ConfigError::OutOfRange {
                    field,
                    value: value as u64,
                    expected: "at most 1024",
                });
            }
        }
        self.retry.validate()
    }
}

fn default_max_attempts() -> u32 {
    1
}

fn default_backoff_ms() -> u64 {
    250
}

/// Retry policy for classifier and image-search calls.
/// `max_attempts = 1` means no retry.
#[derive(Debug, Serialize, Deserialize, Clone, PartialEq)]
#[serde(default)]
pub struct RetryConfig {
    #[serde(default = "default_max_attempts")]
    pub max_attempts: u32,
    /// Linear backoff step, multiplied by the attempt number
    #[serde(default = "default_backoff_ms")]
    pub backoff_ms: u64,
}

impl Default for RetryConfig {
    fn default() -> Self {
        Self {
            max_attempts: default_max_attempts(),
            backoff_ms: default_backoff_ms(),
        }
    }
}

impl RetryConfig {
    /// Delay before attempt number `attempt` (1-based, the first retry is attempt 2)
    pub fn backoff(&self, attempt: u32) -> Duration {
        Duration::from_millis(self.backoff_ms.saturating_mul(attempt.saturating_sub(1) as u64))
    }

    fn validate(&self) -> Result<(), ConfigError> {
        if self.max_attempts == 0 {
            return Err(ConfigError::Zero("retry.max_attempts"));
        }
        Ok(())
    }
}
