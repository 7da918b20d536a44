use config::ConfigError;
use serde::Deserialize;
use serde::Serialize;

use crate::Error;
use crate::Result;

/// Wildcard watch registry limits
#[derive(Debug, Serialize, Deserialize, Clone)]
pub struct FuzzyWatchConfig {
    /// Maximum number of distinct active patterns
    #[serde(default = "default_max_patterns")]
    pub max_patterns: usize,

    /// Per-subscriber delta channel capacity. Deltas for a full channel are
    /// dropped; subscribers re-sync by re-registering.
    #[serde(default = "default_subscriber_buffer_size")]
    pub subscriber_buffer_size: usize,
}

impl Default for FuzzyWatchConfig {
    fn default() -> Self {
        Self {
            max_patterns: default_max_patterns(),
            subscriber_buffer_size: default_subscriber_buffer_size(),
        }
    }
}

impl FuzzyWatchConfig {
    pub fn validate(&self) -> Result<()> {
        if self.max_patterns == 0 {
            return Err(Error::Config(ConfigError::Message(
                "fuzzy_watch.max_patterns must be greater than 0".into(),
            )));
        }
        if self.subscriber_buffer_size == 0 {
            return Err(Error::Config(ConfigError::Message(
                "fuzzy_watch.subscriber_buffer_size must be greater than 0".into(),
            )));
        }
        Ok(())
    }
}

fn default_max_patterns() -> usize {
    20_000
}
fn default_subscriber_buffer_size() -> usize {
    64
}
