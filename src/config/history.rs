use config::ConfigError;
use serde::Deserialize;
use serde::Serialize;

use crate::Error;
use crate::Result;

#[derive(Debug, Serialize, Deserialize, Clone)]
pub struct HistoryConfig {
    /// Oldest records are evicted beyond this count
    #[serde(default = "default_max_entries_per_key")]
    pub max_entries_per_key: usize,

    #[serde(default = "default_page_size")]
    pub default_page_size: usize,
}

impl Default for HistoryConfig {
    fn default() -> Self {
        Self {
            max_entries_per_key: default_max_entries_per_key(),
            default_page_size: default_page_size(),
        }
    }
}

impl HistoryConfig {
    pub fn validate(&self) -> Result<()> {
        if self.max_entries_per_key == 0 || self.default_page_size == 0 {
            return Err(Error::Config(ConfigError::Message(
                "history.max_entries_per_key and history.default_page_size must be greater than 0"
                    .into(),
            )));
        }
        Ok(())
    }
}

fn default_max_entries_per_key() -> usize {
    100
}
fn default_page_size() -> usize {
    20
}
