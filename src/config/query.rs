use config::ConfigError;
use serde::Deserialize;
use serde::Serialize;

use crate::Error;
use crate::Result;

/// Read and write guard retry budgets
#[derive(Debug, Serialize, Deserialize, Clone)]
pub struct QueryConfig {
    /// Non-blocking read guard attempts before a query reports `CONFLICT`
    #[serde(default = "default_conflict_retry_attempts")]
    pub conflict_retry_attempts: usize,

    /// Non-blocking write guard attempts before a publish fails with
    /// `WriteConflict`
    #[serde(default = "default_write_lock_retry_attempts")]
    pub write_lock_retry_attempts: usize,
}

impl Default for QueryConfig {
    fn default() -> Self {
        Self {
            conflict_retry_attempts: default_conflict_retry_attempts(),
            write_lock_retry_attempts: default_write_lock_retry_attempts(),
        }
    }
}

impl QueryConfig {
    pub fn validate(&self) -> Result<()> {
        if self.conflict_retry_attempts == 0 {
            return Err(Error::Config(ConfigError::Message(
                "query.conflict_retry_attempts must be at least 1".into(),
            )));
        }
        if self.write_lock_retry_attempts == 0 {
            return Err(Error::Config(ConfigError::Message(
                "query.write_lock_retry_attempts must be at least 1".into(),
            )));
        }
        Ok(())
    }
}

fn default_conflict_retry_attempts() -> usize {
    9
}
fn default_write_lock_retry_attempts() -> usize {
    1000
}
