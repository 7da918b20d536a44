use std::time::Duration;

use config::ConfigError;
use serde::Deserialize;
use serde::Serialize;

use crate::Error;
use crate::Result;

/// Hold timeouts for parked poll requests
///
/// A client asking for a long poll with timeout `T` is held for
/// `clamp(T - response_delay_ms, min_hold_timeout_ms, max_hold_timeout_ms)`,
/// leaving the response time to travel back before the client gives up.
#[derive(Debug, Serialize, Deserialize, Clone)]
pub struct LongPollConfig {
    /// Lower bound of a hold
    #[serde(default = "default_min_hold_timeout_ms")]
    pub min_hold_timeout_ms: u64,

    /// Upper bound of a hold
    #[serde(default = "default_max_hold_timeout_ms")]
    pub max_hold_timeout_ms: u64,

    /// Subtracted from the client supplied timeout
    #[serde(default = "default_response_delay_ms")]
    pub response_delay_ms: u64,

    /// Hold used for old clients that only send the hold marker
    #[serde(default = "default_legacy_hold_timeout_ms")]
    pub legacy_hold_timeout_ms: u64,
}

impl Default for LongPollConfig {
    fn default() -> Self {
        Self {
            min_hold_timeout_ms: default_min_hold_timeout_ms(),
            max_hold_timeout_ms: default_max_hold_timeout_ms(),
            response_delay_ms: default_response_delay_ms(),
            legacy_hold_timeout_ms: default_legacy_hold_timeout_ms(),
        }
    }
}

impl LongPollConfig {
    pub fn validate(&self) -> Result<()> {
        if self.min_hold_timeout_ms == 0 {
            return Err(Error::Config(ConfigError::Message(
                "long_poll.min_hold_timeout_ms must be greater than 0".into(),
            )));
        }
        if self.max_hold_timeout_ms < self.min_hold_timeout_ms {
            return Err(Error::Config(ConfigError::Message(format!(
                "long_poll.max_hold_timeout_ms ({}) must be >= min_hold_timeout_ms ({})",
                self.max_hold_timeout_ms, self.min_hold_timeout_ms
            ))));
        }
        Ok(())
    }

    /// Hold duration for a client that asked for `client_timeout`.
    pub fn hold_timeout(
        &self,
        client_timeout: Duration,
    ) -> Duration {
        let requested = (client_timeout.as_millis() as u64).saturating_sub(self.response_delay_ms);
        Duration::from_millis(requested.clamp(self.min_hold_timeout_ms, self.max_hold_timeout_ms))
    }

    pub fn legacy_hold_timeout(&self) -> Duration {
        Duration::from_millis(self.legacy_hold_timeout_ms)
    }
}

fn default_min_hold_timeout_ms() -> u64 {
    10_000
}
fn default_max_hold_timeout_ms() -> u64 {
    120_000
}
fn default_response_delay_ms() -> u64 {
    500
}
fn default_legacy_hold_timeout_ms() -> u64 {
    29_500
}
