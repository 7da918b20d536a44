//! Runtime configuration.
//!
//! Values are merged from, in increasing priority:
//! 1. Type defaults
//! 2. The file named by `CONFIG_PATH`, when set
//! 3. `CONFHUB__`-prefixed environment variables, e.g.
//!    `CONFHUB__LONG_POLL__MIN_HOLD_TIMEOUT_MS=5000`

mod fuzzy_watch;
mod history;
mod long_poll;
mod query;

pub use fuzzy_watch::*;
pub use history::*;
pub use long_poll::*;
pub use query::*;


use std::env;

use config::Config;
use config::Environment;
use config::File;
use serde::Deserialize;
use serde::Serialize;

use crate::Result;

const ENV_PREFIX: &str = "CONFHUB";

#[derive(Debug, Serialize, Deserialize, Clone, Default)]
pub struct ConfHubConfig {
    #[serde(default)]
    pub query: QueryConfig,
    #[serde(default)]
    pub long_poll: LongPollConfig,
    #[serde(default)]
    pub fuzzy_watch: FuzzyWatchConfig,
    #[serde(default)]
    pub history: HistoryConfig,
}

impl ConfHubConfig {
    /// Loads defaults, `CONFIG_PATH` and environment overrides.
    ///
    /// Not validated; call [`ConfHubConfig::validate`] once all overrides
    /// are applied.
    pub fn new() -> Result<Self> {
        let mut builder = Config::builder().add_source(Config::try_from(&Self::default())?);
        if let Ok(config_path) = env::var("CONFIG_PATH") {
            builder = builder.add_source(File::with_name(&config_path).required(true));
        }
        builder = builder.add_source(environment());

        let config: Self = builder.build()?.try_deserialize()?;
        Ok(config)
    }

    /// Layers the file at `path` over the current values. Environment
    /// variables still win.
    pub fn with_override_config(
        &self,
        path: &str,
    ) -> Result<Self> {
        let config: Self = Config::builder()
            .add_source(Config::try_from(self)?)
            .add_source(File::with_name(path))
            .add_source(environment())
            .build()?
            .try_deserialize()?;
        Ok(config)
    }

    pub fn validate(self) -> Result<Self> {
        self.query.validate()?;
        self.long_poll.validate()?;
        self.fuzzy_watch.validate()?;
        self.history.validate()?;
        Ok(self)
    }
}

fn environment() -> Environment {
    Environment::with_prefix(ENV_PREFIX)
        .separator("__")
        .ignore_empty(true)
        .try_parsing(true)
}
