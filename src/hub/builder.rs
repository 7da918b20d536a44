//! Assembles a [`ConfigHub`].
//!
//! ```ignore
//! let hub = ConfigHubBuilder::new()?
//!     .trace_sink(Arc::new(MyAuditSink))  // optional override
//!     .build()?;
//! ```
//!
//! Components not supplied fall back to in-process defaults:
//! [`MemoryConfigStore`] and [`LogTraceSink`].

use std::sync::Arc;

use tracing::debug;
use tracing::info;

use super::ConfigHub;
use crate::ConfHubConfig;
use crate::FuzzyWatchRegistry;
use crate::LogTraceSink;
use crate::LongPollCoordinator;
use crate::MemoryConfigStore;
use crate::QueryResolutionChain;
use crate::Result;
use crate::TraceSink;

#[derive(Default)]
pub struct ConfigHubBuilder {
    config: ConfHubConfig,
    store: Option<Arc<MemoryConfigStore>>,
    trace_sink: Option<Arc<dyn TraceSink>>,
}

impl ConfigHubBuilder {
    /// Starts from the layered configuration (defaults, `CONFIG_PATH`,
    /// `CONFHUB__*` environment).
    pub fn new() -> Result<Self> {
        Ok(Self::from_config(ConfHubConfig::new()?))
    }

    /// Starts from the layered configuration with `path` merged on top.
    pub fn with_override_config(path: &str) -> Result<Self> {
        info!("with_override_config from: {}", path);
        Ok(Self::from_config(ConfHubConfig::new()?.with_override_config(path)?))
    }

    pub fn from_config(config: ConfHubConfig) -> Self {
        Self {
            config,
            store: None,
            trace_sink: None,
        }
    }

    pub fn config(
        mut self,
        config: ConfHubConfig,
    ) -> Self {
        self.config = config;
        self
    }

    pub fn store(
        mut self,
        store: Arc<MemoryConfigStore>,
    ) -> Self {
        self.store = Some(store);
        self
    }

    pub fn trace_sink(
        mut self,
        trace_sink: Arc<dyn TraceSink>,
    ) -> Self {
        self.trace_sink = Some(trace_sink);
        self
    }

    /// Validates the configuration and wires the components.
    pub fn build(self) -> Result<ConfigHub> {
        let config = self.config.validate()?;

        let store = self.store.unwrap_or_else(|| {
            Arc::new(MemoryConfigStore::new(
                config.query.write_lock_retry_attempts,
                config.history.max_entries_per_key,
            ))
        });
        let trace_sink = self.trace_sink.unwrap_or_else(|| Arc::new(LogTraceSink));

        let chain = QueryResolutionChain::new(store.clone(), trace_sink, &config.query);
        let coordinator = Arc::new(LongPollCoordinator::new(store.clone(), config.long_poll.clone()));
        let fuzzy = FuzzyWatchRegistry::new(store.clone(), config.fuzzy_watch.clone());

        debug!(?chain, "Config hub assembled");
        Ok(ConfigHub {
            config,
            store,
            chain,
            coordinator,
            fuzzy,
        })
    }
}
