//! Source strategy registry.
//!
//! Strategies are registered once at startup, then the registry is frozen
//! into an `Arc` and handed to the orchestrator. Nothing mutates it after
//! that, so concurrent source runs read it without locking.

use crate::error::ConfigError;
use crate::models::SourceId;
use crate::scrapers;
use crate::strategy::SourceStrategy;
use std::collections::BTreeMap;
use std::sync::Arc;
use tracing::{debug, info};

#[derive(Debug, Default)]
pub struct SourceRegistry {
    strategies: BTreeMap<SourceId, Arc<SourceStrategy>>,
}

impl SourceRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Registry holding every strategy that ships with the crate.
    pub fn with_builtin() -> Result<Self, ConfigError> {
        let mut registry = Self::new();
        for strategy in scrapers::builtin()? {
            registry.register(strategy)?;
        }
        info!(sources = ?registry.ids().collect::<Vec<_>>(), "Registered built-in sources");
        Ok(registry)
    }

    /// Add a strategy. Replacing an existing id is refused.
    pub fn register(&mut self, strategy: SourceStrategy) -> Result<(), ConfigError> {
        let id = strategy.id().clone();
        if self.strategies.contains_key(&id) {
            return Err(ConfigError::DuplicateSource(id));
        }
        debug!(source = %id, name = strategy.display_name(), "Registered source strategy");
        self.strategies.insert(id, Arc::new(strategy));
        Ok(())
    }

    pub fn get(&self, id: &SourceId) -> Result<&Arc<SourceStrategy>, ConfigError> {
        self.strategies
            .get(id)
            .ok_or_else(|| ConfigError::UnknownSource(id.clone()))
    }

    pub fn ids(&self) -> impl Iterator<Item = &SourceId> {
        self.strategies.keys()
    }

    pub fn len(&self) -> usize {
        self.strategies.len()
    }

    pub fn is_empty(&self) -> bool {
        self.strategies.is_empty()
    }

    /// Check that every id in `active` is registered.
    pub fn ensure_known<'a>(&self, active: impl IntoIterator<Item = &'a SourceId>) -> Result<(), ConfigError> {
        for id in active {
            self.get(id)?;
        }
        Ok(())
    }

    /// End registration; the returned handle is read-only.
    pub fn freeze(self) -> Arc<SourceRegistry> {
        Arc::new(self)
    }
}
