//! Registry for all city plugins and their sources.

use std::collections::HashSet;
use std::sync::Arc;

use crate::model::{CityMeta, DatasetId};
use crate::ports::SourcePort;

/// Collection of sources implementing a provider for a single city.
pub struct CityPlugin {
    /// Static metadata describing the city.
    pub meta: CityMeta,
    /// One source per dataset the city publishes.
    pub sources: Vec<Arc<dyn SourcePort>>,
}

/// Registry of every source, in registration order.
pub struct SourceRegistry {
    cities: Vec<CityMeta>,
    sources: Vec<Arc<dyn SourcePort>>,
}

impl SourceRegistry {
    /// Build a registry from the provided plugin list.
    ///
    /// A source whose dataset id is already taken is skipped, since both would write the
    /// same files.
    #[must_use]
    pub fn new(plugins: Vec<CityPlugin>) -> Self {
        let mut seen = HashSet::new();
        let mut cities = Vec::with_capacity(plugins.len());
        let mut sources = Vec::new();

        for plugin in plugins {
            for source in plugin.sources {
                let dataset_id = source.source().dataset_id.clone();
                if seen.insert(dataset_id.clone()) {
                    sources.push(source);
                } else {
                    log::warn!("Skipping duplicate source for dataset {dataset_id}");
                }
            }
            cities.push(plugin.meta);
        }

        Self { cities, sources }
    }

    /// Return metadata for all registered cities.
    #[must_use]
    pub fn cities(&self) -> &[CityMeta] {
        &self.cities
    }

    /// All sources in registration order.
    #[must_use]
    pub fn sources(&self) -> &[Arc<dyn SourcePort>] {
        &self.sources
    }

    /// Look up the source feeding the given dataset.
    #[must_use]
    pub fn source(&self, dataset_id: &DatasetId) -> Option<&Arc<dyn SourcePort>> {
        self.sources
            .iter()
            .find(|source| &source.source().dataset_id == dataset_id)
    }

    /// Number of registered sources.
    #[must_use]
    pub fn len(&self) -> usize {
        self.sources.len()
    }

    /// Whether no source is registered.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.sources.is_empty()
    }
}
