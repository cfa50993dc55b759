//! Collector handle with a lazily populated cache of remote state.

use crate::backend::Backend;
use crate::backend::http::HttpBackend;
use crate::error::{Error, Result};
use crate::types::{
    ClientConfig, CollectorMetadata, DEFAULT_ENDPOINT, DEFAULT_QUERY_LIMIT, RemoteSource,
    SourceDefinition, SyncMode,
};
use std::fmt;
use std::time::Duration;

/// Snapshot of one collector as last fetched from the API.
#[derive(Debug, Clone)]
struct Cache {
    metadata: CollectorMetadata,
    sources: Vec<RemoteSource>,
}

/// Handle on a single named collector.
///
/// The collector id is resolved on first use by searching the collector
/// list. Metadata and sources are fetched together on first access and
/// kept until [`refresh`](Self::refresh) replaces them; mutating calls
/// never touch the cache themselves.
pub struct Collector {
    name: String,
    query_limit: u32,
    endpoint: String,
    backend: Box<dyn Backend>,
    id: Option<u64>,
    cache: Option<Cache>,
}

impl fmt::Debug for Collector {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Collector")
            .field("name", &self.name)
            .field("query_limit", &self.query_limit)
            .field("endpoint", &self.endpoint)
            .field("id", &self.id)
            .field("cached", &self.cache.is_some())
            .finish_non_exhaustive()
    }
}

impl Collector {
    /// Open a handle that talks to the Sumo Logic API over HTTP.
    pub fn connect(config: &ClientConfig) -> Self {
        let backend = HttpBackend::new(&config.endpoint, &config.credentials, config.timeout);
        Self::with_backend(&config.collector, Box::new(backend))
            .with_query_limit(config.query_limit)
            .with_endpoint(&config.endpoint)
    }

    /// Open a handle over any backend.
    pub fn with_backend(name: impl Into<String>, backend: Box<dyn Backend>) -> Self {
        Self {
            name: name.into(),
            query_limit: DEFAULT_QUERY_LIMIT,
            endpoint: DEFAULT_ENDPOINT.to_string(),
            backend,
            id: None,
            cache: None,
        }
    }

    /// Set how many collectors are requested when searching by name.
    #[must_use]
    pub fn with_query_limit(mut self, limit: u32) -> Self {
        self.query_limit = limit;
        self
    }

    /// Set the endpoint shown in error messages.
    #[must_use]
    pub fn with_endpoint(mut self, endpoint: impl Into<String>) -> Self {
        self.endpoint = endpoint.into().trim_end_matches('/').to_string();
        self
    }

    /// Collector name.
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Whether a collector with this name is registered.
    ///
    /// Only the first `query_limit` collectors are searched; a collector
    /// beyond that limit reads as missing.
    pub fn exists(&mut self) -> Result<bool> {
        if self.id.is_some() {
            return Ok(true);
        }

        let collectors = self.backend.list_collectors(self.query_limit)?;
        self.id = collectors
            .into_iter()
            .find(|c| c.name == self.name)
            .map(|c| c.id);

        match self.id {
            Some(id) => log::debug!("Collector '{}' has id {}", self.name, id),
            None => log::debug!(
                "Collector '{}' not among the first {} collectors",
                self.name,
                self.query_limit
            ),
        }
        Ok(self.id.is_some())
    }

    /// Error reported when the collector cannot be found.
    pub fn not_found(&self) -> Error {
        Error::CollectorNotFound {
            name: self.name.clone(),
            query_limit: self.query_limit,
            endpoint: self.endpoint.clone(),
        }
    }

    fn id(&mut self) -> Result<u64> {
        if !self.exists()? {
            return Err(self.not_found());
        }
        self.id.ok_or_else(|| self.not_found())
    }

    fn fetch(&mut self) -> Result<Cache> {
        let id = self.id()?;
        let metadata = self.backend.collector(id)?;
        let sources = self.backend.list_sources(id)?;
        log::debug!(
            "Fetched collector '{}': {} sources, sync mode {:?}",
            self.name,
            sources.len(),
            metadata.source_sync_mode
        );
        Ok(Cache { metadata, sources })
    }

    fn cache(&mut self) -> Result<&mut Cache> {
        let cache = match self.cache.take() {
            Some(cache) => cache,
            None => self.fetch()?,
        };
        Ok(self.cache.insert(cache))
    }

    /// Collector-level metadata.
    pub fn metadata(&mut self) -> Result<&CollectorMetadata> {
        Ok(&self.cache()?.metadata)
    }

    /// Switch the collector to API-managed sources.
    pub fn set_ui_sync_mode(&mut self) -> Result<()> {
        let id = self.id()?;
        self.backend.set_sync_mode(id, SyncMode::Ui)?;
        if let Some(cache) = self.cache.as_mut() {
            cache.metadata.source_sync_mode = Some(SyncMode::Ui);
        }
        Ok(())
    }

    /// All sources on the collector.
    pub fn sources(&mut self) -> Result<&[RemoteSource]> {
        Ok(&self.cache()?.sources)
    }

    /// Whether a source with this name exists.
    pub fn source_exists(&mut self, name: &str) -> Result<bool> {
        Ok(self.sources()?.iter().any(|s| s.name() == name))
    }

    /// Look up a source by name.
    pub fn source(&mut self, name: &str) -> Result<RemoteSource> {
        self.sources()?
            .iter()
            .find(|s| s.name() == name)
            .cloned()
            .ok_or_else(|| Error::SourceNotFound {
                name: name.to_string(),
            })
    }

    /// Create a source. Call [`refresh`](Self::refresh) afterwards.
    pub fn add_source(
        &mut self,
        definition: &SourceDefinition,
        timeout: Duration,
    ) -> Result<RemoteSource> {
        let id = self.id()?;
        self.backend.add_source(id, definition, timeout)
    }

    /// Replace a source with a full new definition.
    pub fn update_source(
        &mut self,
        source_id: u64,
        definition: &SourceDefinition,
        timeout: Duration,
    ) -> Result<RemoteSource> {
        let id = self.id()?;
        self.backend.update_source(id, source_id, definition, timeout)
    }

    /// Delete a source by id.
    pub fn delete_source(&mut self, source_id: u64) -> Result<()> {
        let id = self.id()?;
        self.backend.delete_source(id, source_id)
    }

    /// Re-fetch metadata and sources, replacing the cache.
    pub fn refresh(&mut self) -> Result<()> {
        let cache = self.fetch()?;
        self.cache = Some(cache);
        Ok(())
    }
}
