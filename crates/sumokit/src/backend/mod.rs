//! Backend traits and implementations for the collector API.
//!
//! This module provides the [`Backend`] trait and two implementations:
//! [`http::HttpBackend`], which talks to the Sumo Logic REST API, and
//! [`MockBackend`], which keeps everything in memory.
//!
//! # Testing
//!
//! Use [`MockBackend`] for testing without network access. Clones share
//! state, so a test can hand one clone to a [`Collector`](crate::Collector)
//! and inspect the recorded calls through another:
//!
//! ```
//! use sumokit::backend::{Backend, Call, MockBackend};
//! use sumokit::SourceDefinition;
//!
//! let mock = MockBackend::new();
//! let id = mock.add_collector("web-01");
//! mock.add_existing_source(id, SourceDefinition::new("app-logs", "/var/log/app/*.log"));
//!
//! let sources = mock.list_sources(id).unwrap();
//! assert_eq!(sources.len(), 1);
//! assert_eq!(mock.calls(), vec![Call::ListSources { collector_id: id }]);
//! ```

pub mod http;

use crate::error::{Error, Result};
use crate::types::{
    CollectorInfo, CollectorMetadata, LOCAL_FILE_SOURCE, RemoteSource, SourceDefinition, SyncMode,
};
use std::collections::HashMap;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use std::time::Duration;

/// Backend trait for collector and source management.
///
/// Every method is a single blocking API round trip (or the equivalent).
/// Implementations never retry.
pub trait Backend: Send + Sync {
    /// List up to `limit` collectors.
    fn list_collectors(&self, limit: u32) -> Result<Vec<CollectorInfo>>;

    /// Fetch collector metadata.
    fn collector(&self, id: u64) -> Result<CollectorMetadata>;

    /// Change the collector's source sync mode.
    fn set_sync_mode(&self, id: u64, mode: SyncMode) -> Result<()>;

    /// List the collector's sources.
    fn list_sources(&self, collector_id: u64) -> Result<Vec<RemoteSource>>;

    /// Create a source.
    fn add_source(
        &self,
        collector_id: u64,
        definition: &SourceDefinition,
        timeout: Duration,
    ) -> Result<RemoteSource>;

    /// Replace a source with a full new definition.
    fn update_source(
        &self,
        collector_id: u64,
        source_id: u64,
        definition: &SourceDefinition,
        timeout: Duration,
    ) -> Result<RemoteSource>;

    /// Delete a source.
    fn delete_source(&self, collector_id: u64, source_id: u64) -> Result<()>;
}

/// A call recorded by [`MockBackend`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Call {
    ListCollectors {
        limit: u32,
    },
    GetCollector {
        id: u64,
    },
    SetSyncMode {
        id: u64,
        mode: SyncMode,
    },
    ListSources {
        collector_id: u64,
    },
    AddSource {
        collector_id: u64,
        definition: SourceDefinition,
        timeout: Duration,
    },
    UpdateSource {
        collector_id: u64,
        source_id: u64,
        definition: SourceDefinition,
        timeout: Duration,
    },
    DeleteSource {
        collector_id: u64,
        source_id: u64,
    },
}

impl Call {
    /// Whether this call changes remote state.
    pub fn is_mutation(&self) -> bool {
        matches!(
            self,
            Self::SetSyncMode { .. }
                | Self::AddSource { .. }
                | Self::UpdateSource { .. }
                | Self::DeleteSource { .. }
        )
    }

    /// Whether this call addresses sources rather than the collector.
    pub fn is_source_level(&self) -> bool {
        matches!(
            self,
            Self::ListSources { .. }
                | Self::AddSource { .. }
                | Self::UpdateSource { .. }
                | Self::DeleteSource { .. }
        )
    }
}

#[derive(Debug, Default)]
struct MockState {
    collectors: Vec<CollectorMetadata>,
    sources: HashMap<u64, Vec<RemoteSource>>,
    next_id: u64,
    calls: Vec<Call>,
    mutation_failure: Option<u16>,
}

impl MockState {
    fn next_id(&mut self) -> u64 {
        self.next_id += 1;
        self.next_id
    }

    fn fail_mutation(&self) -> Result<()> {
        match self.mutation_failure {
            Some(status) => Err(Error::http(format!("HTTP {}", status), Some(status))),
            None => Ok(()),
        }
    }

    fn collector_mut(&mut self, id: u64) -> Result<&mut CollectorMetadata> {
        self.collectors
            .iter_mut()
            .find(|c| c.id == id)
            .ok_or_else(|| Error::http("HTTP 404", Some(404)))
    }

    fn sources_mut(&mut self, collector_id: u64) -> Result<&mut Vec<RemoteSource>> {
        if !self.collectors.iter().any(|c| c.id == collector_id) {
            return Err(Error::http("HTTP 404", Some(404)));
        }
        Ok(self.sources.entry(collector_id).or_default())
    }
}

/// Mock backend for testing without network access.
///
/// Stores collectors and sources in memory, records every call and can
/// be told to fail all mutating calls with a given HTTP status.
#[derive(Debug, Clone, Default)]
pub struct MockBackend {
    state: Arc<Mutex<MockState>>,
}

impl MockBackend {
    /// Create a new empty mock backend.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    fn state(&self) -> MutexGuard<'_, MockState> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Register an API-managed collector, returning its id.
    pub fn add_collector(&self, name: &str) -> u64 {
        self.add_collector_with_mode(name, Some(SyncMode::Ui))
    }

    /// Register a collector with an explicit sync mode, returning its id.
    pub fn add_collector_with_mode(&self, name: &str, mode: Option<SyncMode>) -> u64 {
        let mut state = self.state();
        let id = state.next_id();
        state.collectors.push(CollectorMetadata {
            id,
            name: name.to_string(),
            collector_type: Some("Installable".to_string()),
            alive: Some(true),
            source_sync_mode: mode,
        });
        id
    }

    /// Seed a source without recording a call, returning its id.
    pub fn add_existing_source(&self, collector_id: u64, definition: SourceDefinition) -> u64 {
        let mut state = self.state();
        let id = state.next_id();
        state
            .sources
            .entry(collector_id)
            .or_default()
            .push(RemoteSource {
                id,
                source_type: Some(LOCAL_FILE_SOURCE.to_string()),
                definition,
            });
        id
    }

    /// Make every mutating call fail with this HTTP status.
    pub fn fail_mutations_with(&self, status: u16) {
        self.state().mutation_failure = Some(status);
    }

    /// All calls recorded so far, oldest first.
    pub fn calls(&self) -> Vec<Call> {
        self.state().calls.clone()
    }

    /// Current sources of a collector.
    pub fn sources_of(&self, collector_id: u64) -> Vec<RemoteSource> {
        self.state()
            .sources
            .get(&collector_id)
            .cloned()
            .unwrap_or_default()
    }

    /// Current sync mode of a collector.
    pub fn sync_mode_of(&self, collector_id: u64) -> Option<SyncMode> {
        self.state()
            .collectors
            .iter()
            .find(|c| c.id == collector_id)
            .and_then(|c| c.source_sync_mode)
    }
}

impl Backend for MockBackend {
    fn list_collectors(&self, limit: u32) -> Result<Vec<CollectorInfo>> {
        let mut state = self.state();
        state.calls.push(Call::ListCollectors { limit });
        Ok(state
            .collectors
            .iter()
            .take(limit as usize)
            .map(|c| CollectorInfo {
                id: c.id,
                name: c.name.clone(),
            })
            .collect())
    }

    fn collector(&self, id: u64) -> Result<CollectorMetadata> {
        let mut state = self.state();
        state.calls.push(Call::GetCollector { id });
        state.collector_mut(id).map(|c| c.clone())
    }

    fn set_sync_mode(&self, id: u64, mode: SyncMode) -> Result<()> {
        let mut state = self.state();
        state.calls.push(Call::SetSyncMode { id, mode });
        state.fail_mutation()?;
        state.collector_mut(id)?.source_sync_mode = Some(mode);
        Ok(())
    }

    fn list_sources(&self, collector_id: u64) -> Result<Vec<RemoteSource>> {
        let mut state = self.state();
        state.calls.push(Call::ListSources { collector_id });
        Ok(state.sources_mut(collector_id)?.clone())
    }

    fn add_source(
        &self,
        collector_id: u64,
        definition: &SourceDefinition,
        timeout: Duration,
    ) -> Result<RemoteSource> {
        let mut state = self.state();
        state.calls.push(Call::AddSource {
            collector_id,
            definition: definition.clone(),
            timeout,
        });
        state.fail_mutation()?;

        if state
            .sources_mut(collector_id)?
            .iter()
            .any(|s| s.definition.name == definition.name)
        {
            return Err(Error::http("HTTP 400: duplicate source name", Some(400)));
        }

        let source = RemoteSource {
            id: state.next_id(),
            source_type: Some(LOCAL_FILE_SOURCE.to_string()),
            definition: definition.clone(),
        };
        state.sources_mut(collector_id)?.push(source.clone());
        Ok(source)
    }

    fn update_source(
        &self,
        collector_id: u64,
        source_id: u64,
        definition: &SourceDefinition,
        timeout: Duration,
    ) -> Result<RemoteSource> {
        let mut state = self.state();
        state.calls.push(Call::UpdateSource {
            collector_id,
            source_id,
            definition: definition.clone(),
            timeout,
        });
        state.fail_mutation()?;

        let source = state
            .sources_mut(collector_id)?
            .iter_mut()
            .find(|s| s.id == source_id)
            .ok_or_else(|| Error::http("HTTP 404", Some(404)))?;
        source.definition = definition.clone();
        Ok(source.clone())
    }

    fn delete_source(&self, collector_id: u64, source_id: u64) -> Result<()> {
        let mut state = self.state();
        state.calls.push(Call::DeleteSource {
            collector_id,
            source_id,
        });
        state.fail_mutation()?;

        let sources = state.sources_mut(collector_id)?;
        let before = sources.len();
        sources.retain(|s| s.id != source_id);
        if sources.len() == before {
            return Err(Error::http("HTTP 404", Some(404)));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_mock_backend_new() {
        let mock = MockBackend::new();
        assert!(mock.list_collectors(10).unwrap().is_empty());
    }

    #[test]
    fn test_list_collectors_respects_limit() {
        let mock = MockBackend::new();
        mock.add_collector("a");
        mock.add_collector("b");
        mock.add_collector("c");

        let listed = mock.list_collectors(2).unwrap();
        assert_eq!(listed.len(), 2);
        assert!(listed.iter().all(|c| c.name != "c"));
    }

    #[test]
    fn test_add_update_delete_roundtrip() {
        let mock = MockBackend::new();
        let cid = mock.add_collector("web-01");
        let timeout = Duration::from_secs(5);

        let added = mock
            .add_source(cid, &SourceDefinition::new("app", "/a"), timeout)
            .unwrap();
        let updated = mock
            .update_source(cid, added.id, &SourceDefinition::new("app", "/b"), timeout)
            .unwrap();
        assert_eq!(updated.definition.path, "/b");

        mock.delete_source(cid, added.id).unwrap();
        assert!(mock.sources_of(cid).is_empty());
        assert_eq!(mock.calls().iter().filter(|c| c.is_mutation()).count(), 3);
    }

    #[test]
    fn test_duplicate_add_is_rejected() {
        let mock = MockBackend::new();
        let cid = mock.add_collector("web-01");
        mock.add_existing_source(cid, SourceDefinition::new("app", "/a"));

        let err = mock
            .add_source(cid, &SourceDefinition::new("app", "/a"), Duration::from_secs(1))
            .unwrap_err();
        assert_eq!(err.status(), Some(400));
    }

    #[test]
    fn test_injected_failure() {
        let mock = MockBackend::new();
        let cid = mock.add_collector("web-01");
        mock.fail_mutations_with(503);

        let err = mock.set_sync_mode(cid, SyncMode::Ui).unwrap_err();
        assert_eq!(err.status(), Some(503));
        assert!(mock.list_sources(cid).is_ok());
    }

    #[test]
    fn test_unknown_collector_is_404() {
        let mock = MockBackend::new();
        assert_eq!(mock.collector(42).unwrap_err().status(), Some(404));
        assert_eq!(mock.list_sources(42).unwrap_err().status(), Some(404));
    }
}
