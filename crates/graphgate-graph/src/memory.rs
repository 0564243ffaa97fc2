//! In-process backend for development and tests.
//!
//! Mirrors the Neo4j layout closely enough to exercise the gateway end to
//! end: namespaces come into existence on first write, metadata records are
//! stored as JSON text under `graph_metadata:<id>`, and faults can be
//! injected per namespace or for the whole backend.

use std::collections::{BTreeMap, HashSet};
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::{Arc, Mutex, MutexGuard};

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use tokio::sync::Barrier;

use graphgate_core::types::{metadata_key, HitKind, METADATA_KEY_PREFIX};
use graphgate_core::{
    EntityUuid, Episode, EpisodeRecord, NamespaceId, NamespaceMetadata, NamespaceStats, SearchHit,
};

use crate::backend::{Connector, KnowledgeEngine, NamespaceStore};
use crate::client::GraphError;
use crate::queries::snippet;

/// A stored `RELATES_TO` edge.
#[derive(Debug, Clone)]
struct EntityEdge {
    uuid: String,
    name: String,
    fact: String,
    valid_at: DateTime<Utc>,
}

#[derive(Debug, Default)]
struct Namespace {
    episodes: Vec<EpisodeRecord>,
    edges: Vec<EntityEdge>,
}

#[derive(Debug, Default)]
struct State {
    graphs: BTreeMap<String, Namespace>,
    kv: BTreeMap<String, String>,
    failing_stats: HashSet<String>,
    /// Barrier held by the next `list_registered` callers, with the number
    /// of callers still to pass through it.
    listing_barrier: Option<(Arc<Barrier>, usize)>,
}

/// In-memory graph store. Clone is cheap and shares state.
#[derive(Debug, Clone, Default)]
pub struct MemoryBackend {
    state: Arc<Mutex<State>>,
    offline: Arc<AtomicBool>,
}

impl MemoryBackend {
    pub fn new() -> Self {
        Self::default()
    }

    fn lock(&self) -> MutexGuard<'_, State> {
        // A poisoned lock only means a test panicked mid-update.
        self.state.lock().unwrap_or_else(|e| e.into_inner())
    }

    fn check_online(&self) -> Result<(), GraphError> {
        if self.offline.load(Ordering::SeqCst) {
            return Err(GraphError::Connection("backend offline".to_string()));
        }
        Ok(())
    }

    /// Make every call fail with a connection error until set back.
    pub fn set_offline(&self, offline: bool) {
        self.offline.store(offline, Ordering::SeqCst);
    }

    /// Make `namespace_stats` fail for one namespace.
    pub fn fail_stats_for(&self, ns: &str) {
        self.lock().failing_stats.insert(ns.to_string());
    }

    /// Insert an entity edge directly, as the extraction pipeline would.
    pub fn insert_entity_edge(&self, ns: &NamespaceId, name: &str, fact: &str) -> EntityUuid {
        let uuid = EntityUuid::new();
        self.lock()
            .graphs
            .entry(ns.to_string())
            .or_default()
            .edges
            .push(EntityEdge {
                uuid: uuid.to_string(),
                name: name.to_string(),
                fact: fact.to_string(),
                valid_at: Utc::now(),
            });
        uuid
    }

    /// Hold the next `parties` calls to `list_registered` until all of them
    /// have read their snapshot. Lets concurrent callers act on the same
    /// stale view of the registry.
    pub fn hold_listings(&self, parties: usize) {
        self.lock().listing_barrier = Some((Arc::new(Barrier::new(parties)), parties));
    }

    fn take_listing_barrier(&self) -> Option<Arc<Barrier>> {
        let mut state = self.lock();
        let (barrier, remaining) = state.listing_barrier.as_mut()?;
        let barrier = barrier.clone();
        *remaining -= 1;
        if *remaining == 0 {
            state.listing_barrier = None;
        }
        Some(barrier)
    }

    /// Raw durable value stored under `key`.
    pub fn raw_value(&self, key: &str) -> Option<String> {
        self.lock().kv.get(key).cloned()
    }
}

#[async_trait]
impl NamespaceStore for MemoryBackend {
    async fn list_namespaces(&self) -> Result<Vec<String>, GraphError> {
        self.check_online()?;
        Ok(self.lock().graphs.keys().cloned().collect())
    }

    async fn list_registered(&self) -> Result<Vec<String>, GraphError> {
        self.check_online()?;
        let ids: Vec<String> = self
            .lock()
            .kv
            .keys()
            .filter_map(|k| k.strip_prefix(METADATA_KEY_PREFIX).map(str::to_string))
            .collect();
        if let Some(barrier) = self.take_listing_barrier() {
            barrier.wait().await;
        }
        Ok(ids)
    }

    async fn namespace_stats(&self, ns: &NamespaceId) -> Result<NamespaceStats, GraphError> {
        self.check_online()?;
        let state = self.lock();
        if state.failing_stats.contains(ns.as_str()) {
            return Err(GraphError::Backend(format!("stats unavailable for {ns}")));
        }
        Ok(state
            .graphs
            .get(ns.as_str())
            .map(|g| NamespaceStats {
                node_count: g.episodes.len() as i64,
                edge_count: g.edges.len() as i64,
            })
            .unwrap_or_default())
    }

    async fn get_metadata(
        &self,
        ns: &NamespaceId,
    ) -> Result<Option<NamespaceMetadata>, GraphError> {
        self.check_online()?;
        match self.lock().kv.get(&metadata_key(ns)) {
            Some(raw) => Ok(Some(serde_json::from_str(raw)?)),
            None => Ok(None),
        }
    }

    async fn put_metadata_if_absent(
        &self,
        ns: &NamespaceId,
        meta: &NamespaceMetadata,
    ) -> Result<bool, GraphError> {
        self.check_online()?;
        let raw = serde_json::to_string(meta)?;
        let mut state = self.lock();
        let key = metadata_key(ns);
        if state.kv.contains_key(&key) {
            return Ok(false);
        }
        state.kv.insert(key, raw);
        Ok(true)
    }

    async fn increment_episode_count(&self, ns: &NamespaceId) -> Result<(), GraphError> {
        self.check_online()?;
        let mut state = self.lock();
        if let Some(raw) = state.kv.get_mut(&metadata_key(ns)) {
            let mut meta: NamespaceMetadata = serde_json::from_str(raw)?;
            meta.episode_count += 1;
            *raw = serde_json::to_string(&meta)?;
        }
        Ok(())
    }
}

#[async_trait]
impl KnowledgeEngine for MemoryBackend {
    async fn add_episode(
        &self,
        ns: &NamespaceId,
        episode: &Episode,
    ) -> Result<EpisodeRecord, GraphError> {
        self.check_online()?;
        let now = Utc::now();
        let record = EpisodeRecord {
            uuid: EntityUuid::new().to_string(),
            namespace: ns.to_string(),
            name: episode.name.clone(),
            content: episode.body.clone(),
            source: episode.source,
            source_description: episode.source_description.clone(),
            valid_at: episode.reference_time.unwrap_or(now),
            created_at: now,
        };
        self.lock()
            .graphs
            .entry(ns.to_string())
            .or_default()
            .episodes
            .push(record.clone());
        Ok(record)
    }

    async fn search(
        &self,
        ns: &NamespaceId,
        query: &str,
        limit: u32,
    ) -> Result<Vec<SearchHit>, GraphError> {
        self.check_online()?;
        let needle = query.to_lowercase();
        let state = self.lock();
        let Some(graph) = state.graphs.get(ns.as_str()) else {
            return Ok(Vec::new());
        };

        let facts = graph
            .edges
            .iter()
            .filter(|e| e.fact.to_lowercase().contains(&needle))
            .map(|e| SearchHit {
                kind: HitKind::Fact,
                uuid: e.uuid.clone(),
                name: e.name.clone(),
                snippet: snippet(&e.fact),
                valid_at: Some(e.valid_at),
            });

        let mut episodes: Vec<&EpisodeRecord> = graph
            .episodes
            .iter()
            .filter(|e| {
                e.name.to_lowercase().contains(&needle)
                    || e.content.to_lowercase().contains(&needle)
            })
            .collect();
        episodes.sort_by(|a, b| b.valid_at.cmp(&a.valid_at));

        Ok(facts
            .chain(episodes.into_iter().map(|e| SearchHit {
                kind: HitKind::Episode,
                uuid: e.uuid.clone(),
                name: e.name.clone(),
                snippet: snippet(&e.content),
                valid_at: Some(e.valid_at),
            }))
            .take(limit as usize)
            .collect())
    }

    async fn get_episodes(
        &self,
        ns: &NamespaceId,
        last_n: u32,
    ) -> Result<Vec<EpisodeRecord>, GraphError> {
        self.check_online()?;
        let state = self.lock();
        let mut episodes = state
            .graphs
            .get(ns.as_str())
            .map(|g| g.episodes.clone())
            .unwrap_or_default();
        episodes.sort_by(|a, b| b.valid_at.cmp(&a.valid_at));
        episodes.truncate(last_n as usize);
        Ok(episodes)
    }

    async fn delete_entity_edge(
        &self,
        ns: &NamespaceId,
        uuid: &EntityUuid,
    ) -> Result<(), GraphError> {
        self.check_online()?;
        let wanted = uuid.to_string();
        let mut state = self.lock();
        let removed = state.graphs.get_mut(ns.as_str()).and_then(|g| {
            let pos = g.edges.iter().position(|e| e.uuid == wanted)?;
            Some(g.edges.remove(pos))
        });

        match removed {
            Some(_) => Ok(()),
            None => Err(GraphError::NotFound {
                what: "Entity edge",
                id: wanted,
                namespace: ns.to_string(),
            }),
        }
    }
}

/// Hands out clones of one `MemoryBackend`, optionally refusing to connect.
#[derive(Debug, Clone, Default)]
pub struct MemoryConnector {
    backend: MemoryBackend,
    refuse: Arc<AtomicBool>,
    refuse_next: Arc<AtomicUsize>,
    attempts: Arc<AtomicUsize>,
}

impl MemoryConnector {
    pub fn new(backend: MemoryBackend) -> Self {
        Self {
            backend,
            ..Default::default()
        }
    }

    /// Refuse (or allow) subsequent connection attempts.
    pub fn set_refuse(&self, refuse: bool) {
        self.refuse.store(refuse, Ordering::SeqCst);
    }

    /// Refuse only the next `n` connection attempts.
    pub fn refuse_next(&self, n: usize) {
        self.refuse_next.store(n, Ordering::SeqCst);
    }

    pub fn attempts(&self) -> usize {
        self.attempts.load(Ordering::SeqCst)
    }

    pub fn backend(&self) -> &MemoryBackend {
        &self.backend
    }
}

#[async_trait]
impl Connector for MemoryConnector {
    type Handle = MemoryBackend;

    async fn connect(&self) -> Result<MemoryBackend, GraphError> {
        self.attempts.fetch_add(1, Ordering::SeqCst);
        let budgeted = self
            .refuse_next
            .fetch_update(Ordering::SeqCst, Ordering::SeqCst, |n| n.checked_sub(1))
            .is_ok();
        if budgeted || self.refuse.load(Ordering::SeqCst) {
            return Err(GraphError::Connection("connection refused".to_string()));
        }
        Ok(self.backend.clone())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use graphgate_core::SourceKind;

    fn ns(id: &str) -> NamespaceId {
        NamespaceId::parse(id).unwrap()
    }

    fn episode(name: &str, body: &str) -> Episode {
        Episode {
            name: name.to_string(),
            body: body.to_string(),
            source: SourceKind::Text,
            source_description: None,
            reference_time: None,
        }
    }

    #[tokio::test]
    async fn namespace_appears_on_first_write() {
        let backend = MemoryBackend::new();
        assert!(backend.list_namespaces().await.unwrap().is_empty());

        backend
            .add_episode(&ns("work"), &episode("standup", "shipped the gateway"))
            .await
            .unwrap();

        assert_eq!(backend.list_namespaces().await.unwrap(), vec!["work"]);
        let stats = backend.namespace_stats(&ns("work")).await.unwrap();
        assert_eq!(stats.node_count, 1);
    }

    #[tokio::test]
    async fn metadata_stored_as_json_under_prefixed_key() {
        let backend = MemoryBackend::new();
        let created = backend
            .put_metadata_if_absent(&ns("notes"), &NamespaceMetadata::new("personal notes"))
            .await
            .unwrap();
        assert!(created);

        let raw = backend.raw_value("graph_metadata:notes").unwrap();
        let value: serde_json::Value = serde_json::from_str(&raw).unwrap();
        assert_eq!(value["description"], "personal notes");
        assert_eq!(value["episode_count"], 0);

        let again = backend
            .put_metadata_if_absent(&ns("notes"), &NamespaceMetadata::new("other"))
            .await
            .unwrap();
        assert!(!again);

        backend.increment_episode_count(&ns("notes")).await.unwrap();
        let meta = backend.get_metadata(&ns("notes")).await.unwrap().unwrap();
        assert_eq!(meta.description, "personal notes");
        assert_eq!(meta.episode_count, 1);
    }

    #[tokio::test]
    async fn search_is_namespace_scoped() {
        let backend = MemoryBackend::new();
        backend
            .add_episode(&ns("a"), &episode("rust", "ownership and borrowing"))
            .await
            .unwrap();
        backend
            .add_episode(&ns("b"), &episode("rust", "ownership elsewhere"))
            .await
            .unwrap();
        backend.insert_entity_edge(&ns("a"), "OWNS", "Alice owns the Ownership doc");

        let hits = backend.search(&ns("a"), "OWNERSHIP", 10).await.unwrap();
        assert_eq!(hits.len(), 2);
        assert_eq!(hits[0].kind, HitKind::Fact);
        assert_eq!(hits[1].kind, HitKind::Episode);

        let limited = backend.search(&ns("a"), "ownership", 1).await.unwrap();
        assert_eq!(limited.len(), 1);
    }

    #[tokio::test]
    async fn delete_edge_respects_namespace() {
        let backend = MemoryBackend::new();
        let uuid = backend.insert_entity_edge(&ns("a"), "KNOWS", "a knows b");

        let err = backend.delete_entity_edge(&ns("b"), &uuid).await.unwrap_err();
        assert!(matches!(err, GraphError::NotFound { .. }));

        backend.delete_entity_edge(&ns("a"), &uuid).await.unwrap();
        assert_eq!(backend.namespace_stats(&ns("a")).await.unwrap().edge_count, 0);
    }

    #[tokio::test]
    async fn held_listings_return_snapshots_taken_before_release() {
        let backend = MemoryBackend::new();
        backend.hold_listings(2);

        let writer = backend.clone();
        let (first, second) = tokio::join!(backend.list_registered(), async {
            let ids = writer.list_registered().await;
            writer
                .put_metadata_if_absent(&ns("late"), &NamespaceMetadata::new("late"))
                .await
                .unwrap();
            ids
        });
        assert!(first.unwrap().is_empty());
        assert!(second.unwrap().is_empty());

        // The barrier is spent; later listings pass straight through.
        assert_eq!(backend.list_registered().await.unwrap(), vec!["late"]);
    }

    #[tokio::test]
    async fn offline_backend_reports_connection_errors() {
        let backend = MemoryBackend::new();
        backend.set_offline(true);
        let err = backend.list_namespaces().await.unwrap_err();
        assert!(matches!(err, GraphError::Connection(_)));
    }

    #[tokio::test]
    async fn connector_can_refuse() {
        let connector = MemoryConnector::new(MemoryBackend::new());
        connector.set_refuse(true);
        assert!(connector.connect().await.is_err());
        connector.set_refuse(false);
        assert!(connector.connect().await.is_ok());
        assert_eq!(connector.attempts(), 2);

        connector.refuse_next(1);
        assert!(connector.connect().await.is_err());
        assert!(connector.connect().await.is_ok());
    }
}
