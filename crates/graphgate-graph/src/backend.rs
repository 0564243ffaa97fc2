//! Backend seams between the gateway and the graph store.
//!
//! `GraphClient` implements these against Neo4j; `MemoryBackend` implements
//! them in-process for development and tests.

use async_trait::async_trait;

use graphgate_core::{
    EntityUuid, Episode, EpisodeRecord, NamespaceId, NamespaceMetadata, NamespaceStats, SearchHit,
};

use crate::client::{GraphClient, GraphError};

/// Builds a backend handle. Called by `ConnectionProvider` at most once per
/// successful construction.
#[async_trait]
pub trait Connector: Send + Sync {
    type Handle: Send + Sync;

    async fn connect(&self) -> Result<Self::Handle, GraphError>;
}

/// Namespace discovery and the durable metadata side records.
#[async_trait]
pub trait NamespaceStore: Send + Sync {
    /// Namespace ids the backend currently holds data for.
    async fn list_namespaces(&self) -> Result<Vec<String>, GraphError>;

    /// Ids that have a metadata record, with or without backend data.
    async fn list_registered(&self) -> Result<Vec<String>, GraphError>;

    /// Backend-native node and edge counters for one namespace.
    async fn namespace_stats(&self, ns: &NamespaceId) -> Result<NamespaceStats, GraphError>;

    async fn get_metadata(&self, ns: &NamespaceId)
        -> Result<Option<NamespaceMetadata>, GraphError>;

    /// Write `meta` only if no record exists for `ns`.
    ///
    /// Returns `false` when a record was already present; the check and the
    /// write happen as one atomic step.
    async fn put_metadata_if_absent(
        &self,
        ns: &NamespaceId,
        meta: &NamespaceMetadata,
    ) -> Result<bool, GraphError>;

    /// Bump the episode counter on an existing metadata record.
    async fn increment_episode_count(&self, ns: &NamespaceId) -> Result<(), GraphError>;
}

/// The knowledge-graph collaborator, addressed per namespace.
#[async_trait]
pub trait KnowledgeEngine: Send + Sync {
    async fn add_episode(
        &self,
        ns: &NamespaceId,
        episode: &Episode,
    ) -> Result<EpisodeRecord, GraphError>;

    async fn search(
        &self,
        ns: &NamespaceId,
        query: &str,
        limit: u32,
    ) -> Result<Vec<SearchHit>, GraphError>;

    /// Most recent episodes first.
    async fn get_episodes(
        &self,
        ns: &NamespaceId,
        last_n: u32,
    ) -> Result<Vec<EpisodeRecord>, GraphError>;

    /// Fails with `GraphError::NotFound` when no such edge exists in `ns`.
    async fn delete_entity_edge(&self, ns: &NamespaceId, uuid: &EntityUuid)
        -> Result<(), GraphError>;
}

// ── Neo4j ────────────────────────────────────────────────────────

#[async_trait]
impl NamespaceStore for GraphClient {
    async fn list_namespaces(&self) -> Result<Vec<String>, GraphError> {
        self.list_group_ids().await
    }

    async fn list_registered(&self) -> Result<Vec<String>, GraphError> {
        self.list_metadata_ids().await
    }

    async fn namespace_stats(&self, ns: &NamespaceId) -> Result<NamespaceStats, GraphError> {
        self.count_namespace(ns).await
    }

    async fn get_metadata(
        &self,
        ns: &NamespaceId,
    ) -> Result<Option<NamespaceMetadata>, GraphError> {
        self.read_metadata(ns).await
    }

    async fn put_metadata_if_absent(
        &self,
        ns: &NamespaceId,
        meta: &NamespaceMetadata,
    ) -> Result<bool, GraphError> {
        self.create_metadata(ns, meta).await
    }

    async fn increment_episode_count(&self, ns: &NamespaceId) -> Result<(), GraphError> {
        self.bump_episode_count(ns).await
    }
}

#[async_trait]
impl KnowledgeEngine for GraphClient {
    async fn add_episode(
        &self,
        ns: &NamespaceId,
        episode: &Episode,
    ) -> Result<EpisodeRecord, GraphError> {
        self.create_episode(ns, episode).await
    }

    async fn search(
        &self,
        ns: &NamespaceId,
        query: &str,
        limit: u32,
    ) -> Result<Vec<SearchHit>, GraphError> {
        self.search_namespace(ns, query, limit).await
    }

    async fn get_episodes(
        &self,
        ns: &NamespaceId,
        last_n: u32,
    ) -> Result<Vec<EpisodeRecord>, GraphError> {
        self.recent_episodes(ns, last_n).await
    }

    async fn delete_entity_edge(
        &self,
        ns: &NamespaceId,
        uuid: &EntityUuid,
    ) -> Result<(), GraphError> {
        self.remove_entity_edge(ns, uuid).await
    }
}
